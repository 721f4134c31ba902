//! # Peripheral access
//!
//! Minimal register-level access to the K20 peripherals used by the
//! quadrature decoder: the two FlexTimer modules, the PORT pin control
//! registers of their input pins, and the SIM clock gates.
//!
//! Register blocks are laid out like a generated peripheral access crate
//! would lay them out: `#[repr(C)]` structs of [`VolatileCell`]s at fixed
//! base addresses, with zero-sized ownership singletons on top. Only the
//! registers this driver touches carry bit definitions; the rest are plain
//! 32-bit cells kept for layout.

use core::marker::PhantomData;
use core::ops::Deref;
use core::sync::atomic::{AtomicBool, Ordering};

/// FlexTimer module registers.
pub mod ftm {
    use vcell::VolatileCell;

    /// One capture/compare channel register pair.
    #[repr(C)]
    pub struct Channel {
        /// Channel status and control (`CnSC`).
        pub csc: VolatileCell<u32>,
        /// Channel value (`CnV`).
        pub cv: VolatileCell<u32>,
    }

    /// FTM register block, per the K20 sub-family reference manual.
    #[repr(C)]
    pub struct RegisterBlock {
        /// Status and control (`SC`), offset 0x00.
        pub sc: VolatileCell<u32>,
        /// Counter (`CNT`), offset 0x04. Writing any value loads the
        /// counter from `CNTIN`, regardless of the value written.
        pub cnt: VolatileCell<u32>,
        /// Modulo (`MOD`), offset 0x08.
        pub mod_: VolatileCell<u32>,
        /// Channels 0..=7 (`CnSC`/`CnV`), offset 0x0C.
        pub ch: [Channel; 8],
        /// Counter initial value (`CNTIN`), offset 0x4C.
        pub cntin: VolatileCell<u32>,
        /// Capture and compare status (`STATUS`), offset 0x50.
        pub status: VolatileCell<u32>,
        /// Features mode selection (`MODE`), offset 0x54.
        pub mode: VolatileCell<u32>,
        /// Synchronization (`SYNC`), offset 0x58.
        pub sync: VolatileCell<u32>,
        /// Initial state for channel outputs (`OUTINIT`), offset 0x5C.
        pub outinit: VolatileCell<u32>,
        /// Output mask (`OUTMASK`), offset 0x60.
        pub outmask: VolatileCell<u32>,
        /// Function for linked channels (`COMBINE`), offset 0x64.
        pub combine: VolatileCell<u32>,
        /// Deadtime insertion control (`DEADTIME`), offset 0x68.
        pub deadtime: VolatileCell<u32>,
        /// External trigger (`EXTTRIG`), offset 0x6C.
        pub exttrig: VolatileCell<u32>,
        /// Channel polarity (`POL`), offset 0x70.
        pub pol: VolatileCell<u32>,
        /// Fault mode status (`FMS`), offset 0x74.
        pub fms: VolatileCell<u32>,
        /// Input capture filter control (`FILTER`), offset 0x78.
        pub filter: VolatileCell<u32>,
        /// Fault control (`FLTCTRL`), offset 0x7C.
        pub fltctrl: VolatileCell<u32>,
        /// Quadrature decoder control and status (`QDCTRL`), offset 0x80.
        pub qdctrl: VolatileCell<u32>,
        /// Configuration (`CONF`), offset 0x84.
        pub conf: VolatileCell<u32>,
    }

    bitflags::bitflags! {
        /// `MODE` register bits.
        pub struct Mode: u32 {
            /// FTM enable. Gates access to the FTM-specific registers
            /// (`CNTIN`, `FILTER`, `QDCTRL`, ...); write protected.
            const FTMEN = 1 << 0;
            /// Write protection disable. Writing 1 clears `FMS.WPEN`.
            const WPDIS = 1 << 2;
        }
    }

    bitflags::bitflags! {
        /// `FMS` register bits.
        pub struct Fms: u32 {
            /// Write protection enable. Writing 1 clears `MODE.WPDIS` and
            /// locks the protected control registers again.
            const WPEN = 1 << 6;
        }
    }

    bitflags::bitflags! {
        /// `QDCTRL` register bits.
        pub struct QdCtrl: u32 {
            /// Quadrature decoder mode enable; write protected.
            const QUADEN = 1 << 0;
            /// Direction of the last counter overflow (status).
            const TOFDIR = 1 << 1;
            /// Counting direction, 1 while incrementing (status).
            const QUADIR = 1 << 2;
            /// Count-and-direction encoding instead of phase encoding.
            const QUADMODE = 1 << 3;
            /// Phase B polarity, 1 = inverted.
            const PHBPOL = 1 << 4;
            /// Phase A polarity, 1 = inverted.
            const PHAPOL = 1 << 5;
            /// Phase B input filter enable.
            const PHBFLTREN = 1 << 6;
            /// Phase A input filter enable.
            const PHAFLTREN = 1 << 7;
        }
    }

    /// Packs the per-phase filter values into the `FILTER` register layout:
    /// `CH0FVAL` (bits 3:0) filters phase A, `CH1FVAL` (bits 7:4) filters
    /// phase B. Each unit rejects transitions shorter than 4 system clocks.
    pub const fn filter_value(pha: u8, phb: u8) -> u32 {
        ((phb as u32 & 0xF) << 4) | (pha as u32 & 0xF)
    }
}

/// PORT pin control registers.
pub mod port {
    use vcell::VolatileCell;

    /// PORT register block: one 32-bit pin control register per pin.
    #[repr(C)]
    pub struct RegisterBlock {
        /// Pin control registers (`PCR0`..`PCR31`).
        pub pcr: [VolatileCell<u32>; 32],
    }

    /// PORTA base address.
    pub const PORTA: *const RegisterBlock = 0x4004_9000 as *const RegisterBlock;
    /// PORTB base address.
    pub const PORTB: *const RegisterBlock = 0x4004_A000 as *const RegisterBlock;

    /// `PCR` pull select, 1 = pull-up.
    pub const PCR_PS: u32 = 1 << 0;
    /// `PCR` pull enable.
    pub const PCR_PE: u32 = 1 << 1;
    /// `PCR` passive input filter enable.
    pub const PCR_PFE: u32 = 1 << 4;
    const PCR_MUX_SHIFT: u32 = 8;

    /// Idle bias of a phase input.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Pull {
        /// Pull the input low while no encoder edge drives it.
        Down,
        /// Pull the input high.
        Up,
    }

    /// Encodes a `PCRn` value selecting the given alternate function as a
    /// filtered input with the requested pull resistor.
    pub const fn pcr_input(alt: u8, pull: Pull) -> u32 {
        let ps = match pull {
            Pull::Down => 0,
            Pull::Up => PCR_PS,
        };
        ((alt as u32 & 0x7) << PCR_MUX_SHIFT) | PCR_PFE | PCR_PE | ps
    }
}

/// SIM clock gating.
pub mod sim {
    use core::ptr;

    const SCGC3: *mut u32 = 0x4004_8030 as *mut u32;
    const SCGC5: *mut u32 = 0x4004_8038 as *mut u32;
    const SCGC6: *mut u32 = 0x4004_803C as *mut u32;

    /// Clock gates feeding the quadrature hardware.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ClockGate {
        /// FTM1 bus clock, `SCGC6[25]`.
        Ftm1,
        /// FTM2 bus clock, `SCGC3[24]`.
        Ftm2,
        /// PORTA interface clock, `SCGC5[9]`.
        PortA,
        /// PORTB interface clock, `SCGC5[10]`.
        PortB,
    }

    impl ClockGate {
        fn reg_mask(self) -> (*mut u32, u32) {
            match self {
                ClockGate::Ftm1 => (SCGC6, 1 << 25),
                ClockGate::Ftm2 => (SCGC3, 1 << 24),
                ClockGate::PortA => (SCGC5, 1 << 9),
                ClockGate::PortB => (SCGC5, 1 << 10),
            }
        }

        /// Opens this clock gate. The SCGC registers are shared with every
        /// other peripheral on the chip, so this is a read-modify-write.
        pub fn enable(self) {
            let (reg, mask) = self.reg_mask();
            unsafe {
                let value = ptr::read_volatile(reg);
                ptr::write_volatile(reg, value | mask);
            }
        }
    }
}

macro_rules! ftm_singleton {
    ($(#[$doc:meta])* $FTMX:ident: $base:literal) => {
        $(#[$doc])*
        pub struct $FTMX {
            pub(crate) _marker: PhantomData<*const ()>,
        }

        unsafe impl Send for $FTMX {}

        impl $FTMX {
            /// Pointer to the register block.
            pub const fn ptr() -> *const ftm::RegisterBlock {
                $base as *const ftm::RegisterBlock
            }
        }

        impl Deref for $FTMX {
            type Target = ftm::RegisterBlock;

            #[inline(always)]
            fn deref(&self) -> &Self::Target {
                unsafe { &*Self::ptr() }
            }
        }
    };
}

ftm_singleton! {
    /// FTM1, wired to the X-channel quadrature inputs PTA12/PTA13.
    FTM1: 0x4003_9000
}

ftm_singleton! {
    /// FTM2, wired to the Y-channel quadrature inputs PTB18/PTB19.
    FTM2: 0x400B_8000
}

/// The timer peripherals owned by this crate.
pub struct Peripherals {
    /// FTM1, X channel.
    pub ftm1: FTM1,
    /// FTM2, Y channel.
    pub ftm2: FTM2,
}

static PERIPHERALS_TAKEN: AtomicBool = AtomicBool::new(false);

impl Peripherals {
    /// Returns the peripheral singletons the first time it is called, and
    /// `None` on every later call.
    pub fn take() -> Option<Self> {
        if PERIPHERALS_TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(unsafe { Self::steal() })
        }
    }

    /// Unchecked version of [`take`](Self::take).
    ///
    /// # Safety
    ///
    /// May create a second handle to hardware that is already owned
    /// elsewhere; the caller is responsible for not aliasing configuration.
    pub unsafe fn steal() -> Self {
        PERIPHERALS_TAKEN.store(true, Ordering::Release);
        Peripherals {
            ftm1: FTM1 {
                _marker: PhantomData,
            },
            ftm2: FTM2 {
                _marker: PhantomData,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ftm, port, FTM1, FTM2};
    use core::mem::MaybeUninit;
    use core::ptr::addr_of;

    fn offset<T, F>(base: *const T, field: *const F) -> usize {
        field as usize - base as usize
    }

    #[test]
    fn ftm_register_offsets_match_the_k20_memory_map() {
        let block = MaybeUninit::<ftm::RegisterBlock>::uninit();
        let base = block.as_ptr();
        unsafe {
            assert_eq!(offset(base, addr_of!((*base).sc)), 0x00);
            assert_eq!(offset(base, addr_of!((*base).cnt)), 0x04);
            assert_eq!(offset(base, addr_of!((*base).mod_)), 0x08);
            assert_eq!(offset(base, addr_of!((*base).ch[0].csc)), 0x0C);
            assert_eq!(offset(base, addr_of!((*base).ch[0].cv)), 0x10);
            assert_eq!(offset(base, addr_of!((*base).ch[1].csc)), 0x14);
            assert_eq!(offset(base, addr_of!((*base).cntin)), 0x4C);
            assert_eq!(offset(base, addr_of!((*base).mode)), 0x54);
            assert_eq!(offset(base, addr_of!((*base).fms)), 0x74);
            assert_eq!(offset(base, addr_of!((*base).filter)), 0x78);
            assert_eq!(offset(base, addr_of!((*base).qdctrl)), 0x80);
            assert_eq!(offset(base, addr_of!((*base).conf)), 0x84);
        }
    }

    #[test]
    fn ftm_base_addresses() {
        assert_eq!(FTM1::ptr() as usize, 0x4003_9000);
        assert_eq!(FTM2::ptr() as usize, 0x400B_8000);
    }

    #[test]
    fn pcr_encoding_matches_the_wiring() {
        // Alt7 on FTM1 pins, alt6 on FTM2 pins, filtered pulled-down inputs
        assert_eq!(port::pcr_input(7, port::Pull::Down), 0x0712);
        assert_eq!(port::pcr_input(6, port::Pull::Down), 0x0612);
        assert_eq!(port::pcr_input(6, port::Pull::Up), 0x0613);
    }

    #[test]
    fn filter_value_packs_both_phases() {
        assert_eq!(ftm::filter_value(2, 2), 0x22);
        assert_eq!(ftm::filter_value(0xF, 0x1), 0x1F);
        // out-of-range values are truncated to the 4-bit fields
        assert_eq!(ftm::filter_value(0x12, 0), 0x02);
    }

    #[test]
    fn quadrature_control_bits() {
        let qdctrl = ftm::QdCtrl::PHAFLTREN | ftm::QdCtrl::PHBFLTREN | ftm::QdCtrl::QUADEN;
        assert_eq!(qdctrl.bits(), 0b1100_0001);
        assert_eq!((ftm::Mode::WPDIS | ftm::Mode::FTMEN).bits(), 0x05);
        assert_eq!(ftm::Fms::WPEN.bits(), 0x40);
    }

    #[test]
    fn peripherals_can_only_be_taken_once() {
        let first = super::Peripherals::take();
        assert!(first.is_some());
        assert!(super::Peripherals::take().is_none());
    }
}
