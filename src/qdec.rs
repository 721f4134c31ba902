/*!
  # Quadrature decoder

  Configures a FlexTimer module as a hardware quadrature decoder: the timer
  counts encoder edges in silicon, in both directions, with a glitch filter
  on each phase input, and software only ever reads or rewrites the counter.

  The two decodable timers are wired to fixed pin pairs:

  | Channel | Timer | Phase A | Phase B | Pin mux |
  |:-------:|:-----:|:-------:|:-------:|:-------:|
  |    X    | FTM1  |  PTA12  |  PTA13  |  ALT7   |
  |    Y    | FTM2  |  PTB18  |  PTB19  |  ALT6   |

  The counter is 16 bits wide and free-running: it wraps modulo 65536 in
  hardware, so positions read as `i16` and a caller tracking longer travels
  compares successive reads with wrapping arithmetic.
*/
use embedded_hal_02 as hal;
pub use hal::Direction;

use crate::pac::ftm::{self, Fms, Mode, QdCtrl};
use crate::pac::{self, port, sim};

pub use crate::pac::port::Pull;

use self::sealed::Registers;

mod sealed {
    use crate::pac::ftm;
    use crate::pac::port::Pull;

    /// Register-level access to one FTM quadrature timer.
    ///
    /// The configuration sequence is written against this trait so the unit
    /// tests can substitute a behavioral model of the peripheral and observe
    /// the write-protect gating that real hardware enforces silently.
    pub trait Registers {
        /// Opens the SIM clock gates for the timer and its input port.
        fn enable_clocks(&self);
        /// Programs both phase-input pin control registers.
        fn configure_pins(&self, pull: Pull);
        fn read_cnt(&self) -> u16;
        /// Any write to `CNT` loads the counter from `CNTIN`.
        fn write_cnt(&self, value: u16);
        fn write_mod(&self, value: u16);
        fn write_cntin(&self, value: u16);
        fn write_sc(&self, value: u32);
        fn write_c0sc(&self, value: u32);
        fn write_c1sc(&self, value: u32);
        fn write_mode(&self, value: ftm::Mode);
        fn write_fms(&self, value: ftm::Fms);
        fn write_filter(&self, value: u32);
        fn read_qdctrl(&self) -> ftm::QdCtrl;
        fn write_qdctrl(&self, value: ftm::QdCtrl);
    }
}

/// A timer peripheral wired to a quadrature input pair.
pub trait Instance: sealed::Registers {}

macro_rules! hal {
    ($FTMX:ty: $PORT:ident, $pha:literal, $phb:literal, alt: $alt:literal, gates: [$($gate:ident),+]) => {
        impl sealed::Registers for $FTMX {
            fn enable_clocks(&self) {
                $(sim::ClockGate::$gate.enable();)+
            }

            fn configure_pins(&self, pull: Pull) {
                let pcr = port::pcr_input($alt, pull);
                let regs = unsafe { &*port::$PORT };
                regs.pcr[$pha].set(pcr);
                regs.pcr[$phb].set(pcr);
            }

            fn read_cnt(&self) -> u16 {
                self.cnt.get() as u16
            }

            fn write_cnt(&self, value: u16) {
                self.cnt.set(value.into());
            }

            fn write_mod(&self, value: u16) {
                self.mod_.set(value.into());
            }

            fn write_cntin(&self, value: u16) {
                self.cntin.set(value.into());
            }

            fn write_sc(&self, value: u32) {
                self.sc.set(value);
            }

            fn write_c0sc(&self, value: u32) {
                self.ch[0].csc.set(value);
            }

            fn write_c1sc(&self, value: u32) {
                self.ch[1].csc.set(value);
            }

            fn write_mode(&self, value: Mode) {
                self.mode.set(value.bits());
            }

            fn write_fms(&self, value: Fms) {
                self.fms.set(value.bits());
            }

            fn write_filter(&self, value: u32) {
                self.filter.set(value);
            }

            fn read_qdctrl(&self) -> QdCtrl {
                QdCtrl::from_bits_truncate(self.qdctrl.get())
            }

            fn write_qdctrl(&self, value: QdCtrl) {
                self.qdctrl.set(value.bits());
            }
        }

        impl Instance for $FTMX {}
    };
}

hal!(pac::FTM1: PORTA, 12, 13, alt: 7, gates: [Ftm1, PortA]);
hal!(pac::FTM2: PORTB, 18, 19, alt: 6, gates: [Ftm2, PortB]);

/// Decode polarity of one phase input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Count on the signal as wired.
    Normal,
    /// Invert the signal before decoding; swaps the counting direction
    /// relative to the other phase.
    Inverted,
}

/// Quadrature decoder options, fixed at construction.
///
/// The `Default` configuration decodes a directly-wired encoder: both phases
/// at normal polarity, inputs pulled down, and a filter value of 2 so that
/// transitions shorter than 8 peripheral clock cycles (contact bounce,
/// coupling spikes) never reach the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QdecOptions {
    /// Phase A decode polarity.
    pub phase_a: Polarity,
    /// Phase B decode polarity.
    pub phase_b: Polarity,
    /// Input filter value for both phases, `0..=15` in units of 4
    /// peripheral clock cycles. 0 disables the filter stage.
    pub filter: u8,
    /// Idle bias for the phase inputs.
    pub pull: Pull,
}

impl Default for QdecOptions {
    fn default() -> Self {
        Self {
            phase_a: Polarity::Normal,
            phase_b: Polarity::Normal,
            filter: 2,
            pull: Pull::Down,
        }
    }
}

/// One hardware quadrature decoder channel.
///
/// Owns its timer peripheral and, through the fixed wiring, the two phase
/// input pins, for the life of the value. The timer counts autonomously once
/// configured; [`read`](Self::read) and [`reset`](Self::reset) are single
/// register accesses with no locking of their own.
pub struct Qdec<FTM: Instance> {
    ftm: FTM,
    options: QdecOptions,
}

impl<FTM: Instance> Qdec<FTM> {
    /// Associates a timer with its quadrature inputs.
    ///
    /// No hardware is touched until [`configure`](Self::configure) runs.
    pub fn new(ftm: FTM, options: QdecOptions) -> Self {
        Self { ftm, options }
    }

    /// Brings the timer from any previous state into quadrature decode mode.
    ///
    /// The peripheral gates its control registers behind a write-protect
    /// latch, so the order here is mandatory, not cosmetic: a reordered
    /// sequence produces silently ignored writes and a counter that never
    /// moves.
    ///
    /// 1. Open the clock gates for the timer and its input port.
    /// 2. Pin mux to the quadrature function, passive filter on, pull
    ///    resistor per the options.
    /// 3. Unlock: `WPDIS` first (clears the `WPEN` latch), then
    ///    `WPDIS | FTMEN` to open the FTM-specific register space.
    /// 4. Zero the mode, control and channel-compare registers, whatever
    ///    earlier startup code left in them.
    /// 5. Program the decode parameters: per-phase filters, reload value
    ///    zero, modulo 0xFFFF for free-running wraparound, and a `CNT`
    ///    write to load the counter from the reload value.
    /// 6. Enable quadrature mode, both phase filters and the configured
    ///    polarities in one `QDCTRL` write.
    /// 7. Restore write protection.
    ///
    /// Re-running the sequence is allowed and leaves the peripheral in the
    /// same state, with the counter back at zero.
    pub fn configure(&mut self) {
        self.ftm.enable_clocks();
        self.ftm.configure_pins(self.options.pull);

        self.ftm.write_mode(Mode::WPDIS);
        self.ftm.write_mode(Mode::WPDIS | Mode::FTMEN);

        self.ftm.write_cnt(0);
        self.ftm.write_mod(0);
        self.ftm.write_c0sc(0);
        self.ftm.write_c1sc(0);
        self.ftm.write_sc(0);

        self.ftm
            .write_filter(ftm::filter_value(self.options.filter, self.options.filter));
        self.ftm.write_cntin(0);
        self.ftm.write_mod(u16::MAX);
        self.ftm.write_cnt(0);

        let mut qdctrl = QdCtrl::PHAFLTREN | QdCtrl::PHBFLTREN | QdCtrl::QUADEN;
        if self.options.phase_a == Polarity::Inverted {
            qdctrl |= QdCtrl::PHAPOL;
        }
        if self.options.phase_b == Polarity::Inverted {
            qdctrl |= QdCtrl::PHBPOL;
        }
        self.ftm.write_qdctrl(qdctrl);

        self.ftm.write_fms(Fms::WPEN);
    }

    /// Current position as a signed count.
    ///
    /// A single register read with no side effects; a count that has wrapped
    /// past the unsigned midpoint reads as negative. The value is an
    /// instantaneous snapshot, the hardware may count again before the
    /// caller looks at it.
    #[inline]
    pub fn read(&self) -> i16 {
        self.ftm.read_cnt() as i16
    }

    /// Forces the counter to `value`; subsequent reads reflect it until the
    /// next encoder edge.
    ///
    /// The counter register loads from `CNTIN` on any write, so the value
    /// goes through `CNTIN` and the reload base is restored to zero
    /// afterwards, keeping the free-running full-range wraparound.
    pub fn reset(&mut self, value: i16) {
        self.ftm.write_cntin(value as u16);
        self.ftm.write_cnt(0);
        self.ftm.write_cntin(0);
    }

    /// Releases the timer peripheral.
    ///
    /// The timer keeps counting in quadrature mode; only the ownership
    /// token is handed back.
    pub fn release(self) -> FTM {
        self.ftm
    }
}

impl<FTM: Instance> hal::Qei for Qdec<FTM> {
    type Count = u16;

    fn count(&self) -> u16 {
        self.ftm.read_cnt()
    }

    fn direction(&self) -> Direction {
        if self.ftm.read_qdctrl().contains(QdCtrl::QUADIR) {
            Direction::Upcounting
        } else {
            Direction::Downcounting
        }
    }
}

/// Extension trait turning an owned timer into its quadrature decoder.
pub trait QdecExt: Instance + Sized {
    /// Consumes the timer and runs the full configuration sequence inside a
    /// critical section, so no other context can observe a half-programmed
    /// timer.
    fn qdec(self, options: QdecOptions) -> Qdec<Self>;
}

impl<FTM: Instance> QdecExt for FTM {
    fn qdec(self, options: QdecOptions) -> Qdec<Self> {
        let mut qdec = Qdec::new(self, options);
        cortex_m::interrupt::free(|_| qdec.configure());
        qdec
    }
}

/// Both encoder channels of the board: X on FTM1, Y on FTM2.
///
/// The channel-to-timer association is a wiring constraint, not a policy
/// choice, so it is fixed here rather than configurable. Construct this
/// once at startup and pass it by reference to whatever polls position.
pub struct QuadDecode {
    /// X encoder, FTM1 on PTA12/PTA13.
    pub x: Qdec<pac::FTM1>,
    /// Y encoder, FTM2 on PTB18/PTB19.
    pub y: Qdec<pac::FTM2>,
}

impl QuadDecode {
    /// Configures both channels with default options.
    pub fn new(p: pac::Peripherals) -> Self {
        Self {
            x: p.ftm1.qdec(QdecOptions::default()),
            y: p.ftm2.qdec(QdecOptions::default()),
        }
    }
}
