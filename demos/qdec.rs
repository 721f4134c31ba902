//! Polls both hardware quadrature channels and prints the per-second deltas

#![no_main]
#![no_std]

use panic_semihosting as _;

use cortex_m_semihosting::hprintln;

use cortex_m_rt::entry;
use kinetis_qdec::{pac, prelude::*, QdecOptions};

#[entry]
fn main() -> ! {
    let p = pac::Peripherals::take().unwrap();

    // X encoder on PTA12/PTA13
    let x = p.ftm1.qdec(QdecOptions::default());
    // Y encoder on PTB18/PTB19
    let y = p.ftm2.qdec(QdecOptions::default());

    let mut last = (x.read(), y.read());

    loop {
        // roughly one second at the 72 MHz core clock
        cortex_m::asm::delay(72_000_000);

        let now = (x.read(), y.read());
        hprintln!(
            "x {} y {}",
            now.0.wrapping_sub(last.0),
            now.1.wrapping_sub(last.1)
        );
        last = now;
    }
}
