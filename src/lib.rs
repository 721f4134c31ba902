//! # Hardware quadrature decoding for Kinetis K20 FTM timers
//!
//! This crate drives the two FlexTimer modules of the K20 family (the
//! MK20DX parts found on Teensy 3.x boards) as hardware quadrature
//! decoders. Each timer counts the edges of one rotary encoder's A/B phase
//! pair entirely in silicon; software reads the 16-bit position counter or
//! forces it to a new value, and nothing else.
//!
//! The decoders implement the [`embedded-hal`] 0.2 `Qei` trait in addition
//! to their native signed interface.
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
//!
//! # Usage
//!
//! Add the crate to a binary project targeting the K20 and enable the `rt`
//! feature if the binary uses `cortex-m-rt`:
//!
//! ```toml
//! [dependencies.kinetis-qdec]
//! version = "0.1.0"
//! features = ["rt"]
//! ```
//!
//! Take the peripheral singletons once at startup and turn each timer into
//! its decoder:
//!
//! ```ignore
//! #![no_std]
//! #![no_main]
//!
//! use panic_semihosting as _;
//!
//! use cortex_m_rt::entry;
//! use kinetis_qdec::{pac, prelude::*, QdecOptions};
//!
//! #[entry]
//! fn main() -> ! {
//!     let p = pac::Peripherals::take().unwrap();
//!
//!     // X encoder on PTA12/PTA13, Y encoder on PTB18/PTB19
//!     let x = p.ftm1.qdec(QdecOptions::default());
//!     let y = p.ftm2.qdec(QdecOptions::default());
//!
//!     loop {
//!         let _position = (x.read(), y.read());
//!     }
//! }
//! ```
//!
//! The counters wrap modulo 65536 and are never stopped; a caller that
//! needs travel beyond 16 bits compares successive reads with wrapping
//! arithmetic at a cadence faster than half a counter period.

#![cfg_attr(not(test), no_std)]

pub mod pac;
pub mod prelude;
pub mod qdec;

pub use crate::qdec::{Polarity, Pull, Qdec, QdecExt, QdecOptions, QuadDecode};
