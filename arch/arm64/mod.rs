//! ARM64 (AArch64) architecture support
//!
//! The boot stage runs on a GIC-400 (GICv2 with the security and
//! virtualization extensions). This module hosts its driver.
//!
//! ## References
//! - [ARM Generic Interrupt Controller Architecture Specification v2](https://developer.arm.com/documentation/ihi0048/latest)
//! - [CoreLink GIC-400 Technical Reference Manual](https://developer.arm.com/documentation/ddi0471/latest)

pub mod interrupt;

pub use interrupt::*;
