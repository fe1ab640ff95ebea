//! Architecture support
//!
//! The GIC driver only touches the controller through its register accessor,
//! so the `arm64` tree also builds on the host for tests. Instructions that
//! only exist on AArch64 are gated inside.

pub mod arm64;
pub mod cpu;

pub use arm64::*;
pub use cpu::CoreId;
