//! A1000 GIC - GICv2 interrupt controller driver for the A1000 boot stage
//!
//! Brings up the distributor, the per-core CPU interfaces and the
//! hypervisor interfaces of a GIC-400, splits interrupts into a secure
//! group 0 set and a non-secure group 1 set, and provides the acknowledge /
//! end-of-interrupt / deactivate protocol used by the trap handler.
//!
//! ```ignore
//! let gic = Gic::new(unsafe { Mmio::new() }, config.layout);
//! let core_gic = a1000_gic::init(&gic, &config)?;
//! ```

#![cfg_attr(not(test), no_std)]

// Core modules
#[macro_use]
pub mod utils;
pub mod config;

// Architecture-specific code
pub mod arch;

use core::fmt;

pub use arch::arm64::interrupt::boot::{init, init_on};
pub use arch::arm64::interrupt::{Gic, GicError, Mmio, RegisterIo};
pub use arch::CoreId;
pub use config::{GicConfig, SpiRange};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument
    InvalidArgument,
    /// Inconsistent configuration
    InvalidConfig,
    /// Interrupt controller error
    Gic(GicError),
}

impl From<GicError> for Error {
    fn from(err: GicError) -> Self {
        Error::Gic(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::InvalidConfig => write!(f, "invalid configuration"),
            Error::Gic(err) => write!(f, "GIC: {}", err),
        }
    }
}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;
