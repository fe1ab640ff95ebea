//! Interrupt controller support for ARM64
//!
//! GICv2 distributor, CPU interface and hypervisor interface bring-up, the
//! secure/non-secure interrupt partition, and the per-interrupt runtime
//! protocol used by the platform trap handler.

use core::fmt;

/// Register accessor layer
pub mod mmio;

/// Register offsets and bit fields
pub mod regs;

/// Distributor and top-level controller handle
pub mod gic;

/// Per-core CPU interface
pub mod cpu_interface;

/// Hypervisor and virtual CPU interfaces
pub mod hyp;

/// Interrupt property table and secure group passes
pub mod props;

/// Cold and warm boot sequencing
pub mod boot;

/// Interrupt ids and runtime operations
pub mod runtime;

/// Numbered command table
pub mod callout;

#[cfg(test)]
pub(crate) mod sim;

// Re-export commonly used types
pub use boot::DistributorInitToken;
pub use callout::{Callout, Command};
pub use cpu_interface::CpuInterface;
pub use gic::{CpuTargets, Distributor, Gic, IrqGroup, TriggerMode};
pub use hyp::{HypInterface, ListRegister, LrState, VirtualCpuInterface};
pub use mmio::{Mmio, RegisterIo};
pub use props::{InterruptProperty, InterruptPropertyTable};
pub use regs::GicLayout;
pub use runtime::{is_private, is_sgi, CoreGic, IntId, IntKind, TargetFilter};

/// Interrupt controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicError {
    /// Interrupt id outside [0, 1020)
    InvalidIntId(u32),
    /// SGI id outside [0, 16)
    InvalidSgi(u32),
    /// Operation only applies to SGIs and PPIs
    NotPrivate(u32),
    /// List register index past the implemented count
    ListRegisterOutOfRange {
        /// Requested index
        index: u32,
        /// Implemented list registers
        count: u32,
    },
    /// Every list register holds a live entry
    NoEmptyListRegister,
    /// The hypervisor interface was not brought up on this core
    NoHypervisorInterface,
    /// Interrupt id appears twice in a property table
    DuplicateProperty(u32),
    /// Property table capacity exceeded
    PropertyTableFull,
    /// Property table entries describe group 0 interrupts only
    NonSecureProperty(u32),
    /// Group 0 entry with a priority in the non-secure half
    InvalidSecurePriority {
        /// Interrupt id
        id: u32,
        /// Rejected priority
        priority: u8,
    },
    /// PIDR2 does not report a GICv2 distributor
    UnsupportedRevision(u32),
    /// Command code not in the callout table
    UnknownCommand(u32),
}

impl fmt::Display for GicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GicError::InvalidIntId(id) => write!(f, "invalid interrupt id {}", id),
            GicError::InvalidSgi(id) => write!(f, "invalid SGI id {}", id),
            GicError::NotPrivate(id) => write!(f, "interrupt {} is not an SGI or PPI", id),
            GicError::ListRegisterOutOfRange { index, count } => {
                write!(f, "list register {} out of range ({} implemented)", index, count)
            }
            GicError::NoEmptyListRegister => write!(f, "no empty list register"),
            GicError::NoHypervisorInterface => write!(f, "hypervisor interface not initialized"),
            GicError::DuplicateProperty(id) => write!(f, "duplicate property for interrupt {}", id),
            GicError::PropertyTableFull => write!(f, "interrupt property table full"),
            GicError::NonSecureProperty(id) => {
                write!(f, "interrupt {} is not a group 0 property", id)
            }
            GicError::InvalidSecurePriority { id, priority } => {
                write!(f, "secure interrupt {} has non-secure priority {:#x}", id, priority)
            }
            GicError::UnsupportedRevision(rev) => write!(f, "unsupported GIC revision {}", rev),
            GicError::UnknownCommand(code) => write!(f, "unknown callout command {}", code),
        }
    }
}

/// Result type for interrupt controller operations
pub type Result<T> = core::result::Result<T, GicError>;
