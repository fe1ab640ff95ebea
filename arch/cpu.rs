//! CPU utilities
//!
//! Core identity as seen by the interrupt controller.

use core::fmt;

/// Index of a processing element within the cluster (MPIDR_EL1.Aff0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoreId(u32);

impl CoreId {
    /// The core that performs cold boot
    pub const PRIMARY: CoreId = CoreId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_primary(self) -> bool {
        self.0 == Self::PRIMARY.0
    }

    /// Identity of the executing core
    pub fn current() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "aarch64")] {
                use aarch64_cpu::registers::{Readable, MPIDR_EL1};
                Self((MPIDR_EL1.get() & 0xff) as u32)
            } else {
                Self::PRIMARY
            }
        }
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}
