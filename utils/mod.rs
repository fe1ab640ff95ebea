//! Utility functions
//!
//! Alignment helpers and the memory barriers bring-up needs between
//! programming the controller and letting interrupts through.

#[macro_export]
macro_rules! is_aligned {
    ($addr:expr, $align:expr) => {
        $addr % $align == 0
    };
}

/// Full system data synchronization barrier
#[inline]
pub fn dsb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            use aarch64_cpu::asm::barrier;
            #[allow(unused_unsafe)]
            unsafe { barrier::dsb(barrier::SY) };
        } else {
            core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// Instruction synchronization barrier
#[inline]
pub fn isb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            use aarch64_cpu::asm::barrier;
            #[allow(unused_unsafe)]
            unsafe { barrier::isb(barrier::SY) };
        } else {
            core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}
