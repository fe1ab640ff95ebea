//! Register accessor layer
//!
//! Every access the driver makes to the controller goes through
//! [`RegisterIo`]. [`Mmio`] performs real volatile bus transactions; tests
//! substitute a simulated register file.

use core::ptr::NonNull;
use volatile::VolatilePtr;

/// Sized reads and writes at physical addresses.
///
/// Implementations perform exactly one bus transaction per call and never
/// validate the address.
pub trait RegisterIo {
    /// Read a byte
    fn read8(&self, addr: u64) -> u8;
    /// Write a byte
    fn write8(&self, addr: u64, value: u8);
    /// Read a halfword
    fn read16(&self, addr: u64) -> u16;
    /// Write a halfword
    fn write16(&self, addr: u64, value: u16);
    /// Read a word
    fn read32(&self, addr: u64) -> u32;
    /// Write a word
    fn write32(&self, addr: u64, value: u32);

    /// Read-modify-write of a word. Not atomic with respect to other bus masters.
    #[inline]
    fn modify32<F: FnOnce(u32) -> u32>(&self, addr: u64, f: F) {
        let old = self.read32(addr);
        self.write32(addr, f(old));
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    #[inline]
    fn read8(&self, addr: u64) -> u8 {
        (**self).read8(addr)
    }
    #[inline]
    fn write8(&self, addr: u64, value: u8) {
        (**self).write8(addr, value)
    }
    #[inline]
    fn read16(&self, addr: u64) -> u16 {
        (**self).read16(addr)
    }
    #[inline]
    fn write16(&self, addr: u64, value: u16) {
        (**self).write16(addr, value)
    }
    #[inline]
    fn read32(&self, addr: u64) -> u32 {
        (**self).read32(addr)
    }
    #[inline]
    fn write32(&self, addr: u64, value: u32) {
        (**self).write32(addr, value)
    }
}

/// Volatile device-memory access.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create the hardware accessor.
    ///
    /// # Safety
    ///
    /// Every address later handed to this accessor must be mapped as device
    /// memory and belong to the GIC window.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    unsafe fn ptr<'a, T: Copy>(addr: u64) -> VolatilePtr<'a, T> {
        VolatilePtr::new(NonNull::new_unchecked(addr as usize as *mut T))
    }
}

impl RegisterIo for Mmio {
    #[inline]
    fn read8(&self, addr: u64) -> u8 {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u8>(addr).read() }
    }

    #[inline]
    fn write8(&self, addr: u64, value: u8) {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u8>(addr).write(value) }
    }

    #[inline]
    fn read16(&self, addr: u64) -> u16 {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u16>(addr).read() }
    }

    #[inline]
    fn write16(&self, addr: u64, value: u16) {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u16>(addr).write(value) }
    }

    #[inline]
    fn read32(&self, addr: u64) -> u32 {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u32>(addr).read() }
    }

    #[inline]
    fn write32(&self, addr: u64, value: u32) {
        // SAFETY: address validity is the contract of `Mmio::new`.
        unsafe { Self::ptr::<u32>(addr).write(value) }
    }
}

/// Word address and bit position of a one-bit-per-interrupt field.
#[inline]
pub const fn bit_field(reg: u64, id: u32) -> (u64, u32) {
    (reg + ((id >> 5) as u64) * 4, id & 0x1f)
}

/// Byte address of a one-byte-per-interrupt field.
#[inline]
pub const fn byte_field(reg: u64, id: u32) -> u64 {
    reg + id as u64
}

/// Word address and bit shift of a two-bits-per-interrupt field.
#[inline]
pub const fn pair_field(reg: u64, id: u32) -> (u64, u32) {
    (reg + ((id >> 4) as u64) * 4, (id & 0xf) * 2)
}
