//! GIC CPU interface
//!
//! Banked per core: a handle is only meaningful on the core it was created
//! for, so it is neither `Send` nor `Sync`.

use core::marker::PhantomData;

use tock_registers::LocalRegisterCopy;

use super::mmio::RegisterIo;
use super::regs::{gicc, GICC_CTLR, GICC_IAR};
use super::runtime::{eoi_value, IntId};
use crate::arch::cpu::CoreId;

/// Priority mask that lets every priority through
pub const PMR_ACCEPT_ALL: u8 = 0xFF;

/// GIC CPU Interface state
pub struct CpuInterface<'g, R: RegisterIo> {
    io: &'g R,
    base: u64,
    core: CoreId,
    _not_send: PhantomData<*const ()>,
}

impl<'g, R: RegisterIo> CpuInterface<'g, R> {
    pub fn new(io: &'g R, base: u64, core: CoreId) -> Self {
        Self {
            io,
            base,
            core,
            _not_send: PhantomData,
        }
    }

    pub fn core(&self) -> CoreId {
        self.core
    }

    pub fn base_addr(&self) -> u64 {
        self.base
    }

    #[inline]
    fn read_reg(&self, offset: u64) -> u32 {
        self.io.read32(self.base + offset)
    }

    #[inline]
    fn write_reg(&self, offset: u64, value: u32) {
        self.io.write32(self.base + offset, value);
    }

    /// Bring up this core's interface.
    ///
    /// Opens the priority mask, forwards group 1, disables the legacy bypass
    /// paths of both groups and selects split priority drop and
    /// deactivation. FIQEn stays clear.
    pub fn init(&self) {
        log::debug!("Enabling GIC CPU interface at {:#x} on {}", self.base, self.core);
        self.set_priority_mask(PMR_ACCEPT_ALL);

        let mut ctlr = LocalRegisterCopy::<u32, GICC_CTLR::Register>::new(self.ctlr());
        ctlr.modify(
            GICC_CTLR::EnableGrp1::SET
                + GICC_CTLR::FIQBypDisGrp0::SET
                + GICC_CTLR::IRQBypDisGrp0::SET
                + GICC_CTLR::FIQBypDisGrp1::SET
                + GICC_CTLR::IRQBypDisGrp1::SET
                + GICC_CTLR::EOImodeNS::SET
                + GICC_CTLR::FIQEn::CLEAR,
        );
        self.set_ctlr(ctlr.get());
    }

    pub fn ctlr(&self) -> u32 {
        self.read_reg(gicc::CTLR)
    }

    pub fn set_ctlr(&self, value: u32) {
        self.write_reg(gicc::CTLR, value);
    }

    pub fn priority_mask(&self) -> u8 {
        (self.read_reg(gicc::PMR) & 0xFF) as u8
    }

    pub fn set_priority_mask(&self, mask: u8) {
        self.write_reg(gicc::PMR, mask as u32);
    }

    pub fn binary_point(&self) -> u8 {
        (self.read_reg(gicc::BPR) & 0x7) as u8
    }

    pub fn set_binary_point(&self, bpr: u8) {
        self.write_reg(gicc::BPR, (bpr & 0x7) as u32);
    }

    pub fn running_priority(&self) -> u8 {
        (self.read_reg(gicc::RPR) & 0xFF) as u8
    }

    /// Highest priority pending interrupt, without acknowledging it
    pub fn hppir(&self) -> u32 {
        self.read_reg(gicc::HPPIR)
    }

    /// Aliased (group 1) highest priority pending interrupt
    pub fn ahppir(&self) -> u32 {
        self.read_reg(gicc::AHPPIR)
    }

    pub fn iidr(&self) -> u32 {
        self.read_reg(gicc::IIDR)
    }

    /// Raw GICC_IAR read. Acknowledges the interrupt.
    #[inline]
    pub fn acknowledge(&self) -> u32 {
        self.read_reg(gicc::IAR)
    }

    #[inline]
    pub fn read_ack_id(&self) -> IntId {
        let iar = LocalRegisterCopy::<u32, GICC_IAR::Register>::new(self.acknowledge());
        IntId::new_unchecked(iar.read(GICC_IAR::InterruptID))
    }

    /// End of interrupt (priority drop).
    #[inline]
    pub fn ack(&self, id: IntId) {
        self.write_reg(gicc::EOIR, eoi_value(self.core, id));
    }

    #[inline]
    pub fn deactivate(&self, id: IntId) {
        self.write_reg(gicc::DIR, eoi_value(self.core, id));
    }
}
