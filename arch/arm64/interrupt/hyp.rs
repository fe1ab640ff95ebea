//! GIC virtualization extensions
//!
//! GICH is the hypervisor's control frame for the executing core: list
//! registers, maintenance status and the saved virtual CPU interface state.
//! GICV is the frame a guest sees as its CPU interface.
//! Reference: ARM IHI 0048B, chapter 5

use core::marker::PhantomData;

use tock_registers::LocalRegisterCopy;

use super::gic::IrqGroup;
use super::mmio::RegisterIo;
use super::regs::{gich, gicv, GICH_HCR, GICH_LR, GICH_VTR};
use super::runtime::IntId;
use super::{GicError, Result};

/// List register state field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrState {
    Invalid,
    Pending,
    Active,
    PendingActive,
}

impl LrState {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => LrState::Invalid,
            1 => LrState::Pending,
            2 => LrState::Active,
            _ => LrState::PendingActive,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            LrState::Invalid => 0,
            LrState::Pending => 1,
            LrState::Active => 2,
            LrState::PendingActive => 3,
        }
    }
}

/// Decoded GICH_LR value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRegister(u32);

impl ListRegister {
    /// A free slot
    pub const EMPTY: ListRegister = ListRegister(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn build(virtual_id: u32, physical: u32, priority: u8, group: IrqGroup, hw: bool) -> Self {
        let mut lr = LocalRegisterCopy::<u32, GICH_LR::Register>::new(0);
        lr.write(
            GICH_LR::VirtualID.val(virtual_id)
                + GICH_LR::PhysicalID.val(physical)
                + GICH_LR::Priority.val((priority >> 3) as u32)
                + GICH_LR::State.val(LrState::Pending.bits())
                + GICH_LR::Grp1.val((group == IrqGroup::NonSecure) as u32)
                + GICH_LR::HW.val(hw as u32),
        );
        Self(lr.get())
    }

    /// Pending software interrupt. The guest's EOI is not forwarded.
    pub fn software(virtual_id: IntId, priority: u8, group: IrqGroup) -> Self {
        Self::build(virtual_id.get(), 0, priority, group, false)
    }

    /// Pending interrupt backed by physical interrupt `physical`; the
    /// guest's deactivation also deactivates the physical one.
    pub fn hardware(virtual_id: IntId, physical: IntId, priority: u8, group: IrqGroup) -> Self {
        Self::build(virtual_id.get(), physical.get(), priority, group, true)
    }

    fn field(self) -> LocalRegisterCopy<u32, GICH_LR::Register> {
        LocalRegisterCopy::new(self.0)
    }

    pub fn virtual_id(self) -> u32 {
        self.field().read(GICH_LR::VirtualID)
    }

    pub fn physical_id(self) -> u32 {
        self.field().read(GICH_LR::PhysicalID)
    }

    /// Priority with the unimplemented low bits as zero
    pub fn priority(self) -> u8 {
        (self.field().read(GICH_LR::Priority) << 3) as u8
    }

    pub fn state(self) -> LrState {
        LrState::from_bits(self.field().read(GICH_LR::State))
    }

    pub fn group(self) -> IrqGroup {
        IrqGroup::from_bit(self.field().is_set(GICH_LR::Grp1))
    }

    pub fn is_hw(self) -> bool {
        self.field().is_set(GICH_LR::HW)
    }
}

/// GIC Hypervisor Interface of the executing core
pub struct HypInterface<'g, R: RegisterIo> {
    io: &'g R,
    base: u64,
    lr_count: u32,
    _not_send: PhantomData<*const ()>,
}

impl<'g, R: RegisterIo> HypInterface<'g, R> {
    /// Attach to the frame at `base`, sizing the list registers from GICH_VTR.
    pub fn new(io: &'g R, base: u64) -> Self {
        let vtr = LocalRegisterCopy::<u32, GICH_VTR::Register>::new(io.read32(base + gich::VTR));
        Self {
            io,
            base,
            lr_count: vtr.read(GICH_VTR::ListRegs) + 1,
            _not_send: PhantomData,
        }
    }

    pub fn base_addr(&self) -> u64 {
        self.base
    }

    /// Implemented list registers
    pub fn lr_count(&self) -> u32 {
        self.lr_count
    }

    #[inline]
    fn read_reg(&self, offset: u64) -> u32 {
        self.io.read32(self.base + offset)
    }

    #[inline]
    fn write_reg(&self, offset: u64, value: u32) {
        self.io.write32(self.base + offset, value);
    }

    /// Clear every list register and request a maintenance interrupt when
    /// the guest EOIs an interrupt with no list register entry.
    pub fn init(&self) {
        log::debug!(
            "Enabling GIC hypervisor interface at {:#x}, {} list registers",
            self.base,
            self.lr_count
        );
        for index in 0..self.lr_count {
            self.write_reg(gich::LR0 + index as u64 * 4, 0);
        }
        let mut hcr = LocalRegisterCopy::<u32, GICH_HCR::Register>::new(self.hcr());
        hcr.modify(GICH_HCR::LRENPIE::SET);
        self.set_hcr(hcr.get());
    }

    pub fn hcr(&self) -> u32 {
        self.read_reg(gich::HCR)
    }

    pub fn set_hcr(&self, value: u32) {
        self.write_reg(gich::HCR, value);
    }

    pub fn vtr(&self) -> u32 {
        self.read_reg(gich::VTR)
    }

    pub fn vmcr(&self) -> u32 {
        self.read_reg(gich::VMCR)
    }

    pub fn set_vmcr(&self, value: u32) {
        self.write_reg(gich::VMCR, value);
    }

    /// Maintenance interrupt status
    pub fn misr(&self) -> u32 {
        self.read_reg(gich::MISR)
    }

    pub fn apr(&self) -> u32 {
        self.read_reg(gich::APR)
    }

    pub fn set_apr(&self, value: u32) {
        self.write_reg(gich::APR, value);
    }

    /// Both 32-bit halves of a status pair; the upper one only exists past
    /// 32 list registers.
    fn status_pair(&self, lo: u64, hi: u64) -> u64 {
        let mut value = self.read_reg(lo) as u64;
        if self.lr_count > 32 {
            value |= (self.read_reg(hi) as u64) << 32;
        }
        value
    }

    /// List registers whose interrupt was EOIed by the guest
    pub fn eisr(&self) -> u64 {
        self.status_pair(gich::EISR0, gich::EISR1)
    }

    /// List registers with no live entry
    pub fn elrsr(&self) -> u64 {
        self.status_pair(gich::ELRSR0, gich::ELRSR1)
    }

    fn check_index(&self, index: u32) -> Result<u64> {
        if index < self.lr_count {
            Ok(gich::LR0 + index as u64 * 4)
        } else {
            Err(GicError::ListRegisterOutOfRange {
                index,
                count: self.lr_count,
            })
        }
    }

    /// Out-of-range indices fail without a bus access.
    pub fn read_lr(&self, index: u32) -> Result<u32> {
        let offset = self.check_index(index)?;
        Ok(self.read_reg(offset))
    }

    /// Out-of-range indices fail without a bus access.
    pub fn write_lr(&self, index: u32, value: u32) -> Result<()> {
        let offset = self.check_index(index)?;
        self.write_reg(offset, value);
        Ok(())
    }

    pub fn list_register(&self, index: u32) -> Result<ListRegister> {
        self.read_lr(index).map(ListRegister::from_raw)
    }

    /// Place `lr` in the lowest empty list register and return its index.
    pub fn inject(&self, lr: ListRegister) -> Result<u32> {
        let free = self.elrsr();
        let index = free.trailing_zeros();
        if index >= self.lr_count || index >= 64 {
            log::debug!("No empty list register for virtual id {}", lr.virtual_id());
            return Err(GicError::NoEmptyListRegister);
        }
        self.write_lr(index, lr.raw())?;
        Ok(index)
    }

    /// Clear list register `index`, returning what it held.
    pub fn withdraw(&self, index: u32) -> Result<ListRegister> {
        let old = self.list_register(index)?;
        self.write_lr(index, ListRegister::EMPTY.raw())?;
        Ok(old)
    }
}

/// GIC Virtual CPU Interface, as mapped for a guest
pub struct VirtualCpuInterface<'g, R: RegisterIo> {
    io: &'g R,
    base: u64,
    _not_send: PhantomData<*const ()>,
}

impl<'g, R: RegisterIo> VirtualCpuInterface<'g, R> {
    pub fn new(io: &'g R, base: u64) -> Self {
        Self {
            io,
            base,
            _not_send: PhantomData,
        }
    }

    pub fn base_addr(&self) -> u64 {
        self.base
    }

    pub fn ctlr(&self) -> u32 {
        self.io.read32(self.base + gicv::CTLR)
    }

    pub fn set_ctlr(&self, value: u32) {
        self.io.write32(self.base + gicv::CTLR, value);
    }

    pub fn priority_mask(&self) -> u8 {
        self.io.read32(self.base + gicv::PMR) as u8
    }

    pub fn set_priority_mask(&self, mask: u8) {
        self.io.write32(self.base + gicv::PMR, mask as u32);
    }

    pub fn acknowledge(&self) -> u32 {
        self.io.read32(self.base + gicv::IAR)
    }

    pub fn end_of_interrupt(&self, value: u32) {
        self.io.write32(self.base + gicv::EOIR, value);
    }

    pub fn hppir(&self) -> u32 {
        self.io.read32(self.base + gicv::HPPIR)
    }

    pub fn deactivate(&self, value: u32) {
        self.io.write32(self.base + gicv::DIR, value);
    }
}
