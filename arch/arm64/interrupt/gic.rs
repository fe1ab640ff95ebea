//! GIC (Generic Interrupt Controller) driver for ARM64
//!
//! GICv2 distributor plus the [`Gic`] handle that hands out views of the
//! four register frames.
//! Reference: ARM IHI 0048B (GIC architecture specification)

use core::ops::Range;

use tock_registers::LocalRegisterCopy;

use super::boot::DistributorInitToken;
use super::cpu_interface::CpuInterface;
use super::hyp::{HypInterface, VirtualCpuInterface};
use super::mmio::{bit_field, byte_field, pair_field, RegisterIo};
use super::regs::{gicd, GicLayout, GICD_CTLR, GICD_PIDR2, GICD_TYPER};
use super::runtime::{
    is_private, is_sgi, sgir_value, IntId, TargetFilter, MAX_INTID, PRIVATE_END,
};
use super::{GicError, Result};
use crate::arch::cpu::CoreId;

/// Lowest numerical priority reserved for non-secure interrupts
pub const GIC_HIGHEST_NS_PRIORITY: u8 = 0x80;
/// Priority applied by the default configuration sweep
pub const DEFAULT_PRIORITY: u8 = 0x20;
/// Four non-secure default priorities packed into one IPRIORITYR word
pub const DEFAULT_PRIORITY_WORD: u32 = 0x8080_8080;

/// Interrupt group, which doubles as the security state of an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IrqGroup {
    /// Group 0, signalled as FIQ to the secure world
    Secure = 0,
    /// Group 1
    NonSecure = 1,
}

impl IrqGroup {
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            IrqGroup::NonSecure
        } else {
            IrqGroup::Secure
        }
    }

    #[inline]
    pub const fn is_secure(self) -> bool {
        matches!(self, IrqGroup::Secure)
    }
}

/// Interrupt trigger, GICD_ICFGR Int_config[1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    Level,
    Edge,
}

impl TriggerMode {
    /// Two-bit ICFGR encoding
    #[inline]
    pub const fn icfgr_bits(self) -> u32 {
        match self {
            TriggerMode::Level => 0b00,
            TriggerMode::Edge => 0b10,
        }
    }

    #[inline]
    pub const fn from_icfgr_bits(bits: u32) -> Self {
        if bits & 0b10 != 0 {
            TriggerMode::Edge
        } else {
            TriggerMode::Level
        }
    }
}

bitflags::bitflags! {
    /// GICv2 CPU interface mask, as used by ITARGETSR and SGIR
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuTargets: u8 {
        const CPU0 = 1 << 0;
        const CPU1 = 1 << 1;
        const CPU2 = 1 << 2;
        const CPU3 = 1 << 3;
        const CPU4 = 1 << 4;
        const CPU5 = 1 << 5;
        const CPU6 = 1 << 6;
        const CPU7 = 1 << 7;
    }
}

impl CpuTargets {
    /// Mask naming a single CPU interface
    #[inline]
    pub const fn core(core: CoreId) -> Self {
        Self::from_bits_truncate(1u8 << (core.get() & 7))
    }
}

/// GIC controller handle
///
/// Owns the register accessor and the frame layout. Views of the individual
/// frames borrow from it.
#[derive(Debug)]
pub struct Gic<R: RegisterIo> {
    io: R,
    layout: GicLayout,
}

impl<R: RegisterIo> Gic<R> {
    pub fn new(io: R, layout: GicLayout) -> Self {
        Self { io, layout }
    }

    pub fn layout(&self) -> &GicLayout {
        &self.layout
    }

    pub fn io(&self) -> &R {
        &self.io
    }

    /// Shared distributor
    pub fn distributor(&self) -> Distributor<'_, R> {
        Distributor::new(&self.io, self.layout.gicd())
    }

    /// CPU interface as seen from `core`. Only valid on that core.
    pub fn cpu_interface(&self, core: CoreId) -> CpuInterface<'_, R> {
        CpuInterface::new(&self.io, self.layout.gicc(), core)
    }

    /// Hypervisor interface control of the executing core.
    pub fn hyp_interface(&self) -> HypInterface<'_, R> {
        HypInterface::new(&self.io, self.layout.gich())
    }

    /// Virtual CPU interface of the executing core.
    pub fn virtual_cpu_interface(&self) -> VirtualCpuInterface<'_, R> {
        VirtualCpuInterface::new(&self.io, self.layout.gicv())
    }
}

/// GIC Distributor
///
/// Private ids (0-31) are banked, so their fields address the calling core's
/// copy. Everything else is shared by all cores.
pub struct Distributor<'g, R: RegisterIo> {
    io: &'g R,
    base: u64,
}

impl<R: RegisterIo> Clone for Distributor<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RegisterIo> Copy for Distributor<'_, R> {}

impl<'g, R: RegisterIo> Distributor<'g, R> {
    pub fn new(io: &'g R, base: u64) -> Self {
        Self { io, base }
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

    #[inline]
    fn read_bit(&self, reg: u64, id: IntId) -> bool {
        let (offset, bit) = bit_field(reg, id.get());
        self.read_reg(offset) & (1 << bit) != 0
    }

    /// Single-bit write to a write-1-to-set/clear register
    #[inline]
    fn write_bit(&self, reg: u64, id: IntId) {
        let (offset, bit) = bit_field(reg, id.get());
        self.write_reg(offset, 1 << bit);
    }

    // ---------------------------------------------------------------------
    // Whole registers
    // ---------------------------------------------------------------------

    pub fn ctlr(&self) -> u32 {
        self.read_reg(gicd::CTLR)
    }

    pub fn set_ctlr(&self, value: u32) {
        self.write_reg(gicd::CTLR, value);
    }

    pub fn typer(&self) -> u32 {
        self.read_reg(gicd::TYPER)
    }

    pub fn iidr(&self) -> u32 {
        self.read_reg(gicd::IIDR)
    }

    pub fn pidr2(&self) -> u32 {
        self.read_reg(gicd::PIDR2)
    }

    /// Architecture revision from PIDR2
    pub fn arch_revision(&self) -> u32 {
        LocalRegisterCopy::<u32, GICD_PIDR2::Register>::new(self.pidr2()).read(GICD_PIDR2::ArchRev)
    }

    /// Fails unless the distributor reports GICv2.
    pub fn check_revision(&self) -> Result<()> {
        match self.arch_revision() {
            2 => Ok(()),
            rev => Err(GicError::UnsupportedRevision(rev)),
        }
    }

    /// Implemented interrupt lines, including the 32 private ids
    pub fn num_interrupts(&self) -> u32 {
        let typer = LocalRegisterCopy::<u32, GICD_TYPER::Register>::new(self.typer());
        let lines = (typer.read(GICD_TYPER::ITLinesNumber) + 1) * 32;
        lines.min(MAX_INTID)
    }

    /// Implemented CPU interfaces
    pub fn num_cpus(&self) -> u32 {
        LocalRegisterCopy::<u32, GICD_TYPER::Register>::new(self.typer()).read(GICD_TYPER::CPUNumber) + 1
    }

    /// CPU interface mask of the reading core.
    ///
    /// ITARGETSR0-7 are read-only and return the reader's own interface.
    pub fn cpuif_id(&self) -> CpuTargets {
        CpuTargets::from_bits_truncate(self.io.read8(byte_field(self.base + gicd::ITARGETSR, 0)))
    }

    /// Clear both group enables before bulk reconfiguration.
    pub fn disable_forwarding(&self, _token: &DistributorInitToken) {
        log::debug!("Disabling GIC distributor at {:#x}", self.base);
        let mut ctlr = LocalRegisterCopy::<u32, GICD_CTLR::Register>::new(self.ctlr());
        ctlr.modify(GICD_CTLR::EnableGrp0::CLEAR + GICD_CTLR::EnableGrp1::CLEAR);
        self.set_ctlr(ctlr.get());
    }

    /// Resume forwarding of group 0 interrupts.
    pub fn enable_group0(&self, _token: &DistributorInitToken) {
        log::debug!("Enabling GIC distributor group 0 at {:#x}", self.base);
        let mut ctlr = LocalRegisterCopy::<u32, GICD_CTLR::Register>::new(self.ctlr());
        ctlr.modify(GICD_CTLR::EnableGrp0::SET);
        self.set_ctlr(ctlr.get());
    }

    // ---------------------------------------------------------------------
    // Per-interrupt fields
    // ---------------------------------------------------------------------

    pub fn group(&self, id: IntId) -> IrqGroup {
        IrqGroup::from_bit(self.read_bit(gicd::IGROUPR, id))
    }

    /// IGROUPR is read/write, so this is a read-modify-write.
    pub fn set_group(&self, id: IntId, group: IrqGroup) {
        let (offset, bit) = bit_field(gicd::IGROUPR, id.get());
        self.io.modify32(self.base + offset, |v| match group {
            IrqGroup::Secure => v & !(1 << bit),
            IrqGroup::NonSecure => v | (1 << bit),
        });
    }

    pub fn enable(&self, id: IntId) {
        self.write_bit(gicd::ISENABLER, id);
    }

    pub fn disable(&self, id: IntId) {
        self.write_bit(gicd::ICENABLER, id);
    }

    pub fn is_enabled(&self, id: IntId) -> bool {
        self.read_bit(gicd::ISENABLER, id)
    }

    pub fn set_pending(&self, id: IntId) {
        self.write_bit(gicd::ISPENDR, id);
    }

    pub fn clear_pending(&self, id: IntId) {
        self.write_bit(gicd::ICPENDR, id);
    }

    pub fn is_pending(&self, id: IntId) -> bool {
        self.read_bit(gicd::ISPENDR, id)
    }

    pub fn set_active(&self, id: IntId) {
        self.write_bit(gicd::ISACTIVER, id);
    }

    pub fn clear_active(&self, id: IntId) {
        self.write_bit(gicd::ICACTIVER, id);
    }

    pub fn is_active(&self, id: IntId) -> bool {
        self.read_bit(gicd::ISACTIVER, id)
    }

    pub fn priority(&self, id: IntId) -> u8 {
        self.io.read8(byte_field(self.base + gicd::IPRIORITYR, id.get()))
    }

    /// Byte write, the neighbouring ids in the word are untouched.
    pub fn set_priority(&self, id: IntId, priority: u8) {
        self.io.write8(byte_field(self.base + gicd::IPRIORITYR, id.get()), priority);
    }

    pub fn target(&self, id: IntId) -> CpuTargets {
        CpuTargets::from_bits_truncate(self.io.read8(byte_field(self.base + gicd::ITARGETSR, id.get())))
    }

    /// Targets of ids below 32 are read-only; writes to them are ignored by hardware.
    pub fn set_target(&self, id: IntId, targets: CpuTargets) {
        self.io.write8(byte_field(self.base + gicd::ITARGETSR, id.get()), targets.bits());
    }

    pub fn trigger(&self, id: IntId) -> TriggerMode {
        let (offset, shift) = pair_field(gicd::ICFGR, id.get());
        TriggerMode::from_icfgr_bits((self.read_reg(offset) >> shift) & 0b11)
    }

    /// Read-modify-write of the two-bit Int_config field.
    pub fn set_trigger(&self, id: IntId, trigger: TriggerMode) {
        let (offset, shift) = pair_field(gicd::ICFGR, id.get());
        self.io.modify32(self.base + offset, |v| {
            (v & !(0b11 << shift)) | (trigger.icfgr_bits() << shift)
        });
    }

    // ---------------------------------------------------------------------
    // Whole-word access
    // ---------------------------------------------------------------------

    pub fn read_group_word(&self, n: u32) -> u32 {
        self.read_reg(gicd::IGROUPR + n as u64 * 4)
    }

    pub fn read_enable_word(&self, n: u32) -> u32 {
        self.read_reg(gicd::ISENABLER + n as u64 * 4)
    }

    /// Write IGROUPR`n`. A set bit selects group 1.
    pub fn write_group_word(&self, n: u32, mask: u32) {
        self.write_reg(gicd::IGROUPR + n as u64 * 4, mask);
    }

    /// Write ISENABLER`n`
    pub fn write_enable_word(&self, n: u32, mask: u32) {
        self.write_reg(gicd::ISENABLER + n as u64 * 4, mask);
    }

    /// Write ICENABLER`n`
    pub fn write_disable_word(&self, n: u32, mask: u32) {
        self.write_reg(gicd::ICENABLER + n as u64 * 4, mask);
    }

    /// Write the IPRIORITYR word holding ids `4n..4n+4`
    pub fn write_priority_word(&self, n: u32, value: u32) {
        self.write_reg(gicd::IPRIORITYR + n as u64 * 4, value);
    }

    /// Write ICFGR`n`
    pub fn write_config_word(&self, n: u32, value: u32) {
        self.write_reg(gicd::ICFGR + n as u64 * 4, value);
    }

    // ---------------------------------------------------------------------
    // Composite configuration
    // ---------------------------------------------------------------------

    /// Program one interrupt.
    ///
    /// The group is set first. The trigger is skipped for SGIs and the
    /// target for all private ids, both being read-only there.
    pub fn configure(
        &self,
        id: IntId,
        trigger: TriggerMode,
        targets: CpuTargets,
        priority: u8,
        security: IrqGroup,
    ) {
        self.set_group(id, security);
        self.set_priority(id, priority);
        if !is_private(id.get()) {
            self.set_target(id, targets);
        }
        if !is_sgi(id.get()) {
            self.set_trigger(id, trigger);
        }
    }

    fn apply_default(&self, id: IntId, targets: CpuTargets, priority: u8) {
        self.disable(id);
        self.clear_pending(id);
        self.configure(id, TriggerMode::Level, targets, priority, IrqGroup::NonSecure);
    }

    /// Quiesce `range` and give every id the non-secure level-triggered
    /// baseline at priority 0x20.
    ///
    /// Ids at or above 1020 are skipped.
    pub fn default_config(&self, _token: &DistributorInitToken, range: Range<u32>, targets: CpuTargets) {
        log::debug!(
            "GIC default config for ids {}..{} targets {:#x}",
            range.start,
            range.end,
            targets.bits()
        );
        for id in range.start..range.end.min(MAX_INTID) {
            self.apply_default(IntId::new_unchecked(id), targets, DEFAULT_PRIORITY);
        }
    }

    /// Banked variant of [`Self::default_config`] for SGIs and PPIs, with a
    /// caller-chosen priority. Only affects the calling core.
    pub fn private_default_config(&self, range: Range<u32>, priority: u8) -> Result<()> {
        if range.end > PRIVATE_END {
            return Err(GicError::NotPrivate(range.end - 1));
        }
        for id in range {
            self.apply_default(IntId::new_unchecked(id), CpuTargets::empty(), priority);
        }
        Ok(())
    }

    /// Raise SGI `id` through GICD_SGIR.
    pub fn trigger_sgi(
        &self,
        id: u32,
        security: IrqGroup,
        filter: TargetFilter,
        targets: CpuTargets,
    ) -> Result<()> {
        let value = sgir_value(id, security, filter, targets)?;
        self.write_reg(gicd::SGIR, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::arm64::interrupt::boot::BootRole;
    use crate::arch::arm64::interrupt::sim::SimGic;
    use test_case::test_case;

    fn id(n: u32) -> IntId {
        IntId::new_unchecked(n)
    }

    #[test]
    fn test_gic_trigger_encoding() {
        assert_eq!(TriggerMode::Edge.icfgr_bits(), 0b10);
        assert_eq!(TriggerMode::Level.icfgr_bits(), 0b00);
        assert_eq!(TriggerMode::from_icfgr_bits(0b11), TriggerMode::Edge);
        assert_eq!(TriggerMode::from_icfgr_bits(0b01), TriggerMode::Level);
    }

    #[test]
    fn test_gic_group_round_trip_keeps_word() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        dist.write_group_word(1, 0xffff_ffff);

        dist.set_group(id(33), IrqGroup::Secure);
        assert_eq!(dist.group(id(33)), IrqGroup::Secure);
        assert_eq!(sim.dist_word(gicd::IGROUPR + 4), 0xffff_fffd);

        dist.set_group(id(33), IrqGroup::NonSecure);
        assert_eq!(sim.dist_word(gicd::IGROUPR + 4), 0xffff_ffff);
    }

    #[test]
    fn test_gic_enable_pending_active() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();

        dist.enable(id(40));
        dist.enable(id(41));
        dist.disable(id(40));
        assert!(!dist.is_enabled(id(40)));
        assert!(dist.is_enabled(id(41)));

        dist.set_pending(id(100));
        assert!(dist.is_pending(id(100)));
        dist.clear_pending(id(100));
        assert!(!dist.is_pending(id(100)));

        dist.set_active(id(64));
        assert!(dist.is_active(id(64)));
        dist.clear_active(id(64));
        assert!(!dist.is_active(id(64)));
    }

    #[test]
    fn test_gic_priority_and_target_bytes() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        dist.write_priority_word(8, 0x8080_8080);

        dist.set_priority(id(33), 0x20);
        assert_eq!(dist.priority(id(33)), 0x20);
        assert_eq!(sim.dist_word(gicd::IPRIORITYR + 32), 0x8080_2080);

        dist.set_target(id(34), CpuTargets::CPU1 | CpuTargets::CPU2);
        assert_eq!(dist.target(id(34)), CpuTargets::CPU1 | CpuTargets::CPU2);
        assert_eq!(dist.target(id(33)), CpuTargets::empty());
    }

    #[test_case(16, TriggerMode::Edge)]
    #[test_case(31, TriggerMode::Edge)]
    #[test_case(47, TriggerMode::Level)]
    #[test_case(48, TriggerMode::Edge)]
    fn test_gic_trigger_round_trip(n: u32, trigger: TriggerMode) {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        // Neighbours configured edge, so any field overlap would show up.
        dist.write_config_word(1, 0xaaaa_aaaa);
        dist.write_config_word(2, 0xaaaa_aaaa);
        dist.write_config_word(3, 0xaaaa_aaaa);

        dist.set_trigger(id(n), trigger);
        assert_eq!(dist.trigger(id(n)), trigger);
        assert_eq!(dist.trigger(id(n + 1)), TriggerMode::Edge);
    }

    #[test]
    fn test_gic_configure_respects_read_only_fields() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();

        dist.configure(id(3), TriggerMode::Level, CpuTargets::CPU3, 0x10, IrqGroup::NonSecure);
        assert_eq!(dist.trigger(id(3)), TriggerMode::Edge);
        assert_eq!(dist.target(id(3)), CpuTargets::CPU0);
        assert_eq!(dist.priority(id(3)), 0x10);
        assert_eq!(dist.group(id(3)), IrqGroup::NonSecure);

        dist.configure(id(50), TriggerMode::Edge, CpuTargets::CPU3, 0x40, IrqGroup::Secure);
        assert_eq!(dist.trigger(id(50)), TriggerMode::Edge);
        assert_eq!(dist.target(id(50)), CpuTargets::CPU3);
        assert_eq!(dist.group(id(50)), IrqGroup::Secure);
    }

    #[test]
    fn test_gic_default_config_is_idempotent() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        let BootRole::Primary(token) = BootRole::for_core(CoreId::PRIMARY) else {
            panic!("core 0 must be primary");
        };

        dist.enable(id(40));
        dist.set_pending(id(41));
        dist.default_config(&token, 32..64, CpuTargets::CPU0);
        let first = sim.snapshot();
        dist.default_config(&token, 32..64, CpuTargets::CPU0);
        assert_eq!(sim.snapshot(), first);

        for n in 32..64 {
            assert!(!dist.is_enabled(id(n)));
            assert!(!dist.is_pending(id(n)));
            assert_eq!(dist.group(id(n)), IrqGroup::NonSecure);
            assert_eq!(dist.priority(id(n)), DEFAULT_PRIORITY);
            assert_eq!(dist.trigger(id(n)), TriggerMode::Level);
            assert_eq!(dist.target(id(n)), CpuTargets::CPU0);
        }
    }

    #[test]
    fn test_gic_private_default_rejects_spis() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        assert_eq!(
            gic.distributor().private_default_config(16..33, 0x20),
            Err(GicError::NotPrivate(32))
        );
    }

    #[test]
    fn test_gic_typer_and_revision() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        assert_eq!(dist.num_interrupts(), 288);
        assert_eq!(dist.num_cpus(), 4);
        assert!(dist.check_revision().is_ok());

        sim.set_typer(0x1f);
        assert_eq!(dist.num_interrupts(), MAX_INTID);
    }

    #[test]
    fn test_gic_ctlr_enable_sequence() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        let BootRole::Primary(token) = BootRole::for_core(CoreId::PRIMARY) else {
            panic!("core 0 must be primary");
        };
        dist.set_ctlr(0b11);
        dist.disable_forwarding(&token);
        assert_eq!(dist.ctlr(), 0);
        dist.enable_group0(&token);
        assert_eq!(dist.ctlr(), 0b01);
    }

    #[test]
    fn test_gic_trigger_sgi_writes_sgir() {
        let sim = SimGic::new();
        let gic = Gic::new(&sim, GicLayout::default());
        let dist = gic.distributor();
        dist.trigger_sgi(5, IrqGroup::Secure, TargetFilter::TargetList, CpuTargets::CPU1)
            .unwrap();
        assert_eq!(sim.last_sgir(), Some(0x0002_0005));

        assert_eq!(
            dist.trigger_sgi(16, IrqGroup::Secure, TargetFilter::TargetList, CpuTargets::CPU1),
            Err(GicError::InvalidSgi(16))
        );
        assert_eq!(sim.sgir_writes(), 1);
    }
}
