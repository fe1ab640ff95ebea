//! Interrupt ids and the runtime interrupt protocol
//!
//! After bring-up each core owns a [`CoreGic`]. The platform trap handler
//! drives it once per interrupt:
//!
//! ```text
//! let id = gic.read_ack_id();
//! if !id.is_spurious() {
//!     handle(id);
//!     gic.ack(id);        // priority drop
//!     gic.deactivate(id); // EOImodeNS: separate deactivation
//! }
//! ```

use core::fmt;

use tock_registers::LocalRegisterCopy;

use super::cpu_interface::CpuInterface;
use super::gic::{CpuTargets, Distributor, IrqGroup};
use super::hyp::HypInterface;
use super::mmio::RegisterIo;
use super::regs::GICD_SGIR;
use super::{GicError, Result};
use crate::arch::cpu::CoreId;

/// First id past the SGI range
pub const SGI_END: u32 = 16;
/// First id past the private (SGI + PPI) range
pub const PRIVATE_END: u32 = 32;
/// First id past the SPI range
pub const MAX_INTID: u32 = 1020;
/// Id returned by IAR when nothing is pending
pub const SPURIOUS_INTID: u32 = 1023;

/// Interrupt classes of a GICv2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    /// Software generated, banked per core
    Sgi,
    /// Private peripheral, banked per core
    Ppi,
    /// Shared peripheral
    Spi,
    /// 1020-1023, only ever returned by the acknowledge registers
    Special,
}

/// GIC interrupt id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntId(u32);

impl IntId {
    /// Checked constructor for ids supplied by configuration.
    pub fn new(id: u32) -> Result<Self> {
        if id < MAX_INTID {
            Ok(Self(id))
        } else {
            Err(GicError::InvalidIntId(id))
        }
    }

    /// Checked constructor restricted to SGIs.
    pub fn sgi(id: u32) -> Result<Self> {
        if id < SGI_END {
            Ok(Self(id))
        } else {
            Err(GicError::InvalidSgi(id))
        }
    }

    /// Hot-path constructor. Accepts the special range 1020-1023 as well.
    #[inline]
    pub const fn new_unchecked(id: u32) -> Self {
        Self(id)
    }

    /// Raw id
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn kind(self) -> IntKind {
        match self.0 {
            0..=15 => IntKind::Sgi,
            16..=31 => IntKind::Ppi,
            32..=1019 => IntKind::Spi,
            _ => IntKind::Special,
        }
    }

    #[inline]
    pub const fn is_sgi(self) -> bool {
        is_sgi(self.0)
    }

    #[inline]
    pub const fn is_private(self) -> bool {
        is_private(self.0)
    }

    #[inline]
    pub const fn is_spi(self) -> bool {
        self.0 >= PRIVATE_END && self.0 < MAX_INTID
    }

    /// Nothing was pending when the acknowledge register was read.
    #[inline]
    pub const fn is_spurious(self) -> bool {
        self.0 == SPURIOUS_INTID
    }
}

impl From<IntId> for u32 {
    fn from(id: IntId) -> u32 {
        id.0
    }
}

impl fmt::Display for IntId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True for software generated interrupts, ids 0-15.
#[inline]
pub const fn is_sgi(id: u32) -> bool {
    id < SGI_END
}

/// True for ids banked per core (SGIs and PPIs), ids 0-31.
#[inline]
pub const fn is_private(id: u32) -> bool {
    id < PRIVATE_END
}

/// SGI destination selection, GICD_SGIR.TargetListFilter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TargetFilter {
    /// Cores named in the target list
    TargetList = 0,
    /// Every core except the requester
    AllOthers = 1,
    /// Only the requester
    SelfOnly = 2,
}

impl TargetFilter {
    /// Decode the two-bit filter field. 3 is reserved.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TargetFilter::TargetList),
            1 => Some(TargetFilter::AllOthers),
            2 => Some(TargetFilter::SelfOnly),
            _ => None,
        }
    }
}

/// Encode a GICD_SGIR write.
///
/// NSATT is set for non-secure requests so that only cores with the SGI in
/// group 1 receive it.
pub fn sgir_value(
    id: u32,
    security: IrqGroup,
    filter: TargetFilter,
    targets: CpuTargets,
) -> Result<u32> {
    if !is_sgi(id) {
        return Err(GicError::InvalidSgi(id));
    }
    let mut sgir = LocalRegisterCopy::<u32, GICD_SGIR::Register>::new(0);
    sgir.write(
        GICD_SGIR::SGIINTID.val(id)
            + GICD_SGIR::CPUTargetList.val(targets.bits() as u32)
            + GICD_SGIR::TargetListFilter.val(filter as u32)
            + GICD_SGIR::NSATT.val((security == IrqGroup::NonSecure) as u32),
    );
    Ok(sgir.get())
}

/// Value written to EOIR/DIR. SGIs carry the core id in bits [12:10].
#[inline]
pub const fn eoi_value(core: CoreId, id: IntId) -> u32 {
    if id.is_sgi() {
        ((core.get() & 0x7) << 10) | id.get()
    } else {
        id.get()
    }
}

/// Per-core runtime handle returned by bring-up.
pub struct CoreGic<'g, R: RegisterIo> {
    dist: Distributor<'g, R>,
    cpu: CpuInterface<'g, R>,
    hyp: Option<HypInterface<'g, R>>,
}

impl<'g, R: RegisterIo> CoreGic<'g, R> {
    pub(crate) fn new(
        dist: Distributor<'g, R>,
        cpu: CpuInterface<'g, R>,
        hyp: Option<HypInterface<'g, R>>,
    ) -> Self {
        Self { dist, cpu, hyp }
    }

    /// Core this handle was brought up on
    pub fn core(&self) -> CoreId {
        self.cpu.core()
    }

    /// Implemented list registers, 0 without a hypervisor interface
    pub fn lr_count(&self) -> u32 {
        self.hyp.as_ref().map_or(0, |hyp| hyp.lr_count())
    }

    pub fn distributor(&self) -> &Distributor<'g, R> {
        &self.dist
    }

    pub fn cpu_interface(&self) -> &CpuInterface<'g, R> {
        &self.cpu
    }

    /// Hypervisor interface, if it was brought up on this core
    pub fn hyp_interface(&self) -> Result<&HypInterface<'g, R>> {
        self.hyp.as_ref().ok_or(GicError::NoHypervisorInterface)
    }

    /// Forward `id` to the CPU interfaces.
    #[inline]
    pub fn enable(&self, id: IntId) {
        self.dist.enable(id);
    }

    /// Stop forwarding `id`.
    #[inline]
    pub fn disable(&self, id: IntId) {
        self.dist.disable(id);
    }

    /// Acknowledge the highest priority pending interrupt.
    ///
    /// Returns the spurious id when nothing is pending.
    #[inline]
    pub fn read_ack_id(&self) -> IntId {
        self.cpu.read_ack_id()
    }

    /// Priority drop for an id previously returned by [`Self::read_ack_id`].
    #[inline]
    pub fn ack(&self, id: IntId) {
        self.cpu.ack(id);
    }

    /// Deactivate an acknowledged id.
    #[inline]
    pub fn deactivate(&self, id: IntId) {
        self.cpu.deactivate(id);
    }

    /// Raise SGI `id`. Ids of 16 and above are rejected without touching the controller.
    pub fn trigger_sgi(
        &self,
        id: u32,
        security: IrqGroup,
        filter: TargetFilter,
        targets: CpuTargets,
    ) -> Result<()> {
        self.dist.trigger_sgi(id, security, filter, targets)
    }
}
