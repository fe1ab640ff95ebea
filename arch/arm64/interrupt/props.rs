//! Secure interrupt properties
//!
//! The platform hands bring-up a table of group 0 interrupts. Everything
//! not in the table ends up in group 1.

use core::slice;

use super::boot::DistributorInitToken;
use super::gic::{Distributor, IrqGroup, TriggerMode, DEFAULT_PRIORITY_WORD, GIC_HIGHEST_NS_PRIORITY};
use super::mmio::RegisterIo;
use super::runtime::{is_private, is_sgi, IntId, MAX_INTID, PRIVATE_END};
use super::{GicError, Result};

/// Capacity of a property table
pub const MAX_PROPERTIES: usize = 32;
/// Highest priority a secure interrupt may use
pub const GIC_HIGHEST_SEC_PRIORITY: u8 = 0x00;

/// A1000 private physical timer PPI
pub const IRQN_PTIMER_EL1: u32 = 30;
/// A1000 UART0
pub const IRQN_UART0: u32 = 33;
/// A1000 thermal monitor, overheat output
pub const IRQN_SEC_TMU_O: u32 = 136;
/// A1000 thermal monitor
pub const IRQN_SEC_TMU: u32 = 166;
/// A1000 thermal monitor channels 0-2
pub const IRQN_SEC_TMU_CH0_2: u32 = 170;

/// How one group 0 interrupt is programmed at bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptProperty {
    id: IntId,
    priority: u8,
    group: IrqGroup,
    trigger: TriggerMode,
}

impl InterruptProperty {
    pub const fn new(id: IntId, priority: u8, group: IrqGroup, trigger: TriggerMode) -> Self {
        Self {
            id,
            priority,
            group,
            trigger,
        }
    }

    /// Group 0 edge-triggered entry
    pub const fn secure_edge(id: u32, priority: u8) -> Self {
        Self::new(IntId::new_unchecked(id), priority, IrqGroup::Secure, TriggerMode::Edge)
    }

    pub const fn id(&self) -> IntId {
        self.id
    }

    pub const fn priority(&self) -> u8 {
        self.priority
    }

    pub const fn group(&self) -> IrqGroup {
        self.group
    }

    pub const fn trigger(&self) -> TriggerMode {
        self.trigger
    }

    fn validate(&self) -> Result<()> {
        let id = self.id.get();
        if id >= MAX_INTID {
            return Err(GicError::InvalidIntId(id));
        }
        if !self.group.is_secure() {
            return Err(GicError::NonSecureProperty(id));
        }
        if self.priority >= GIC_HIGHEST_NS_PRIORITY {
            return Err(GicError::InvalidSecurePriority {
                id,
                priority: self.priority,
            });
        }
        Ok(())
    }
}

const A1000_PROPERTIES: [InterruptProperty; 5] = [
    InterruptProperty::secure_edge(IRQN_PTIMER_EL1, GIC_HIGHEST_SEC_PRIORITY),
    InterruptProperty::secure_edge(IRQN_UART0, GIC_HIGHEST_SEC_PRIORITY),
    InterruptProperty::secure_edge(IRQN_SEC_TMU_CH0_2, GIC_HIGHEST_SEC_PRIORITY),
    InterruptProperty::secure_edge(IRQN_SEC_TMU, GIC_HIGHEST_SEC_PRIORITY),
    InterruptProperty::secure_edge(IRQN_SEC_TMU_O, GIC_HIGHEST_SEC_PRIORITY),
];

/// Validated, immutable set of group 0 interrupts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptPropertyTable {
    entries: heapless::Vec<InterruptProperty, MAX_PROPERTIES>,
}

impl InterruptPropertyTable {
    /// Empty table: every interrupt stays non-secure.
    pub const fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Secure interrupts of the A1000 board
    pub fn a1000() -> Self {
        Self {
            entries: heapless::Vec::from_slice(&A1000_PROPERTIES).unwrap_or_default(),
        }
    }

    /// Build a table, rejecting invalid or duplicate entries.
    pub fn from_slice(props: &[InterruptProperty]) -> Result<Self> {
        props.iter().try_fold(Self::new(), |table, prop| table.with(*prop))
    }

    /// Builder-style [`Self::push`].
    pub fn with(mut self, prop: InterruptProperty) -> Result<Self> {
        self.push(prop)?;
        Ok(self)
    }

    pub fn push(&mut self, prop: InterruptProperty) -> Result<()> {
        prop.validate()?;
        if self.contains(prop.id) {
            return Err(GicError::DuplicateProperty(prop.id.get()));
        }
        self.entries.push(prop).map_err(|_| GicError::PropertyTableFull)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, InterruptProperty> {
        self.entries.iter()
    }

    pub fn get(&self, id: IntId) -> Option<&InterruptProperty> {
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: IntId) -> bool {
        self.get(id).is_some()
    }

    /// Numerically highest (least urgent) priority in the table
    pub fn lowest_priority(&self) -> Option<u8> {
        self.entries.iter().map(|p| p.priority).max()
    }

    /// Bit `n` set for every private id `n` in the table
    pub fn private_mask(&self) -> u32 {
        self.entries
            .iter()
            .filter(|p| is_private(p.id.get()))
            .fold(0, |mask, p| mask | (1 << p.id.get()))
    }

    /// Move the table's SPIs into group 0 and route them to the calling
    /// core's interface.
    pub fn apply_secure_spis<R: RegisterIo>(&self, dist: &Distributor<'_, R>, _token: &DistributorInitToken) {
        let target = dist.cpuif_id();
        for prop in self.entries.iter().filter(|p| !is_private(p.id.get())) {
            log::debug!("GIC secure SPI {} priority {:#x}", prop.id, prop.priority);
            dist.set_group(prop.id, IrqGroup::Secure);
            dist.set_priority(prop.id, prop.priority);
            dist.set_target(prop.id, target);
            dist.set_trigger(prop.id, prop.trigger);
            dist.enable(prop.id);
        }
    }

    /// Partition the calling core's banked SGIs and PPIs.
    ///
    /// All private ids are disabled and reset to the non-secure default
    /// priority, then the table's private entries are programmed and become
    /// the only enabled group 0 private ids. Returns their mask.
    pub fn apply_secure_private<R: RegisterIo>(&self, dist: &Distributor<'_, R>) -> u32 {
        dist.write_disable_word(0, !0);
        for n in 0..PRIVATE_END / 4 {
            dist.write_priority_word(n, DEFAULT_PRIORITY_WORD);
        }

        let mut mask = 0;
        for prop in self.entries.iter().filter(|p| is_private(p.id.get())) {
            mask |= 1 << prop.id.get();
            if !is_sgi(prop.id.get()) {
                dist.set_trigger(prop.id, prop.trigger);
            }
            dist.set_priority(prop.id, prop.priority);
        }

        dist.write_group_word(0, !mask);
        dist.write_enable_word(0, mask);
        mask
    }
}

impl<'a> IntoIterator for &'a InterruptPropertyTable {
    type Item = &'a InterruptProperty;
    type IntoIter = slice::Iter<'a, InterruptProperty>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
