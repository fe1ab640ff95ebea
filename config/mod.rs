//! Configuration management
//!
//! Platform parameters for GIC bring-up. The defaults describe the A1000.

use crate::arch::arm64::interrupt::gic::DEFAULT_PRIORITY;
use crate::arch::arm64::interrupt::runtime::{MAX_INTID, PRIVATE_END};
use crate::arch::arm64::interrupt::{
    CpuTargets, Distributor, GicLayout, InterruptPropertyTable, RegisterIo,
};
use crate::{Error, Result};

/// End of the SPI default sweep on the A1000
pub const A1000_SPI_END: u32 = 287;
/// Default priority of SGIs not claimed by the property table
pub const DEFAULT_SGI_PRIORITY: u8 = 0x10;
/// Default priority of PPIs not claimed by the property table
pub const DEFAULT_PPI_PRIORITY: u8 = DEFAULT_PRIORITY;

/// Which SPIs the cold-boot default sweep covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiRange {
    /// `32..end`
    Fixed(u32),
    /// Every SPI the distributor implements, per GICD_TYPER
    FromTyper,
}

impl SpiRange {
    /// Exclusive end of the sweep
    pub fn end<R: RegisterIo>(&self, dist: &Distributor<'_, R>) -> u32 {
        match *self {
            SpiRange::Fixed(end) => end,
            SpiRange::FromTyper => dist.num_interrupts(),
        }
    }
}

/// GIC bring-up configuration
#[derive(Debug, Clone)]
pub struct GicConfig {
    /// Register frame placement
    pub layout: GicLayout,
    /// Cold-boot SPI sweep
    pub spi_range: SpiRange,
    /// Targets given to every SPI by the sweep
    pub spi_targets: CpuTargets,
    /// Priority of non-secure SGIs after per-core bring-up
    pub sgi_priority: u8,
    /// Priority of non-secure PPIs after per-core bring-up
    pub ppi_priority: u8,
    /// Bring up the hypervisor interface on every core
    pub virtualization: bool,
    /// Group 0 interrupts
    pub properties: InterruptPropertyTable,
    /// Dump controller state once bring-up is done
    pub debug_enabled: bool,
    /// Log the property table at bring-up
    pub verbose_enabled: bool,
}

impl Default for GicConfig {
    fn default() -> Self {
        Self {
            layout: GicLayout::default(),
            spi_range: SpiRange::Fixed(A1000_SPI_END),
            spi_targets: CpuTargets::CPU0,
            sgi_priority: DEFAULT_SGI_PRIORITY,
            ppi_priority: DEFAULT_PPI_PRIORITY,
            virtualization: true,
            properties: InterruptPropertyTable::a1000(),
            debug_enabled: cfg!(feature = "debug"),
            verbose_enabled: cfg!(feature = "verbose"),
        }
    }
}

impl GicConfig {
    pub fn with_layout(mut self, layout: GicLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_spi_range(mut self, range: SpiRange) -> Self {
        self.spi_range = range;
        self
    }

    pub fn with_spi_targets(mut self, targets: CpuTargets) -> Self {
        self.spi_targets = targets;
        self
    }

    pub fn with_private_priorities(mut self, sgi: u8, ppi: u8) -> Self {
        self.sgi_priority = sgi;
        self.ppi_priority = ppi;
        self
    }

    pub fn with_virtualization(mut self, enabled: bool) -> Self {
        self.virtualization = enabled;
        self
    }

    pub fn with_properties(mut self, properties: InterruptPropertyTable) -> Self {
        self.properties = properties;
        self
    }

    /// Validate GIC configuration
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if !is_aligned!(layout.base, 0x1000) {
            return Err(Error::InvalidConfig);
        }
        let frames = [
            (layout.gicd_offset, 0x1000),
            (layout.gicc_offset, 0x2000),
            (layout.gich_offset, 0x2000),
            (layout.gicv_offset, 0x2000),
        ];
        if frames
            .iter()
            .any(|&(offset, len)| !is_aligned!(offset, 0x1000) || offset + len > layout.size)
        {
            return Err(Error::InvalidConfig);
        }

        if let SpiRange::Fixed(end) = self.spi_range {
            if end <= PRIVATE_END || end > MAX_INTID {
                return Err(Error::InvalidConfig);
            }
        }

        if self.spi_targets.is_empty() {
            return Err(Error::InvalidConfig);
        }

        // Every group 0 interrupt must outrank every group 1 default.
        let nonsecure = DEFAULT_PRIORITY.min(self.sgi_priority).min(self.ppi_priority);
        if let Some(secure) = self.properties.lowest_priority() {
            if secure >= nonsecure {
                return Err(Error::InvalidConfig);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::arm64::interrupt::InterruptProperty;

    #[test]
    fn test_config_default_is_a1000() {
        let config = GicConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout.gicd(), 0x3200_1000);
        assert_eq!(config.layout.gicc(), 0x3200_2000);
        assert_eq!(config.layout.gich(), 0x3200_4000);
        assert_eq!(config.layout.gicv(), 0x3200_6000);
        assert_eq!(config.spi_range, SpiRange::Fixed(287));
        assert_eq!(config.properties.len(), 5);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let base = GicConfig::default();
        assert_eq!(
            base.clone().with_layout(GicLayout::gic400(0x3200_0800)).validate(),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            base.clone().with_spi_range(SpiRange::Fixed(32)).validate(),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            base.clone().with_spi_range(SpiRange::Fixed(1021)).validate(),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            base.clone().with_spi_targets(CpuTargets::empty()).validate(),
            Err(Error::InvalidConfig)
        );
        let mut short = GicLayout::default();
        short.size = 0x4000;
        assert_eq!(base.with_layout(short).validate(), Err(Error::InvalidConfig));
    }

    #[test]
    fn test_config_secure_priorities_outrank_nonsecure() {
        let slow_secure = InterruptPropertyTable::from_slice(&[InterruptProperty::secure_edge(40, 0x60)]).unwrap();
        assert_eq!(
            GicConfig::default().with_properties(slow_secure).validate(),
            Err(Error::InvalidConfig)
        );

        // Equal is not enough: group 0 must be strictly higher.
        let tied = InterruptPropertyTable::from_slice(&[InterruptProperty::secure_edge(40, 0x10)]).unwrap();
        assert_eq!(
            GicConfig::default().with_properties(tied).validate(),
            Err(Error::InvalidConfig)
        );

        assert_eq!(
            GicConfig::default().with_private_priorities(0, 0).validate(),
            Err(Error::InvalidConfig)
        );

        let fast_secure = InterruptPropertyTable::from_slice(&[InterruptProperty::secure_edge(40, 0x08)]).unwrap();
        assert_eq!(GicConfig::default().with_properties(fast_secure).validate(), Ok(()));
        assert_eq!(
            GicConfig::default()
                .with_properties(InterruptPropertyTable::new())
                .with_private_priorities(0, 0)
                .validate(),
            Ok(())
        );
    }
}
