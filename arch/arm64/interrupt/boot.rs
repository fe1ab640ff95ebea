//! GIC bring-up sequencing
//!
//! Cold boot: the primary core quiesces and partitions the shared
//! distributor, then every core (primary included) partitions its own
//! banked SGIs and PPIs and brings up its CPU and hypervisor interfaces.
//!
//! Only the primary core's bring-up mints a [`DistributorInitToken`], and
//! every operation that rewrites shared distributor state asks for one. The
//! token never leaves this module's call chain.

use super::gic::{Distributor, Gic};
use super::mmio::RegisterIo;
use super::runtime::{is_sgi, CoreGic, IntId, PRIVATE_END};
use crate::arch::cpu::CoreId;
use crate::config::GicConfig;
use crate::utils::{dsb, isb};
use crate::Result;

/// Proof that the holder is the core performing distributor bring-up.
///
/// Neither `Clone` nor `Copy`, and only [`init_on`] can produce one:
///
/// ```compile_fail
/// use a1000_gic::arch::arm64::interrupt::boot::BootRole;
/// use a1000_gic::CoreId;
///
/// let _ = BootRole::for_core(CoreId::PRIMARY);
/// ```
#[derive(Debug)]
pub struct DistributorInitToken {
    _private: (),
}

/// What a core does during GIC bring-up
#[derive(Debug)]
pub(crate) enum BootRole {
    /// Cold-boots the distributor, then itself
    Primary(DistributorInitToken),
    /// Only brings up its own banked state and interfaces
    Secondary,
}

impl BootRole {
    pub(crate) fn for_core(core: CoreId) -> Self {
        if core.is_primary() {
            BootRole::Primary(DistributorInitToken { _private: () })
        } else {
            BootRole::Secondary
        }
    }
}

/// Bring up the GIC on the executing core.
pub fn init<'g, R: RegisterIo>(gic: &'g Gic<R>, config: &GicConfig) -> Result<CoreGic<'g, R>> {
    init_on(gic, config, CoreId::current())
}

/// Bring up the GIC on `core`, which must be the executing core.
pub fn init_on<'g, R: RegisterIo>(
    gic: &'g Gic<R>,
    config: &GicConfig,
    core: CoreId,
) -> Result<CoreGic<'g, R>> {
    config.validate()?;
    let dist = gic.distributor();

    let secure_private = match BootRole::for_core(core) {
        BootRole::Primary(token) => {
            log::info!("Initializing GIC distributor at {:#x} from {}", dist.base_addr(), core);
            init_distributor(&dist, config, &token)
        }
        BootRole::Secondary => {
            log::info!("Initializing GIC banked state on {}", core);
            config.properties.apply_secure_private(&dist)
        }
    };

    Ok(init_core(gic, config, core, secure_private))
}

fn init_distributor<R: RegisterIo>(
    dist: &Distributor<'_, R>,
    config: &GicConfig,
    token: &DistributorInitToken,
) -> u32 {
    if let Err(err) = dist.check_revision() {
        log::warn!("{}, continuing", err);
    }
    log::info!(
        "  {} interrupt lines, {} CPU interfaces, IIDR {:#x}",
        dist.num_interrupts(),
        dist.num_cpus(),
        dist.iidr()
    );
    if config.verbose_enabled {
        for prop in &config.properties {
            log::info!(
                "  secure irq {} priority {:#x} {:?}",
                prop.id(),
                prop.priority(),
                prop.trigger()
            );
        }
    }

    dist.disable_forwarding(token);
    let end = config.spi_range.end(dist);
    dist.default_config(token, PRIVATE_END..end, config.spi_targets);
    config.properties.apply_secure_spis(dist, token);
    let secure_private = config.properties.apply_secure_private(dist);
    dist.enable_group0(token);
    if config.debug_enabled {
        log::debug!(
            "GICD_CTLR {:#x}, IGROUPR0 {:#x}, ISENABLER0 {:#x}, secure private mask {:#x}",
            dist.ctlr(),
            dist.read_group_word(0),
            dist.read_enable_word(0),
            secure_private
        );
    }
    secure_private
}

fn init_core<'g, R: RegisterIo>(
    gic: &'g Gic<R>,
    config: &GicConfig,
    core: CoreId,
    secure_private: u32,
) -> CoreGic<'g, R> {
    let dist = gic.distributor();
    for id in (0..PRIVATE_END).filter(|id| secure_private & (1 << id) == 0) {
        let priority = if is_sgi(id) {
            config.sgi_priority
        } else {
            config.ppi_priority
        };
        dist.set_priority(IntId::new_unchecked(id), priority);
    }

    let cpu = gic.cpu_interface(core);
    cpu.init();

    let hyp = if config.virtualization {
        let hyp = gic.hyp_interface();
        hyp.init();
        Some(hyp)
    } else {
        None
    };
    dsb();
    isb();

    let core_gic = CoreGic::new(dist, cpu, hyp);
    log::info!("GIC ready on {}, {} list registers", core, core_gic.lr_count());
    core_gic
}
