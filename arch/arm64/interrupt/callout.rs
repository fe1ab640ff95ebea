//! Numbered command table
//!
//! Later boot stages reach the driver through a single entry point taking a
//! command code and up to four integer arguments. Argument conventions
//! follow the A1000 firmware ABI:
//!
//! - security: `0` non-secure, anything else secure
//! - trigger config: `0` level, `1` edge
//! - every command returns one integer, `0` when there is nothing to return

use core::marker::PhantomData;

use super::boot::init_on;
use super::gic::{CpuTargets, Gic, IrqGroup, TriggerMode};
use super::hyp::HypInterface;
use super::mmio::RegisterIo;
use super::runtime::{is_private, is_sgi, IntId, TargetFilter};
use super::GicError;
use crate::arch::cpu::CoreId;
use crate::config::GicConfig;
use crate::{Error, Result};

/// Callout command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    GicInit = 100,
    IrqId = 101,
    IrqAck = 102,
    IrqDeactivate = 103,
    IrqEnable = 104,
    IrqDisable = 105,
    SetPending = 106,
    ClearPending = 107,
    SetPriority = 108,
    SetTriggerConfig = 109,
    SetActive = 110,
    ClearActive = 111,
    SetTarget = 112,
    ReadTyper = 113,
    TriggerSgi = 114,
    DistributorAddress = 115,
    ReadIidr = 116,
    ReadLr = 117,
    WriteLr = 118,
    ReadElrsr = 119,
    ReadEisr = 120,
    ReadHcr = 121,
    ReadVmcr = 122,
    ReadApr = 123,
    ReadMisr = 124,
    WriteHcr = 125,
    WriteVmcr = 126,
    WriteApr = 127,
    IsSgi = 128,
    IsPrivate = 129,
    GetPriority = 133,
    GetTarget = 134,
    GetTriggerConfig = 135,
}

impl Command {
    const ALL: [Command; 33] = [
        Command::GicInit,
        Command::IrqId,
        Command::IrqAck,
        Command::IrqDeactivate,
        Command::IrqEnable,
        Command::IrqDisable,
        Command::SetPending,
        Command::ClearPending,
        Command::SetPriority,
        Command::SetTriggerConfig,
        Command::SetActive,
        Command::ClearActive,
        Command::SetTarget,
        Command::ReadTyper,
        Command::TriggerSgi,
        Command::DistributorAddress,
        Command::ReadIidr,
        Command::ReadLr,
        Command::WriteLr,
        Command::ReadElrsr,
        Command::ReadEisr,
        Command::ReadHcr,
        Command::ReadVmcr,
        Command::ReadApr,
        Command::ReadMisr,
        Command::WriteHcr,
        Command::WriteVmcr,
        Command::WriteApr,
        Command::IsSgi,
        Command::IsPrivate,
        Command::GetPriority,
        Command::GetTarget,
        Command::GetTriggerConfig,
    ];

    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Command {
    type Error = GicError;

    fn try_from(code: u32) -> core::result::Result<Self, GicError> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.code() == code)
            .ok_or(GicError::UnknownCommand(code))
    }
}

fn arg_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidArgument)
}

fn arg_u8(value: u64) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::InvalidArgument)
}

fn arg_id(value: u64) -> Result<IntId> {
    Ok(IntId::new(arg_u32(value)?)?)
}

fn arg_security(value: u64) -> IrqGroup {
    if value == 0 {
        IrqGroup::NonSecure
    } else {
        IrqGroup::Secure
    }
}

fn arg_trigger(value: u64) -> Result<TriggerMode> {
    match value {
        0 => Ok(TriggerMode::Level),
        1 => Ok(TriggerMode::Edge),
        _ => Err(Error::InvalidArgument),
    }
}

/// Command dispatcher bound to one core.
pub struct Callout<'g, R: RegisterIo> {
    gic: &'g Gic<R>,
    config: &'g GicConfig,
    core: CoreId,
    _not_send: PhantomData<*const ()>,
}

impl<'g, R: RegisterIo> Callout<'g, R> {
    pub fn new(gic: &'g Gic<R>, config: &'g GicConfig, core: CoreId) -> Self {
        Self {
            gic,
            config,
            core,
            _not_send: PhantomData,
        }
    }

    /// Dispatcher for the executing core
    pub fn current(gic: &'g Gic<R>, config: &'g GicConfig) -> Self {
        Self::new(gic, config, CoreId::current())
    }

    /// Decode `code` and run it.
    pub fn call(&self, code: u32, args: [u64; 4]) -> Result<u64> {
        let cmd = Command::try_from(code)?;
        self.dispatch(cmd, args)
    }

    fn hyp(&self) -> Result<HypInterface<'g, R>> {
        if self.config.virtualization {
            Ok(self.gic.hyp_interface())
        } else {
            Err(GicError::NoHypervisorInterface.into())
        }
    }

    pub fn dispatch(&self, cmd: Command, args: [u64; 4]) -> Result<u64> {
        let dist = self.gic.distributor();
        let cpu = self.gic.cpu_interface(self.core);

        let ret = match cmd {
            Command::GicInit => init_on(self.gic, self.config, self.core)?.lr_count() as u64,
            Command::IrqId => cpu.read_ack_id().get() as u64,
            Command::IrqAck => {
                cpu.ack(arg_id(args[0])?);
                0
            }
            Command::IrqDeactivate => {
                cpu.deactivate(arg_id(args[0])?);
                0
            }
            Command::IrqEnable => {
                dist.enable(arg_id(args[0])?);
                0
            }
            Command::IrqDisable => {
                dist.disable(arg_id(args[0])?);
                0
            }
            Command::SetPending => {
                dist.set_pending(arg_id(args[0])?);
                0
            }
            Command::ClearPending => {
                dist.clear_pending(arg_id(args[0])?);
                0
            }
            Command::SetActive => {
                dist.set_active(arg_id(args[0])?);
                0
            }
            Command::ClearActive => {
                dist.clear_active(arg_id(args[0])?);
                0
            }
            Command::SetPriority => {
                dist.set_priority(arg_id(args[0])?, arg_u8(args[1])?);
                0
            }
            Command::SetTriggerConfig => {
                dist.set_trigger(arg_id(args[0])?, arg_trigger(args[1])?);
                0
            }
            Command::SetTarget => {
                dist.set_target(arg_id(args[0])?, CpuTargets::from_bits_truncate(arg_u8(args[1])?));
                0
            }
            Command::GetPriority => dist.priority(arg_id(args[0])?) as u64,
            Command::GetTarget => dist.target(arg_id(args[0])?).bits() as u64,
            Command::GetTriggerConfig => match dist.trigger(arg_id(args[0])?) {
                TriggerMode::Level => 0,
                TriggerMode::Edge => 1,
            },
            Command::ReadTyper => dist.typer() as u64,
            Command::ReadIidr => dist.iidr() as u64,
            Command::DistributorAddress => self.gic.layout().gicd(),
            Command::TriggerSgi => {
                let filter =
                    TargetFilter::from_raw(arg_u32(args[2])?).ok_or(Error::InvalidArgument)?;
                dist.trigger_sgi(
                    arg_u32(args[0])?,
                    arg_security(args[1]),
                    filter,
                    CpuTargets::from_bits_truncate(arg_u8(args[3])?),
                )?;
                0
            }
            Command::ReadLr => self.hyp()?.read_lr(arg_u32(args[0])?)? as u64,
            Command::WriteLr => {
                self.hyp()?.write_lr(arg_u32(args[0])?, arg_u32(args[1])?)?;
                0
            }
            Command::ReadElrsr => self.hyp()?.elrsr(),
            Command::ReadEisr => self.hyp()?.eisr(),
            Command::ReadHcr => self.hyp()?.hcr() as u64,
            Command::ReadVmcr => self.hyp()?.vmcr() as u64,
            Command::ReadApr => self.hyp()?.apr() as u64,
            Command::ReadMisr => self.hyp()?.misr() as u64,
            Command::WriteHcr => {
                self.hyp()?.set_hcr(arg_u32(args[0])?);
                0
            }
            Command::WriteVmcr => {
                self.hyp()?.set_vmcr(arg_u32(args[0])?);
                0
            }
            Command::WriteApr => {
                self.hyp()?.set_apr(arg_u32(args[0])?);
                0
            }
            Command::IsSgi => u32::try_from(args[0]).map_or(false, is_sgi) as u64,
            Command::IsPrivate => u32::try_from(args[0]).map_or(false, is_private) as u64,
        };
        Ok(ret)
    }
}
