//! GICv2 register map
//!
//! Offsets and bit-field layouts for the four memory-mapped frames of a
//! GIC-400 style controller. Reference: ARM IHI 0048B.

use tock_registers::register_bitfields;

/// Physical placement of the GIC frames.
///
/// Every frame sits at a fixed offset from a single base. The first 4 KiB of
/// the window are reserved on the A1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GicLayout {
    /// Base of the whole GIC window
    pub base: u64,
    /// Distributor frame offset
    pub gicd_offset: u64,
    /// CPU interface frame offset (8 KiB frame, DIR in the second page)
    pub gicc_offset: u64,
    /// Hypervisor interface control frame offset
    pub gich_offset: u64,
    /// Virtual CPU interface frame offset
    pub gicv_offset: u64,
    /// Size of the whole window
    pub size: u64,
}

impl GicLayout {
    /// A1000 GIC window
    pub const A1000_BASE: u64 = 0x3200_0000;
    /// A1000 GIC window size
    pub const A1000_SIZE: u64 = 0x8000;

    /// Layout with the standard GIC-400 frame offsets at `base`.
    pub const fn gic400(base: u64) -> Self {
        Self {
            base,
            gicd_offset: 0x1000,
            gicc_offset: 0x2000,
            gich_offset: 0x4000,
            gicv_offset: 0x6000,
            size: 0x8000,
        }
    }

    /// Distributor base address
    #[inline]
    pub const fn gicd(&self) -> u64 {
        self.base + self.gicd_offset
    }

    /// CPU interface base address
    #[inline]
    pub const fn gicc(&self) -> u64 {
        self.base + self.gicc_offset
    }

    /// Hypervisor interface base address
    #[inline]
    pub const fn gich(&self) -> u64 {
        self.base + self.gich_offset
    }

    /// Virtual CPU interface base address
    #[inline]
    pub const fn gicv(&self) -> u64 {
        self.base + self.gicv_offset
    }
}

impl Default for GicLayout {
    fn default() -> Self {
        Self::gic400(Self::A1000_BASE)
    }
}

/// GIC Distributor register offsets
pub mod gicd {
    /// GICD_CTLR - Distributor Control Register
    pub const CTLR: u64 = 0x000;
    /// GICD_TYPER - Interrupt Controller Type Register
    pub const TYPER: u64 = 0x004;
    /// GICD_IIDR - Distributor Implementer Identification Register
    pub const IIDR: u64 = 0x008;
    /// GICD_IGROUPR - Interrupt Group Registers
    pub const IGROUPR: u64 = 0x080;
    /// GICD_ISENABLER - Interrupt Set-Enable Registers
    pub const ISENABLER: u64 = 0x100;
    /// GICD_ICENABLER - Interrupt Clear-Enable Registers
    pub const ICENABLER: u64 = 0x180;
    /// GICD_ISPENDR - Interrupt Set-Pending Registers
    pub const ISPENDR: u64 = 0x200;
    /// GICD_ICPENDR - Interrupt Clear-Pending Registers
    pub const ICPENDR: u64 = 0x280;
    /// GICD_ISACTIVER - Interrupt Set-Active Registers
    pub const ISACTIVER: u64 = 0x300;
    /// GICD_ICACTIVER - Interrupt Clear-Active Registers
    pub const ICACTIVER: u64 = 0x380;
    /// GICD_IPRIORITYR - Interrupt Priority Registers (byte accessible)
    pub const IPRIORITYR: u64 = 0x400;
    /// GICD_ITARGETSR - Interrupt Processor Targets Registers (byte accessible)
    pub const ITARGETSR: u64 = 0x800;
    /// GICD_ICFGR - Interrupt Configuration Registers
    pub const ICFGR: u64 = 0xC00;
    /// GICD_NSACR - Non-secure Access Control Registers
    pub const NSACR: u64 = 0xE00;
    /// GICD_SGIR - Software Generated Interrupt Register
    pub const SGIR: u64 = 0xF00;
    /// GICD_CPENDSGIR - SGI Clear-Pending Registers
    pub const CPENDSGIR: u64 = 0xF10;
    /// GICD_SPENDSGIR - SGI Set-Pending Registers
    pub const SPENDSGIR: u64 = 0xF20;
    /// GICD_PIDR2 - Peripheral ID2 Register
    pub const PIDR2: u64 = 0xFE8;
}

/// GIC CPU Interface register offsets
pub mod gicc {
    /// GICC_CTLR - CPU Interface Control Register
    pub const CTLR: u64 = 0x00;
    /// GICC_PMR - Interrupt Priority Mask Register
    pub const PMR: u64 = 0x04;
    /// GICC_BPR - Binary Point Register
    pub const BPR: u64 = 0x08;
    /// GICC_IAR - Interrupt Acknowledge Register
    pub const IAR: u64 = 0x0C;
    /// GICC_EOIR - End of Interrupt Register
    pub const EOIR: u64 = 0x10;
    /// GICC_RPR - Running Priority Register
    pub const RPR: u64 = 0x14;
    /// GICC_HPPIR - Highest Priority Pending Interrupt Register
    pub const HPPIR: u64 = 0x18;
    /// GICC_AHPPIR - Aliased Highest Priority Pending Interrupt Register
    pub const AHPPIR: u64 = 0x28;
    /// GICC_IIDR - CPU Interface Identification Register
    pub const IIDR: u64 = 0xFC;
    /// GICC_DIR - Deactivate Interrupt Register
    pub const DIR: u64 = 0x1000;
}

/// GIC Hypervisor Interface control register offsets
pub mod gich {
    /// GICH_HCR - Hypervisor Control Register
    pub const HCR: u64 = 0x00;
    /// GICH_VTR - VGIC Type Register
    pub const VTR: u64 = 0x04;
    /// GICH_VMCR - Virtual Machine Control Register
    pub const VMCR: u64 = 0x08;
    /// GICH_MISR - Maintenance Interrupt Status Register
    pub const MISR: u64 = 0x10;
    /// GICH_EISR0 - End of Interrupt Status Register 0
    pub const EISR0: u64 = 0x20;
    /// GICH_EISR1 - End of Interrupt Status Register 1
    pub const EISR1: u64 = 0x24;
    /// GICH_ELRSR0 - Empty List Register Status Register 0
    pub const ELRSR0: u64 = 0x30;
    /// GICH_ELRSR1 - Empty List Register Status Register 1
    pub const ELRSR1: u64 = 0x34;
    /// GICH_APR - Active Priorities Register
    pub const APR: u64 = 0xF0;
    /// GICH_LR0 - first List Register, 4 bytes apart
    pub const LR0: u64 = 0x100;
    /// Architectural upper bound on list registers
    pub const MAX_LRS: u32 = 64;
}

/// GIC Virtual CPU Interface register offsets
pub mod gicv {
    /// GICV_CTLR - Virtual Machine Control Register
    pub const CTLR: u64 = 0x00;
    /// GICV_PMR - VM Priority Mask Register
    pub const PMR: u64 = 0x04;
    /// GICV_BPR - VM Binary Point Register
    pub const BPR: u64 = 0x08;
    /// GICV_IAR - VM Interrupt Acknowledge Register
    pub const IAR: u64 = 0x0C;
    /// GICV_EOIR - VM End of Interrupt Register
    pub const EOIR: u64 = 0x10;
    /// GICV_RPR - VM Running Priority Register
    pub const RPR: u64 = 0x14;
    /// GICV_HPPIR - VM Highest Priority Pending Interrupt Register
    pub const HPPIR: u64 = 0x18;
    /// GICV_DIR - VM Deactivate Interrupt Register
    pub const DIR: u64 = 0x1000;
}

register_bitfields! [
    u32,

    /// Distributor control (secure view)
    pub GICD_CTLR [
        EnableGrp0 OFFSET(0) NUMBITS(1) [],
        EnableGrp1 OFFSET(1) NUMBITS(1) []
    ],

    /// Interrupt controller type
    pub GICD_TYPER [
        ITLinesNumber OFFSET(0) NUMBITS(5) [],
        CPUNumber OFFSET(5) NUMBITS(3) [],
        SecurityExtn OFFSET(10) NUMBITS(1) [],
        LSPI OFFSET(11) NUMBITS(5) []
    ],

    /// Software generated interrupt
    pub GICD_SGIR [
        SGIINTID OFFSET(0) NUMBITS(4) [],
        NSATT OFFSET(15) NUMBITS(1) [],
        CPUTargetList OFFSET(16) NUMBITS(8) [],
        TargetListFilter OFFSET(24) NUMBITS(2) [
            TargetList = 0,
            AllOthers = 1,
            SelfOnly = 2
        ]
    ],

    /// Peripheral identification 2
    pub GICD_PIDR2 [
        ArchRev OFFSET(4) NUMBITS(4) []
    ],

    /// CPU interface control, as programmed from the non-secure side
    pub GICC_CTLR [
        EnableGrp1 OFFSET(0) NUMBITS(1) [],
        FIQEn OFFSET(3) NUMBITS(1) [],
        FIQBypDisGrp0 OFFSET(5) NUMBITS(1) [],
        IRQBypDisGrp0 OFFSET(6) NUMBITS(1) [],
        FIQBypDisGrp1 OFFSET(7) NUMBITS(1) [],
        IRQBypDisGrp1 OFFSET(8) NUMBITS(1) [],
        EOImodeNS OFFSET(9) NUMBITS(1) []
    ],

    /// Interrupt acknowledge
    pub GICC_IAR [
        InterruptID OFFSET(0) NUMBITS(10) [],
        CPUID OFFSET(10) NUMBITS(3) []
    ],

    /// VGIC type
    pub GICH_VTR [
        ListRegs OFFSET(0) NUMBITS(6) [],
        PREbits OFFSET(26) NUMBITS(3) [],
        PRIbits OFFSET(29) NUMBITS(3) []
    ],

    /// Hypervisor control
    pub GICH_HCR [
        En OFFSET(0) NUMBITS(1) [],
        UIE OFFSET(1) NUMBITS(1) [],
        LRENPIE OFFSET(2) NUMBITS(1) [],
        NPIE OFFSET(3) NUMBITS(1) [],
        EOICount OFFSET(27) NUMBITS(5) []
    ],

    /// List register
    pub GICH_LR [
        VirtualID OFFSET(0) NUMBITS(10) [],
        PhysicalID OFFSET(10) NUMBITS(10) [],
        Priority OFFSET(23) NUMBITS(5) [],
        State OFFSET(28) NUMBITS(2) [
            Invalid = 0,
            Pending = 1,
            Active = 2,
            PendingActive = 3
        ],
        Grp1 OFFSET(30) NUMBITS(1) [],
        HW OFFSET(31) NUMBITS(1) []
    ]
];
