//! Simulated GIC-400 register file
//!
//! Models what the driver depends on: banked private registers, paired
//! set/clear registers over one piece of state, the read-only SGI config and
//! private targets, an SGIR that marks SGIs pending on the addressed cores,
//! and a GICH whose ELRSR follows the list register contents. Every write is
//! logged so tests can check a transaction never reached the bus.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use super::mmio::RegisterIo;
use super::regs::{gicc, gicd, gich, GicLayout};

const IIDR_GIC400: u32 = 0x0200_143B;
const PIDR2_GICV2: u32 = 0x2B;
/// 288 interrupt lines, 4 CPU interfaces
const TYPER_DEFAULT: u32 = 0x68;
/// 4 list registers
const VTR_DEFAULT: u32 = 0x9000_0003;
/// SGIs are always edge triggered
const SGI_CONFIG: u32 = 0xAAAA_AAAA;
const MAX_CORES: u32 = 8;

enum Frame {
    Dist(u64),
    Cpu(u64),
    Hyp(u64),
    Virt(u64),
    Outside,
}

/// Captured register state, for comparing two points in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    shared: BTreeMap<u64, u32>,
    banked: BTreeMap<(u32, u64), u32>,
}

pub(crate) struct SimGic {
    layout: GicLayout,
    core: Cell<u32>,
    typer: Cell<u32>,
    vtr: Cell<u32>,
    shared: RefCell<BTreeMap<u64, u32>>,
    banked: RefCell<BTreeMap<(u32, u64), u32>>,
    iar: RefCell<BTreeMap<u32, VecDeque<u32>>>,
    sgir: RefCell<Vec<u32>>,
    writes: RefCell<Vec<(u32, u64, u32)>>,
}

impl SimGic {
    pub(crate) fn new() -> Self {
        Self::with_layout(GicLayout::default())
    }

    pub(crate) fn with_layout(layout: GicLayout) -> Self {
        Self {
            layout,
            core: Cell::new(0),
            typer: Cell::new(TYPER_DEFAULT),
            vtr: Cell::new(VTR_DEFAULT),
            shared: RefCell::new(BTreeMap::new()),
            banked: RefCell::new(BTreeMap::new()),
            iar: RefCell::new(BTreeMap::new()),
            sgir: RefCell::new(Vec::new()),
            writes: RefCell::new(Vec::new()),
        }
    }

    /// Make subsequent accesses come from `core`.
    pub(crate) fn set_core(&self, core: u32) {
        self.core.set(core);
    }

    pub(crate) fn set_typer(&self, typer: u32) {
        self.typer.set(typer);
    }

    pub(crate) fn set_vtr(&self, vtr: u32) {
        self.vtr.set(vtr);
    }

    /// Queue a value for `core`'s next IAR read.
    pub(crate) fn queue_iar(&self, core: u32, value: u32) {
        self.iar.borrow_mut().entry(core).or_default().push_back(value);
    }

    pub(crate) fn dist_word(&self, offset: u64) -> u32 {
        self.read32(self.layout.gicd() + offset)
    }

    pub(crate) fn cpu_word(&self, offset: u64) -> u32 {
        self.read32(self.layout.gicc() + offset)
    }

    pub(crate) fn hyp_word(&self, offset: u64) -> u32 {
        self.read32(self.layout.gich() + offset)
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            shared: self.shared.borrow().clone(),
            banked: self.banked.borrow().clone(),
        }
    }

    pub(crate) fn last_sgir(&self) -> Option<u32> {
        self.sgir.borrow().last().copied()
    }

    pub(crate) fn sgir_writes(&self) -> usize {
        self.sgir.borrow().len()
    }

    /// Values written to `addr` by `core`, oldest first
    pub(crate) fn writes_to(&self, core: u32, addr: u64) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(c, a, _)| *c == core && *a == addr)
            .map(|(_, _, v)| *v)
            .collect()
    }

    /// Number of writes landing in `[start, end)` from any core
    pub(crate) fn writes_in(&self, start: u64, end: u64) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(_, a, _)| *a >= start && *a < end)
            .count()
    }

    /// Writes by `core` that landed in shared (non-banked) distributor state
    pub(crate) fn shared_dist_writes(&self, core: u32) -> usize {
        let gicd = self.layout.gicd();
        self.writes
            .borrow()
            .iter()
            .filter(|(c, a, _)| *c == core && (gicd..gicd + 0x1000).contains(a))
            .filter(|(_, a, _)| !Self::dist_slot(*a - gicd).1)
            .count()
    }

    fn frame(&self, addr: u64) -> Frame {
        let l = &self.layout;
        if (l.gicd()..l.gicd() + 0x1000).contains(&addr) {
            Frame::Dist(addr - l.gicd())
        } else if (l.gicc()..l.gicc() + 0x2000).contains(&addr) {
            Frame::Cpu(addr - l.gicc())
        } else if (l.gich()..l.gich() + 0x2000).contains(&addr) {
            Frame::Hyp(addr - l.gich())
        } else if (l.gicv()..l.gicv() + 0x2000).contains(&addr) {
            Frame::Virt(addr - l.gicv())
        } else {
            Frame::Outside
        }
    }

    /// Canonical storage offset of a distributor word and whether it is banked.
    fn dist_slot(offset: u64) -> (u64, bool) {
        let canon = match offset {
            0x180..=0x1FF | 0x280..=0x2FF | 0x380..=0x3FF => offset - 0x80,
            _ => offset,
        };
        let banked = matches!(canon, 0x080 | 0x100 | 0x200 | 0x300 | 0xC00 | 0xC04)
            || (0x400..0x420).contains(&canon)
            || (0x800..0x820).contains(&canon);
        (canon, banked)
    }

    fn load(&self, base: u64, offset: u64, banked: bool) -> u32 {
        let addr = base + offset;
        if banked {
            let key = (self.core.get(), addr);
            self.banked.borrow().get(&key).copied().unwrap_or(0)
        } else {
            self.shared.borrow().get(&addr).copied().unwrap_or(0)
        }
    }

    fn store(&self, base: u64, offset: u64, banked: bool, value: u32) {
        let addr = base + offset;
        if banked {
            self.banked.borrow_mut().insert((self.core.get(), addr), value);
        } else {
            self.shared.borrow_mut().insert(addr, value);
        }
    }

    fn read_dist(&self, offset: u64) -> u32 {
        let base = self.layout.gicd();
        match offset {
            gicd::TYPER => self.typer.get(),
            gicd::IIDR => IIDR_GIC400,
            gicd::PIDR2 => PIDR2_GICV2,
            gicd::SGIR => 0,
            gicd::ICFGR => SGI_CONFIG,
            0x800..=0x81F => (1u32 << self.core.get()) * 0x0101_0101,
            _ => {
                let (slot, banked) = Self::dist_slot(offset);
                self.load(base, slot, banked)
            }
        }
    }

    fn write_dist(&self, offset: u64, value: u32) {
        let base = self.layout.gicd();
        match offset {
            gicd::TYPER | gicd::IIDR | gicd::PIDR2 | gicd::ICFGR | 0x800..=0x81F => {}
            gicd::SGIR => self.deliver_sgi(value),
            _ => {
                let (slot, banked) = Self::dist_slot(offset);
                let old = self.load(base, slot, banked);
                let new = match offset {
                    0x100..=0x17F | 0x200..=0x27F | 0x300..=0x37F => old | value,
                    0x180..=0x1FF | 0x280..=0x2FF | 0x380..=0x3FF => old & !value,
                    _ => value,
                };
                self.store(base, slot, banked, new);
            }
        }
    }

    fn deliver_sgi(&self, value: u32) {
        self.sgir.borrow_mut().push(value);
        let id = value & 0xf;
        let list = (value >> 16) & 0xff;
        let me = self.core.get();
        let targets: Vec<u32> = match (value >> 24) & 0x3 {
            0 => (0..MAX_CORES).filter(|c| list & (1 << c) != 0).collect(),
            1 => (0..MAX_CORES).filter(|c| *c != me).collect(),
            2 => vec![me],
            _ => Vec::new(),
        };
        let pend = self.layout.gicd() + gicd::ISPENDR;
        let mut banked = self.banked.borrow_mut();
        for core in targets {
            *banked.entry((core, pend)).or_insert(0) |= 1 << id;
        }
    }

    fn read_cpu(&self, offset: u64) -> u32 {
        match offset {
            gicc::IAR => {
                let core = self.core.get();
                self.iar
                    .borrow_mut()
                    .get_mut(&core)
                    .and_then(|q| q.pop_front())
                    .unwrap_or(1023)
            }
            gicc::IIDR => IIDR_GIC400,
            _ => self.load(self.layout.gicc(), offset, true),
        }
    }

    fn read_hyp(&self, offset: u64) -> u32 {
        match offset {
            gich::VTR => self.vtr.get(),
            gich::ELRSR0 | gich::ELRSR1 => {
                let count = (self.vtr.get() & 0x3f) + 1;
                let first = if offset == gich::ELRSR0 { 0 } else { 32 };
                let mut mask = 0;
                for i in first..count.min(first + 32) {
                    let lr = self.load(self.layout.gich(), gich::LR0 + i as u64 * 4, true);
                    if (lr >> 28) & 0x3 == 0 {
                        mask |= 1 << (i - first);
                    }
                }
                mask
            }
            _ => self.load(self.layout.gich(), offset, true),
        }
    }
}

impl RegisterIo for SimGic {
    fn read8(&self, addr: u64) -> u8 {
        (self.read32(addr & !3) >> ((addr & 3) * 8)) as u8
    }

    fn write8(&self, addr: u64, value: u8) {
        let aligned = addr & !3;
        let shift = (addr & 3) * 8;
        let old = self.read32(aligned);
        self.write32(aligned, (old & !(0xff << shift)) | ((value as u32) << shift));
    }

    fn read16(&self, addr: u64) -> u16 {
        (self.read32(addr & !3) >> ((addr & 2) * 8)) as u16
    }

    fn write16(&self, addr: u64, value: u16) {
        let aligned = addr & !3;
        let shift = (addr & 2) * 8;
        let old = self.read32(aligned);
        self.write32(aligned, (old & !(0xffff << shift)) | ((value as u32) << shift));
    }

    fn read32(&self, addr: u64) -> u32 {
        match self.frame(addr) {
            Frame::Dist(off) => self.read_dist(off),
            Frame::Cpu(off) => self.read_cpu(off),
            Frame::Hyp(off) => self.read_hyp(off),
            Frame::Virt(off) => self.load(self.layout.gicv(), off, true),
            Frame::Outside => 0,
        }
    }

    fn write32(&self, addr: u64, value: u32) {
        self.writes.borrow_mut().push((self.core.get(), addr, value));
        match self.frame(addr) {
            Frame::Dist(off) => self.write_dist(off, value),
            Frame::Cpu(off) => self.store(self.layout.gicc(), off, true, value),
            Frame::Hyp(off) => match off {
                gich::VTR | gich::ELRSR0 | gich::ELRSR1 | gich::MISR => {}
                _ => self.store(self.layout.gich(), off, true, value),
            },
            Frame::Virt(off) => self.store(self.layout.gicv(), off, true, value),
            Frame::Outside => {}
        }
    }
}
