//! Register descriptor state
//!
//! Tracks, for every scratch register, which addresses it currently holds
//! and, for every address, which registers hold it. Temporaries, and values
//! written into a register they already own, are left dirty and written
//! back lazily; every other write is stored to memory straight away.
//!
//! A register bound to a byte address always holds the sign-extended byte,
//! the same value `lb` would produce.

use super::{CanonicalLocation, Home};
use lcc_codegen::{AsmInst, Mem, Reg};
use lcc_common::{CompilerError, Width};
use lcc_ir::Address;
use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// Registers reused, in this order, when no scratch register is free
const FALLBACK: [Reg; 3] = [Reg::T0, Reg::T1, Reg::T2];

/// Which dirty values a flush writes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    All,
    /// Globals and module statics only; locals die with the frame
    StaticOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// The destination's canonical location is this register
    Home,
    /// The register already holds the destination and nothing else
    Resident,
    /// A newly chosen register; non-temporaries are stored after the operation
    Fresh,
}

/// Register chosen to receive a result; hand it back to `commit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dest {
    pub reg: Reg,
    placement: Placement,
}

#[derive(Debug, Default)]
pub struct RegisterState {
    addr_desc: BTreeMap<Address, BTreeSet<Reg>>,
    reg_desc: BTreeMap<Reg, BTreeSet<Address>>,
    dirty: BTreeSet<Address>,
    instructions: Vec<AsmInst>,
}

impl RegisterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, inst: AsmInst) {
        self.instructions.push(inst);
    }

    /// Drain the instructions emitted so far
    pub fn take_instructions(&mut self) -> Vec<AsmInst> {
        std::mem::take(&mut self.instructions)
    }

    /// Some register currently holding `addr`
    pub fn current_reg(&self, addr: &Address) -> Option<Reg> {
        self.addr_desc.get(addr).and_then(|regs| regs.iter().next().copied())
    }

    pub fn holds(&self, reg: Reg) -> Vec<&Address> {
        self.reg_desc.get(&reg).map(|addrs| addrs.iter().collect()).unwrap_or_default()
    }

    pub fn is_dirty(&self, addr: &Address) -> bool {
        self.dirty.contains(addr)
    }

    fn is_free(&self, reg: Reg) -> bool {
        self.reg_desc.get(&reg).map_or(true, |addrs| addrs.is_empty())
    }

    fn bind(&mut self, addr: &Address, reg: Reg) {
        trace!("bind {} -> {}", addr, reg);
        self.addr_desc.entry(addr.clone()).or_default().insert(reg);
        self.reg_desc.entry(reg).or_default().insert(addr.clone());
    }

    fn unbind(&mut self, addr: &Address, reg: Reg) {
        if let Some(regs) = self.addr_desc.get_mut(addr) {
            regs.remove(&reg);
            if regs.is_empty() {
                self.addr_desc.remove(addr);
            }
        }
        if let Some(addrs) = self.reg_desc.get_mut(&reg) {
            addrs.remove(addr);
            if addrs.is_empty() {
                self.reg_desc.remove(&reg);
            }
        }
    }

    /// Remove `addr` from every register except `keep`
    fn detach(&mut self, addr: &Address, keep: Option<Reg>) {
        let regs: Vec<Reg> = self.addr_desc.get(addr).map(|r| r.iter().copied().collect()).unwrap_or_default();
        for reg in regs.into_iter().filter(|r| Some(*r) != keep) {
            self.unbind(addr, reg);
        }
    }

    /// Empty `reg`, writing back any dirty value only it holds
    fn evict<H: CanonicalLocation>(&mut self, reg: Reg, homes: &mut H) -> Result<(), CompilerError> {
        let addrs: Vec<Address> = self.holds(reg).into_iter().cloned().collect();
        for addr in addrs {
            let sole_copy = self.addr_desc.get(&addr).map_or(false, |regs| regs.len() == 1);
            if sole_copy && self.dirty.remove(&addr) {
                trace!("spill {} from {}", addr, reg);
                self.store(reg, &addr, homes)?;
            }
            self.unbind(&addr, reg);
        }
        Ok(())
    }

    /// Pick a register to overwrite. A free scratch register wins; otherwise
    /// the first fallback register not in `avoid` is evicted.
    fn select<H: CanonicalLocation>(&mut self, avoid: &[Reg], homes: &mut H) -> Result<Reg, CompilerError> {
        if let Some(reg) = Reg::SCRATCH.iter().copied().find(|r| !avoid.contains(r) && self.is_free(*r)) {
            return Ok(reg);
        }
        let victim = FALLBACK
            .iter()
            .chain(Reg::SCRATCH.iter())
            .copied()
            .find(|r| !avoid.contains(r))
            .ok_or_else(|| CompilerError::internal("every scratch register is in use by the current instruction"))?;
        trace!("no free register, reusing {}", victim);
        self.evict(victim, homes)?;
        Ok(victim)
    }

    /// A register for intermediate results, bound to no address
    pub fn scratch<H: CanonicalLocation>(&mut self, avoid: &[Reg], homes: &mut H) -> Result<Reg, CompilerError> {
        self.select(avoid, homes)
    }

    /// Write `reg` to the canonical location of `addr`
    fn store<H: CanonicalLocation>(&mut self, reg: Reg, addr: &Address, homes: &mut H) -> Result<(), CompilerError> {
        match homes.home(addr)? {
            Home::Register(home) if home == reg => {}
            Home::Register(home) => self.emit(AsmInst::Move(home, reg)),
            Home::Memory(mem) if addr.width() == Width::Byte => self.emit(AsmInst::Sb(reg, mem)),
            Home::Memory(mem) => self.emit(AsmInst::Sw(reg, mem)),
        }
        Ok(())
    }

    /// Sign-extend the low byte of `reg` unless the last instruction did
    fn narrow(&mut self, reg: Reg) {
        let narrowed = match self.instructions.last() {
            Some(AsmInst::Sra(rd, _, 24)) | Some(AsmInst::Lb(rd, _)) => *rd == reg,
            _ => false,
        };
        if !narrowed {
            self.emit(AsmInst::Sll(reg, reg, 24));
            self.emit(AsmInst::Sra(reg, reg, 24));
        }
    }

    fn load(&mut self, reg: Reg, addr: &Address, mem: Mem) {
        let inst = match addr.width() {
            Width::Unsized if addr.param_index().is_none() => AsmInst::La(reg, mem),
            Width::Byte => AsmInst::Lb(reg, mem),
            _ => AsmInst::Lw(reg, mem),
        };
        self.emit(inst);
    }

    /// Register holding the value of `addr`, loading it if necessary
    pub fn operand<H: CanonicalLocation>(
        &mut self,
        addr: &Address,
        avoid: &[Reg],
        homes: &mut H,
    ) -> Result<Reg, CompilerError> {
        if let Some(reg) = self.current_reg(addr) {
            return Ok(reg);
        }

        if let Some(value) = addr.literal_value() {
            let reg = self.select(avoid, homes)?;
            self.emit(AsmInst::Li(reg, value));
            self.bind(addr, reg);
            return Ok(reg);
        }

        match homes.home(addr)? {
            Home::Register(reg) => Ok(reg),
            Home::Memory(mem) => {
                let reg = self.select(avoid, homes)?;
                self.load(reg, addr, mem);
                self.bind(addr, reg);
                Ok(reg)
            }
        }
    }

    /// Register that will receive a new value for `addr`
    pub fn destination<H: CanonicalLocation>(
        &mut self,
        addr: &Address,
        avoid: &[Reg],
        homes: &mut H,
    ) -> Result<Dest, CompilerError> {
        if addr.is_literal() {
            return Err(CompilerError::internal(format!("cannot assign to literal {}", addr)));
        }
        if let Home::Register(reg) = homes.home(addr)? {
            return Ok(Dest { reg, placement: Placement::Home });
        }

        let resident = self.addr_desc.get(addr).and_then(|regs| {
            regs.iter().copied().find(|r| {
                self.reg_desc.get(r).map_or(false, |addrs| addrs.len() == 1)
            })
        });
        if let Some(reg) = resident {
            return Ok(Dest { reg, placement: Placement::Resident });
        }

        let reg = self.select(avoid, homes)?;
        Ok(Dest { reg, placement: Placement::Fresh })
    }

    /// Record that `dest.reg` now holds the new value of `addr`
    pub fn commit<H: CanonicalLocation>(
        &mut self,
        dest: Dest,
        addr: &Address,
        homes: &mut H,
    ) -> Result<(), CompilerError> {
        if addr.width() == Width::Byte {
            self.narrow(dest.reg);
        }
        match dest.placement {
            Placement::Home => {}
            Placement::Resident => {
                self.detach(addr, Some(dest.reg));
                self.dirty.insert(addr.clone());
            }
            Placement::Fresh => {
                let stale: Vec<Address> = self.holds(dest.reg).into_iter().cloned().collect();
                for old in stale {
                    self.unbind(&old, dest.reg);
                }
                self.detach(addr, None);
                self.bind(addr, dest.reg);
                if addr.is_temp() {
                    self.dirty.insert(addr.clone());
                } else {
                    self.store(dest.reg, addr, homes)?;
                    self.dirty.remove(addr);
                }
            }
        }
        Ok(())
    }

    /// `addr = <value in src>`: the destination shares the source register
    /// when the register holds exactly its value
    pub fn assign<H: CanonicalLocation>(
        &mut self,
        addr: &Address,
        src: Reg,
        homes: &mut H,
    ) -> Result<(), CompilerError> {
        self.detach(addr, None);
        self.dirty.remove(addr);

        match homes.home(addr)? {
            Home::Register(home) if home == src => {}
            Home::Register(home) => {
                self.emit(AsmInst::Move(home, src));
                if addr.width() == Width::Byte {
                    self.narrow(home);
                }
            }
            // `src` keeps the full word; only memory holds the byte
            Home::Memory(_) if addr.width() == Width::Byte || !src.is_scratch() => {
                self.store(src, addr, homes)?;
            }
            Home::Memory(_) => {
                self.bind(addr, src);
                if addr.is_temp() {
                    self.dirty.insert(addr.clone());
                } else {
                    self.store(src, addr, homes)?;
                }
            }
        }
        Ok(())
    }

    /// Write back dirty values in `scope`
    pub fn flush<H: CanonicalLocation>(&mut self, scope: FlushScope, homes: &mut H) -> Result<(), CompilerError> {
        let pending: Vec<Address> = self
            .dirty
            .iter()
            .filter(|addr| scope == FlushScope::All || addr.is_static_storage())
            .cloned()
            .collect();
        for addr in pending {
            let reg = self
                .current_reg(&addr)
                .ok_or_else(|| CompilerError::internal(format!("dirty value {} has no register", addr)))?;
            trace!("flush {} from {}", addr, reg);
            self.store(reg, &addr, homes)?;
            self.dirty.remove(&addr);
        }
        Ok(())
    }

    /// Drop every descriptor at a basic-block boundary
    pub fn forget_all(&mut self) {
        trace!("forgetting {} register bindings", self.reg_desc.len());
        self.addr_desc.clear();
        self.reg_desc.clear();
        self.dirty.clear();
    }

    /// Scratch registers are clobbered by a call. Dirty values must have
    /// been flushed already.
    pub fn invalidate_scratch(&mut self) -> Result<(), CompilerError> {
        if let Some(addr) = self.dirty.iter().next() {
            return Err(CompilerError::internal(format!("{} would be lost across a call", addr)));
        }
        trace!("invalidating scratch registers");
        self.addr_desc.clear();
        self.reg_desc.clear();
        Ok(())
    }

    /// Verify the two descriptor maps are inverses and no value is lost
    pub fn check_consistency(&self) -> Result<(), CompilerError> {
        for (addr, regs) in &self.addr_desc {
            for reg in regs {
                if !self.reg_desc.get(reg).map_or(false, |addrs| addrs.contains(addr)) {
                    return Err(CompilerError::internal(format!(
                        "descriptor mismatch: {} lists {} but {} does not list {}",
                        addr, reg, reg, addr
                    )));
                }
            }
        }
        for (reg, addrs) in &self.reg_desc {
            for addr in addrs {
                if !self.addr_desc.get(addr).map_or(false, |regs| regs.contains(reg)) {
                    return Err(CompilerError::internal(format!(
                        "descriptor mismatch: {} lists {} but {} does not list {}",
                        reg, addr, addr, reg
                    )));
                }
            }
        }
        if let Some(addr) = self.dirty.iter().find(|addr| !self.addr_desc.contains_key(*addr)) {
            return Err(CompilerError::internal(format!("dirty value {} is held by no register", addr)));
        }
        Ok(())
    }
}
