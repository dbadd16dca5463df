//! Function frame layout
//!
//! ```text
//!   caller's $sp = $s7 ->  +------------------+
//!                          | $ra (if calls)   |  size-4
//!                          | caller's $fp     |
//!                          | caller's $s7     |
//!                          | saved $s0..      |  <- $fp = $sp + savedBase
//!                          | locals           |  (off - L)($fp)
//!                          | temporaries      |  -(L + slot)($fp)
//!                   $sp -> +------------------+
//! ```
//!
//! Stack-passed parameters (index 4 and up) sit above the frame and are
//! reached through `$s7`. The first four parameters stay in registers:
//! `$s<i>` when the prologue preserved them, `$a<i>` otherwise.

use crate::regmgmt::{CanonicalLocation, Home};
use lcc_codegen::{AsmInst, Mem, Reg};
use lcc_common::{align_to, CompilerError, TempId};
use lcc_ir::{Address, FunctionBlock, Instruction, Location};
use log::{debug, trace};
use std::collections::BTreeMap;

/// Argument registers available to the calling convention
const ARG_REGISTERS: u32 = 4;

#[derive(Debug, Clone)]
pub struct FunctionFrame {
    label: String,
    name: String,
    exported: bool,
    locals: u32,
    params: u32,
    temp_slots: BTreeMap<TempId, u32>,
    makes_calls: bool,
    max_args: u32,
}

impl FunctionFrame {
    /// Pre-pass over a function: temporary slots in first-reference order,
    /// whether it calls anything, and its widest call
    pub fn analyze(function: &FunctionBlock<'_>) -> Result<Self, CompilerError> {
        let name = function
            .name
            .name()
            .ok_or_else(|| CompilerError::internal(format!("{} is not a function name", function.name)))?;

        let mut frame = Self {
            label: function.label(),
            name: name.to_string(),
            exported: matches!(function.name.location(), Location::Global(_)),
            locals: function.locals,
            params: function.params,
            temp_slots: BTreeMap::new(),
            makes_calls: false,
            max_args: 0,
        };

        for inst in function.instructions {
            for addr in inst.addresses() {
                if let Location::Temporary(id) = addr.location() {
                    frame.temp_slot(*id);
                }
            }
            if let Instruction::Call { args, .. } = inst {
                frame.makes_calls = true;
                frame.max_args = frame.max_args.max(*args);
            }
        }

        let size = frame.size()?;
        debug!(
            "frame {}: {} local bytes, {} temps, calls={}, max args={}, size={}",
            frame.label,
            frame.locals,
            frame.temp_slots.len(),
            frame.makes_calls,
            frame.max_args,
            size
        );
        Ok(frame)
    }

    fn temp_slot(&mut self, id: TempId) -> u32 {
        let next = (self.temp_slots.len() as u32 + 1) * 4;
        *self.temp_slots.entry(id).or_insert_with(|| {
            trace!("temp t_{} -> slot {}", id, next);
            next
        })
    }

    /// Entry label, e.g. `gf_main`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label `return` branches to
    pub fn epilogue_label(&self) -> String {
        format!("xf_{}", self.name)
    }

    pub fn makes_calls(&self) -> bool {
        self.makes_calls
    }

    pub fn param_count(&self) -> u32 {
        self.params
    }

    pub fn temp_count(&self) -> u32 {
        self.temp_slots.len() as u32
    }

    /// Incoming argument registers copied into `$s0..` by the prologue
    pub fn saved_args(&self) -> u32 {
        self.max_args.min(ARG_REGISTERS)
    }

    fn locals_aligned(&self) -> Result<u32, CompilerError> {
        align_to(self.locals, 4)
    }

    pub fn size(&self) -> Result<u32, CompilerError> {
        let linkage = if self.makes_calls { 12 } else { 8 };
        let fixed = (self.saved_args() + self.temp_count()) * 4 + linkage;
        let unaligned = self
            .locals_aligned()?
            .checked_add(fixed)
            .ok_or_else(|| CompilerError::internal(format!("frame of {} is too large", self.label)))?;
        align_to(unaligned, 8)
    }

    fn layout(&self) -> Result<Layout, CompilerError> {
        let size = self.size()?;
        let size = i32::try_from(size)
            .map_err(|_| CompilerError::internal(format!("frame of {} is {} bytes", self.label, size)))?;
        let fp = if self.makes_calls { size - 8 } else { size - 4 };
        let s7 = fp - 4;
        Ok(Layout {
            size,
            ra: size - 4,
            fp,
            s7,
            saved_base: s7 - self.saved_args() as i32 * 4,
        })
    }

    fn saved_registers(&self, layout: &Layout) -> Vec<(Reg, Reg, i32)> {
        (0..self.saved_args())
            .filter_map(|i| {
                let saved = Reg::saved(i)?;
                let arg = Reg::arg(i)?;
                Some((saved, arg, layout.saved_base + i as i32 * 4))
            })
            .collect()
    }

    pub fn prologue(&self) -> Result<Vec<AsmInst>, CompilerError> {
        let layout = self.layout()?;
        let mut insts = vec![AsmInst::Label(self.label.clone())];
        if self.exported {
            insts.push(AsmInst::Globl(self.label.clone()));
        }
        insts.push(AsmInst::SubuImm(Reg::Sp, Reg::Sp, layout.size));
        if self.makes_calls {
            insts.push(AsmInst::Sw(Reg::Ra, Mem::Offset(layout.ra, Reg::Sp)));
        }
        insts.push(AsmInst::Sw(Reg::Fp, Mem::Offset(layout.fp, Reg::Sp)));
        insts.push(AsmInst::Sw(Reg::S7, Mem::Offset(layout.s7, Reg::Sp)));
        for (saved, arg, offset) in self.saved_registers(&layout) {
            insts.push(AsmInst::Sw(saved, Mem::Offset(offset, Reg::Sp)));
            insts.push(AsmInst::Move(saved, arg));
        }
        insts.push(AsmInst::Addiu(Reg::Fp, Reg::Sp, layout.saved_base));
        insts.push(AsmInst::Addiu(Reg::S7, Reg::Sp, layout.size));
        Ok(insts)
    }

    pub fn epilogue(&self) -> Result<Vec<AsmInst>, CompilerError> {
        let layout = self.layout()?;
        let mut insts = vec![AsmInst::Label(self.epilogue_label())];
        for (saved, _, offset) in self.saved_registers(&layout) {
            insts.push(AsmInst::Lw(saved, Mem::Offset(offset, Reg::Sp)));
        }
        insts.push(AsmInst::Lw(Reg::S7, Mem::Offset(layout.s7, Reg::Sp)));
        insts.push(AsmInst::Lw(Reg::Fp, Mem::Offset(layout.fp, Reg::Sp)));
        if self.makes_calls {
            insts.push(AsmInst::Lw(Reg::Ra, Mem::Offset(layout.ra, Reg::Sp)));
        }
        insts.push(AsmInst::Addiu(Reg::Sp, Reg::Sp, layout.size));
        insts.push(AsmInst::Jr(Reg::Ra));
        Ok(insts)
    }
}

/// `$sp`-relative offsets of the fixed frame slots
struct Layout {
    size: i32,
    ra: i32,
    fp: i32,
    s7: i32,
    /// Saved `$s0`; `$fp` points here
    saved_base: i32,
}

impl CanonicalLocation for FunctionFrame {
    fn home(&mut self, addr: &Address) -> Result<Home, CompilerError> {
        let locals = self.locals_aligned()? as i32;
        match addr.location() {
            Location::Local(offset) => Ok(Home::Memory(Mem::Offset(*offset as i32 - locals, Reg::Fp))),
            Location::Temporary(id) => {
                let slot = self.temp_slot(*id) as i32;
                Ok(Home::Memory(Mem::Offset(-(locals + slot), Reg::Fp)))
            }
            Location::Parameter(offset) => {
                let index = offset / 4;
                if index >= ARG_REGISTERS {
                    return Ok(Home::Memory(Mem::Offset(*offset as i32 - 16, Reg::S7)));
                }
                let reg = if index < self.saved_args() { Reg::saved(index) } else { Reg::arg(index) };
                reg.map(Home::Register)
                    .ok_or_else(|| CompilerError::internal(format!("no register for parameter {}", addr)))
            }
            Location::Global(_) | Location::ModuleStatic(_) if !addr.is_function() => {
                Ok(Home::Memory(Mem::Symbol(addr.to_string())))
            }
            Location::StringLiteral(_) => Ok(Home::Memory(Mem::Symbol(addr.to_string()))),
            _ => Err(CompilerError::internal(format!(
                "{} has no canonical location in {}",
                addr, self.label
            ))),
        }
    }
}
