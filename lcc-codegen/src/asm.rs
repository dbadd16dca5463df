//! MIPS Assembly Instruction Definitions
//!
//! This module defines the register model and the subset of the MIPS32
//! instruction set (plus SPIM pseudo-instructions and directives) that the
//! LittleC backend emits.

use std::fmt;

/// MIPS32 Register Set
///
/// Only the registers the backend actually touches are modelled:
/// - `$t0`-`$t9`: scratch registers handed out by the allocator
/// - `$a0`-`$a3`: outgoing/incoming arguments
/// - `$s0`-`$s3`: preserved copies of incoming arguments
/// - `$s7`: caller's stack pointer, base for stack-passed parameters
/// - `$v0`: return value and syscall number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    Zero,
    At,
    V0, V1,
    A0, A1, A2, A3,
    T0, T1, T2, T3, T4, T5, T6, T7, T8, T9,
    S0, S1, S2, S3, S4, S5, S6, S7,
    Sp,
    Fp,
    Ra,
}

impl Reg {
    /// Registers the allocator may hand out, in preference order
    pub const SCRATCH: [Reg; 10] = [
        Reg::T0, Reg::T1, Reg::T2, Reg::T3, Reg::T4,
        Reg::T5, Reg::T6, Reg::T7, Reg::T8, Reg::T9,
    ];

    /// Argument register `$a<i>`
    pub fn arg(index: u32) -> Option<Reg> {
        [Reg::A0, Reg::A1, Reg::A2, Reg::A3].get(index as usize).copied()
    }

    /// Saved register `$s<i>`
    pub fn saved(index: u32) -> Option<Reg> {
        [Reg::S0, Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6, Reg::S7]
            .get(index as usize)
            .copied()
    }

    pub fn is_scratch(&self) -> bool {
        Reg::SCRATCH.contains(self)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Zero => "$zero",
            Reg::At => "$at",
            Reg::V0 => "$v0",
            Reg::V1 => "$v1",
            Reg::A0 => "$a0",
            Reg::A1 => "$a1",
            Reg::A2 => "$a2",
            Reg::A3 => "$a3",
            Reg::T0 => "$t0",
            Reg::T1 => "$t1",
            Reg::T2 => "$t2",
            Reg::T3 => "$t3",
            Reg::T4 => "$t4",
            Reg::T5 => "$t5",
            Reg::T6 => "$t6",
            Reg::T7 => "$t7",
            Reg::T8 => "$t8",
            Reg::T9 => "$t9",
            Reg::S0 => "$s0",
            Reg::S1 => "$s1",
            Reg::S2 => "$s2",
            Reg::S3 => "$s3",
            Reg::S4 => "$s4",
            Reg::S5 => "$s5",
            Reg::S6 => "$s6",
            Reg::S7 => "$s7",
            Reg::Sp => "$sp",
            Reg::Fp => "$fp",
            Reg::Ra => "$ra",
        };
        f.write_str(name)
    }
}

/// Memory operand: `offset(base)` or a data label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mem {
    Offset(i32, Reg),
    Symbol(String),
}

impl fmt::Display for Mem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mem::Offset(offset, base) => write!(f, "{}({})", offset, base),
            Mem::Symbol(label) => f.write_str(label),
        }
    }
}

/// One `.word`/`.byte` operand; a count repeats the value (`0:10`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataValue {
    pub value: i64,
    pub count: Option<u32>,
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            Some(count) => write!(f, "{}:{}", self.value, count),
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Data,
    Text,
}

/// MIPS Assembly Instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInst {
    // Memory
    La(Reg, Mem),                 // rd = &mem
    Lw(Reg, Mem),                 // rd = word at mem
    Lb(Reg, Mem),                 // rd = sign-extended byte at mem
    Sw(Reg, Mem),                 // word at mem = rs
    Sb(Reg, Mem),                 // byte at mem = rs
    Li(Reg, i32),                 // rd = immediate
    Move(Reg, Reg),               // rd = rs

    // Arithmetic and logic
    Addu(Reg, Reg, Reg),
    Subu(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),
    Div(Reg, Reg, Reg),
    Rem(Reg, Reg, Reg),
    And(Reg, Reg, Reg),
    Or(Reg, Reg, Reg),
    Xor(Reg, Reg, Reg),
    Sllv(Reg, Reg, Reg),          // rd = rs << rt
    Srav(Reg, Reg, Reg),          // rd = rs >> rt (arithmetic)
    Negu(Reg, Reg),
    Not(Reg, Reg),

    // Set on comparison
    Slt(Reg, Reg, Reg),
    Sle(Reg, Reg, Reg),
    Sgt(Reg, Reg, Reg),
    Sge(Reg, Reg, Reg),
    Seq(Reg, Reg, Reg),
    Sne(Reg, Reg, Reg),

    // Immediate forms
    Sll(Reg, Reg, u32),
    Sra(Reg, Reg, u32),
    Addiu(Reg, Reg, i32),
    AdduImm(Reg, Reg, i32),       // addu rd, rs, imm (stack pops)
    SubuImm(Reg, Reg, i32),       // subu rd, rs, imm (stack pushes, frame setup)

    // Control flow
    Blt(Reg, Reg, String),
    Ble(Reg, Reg, String),
    Bgt(Reg, Reg, String),
    Bge(Reg, Reg, String),
    Beq(Reg, Reg, String),
    Bne(Reg, Reg, String),
    Bnez(Reg, String),
    Beqz(Reg, String),
    B(String),
    J(String),
    Jal(String),
    Jr(Reg),
    Syscall,

    // Directives
    Label(String),
    Globl(String),
    Section(Section),
    Align(u32),
    Word(Vec<DataValue>),
    Byte(Vec<DataValue>),
    Comment(String),
}

impl AsmInst {
    /// Labels are the only lines written at column 0
    pub fn is_label(&self) -> bool {
        matches!(self, AsmInst::Label(_))
    }
}

fn join(values: &[DataValue]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Memory
            AsmInst::La(rd, mem) => write!(f, "la {}, {}", rd, mem),
            AsmInst::Lw(rd, mem) => write!(f, "lw {}, {}", rd, mem),
            AsmInst::Lb(rd, mem) => write!(f, "lb {}, {}", rd, mem),
            AsmInst::Sw(rs, mem) => write!(f, "sw {}, {}", rs, mem),
            AsmInst::Sb(rs, mem) => write!(f, "sb {}, {}", rs, mem),
            AsmInst::Li(rd, imm) => write!(f, "li {}, {}", rd, imm),
            AsmInst::Move(rd, rs) => write!(f, "move {}, {}", rd, rs),

            // Arithmetic and logic
            AsmInst::Addu(rd, rs, rt) => write!(f, "addu {}, {}, {}", rd, rs, rt),
            AsmInst::Subu(rd, rs, rt) => write!(f, "subu {}, {}, {}", rd, rs, rt),
            AsmInst::Mul(rd, rs, rt) => write!(f, "mul {}, {}, {}", rd, rs, rt),
            AsmInst::Div(rd, rs, rt) => write!(f, "div {}, {}, {}", rd, rs, rt),
            AsmInst::Rem(rd, rs, rt) => write!(f, "rem {}, {}, {}", rd, rs, rt),
            AsmInst::And(rd, rs, rt) => write!(f, "and {}, {}, {}", rd, rs, rt),
            AsmInst::Or(rd, rs, rt) => write!(f, "or {}, {}, {}", rd, rs, rt),
            AsmInst::Xor(rd, rs, rt) => write!(f, "xor {}, {}, {}", rd, rs, rt),
            AsmInst::Sllv(rd, rs, rt) => write!(f, "sllv {}, {}, {}", rd, rs, rt),
            AsmInst::Srav(rd, rs, rt) => write!(f, "srav {}, {}, {}", rd, rs, rt),
            AsmInst::Negu(rd, rs) => write!(f, "negu {}, {}", rd, rs),
            AsmInst::Not(rd, rs) => write!(f, "not {}, {}", rd, rs),

            // Set on comparison
            AsmInst::Slt(rd, rs, rt) => write!(f, "slt {}, {}, {}", rd, rs, rt),
            AsmInst::Sle(rd, rs, rt) => write!(f, "sle {}, {}, {}", rd, rs, rt),
            AsmInst::Sgt(rd, rs, rt) => write!(f, "sgt {}, {}, {}", rd, rs, rt),
            AsmInst::Sge(rd, rs, rt) => write!(f, "sge {}, {}, {}", rd, rs, rt),
            AsmInst::Seq(rd, rs, rt) => write!(f, "seq {}, {}, {}", rd, rs, rt),
            AsmInst::Sne(rd, rs, rt) => write!(f, "sne {}, {}, {}", rd, rs, rt),

            // Immediate forms
            AsmInst::Sll(rd, rs, shamt) => write!(f, "sll {}, {}, {}", rd, rs, shamt),
            AsmInst::Sra(rd, rs, shamt) => write!(f, "sra {}, {}, {}", rd, rs, shamt),
            AsmInst::Addiu(rd, rs, imm) => write!(f, "addiu {}, {}, {}", rd, rs, imm),
            AsmInst::AdduImm(rd, rs, imm) => write!(f, "addu {}, {}, {}", rd, rs, imm),
            AsmInst::SubuImm(rd, rs, imm) => write!(f, "subu {}, {}, {}", rd, rs, imm),

            // Control flow
            AsmInst::Blt(rs, rt, label) => write!(f, "blt {}, {}, {}", rs, rt, label),
            AsmInst::Ble(rs, rt, label) => write!(f, "ble {}, {}, {}", rs, rt, label),
            AsmInst::Bgt(rs, rt, label) => write!(f, "bgt {}, {}, {}", rs, rt, label),
            AsmInst::Bge(rs, rt, label) => write!(f, "bge {}, {}, {}", rs, rt, label),
            AsmInst::Beq(rs, rt, label) => write!(f, "beq {}, {}, {}", rs, rt, label),
            AsmInst::Bne(rs, rt, label) => write!(f, "bne {}, {}, {}", rs, rt, label),
            AsmInst::Bnez(rs, label) => write!(f, "bnez {}, {}", rs, label),
            AsmInst::Beqz(rs, label) => write!(f, "beqz {}, {}", rs, label),
            AsmInst::B(label) => write!(f, "b {}", label),
            AsmInst::J(label) => write!(f, "j {}", label),
            AsmInst::Jal(label) => write!(f, "jal {}", label),
            AsmInst::Jr(rs) => write!(f, "jr {}", rs),
            AsmInst::Syscall => write!(f, "syscall"),

            // Directives
            AsmInst::Label(label) => write!(f, "{}:", label),
            AsmInst::Globl(label) => write!(f, ".globl {}", label),
            AsmInst::Section(Section::Data) => write!(f, ".data"),
            AsmInst::Section(Section::Text) => write!(f, ".text"),
            AsmInst::Align(n) => write!(f, ".align {}", n),
            AsmInst::Word(values) => write!(f, ".word {}", join(values)),
            AsmInst::Byte(values) => write!(f, ".byte {}", join(values)),
            AsmInst::Comment(text) => write!(f, "# {}", text),
        }
    }
}
