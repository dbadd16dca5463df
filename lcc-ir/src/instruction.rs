//! IR Instructions
//!
//! One closed variant per operator family. `Display` produces the IR text
//! format line for the instruction (without the leading tab that the
//! program printer adds to indented lines).

use crate::{Address, Quadruple};
use lcc_common::Width;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relational operators usable in conditional branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl RelOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "<" => RelOp::Lt,
            "<=" => RelOp::Le,
            ">" => RelOp::Gt,
            ">=" => RelOp::Ge,
            "==" => RelOp::Eq,
            "!=" => RelOp::Ne,
            _ => return None,
        })
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Compare(RelOp),
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Compare(op) => op.symbol(),
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "&&" => BinaryOp::LogicalAnd,
            "||" => BinaryOp::LogicalOr,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            other => BinaryOp::Compare(RelOp::from_symbol(other)?),
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `&`: address of an array or string
    AddressOf,
    /// `#`: element count stored in an array's length word
    Length,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::AddressOf => "&",
            UnaryOp::Length => "#",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "-" => UnaryOp::Neg,
            "!" => UnaryOp::Not,
            "~" => UnaryOp::BitNot,
            "&" => UnaryOp::AddressOf,
            "#" => UnaryOp::Length,
            _ => return None,
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastKind {
    Widen,
    Narrow,
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastKind::Widen => write!(f, "widen"),
            CastKind::Narrow => write!(f, "narrow"),
        }
    }
}

/// Branch condition; a false condition falls through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Compare { op: RelOp, lhs: Address, rhs: Address },
    IfTrue(Address),
    IfFalse(Address),
}

/// `.db` / `.dw` data directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Byte,
    Word,
}

impl DataKind {
    pub fn from_directive(directive: &str) -> Option<Self> {
        match directive {
            ".db" => Some(DataKind::Byte),
            ".dw" => Some(DataKind::Word),
            _ => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Byte => write!(f, ".db"),
            DataKind::Word => write!(f, ".dw"),
        }
    }
}

/// One initializer value, optionally repeated (`value#count`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub value: i64,
    pub count: Option<u32>,
}

impl DataItem {
    pub fn single(value: i64) -> Self {
        Self { value, count: None }
    }

    pub fn repeated(value: i64, count: u32) -> Self {
        Self { value, count: Some(count) }
    }
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            Some(count) => write!(f, "{}#{}", self.value, count),
            None => write!(f, "{}", self.value),
        }
    }
}

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `g4_x: .dw 5`; for arrays the value is the element count
    GlobalDecl { name: Address, kind: DataKind, value: i64 },

    /// Initializer line following an array declaration: `.db 0#10`
    Data { kind: DataKind, items: Vec<DataItem> },

    /// `gf_main: .fnStart <localBytes> <paramCount>`
    FunctionStart { name: Address, locals: u32, params: u32 },

    /// `.fnEnd`
    FunctionEnd,

    /// `L1:`
    Label(String),

    /// `goto L1`
    Goto(String),

    /// `if a < b goto L1`, `if x goto L1`, `ifFalse x goto L1`
    Branch { condition: Condition, target: String },

    /// `x = y`
    Assign { dest: Address, src: Address },

    /// `t = widen x`
    Cast { kind: CastKind, dest: Address, src: Address },

    /// `t = - x`
    Unary { op: UnaryOp, dest: Address, src: Address },

    /// `t = a + b`
    Binary { op: BinaryOp, dest: Address, lhs: Address, rhs: Address },

    /// `l0@0 setsize4 10`: write the element count into the length word
    SetSize { array: Address, width: Width, count: u32 },

    /// `arr = idx stidx4 val`
    IndexedStore { array: Address, index: Address, value: Address, width: Width },

    /// `t = arr ldidx4 idx`
    IndexedLoad { dest: Address, array: Address, index: Address, width: Width },

    /// `param4 x`
    Param { width: Width, value: Address },

    /// `t = call gf_f,2` or `call gf_f,2`
    Call { dest: Option<Address>, function: Address, args: u32 },

    /// `return4 x` or `return`
    Return { width: Width, value: Option<Address> },
}

impl Instruction {
    /// Control may leave the enclosing block after this instruction
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            Instruction::Goto(_)
                | Instruction::Branch { .. }
                | Instruction::Return { .. }
                | Instruction::Call { .. }
                | Instruction::FunctionEnd
        )
    }

    /// Control may enter at this instruction from elsewhere
    pub fn starts_block(&self) -> bool {
        matches!(self, Instruction::Label(_) | Instruction::FunctionStart { .. })
    }

    /// Labels, global declarations and function headers sit at column 0
    pub fn is_indented(&self) -> bool {
        !matches!(
            self,
            Instruction::Label(_)
                | Instruction::GlobalDecl { .. }
                | Instruction::FunctionStart { .. }
        )
    }

    /// Address written by this instruction, if any
    pub fn dest(&self) -> Option<&Address> {
        match self {
            Instruction::Assign { dest, .. }
            | Instruction::Cast { dest, .. }
            | Instruction::Unary { dest, .. }
            | Instruction::Binary { dest, .. }
            | Instruction::IndexedLoad { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } => dest.as_ref(),
            _ => None,
        }
    }

    /// Every data address mentioned by this instruction, destination first
    pub fn addresses(&self) -> Vec<&Address> {
        match self {
            Instruction::GlobalDecl { name, .. } => vec![name],
            Instruction::Data { .. }
            | Instruction::FunctionStart { .. }
            | Instruction::FunctionEnd
            | Instruction::Label(_)
            | Instruction::Goto(_) => Vec::new(),
            Instruction::Branch { condition, .. } => match condition {
                Condition::Compare { lhs, rhs, .. } => vec![lhs, rhs],
                Condition::IfTrue(x) | Condition::IfFalse(x) => vec![x],
            },
            Instruction::Assign { dest, src }
            | Instruction::Cast { dest, src, .. }
            | Instruction::Unary { dest, src, .. } => vec![dest, src],
            Instruction::Binary { dest, lhs, rhs, .. } => vec![dest, lhs, rhs],
            Instruction::SetSize { array, .. } => vec![array],
            Instruction::IndexedStore { array, index, value, .. } => vec![array, index, value],
            Instruction::IndexedLoad { dest, array, index, .. } => vec![dest, array, index],
            Instruction::Param { value, .. } => vec![value],
            Instruction::Call { dest, .. } => dest.iter().collect(),
            Instruction::Return { value, .. } => value.iter().collect(),
        }
    }

    /// Legacy `(result, op1, op2, operator)` columns for this instruction
    pub fn quadruple(&self) -> Quadruple {
        let q = |result: String, op1: String, op2: String, operator: String| Quadruple {
            result,
            op1,
            op2,
            operator,
        };
        let none = String::new;
        match self {
            Instruction::GlobalDecl { name, kind, value } => {
                q(name.to_string(), kind.to_string(), value.to_string(), none())
            }
            Instruction::Data { .. } => q(self.to_string(), none(), none(), none()),
            Instruction::FunctionStart { name, locals, params } => q(
                name.to_string(),
                ".fnStart".to_string(),
                format!("{} {}", locals, params),
                none(),
            ),
            Instruction::FunctionEnd => q(".fnEnd".to_string(), none(), none(), none()),
            Instruction::Label(label) => q(format!("{}:", label), none(), none(), none()),
            Instruction::Goto(label) => q(format!("goto {}", label), none(), none(), none()),
            Instruction::Branch { condition, target } => {
                let result = format!("goto {}", target);
                match condition {
                    Condition::Compare { op, lhs, rhs } => {
                        q(result, lhs.to_string(), rhs.to_string(), format!("if{}", op))
                    }
                    Condition::IfTrue(x) => q(result, x.to_string(), none(), "if".to_string()),
                    Condition::IfFalse(x) => {
                        q(result, x.to_string(), none(), "ifFalse".to_string())
                    }
                }
            }
            Instruction::Assign { dest, src } => {
                q(dest.to_string(), src.to_string(), none(), "=".to_string())
            }
            Instruction::Cast { kind, dest, src } => {
                q(dest.to_string(), src.to_string(), none(), kind.to_string())
            }
            Instruction::Unary { op, dest, src } => {
                q(dest.to_string(), src.to_string(), none(), op.to_string())
            }
            Instruction::Binary { op, dest, lhs, rhs } => {
                q(dest.to_string(), lhs.to_string(), rhs.to_string(), op.to_string())
            }
            Instruction::SetSize { array, width, count } => q(
                array.to_string(),
                count.to_string(),
                none(),
                format!("setsize{}", width),
            ),
            Instruction::IndexedStore { array, index, value, width } => q(
                array.to_string(),
                index.to_string(),
                value.to_string(),
                format!("stidx{}", width),
            ),
            Instruction::IndexedLoad { dest, array, index, width } => q(
                dest.to_string(),
                array.to_string(),
                index.to_string(),
                format!("ldidx{}", width),
            ),
            Instruction::Param { width, value } => {
                q(none(), value.to_string(), none(), format!("param{}", width))
            }
            Instruction::Call { dest, function, args } => q(
                dest.as_ref().map(|d| d.to_string()).unwrap_or_default(),
                function.to_string(),
                args.to_string(),
                "call".to_string(),
            ),
            Instruction::Return { width, value } => match value {
                Some(value) => q(none(), value.to_string(), none(), format!("return{}", width)),
                None => q(none(), none(), none(), "return".to_string()),
            },
        }
    }
}

fn join_items(items: &[DataItem]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::GlobalDecl { name, kind, value } => write!(f, "{}: {} {}", name, kind, value),
            Instruction::Data { kind, items } => write!(f, "{} {}", kind, join_items(items)),
            Instruction::FunctionStart { name, locals, params } => {
                write!(f, "{}: .fnStart {} {}", name, locals, params)
            }
            Instruction::FunctionEnd => write!(f, ".fnEnd"),
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::Goto(label) => write!(f, "goto {}", label),
            Instruction::Branch { condition, target } => match condition {
                Condition::Compare { op, lhs, rhs } => {
                    write!(f, "if {} {} {} goto {}", lhs, op, rhs, target)
                }
                Condition::IfTrue(x) => write!(f, "if {} goto {}", x, target),
                Condition::IfFalse(x) => write!(f, "ifFalse {} goto {}", x, target),
            },
            Instruction::Assign { dest, src } => write!(f, "{} = {}", dest, src),
            Instruction::Cast { kind, dest, src } => write!(f, "{} = {} {}", dest, kind, src),
            Instruction::Unary { op, dest, src } => write!(f, "{} = {} {}", dest, op, src),
            Instruction::Binary { op, dest, lhs, rhs } => {
                write!(f, "{} = {} {} {}", dest, lhs, op, rhs)
            }
            Instruction::SetSize { array, width, count } => {
                write!(f, "{} setsize{} {}", array, width, count)
            }
            Instruction::IndexedStore { array, index, value, width } => {
                write!(f, "{} = {} stidx{} {}", array, index, width, value)
            }
            Instruction::IndexedLoad { dest, array, index, width } => {
                write!(f, "{} = {} ldidx{} {}", dest, array, width, index)
            }
            Instruction::Param { width, value } => write!(f, "param{} {}", width, value),
            Instruction::Call { dest: Some(dest), function, args } => {
                write!(f, "{} = call {},{}", dest, function, args)
            }
            Instruction::Call { dest: None, function, args } => {
                write!(f, "call {},{}", function, args)
            }
            Instruction::Return { value: None, .. } => write!(f, "return"),
            Instruction::Return { width, value: Some(value) } => {
                write!(f, "return{} {}", width, value)
            }
        }
    }
}
