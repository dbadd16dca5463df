//! Quadruple table
//!
//! The column-oriented view of a program: four parallel sequences holding
//! each instruction's result, first operand, second operand and operator.
//! Used for the debugging dump; every insertion re-checks that the columns
//! still line up.

use lcc_common::CompilerError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Quadruple {
    pub result: String,
    pub op1: String,
    pub op2: String,
    pub operator: String,
}

#[derive(Debug, Clone, Default)]
pub struct QuadTable {
    results: Vec<String>,
    op1s: Vec<String>,
    op2s: Vec<String>,
    operators: Vec<String>,
}

impl QuadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append a row
    pub fn add_line(&mut self, quad: Quadruple) -> Result<(), CompilerError> {
        let at = self.len();
        self.insert_line(at, quad)
    }

    /// Insert a row before position `at` (`at == len` appends)
    pub fn insert_line(&mut self, at: usize, quad: Quadruple) -> Result<(), CompilerError> {
        if at > self.len() {
            return Err(CompilerError::internal(format!(
                "quadruple insert at line {} past end of table ({} lines)",
                at,
                self.len()
            )));
        }
        self.results.insert(at, quad.result);
        self.op1s.insert(at, quad.op1);
        self.op2s.insert(at, quad.op2);
        self.operators.insert(at, quad.operator);
        self.check_aligned()
    }

    /// All four columns must have the same length
    pub fn check_aligned(&self) -> Result<(), CompilerError> {
        let len = self.results.len();
        if self.op1s.len() != len || self.op2s.len() != len || self.operators.len() != len {
            return Err(CompilerError::internal(format!(
                "misaligned quadruple table: result={}, op1={}, op2={}, operator={}",
                len,
                self.op1s.len(),
                self.op2s.len(),
                self.operators.len()
            )));
        }
        Ok(())
    }

    pub fn get(&self, line: usize) -> Option<Quadruple> {
        Some(Quadruple {
            result: self.results.get(line)?.clone(),
            op1: self.op1s.get(line)?.clone(),
            op2: self.op2s.get(line)?.clone(),
            operator: self.operators.get(line)?.clone(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Quadruple> + '_ {
        (0..self.len()).filter_map(|line| self.get(line))
    }
}

impl fmt::Display for QuadTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10} | {:>30} | {:>30} | {:>30} | {:>30} |",
            "Line #", "Res. Addr.", "Op1. Addr.", "Op2. Addr.", "Op"
        )?;
        for (line, quad) in self.rows().enumerate() {
            writeln!(
                f,
                "{:>10} | {:>30} | {:>30} | {:>30} | {:>30} |",
                line, quad.result, quad.op1, quad.op2, quad.operator
            )?;
        }
        Ok(())
    }
}
