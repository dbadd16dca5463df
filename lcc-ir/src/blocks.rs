//! Basic Block Partitioning
//!
//! A single algorithm serves both granularities: a whole program and the
//! body of one function are both just ordered instruction slices.

use crate::Instruction;
use serde::Serialize;

/// Straight-line run of instructions with a single entry and exit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicBlock<'a> {
    /// Index of the first instruction within the partitioned slice
    pub start: usize,
    pub instructions: &'a [Instruction],
}

impl<'a> BasicBlock<'a> {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// One past the index of the last instruction
    pub fn end(&self) -> usize {
        self.start + self.instructions.len()
    }

    /// Label the block is entered through, if it begins with one
    pub fn label(&self) -> Option<&'a str> {
        match self.instructions.first() {
            Some(Instruction::Label(label)) => Some(label),
            _ => None,
        }
    }

    /// Final instruction when it transfers control
    pub fn terminator(&self) -> Option<&'a Instruction> {
        self.instructions.last().filter(|inst| inst.ends_block())
    }
}

/// Split `instructions` into basic blocks.
///
/// A block starts at the first instruction, at any label (unless the block
/// being built is still empty) and right after an instruction that ends a
/// block. Concatenating the blocks reproduces the input exactly.
pub fn partition(instructions: &[Instruction]) -> Vec<BasicBlock<'_>> {
    let mut blocks = Vec::new();
    let mut start = 0;

    for (i, inst) in instructions.iter().enumerate() {
        if inst.starts_block() && i > start {
            blocks.push(BasicBlock { start, instructions: &instructions[start..i] });
            start = i;
        }
        if inst.ends_block() {
            blocks.push(BasicBlock { start, instructions: &instructions[start..=i] });
            start = i + 1;
        }
    }

    if start < instructions.len() {
        blocks.push(BasicBlock { start, instructions: &instructions[start..] });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Condition, RelOp};
    use lcc_common::Width;
    use proptest::prelude::*;

    fn assign(n: u32) -> Instruction {
        Instruction::Assign {
            dest: Address::temp(n, Width::Word).unwrap(),
            src: Address::literal(n as i32),
        }
    }

    fn branch(target: &str) -> Instruction {
        Instruction::Branch {
            condition: Condition::Compare {
                op: RelOp::Lt,
                lhs: Address::temp(1, Width::Word).unwrap(),
                rhs: Address::literal(3),
            },
            target: target.to_string(),
        }
    }

    #[test]
    fn test_labels_and_jumps_split_blocks() {
        let insts = vec![
            assign(1),
            Instruction::Label("L1".into()),
            assign(2),
            branch("L1"),
            assign(3),
            Instruction::Goto("L2".into()),
            Instruction::Label("L2".into()),
            Instruction::FunctionEnd,
        ];
        let blocks = partition(&insts);
        let spans: Vec<(usize, usize)> = blocks.iter().map(|b| (b.start, b.len())).collect();
        assert_eq!(spans, vec![(0, 1), (1, 3), (4, 2), (6, 2)]);
        assert_eq!(blocks[1].label(), Some("L1"));
        assert!(matches!(blocks[2].terminator(), Some(Instruction::Goto(_))));
        assert!(blocks[0].terminator().is_none());
    }

    #[test]
    fn test_label_after_jump_does_not_create_empty_block() {
        let insts = vec![Instruction::Goto("L1".into()), Instruction::Label("L1".into())];
        let blocks = partition(&insts);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        assert!(partition(&[]).is_empty());
    }

    fn any_instruction() -> impl Strategy<Value = Instruction> {
        prop_oneof![
            (1u32..50).prop_map(assign),
            (1u32..5).prop_map(|n| Instruction::Label(format!("L{}", n))),
            (1u32..5).prop_map(|n| Instruction::Goto(format!("L{}", n))),
            (1u32..5).prop_map(|n| branch(&format!("L{}", n))),
            Just(Instruction::Return { width: Width::Unsized, value: None }),
        ]
    }

    proptest! {
        #[test]
        fn prop_partition_is_sound(insts in prop::collection::vec(any_instruction(), 0..40)) {
            let blocks = partition(&insts);

            // Concatenation reproduces the input
            let joined: Vec<Instruction> = blocks
                .iter()
                .flat_map(|b| b.instructions.iter().cloned())
                .collect();
            prop_assert_eq!(&joined, &insts);

            for block in &blocks {
                prop_assert!(!block.is_empty());
                // Only the first instruction may be a label
                for inst in &block.instructions[1..] {
                    prop_assert!(!inst.starts_block());
                }
                // Only the last instruction may leave the block
                for inst in &block.instructions[..block.len() - 1] {
                    prop_assert!(!inst.ends_block());
                }
            }
        }
    }
}
