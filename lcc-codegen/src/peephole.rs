//! Peephole optimizer
//!
//! Three local rewrites over adjacent instructions, repeated until a whole
//! round leaves the code unchanged:
//!
//! 1. `sw R, M` then `lw R, M`: the load is dropped.
//! 2. `sw R1, M` then `lw R2, M`: the load becomes `move R2, R1`.
//!    `lw R, M` then `sw R, M`: the store is dropped.
//! 3. A jump label (`L<n>`) defined more than once keeps only its last
//!    definition. Function entry and exit labels are never touched.
//!
//! Only word accesses are paired; a byte store truncates, so the value
//! read back may differ from the register. `lw R1, M` then `sw R2, M` with
//! different registers stores a new value and is left alone, as are `li`
//! pairs.

use crate::{AsmInst, Mem, Reg};
use log::debug;
use std::collections::HashSet;

/// Run every rewrite to a fixed point
pub fn optimize(instructions: Vec<AsmInst>) -> Vec<AsmInst> {
    let mut insts = instructions;
    let mut rounds = 0;
    let mut changed = true;

    while changed {
        changed = false;
        changed |= remove_redundant_reloads(&mut insts);
        changed |= forward_stored_values(&mut insts);
        changed |= remove_duplicate_labels(&mut insts);
        rounds += 1;
    }

    debug!("peephole: fixed point after {} rounds, {} instructions", rounds, insts.len());
    insts
}

/// Rewrite adjacent pairs; `rule` returns the replacement for a matching pair
fn rewrite_pairs<F>(insts: &mut Vec<AsmInst>, rule: F) -> bool
where
    F: Fn(&AsmInst, &AsmInst) -> Option<Vec<AsmInst>>,
{
    let mut out = Vec::with_capacity(insts.len());
    let mut changed = false;
    let mut i = 0;

    while i < insts.len() {
        if let Some(next) = insts.get(i + 1) {
            if let Some(replacement) = rule(&insts[i], next) {
                debug!("peephole: `{}` / `{}` -> {} instructions", insts[i], next, replacement.len());
                out.extend(replacement);
                changed = true;
                i += 2;
                continue;
            }
        }
        out.push(insts[i].clone());
        i += 1;
    }

    *insts = out;
    changed
}

fn remove_redundant_reloads(insts: &mut Vec<AsmInst>) -> bool {
    rewrite_pairs(insts, |first, second| match (first, second) {
        (AsmInst::Sw(stored, to), AsmInst::Lw(loaded, from)) if stored == loaded && to == from => {
            Some(vec![first.clone()])
        }
        _ => None,
    })
}

fn forward_stored_values(insts: &mut Vec<AsmInst>) -> bool {
    rewrite_pairs(insts, |first, second| match (first, second) {
        (AsmInst::Sw(stored, to), AsmInst::Lw(loaded, from)) if to == from && stored != loaded => {
            Some(vec![first.clone(), AsmInst::Move(*loaded, *stored)])
        }
        (AsmInst::Lw(loaded, from), AsmInst::Sw(stored, to))
            if loaded == stored && from == to && !based_on(from, *loaded) =>
        {
            Some(vec![first.clone()])
        }
        _ => None,
    })
}

/// The load replaced the register the address is computed from
fn based_on(mem: &Mem, reg: Reg) -> bool {
    matches!(mem, Mem::Offset(_, base) if *base == reg)
}

/// Labels minted for control flow: `L` followed by digits
fn is_jump_label(label: &str) -> bool {
    label
        .strip_prefix('L')
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn remove_duplicate_labels(insts: &mut Vec<AsmInst>) -> bool {
    let mut seen = HashSet::new();
    let before = insts.len();
    let mut kept: Vec<AsmInst> = Vec::with_capacity(before);

    for inst in insts.drain(..).rev() {
        if let AsmInst::Label(label) = &inst {
            if is_jump_label(label) && !seen.insert(label.clone()) {
                debug!("peephole: dropping duplicate label {}", label);
                continue;
            }
        }
        kept.push(inst);
    }

    kept.reverse();
    *insts = kept;
    insts.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit_instructions;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn slot(offset: i32) -> Mem {
        Mem::Offset(offset, Reg::Fp)
    }

    #[test]
    fn test_redundant_reload_is_removed() {
        let out = optimize(vec![
            AsmInst::Sw(Reg::T0, slot(-4)),
            AsmInst::Lw(Reg::T0, slot(-4)),
        ]);
        assert_eq!(out, vec![AsmInst::Sw(Reg::T0, slot(-4))]);
    }

    #[test]
    fn test_store_load_pair_becomes_move() {
        let out = optimize(vec![
            AsmInst::Sw(Reg::T2, Mem::Symbol("g4_x".into())),
            AsmInst::Lw(Reg::T0, Mem::Symbol("g4_x".into())),
        ]);
        assert_eq!(
            out,
            vec![
                AsmInst::Sw(Reg::T2, Mem::Symbol("g4_x".into())),
                AsmInst::Move(Reg::T0, Reg::T2),
            ]
        );
    }

    #[test]
    fn test_load_then_store_back_drops_the_store() {
        let out = optimize(vec![
            AsmInst::Lw(Reg::T1, slot(-8)),
            AsmInst::Sw(Reg::T1, slot(-8)),
        ]);
        assert_eq!(out, vec![AsmInst::Lw(Reg::T1, slot(-8))]);
    }

    #[test]
    fn test_store_through_reloaded_base_is_kept() {
        let insts = vec![
            AsmInst::Lw(Reg::T0, Mem::Offset(0, Reg::T0)),
            AsmInst::Sw(Reg::T0, Mem::Offset(0, Reg::T0)),
        ];
        assert_eq!(optimize(insts.clone()), insts);
    }

    #[test]
    fn test_different_locations_are_untouched() {
        let insts = vec![
            AsmInst::Sw(Reg::T0, slot(-4)),
            AsmInst::Lw(Reg::T0, slot(-8)),
            AsmInst::Sb(Reg::T1, slot(-12)),
            AsmInst::Lb(Reg::T1, slot(-12)),
        ];
        assert_eq!(optimize(insts.clone()), insts);
    }

    #[test]
    fn test_back_to_back_duplicate_labels_collapse() {
        let out = optimize(vec![
            AsmInst::Bnez(Reg::T0, "L3".into()),
            AsmInst::Label("L3".into()),
            AsmInst::Label("L3".into()),
            AsmInst::Li(Reg::T1, 1),
            AsmInst::B("L3".into()),
        ]);
        assert_eq!(
            emit_instructions(&out),
            indoc! {"
                \tbnez $t0, L3
                L3:
                \tli $t1, 1
                \tb L3
            "}
        );
    }

    #[test]
    fn test_last_definition_of_a_label_wins() {
        let out = optimize(vec![
            AsmInst::Label("L1".into()),
            AsmInst::Li(Reg::T0, 1),
            AsmInst::Label("L1".into()),
            AsmInst::Li(Reg::T0, 2),
        ]);
        assert_eq!(
            out,
            vec![
                AsmInst::Li(Reg::T0, 1),
                AsmInst::Label("L1".into()),
                AsmInst::Li(Reg::T0, 2),
            ]
        );
    }

    #[test]
    fn test_only_jump_labels_are_deduplicated() {
        let insts = vec![
            AsmInst::Label("gf_main".into()),
            AsmInst::Label("gf_main".into()),
            AsmInst::Label("Loop".into()),
            AsmInst::Label("Loop".into()),
            AsmInst::Label("L".into()),
            AsmInst::Label("L".into()),
        ];
        assert_eq!(optimize(insts.clone()), insts);
    }

    #[test]
    fn test_rewrites_cascade() {
        // After the first reload goes, the second store meets the first load
        let out = optimize(vec![
            AsmInst::Sw(Reg::T0, slot(-4)),
            AsmInst::Lw(Reg::T0, slot(-4)),
            AsmInst::Lw(Reg::T0, slot(-4)),
        ]);
        assert_eq!(out, vec![AsmInst::Sw(Reg::T0, slot(-4))]);
    }

    fn any_instruction() -> impl Strategy<Value = AsmInst> {
        let reg = prop::sample::select(vec![Reg::T0, Reg::T1, Reg::T2]);
        let mem = prop_oneof![
            (-3i32..0).prop_map(|n| Mem::Offset(n * 4, Reg::Fp)),
            Just(Mem::Symbol("g4_x".to_string())),
        ];
        prop_oneof![
            (reg.clone(), mem.clone()).prop_map(|(r, m)| AsmInst::Sw(r, m)),
            (reg.clone(), mem).prop_map(|(r, m)| AsmInst::Lw(r, m)),
            (reg.clone(), reg).prop_map(|(a, b)| AsmInst::Move(a, b)),
            (1u32..4).prop_map(|n| AsmInst::Label(format!("L{}", n))),
            Just(AsmInst::Syscall),
        ]
    }

    proptest! {
        #[test]
        fn prop_optimizer_is_idempotent(insts in prop::collection::vec(any_instruction(), 0..40)) {
            let once = optimize(insts.clone());
            let twice = optimize(once.clone());
            prop_assert_eq!(emit_instructions(&twice), emit_instructions(&once));
            prop_assert!(once.len() <= insts.len());
        }
    }
}
