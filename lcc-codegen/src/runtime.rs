//! Runtime-support routines
//!
//! Every compiled program gets the same small library of I/O routines,
//! reachable from LittleC as ordinary functions, plus the `main` entry
//! point that calls the user's `gf_main` and exits. Arguments arrive in
//! `$a0`/`$a1` and results leave in `$v0`, matching compiled code.
//!
//! Arrays and strings are addressed through their length word; the
//! characters start 4 bytes further on.

use crate::{AsmInst, Mem, Reg};

const PRINT_INT: i32 = 1;
const READ_INT: i32 = 5;
const READ_STRING: i32 = 8;
const EXIT: i32 = 10;
const PRINT_CHAR: i32 = 11;
const READ_CHAR: i32 = 12;

fn label(name: &str) -> AsmInst {
    AsmInst::Label(name.to_string())
}

/// Leaf routine that runs one syscall on the arguments as passed
fn syscall_routine(name: &str, service: i32) -> Vec<AsmInst> {
    vec![
        label(name),
        AsmInst::Li(Reg::V0, service),
        AsmInst::Syscall,
        AsmInst::Jr(Reg::Ra),
    ]
}

/// `prints(char s[])`: write characters until the length runs out or a NUL
fn prints() -> Vec<AsmInst> {
    vec![
        label("gf_prints"),
        AsmInst::Lw(Reg::T0, Mem::Offset(0, Reg::A0)),
        AsmInst::Addiu(Reg::T1, Reg::A0, 4),
        label("prints_loop"),
        AsmInst::Beqz(Reg::T0, "prints_done".to_string()),
        AsmInst::Lb(Reg::A0, Mem::Offset(0, Reg::T1)),
        AsmInst::Beqz(Reg::A0, "prints_done".to_string()),
        AsmInst::Li(Reg::V0, PRINT_CHAR),
        AsmInst::Syscall,
        AsmInst::Addiu(Reg::T1, Reg::T1, 1),
        AsmInst::Addiu(Reg::T0, Reg::T0, -1),
        AsmInst::B("prints_loop".to_string()),
        label("prints_done"),
        AsmInst::Jr(Reg::Ra),
    ]
}

/// `readline(char s[])`: read at most the array's length into it. `$a1`
/// may hold a live parameter of the caller, so it is restored on exit.
fn readline() -> Vec<AsmInst> {
    vec![
        label("gf_readline"),
        AsmInst::Move(Reg::T0, Reg::A1),
        AsmInst::Lw(Reg::A1, Mem::Offset(0, Reg::A0)),
        AsmInst::Addiu(Reg::A0, Reg::A0, 4),
        AsmInst::Li(Reg::V0, READ_STRING),
        AsmInst::Syscall,
        AsmInst::Move(Reg::A1, Reg::T0),
        AsmInst::Jr(Reg::Ra),
    ]
}

/// The I/O library: `printd`, `printc`, `prints`, `readline`, `read`, `readc`
pub fn runtime_library() -> Vec<AsmInst> {
    let mut insts = Vec::new();
    insts.extend(syscall_routine("gf_printd", PRINT_INT));
    insts.extend(syscall_routine("gf_printc", PRINT_CHAR));
    insts.extend(prints());
    insts.extend(readline());
    insts.extend(syscall_routine("gf_read", READ_INT));
    insts.extend(syscall_routine("gf_readc", READ_CHAR));
    insts
}

/// Program entry: run `gf_main`, then exit
pub fn entry_trampoline() -> Vec<AsmInst> {
    vec![
        AsmInst::Globl("main".to_string()),
        label("main"),
        AsmInst::Jal("gf_main".to_string()),
        AsmInst::Li(Reg::V0, EXIT),
        AsmInst::Syscall,
    ]
}
