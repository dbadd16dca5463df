//! Module Lowering
//!
//! Assembles a whole compilation unit: the data section built from global
//! declarations and the string table, then the text section with the
//! runtime library and every function.

use super::function::lower_function;
use crate::CodegenOptions;
use lcc_codegen::{emit_instructions, entry_trampoline, optimize, runtime_library, AsmInst, DataValue, Section};
use lcc_common::CompilerError;
use lcc_ir::{CompilationContext, DataItem, DataKind, Instruction, Program};
use log::{debug, info};

/// Generate the complete assembly text for `program`
pub fn generate_assembly(
    program: &Program,
    ctx: &CompilationContext,
    options: &CodegenOptions,
) -> Result<String, CompilerError> {
    let mut insts = vec![AsmInst::Section(Section::Data)];
    insts.extend(data_section(program)?);
    insts.extend(string_table(ctx)?);

    insts.push(AsmInst::Section(Section::Text));
    if options.runtime {
        insts.extend(runtime_library());
        insts.extend(entry_trampoline());
    }

    let functions = program.function_blocks()?;
    for function in &functions {
        let body = lower_function(function)?;
        let body = if options.optimize { optimize(body) } else { body };
        insts.extend(body);
    }

    info!(
        "generated {} functions, {} strings, {} assembly lines",
        functions.len(),
        ctx.strings().len(),
        insts.len()
    );
    Ok(emit_instructions(&insts))
}

fn byte_value(value: i64) -> Result<i64, CompilerError> {
    if (-128..=255).contains(&value) {
        Ok(value)
    } else {
        Err(CompilerError::internal(format!("byte initializer {} out of range", value)))
    }
}

fn data_values(kind: DataKind, items: &[DataItem]) -> Result<AsmInst, CompilerError> {
    let values = items
        .iter()
        .map(|item| {
            let value = match kind {
                DataKind::Byte => byte_value(item.value)?,
                DataKind::Word => item.value,
            };
            Ok(DataValue { value, count: item.count })
        })
        .collect::<Result<Vec<_>, CompilerError>>()?;
    Ok(match kind {
        DataKind::Byte => AsmInst::Byte(values),
        DataKind::Word => AsmInst::Word(values),
    })
}

/// Globals and module statics declared outside any function
fn data_section(program: &Program) -> Result<Vec<AsmInst>, CompilerError> {
    let mut insts = Vec::new();
    let mut in_function = false;

    for inst in program.instructions() {
        match inst {
            Instruction::FunctionStart { .. } => in_function = true,
            Instruction::FunctionEnd => in_function = false,
            _ if in_function => {}
            Instruction::GlobalDecl { name, kind, value } => {
                debug!("data: {} {} {}", name, kind, value);
                insts.push(AsmInst::Align(2));
                insts.push(AsmInst::Label(name.to_string()));
                // An array's declared value is its element count, stored as a header word
                let kind = if name.width().is_scalar() { *kind } else { DataKind::Word };
                insts.push(data_values(kind, &[DataItem::single(*value)])?);
            }
            Instruction::Data { kind, items } => insts.push(data_values(*kind, items)?),
            other => {
                return Err(CompilerError::internal(format!(
                    "`{}` outside of a function",
                    other
                )))
            }
        }
    }
    Ok(insts)
}

fn string_table(ctx: &CompilationContext) -> Result<Vec<AsmInst>, CompilerError> {
    let mut insts = Vec::new();
    for entry in ctx.strings() {
        insts.push(AsmInst::Align(2));
        insts.push(AsmInst::Label(entry.address().to_string()));
        insts.push(AsmInst::Word(vec![DataValue {
            value: i64::from(entry.declared_length()),
            count: None,
        }]));
        let bytes = entry
            .byte_values()
            .into_iter()
            .map(|b| byte_value(i64::from(b)).map(|value| DataValue { value, count: None }))
            .collect::<Result<Vec<_>, _>>()?;
        insts.push(AsmInst::Byte(bytes));
    }
    Ok(insts)
}
