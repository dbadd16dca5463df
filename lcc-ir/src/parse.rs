//! IR text parser
//!
//! Reads the format produced by `Program::render` back into a `Program`,
//! registering string literals, globals, labels and temporaries with the
//! compilation context so fresh names never collide with parsed ones.

use crate::{
    Address, AddressError, BinaryOp, CastKind, CompilationContext, Condition, DataItem, DataKind,
    Instruction, Location, Program, RelOp, UnaryOp,
};
use lcc_common::{CompilerError, Width};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static STRING_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^S0_(\d+):\s*\.dw\s+(\d+)$").expect("valid regex"));
static LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Parse IR text into a program
pub fn parse_program(text: &str, ctx: &mut CompilationContext) -> Result<Program, CompilerError> {
    let mut program = Program::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line = raw.trim();
        let line_no = index + 1;
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = STRING_HEADER.captures(line) {
            let (id, declared) = (number(&caps[1], line_no)?, number(&caps[2], line_no)?);
            let (data_index, data) = lines
                .next()
                .ok_or_else(|| CompilerError::parse_error(line_no, "string literal without .db line"))?;
            let text = decode_string(data.trim(), declared, data_index + 1)?;
            ctx.insert_string(id, &text)?;
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let parser = LineParser { line: line_no, ctx: &mut *ctx };
        for inst in parser.parse(&tokens)? {
            program.push(inst);
        }
    }

    debug!("parsed {} IR instructions", program.len());
    Ok(program)
}

struct LineParser<'c> {
    line: usize,
    ctx: &'c mut CompilationContext,
}

impl<'c> LineParser<'c> {
    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::parse_error(self.line, message)
    }

    fn address(&mut self, text: &str) -> Result<Address, CompilerError> {
        let addr = Address::parse(text).map_err(|err| match err {
            AddressError::LiteralOutOfRange(_) => CompilerError::from(err),
            other => self.error(other.to_string()),
        })?;
        self.ctx.observe(&addr);
        Ok(addr)
    }

    fn label(&mut self, text: &str) -> Result<String, CompilerError> {
        if !LABEL.is_match(text) {
            return Err(self.error(format!("invalid label `{}`", text)));
        }
        self.ctx.observe_label(text);
        Ok(text.to_string())
    }

    fn width_suffix(&self, token: &str, prefix: &str) -> Result<Width, CompilerError> {
        token
            .strip_prefix(prefix)
            .and_then(Width::from_tag)
            .ok_or_else(|| self.error(format!("bad width in `{}`", token)))
    }

    fn parse(mut self, tokens: &[&str]) -> Result<Vec<Instruction>, CompilerError> {
        let Some(first) = tokens.first() else {
            return Ok(Vec::new());
        };

        if let Some(name) = first.strip_suffix(':') {
            return self.parse_labelled(name, &tokens[1..]);
        }

        self.parse_plain(tokens).map(|inst| vec![inst])
    }

    fn parse_labelled(&mut self, name: &str, rest: &[&str]) -> Result<Vec<Instruction>, CompilerError> {
        match rest {
            [] => Ok(vec![Instruction::Label(self.label(name)?)]),
            [".fnStart", locals, params @ ..] => {
                let function = self.address(name)?;
                let (Location::Global(fname) | Location::ModuleStatic(fname)) = function.location() else {
                    return Err(self.error(format!("`{}` is not a function name", name)));
                };
                if !function.is_function() {
                    return Err(self.error(format!("`{}` is not a function name", name)));
                }
                let exported = matches!(function.location(), Location::Global(_));
                let fname = fname.clone();
                self.ctx.new_function(&fname, exported);
                let params = match params {
                    [] => 0,
                    [count] => number(count, self.line)?,
                    _ => return Err(self.error("trailing tokens after .fnStart")),
                };
                Ok(vec![Instruction::FunctionStart {
                    name: function,
                    locals: number(locals, self.line)?,
                    params,
                }])
            }
            [directive, value] if DataKind::from_directive(directive).is_some() => {
                let name = self.address(name)?;
                match name.location() {
                    Location::Global(var) => {
                        let var = var.clone();
                        self.ctx.new_global(&var, name.width())?;
                    }
                    Location::ModuleStatic(var) => {
                        let var = var.clone();
                        self.ctx.new_module(&var, name.width())?;
                    }
                    _ => return Err(self.error(format!("`{}` cannot carry a data directive", name))),
                }
                let kind = DataKind::from_directive(directive)
                    .ok_or_else(|| self.error(format!("unknown directive `{}`", directive)))?;
                Ok(vec![Instruction::GlobalDecl {
                    name,
                    kind,
                    value: integer(value, self.line)?,
                }])
            }
            _ => {
                let label = Instruction::Label(self.label(name)?);
                let inst = self.parse_plain(rest)?;
                Ok(vec![label, inst])
            }
        }
    }

    fn parse_plain(&mut self, tokens: &[&str]) -> Result<Instruction, CompilerError> {
        let inst = match tokens {
            [".fnEnd"] => Instruction::FunctionEnd,
            [directive, ..] if DataKind::from_directive(directive).is_some() => {
                let kind = DataKind::from_directive(directive)
                    .ok_or_else(|| self.error("unknown directive"))?;
                let items = tokens[1..]
                    .join(" ")
                    .split(',')
                    .map(|item| data_item(item.trim(), self.line))
                    .collect::<Result<Vec<_>, _>>()?;
                Instruction::Data { kind, items }
            }
            ["goto", target] => Instruction::Goto(self.label(target)?),
            ["if", lhs, op, rhs, "goto", target] => {
                let op = RelOp::from_symbol(op)
                    .ok_or_else(|| self.error(format!("unknown relational operator `{}`", op)))?;
                Instruction::Branch {
                    condition: Condition::Compare {
                        op,
                        lhs: self.address(lhs)?,
                        rhs: self.address(rhs)?,
                    },
                    target: self.label(target)?,
                }
            }
            ["if", value, "goto", target] => Instruction::Branch {
                condition: Condition::IfTrue(self.address(value)?),
                target: self.label(target)?,
            },
            ["ifFalse", value, "goto", target] => Instruction::Branch {
                condition: Condition::IfFalse(self.address(value)?),
                target: self.label(target)?,
            },
            [op, value] if op.starts_with("param") => Instruction::Param {
                width: self.width_suffix(op, "param")?,
                value: self.address(value)?,
            },
            ["call", target] => {
                let (function, args) = self.call_target(target)?;
                Instruction::Call { dest: None, function, args }
            }
            ["return"] => Instruction::Return { width: Width::Unsized, value: None },
            [op, value] if op.starts_with("return") => Instruction::Return {
                width: self.width_suffix(op, "return")?,
                value: Some(self.address(value)?),
            },
            [array, op, count] if op.starts_with("setsize") => Instruction::SetSize {
                width: self.width_suffix(op, "setsize")?,
                array: self.address(array)?,
                count: number(count, self.line)?,
            },
            [dest, "=", src] => {
                let dest = self.address(dest)?;
                let src = self.address(src)?.adopt_width(dest.width());
                Instruction::Assign { dest, src }
            }
            [dest, "=", "call", target] => {
                let (function, args) = self.call_target(target)?;
                Instruction::Call { dest: Some(self.address(dest)?), function, args }
            }
            [dest, "=", cast @ ("widen" | "narrow"), src] => Instruction::Cast {
                kind: if *cast == "widen" { CastKind::Widen } else { CastKind::Narrow },
                dest: self.address(dest)?,
                src: self.address(src)?,
            },
            [dest, "=", op, src] => Instruction::Unary {
                op: UnaryOp::from_symbol(op)
                    .ok_or_else(|| self.error(format!("unknown unary operator `{}`", op)))?,
                dest: self.address(dest)?,
                src: self.address(src)?,
            },
            [dest, "=", array, op, index] if op.starts_with("ldidx") => Instruction::IndexedLoad {
                width: self.width_suffix(op, "ldidx")?,
                dest: self.address(dest)?,
                array: self.address(array)?,
                index: self.address(index)?,
            },
            [array, "=", index, op, value] if op.starts_with("stidx") => {
                let width = self.width_suffix(op, "stidx")?;
                Instruction::IndexedStore {
                    array: self.address(array)?,
                    index: self.address(index)?,
                    value: self.address(value)?.adopt_width(width),
                    width,
                }
            }
            [dest, "=", lhs, op, rhs] => Instruction::Binary {
                op: BinaryOp::from_symbol(op)
                    .ok_or_else(|| self.error(format!("unknown binary operator `{}`", op)))?,
                dest: self.address(dest)?,
                lhs: self.address(lhs)?,
                rhs: self.address(rhs)?,
            },
            _ => {
                return Err(CompilerError::internal(format!(
                    "unknown instruction shape at line {}: `{}`",
                    self.line,
                    tokens.join(" ")
                )))
            }
        };
        Ok(inst)
    }

    fn call_target(&mut self, target: &str) -> Result<(Address, u32), CompilerError> {
        let (name, args) = target
            .split_once(',')
            .ok_or_else(|| self.error(format!("call target `{}` lacks an argument count", target)))?;
        let function = self.address(name)?;
        if !function.is_function() {
            return Err(self.error(format!("`{}` is not a function name", name)));
        }
        Ok((function, number(args, self.line)?))
    }
}

fn number(text: &str, line: usize) -> Result<u32, CompilerError> {
    text.parse()
        .map_err(|_| CompilerError::parse_error(line, format!("expected a count, found `{}`", text)))
}

fn integer(text: &str, line: usize) -> Result<i64, CompilerError> {
    let value: i64 = text
        .parse()
        .map_err(|_| CompilerError::parse_error(line, format!("expected an integer, found `{}`", text)))?;
    i32::try_from(value)
        .map_err(|_| CompilerError::internal(format!("initializer {} at line {} does not fit in 32 bits", value, line)))?;
    Ok(value)
}

fn data_item(text: &str, line: usize) -> Result<DataItem, CompilerError> {
    match text.split_once('#') {
        Some((value, count)) => Ok(DataItem::repeated(integer(value, line)?, number(count, line)?)),
        None => Ok(DataItem::single(integer(text, line)?)),
    }
}

fn decode_string(data: &str, declared: u32, line: usize) -> Result<String, CompilerError> {
    let items = data
        .strip_prefix(".db")
        .ok_or_else(|| CompilerError::parse_error(line, "expected .db line after string header"))?;
    let mut values = items
        .split(',')
        .map(|v| number(v.trim(), line))
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() as u32 != declared || values.pop() != Some(0) {
        return Err(CompilerError::parse_error(
            line,
            format!("string data does not match declared length {}", declared),
        ));
    }

    values
        .into_iter()
        .map(|v| {
            char::from_u32(v)
                .ok_or_else(|| CompilerError::parse_error(line, format!("invalid character code {}", v)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> (Program, CompilationContext) {
        let mut ctx = CompilationContext::new();
        let program = parse_program(text, &mut ctx).unwrap();
        (program, ctx)
    }

    #[test]
    fn test_parse_function() {
        let (program, ctx) = parse(indoc! {"
            gf_main: .fnStart 4 0
            \tl4@0 = 5
            \tt4_1 = l4@0 * 2
            \tparam4 t4_1
            \tcall gf_printd,1
            \treturn
            \t.fnEnd
        "});

        assert_eq!(program.len(), 7);
        assert!(matches!(
            program.instructions()[0],
            Instruction::FunctionStart { locals: 4, params: 0, .. }
        ));
        assert!(matches!(
            &program.instructions()[2],
            Instruction::Binary { op: BinaryOp::Mul, .. }
        ));
        assert!(ctx.global("main").is_some());
    }

    #[test]
    fn test_label_prefix_on_same_line() {
        let (program, _) = parse("L3: goto L4\n");
        assert_eq!(
            program.instructions(),
            &[Instruction::Label("L3".into()), Instruction::Goto("L4".into())]
        );
    }

    #[test]
    fn test_fn_start_without_param_count() {
        let (program, _) = parse("mf_helper: .fnStart 12\n.fnEnd\n");
        assert!(matches!(
            program.instructions()[0],
            Instruction::FunctionStart { locals: 12, params: 0, .. }
        ));
    }

    #[test]
    fn test_parse_globals_and_strings() {
        let (program, ctx) = parse(indoc! {"
            g4_x: .dw 5
            g0_buf: .dw 10
            \t.db 0#10
            S0_1: .dw 3
            .db 104, 105, 0
        "});
        assert_eq!(program.len(), 3);
        assert!(matches!(
            &program.instructions()[2],
            Instruction::Data { kind: DataKind::Byte, items } if items == &vec![DataItem::repeated(0, 10)]
        ));
        assert_eq!(ctx.string(1).unwrap().text(), "hi");
        assert!(ctx.global("buf").is_some());
    }

    #[test]
    fn test_parse_indexed_and_casts() {
        let (program, _) = parse(indoc! {"
            \tt4_1 = & l0@0
            \tt4_1 = 2 stidx4 7
            \tt4_2 = t4_1 ldidx4 2
            \tt1_3 = narrow t4_2
            \tt4_4 = # l0@0
            \tl0@0 setsize4 10
        "});
        let insts = program.instructions();
        assert!(matches!(&insts[0], Instruction::Unary { op: UnaryOp::AddressOf, .. }));
        assert!(matches!(&insts[1], Instruction::IndexedStore { width: Width::Word, .. }));
        assert!(matches!(&insts[2], Instruction::IndexedLoad { width: Width::Word, .. }));
        assert!(matches!(&insts[3], Instruction::Cast { kind: CastKind::Narrow, .. }));
        assert!(matches!(&insts[4], Instruction::Unary { op: UnaryOp::Length, .. }));
        assert!(matches!(&insts[5], Instruction::SetSize { count: 10, .. }));
    }

    #[test]
    fn test_counters_follow_parsed_names() {
        let (_, mut ctx) = parse("\tt4_7 = 1\nL4:\n");
        assert_eq!(ctx.new_temp(Width::Word).unwrap().to_string(), "t4_8");
        assert_eq!(ctx.new_label(), "L5");
    }

    #[test]
    fn test_errors() {
        let mut ctx = CompilationContext::new();
        assert!(matches!(
            parse_program("\tt4_1 = @bad\n", &mut ctx),
            Err(CompilerError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            parse_program("\n\tt4_1 = 99999999999\n", &mut ctx),
            Err(CompilerError::InternalError { .. })
        ));
        assert!(matches!(
            parse_program("\tfoo bar baz qux quux zap\n", &mut ctx),
            Err(CompilerError::InternalError { .. })
        ));
        assert!(parse_program("\tcall gf_f\n", &mut ctx).is_err());
        assert!(parse_program("S0_1: .dw 5\n.db 104, 0\n", &mut ctx).is_err());
    }
}
