//! LittleC Compiler Driver
//!
//! Command-line front door over IR text files: compile to MIPS assembly,
//! or inspect the parsed program as blocks, a quadruple table or
//! re-printed IR.

use clap::{Parser, Subcommand};
use lcc_backend::{generate_assembly, CodegenOptions};
use lcc_common::CompilerError;
use lcc_ir::{parse_program, CompilationContext, Program};
use log::{debug, info, LevelFilter};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lcc")]
#[command(about = "LittleC Compiler backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an IR file to MIPS assembly
    Compile {
        /// Input IR file
        input: PathBuf,

        /// Output assembly file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the peephole optimizer
        #[arg(long)]
        no_optimize: bool,

        /// Leave out the runtime library and entry point
        #[arg(long)]
        no_runtime: bool,
    },

    /// Print the function and basic-block structure of an IR file
    Blocks {
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the quadruple table of an IR file
    Table { input: PathBuf },

    /// Parse an IR file and print it back in canonical form
    Fmt { input: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile { input, output, no_optimize, no_runtime } => {
            let options = CodegenOptions {
                optimize: !no_optimize,
                runtime: !no_runtime,
            };
            compile_file(&input, output.as_deref(), &options)
        }
        Commands::Blocks { input, json } => print_blocks(&input, json),
        Commands::Table { input } => print_table(&input),
        Commands::Fmt { input } => format_file(&input),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn load(path: &Path) -> Result<(Program, CompilationContext), CompilerError> {
    let text = fs::read_to_string(path)?;
    let mut ctx = CompilationContext::new();
    let program = parse_program(&text, &mut ctx)?;
    debug!("loaded {} ({} instructions)", path.display(), program.len());
    Ok((program, ctx))
}

fn compile_file(input: &Path, output: Option<&Path>, options: &CodegenOptions) -> Result<(), CompilerError> {
    info!("compiling {}", input.display());
    let (program, ctx) = load(input)?;
    let asm = generate_assembly(&program, &ctx, options)?;

    match output {
        Some(path) => {
            fs::write(path, &asm)?;
            info!("assembly written to {}", path.display());
        }
        None => print!("{}", asm),
    }
    Ok(())
}

fn print_blocks(input: &Path, as_json: bool) -> Result<(), CompilerError> {
    let (program, _) = load(input)?;
    let functions = program.function_blocks()?;

    if as_json {
        let report: Vec<_> = functions
            .iter()
            .map(|function| {
                let blocks: Vec<_> = function
                    .basic_blocks()
                    .iter()
                    .map(|block| {
                        json!({
                            "start": function.start + block.start,
                            "len": block.len(),
                            "label": block.label(),
                        })
                    })
                    .collect();
                json!({
                    "function": function.label(),
                    "start": function.start,
                    "locals": function.locals,
                    "params": function.params,
                    "blocks": blocks,
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CompilerError::internal(format!("cannot serialize block report: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    for function in &functions {
        println!(
            "{} (locals {}, params {})",
            function.label(),
            function.locals,
            function.params
        );
        for (i, block) in function.basic_blocks().iter().enumerate() {
            println!("  block {} @{}:", i, function.start + block.start);
            for inst in block.instructions {
                println!("    {}", inst);
            }
        }
    }
    Ok(())
}

fn print_table(input: &Path) -> Result<(), CompilerError> {
    let (program, _) = load(input)?;
    print!("{}", program.quad_table()?);
    Ok(())
}

fn format_file(input: &Path) -> Result<(), CompilerError> {
    let (program, ctx) = load(input)?;
    print!("{}", program.render(&ctx));
    Ok(())
}
