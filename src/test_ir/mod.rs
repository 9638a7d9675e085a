//! Loop test IR (TIR) for exercising loop metadata construction.
//!
//! The format describes structured loop nests and the directives attached to
//! them, without depending on a real front end. It is:
//! - Human-readable and writable
//! - Line oriented, easy to parse
//! - Sufficient to drive the loop stack the way a code generator would
//!
//! # TIR Format
//!
//! ```text
//! ; Comments start with semicolon
//! func name {
//!     load
//!     #pragma clang loop vectorize_width(4) interleave_count(2)
//!     loop outer @ 3:5 - 9:1 {
//!         #pragma unroll 8
//!         loop inner {
//!             store
//!         }
//!     }
//! }
//! ```
//!
//! Pragma lines apply to the loop that follows them. Supported forms are
//! `#pragma clang loop opt(args)...`, `#pragma unroll [N]`, `#pragma nounroll`,
//! `#pragma unroll_and_jam [N]`, `#pragma nounroll_and_jam`,
//! `#pragma temporal_blocking opt(args)...` and `#pragma opencl_unroll_hint(N)`.

use crate::core::metadata::SourceLoc;
use crate::core::options::CodeGenOptions;
use crate::hints::Directive;
use clap::Parser as _;
use std::fmt::Write;
use std::path::PathBuf;

pub mod check;
pub mod lower;
pub mod parser;

pub use check::{CheckDirective, RunDirective, TestRunner, TestSpec};
pub use lower::{lower_module, run, BlockId, Inst, LoweredFunction};

#[derive(Debug, Clone, PartialEq)]
pub struct LoopModule {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Inst(Opcode),
    Loop(LoopStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopStmt {
    /// Name of the header block.
    pub header: String,
    pub start_loc: Option<SourceLoc>,
    pub end_loc: Option<SourceLoc>,
    pub directives: Vec<Directive>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Load,
    Store,
    Call,
    Add,
    Br,
    CondBr,
    Ret,
}

impl Opcode {
    pub const fn info(self) -> OpInfo {
        use Opcode::*;
        match self {
            Load => OpInfo { name: "load", is_terminator: false, touches_memory: true },
            Store => OpInfo { name: "store", is_terminator: false, touches_memory: true },
            Call => OpInfo { name: "call", is_terminator: false, touches_memory: true },
            Add => OpInfo { name: "add", is_terminator: false, touches_memory: false },
            Br => OpInfo { name: "br", is_terminator: true, touches_memory: false },
            CondBr => OpInfo { name: "condbr", is_terminator: true, touches_memory: false },
            Ret => OpInfo { name: "ret", is_terminator: true, touches_memory: false },
        }
    }

    /// Opcodes that may be written in a TIR body. Terminators are produced
    /// by lowering only.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "load" => Some(Opcode::Load),
            "store" => Some(Opcode::Store),
            "call" => Some(Opcode::Call),
            "add" => Some(Opcode::Add),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub is_terminator: bool,
    pub touches_memory: bool,
}

/// Command line of the `loopmd` driver, shared with `; RUN:` lines.
#[derive(clap::Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "loopmd", version, about = "Build llvm.loop metadata for a loop test IR file")]
pub struct DriverArgs {
    /// Input file; reads stdin when omitted
    pub input: Option<PathBuf>,

    /// Optimization level
    #[arg(short = 'O', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub opt_level: u8,

    /// Disable loop unrolling unless a directive asks for it
    #[arg(long)]
    pub no_unroll_loops: bool,

    /// Print the parsed loop tree before lowering
    #[arg(long)]
    pub print_ir: bool,

    /// Print the metadata definitions after the functions
    #[arg(long)]
    pub print_metadata: bool,

    /// Print metadata statistics
    #[arg(long)]
    pub stats: bool,
}

impl DriverArgs {
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            codegen: CodeGenOptions::new()
                .with_optimization_level(self.opt_level)
                .with_unroll_loops(!self.no_unroll_loops),
            print_ir: self.print_ir,
            print_metadata: self.print_metadata,
            print_stats: self.stats,
        }
    }
}

/// Settings one driver invocation lowers with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    pub codegen: CodeGenOptions,
    pub print_ir: bool,
    pub print_metadata: bool,
    pub print_stats: bool,
}

impl DriverOptions {
    /// Parse driver flags without the program name, as they appear after
    /// `%loopmd` on a `; RUN:` line.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, String> {
        let argv = std::iter::once("loopmd").chain(args.iter().map(AsRef::as_ref));
        let args = DriverArgs::try_parse_from(argv).map_err(|e| e.to_string())?;
        Ok(args.driver_options())
    }
}

impl LoopModule {
    pub fn parse(text: &str) -> Result<Self, String> {
        parser::parse_module(text)
    }

    pub fn print(&self) -> String {
        let mut output = String::new();
        output.push_str("Printing IR\n");
        for func in &self.functions {
            let _ = writeln!(output, "Function {}", func.name);
            print_body(&mut output, &func.body, 1);
        }
        output
    }
}

fn print_body(output: &mut String, body: &[Stmt], depth: usize) {
    let indent = "  ".repeat(depth);
    for stmt in body {
        match stmt {
            Stmt::Inst(op) => {
                let _ = writeln!(output, "{indent}Inst {}", op.info().name);
            }
            Stmt::Loop(lp) => {
                let _ = write!(output, "{indent}Loop {}", lp.header);
                if let Some(start) = lp.start_loc {
                    let _ = write!(output, " @ {start}");
                    if let Some(end) = lp.end_loc {
                        let _ = write!(output, " - {end}");
                    }
                }
                output.push('\n');
                for directive in &lp.directives {
                    match directive {
                        Directive::Hint(hint) => {
                            let _ = writeln!(
                                output,
                                "{indent}  Hint {}{}",
                                hint.spelling.pragma_name(),
                                hint.print_pretty_pragma()
                            );
                        }
                        Directive::OpenClUnroll(n) => {
                            let _ = writeln!(output, "{indent}  Hint opencl_unroll_hint({n})");
                        }
                    }
                }
                print_body(output, &lp.body, depth + 1);
            }
        }
    }
}

impl std::fmt::Display for LoopModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.print())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[test]
    fn test_driver_options() {
        let opts = DriverOptions::from_args(&["%s", "-O2", "--no-unroll-loops", "--stats"]).unwrap();
        assert_eq!(opts.codegen.optimization_level, 2);
        assert!(!opts.codegen.unroll_loops);
        assert!(opts.print_stats);
        assert!(!opts.print_ir);

        let opts = DriverOptions::from_args(&["-O", "1", "--print-metadata"]).unwrap();
        assert_eq!(opts.codegen.optimization_level, 1);
        assert!(opts.print_metadata);

        assert!(DriverOptions::from_args(&["-O7"]).is_err());
        assert!(DriverOptions::from_args(&["-O"]).is_err());
        assert!(DriverOptions::from_args(&["--print-everything"]).is_err());
        assert!(DriverOptions::from_args(&["a.tir", "b.tir"]).is_err());
    }

    #[test]
    fn test_driver_args_match_run_options() {
        let argv = ["loopmd", "in.tir", "-O3", "--print-ir", "--print-metadata"];
        let args = DriverArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("in.tir")));
        assert_eq!(
            args.driver_options(),
            DriverOptions::from_args(&argv[1..]).unwrap()
        );

        let defaults = DriverArgs::try_parse_from(["loopmd"]).unwrap();
        assert_eq!(defaults.input, None);
        assert_eq!(defaults.driver_options(), DriverOptions::default());
    }

    #[test]
    fn test_print_module() {
        let module = LoopModule::parse(
            "func f {\n  #pragma unroll 4\n  loop body @ 2:3 {\n    load\n  }\n}\n",
        )
        .unwrap();
        assert_eq!(
            module.print(),
            "Printing IR\nFunction f\n  Loop body @ 2:3\n    Hint #pragma unroll ([4])\n    Inst load\n"
        );
    }
}
