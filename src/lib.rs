//! loopmd - loop transformation metadata construction.
//!
//! loopmd turns per-loop transformation hints (`#pragma clang loop`,
//! `#pragma unroll`, unroll-and-jam, temporal blocking, ...) into the ordered
//! chain of `llvm.loop` metadata nodes a later optimization pipeline consumes,
//! and attaches those chains and parallel access groups to the instructions a
//! code generator emits while it walks a loop nest.
//!
//! # Primary Usage
//!
//! ```
//! use bumpalo::Bump;
//! use loopmd::core::{CodeGenOptions, MetadataContext};
//! use loopmd::hints::{Directive, HintOption, LoopHint};
//! use loopmd::loops::LoopInfoStack;
//!
//! let arena = Bump::new();
//! let mut ctx = MetadataContext::new(&arena);
//! let mut stack = LoopInfoStack::new(&mut ctx);
//!
//! let width: Directive = LoopHint::numeric(HintOption::VectorizeWidth, &[4]).into();
//! stack
//!     .push_with_hints(0u32, &CodeGenOptions::default(), &[width], None, None)
//!     .unwrap();
//! let loop_id = stack.pop().unwrap();
//! assert!(ctx.has_property(loop_id, "llvm.loop.vectorize.width"));
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Metadata arena, printer, instruction adaptor, options, errors
//! - [`hints`] - Parsed directives, loop attributes and directive resolution
//! - [`loops`] - Metadata chain builder and loop nesting stack
//! - [`test_ir`] - Loop test IR, lowering driver and FileCheck runner

pub mod core;
pub mod hints;
pub mod loops;
pub mod test_ir;

pub use crate::core::{
    CodeGenOptions, HintResult, InstructionAdaptor, LoopHintError, Metadata, MetadataContext,
    MetadataKind, MetadataPrinter, MetadataStats, NodeId, SourceLoc,
};
pub use hints::{Directive, HintOption, HintState, LoopAttributes, LoopHint, TransformState};
pub use loops::{ChainBuilder, LoopChain, LoopInfoStack};
