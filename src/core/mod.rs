// This module is the hub for the infrastructure shared by the hint resolver, the chain
// builder and the loop stack: the metadata value model (node ids, operands, storage kinds),
// the arena-backed MetadataContext that owns every node of a compilation unit together with
// its statistics, the textual printer, the InstructionAdaptor trait through which the loop
// stack annotates the code generator's instructions, the CodeGenOptions flags, and the
// LoopHintError taxonomy. Everything here is independent of loop semantics; the `llvm.loop`
// vocabulary lives with the chain builder.

//! Core infrastructure.
//!
//! # Key Components
//!
//! ## Metadata model (`metadata`, `context`)
//! - Nodes addressed by [`NodeId`] inside an arena owned by [`MetadataContext`]
//! - Uniqued, distinct and self-referencing nodes
//! - Placeholders resolved once by forwarding
//!
//! ## Printing (`printer`)
//! - LLVM-style `!N = distinct !{...}` dumps
//!
//! ## Code generator seam (`adaptor`)
//! - [`InstructionAdaptor`] for memory/terminator queries and attachments

pub mod adaptor;
pub mod context;
pub mod error;
pub mod metadata;
pub mod options;
pub mod printer;
pub mod test_utils;

pub use adaptor::InstructionAdaptor;
pub use context::{MetadataContext, MetadataStats};
pub use error::{HintResult, LoopHintError};
pub use metadata::{MdNode, Metadata, MetadataKind, NodeData, NodeId, SourceLoc, Storage};
pub use options::CodeGenOptions;
pub use printer::MetadataPrinter;
