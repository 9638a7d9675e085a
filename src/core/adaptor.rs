// This module defines the InstructionAdaptor trait, the bridge between the loop stack and
// whatever IR the surrounding code generator emits. The loop stack never inspects opcodes or
// operands; it only needs to know whether an instruction may touch memory (so it can receive
// the parallel access groups of the open loops), whether it is a terminator and which blocks
// it branches to (so the back-edge to the innermost loop header can receive the loop ID),
// and a way to set a metadata attachment. Block references are opaque Copy + Eq handles
// supplied by the adaptor, which lets the stack store a loop's header without depending on
// any concrete block representation.

//! Instruction adaptor responsibilities.
//!
//! The adaptor is the glue between the loop stack and the code generator's
//! instructions. The stack assumes:
//! - Terminators list their successor blocks.
//! - Successors compare equal to the header handle passed at loop entry.
//! - Setting an attachment to `None` clears it.

use super::metadata::{MetadataKind, NodeId};
use std::fmt::Debug;

/// View of one emitted instruction.
pub trait InstructionAdaptor {
    type BlockRef: Copy + Eq + Debug;

    /// Whether the instruction may read or write memory.
    fn may_read_or_write_memory(&self) -> bool;

    /// Whether the instruction ends its block.
    fn is_terminator(&self) -> bool;

    /// Successor blocks of a terminator; empty otherwise.
    fn successors(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_>;

    /// Set or clear the attachment of the given kind.
    fn set_metadata(&mut self, kind: MetadataKind, node: Option<NodeId>);
}
