// This module defines the value types of the metadata graph that loop annotations are built
// from. NodeId addresses a node inside a MetadataContext arena; Metadata is a single operand
// (a node reference, an interned string, or a sized integer constant); NodeData is the payload
// of a node (an operand tuple or a source location); Storage records how the node takes part
// in identity (uniqued by content, distinct, a temporary placeholder, or a placeholder that
// was resolved to another node). MetadataKind names the two instruction attachment slots the
// loop stack writes. All operand types are Copy and borrow their strings and operand slices
// from the session arena, so nodes can be hashed for uniquing without owning anything.

//! Metadata node model.
//!
//! Nodes are addressed by [`NodeId`] and never move. Identity, not content,
//! is what associates a loop ID with exactly one loop, which is why loop IDs
//! are distinct nodes whose first operand is their own id.

use std::fmt;

/// Index of a node inside a [`MetadataContext`](super::context::MetadataContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a loop's start or end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single operand of a metadata node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metadata<'arena> {
    /// Reference to another node.
    Node(NodeId),
    /// Interned string.
    String(&'arena str),
    /// Integer constant of the given bit width.
    Int { bits: u8, value: u64 },
}

impl<'arena> Metadata<'arena> {
    /// `i1` constant.
    pub const fn i1(value: bool) -> Self {
        Metadata::Int { bits: 1, value: value as u64 }
    }

    /// `i32` constant.
    pub const fn i32(value: u32) -> Self {
        Metadata::Int { bits: 32, value: value as u64 }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match *self {
            Metadata::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'arena str> {
        match *self {
            Metadata::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match *self {
            Metadata::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Boolean value of an `i1` constant.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Metadata::Int { bits: 1, value } => Some(value != 0),
            _ => None,
        }
    }
}

impl From<NodeId> for Metadata<'_> {
    fn from(id: NodeId) -> Self {
        Metadata::Node(id)
    }
}

/// How a node takes part in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Shared by every request with the same content.
    Uniqued,
    /// Fresh identity regardless of content.
    Distinct,
    /// Placeholder waiting for resolution.
    Temporary,
    /// Resolved placeholder; all uses now see the target.
    Replaced(NodeId),
}

/// Payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeData<'arena> {
    Tuple(&'arena [Metadata<'arena>]),
    Location(SourceLoc),
}

/// A node stored in the arena.
#[derive(Debug, Clone, Copy)]
pub struct MdNode<'arena> {
    pub storage: Storage,
    pub data: NodeData<'arena>,
}

impl<'arena> MdNode<'arena> {
    /// Tuple operands, empty for locations.
    pub fn operands(&self) -> &'arena [Metadata<'arena>] {
        match self.data {
            NodeData::Tuple(ops) => ops,
            NodeData::Location(_) => &[],
        }
    }
}

/// Instruction attachment slots written by the loop stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// Loop ID on a back-edge terminator.
    Loop,
    /// Parallel access group(s) on a memory instruction.
    AccessGroup,
}

impl MetadataKind {
    pub fn name(self) -> &'static str {
        match self {
            MetadataKind::Loop => "llvm.loop",
            MetadataKind::AccessGroup => "llvm.access.group",
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.name())
    }
}
