// This module renders metadata reachable from a set of roots in the textual form used by
// LLVM assembly: each node gets a slot number in first-reference order and is printed as
// `!N = [distinct ]!{...}`, locations as `!DILocation(line: L, column: C)`, strings as
// `!"..."` and integer constants as `iN V` (booleans as `i1 true`/`i1 false`). Resolved
// placeholders are printed as the node they forward to, so a back-edge that captured the
// placeholder id while the loop was open prints the final loop ID. Unresolved placeholders
// print as `temporary !{}`, which only happens for loops that were never popped.

//! Textual metadata dump.

use super::context::MetadataContext;
use super::metadata::{Metadata, NodeData, NodeId, Storage};
use hashbrown::HashMap;
use std::fmt::Write;

/// Assigns slot numbers and prints nodes.
pub struct MetadataPrinter<'c, 'arena> {
    ctx: &'c MetadataContext<'arena>,
    slots: HashMap<NodeId, usize>,
    order: Vec<NodeId>,
}

impl<'c, 'arena> MetadataPrinter<'c, 'arena> {
    pub fn new(ctx: &'c MetadataContext<'arena>) -> Self {
        Self {
            ctx,
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Slot of `id`, assigning the next free one on first reference.
    pub fn slot(&mut self, id: NodeId) -> usize {
        let id = self.ctx.resolve(id);
        if let Some(&slot) = self.slots.get(&id) {
            return slot;
        }
        let slot = self.order.len();
        self.slots.insert(id, slot);
        self.order.push(id);
        slot
    }

    /// `!N` reference text for `id`.
    pub fn reference(&mut self, id: NodeId) -> String {
        format!("!{}", self.slot(id))
    }

    fn operand(&mut self, op: Metadata<'arena>) -> String {
        match op {
            Metadata::Node(id) => self.reference(id),
            Metadata::String(s) => format!("!\"{s}\""),
            Metadata::Int { bits: 1, value } => format!("i1 {}", value != 0),
            Metadata::Int { bits, value } => format!("i{bits} {value}"),
        }
    }

    fn node_body(&mut self, id: NodeId) -> String {
        let node = *self.ctx.node(id);
        match node.data {
            NodeData::Location(loc) => {
                format!("!DILocation(line: {}, column: {})", loc.line, loc.column)
            }
            NodeData::Tuple(ops) => {
                let prefix = match node.storage {
                    Storage::Distinct => "distinct ",
                    Storage::Temporary => "temporary ",
                    Storage::Uniqued | Storage::Replaced(_) => "",
                };
                let rendered: Vec<String> = ops.iter().map(|op| self.operand(*op)).collect();
                format!("{prefix}!{{{}}}", rendered.join(", "))
            }
        }
    }

    /// Print every node referenced so far and everything reachable from
    /// them, one definition per line.
    pub fn print_referenced(&mut self) -> String {
        let mut out = String::new();
        let mut next = 0;
        while next < self.order.len() {
            let id = self.order[next];
            let body = self.node_body(id);
            let _ = writeln!(out, "!{next} = {body}");
            next += 1;
        }
        out
    }

    /// Print `roots` and everything reachable from them.
    pub fn print_roots(mut self, roots: &[NodeId]) -> String {
        for &root in roots {
            self.slot(root);
        }
        self.print_referenced()
    }
}
