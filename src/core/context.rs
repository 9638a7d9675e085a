// This module provides the arena-backed MetadataContext that owns every metadata node built
// for one compilation unit. Strings and operand slices are allocated in a bumpalo arena that
// outlives the context, mirroring how a compilation session owns its arena-allocated state.
// Nodes are stored in a Vec and addressed by NodeId. The context supports uniqued nodes
// (hash-consed by content through a hashbrown map), distinct nodes with fresh identity,
// self-referencing distinct nodes used as loop IDs (operand zero is the node itself), and
// temporary placeholders that are later resolved by forwarding: the placeholder slot becomes
// Replaced(target) so every holder of the placeholder id observes the final node through
// resolve(). Resolving a placeholder twice is a programming error and panics. The context
// also answers property queries used by tests and the printer, and keeps MetadataStats.

//! Arena-based metadata storage.

use super::metadata::{MdNode, Metadata, NodeData, NodeId, SourceLoc, Storage};
use bumpalo::Bump;
use hashbrown::{HashMap, HashSet};
use std::fmt;

/// Owner of all metadata nodes of a compilation unit.
///
/// ```
/// use bumpalo::Bump;
/// use loopmd::core::{Metadata, MetadataContext};
///
/// let arena = Bump::new();
/// let mut ctx = MetadataContext::new(&arena);
/// let count = ctx.property("llvm.loop.unroll.count", &[Metadata::i32(4)]);
/// let loop_id = ctx.get_self_referencing(&[count]);
/// assert_eq!(ctx.operands(loop_id)[0], Metadata::Node(loop_id));
/// ```
pub struct MetadataContext<'arena> {
    arena: &'arena Bump,
    nodes: Vec<MdNode<'arena>>,
    uniqued: HashMap<NodeData<'arena>, NodeId>,
    strings: HashSet<&'arena str>,
    stats: MetadataStats,
}

impl<'arena> MetadataContext<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            nodes: Vec::new(),
            uniqued: HashMap::new(),
            strings: HashSet::new(),
            stats: MetadataStats::default(),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Number of nodes ever created, resolved placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Intern a string in the arena.
    pub fn intern_str(&mut self, s: &str) -> &'arena str {
        if let Some(&interned) = self.strings.get(s) {
            return interned;
        }
        let interned: &'arena str = self.arena.alloc_str(s);
        self.strings.insert(interned);
        interned
    }

    /// String operand.
    pub fn string(&mut self, s: &str) -> Metadata<'arena> {
        Metadata::String(self.intern_str(s))
    }

    fn push_node(&mut self, storage: Storage, data: NodeData<'arena>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MdNode { storage, data });
        id
    }

    fn get_uniqued(&mut self, data: NodeData<'arena>) -> NodeId {
        if let Some(&id) = self.uniqued.get(&data) {
            return id;
        }
        let id = self.push_node(Storage::Uniqued, data);
        self.uniqued.insert(data, id);
        self.stats.uniqued_nodes += 1;
        id
    }

    /// Uniqued tuple: equal operands yield the same node.
    pub fn get(&mut self, operands: &[Metadata<'arena>]) -> NodeId {
        let ops = self.arena.alloc_slice_copy(operands);
        self.get_uniqued(NodeData::Tuple(ops))
    }

    /// Uniqued source location node.
    pub fn location(&mut self, loc: SourceLoc) -> NodeId {
        self.get_uniqued(NodeData::Location(loc))
    }

    /// Distinct tuple with a fresh identity.
    pub fn get_distinct(&mut self, operands: &[Metadata<'arena>]) -> NodeId {
        let ops = self.arena.alloc_slice_copy(operands);
        self.stats.distinct_nodes += 1;
        self.push_node(Storage::Distinct, NodeData::Tuple(ops))
    }

    /// Distinct tuple whose operand zero is the node itself, followed by
    /// `operands`.
    pub fn get_self_referencing(&mut self, operands: &[Metadata<'arena>]) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut with_self = Vec::with_capacity(operands.len() + 1);
        with_self.push(Metadata::Node(id));
        with_self.extend_from_slice(operands);
        let ops = self.arena.alloc_slice_copy(&with_self);
        self.stats.distinct_nodes += 1;
        self.push_node(Storage::Distinct, NodeData::Tuple(ops))
    }

    /// Placeholder with no operands, to be resolved exactly once.
    pub fn temporary(&mut self) -> NodeId {
        self.stats.placeholders_created += 1;
        self.push_node(Storage::Temporary, NodeData::Tuple(&[]))
    }

    /// Resolve `placeholder` to `replacement`; every earlier holder of the
    /// placeholder id sees `replacement` from now on.
    ///
    /// # Panics
    ///
    /// If `placeholder` is not an unresolved temporary, or if the replacement
    /// resolves back to the placeholder.
    pub fn replace_all_uses_with(&mut self, placeholder: NodeId, replacement: NodeId) {
        let storage = self.nodes[placeholder.index()].storage;
        assert!(
            !matches!(storage, Storage::Replaced(_)),
            "placeholder {placeholder} resolved twice"
        );
        assert_eq!(
            storage,
            Storage::Temporary,
            "node {placeholder} is not a placeholder"
        );
        assert_ne!(
            self.resolve(replacement),
            placeholder,
            "placeholder {placeholder} cannot resolve to itself"
        );
        log::debug!("resolving placeholder {placeholder} -> {replacement}");
        self.nodes[placeholder.index()].storage = Storage::Replaced(replacement);
        self.stats.placeholders_resolved += 1;
    }

    /// Follow placeholder forwards to the node currently standing for `id`.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Storage::Replaced(target) = self.nodes[id.index()].storage {
            id = target;
        }
        id
    }

    /// Node standing for `id` after resolution.
    pub fn node(&self, id: NodeId) -> &MdNode<'arena> {
        &self.nodes[self.resolve(id).index()]
    }

    pub fn operands(&self, id: NodeId) -> &'arena [Metadata<'arena>] {
        self.node(id).operands()
    }

    pub fn is_distinct(&self, id: NodeId) -> bool {
        self.node(id).storage == Storage::Distinct
    }

    /// Whether `id` is still an unresolved placeholder.
    pub fn is_temporary(&self, id: NodeId) -> bool {
        self.node(id).storage == Storage::Temporary
    }

    /// Whether `id` is a distinct node whose operand zero is itself.
    pub fn is_self_referencing(&self, id: NodeId) -> bool {
        let id = self.resolve(id);
        self.is_distinct(id) && self.operands(id).first() == Some(&Metadata::Node(id))
    }

    /// Uniqued property node `!{!"tag", values...}` as an operand.
    pub fn property(&mut self, tag: &str, values: &[Metadata<'arena>]) -> Metadata<'arena> {
        let mut ops = Vec::with_capacity(values.len() + 1);
        ops.push(self.string(tag));
        ops.extend_from_slice(values);
        Metadata::Node(self.get(&ops))
    }

    /// Uniqued marker node `!{!"tag"}` as an operand.
    pub fn flag(&mut self, tag: &str) -> Metadata<'arena> {
        self.property(tag, &[])
    }

    /// Tag of a property node, if `operand` is one.
    pub fn property_tag(&self, operand: Metadata<'arena>) -> Option<&'arena str> {
        let id = operand.as_node()?;
        self.operands(id).first()?.as_str()
    }

    /// Values of the first property of `node` tagged `tag`.
    pub fn find_property(&self, node: NodeId, tag: &str) -> Option<&'arena [Metadata<'arena>]> {
        self.operands(node).iter().find_map(|op| {
            let prop = op.as_node()?;
            let ops = self.operands(prop);
            match ops.first() {
                Some(Metadata::String(s)) if *s == tag => Some(&ops[1..]),
                _ => None,
            }
        })
    }

    pub fn has_property(&self, node: NodeId, tag: &str) -> bool {
        self.find_property(node, tag).is_some()
    }

    /// Tags of all property operands of `node`, in order.
    pub fn property_tags(&self, node: NodeId) -> Vec<&'arena str> {
        self.operands(node)
            .iter()
            .filter_map(|op| self.property_tag(*op))
            .collect()
    }

    pub fn stats(&self) -> &MetadataStats {
        &self.stats
    }

    pub(crate) fn record_loop_finished(&mut self) {
        self.stats.loops_finished += 1;
    }

    pub(crate) fn record_inner_followup(&mut self) {
        self.stats.inner_followups += 1;
    }
}

/// Counters kept by a [`MetadataContext`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetadataStats {
    /// Distinct nodes created (loop IDs, access groups).
    pub distinct_nodes: usize,

    /// Uniqued nodes created (properties, locations, group unions).
    pub uniqued_nodes: usize,

    /// Placeholders created for open loops.
    pub placeholders_created: usize,

    /// Placeholders resolved at loop exit.
    pub placeholders_resolved: usize,

    /// Loops whose metadata was finalized.
    pub loops_finished: usize,

    /// Unroll-and-jam inner followups recorded on parent loops.
    pub inner_followups: usize,
}

impl fmt::Display for MetadataStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loop Metadata Statistics:")?;
        writeln!(f, "  Distinct nodes: {}", self.distinct_nodes)?;
        writeln!(f, "  Uniqued nodes: {}", self.uniqued_nodes)?;
        writeln!(
            f,
            "  Placeholders: {} created, {} resolved",
            self.placeholders_created, self.placeholders_resolved
        )?;
        writeln!(f, "  Loops finished: {}", self.loops_finished)?;
        writeln!(f, "  Inner followups: {}", self.inner_followups)?;
        Ok(())
    }
}
