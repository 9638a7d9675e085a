// This module implements the stack of loops that are open while the code generator emits a
// function. Directives for the next loop are resolved into a single staged LoopAttributes
// record; push snapshots and clears it, so attributes never leak into nested loops. A loop
// that carries any request, a source location or the parallel flag gets a temporary
// placeholder as its loop ID and, when parallel, a fresh distinct access group. Every emitted
// instruction passes through tag_instruction: memory instructions receive the access groups
// of all open parallel loops, and a terminator branching back to the innermost header
// receives that loop's placeholder. pop finalizes the innermost loop: when its parent
// unroll-and-jams it, the loop's attributes are split into a before-jam half (built into the
// loop's own chain) and an after-jam half (built once, by the first such child, into the
// parent's inner followup); the placeholder is then resolved to the finished chain, which
// every previously tagged back-edge observes through placeholder forwarding.

//! Loop nesting stack.

use super::chain::{ChainBuilder, LoopChain, IS_VECTORIZED, PARALLEL_ACCESSES};
use crate::core::adaptor::InstructionAdaptor;
use crate::core::context::MetadataContext;
use crate::core::error::HintResult;
use crate::core::metadata::{Metadata, MetadataKind, NodeId, SourceLoc};
use crate::core::options::CodeGenOptions;
use crate::hints::attributes::LoopAttributes;
use crate::hints::resolver::resolve_directives;
use crate::hints::Directive;
use std::mem;

/// State of one open loop.
#[derive(Debug)]
pub struct LoopInfo<B> {
    header: B,
    attrs: LoopAttributes,
    start_loc: Option<SourceLoc>,
    end_loc: Option<SourceLoc>,
    access_group: Option<NodeId>,
    temp_loop_id: Option<NodeId>,
    unroll_and_jam_inner_followup: Option<NodeId>,
}

impl<B: Copy + Eq> LoopInfo<B> {
    pub fn new(
        ctx: &mut MetadataContext<'_>,
        header: B,
        attrs: LoopAttributes,
        start_loc: Option<SourceLoc>,
        end_loc: Option<SourceLoc>,
    ) -> Self {
        let access_group = attrs.is_parallel.then(|| ctx.get_distinct(&[]));

        let needs_loop_id = !attrs.is_default() || start_loc.is_some() || end_loc.is_some();
        let temp_loop_id = needs_loop_id.then(|| ctx.temporary());

        Self {
            header,
            attrs,
            start_loc,
            end_loc,
            access_group,
            temp_loop_id,
            unroll_and_jam_inner_followup: None,
        }
    }

    pub fn header(&self) -> B {
        self.header
    }

    pub fn attributes(&self) -> &LoopAttributes {
        &self.attrs
    }

    pub fn access_group(&self) -> Option<NodeId> {
        self.access_group
    }

    /// Placeholder loop ID; resolves to the final chain once the loop is
    /// finished.
    pub fn loop_id(&self) -> Option<NodeId> {
        self.temp_loop_id
    }

    pub fn unroll_and_jam_inner_followup(&self) -> Option<NodeId> {
        self.unroll_and_jam_inner_followup
    }

    /// Record the followup for jammed inner loops unless one is already set.
    /// Returns whether `followup` was recorded.
    pub fn offer_inner_followup(&mut self, followup: NodeId) -> bool {
        if self.unroll_and_jam_inner_followup.is_some() {
            return false;
        }
        self.unroll_and_jam_inner_followup = Some(followup);
        true
    }

    /// Locations, the parallel access group, then `additional`.
    fn base_properties<'arena>(
        &self,
        ctx: &mut MetadataContext<'arena>,
        additional: &[Metadata<'arena>],
    ) -> Vec<Metadata<'arena>> {
        let mut props = Vec::with_capacity(additional.len() + 3);

        if let Some(start) = self.start_loc {
            props.push(ctx.location(start).into());
            if let Some(end) = self.end_loc {
                props.push(ctx.location(end).into());
            }
        }

        if let Some(group) = self.access_group {
            props.push(ctx.property(PARALLEL_ACCESSES, &[group.into()]));
        }

        props.extend_from_slice(additional);
        props
    }

    fn create_metadata<'arena>(
        &self,
        ctx: &mut MetadataContext<'arena>,
        attrs: &LoopAttributes,
        additional: &[Metadata<'arena>],
    ) -> LoopChain {
        assert_eq!(
            self.access_group.is_some(),
            attrs.is_parallel,
            "access group must be present exactly when the loop is parallel"
        );
        let base = self.base_properties(ctx, additional);
        ChainBuilder::new(ctx)
            .with_inner_followup(self.unroll_and_jam_inner_followup)
            .build(attrs, &base)
    }

    /// Build the final loop ID and resolve the placeholder to it. `parent`
    /// is the enclosing open loop, if any.
    pub fn finish(&mut self, ctx: &mut MetadataContext<'_>, parent: Option<&mut LoopInfo<B>>) {
        let Some(temp) = self.temp_loop_id else {
            return;
        };

        let jamming_parent = parent.filter(|parent| parent.attrs.requests_unroll_and_jam());
        let own_attrs = match jamming_parent {
            Some(parent) => {
                let (before_jam, after_jam) = self.attrs.split_for_unroll_and_jam();
                log::debug!("splitting loop attributes for the enclosing unroll-and-jam");

                if parent.unroll_and_jam_inner_followup.is_none() {
                    // Splitting loses the marker the vectorizer would leave
                    // behind, so carry it into the post-jam chain.
                    let additional = if before_jam.requests_vectorization() {
                        vec![ctx.flag(IS_VECTORIZED)]
                    } else {
                        Vec::new()
                    };
                    let after = self.create_metadata(ctx, &after_jam, &additional);
                    if after.has_user_transforms && parent.offer_inner_followup(after.id) {
                        ctx.record_inner_followup();
                    }
                }
                before_jam
            }
            None => self.attrs.clone(),
        };

        let chain = self.create_metadata(ctx, &own_attrs, &[]);
        ctx.replace_all_uses_with(temp, chain.id);
        ctx.record_loop_finished();
        log::debug!(
            "finished loop {temp} -> {} (user transforms: {})",
            chain.id,
            chain.has_user_transforms
        );
    }
}

/// Open loops of the function being emitted, innermost last.
pub struct LoopInfoStack<'c, 'arena, B> {
    ctx: &'c mut MetadataContext<'arena>,
    staged: LoopAttributes,
    active: Vec<LoopInfo<B>>,
}

impl<'c, 'arena, B: Copy + Eq + std::fmt::Debug> LoopInfoStack<'c, 'arena, B> {
    pub fn new(ctx: &'c mut MetadataContext<'arena>) -> Self {
        Self {
            ctx,
            staged: LoopAttributes::default(),
            active: Vec::new(),
        }
    }

    pub fn context(&self) -> &MetadataContext<'arena> {
        &*self.ctx
    }

    pub fn context_mut(&mut self) -> &mut MetadataContext<'arena> {
        &mut *self.ctx
    }

    /// Attributes the next pushed loop will receive.
    pub fn staged_attributes(&self) -> &LoopAttributes {
        &self.staged
    }

    pub fn staged_attributes_mut(&mut self) -> &mut LoopAttributes {
        &mut self.staged
    }

    /// Open a loop with the staged attributes; the staged record is reset.
    pub fn push(&mut self, header: B, start_loc: Option<SourceLoc>, end_loc: Option<SourceLoc>) {
        let attrs = mem::take(&mut self.staged);
        let info = LoopInfo::new(self.ctx, header, attrs, start_loc, end_loc);
        log::debug!(
            "push loop {:?} at depth {} (loop id: {:?}, access group: {:?})",
            header,
            self.active.len(),
            info.temp_loop_id,
            info.access_group
        );
        self.active.push(info);
    }

    /// Resolve `directives` into the staged attributes, then open the loop.
    /// On error nothing is pushed and the staged attributes are discarded.
    pub fn push_with_hints(
        &mut self,
        header: B,
        options: &CodeGenOptions,
        directives: &[Directive],
        start_loc: Option<SourceLoc>,
        end_loc: Option<SourceLoc>,
    ) -> HintResult<()> {
        let mut attrs = mem::take(&mut self.staged);
        resolve_directives(&mut attrs, options, directives)?;
        self.staged = attrs;
        self.push(header, start_loc, end_loc);
        Ok(())
    }

    /// Close the innermost loop and return its resolved loop ID, if it has
    /// one.
    ///
    /// # Panics
    ///
    /// If no loop is open.
    pub fn pop(&mut self) -> Option<NodeId> {
        assert!(!self.active.is_empty(), "cannot pop an empty loop stack");
        let mut info = self.active.pop()?;
        info.finish(self.ctx, self.active.last_mut());
        log::debug!("pop loop {:?}", info.header);
        info.loop_id().map(|id| self.ctx.resolve(id))
    }

    /// Innermost open loop.
    ///
    /// # Panics
    ///
    /// If no loop is open.
    pub fn info(&self) -> &LoopInfo<B> {
        match self.active.last() {
            Some(info) => info,
            None => panic!("no open loop"),
        }
    }

    pub fn has_info(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Attach access groups and the loop ID to a freshly emitted instruction.
    pub fn tag_instruction<I>(&mut self, inst: &mut I)
    where
        I: InstructionAdaptor<BlockRef = B>,
    {
        if inst.may_read_or_write_memory() {
            let groups: Vec<Metadata<'arena>> = self
                .active
                .iter()
                .filter_map(|info| info.access_group)
                .map(Metadata::Node)
                .collect();
            let union = match groups.as_slice() {
                [] => None,
                [single] => single.as_node(),
                _ => Some(self.ctx.get(&groups)),
            };
            inst.set_metadata(MetadataKind::AccessGroup, union);
        }

        let Some(top) = self.active.last() else {
            return;
        };
        let Some(loop_id) = top.loop_id() else {
            return;
        };
        if inst.is_terminator() && inst.successors().any(|succ| succ == top.header) {
            inst.set_metadata(MetadataKind::Loop, Some(loop_id));
        }
    }
}
