// This module builds the `llvm.loop` metadata chain of one loop from its LoopAttributes. The
// transformations form a fixed pipeline evaluated from the outermost to the innermost stage:
// temporal blocking, full unroll, distribute, vectorize, unroll-and-jam, partial unroll and
// pipelining, terminated by a base node. One generic routine walks the Stage table. A stage
// with no request passes the base children through unchanged; an explicitly disabled stage
// appends its disable marker to the base children and passes through; an enabled stage
// builds a distinct self-referencing node holding the base children and its own parameters,
// and, unless it is terminal, links a followup chain computed from the remaining stages with
// a guard marker added so the same transformation is never applied twice. The followup chain
// is only built, and linked, when one of the remaining stages is enabled. Temporal blocking is terminal and
// carries only its dedicated children. Every node returned is distinct, so two loops never
// share a loop ID even when their attributes are identical.

//! Loop transformation metadata chains.

use crate::core::context::MetadataContext;
use crate::core::metadata::{Metadata, NodeId};
use crate::hints::attributes::{LoopAttributes, TransformState};
use std::fmt;

pub const PARALLEL_ACCESSES: &str = "llvm.loop.parallel_accesses";
pub const IS_VECTORIZED: &str = "llvm.loop.isvectorized";

pub const TEMPORAL_BLOCKING_SCHEMES: &str = "llvm.loop.temporalblocking.schemes";
pub const TEMPORAL_BLOCKING_TILE_SIZES: &str = "llvm.loop.temporalblocking.tilesizes";
pub const TEMPORAL_BLOCKING_RADIUSES: &str = "llvm.loop.temporalblocking.radiuses";
pub const TEMPORAL_BLOCKING_ENABLE: &str = "llvm.loop.temporalblocking.enable";

pub const UNROLL_DISABLE: &str = "llvm.loop.unroll.disable";
pub const UNROLL_FULL: &str = "llvm.loop.unroll.full";
pub const UNROLL_ENABLE: &str = "llvm.loop.unroll.enable";
pub const UNROLL_COUNT: &str = "llvm.loop.unroll.count";
pub const UNROLL_FOLLOWUP_ALL: &str = "llvm.loop.unroll.followup_all";

pub const DISTRIBUTE_ENABLE: &str = "llvm.loop.distribute.enable";
pub const DISTRIBUTE_FOLLOWUP_ALL: &str = "llvm.loop.distribute.followup_all";

pub const VECTORIZE_ENABLE: &str = "llvm.loop.vectorize.enable";
pub const VECTORIZE_WIDTH: &str = "llvm.loop.vectorize.width";
pub const VECTORIZE_PREDICATE_ENABLE: &str = "llvm.loop.vectorize.predicate.enable";
pub const VECTORIZE_FOLLOWUP_ALL: &str = "llvm.loop.vectorize.followup_all";
pub const INTERLEAVE_COUNT: &str = "llvm.loop.interleave.count";

pub const UNROLL_AND_JAM_DISABLE: &str = "llvm.loop.unroll_and_jam.disable";
pub const UNROLL_AND_JAM_ENABLE: &str = "llvm.loop.unroll_and_jam.enable";
pub const UNROLL_AND_JAM_COUNT: &str = "llvm.loop.unroll_and_jam.count";
pub const UNROLL_AND_JAM_FOLLOWUP_OUTER: &str = "llvm.loop.unroll_and_jam.followup_outer";
pub const UNROLL_AND_JAM_FOLLOWUP_INNER: &str = "llvm.loop.unroll_and_jam.followup_inner";

pub const PIPELINE_DISABLE: &str = "llvm.loop.pipeline.disable";
pub const PIPELINE_INITIATION_INTERVAL: &str = "llvm.loop.pipeline.initiationinterval";

/// What a loop asks of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    Unspecified,
    Disabled,
    Enabled,
}

/// One transformation of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    TemporalBlocking,
    FullUnroll,
    Distribute,
    Vectorize,
    UnrollAndJam,
    PartialUnroll,
    Pipeline,
}

impl Stage {
    /// Outermost first.
    pub const ORDER: [Stage; 7] = [
        Stage::TemporalBlocking,
        Stage::FullUnroll,
        Stage::Distribute,
        Stage::Vectorize,
        Stage::UnrollAndJam,
        Stage::PartialUnroll,
        Stage::Pipeline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::TemporalBlocking => "temporal-blocking",
            Stage::FullUnroll => "full-unroll",
            Stage::Distribute => "distribute",
            Stage::Vectorize => "vectorize",
            Stage::UnrollAndJam => "unroll-and-jam",
            Stage::PartialUnroll => "partial-unroll",
            Stage::Pipeline => "pipeline",
        }
    }

    pub fn decision(self, attrs: &LoopAttributes) -> StageDecision {
        use StageDecision::*;
        match self {
            Stage::TemporalBlocking => {
                if attrs.temporal_blocking_enabled {
                    Enabled
                } else {
                    Unspecified
                }
            }
            Stage::FullUnroll => match attrs.unroll_enable {
                TransformState::Disable => Disabled,
                TransformState::Full => Enabled,
                _ => Unspecified,
            },
            Stage::Distribute => match attrs.distribute_enable {
                TransformState::Disable => Disabled,
                TransformState::Enable => Enabled,
                _ => Unspecified,
            },
            Stage::Vectorize => {
                if attrs.vectorize_enable == TransformState::Disable {
                    Disabled
                } else if attrs.requests_vectorization() {
                    Enabled
                } else {
                    Unspecified
                }
            }
            Stage::UnrollAndJam => {
                if attrs.unroll_and_jam_enable == TransformState::Disable {
                    Disabled
                } else if attrs.requests_unroll_and_jam() {
                    Enabled
                } else {
                    Unspecified
                }
            }
            Stage::PartialUnroll => match attrs.unroll_enable {
                TransformState::Disable => Disabled,
                // Handled entirely by the full-unroll stage.
                TransformState::Full => Unspecified,
                TransformState::Enable => Enabled,
                TransformState::Unspecified if attrs.unroll_count != 0 => Enabled,
                TransformState::Unspecified => Unspecified,
            },
            Stage::Pipeline => {
                if attrs.pipeline_disabled {
                    Disabled
                } else if attrs.pipeline_initiation_interval != 0 {
                    Enabled
                } else {
                    Unspecified
                }
            }
        }
    }

    /// Child appended to the base children when the stage is disabled.
    fn disable_marker<'arena>(self, ctx: &mut MetadataContext<'arena>) -> Option<Metadata<'arena>> {
        match self {
            Stage::FullUnroll => Some(ctx.flag(UNROLL_DISABLE)),
            Stage::Distribute => Some(ctx.property(DISTRIBUTE_ENABLE, &[Metadata::i1(false)])),
            Stage::Vectorize => Some(ctx.property(VECTORIZE_ENABLE, &[Metadata::i1(false)])),
            Stage::UnrollAndJam => Some(ctx.flag(UNROLL_AND_JAM_DISABLE)),
            Stage::Pipeline => Some(ctx.property(PIPELINE_DISABLE, &[Metadata::i1(true)])),
            // The full-unroll stage already emitted `llvm.loop.unroll.disable`.
            Stage::PartialUnroll | Stage::TemporalBlocking => None,
        }
    }

    /// Marker added to the followup's base children, `None` for terminal
    /// stages.
    fn followup_guard<'arena>(self, ctx: &mut MetadataContext<'arena>) -> Option<Metadata<'arena>> {
        match self {
            Stage::Distribute => Some(ctx.property(DISTRIBUTE_ENABLE, &[Metadata::i1(false)])),
            Stage::Vectorize => Some(ctx.flag(IS_VECTORIZED)),
            Stage::UnrollAndJam => Some(ctx.flag(UNROLL_AND_JAM_DISABLE)),
            Stage::PartialUnroll => Some(ctx.flag(UNROLL_DISABLE)),
            Stage::TemporalBlocking | Stage::FullUnroll | Stage::Pipeline => None,
        }
    }

    fn followup_tag(self) -> Option<&'static str> {
        match self {
            Stage::Distribute => Some(DISTRIBUTE_FOLLOWUP_ALL),
            Stage::Vectorize => Some(VECTORIZE_FOLLOWUP_ALL),
            Stage::UnrollAndJam => Some(UNROLL_AND_JAM_FOLLOWUP_OUTER),
            Stage::PartialUnroll => Some(UNROLL_FOLLOWUP_ALL),
            Stage::TemporalBlocking | Stage::FullUnroll | Stage::Pipeline => None,
        }
    }

    /// Whether the enabled node repeats the base children.
    fn keeps_base_children(self) -> bool {
        self != Stage::TemporalBlocking
    }

    /// Append the stage's own parameter children.
    fn emit_params<'arena>(
        self,
        ctx: &mut MetadataContext<'arena>,
        attrs: &LoopAttributes,
        ops: &mut Vec<Metadata<'arena>>,
    ) {
        match self {
            Stage::TemporalBlocking => {
                if !attrs.schemes.is_empty() {
                    let schemes: Vec<_> = attrs
                        .schemes
                        .iter()
                        .map(|scheme| ctx.string(scheme.name()))
                        .collect();
                    ops.push(ctx.property(TEMPORAL_BLOCKING_SCHEMES, &schemes));
                }
                if !attrs.tile_sizes.is_empty() {
                    let sizes: Vec<_> = attrs.tile_sizes.iter().map(|&v| Metadata::i32(v)).collect();
                    ops.push(ctx.property(TEMPORAL_BLOCKING_TILE_SIZES, &sizes));
                }
                if !attrs.radiuses.is_empty() {
                    let radiuses: Vec<_> = attrs.radiuses.iter().map(|&v| Metadata::i32(v)).collect();
                    ops.push(ctx.property(TEMPORAL_BLOCKING_RADIUSES, &radiuses));
                }
                ops.push(ctx.property(TEMPORAL_BLOCKING_ENABLE, &[Metadata::i1(true)]));
            }
            Stage::FullUnroll => ops.push(ctx.flag(UNROLL_FULL)),
            Stage::Distribute => ops.push(ctx.property(DISTRIBUTE_ENABLE, &[Metadata::i1(true)])),
            Stage::Vectorize => {
                let mut predicate_enabled = false;
                if attrs.vectorize_predicate_enable != TransformState::Unspecified
                    && attrs.vectorize_enable != TransformState::Disable
                    && attrs.vectorize_width < 1
                {
                    predicate_enabled = attrs.vectorize_predicate_enable == TransformState::Enable;
                    ops.push(ctx.property(
                        VECTORIZE_PREDICATE_ENABLE,
                        &[Metadata::i1(predicate_enabled)],
                    ));
                }
                if attrs.vectorize_width > 0 {
                    ops.push(ctx.property(VECTORIZE_WIDTH, &[Metadata::i32(attrs.vectorize_width)]));
                }
                if attrs.interleave_count > 0 {
                    ops.push(ctx.property(INTERLEAVE_COUNT, &[Metadata::i32(attrs.interleave_count)]));
                }
                // Implied by a predicate request or a width above one.
                if attrs.vectorize_enable != TransformState::Unspecified
                    || predicate_enabled
                    || attrs.vectorize_width > 1
                {
                    let enabled = attrs.vectorize_enable != TransformState::Disable;
                    ops.push(ctx.property(VECTORIZE_ENABLE, &[Metadata::i1(enabled)]));
                }
            }
            Stage::UnrollAndJam => {
                if attrs.unroll_and_jam_count > 0 {
                    ops.push(ctx.property(
                        UNROLL_AND_JAM_COUNT,
                        &[Metadata::i32(attrs.unroll_and_jam_count)],
                    ));
                }
                if attrs.unroll_and_jam_enable == TransformState::Enable {
                    ops.push(ctx.flag(UNROLL_AND_JAM_ENABLE));
                }
            }
            Stage::PartialUnroll => {
                if attrs.unroll_count > 0 {
                    ops.push(ctx.property(UNROLL_COUNT, &[Metadata::i32(attrs.unroll_count)]));
                }
                if attrs.unroll_enable == TransformState::Enable {
                    ops.push(ctx.flag(UNROLL_ENABLE));
                }
            }
            Stage::Pipeline => ops.push(ctx.property(
                PIPELINE_INITIATION_INTERVAL,
                &[Metadata::i32(attrs.pipeline_initiation_interval)],
            )),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of building one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopChain {
    /// Outermost node of the chain, the loop ID.
    pub id: NodeId,
    /// Whether any stage was enabled.
    pub has_user_transforms: bool,
}

/// Builds metadata chains into a [`MetadataContext`].
pub struct ChainBuilder<'c, 'arena> {
    ctx: &'c mut MetadataContext<'arena>,
    inner_followup: Option<NodeId>,
}

impl<'c, 'arena> ChainBuilder<'c, 'arena> {
    pub fn new(ctx: &'c mut MetadataContext<'arena>) -> Self {
        Self {
            ctx,
            inner_followup: None,
        }
    }

    /// Followup for the jammed inner loops, recorded by a child loop.
    pub fn with_inner_followup(mut self, inner_followup: Option<NodeId>) -> Self {
        self.inner_followup = inner_followup;
        self
    }

    /// Build the chain for `attrs` with `base` as the base children.
    pub fn build(&mut self, attrs: &LoopAttributes, base: &[Metadata<'arena>]) -> LoopChain {
        let mut has_user_transforms = false;
        let id = self.build_from(&Stage::ORDER, attrs, base, &mut has_user_transforms);
        LoopChain {
            id,
            has_user_transforms,
        }
    }

    fn build_from(
        &mut self,
        stages: &[Stage],
        attrs: &LoopAttributes,
        base: &[Metadata<'arena>],
        has_user_transforms: &mut bool,
    ) -> NodeId {
        let Some((&stage, inner)) = stages.split_first() else {
            return self.ctx.get_self_referencing(base);
        };

        let decision = stage.decision(attrs);
        log::trace!("stage {stage}: {decision:?}");

        match decision {
            StageDecision::Unspecified => self.build_from(inner, attrs, base, has_user_transforms),
            StageDecision::Disabled => match stage.disable_marker(self.ctx) {
                Some(marker) => {
                    let mut props = base.to_vec();
                    props.push(marker);
                    self.build_from(inner, attrs, &props, has_user_transforms)
                }
                None => self.build_from(inner, attrs, base, has_user_transforms),
            },
            StageDecision::Enabled => {
                let inner_enabled = inner
                    .iter()
                    .any(|inner_stage| inner_stage.decision(attrs) == StageDecision::Enabled);
                let guard = if inner_enabled {
                    stage.followup_guard(self.ctx)
                } else {
                    None
                };
                let followup = guard.map(|guard| {
                    let mut props = base.to_vec();
                    props.push(guard);
                    let mut followup_has_transforms = false;
                    self.build_from(inner, attrs, &props, &mut followup_has_transforms)
                });

                let mut ops = if stage.keeps_base_children() {
                    base.to_vec()
                } else {
                    Vec::new()
                };
                stage.emit_params(self.ctx, attrs, &mut ops);

                if let (Some(tag), Some(followup)) = (stage.followup_tag(), followup) {
                    ops.push(self.ctx.property(tag, &[followup.into()]));
                }
                if stage == Stage::UnrollAndJam {
                    if let Some(inner_followup) = self.inner_followup {
                        ops.push(
                            self.ctx
                                .property(UNROLL_AND_JAM_FOLLOWUP_INNER, &[inner_followup.into()]),
                        );
                    }
                }

                *has_user_transforms = true;
                self.ctx.get_self_referencing(&ops)
            }
        }
    }
}
