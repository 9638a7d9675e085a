// This module defines LoopAttributes, the per-loop record of transformation requests that the
// resolver fills from directives and the chain builder reads when the loop closes. Enable
// switches use the four-valued TransformState (unspecified, enable, disable, full) so that
// "no request" stays distinguishable from an explicit "off"; counts and widths use zero for
// "no request". Temporal blocking keeps ordered scheme, tile-size and radius lists. The
// record also knows how to split itself for a parent's unroll-and-jam: the requests that must
// be applied while the loop is still innermost (vectorization, distribution, full unroll, its
// own unroll-and-jam) stay in the "before" half, partial unrolling and pipelining move to the
// "after" half, and unspecified/disabled unroll states are carried into both halves.

//! Per-loop transformation request record.

use std::fmt;

/// Enable switch of one transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransformState {
    #[default]
    Unspecified,
    Enable,
    Disable,
    Full,
}

/// Temporal blocking tiling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalBlockingScheme {
    Diamond,
    Wavefront,
    Trapezoid,
}

impl TemporalBlockingScheme {
    pub fn name(self) -> &'static str {
        match self {
            TemporalBlockingScheme::Diamond => "diamond",
            TemporalBlockingScheme::Wavefront => "wavefront",
            TemporalBlockingScheme::Trapezoid => "trapezoid",
        }
    }
}

impl fmt::Display for TemporalBlockingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transformation requests for one loop.
///
/// A count or width greater than zero never coexists with the matching
/// switch set to [`TransformState::Disable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopAttributes {
    /// No loop-carried memory dependences (`assume_safety`).
    pub is_parallel: bool,

    pub vectorize_enable: TransformState,
    pub vectorize_width: u32,
    pub interleave_count: u32,
    pub vectorize_predicate_enable: TransformState,

    pub unroll_enable: TransformState,
    pub unroll_count: u32,

    pub unroll_and_jam_enable: TransformState,
    pub unroll_and_jam_count: u32,

    pub distribute_enable: TransformState,

    pub pipeline_disabled: bool,
    pub pipeline_initiation_interval: u32,

    pub temporal_blocking_enabled: bool,
    pub schemes: Vec<TemporalBlockingScheme>,
    pub tile_sizes: Vec<u32>,
    pub radiuses: Vec<u32>,
}

impl LoopAttributes {
    pub fn new(is_parallel: bool) -> Self {
        Self {
            is_parallel,
            ..Self::default()
        }
    }

    /// Reset every request.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing at all was requested.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any vectorize, interleave or predicate request is present.
    pub fn requests_vectorization(&self) -> bool {
        self.vectorize_enable != TransformState::Unspecified
            || self.vectorize_predicate_enable != TransformState::Unspecified
            || self.interleave_count != 0
            || self.vectorize_width != 0
    }

    /// Whether this loop unroll-and-jams its children.
    pub fn requests_unroll_and_jam(&self) -> bool {
        self.unroll_and_jam_enable == TransformState::Enable || self.unroll_and_jam_count != 0
    }

    /// Split into the requests applied before and after an enclosing loop's
    /// unroll-and-jam fuses copies of this loop.
    pub fn split_for_unroll_and_jam(&self) -> (LoopAttributes, LoopAttributes) {
        let mut before = LoopAttributes::new(self.is_parallel);
        let mut after = LoopAttributes::new(self.is_parallel);

        before.vectorize_width = self.vectorize_width;
        before.interleave_count = self.interleave_count;
        before.vectorize_enable = self.vectorize_enable;
        before.distribute_enable = self.distribute_enable;
        before.vectorize_predicate_enable = self.vectorize_predicate_enable;

        match self.unroll_enable {
            TransformState::Unspecified | TransformState::Disable => {
                before.unroll_enable = self.unroll_enable;
                after.unroll_enable = self.unroll_enable;
            }
            TransformState::Full => before.unroll_enable = TransformState::Full,
            TransformState::Enable => after.unroll_enable = TransformState::Enable,
        }

        after.unroll_count = self.unroll_count;
        after.pipeline_disabled = self.pipeline_disabled;
        after.pipeline_initiation_interval = self.pipeline_initiation_interval;

        // The unroll-and-jam pass visits inner loops first, so this loop's
        // own jam happens before the parent's.
        before.unroll_and_jam_count = self.unroll_and_jam_count;
        before.unroll_and_jam_enable = self.unroll_and_jam_enable;

        (before, after)
    }
}
