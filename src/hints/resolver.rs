// This module resolves parsed loop directives into LoopAttributes. Each LoopHint is dispatched
// first on its leading state and then on its option; every legal pair mutates the record
// (for example `vectorize(disable)` becomes a vectorize width of one, `interleave(assume_safety)`
// marks the loop parallel and enables vectorization, `tile_size(32, 32)` enables temporal
// blocking and copies the operand list) and every other pair is reported as an
// IllegalCombination naming both sides. The legacy OpenCL unroll hint maps 0 to an unroll
// enable, 1 to nothing, and any other value to an unroll count. After all directives of a loop
// are applied, resolve_directives rejects a count or initiation interval left next to an
// explicit disable of the same transformation, then turns unrolling off when optimizing with loop unrolling
// globally disabled and no directive asked for unrolling.

//! Directive resolution.

use super::attributes::{LoopAttributes, TransformState};
use super::{Directive, HintOption, HintState, LoopHint};
use crate::core::error::{HintResult, LoopHintError};
use crate::core::options::CodeGenOptions;

/// Apply one `LoopHint` to `attrs`.
pub fn apply_hint(attrs: &mut LoopAttributes, hint: &LoopHint) -> HintResult<()> {
    let option = hint.option;
    let state = *hint
        .states
        .first()
        .ok_or(LoopHintError::MissingState { option })?;
    let illegal = || LoopHintError::IllegalCombination { option, state };

    log::trace!("resolving loop hint {option}({state})");

    match state {
        HintState::Disable => match option {
            // Vectorization and interleaving are disabled through a width or
            // count of one.
            HintOption::Vectorize => attrs.vectorize_width = 1,
            HintOption::Interleave => attrs.interleave_count = 1,
            HintOption::Unroll => attrs.unroll_enable = TransformState::Disable,
            HintOption::UnrollAndJam => attrs.unroll_and_jam_enable = TransformState::Disable,
            HintOption::VectorizePredicate => {
                attrs.vectorize_predicate_enable = TransformState::Disable
            }
            HintOption::Distribute => attrs.distribute_enable = TransformState::Disable,
            HintOption::PipelineDisabled => attrs.pipeline_disabled = true,
            _ => return Err(illegal()),
        },
        HintState::Enable => match option {
            HintOption::Vectorize | HintOption::Interleave => {
                attrs.vectorize_enable = TransformState::Enable
            }
            HintOption::Unroll => attrs.unroll_enable = TransformState::Enable,
            HintOption::UnrollAndJam => attrs.unroll_and_jam_enable = TransformState::Enable,
            HintOption::VectorizePredicate => {
                attrs.vectorize_predicate_enable = TransformState::Enable
            }
            HintOption::Distribute => attrs.distribute_enable = TransformState::Enable,
            _ => return Err(illegal()),
        },
        HintState::AssumeSafety => match option {
            HintOption::Vectorize | HintOption::Interleave => {
                attrs.is_parallel = true;
                attrs.vectorize_enable = TransformState::Enable;
            }
            _ => return Err(illegal()),
        },
        HintState::Full => match option {
            HintOption::Unroll => attrs.unroll_enable = TransformState::Full,
            HintOption::UnrollAndJam => attrs.unroll_and_jam_enable = TransformState::Full,
            _ => return Err(illegal()),
        },
        HintState::Numeric => {
            let first = || {
                hint.values
                    .first()
                    .copied()
                    .ok_or(LoopHintError::MissingOperand { option })
            };
            match option {
                HintOption::VectorizeWidth => attrs.vectorize_width = first()?,
                HintOption::InterleaveCount => attrs.interleave_count = first()?,
                HintOption::UnrollCount => attrs.unroll_count = first()?,
                HintOption::UnrollAndJamCount => attrs.unroll_and_jam_count = first()?,
                HintOption::PipelineInitiationInterval => {
                    attrs.pipeline_initiation_interval = first()?
                }
                HintOption::TileSize => {
                    first()?;
                    attrs.temporal_blocking_enabled = true;
                    attrs.tile_sizes = hint.values.clone();
                }
                HintOption::Radius => {
                    first()?;
                    attrs.temporal_blocking_enabled = true;
                    attrs.radiuses = hint.values.clone();
                }
                _ => return Err(illegal()),
            }
        }
        HintState::Diamond | HintState::Wavefront | HintState::Trapezoid => match option {
            HintOption::Scheme => {
                attrs
                    .schemes
                    .extend(hint.states.iter().filter_map(|state| state.scheme()));
                attrs.temporal_blocking_enabled = true;
            }
            _ => return Err(illegal()),
        },
    }

    Ok(())
}

/// Apply one front-end directive to `attrs`.
pub fn apply_directive(attrs: &mut LoopAttributes, directive: &Directive) -> HintResult<()> {
    match directive {
        Directive::Hint(hint) => apply_hint(attrs, hint),
        Directive::OpenClUnroll(0) => {
            apply_hint(attrs, &LoopHint::new(HintOption::Unroll, HintState::Enable))
        }
        Directive::OpenClUnroll(1) => {
            log::trace!("opencl_unroll_hint(1) requests the default, nothing to resolve");
            Ok(())
        }
        Directive::OpenClUnroll(count) => {
            apply_hint(attrs, &LoopHint::numeric(HintOption::UnrollCount, &[*count]))
        }
    }
}

/// Apply all directives of one loop, then the global unrolling default.
pub fn resolve_directives(
    attrs: &mut LoopAttributes,
    options: &CodeGenOptions,
    directives: &[Directive],
) -> HintResult<()> {
    for directive in directives {
        apply_directive(attrs, directive)?;
    }

    check_conflicts(attrs)?;

    if options.optimizations_enabled()
        && !options.unroll_loops
        && attrs.unroll_enable == TransformState::Unspecified
        && attrs.unroll_count == 0
    {
        log::trace!("unrolling disabled globally and not requested, disabling it for this loop");
        attrs.unroll_enable = TransformState::Disable;
    }

    Ok(())
}

/// A disabled transformation cannot also carry a count.
fn check_conflicts(attrs: &LoopAttributes) -> HintResult<()> {
    let conflict = if attrs.unroll_enable == TransformState::Disable && attrs.unroll_count > 0 {
        Some(HintOption::UnrollCount)
    } else if attrs.unroll_and_jam_enable == TransformState::Disable
        && attrs.unroll_and_jam_count > 0
    {
        Some(HintOption::UnrollAndJamCount)
    } else if attrs.pipeline_disabled && attrs.pipeline_initiation_interval > 0 {
        Some(HintOption::PipelineInitiationInterval)
    } else {
        None
    };

    match conflict {
        Some(option) => Err(LoopHintError::ConflictingRequest { option }),
        None => Ok(()),
    }
}
