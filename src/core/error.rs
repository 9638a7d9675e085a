// This module defines the error type for loop hint resolution using the thiserror crate.
// LoopHintError covers the ways a parsed directive can reach this stage in an impossible
// shape: a state that cannot be combined with the option (for example `unroll_count` with
// `disable`), a directive carrying no state at all, a numeric state with no operand, and
// a count or interval requested on a loop whose matching transformation was explicitly
// disabled by another directive. Every variant names the option and, where relevant, the offending state so the report
// identifies the exact pair. These errors mean an earlier semantic check let the directive
// through; callers treat them as fatal for the compilation. HintResult<T> is the alias used
// by the resolver and the loop stack.

//! Error types for loop hint resolution.

use crate::hints::{HintOption, HintState};
use thiserror::Error;

/// A directive that cannot be turned into loop attributes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopHintError {
    #[error("loop hint option '{option}' cannot be used with state '{state}'")]
    IllegalCombination { option: HintOption, state: HintState },

    #[error("loop hint option '{option}' has no state")]
    MissingState { option: HintOption },

    #[error("loop hint option '{option}' requires a numeric operand")]
    MissingOperand { option: HintOption },

    #[error("loop hint option '{option}' conflicts with an explicit disable")]
    ConflictingRequest { option: HintOption },
}

/// Result type alias for hint resolution.
pub type HintResult<T> = Result<T, LoopHintError>;
