// This module models the parsed loop directives handed over by the front end: HintOption names
// the transformation knob a directive targets (vectorize, unroll_count, scheme, tile_size, ...),
// HintState the value kind it carries (enable, disable, numeric, assume_safety, full, or one
// of the temporal-blocking schemes), Spelling the pragma form it was written with, and
// LoopHint bundles an option with its ordered states and numeric operands. Directive wraps a
// LoopHint or the legacy OpenCL integer unroll hint. The module also renders directives for
// diagnostics: values_string() prints the parenthesized state list (numeric states as a
// bracketed operand list), print_pretty_pragma() the text following the pragma name, and
// diagnostic_name() the name used in compiler messages. The resolver in `resolver` turns
// directives into LoopAttributes.

//! Parsed loop directives and their diagnostic rendering.

pub mod attributes;
pub mod resolver;

pub use attributes::{LoopAttributes, TemporalBlockingScheme, TransformState};
pub use resolver::{apply_directive, apply_hint, resolve_directives};

use std::fmt;

/// Transformation knob targeted by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintOption {
    Vectorize,
    VectorizeWidth,
    Interleave,
    InterleaveCount,
    Unroll,
    UnrollCount,
    UnrollAndJam,
    UnrollAndJamCount,
    PipelineDisabled,
    PipelineInitiationInterval,
    Distribute,
    VectorizePredicate,
    TemporalBlocking,
    Scheme,
    TileSize,
    Radius,
}

impl HintOption {
    pub const ALL: [HintOption; 16] = [
        HintOption::Vectorize,
        HintOption::VectorizeWidth,
        HintOption::Interleave,
        HintOption::InterleaveCount,
        HintOption::Unroll,
        HintOption::UnrollCount,
        HintOption::UnrollAndJam,
        HintOption::UnrollAndJamCount,
        HintOption::PipelineDisabled,
        HintOption::PipelineInitiationInterval,
        HintOption::Distribute,
        HintOption::VectorizePredicate,
        HintOption::TemporalBlocking,
        HintOption::Scheme,
        HintOption::TileSize,
        HintOption::Radius,
    ];

    /// Spelling of the option inside `#pragma clang loop`.
    pub fn name(self) -> &'static str {
        match self {
            HintOption::Vectorize => "vectorize",
            HintOption::VectorizeWidth => "vectorize_width",
            HintOption::Interleave => "interleave",
            HintOption::InterleaveCount => "interleave_count",
            HintOption::Unroll => "unroll",
            HintOption::UnrollCount => "unroll_count",
            HintOption::UnrollAndJam => "unroll_and_jam",
            HintOption::UnrollAndJamCount => "unroll_and_jam_count",
            HintOption::PipelineDisabled => "pipeline",
            HintOption::PipelineInitiationInterval => "pipeline_initiation_interval",
            HintOption::Distribute => "distribute",
            HintOption::VectorizePredicate => "vectorize_predicate",
            HintOption::TemporalBlocking => "temporal_blocking",
            HintOption::Scheme => "scheme",
            HintOption::TileSize => "tile_size",
            HintOption::Radius => "radius",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.name() == name)
    }
}

impl fmt::Display for HintOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value kind carried by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintState {
    Enable,
    Disable,
    Numeric,
    AssumeSafety,
    Full,
    Diamond,
    Wavefront,
    Trapezoid,
}

impl HintState {
    pub fn name(self) -> &'static str {
        match self {
            HintState::Enable => "enable",
            HintState::Disable => "disable",
            HintState::Numeric => "numeric",
            HintState::AssumeSafety => "assume_safety",
            HintState::Full => "full",
            HintState::Diamond => "diamond",
            HintState::Wavefront => "wavefront",
            HintState::Trapezoid => "trapezoid",
        }
    }

    /// Keyword states accepted in pragma argument lists.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "enable" => Some(HintState::Enable),
            "disable" => Some(HintState::Disable),
            "assume_safety" => Some(HintState::AssumeSafety),
            "full" => Some(HintState::Full),
            "diamond" => Some(HintState::Diamond),
            "wavefront" => Some(HintState::Wavefront),
            "trapezoid" => Some(HintState::Trapezoid),
            _ => None,
        }
    }

    /// Temporal-blocking scheme named by this state, if any.
    pub fn scheme(self) -> Option<TemporalBlockingScheme> {
        match self {
            HintState::Diamond => Some(TemporalBlockingScheme::Diamond),
            HintState::Wavefront => Some(TemporalBlockingScheme::Wavefront),
            HintState::Trapezoid => Some(TemporalBlockingScheme::Trapezoid),
            _ => None,
        }
    }
}

impl fmt::Display for HintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pragma form a directive was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Spelling {
    #[default]
    ClangLoop,
    Unroll,
    NoUnroll,
    UnrollAndJam,
    NoUnrollAndJam,
    TemporalBlocking,
}

impl Spelling {
    pub fn pragma_name(self) -> &'static str {
        match self {
            Spelling::ClangLoop => "#pragma clang loop",
            Spelling::Unroll => "#pragma unroll",
            Spelling::NoUnroll => "#pragma nounroll",
            Spelling::UnrollAndJam => "#pragma unroll_and_jam",
            Spelling::NoUnrollAndJam => "#pragma nounroll_and_jam",
            Spelling::TemporalBlocking => "#pragma temporal_blocking",
        }
    }
}

/// One parsed loop directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopHint {
    pub spelling: Spelling,
    pub option: HintOption,
    pub states: Vec<HintState>,
    /// Numeric operands, radiuses included, in source order.
    pub values: Vec<u32>,
}

impl LoopHint {
    /// `#pragma clang loop option(state)`.
    pub fn new(option: HintOption, state: HintState) -> Self {
        Self {
            spelling: Spelling::ClangLoop,
            option,
            states: vec![state],
            values: Vec::new(),
        }
    }

    /// `#pragma clang loop option(v0, v1, ...)`.
    pub fn numeric(option: HintOption, values: &[u32]) -> Self {
        Self {
            spelling: Spelling::ClangLoop,
            option,
            states: vec![HintState::Numeric],
            values: values.to_vec(),
        }
    }

    /// `#pragma clang loop option(s0, s1, ...)`.
    pub fn with_states(option: HintOption, states: &[HintState]) -> Self {
        Self {
            spelling: Spelling::ClangLoop,
            option,
            states: states.to_vec(),
            values: Vec::new(),
        }
    }

    pub fn spelled(mut self, spelling: Spelling) -> Self {
        self.spelling = spelling;
        self
    }

    /// Parenthesized state list, e.g. `(enable)` or `([32, 32])`.
    pub fn values_string(&self) -> String {
        let rendered: Vec<String> = self
            .states
            .iter()
            .map(|state| match state {
                HintState::Numeric if self.values.is_empty() => String::new(),
                HintState::Numeric => {
                    let values: Vec<String> = self.values.iter().map(u32::to_string).collect();
                    format!("[{}]", values.join(", "))
                }
                other => other.name().to_string(),
            })
            .collect();
        format!("({})", rendered.join(", "))
    }

    /// Text printed after the pragma name when pretty-printing the
    /// directive back as source.
    pub fn print_pretty_pragma(&self) -> String {
        match self.spelling {
            Spelling::NoUnroll | Spelling::NoUnrollAndJam => String::new(),
            Spelling::Unroll | Spelling::UnrollAndJam => format!(" {}", self.values_string()),
            Spelling::ClangLoop | Spelling::TemporalBlocking => {
                format!(" {}{}", self.option.name(), self.values_string())
            }
        }
    }

    /// Name identifying this directive in diagnostics.
    pub fn diagnostic_name(&self) -> String {
        let values_if = |option: HintOption| {
            if self.option == option {
                self.values_string()
            } else {
                String::new()
            }
        };
        match self.spelling {
            Spelling::NoUnroll | Spelling::NoUnrollAndJam => self.spelling.pragma_name().to_string(),
            Spelling::Unroll => {
                format!("{}{}", self.spelling.pragma_name(), values_if(HintOption::UnrollCount))
            }
            Spelling::UnrollAndJam => format!(
                "{}{}",
                self.spelling.pragma_name(),
                values_if(HintOption::UnrollAndJamCount)
            ),
            Spelling::TemporalBlocking => {
                format!("{}{}", self.spelling.pragma_name(), values_if(HintOption::TileSize))
            }
            Spelling::ClangLoop => format!("{}{}", self.option.name(), self.values_string()),
        }
    }
}

impl fmt::Display for LoopHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic_name())
    }
}

/// A loop attribute as delivered by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Hint(LoopHint),
    /// OpenCL `__attribute__((opencl_unroll_hint(n)))`.
    OpenClUnroll(u32),
}

impl From<LoopHint> for Directive {
    fn from(hint: LoopHint) -> Self {
        Directive::Hint(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_names_round_trip() {
        for option in HintOption::ALL {
            assert_eq!(HintOption::from_name(option.name()), Some(option));
        }
        assert_eq!(HintOption::from_name("vectorise"), None);
    }

    #[test]
    fn test_values_string() {
        assert_eq!(
            LoopHint::new(HintOption::Vectorize, HintState::AssumeSafety).values_string(),
            "(assume_safety)"
        );
        assert_eq!(
            LoopHint::numeric(HintOption::TileSize, &[32, 16]).values_string(),
            "([32, 16])"
        );
        assert_eq!(
            LoopHint::with_states(HintOption::Scheme, &[HintState::Diamond, HintState::Wavefront])
                .values_string(),
            "(diamond, wavefront)"
        );
    }

    #[test]
    fn test_clang_loop_rendering() {
        let hint = LoopHint::numeric(HintOption::VectorizeWidth, &[4]);
        assert_eq!(hint.print_pretty_pragma(), " vectorize_width([4])");
        assert_eq!(hint.diagnostic_name(), "vectorize_width([4])");
        assert_eq!(hint.to_string(), "vectorize_width([4])");
    }

    #[test]
    fn test_unroll_spellings() {
        let count = LoopHint::numeric(HintOption::UnrollCount, &[8]).spelled(Spelling::Unroll);
        assert_eq!(count.print_pretty_pragma(), " ([8])");
        assert_eq!(count.diagnostic_name(), "#pragma unroll([8])");

        let bare = LoopHint::new(HintOption::Unroll, HintState::Enable).spelled(Spelling::Unroll);
        assert_eq!(bare.diagnostic_name(), "#pragma unroll");

        let never = LoopHint::new(HintOption::Unroll, HintState::Disable).spelled(Spelling::NoUnroll);
        assert_eq!(never.print_pretty_pragma(), "");
        assert_eq!(never.diagnostic_name(), "#pragma nounroll");
    }

    #[test]
    fn test_temporal_blocking_spelling() {
        let tiles =
            LoopHint::numeric(HintOption::TileSize, &[64, 64]).spelled(Spelling::TemporalBlocking);
        assert_eq!(tiles.diagnostic_name(), "#pragma temporal_blocking([64, 64])");

        let radius =
            LoopHint::numeric(HintOption::Radius, &[1]).spelled(Spelling::TemporalBlocking);
        assert_eq!(radius.diagnostic_name(), "#pragma temporal_blocking");
        assert_eq!(radius.print_pretty_pragma(), " radius([1])");
    }
}
