//! Diagnostics for directives that cannot be resolved, and the names they
//! are reported under.

use bumpalo::Bump;
use loopmd::core::{CodeGenOptions, LoopHintError, MetadataContext};
use loopmd::hints::{resolve_directives, Directive, HintOption, HintState, LoopAttributes, LoopHint};
use loopmd::loops::LoopInfoStack;
use loopmd::test_ir::{run, DriverOptions, LoopModule};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_error_messages_name_the_pair() {
    let illegal = LoopHintError::IllegalCombination {
        option: HintOption::UnrollCount,
        state: HintState::Disable,
    };
    assert_eq!(
        illegal.to_string(),
        "loop hint option 'unroll_count' cannot be used with state 'disable'"
    );

    let missing = LoopHintError::MissingState {
        option: HintOption::Distribute,
    };
    assert_eq!(missing.to_string(), "loop hint option 'distribute' has no state");

    let operand = LoopHintError::MissingOperand {
        option: HintOption::TileSize,
    };
    assert_eq!(
        operand.to_string(),
        "loop hint option 'tile_size' requires a numeric operand"
    );

    let conflict = LoopHintError::ConflictingRequest {
        option: HintOption::UnrollCount,
    };
    assert_eq!(
        conflict.to_string(),
        "loop hint option 'unroll_count' conflicts with an explicit disable"
    );
}

#[test]
fn test_resolver_rejects_malformed_directives() {
    let options = CodeGenOptions::default();

    let mut attrs = LoopAttributes::default();
    let stateless: Directive = LoopHint::with_states(HintOption::Unroll, &[]).into();
    assert_eq!(
        resolve_directives(&mut attrs, &options, &[stateless]),
        Err(LoopHintError::MissingState {
            option: HintOption::Unroll
        })
    );

    let mut attrs = LoopAttributes::default();
    let empty: Directive = LoopHint::numeric(HintOption::InterleaveCount, &[]).into();
    assert_eq!(
        resolve_directives(&mut attrs, &options, &[empty]),
        Err(LoopHintError::MissingOperand {
            option: HintOption::InterleaveCount
        })
    );

    let mut attrs = LoopAttributes::default();
    let scheme: Directive = LoopHint::new(HintOption::Distribute, HintState::Wavefront).into();
    assert_eq!(
        resolve_directives(&mut attrs, &options, &[scheme]),
        Err(LoopHintError::IllegalCombination {
            option: HintOption::Distribute,
            state: HintState::Wavefront
        })
    );
}

#[test]
fn test_failed_push_leaves_stack_untouched() {
    init();
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    stack.staged_attributes_mut().unroll_count = 4;
    let bad: Directive = LoopHint::new(HintOption::VectorizeWidth, HintState::Enable).into();
    let err = stack
        .push_with_hints(0u32, &CodeGenOptions::default(), &[bad], None, None)
        .unwrap_err();
    assert!(matches!(err, LoopHintError::IllegalCombination { .. }));

    assert!(!stack.has_info());
    assert!(stack.staged_attributes().is_default());
    drop(stack);
    assert!(ctx.is_empty());
}

#[test]
fn test_driver_reports_fatal_hint() {
    init();
    let module = LoopModule::parse(
        "func f {\n  loop ok {\n    load\n  }\n  #pragma clang loop pipeline(enable)\n  loop broken {\n  }\n}",
    )
    .unwrap();
    let err = run(&module, &DriverOptions::default()).unwrap_err();
    assert_eq!(
        err,
        "fatal error in loop 'broken': loop hint option 'pipeline' cannot be used with state 'enable'"
    );
}

#[test]
fn test_driver_reports_count_on_disabled_unroll() {
    init();
    let module = LoopModule::parse(
        "func f {\n  #pragma nounroll\n  #pragma clang loop unroll_count(4)\n  loop l {\n  }\n}",
    )
    .unwrap();
    let err = run(&module, &DriverOptions::default()).unwrap_err();
    assert_eq!(
        err,
        "fatal error in loop 'l': loop hint option 'unroll_count' conflicts with an explicit disable"
    );
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let err = LoopModule::parse("func f {\n  #pragma clang loop vectorize_width(4)\n  load\n}")
        .unwrap_err();
    assert!(err.starts_with("line 3"), "{err}");
    assert!(err.contains("pragma is not followed by a loop"), "{err}");

    let err = LoopModule::parse("func f {\n  loop a {\n  }\n  loop a {\n  }\n}").unwrap_err();
    assert!(err.starts_with("line 4"), "{err}");

    let err = LoopModule::parse("func f {\n  #pragma clang loop vectorize(sometimes)\n  loop a {\n  }\n}")
        .unwrap_err();
    assert!(err.contains("unknown state 'sometimes'"), "{err}");
}
