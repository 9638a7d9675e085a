//! FileCheck-style tests for TIR files
//!
//! This test suite validates TIR files against their CHECK directives,
//! similar to how LLVM's FileCheck works but implemented in Rust.

use loopmd::test_ir::{CheckDirective, TestRunner, TestSpec};
use std::fs;
use std::path::{Path, PathBuf};

fn filetest_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/filetest")
}

/// Test helper that runs a TIR file through FileCheck validation
fn run_filecheck_test(tir_file: &str) {
    let _ = env_logger::builder().is_test(true).try_init();

    let path = filetest_dir().join(tir_file);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    let spec = TestSpec::parse(&contents)
        .unwrap_or_else(|e| panic!("Failed to parse test spec from {}: {}", tir_file, e));

    let runner = TestRunner::new(false);
    runner
        .run_test(&spec)
        .unwrap_or_else(|e| panic!("Test {} failed: {}", tir_file, e));
}

#[test]
fn test_vectorize_filecheck() {
    run_filecheck_test("vectorize.tir");
}

#[test]
fn test_parallel_nest_filecheck() {
    run_filecheck_test("parallel_nest.tir");
}

#[test]
fn test_unroll_and_jam_filecheck() {
    run_filecheck_test("unroll_and_jam.tir");
}

#[test]
fn test_distribute_followup_filecheck() {
    run_filecheck_test("distribute_followup.tir");
}

#[test]
fn test_temporal_blocking_filecheck() {
    run_filecheck_test("temporal_blocking.tir");
}

#[test]
fn test_pipeline_filecheck() {
    run_filecheck_test("pipeline.tir");
}

#[test]
fn test_no_unroll_loops_filecheck() {
    run_filecheck_test("no_unroll_loops.tir");
}

#[test]
fn test_opencl_unroll_filecheck() {
    run_filecheck_test("opencl_unroll.tir");
}

#[test]
fn test_print_ir_filecheck() {
    run_filecheck_test("print_ir.tir");
}

#[test]
fn test_illegal_hint_filecheck() {
    run_filecheck_test("illegal_hint.tir");
}

/// Every .tir file in the directory must carry a RUN line and pass.
#[test]
fn test_all_filetests_pass() {
    let mut files: Vec<PathBuf> = fs::read_dir(filetest_dir())
        .expect("filetest directory")
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("tir"))
        .collect();
    files.sort();
    assert!(!files.is_empty());

    let mut failures = Vec::new();
    for path in &files {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let outcome = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| TestSpec::parse(&contents))
            .and_then(|spec| TestRunner::new(false).run_test(&spec));
        if let Err(e) = outcome {
            failures.push(format!("{name}: {e}"));
        }
    }
    assert!(failures.is_empty(), "failing filetests:\n{}", failures.join("\n"));
}

#[cfg(test)]
mod filecheck_internals {
    use super::*;

    #[test]
    fn test_check_directive_parsing() {
        let content = r#"; RUN: %loopmd --print-ir %s
; CHECK: foo
; CHECK-LABEL: bar
; CHECK-NEXT: baz
; CHECK-EMPTY
; COM: comment
func f {
}"#;

        let spec = TestSpec::parse(content).unwrap();
        assert_eq!(spec.check_directives.len(), 5);

        match &spec.check_directives[0] {
            CheckDirective::Check(s) => assert_eq!(s, "foo"),
            _ => panic!("Expected Check directive"),
        }

        match &spec.check_directives[1] {
            CheckDirective::CheckLabel(s) => assert_eq!(s, "bar"),
            _ => panic!("Expected CheckLabel directive"),
        }
    }

    #[test]
    fn test_verbose_runner() {
        let runner = TestRunner::new(true);
        let output = "Line 1\nLine 2\nLine 3\n";
        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 2".to_string()),
        ];

        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_unexpected_success_is_reported() {
        let spec = TestSpec::parse("; RUN: not %loopmd %s\nfunc f {\n  loop l {\n  }\n}").unwrap();
        let err = TestRunner::new(false).run_test(&spec).unwrap_err();
        assert!(err.contains("expected to fail"), "{err}");
    }

    #[test]
    fn test_missing_run_line_is_reported() {
        let spec = TestSpec::parse("; CHECK: entry:\nfunc f {\n}").unwrap();
        assert!(TestRunner::new(false).run_test(&spec).is_err());
    }
}
