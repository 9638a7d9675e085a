//! FileCheck-style test validation for TIR files.
//!
//! This module parses RUN and CHECK directives from TIR files and validates
//! the driver's output against them, similar to LLVM's FileCheck tool but
//! implemented in a Rust-native way. A RUN line starting with `not` expects
//! the driver to fail; its CHECK directives then apply to the error text.

use super::{lower, DriverOptions, LoopModule};

/// A CHECK directive extracted from a TIR file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match pattern on this or a later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-NOT: pattern - Pattern absent up to the next match
    CheckNot(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to execute the test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
    /// `; RUN: not ...`
    pub expect_failure: bool,
}

/// Test specification extracted from a TIR file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub tir_content: String,
}

impl TestSpec {
    /// Parse a TIR file to extract test specifications
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut tir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let mut parts: Vec<&str> = run_cmd.split_whitespace().collect();
                let expect_failure = parts.first() == Some(&"not");
                if expect_failure {
                    parts.remove(0);
                }
                let Some((command, args)) = parts.split_first() else {
                    return Err(format!("empty RUN directive: '{trimmed}'"));
                };
                run_directives.push(RunDirective {
                    command: command.to_string(),
                    args: args.iter().map(|s| s.to_string()).collect(),
                    expect_failure,
                });
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NOT:") {
                check_directives.push(CheckDirective::CheckNot(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                // Regular TIR content
                tir_lines.push(line);
            }
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            tir_content: tir_lines.join("\n"),
        })
    }
}

/// Test runner that executes TIR tests
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a TIR test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        if spec.run_directives.is_empty() {
            return Err("test has no RUN directive".to_string());
        }

        let module = LoopModule::parse(&spec.tir_content)?;

        for run_dir in &spec.run_directives {
            let output = self.execute_command(&module, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Execute a test command and return the text to check
    fn execute_command(&self, module: &LoopModule, run_dir: &RunDirective) -> Result<String, String> {
        let options = DriverOptions::from_args(&run_dir.args)?;
        if self.verbose {
            println!("RUN: {} {:?}", run_dir.command, options);
        }

        match (lower::run(module, &options), run_dir.expect_failure) {
            (Ok(output), false) => Ok(output),
            (Err(error), true) => Ok(error),
            (Ok(_), true) => Err(format!("RUN: '{}' was expected to fail", run_dir.command)),
            (Err(error), false) => Err(format!("RUN: '{}' failed: {error}", run_dir.command)),
        }
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;
        let mut pending_not: Vec<&str> = Vec::new();

        // CHECK-NOT patterns must be absent from the lines skipped before
        // the next match.
        let check_absent = |pending: &mut Vec<&str>, from: usize, to: usize| {
            for pattern in pending.drain(..) {
                let hit = output_lines[from..to].iter().position(|line| line.contains(pattern));
                if let Some(idx) = hit {
                    return Err(format!(
                        "CHECK-NOT: pattern '{}' found at line {}: '{}'",
                        pattern,
                        from + idx,
                        output_lines[from + idx]
                    ));
                }
            }
            Ok(())
        };

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => pending_not.push(pattern),

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    match found {
                        Some(idx) => {
                            check_absent(&mut pending_not, line_idx, line_idx + idx)?;
                            line_idx += idx + 1; // Move to the next line after the match
                            if self.verbose {
                                println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                            }
                        }
                        None => {
                            let kind = match directive {
                                CheckDirective::CheckLabel(_) => "CHECK-LABEL",
                                _ => "CHECK",
                            };
                            return Err(format!("{kind}: pattern '{pattern}' not found in output"));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    check_absent(&mut pending_not, line_idx, line_idx)?;
                    if line_idx >= output_lines.len() {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    }

                    let line = output_lines[line_idx];
                    if !line.contains(pattern.as_str()) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    if line_idx >= output_lines.len() {
                        continue; // End of output counts as empty
                    }

                    let line = output_lines[line_idx];
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-EMPTY: matches at line {}", line_idx);
                    }
                    line_idx += 1;
                }
            }
        }

        check_absent(&mut pending_not, line_idx, output_lines.len())
    }
}
