//! TIR (Test IR) parser implementation.

use super::*;
use crate::hints::{HintOption, HintState, LoopHint, Spelling};
use std::collections::HashSet;

pub fn parse_module(text: &str) -> Result<LoopModule, String> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    /// Non-empty lines with comments stripped, with their 1-based number.
    lines: Vec<(usize, &'a str)>,
    pos: usize,

    // Per-function block names
    headers: HashSet<&'a str>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let code = match line.find(';') {
                    Some(comment) => &line[..comment],
                    None => line,
                };
                let code = code.trim();
                (!code.is_empty()).then_some((idx + 1, code))
            })
            .collect();
        Self {
            lines,
            pos: 0,
            headers: HashSet::new(),
        }
    }

    fn parse(mut self) -> Result<LoopModule, String> {
        let mut functions = Vec::new();
        while let Some(&(line_no, line)) = self.lines.get(self.pos) {
            self.pos += 1;
            let func = self.parse_function(line_no, line)?;
            functions.push(func);
        }
        Ok(LoopModule { functions })
    }

    fn parse_function(&mut self, line_no: usize, line: &'a str) -> Result<Function, String> {
        let name = keyword(line, "func")
            .and_then(|rest| rest.strip_suffix('{'))
            .map(str::trim)
            .ok_or_else(|| format!("line {line_no}: expected 'func <name> {{' but found '{line}'"))?;
        if !is_identifier(name) {
            return Err(format!("line {line_no}: invalid function name '{name}'"));
        }

        self.headers.clear();
        let body = self.parse_body()?;
        Ok(Function {
            name: name.to_string(),
            body,
        })
    }

    /// Statements up to and including the closing brace.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, String> {
        let mut body = Vec::new();
        let mut pending: Vec<Directive> = Vec::new();

        loop {
            let Some(&(line_no, line)) = self.lines.get(self.pos) else {
                return Err("unexpected end of input, missing '}'".to_string());
            };
            self.pos += 1;
            let at = |e: String| format!("line {line_no}: {e}");

            if line == "}" {
                if !pending.is_empty() {
                    return Err(at("pragma is not followed by a loop".to_string()));
                }
                return Ok(body);
            }

            if let Some(pragma) = keyword(line, "#pragma") {
                pending.extend(parse_pragma(pragma.trim()).map_err(at)?);
                continue;
            }

            if keyword(line, "loop").is_some() {
                let mut lp = self.parse_loop_header(line).map_err(at)?;
                lp.directives = std::mem::take(&mut pending);
                lp.body = self.parse_body()?;
                body.push(Stmt::Loop(lp));
                continue;
            }

            if !pending.is_empty() {
                return Err(at("pragma is not followed by a loop".to_string()));
            }
            let op = Opcode::from_str(line).ok_or_else(|| at(format!("unknown instruction '{line}'")))?;
            body.push(Stmt::Inst(op));
        }
    }

    /// `loop <name> [@ l:c [- l:c]] {`
    fn parse_loop_header(&mut self, line: &'a str) -> Result<LoopStmt, String> {
        let inner = keyword(line, "loop")
            .and_then(|rest| rest.strip_suffix('{'))
            .ok_or_else(|| format!("expected 'loop <name> {{' but found '{line}'"))?;
        let mut tokens = inner.split_whitespace();

        let header = tokens.next().ok_or("loop is missing a header name")?;
        if !is_identifier(header) {
            return Err(format!("invalid loop header name '{header}'"));
        }
        if !self.headers.insert(header) {
            return Err(format!("duplicate loop header '{header}'"));
        }

        let mut start_loc = None;
        let mut end_loc = None;
        if let Some(at) = tokens.next() {
            if at != "@" {
                return Err(format!("expected '@' but found '{at}'"));
            }
            start_loc = Some(parse_loc(tokens.next().ok_or("missing start location")?)?);
            if let Some(dash) = tokens.next() {
                if dash != "-" {
                    return Err(format!("expected '-' but found '{dash}'"));
                }
                end_loc = Some(parse_loc(tokens.next().ok_or("missing end location")?)?);
            }
        }
        if let Some(extra) = tokens.next() {
            return Err(format!("unexpected '{extra}' in loop header"));
        }

        Ok(LoopStmt {
            header: header.to_string(),
            start_loc,
            end_loc,
            directives: Vec::new(),
            body: Vec::new(),
        })
    }
}

/// The rest of `line` if it starts with `word` followed by whitespace.
fn keyword<'l>(line: &'l str, word: &str) -> Option<&'l str> {
    let (head, rest) = line.split_once(char::is_whitespace)?;
    (head == word).then_some(rest)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(ch) if ch.is_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|_| format!("invalid number '{s}'"))
}

fn parse_loc(s: &str) -> Result<SourceLoc, String> {
    let (line, column) = s
        .split_once(':')
        .ok_or_else(|| format!("expected 'line:column' but found '{s}'"))?;
    Ok(SourceLoc::new(parse_number(line)?, parse_number(column)?))
}

/// Text after `#pragma`.
fn parse_pragma(text: &str) -> Result<Vec<Directive>, String> {
    let (name, rest) = match text.find(|ch: char| ch.is_whitespace() || ch == '(') {
        Some(split) => (&text[..split], text[split..].trim()),
        None => (text, ""),
    };

    match name {
        "clang" => {
            let args = rest
                .strip_prefix("loop")
                .ok_or_else(|| format!("expected 'clang loop' but found 'clang {rest}'"))?;
            parse_option_list(args, Spelling::ClangLoop)
        }
        "temporal_blocking" => parse_option_list(rest, Spelling::TemporalBlocking),
        "unroll" => Ok(vec![count_or_enable(
            rest,
            HintOption::Unroll,
            HintOption::UnrollCount,
            Spelling::Unroll,
        )?]),
        "unroll_and_jam" => Ok(vec![count_or_enable(
            rest,
            HintOption::UnrollAndJam,
            HintOption::UnrollAndJamCount,
            Spelling::UnrollAndJam,
        )?]),
        "nounroll" if rest.is_empty() => Ok(vec![LoopHint::new(
            HintOption::Unroll,
            HintState::Disable,
        )
        .spelled(Spelling::NoUnroll)
        .into()]),
        "nounroll_and_jam" if rest.is_empty() => Ok(vec![LoopHint::new(
            HintOption::UnrollAndJam,
            HintState::Disable,
        )
        .spelled(Spelling::NoUnrollAndJam)
        .into()]),
        "opencl_unroll_hint" => {
            let value = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(|| format!("expected 'opencl_unroll_hint(N)' but found '{text}'"))?;
            Ok(vec![Directive::OpenClUnroll(parse_number(value)?)])
        }
        _ => Err(format!("unsupported pragma '{text}'")),
    }
}

/// `#pragma unroll`, `#pragma unroll N` or `#pragma unroll(N)`.
fn count_or_enable(
    rest: &str,
    enable: HintOption,
    count: HintOption,
    spelling: Spelling,
) -> Result<Directive, String> {
    if rest.is_empty() {
        return Ok(LoopHint::new(enable, HintState::Enable).spelled(spelling).into());
    }
    let value = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(rest);
    Ok(LoopHint::numeric(count, &[parse_number(value)?])
        .spelled(spelling)
        .into())
}

/// Sequence of `option(arg, ...)` items.
fn parse_option_list(text: &str, spelling: Spelling) -> Result<Vec<Directive>, String> {
    let mut directives: Vec<Directive> = Vec::new();
    let mut rest = text.trim();

    if rest.is_empty() {
        return Err(format!("{} requires at least one option", spelling.pragma_name()));
    }

    while !rest.is_empty() {
        let open = rest
            .find('(')
            .ok_or_else(|| format!("expected 'option(...)' but found '{rest}'"))?;
        let close = rest[open..]
            .find(')')
            .map(|idx| open + idx)
            .ok_or_else(|| format!("unterminated argument list in '{rest}'"))?;

        let name = rest[..open].trim();
        let option =
            HintOption::from_name(name).ok_or_else(|| format!("unknown loop hint option '{name}'"))?;
        let hint = parse_arguments(option, &rest[open + 1..close])?;
        directives.push(hint.spelled(spelling).into());

        rest = rest[close + 1..].trim_start();
    }

    Ok(directives)
}

/// Either keyword states or numeric operands; mixing both is an error.
fn parse_arguments(option: HintOption, args: &str) -> Result<LoopHint, String> {
    let items: Vec<&str> = args
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(LoopHint::with_states(option, &[]));
    }

    if items[0].starts_with(|ch: char| ch.is_ascii_digit()) {
        let values = items
            .iter()
            .map(|item| parse_number(item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(LoopHint::numeric(option, &values));
    }

    let states = items
        .iter()
        .map(|item| {
            HintState::from_keyword(item)
                .ok_or_else(|| format!("unknown state '{item}' for option '{option}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LoopHint::with_states(option, &states))
}
