//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A small recursive-descent parser for the textual grammar, using `nom`
//! primitives for leaf tokenization. Recursion depth is threaded explicitly
//! through every call rather than left to the call stack alone, so
//! `tunables::MAX_DEPTH` is enforced as a data-driven limit, not an
//! incidental stack-overflow guard.
//!
//! Grammar, informally:
//!
//! ```text
//! value    := nil | list | string | atom
//! nil      := "nil" | "(" ws ")"
//! list     := "(" ws (value ws)* ")"
//! string   := '"' (escape | [^"\\])* '"'
//! atom     := symbol-chars+          ; numbers are symbol-chars that parse as such
//! comment  := ";" [^\n]*
//! ws       := (whitespace | comment)*
//! ```

use nom::bytes::complete::take_while1;
use nom::IResult;

use crate::error::{Error, Result};
use crate::tunables;
use crate::value::Value;

/// Parses a single complete value from `input`, rejecting any trailing
/// non-whitespace content.
pub fn parse(input: &str) -> Result<Value> {
    let trimmed = skip_ws(input);
    if trimmed.is_empty() {
        return Err(Error::EmptyInput);
    }
    let (value, rest) = parse_value(trimmed, 0)?;
    if !skip_ws(rest).is_empty() {
        return Err(Error::TrailingGarbage);
    }
    Ok(value)
}

/// Skips whitespace and `;`-to-end-of-line comments.
fn skip_ws(input: &str) -> &str {
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        match trimmed.strip_prefix(';') {
            Some(after_semicolon) => {
                rest = match after_semicolon.find('\n') {
                    Some(newline) => &after_semicolon[newline + 1..],
                    None => "",
                };
            }
            None => return trimmed,
        }
    }
}

fn parse_value(input: &str, depth: usize) -> Result<(Value, &str)> {
    if depth >= tunables::MAX_DEPTH {
        return Err(Error::MaxDepthExceeded);
    }
    let input = skip_ws(input);
    match input.chars().next() {
        None => Err(Error::EmptyInput),
        Some('(') => parse_list(&input[1..], depth + 1),
        Some(')') => Err(Error::EmptyAtom),
        Some('"') => parse_string(&input[1..]),
        _ => parse_atom(input),
    }
}

fn parse_list(input: &str, depth: usize) -> Result<(Value, &str)> {
    let mut children = Vec::new();
    let mut rest = skip_ws(input);
    loop {
        if let Some(after_close) = rest.strip_prefix(')') {
            return Ok((Value::list(children), after_close));
        }
        if rest.is_empty() {
            return Err(Error::UnterminatedList);
        }
        let (child, next) = parse_value(rest, depth)?;
        children.push(child);
        rest = skip_ws(next);
    }
}

fn parse_string(input: &str) -> Result<(Value, &str)> {
    let bytes = input.as_bytes();
    let mut content = Vec::new();
    let mut i = 0usize;
    loop {
        if i >= bytes.len() {
            return Err(Error::UnterminatedString);
        }
        match bytes[i] {
            b'"' => return Ok((Value::string(content), &input[i + 1..])),
            b'\\' => {
                i += 1;
                let escaped = *bytes.get(i).ok_or(Error::UnterminatedString)?;
                content.push(match escaped {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'"' => b'"',
                    b'\\' => b'\\',
                    other => other,
                });
                i += 1;
            }
            other => {
                content.push(other);
                i += 1;
            }
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '"' && c != ';'
}

fn parse_atom(input: &str) -> Result<(Value, &str)> {
    let result: IResult<&str, &str> = take_while1(is_symbol_char)(input);
    match result {
        Ok((rest, token)) if !token.is_empty() => Ok((atom_from_token(token), rest)),
        _ => Err(Error::EmptyAtom),
    }
}

fn atom_from_token(token: &str) -> Value {
    if token == "nil" {
        return Value::Nil;
    }
    if let Ok(n) = token.parse::<i64>() {
        return Value::Integer(n);
    }
    if token.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = token.parse::<f64>() {
            return Value::float(f);
        }
    }
    Value::symbol(token.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Value {
        Value::symbol(s.as_bytes())
    }

    #[test]
    fn test_parse_nil_variants() {
        assert_eq!(parse("nil").unwrap(), Value::Nil);
        assert_eq!(parse("()").unwrap(), Value::Nil);
        assert_eq!(parse("(  )").unwrap(), Value::Nil);
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(parse("42").unwrap(), Value::Integer(42));
        assert_eq!(parse("-17").unwrap(), Value::Integer(-17));
        assert_eq!(parse("3.5").unwrap(), Value::float(3.5));
        assert_eq!(parse("hello").unwrap(), sym("hello"));
        assert_eq!(parse("+").unwrap(), sym("+"));
    }

    #[test]
    fn test_parse_string_with_escapes() {
        let v = parse(r#""a\"b\nc""#).unwrap();
        assert_eq!(v, Value::string(b"a\"b\nc".to_vec()));
    }

    #[test]
    fn test_parse_nested_list() {
        let v = parse("(user (name \"alice\") (age 30))").unwrap();
        assert_eq!(
            v,
            Value::list(vec![
                sym("user"),
                Value::list(vec![sym("name"), Value::string(&b"alice"[..])]),
                Value::list(vec![sym("age"), Value::Integer(30)]),
            ])
        );
    }

    #[test]
    fn test_parse_comment_is_whitespace() {
        let v = parse("(a ; a trailing comment\n b)").unwrap();
        assert_eq!(v, Value::list(vec![sym("a"), sym("b")]));
    }

    #[test]
    fn test_unterminated_list_rejected() {
        assert_eq!(parse("(a b"), Err(Error::UnterminatedList));
    }

    #[test]
    fn test_unterminated_string_rejected() {
        assert_eq!(parse("\"abc"), Err(Error::UnterminatedString));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert_eq!(parse("a b"), Err(Error::TrailingGarbage));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(parse(""), Err(Error::EmptyInput));
        assert_eq!(parse("   "), Err(Error::EmptyInput));
    }

    #[test]
    fn test_max_depth_exceeded() {
        let mut text = String::new();
        for _ in 0..(tunables::MAX_DEPTH + 10) {
            text.push('(');
        }
        text.push('a');
        for _ in 0..(tunables::MAX_DEPTH + 10) {
            text.push(')');
        }
        assert_eq!(parse(&text), Err(Error::MaxDepthExceeded));
    }

    #[test]
    fn test_max_depth_boundary() {
        let nested = |depth: usize| {
            let mut text = String::new();
            for _ in 0..depth {
                text.push('(');
            }
            text.push('a');
            for _ in 0..depth {
                text.push(')');
            }
            text
        };

        assert!(parse(&nested(tunables::MAX_DEPTH - 1)).is_ok());
        assert_eq!(parse(&nested(tunables::MAX_DEPTH)), Err(Error::MaxDepthExceeded));
    }
}
