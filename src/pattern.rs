//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Pattern matching.
//!
//! A pattern is an ordinary S-expression with a few symbols given special
//! meaning when they appear where a list expects an element:
//!
//! - `_` matches any single element and binds nothing.
//! - `_*` matches zero or more trailing elements and binds nothing; it must
//!   be the last element of its enclosing pattern list.
//! - `?name` matches any single element and binds it to `name`.
//! - `??name` matches zero or more trailing elements and binds the matched
//!   slice to `name`; it must be the last element of its enclosing pattern
//!   list.
//! - Anything else is a literal, matched by the same rules as
//!   [`crate::equality`].
//!
//! Matching is fully positional: a non-rest pattern element lines up with the
//! expression's element at the same index, and a pattern list without a rest
//! element requires an exact length match.

use std::collections::HashMap;

use crate::builder;
use crate::cursor::{Cursor, Document, ElementView};
use crate::error::{Error, Result};
use crate::value::Value;

/// A single capture's bound value(s): one value for `?name`, a slice of
/// zero or more for `??name`.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    One(Value),
    Rest(Vec<Value>),
}

pub type Bindings = HashMap<Vec<u8>, Binding>;

#[derive(Clone, Debug)]
enum PatternNode {
    Wildcard,
    RestWildcard,
    Capture(Vec<u8>),
    CaptureRest(Vec<u8>),
    Literal(Value),
    List(Vec<PatternNode>),
}

fn compile(pattern: &Value) -> Result<PatternNode> {
    match pattern {
        Value::Symbol(text) => Ok(match text.as_slice() {
            b"_" => PatternNode::Wildcard,
            b"_*" => PatternNode::RestWildcard,
            _ if text.starts_with(b"??") => PatternNode::CaptureRest(text[2..].to_vec()),
            _ if text.starts_with(b"?") => PatternNode::Capture(text[1..].to_vec()),
            _ => PatternNode::Literal(pattern.clone()),
        }),
        Value::List(children) => {
            let mut nodes = Vec::with_capacity(children.len());
            for (i, child) in children.iter().enumerate() {
                let node = compile(child)?;
                let is_rest = matches!(node, PatternNode::RestWildcard | PatternNode::CaptureRest(_));
                if is_rest && i + 1 != children.len() {
                    return Err(Error::Message(
                        "rest wildcard must be the last element of its pattern list".to_string(),
                    ));
                }
                nodes.push(node);
            }
            Ok(PatternNode::List(nodes))
        }
        other => Ok(PatternNode::Literal(other.clone())),
    }
}

fn match_node(expr: &Value, pattern: &PatternNode, bindings: &mut Bindings) -> bool {
    match pattern {
        PatternNode::Wildcard | PatternNode::RestWildcard => true,
        PatternNode::Capture(name) => {
            bindings.insert(name.clone(), Binding::One(expr.clone()));
            true
        }
        PatternNode::CaptureRest(name) => {
            bindings.insert(name.clone(), Binding::Rest(vec![expr.clone()]));
            true
        }
        PatternNode::Literal(value) => value == expr,
        PatternNode::List(nodes) => match_list(expr.children(), expr.is_list(), nodes, bindings),
    }
}

fn match_list(
    expr_children: &[Value],
    expr_is_list: bool,
    nodes: &[PatternNode],
    bindings: &mut Bindings,
) -> bool {
    if !expr_is_list {
        return false;
    }
    for (i, node) in nodes.iter().enumerate() {
        match node {
            PatternNode::RestWildcard => return true,
            PatternNode::CaptureRest(name) => {
                let rest = expr_children.get(i..).unwrap_or(&[]).to_vec();
                bindings.insert(name.clone(), Binding::Rest(rest));
                return true;
            }
            _ => {
                let child = match expr_children.get(i) {
                    Some(c) => c,
                    None => return false,
                };
                if !match_node(child, node, bindings) {
                    return false;
                }
            }
        }
    }
    expr_children.len() == nodes.len()
}

/// Matches `expr` against `pattern`, returning the captured bindings on
/// success.
pub fn match_value(expr: &Value, pattern: &Value) -> Result<Option<Bindings>> {
    let compiled = compile(pattern)?;
    let mut bindings = Bindings::new();
    if match_node(expr, &compiled, &mut bindings) {
        Ok(Some(bindings))
    } else {
        Ok(None)
    }
}

/// Matches two complete binary documents.
pub fn matches(expr_bytes: &[u8], pattern_bytes: &[u8]) -> Result<Option<Bindings>> {
    let expr = builder::decode(expr_bytes)?;
    let pattern = builder::decode(pattern_bytes)?;
    match_value(&expr, &pattern)
}

/// Depth-first search (self, then children, left to right) for the first
/// subtree of `expr_bytes` matching `pattern_bytes`. Returns the matched
/// subtree as a standalone binary value (built via the header-reuse fast
/// path) alongside its bindings.
pub fn find_first(expr_bytes: &[u8], pattern_bytes: &[u8]) -> Result<Option<(Vec<u8>, Bindings)>> {
    let pattern = builder::decode(pattern_bytes)?;
    let compiled = compile(&pattern)?;
    let (doc, cursor) = Document::parse(expr_bytes)?;
    find_first_cursor(&doc, &cursor, &compiled)
}

fn find_first_cursor(
    doc: &Document,
    cursor: &Cursor,
    pattern: &PatternNode,
) -> Result<Option<(Vec<u8>, Bindings)>> {
    let value = decode_subtree(cursor)?;
    let mut bindings = Bindings::new();
    if match_node(&value, pattern, &mut bindings) {
        let len = cursor.skip_element()?;
        let bytes = builder::extract_child(doc, &cursor.bytes()[..len]);
        return Ok(Some((bytes, bindings)));
    }
    if let ElementView::List(list) = cursor.read_element()?.0 {
        for i in 0..list.count() {
            let child = list.child(i)?.expect("within bounds");
            if let Some(found) = find_first_cursor(doc, &child, pattern)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

fn decode_subtree(cursor: &Cursor) -> Result<Value> {
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(Value::Nil),
        ElementView::Integer(n) => Ok(Value::Integer(n)),
        ElementView::Float(f) => Ok(Value::float(f)),
        ElementView::Symbol(text) => Ok(Value::symbol(text.to_vec())),
        ElementView::String(content) => Ok(Value::string(content.to_vec())),
        ElementView::List(list) => {
            let mut children = Vec::with_capacity(list.count());
            for i in 0..list.count() {
                let child = list.child(i)?.expect("within bounds");
                children.push(decode_subtree(&child)?);
            }
            Ok(Value::list(children))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::encode;

    fn sym(s: &str) -> Value {
        Value::symbol(s.as_bytes())
    }

    #[test]
    fn test_wildcard_and_literal() {
        let expr = Value::list(vec![sym("+"), Value::Integer(1), Value::Integer(2)]);
        let pattern = Value::list(vec![sym("+"), sym("_"), sym("_")]);
        assert!(match_value(&expr, &pattern).unwrap().is_some());
    }

    #[test]
    fn test_rest_wildcard_matches_variable_arity() {
        let expr = Value::list(vec![sym("+"), Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        let pattern = Value::list(vec![sym("+"), sym("_*")]);
        assert!(match_value(&expr, &pattern).unwrap().is_some());
    }

    #[test]
    fn test_capture_binds_value() {
        let expr = Value::list(vec![sym("point"), Value::Integer(3), Value::Integer(4)]);
        let pattern = Value::list(vec![sym("point"), sym("?x"), sym("?y")]);
        let bindings = match_value(&expr, &pattern).unwrap().unwrap();
        assert_eq!(bindings.get(&b"x"[..].to_vec()), Some(&Binding::One(Value::Integer(3))));
        assert_eq!(bindings.get(&b"y"[..].to_vec()), Some(&Binding::One(Value::Integer(4))));
    }

    #[test]
    fn test_capture_rest_binds_slice() {
        let expr = Value::list(vec![sym("+"), Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        let pattern = Value::list(vec![sym("+"), sym("??rest")]);
        let bindings = match_value(&expr, &pattern).unwrap().unwrap();
        assert_eq!(
            bindings.get(&b"rest"[..].to_vec()),
            Some(&Binding::Rest(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ]))
        );
    }

    #[test]
    fn test_non_last_rest_wildcard_rejected() {
        let pattern = Value::list(vec![sym("_*"), sym("tail")]);
        assert!(compile(&pattern).is_err());
    }

    #[test]
    fn test_find_first_descends_into_subtree() {
        let expr = Value::list(vec![
            sym("user"),
            Value::list(vec![sym("age"), Value::Integer(30)]),
        ]);
        let pattern = Value::list(vec![sym("age"), sym("?n")]);
        let bytes = encode(&expr);
        let pat_bytes = encode(&pattern);
        let (found, bindings) = find_first(&bytes, &pat_bytes).unwrap().unwrap();
        assert_eq!(
            builder::decode(&found).unwrap(),
            Value::list(vec![sym("age"), Value::Integer(30)])
        );
        assert_eq!(bindings.get(&b"n"[..].to_vec()), Some(&Binding::One(Value::Integer(30))));
    }
}
