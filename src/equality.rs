//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Symbol-table-independent equality.
//!
//! Two encodings of the same value need not share a symbol table layout: one
//! might intern `foo` at index 0, the other at index 3, or not intern it at
//! all if it only appears once as a short string. Equality therefore never
//! compares raw bytes or symbol indices directly — it compares decoded
//! content, lockstep, down both trees. The identical-byte-buffer case is
//! checked first since it's the overwhelmingly common case for any index
//! backed by exact duplicate storage and lets most comparisons skip the walk
//! entirely.

use crate::cursor::{Cursor, Document, ElementView};
use crate::error::Result;

/// Compares two complete binary documents for semantic equality.
pub fn equal(a_bytes: &[u8], b_bytes: &[u8]) -> Result<bool> {
    if a_bytes == b_bytes {
        return Ok(true);
    }
    let (_doc_a, cursor_a) = Document::parse(a_bytes)?;
    let (_doc_b, cursor_b) = Document::parse(b_bytes)?;
    equal_cursors(&cursor_a, &cursor_b)
}

/// Lockstep comparison of two elements, each carrying its own (possibly
/// differently laid out) symbol table.
pub fn equal_cursors(a: &Cursor, b: &Cursor) -> Result<bool> {
    let (view_a, _) = a.read_element()?;
    let (view_b, _) = b.read_element()?;
    match (view_a, view_b) {
        (ElementView::Nil, ElementView::Nil) => Ok(true),
        (ElementView::Integer(x), ElementView::Integer(y)) => Ok(x == y),
        (ElementView::Float(x), ElementView::Float(y)) => {
            Ok(crate::hash::normalize_float(x) == crate::hash::normalize_float(y))
        }
        (ElementView::Symbol(x), ElementView::Symbol(y)) => Ok(x == y),
        (ElementView::String(x), ElementView::String(y)) => Ok(x == y),
        (ElementView::List(lx), ElementView::List(ly)) => {
            if lx.count() != ly.count() {
                return Ok(false);
            }
            // A structural-hash mismatch between two large lists is a sound
            // early reject; it is never used to conclude equality.
            if let (Some(hx), Some(hy)) = (lx.structural_hash_hint(), ly.structural_hash_hint()) {
                if hx != hy {
                    return Ok(false);
                }
            }
            for i in 0..lx.count() {
                let child_a = lx.child(i)?.expect("within bounds");
                let child_b = ly.child(i)?.expect("within bounds");
                if !equal_cursors(&child_a, &child_b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::encode;
    use crate::value::Value;

    #[test]
    fn test_equal_identical_bytes_fast_path() {
        let bytes = encode(&Value::list(vec![Value::Integer(1), Value::Integer(2)]));
        assert!(equal(&bytes, &bytes).unwrap());
    }

    #[test]
    fn test_equal_across_different_symbol_tables() {
        // `b` appears once in each document but the two documents differ in
        // the rest of their symbol content, so their tables are laid out
        // differently even though the values compared are equal.
        let a = encode(&Value::list(vec![
            Value::symbol(&b"shared"[..]),
            Value::symbol(&b"only_in_a"[..]),
        ]));
        let b = encode(&Value::list(vec![
            Value::symbol(&b"only_in_b"[..]),
            Value::symbol(&b"shared"[..]),
        ]));
        let (_doc_a, cursor_a) = Document::parse(&a).unwrap();
        let (_doc_b, cursor_b) = Document::parse(&b).unwrap();
        let child_a = cursor_a.child_bounds(0).unwrap().unwrap();
        let child_b = cursor_b.child_bounds(1).unwrap().unwrap();
        assert!(equal_cursors(&child_a, &child_b).unwrap());
    }

    #[test]
    fn test_not_equal_different_lengths() {
        let a = encode(&Value::list(vec![Value::Integer(1)]));
        let b = encode(&Value::list(vec![Value::Integer(1), Value::Integer(2)]));
        assert!(!equal(&a, &b).unwrap());
    }

    #[test]
    fn test_negative_zero_equal_to_zero() {
        let a = encode(&Value::float(-0.0));
        let b = encode(&Value::float(0.0));
        assert!(equal(&a, &b).unwrap());
    }
}
