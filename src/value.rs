//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The S-expression object model.
//!
//! A value is one of:
//!
//! 1. NIL — the empty list.
//! 2. Symbol — an interned identifier.
//! 3. String — an arbitrary byte sequence.
//! 4. Integer — a 64-bit signed integer (small-int is an encoding detail, not
//!    a separate semantic kind).
//! 5. Float — an IEEE-754 binary64, `-0.0` normalized to `+0.0`.
//! 6. List — an ordered sequence of one or more child values.
//!
//! This is the owned, allocated representation used for construction, as the
//! result of the text parser, and wherever an operation chooses to fully
//! materialize a result rather than return a binary sub-slice. The binary wire
//! format (`layout`, `cursor`, `builder`) is the thing actually stored and
//! queried; `Value` is the ergonomic tree callers build and match against.

use ordered_float::OrderedFloat;

use crate::hash;

/// Represents any valid S-expression value.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Value {
    /// The empty list.
    Nil,
    /// An interned identifier; compared and hashed by its text, never by table
    /// index, so symbol-table layout never affects semantics.
    Symbol(Vec<u8>),
    /// An arbitrary byte sequence.
    String(Vec<u8>),
    /// A 64-bit signed integer. Values in -16..=15 are encoded compactly on
    /// the wire but are the same semantic kind as any other integer.
    Integer(i64),
    /// An IEEE-754 double. `-0.0` and `0.0` compare and hash identically.
    Float(OrderedFloat<f64>),
    /// An ordered, non-empty sequence of child values. A zero-element list is
    /// represented as `Nil`, never as `List(vec![])`.
    List(Vec<Value>),
}

impl Value {
    /// Returns NIL.
    pub fn nil() -> Value {
        Value::Nil
    }

    /// Builds a symbol value from any byte-string-like input.
    pub fn symbol<B: Into<Vec<u8>>>(bytes: B) -> Value {
        Value::Symbol(bytes.into())
    }

    /// Builds a string value from any byte-string-like input.
    pub fn string<B: Into<Vec<u8>>>(bytes: B) -> Value {
        Value::String(bytes.into())
    }

    /// Builds a list value. An empty `Vec` collapses to `Nil`, matching the
    /// invariant that a zero-element list is never constructed as `List([])`.
    pub fn list(children: Vec<Value>) -> Value {
        if children.is_empty() {
            Value::Nil
        } else {
            Value::List(children)
        }
    }

    /// Builds a float value, normalizing `-0.0` to `+0.0` immediately so every
    /// downstream operation (equality, hash, Bloom) sees the canonical form.
    pub fn float(value: f64) -> Value {
        Value::Float(OrderedFloat(hash::normalize_float(value)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::Nil | Value::List(_))
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, Value::List(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// True for `Integer` or `Float` — the two numeric kinds.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// One of `nil`, `symbol`, `string`, `integer`, `float`, `list`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::List(_) => "list",
        }
    }

    /// Zero for NIL, one for any other atom, the child count for a list.
    pub fn length(&self) -> usize {
        match self {
            Value::Nil => 0,
            Value::List(children) => children.len(),
            _ => 1,
        }
    }

    /// `car`: NIL has no car; an atom is a type error; a list yields its first
    /// child, by reference.
    pub fn car(&self) -> crate::error::Result<Option<&Value>> {
        match self {
            Value::Nil => Ok(None),
            Value::List(children) => Ok(children.first()),
            _ => Err(crate::error::Error::NotAList),
        }
    }

    /// `cdr`: NIL has no cdr; an atom is a type error; a one-element list's
    /// cdr is NIL; otherwise the remaining children form a new list.
    pub fn cdr(&self) -> crate::error::Result<Option<Value>> {
        match self {
            Value::Nil => Ok(None),
            Value::List(children) => {
                if children.len() <= 1 {
                    Ok(Some(Value::Nil))
                } else {
                    Ok(Some(Value::List(children[1..].to_vec())))
                }
            }
            _ => Err(crate::error::Error::NotAList),
        }
    }

    /// `nth`: out of range returns `None`. Per the reference implementation's
    /// documented (if questionable) behavior, `nth(0)` on a non-list atom
    /// returns the atom itself — see DESIGN.md's Open Questions resolution.
    pub fn nth(&self, index: usize) -> crate::error::Result<Option<&Value>> {
        match self {
            Value::Nil => Ok(None),
            Value::List(children) => Ok(children.get(index)),
            other => {
                if index == 0 {
                    Ok(Some(other))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Children of a list, or an empty slice for NIL/atoms.
    pub fn children(&self) -> &[Value] {
        match self {
            Value::List(children) => children.as_slice(),
            _ => &[],
        }
    }
}

/// The element-hash of a value: `combine(type_tag_hash, value_hash)` for atoms,
/// and the order-sensitive fold over children for lists. Symbol-table
/// independent by construction: symbols are hashed by their text.
pub fn element_hash(value: &Value) -> u32 {
    match value {
        Value::Nil => hash::hash_atom(hash::TypeTag::Nil, 0),
        Value::Integer(n) => hash::hash_atom(hash::TypeTag::Integer, hash::hash_i64(*n)),
        Value::Float(f) => {
            let normalized = hash::normalize_float(f.into_inner());
            hash::hash_atom(hash::TypeTag::Float, hash::hash_f64_bits(normalized))
        }
        Value::Symbol(text) => hash::hash_atom(hash::TypeTag::Symbol, hash::hash_bytes(text)),
        Value::String(content) => hash::hash_atom(hash::TypeTag::String, hash::hash_bytes(content)),
        Value::List(children) => hash::hash_list(children.len(), children.iter().map(element_hash)),
    }
}

/// Computes the 64-bit Bloom signature of a value. Atoms contribute their own
/// element-hash's bit positions; a list's signature is the union of its own
/// signature and every descendant's.
pub fn bloom_signature(value: &Value, k: u32) -> u64 {
    let mut signature = 0u64;
    hash::bloom_insert(&mut signature, element_hash(value), k);
    if let Value::List(children) = value {
        for child in children {
            signature |= bloom_signature(child, k);
        }
    }
    signature
}

/// A process-long NIL singleton. NIL's canonical binary encoding is a fixed,
/// compile-time-known byte sequence (version, zero symbols, one NIL element),
/// so no lazy-initialization primitive is needed to share it.
pub const NIL_BINARY: [u8; 3] = [
    crate::tunables::FORMAT_VERSION,
    0, // symbol_count varint (zero symbols)
    0, // NIL tag byte: kind 000, payload 0
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_of_empty_vec_collapses_to_nil() {
        assert_eq!(Value::list(vec![]), Value::Nil);
    }

    #[test]
    fn test_float_normalizes_negative_zero() {
        let neg_zero = Value::float(-0.0);
        let pos_zero = Value::float(0.0);
        assert_eq!(neg_zero, pos_zero);
        assert_eq!(element_hash(&neg_zero), element_hash(&pos_zero));
    }

    #[test]
    fn test_length_semantics() {
        assert_eq!(Value::Nil.length(), 0);
        assert_eq!(Value::symbol(&b"a"[..]).length(), 1);
        let list = Value::list(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(list.length(), 3);
    }

    #[test]
    fn test_car_cdr_identity() {
        let list = Value::list(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
        ]);
        let car = list.car().unwrap().cloned().unwrap();
        let cdr = list.cdr().unwrap().unwrap();
        assert_eq!(car, Value::Integer(1));
        let mut rebuilt = vec![car];
        rebuilt.extend(cdr.children().iter().cloned());
        assert_eq!(Value::list(rebuilt), list);
    }

    #[test]
    fn test_car_cdr_type_errors() {
        let atom = Value::Integer(42);
        assert!(atom.car().is_err());
        assert!(atom.cdr().is_err());
    }

    #[test]
    fn test_nth_atom_zero_returns_atom() {
        let atom = Value::Integer(42);
        assert_eq!(atom.nth(0).unwrap(), Some(&atom));
        assert_eq!(atom.nth(1).unwrap(), None);
    }

    #[test]
    fn test_element_hash_order_sensitive() {
        let a = Value::list(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::list(vec![Value::Integer(2), Value::Integer(1)]);
        assert_ne!(element_hash(&a), element_hash(&b));
    }

    #[test]
    fn test_bloom_soundness_self() {
        let v = Value::list(vec![Value::symbol(&b"a"[..]), Value::Integer(7)]);
        let sig = bloom_signature(&v, 4);
        // Every descendant's bits are a subset of the whole.
        let child_sig = bloom_signature(&v.children()[0], 4);
        assert_eq!(sig & child_sig, child_sig);
    }
}
