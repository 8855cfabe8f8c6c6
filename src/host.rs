//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The public surface a host database embeds: parsing and printing, the
//! binary container codec, the navigation and hashing primitives, and the
//! containment/pattern/index operations, all gathered behind one module so a
//! host only needs `use sexp_codec::host::*` (or the crate-root re-exports)
//! to get everything it needs to implement a value type, an operator class,
//! and an index access method on top of this crate.

use log::trace;

use crate::builder;
use crate::containment;
use crate::equality;
use crate::error::Result;
use crate::index::{self, Key, Strategy, Tristate};
use crate::interrupt::Interrupt;
use crate::ops;
use crate::pattern::{self, Bindings};
use crate::text;
use crate::value::Value;

/// Parses textual S-expression syntax into a [`Value`].
pub fn parse(text: &str) -> Result<Value> {
    text::parser::parse(text)
}

/// Renders a [`Value`] back into textual syntax.
pub fn print(value: &Value) -> String {
    text::printer::print(value)
}

/// Encodes a [`Value`] into the binary container format a host stores.
pub fn send(value: &Value) -> Vec<u8> {
    builder::encode(value)
}

/// Decodes a stored binary container back into a [`Value`].
pub fn recv(bytes: &[u8]) -> Result<Value> {
    builder::decode(bytes)
}

/// Symbol-table-independent equality of two stored values.
pub fn equal(a: &[u8], b: &[u8]) -> Result<bool> {
    equality::equal(a, b)
}

/// The 32-bit semantic hash of a stored value.
pub fn hash(bytes: &[u8]) -> Result<i32> {
    ops::hash_value(bytes)
}

/// The 64-bit extended hash of a stored value, mixed with `seed`.
pub fn hash_extended(bytes: &[u8], seed: i64) -> Result<i64> {
    ops::hash_extended(bytes, seed)
}

/// `car`: the first child of a list, or a type error on a non-list atom.
pub fn car(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    ops::car(bytes)
}

/// `cdr`: everything after the first child.
pub fn cdr(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    ops::cdr(bytes)
}

/// `nth`: the `index`-th child, or the atom itself at index 0.
pub fn nth(bytes: &[u8], index: usize) -> Result<Option<Vec<u8>>> {
    ops::nth(bytes, index)
}

/// Zero for NIL, one for any other atom, child count for a list.
pub fn length(bytes: &[u8]) -> Result<i32> {
    ops::length(bytes)
}

/// One of `nil`, `symbol`, `string`, `integer`, `float`, `list`.
pub fn type_of(bytes: &[u8]) -> Result<&'static str> {
    ops::type_of(bytes)
}

pub fn is_nil(bytes: &[u8]) -> Result<bool> {
    ops::is_nil(bytes)
}

pub fn is_list(bytes: &[u8]) -> Result<bool> {
    ops::is_list(bytes)
}

pub fn is_atom(bytes: &[u8]) -> Result<bool> {
    ops::is_atom(bytes)
}

pub fn is_symbol(bytes: &[u8]) -> Result<bool> {
    ops::is_symbol(bytes)
}

pub fn is_string(bytes: &[u8]) -> Result<bool> {
    ops::is_string(bytes)
}

pub fn is_number(bytes: &[u8]) -> Result<bool> {
    ops::is_number(bytes)
}

/// Structural containment: does `needle` occur, unchanged, anywhere in
/// `haystack`?
pub fn contains(haystack: &[u8], needle: &[u8]) -> Result<bool> {
    trace!("contains: structural containment query");
    containment::contains(haystack, needle)
}

/// As [`contains`], polling `interrupt` once per visited list child so a host
/// can abort a scan over a very large haystack.
pub fn contains_with_interrupt(haystack: &[u8], needle: &[u8], interrupt: &dyn Interrupt) -> Result<bool> {
    trace!("contains: structural containment query");
    containment::contains_with_interrupt(haystack, needle, interrupt)
}

/// Key-based containment: does some descendant list of `haystack` share
/// `needle`'s head exactly and contain each of `needle`'s remaining elements,
/// order-insensitively?
pub fn contains_key(haystack: &[u8], needle: &[u8]) -> Result<bool> {
    trace!("contains_key: key-based containment query");
    containment::contains_key(haystack, needle)
}

/// As [`contains_key`], polling `interrupt` once per visited list child.
pub fn contains_key_with_interrupt(haystack: &[u8], needle: &[u8], interrupt: &dyn Interrupt) -> Result<bool> {
    trace!("contains_key: key-based containment query");
    containment::contains_key_with_interrupt(haystack, needle, interrupt)
}

/// Matches `expr` against `pattern`, returning the captured bindings on
/// success.
pub fn pattern_match(expr: &[u8], pattern: &[u8]) -> Result<Option<Bindings>> {
    pattern::matches(expr, pattern)
}

/// The first subtree of `expr` matching `pattern`, depth-first, with its
/// bindings.
pub fn find_first(expr: &[u8], pattern: &[u8]) -> Result<Option<(Vec<u8>, Bindings)>> {
    pattern::find_first(expr, pattern)
}

/// The inverted-index keys a stored value contributes.
pub fn extract_value_keys(bytes: &[u8]) -> Result<Vec<Key>> {
    index::extract_value_keys(bytes)
}

/// As [`extract_value_keys`], also reporting truncation at `MAX_KEYS` and
/// polling `interrupt` once per visited list child.
pub fn extract_value_keys_with_interrupt(bytes: &[u8], interrupt: &dyn Interrupt) -> Result<(Vec<Key>, bool)> {
    index::extract_value_keys_checked_with_interrupt(bytes, interrupt)
}

/// The inverted-index keys a query of the given strategy should probe with.
pub fn extract_query_keys(bytes: &[u8], strategy: Strategy) -> Result<Vec<Key>> {
    index::extract_query_keys(bytes, strategy)
}

/// Boolean index consistency check.
pub fn consistent(check: &[bool], strategy: Strategy) -> bool {
    index::consistent(check, strategy)
}

/// Ternary index consistency check. `query_is_single_atom` must reflect
/// whether the query value itself (not its extracted keys) is a non-list
/// atom, since a single atom's key presence is sufficient, not merely
/// necessary, for containment.
pub fn triconsistent(check: &[Tristate], strategy: Strategy, query_is_single_atom: bool) -> Tristate {
    index::triconsistent(check, strategy, query_is_single_atom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_parse_contains() {
        let haystack = send(&parse("(a b c)").unwrap());
        let needle = send(&parse("b").unwrap());
        assert!(contains(&haystack, &needle).unwrap());
    }

    #[test]
    fn test_end_to_end_containment_vs_key_based() {
        let haystack = send(&parse(r#"(user (name "alice") (age 30))"#).unwrap());
        let exact = send(&parse(r#"(user (name "alice") (age 30))"#).unwrap());
        let reordered = send(&parse(r#"(user (age 30) (name "alice"))"#).unwrap());
        assert!(contains(&haystack, &exact).unwrap());
        assert!(!contains(&haystack, &reordered).unwrap());
        assert!(contains_key(&haystack, &reordered).unwrap());
    }

    #[test]
    fn test_end_to_end_pattern_match() {
        let expr = send(&parse("(+ 1 2 3)").unwrap());
        let pattern = send(&parse("(+ _*)").unwrap());
        assert!(pattern_match(&expr, &pattern).unwrap().is_some());
    }

    #[test]
    fn test_end_to_end_hash_car_equality() {
        let a = send(&parse("(a b c)").unwrap());
        let first = car(&a).unwrap().unwrap();
        let standalone = send(&parse("a").unwrap());
        assert_eq!(hash(&first).unwrap(), hash(&standalone).unwrap());
    }

    #[test]
    fn test_end_to_end_length_semantics() {
        assert_eq!(length(&send(&parse("()").unwrap())).unwrap(), 0);
        assert_eq!(length(&send(&parse("a").unwrap())).unwrap(), 1);
        assert_eq!(length(&send(&parse("(a b c d e)").unwrap())).unwrap(), 5);
    }

    #[test]
    fn test_end_to_end_index_key_asymmetry() {
        let pair = send(&parse(r#"(name "alice")"#).unwrap());
        let value_keys = extract_value_keys(&pair).unwrap();
        let structural_query_keys = extract_query_keys(&pair, Strategy::Structural).unwrap();
        let key_based_query_keys = extract_query_keys(&pair, Strategy::KeyBased).unwrap();
        assert_eq!(value_keys.len(), structural_query_keys.len());
        assert!(key_based_query_keys.len() < structural_query_keys.len());
    }

    #[test]
    fn test_end_to_end_interrupt_cancels_contains() {
        let haystack = send(&parse("(a b c)").unwrap());
        let needle = send(&parse("a").unwrap());
        let already_cancelled = || true;
        assert_eq!(
            contains_with_interrupt(&haystack, &needle, &already_cancelled),
            Err(crate::error::Error::Cancelled)
        );
    }
}
