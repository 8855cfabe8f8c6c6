//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Structural and key-based containment.
//!
//! Both relations ask "does `needle` occur, in some sense, inside
//! `haystack`?" and both descend through every subtree of `haystack` looking
//! for an occurrence, but they differ in what counts as a match at each node:
//!
//! - Structural (`⊑s`): the needle must equal a subtree of the haystack
//!   exactly, by the same rules as [`crate::equality`].
//! - Key-based (`⊑k`): only meaningful when both sides are lists. The needle
//!   list's head must equal the candidate's head exactly; each remaining
//!   needle element is then matched against the candidate's remaining
//!   elements by a first-come, first-matched scan that consumes whichever
//!   element it lands on first — not a maximum-matching search. A repeated
//!   needle tail key can therefore fail to match a haystack that contains
//!   enough occurrences in total but not enough left after an earlier,
//!   greedier pairing consumed one.
//!
//! Before descending into a subtree, a cheap Bloom-signature check rejects
//! candidates whose signature doesn't carry every bit the needle's does —
//! never used to conclude a match, only to skip impossible ones.
//!
//! Both entry points accept an [`Interrupt`] so a host can abort a scan over
//! a very large haystack; `contains`/`contains_key` use [`Never`] and never
//! cancel on their own.

use log::trace;

use crate::cursor::{Cursor, Document, ElementView, ListView};
use crate::error::Result;
use crate::equality::equal_cursors;
use crate::interrupt::{self, Interrupt, Never};
use crate::ops::bloom_signature_default;
use crate::tunables;

/// `haystack ⊑s needle`-style query: does `needle` occur, unchanged, as
/// `haystack` itself or as some descendant subtree of it?
pub fn contains(haystack_bytes: &[u8], needle_bytes: &[u8]) -> Result<bool> {
    contains_with_interrupt(haystack_bytes, needle_bytes, &Never)
}

/// As [`contains`], polling `interrupt` once per visited list child.
pub fn contains_with_interrupt(
    haystack_bytes: &[u8],
    needle_bytes: &[u8],
    interrupt: &dyn Interrupt,
) -> Result<bool> {
    let (_hdoc, haystack) = Document::parse(haystack_bytes)?;
    let (_ndoc, needle) = Document::parse(needle_bytes)?;
    let needle_sig = bloom_signature_default(&needle)?;
    contains_structural(&haystack, &needle, needle_sig, interrupt)
}

fn contains_structural(
    candidate: &Cursor,
    needle: &Cursor,
    needle_sig: u64,
    interrupt: &dyn Interrupt,
) -> Result<bool> {
    let candidate_sig = bloom_signature_default(candidate)?;
    if candidate_sig & needle_sig != needle_sig {
        // `candidate_sig` already unions every descendant's bits, so missing
        // one of the needle's bits here rules out the whole subtree at once.
        trace!("contains: bloom reject, skipping subtree");
        return Ok(false);
    }
    if equal_cursors(candidate, needle)? {
        return Ok(true);
    }
    descend_structural(candidate, needle, needle_sig, interrupt)
}

fn descend_structural(
    candidate: &Cursor,
    needle: &Cursor,
    needle_sig: u64,
    interrupt: &dyn Interrupt,
) -> Result<bool> {
    if let ElementView::List(list) = candidate.read_element()?.0 {
        return scan_windowed(&list, interrupt, |child| {
            contains_structural(child, needle, needle_sig, interrupt)
        });
    }
    Ok(false)
}

/// `haystack ⊑k needle`: does `needle` (a list) occur as `haystack` itself or
/// as some descendant list whose head matches exactly and whose remaining
/// elements are each matched, order-insensitively, against the candidate's
/// remaining elements?
pub fn contains_key(haystack_bytes: &[u8], needle_bytes: &[u8]) -> Result<bool> {
    contains_key_with_interrupt(haystack_bytes, needle_bytes, &Never)
}

/// As [`contains_key`], polling `interrupt` once per visited list child.
pub fn contains_key_with_interrupt(
    haystack_bytes: &[u8],
    needle_bytes: &[u8],
    interrupt: &dyn Interrupt,
) -> Result<bool> {
    let (_hdoc, haystack) = Document::parse(haystack_bytes)?;
    let (_ndoc, needle) = Document::parse(needle_bytes)?;
    let needle_sig = bloom_signature_default(&needle)?;
    contains_key_cursors(&haystack, &needle, needle_sig, interrupt)
}

fn contains_key_cursors(
    candidate: &Cursor,
    needle: &Cursor,
    needle_sig: u64,
    interrupt: &dyn Interrupt,
) -> Result<bool> {
    let candidate_sig = bloom_signature_default(candidate)?;
    if candidate_sig & needle_sig != needle_sig {
        trace!("contains_key: bloom reject, skipping subtree");
        return Ok(false);
    }
    if !matches!(needle.read_element()?.0, ElementView::List(_)) {
        // Atom needle (NIL included): key-based containment falls back to the
        // structural rule — the atom must occur somewhere in the candidate.
        return contains_atom_anywhere(candidate, needle, interrupt);
    }
    if key_matches_here(candidate, needle)? {
        return Ok(true);
    }
    if let ElementView::List(list) = candidate.read_element()?.0 {
        return scan_windowed(&list, interrupt, |child| {
            contains_key_cursors(child, needle, needle_sig, interrupt)
        });
    }
    Ok(false)
}

/// Structural atom-in-container search: does an equal atom occur as `candidate`
/// itself or as any descendant?
fn contains_atom_anywhere(candidate: &Cursor, needle: &Cursor, interrupt: &dyn Interrupt) -> Result<bool> {
    if equal_cursors(candidate, needle)? {
        return Ok(true);
    }
    if let ElementView::List(list) = candidate.read_element()?.0 {
        return scan_windowed(&list, interrupt, |child| contains_atom_anywhere(child, needle, interrupt));
    }
    Ok(false)
}

fn key_matches_here(candidate: &Cursor, needle: &Cursor) -> Result<bool> {
    let needle_list = match needle.read_element()?.0 {
        ElementView::List(l) if l.count() > 0 => l,
        _ => return Ok(false),
    };
    let candidate_list = match candidate.read_element()?.0 {
        ElementView::List(l) if l.count() > 0 => l,
        _ => return Ok(false),
    };

    let needle_head = needle_list.child(0)?.expect("non-empty");
    let candidate_head = candidate_list.child(0)?.expect("non-empty");
    if !equal_cursors(&needle_head, &candidate_head)? {
        return Ok(false);
    }

    let mut consumed = vec![false; candidate_list.count()];
    consumed[0] = true;

    for i in 1..needle_list.count() {
        let needle_tail = needle_list.child(i)?.expect("within bounds");
        let mut matched = false;
        for j in 1..candidate_list.count() {
            if consumed[j] {
                continue;
            }
            let candidate_tail = candidate_list.child(j)?.expect("within bounds");
            if equal_cursors(&needle_tail, &candidate_tail)? {
                consumed[j] = true;
                matched = true;
                break;
            }
        }
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Walks large lists in batches of [`tunables::PREFETCH_WINDOW`] children at a
/// time rather than one at a time, trading a slightly larger working set for
/// fewer round trips through `ListView::child`'s offset lookup. `f` receives
/// each child cursor in order; the traversal stops at the first `Err` or the
/// first time `f` returns `Ok(true)`. `interrupt` is polled once per visited
/// child, ahead of calling `f`, so a cancelled scan over a large list stops
/// promptly rather than running every child through `f` first.
pub fn scan_windowed<F>(list: &ListView, interrupt: &dyn Interrupt, mut f: F) -> Result<bool>
where
    F: FnMut(&Cursor) -> Result<bool>,
{
    let count = list.count();
    let mut i = 0;
    while i < count {
        let window_end = (i + tunables::PREFETCH_WINDOW).min(count);
        for j in i..window_end {
            interrupt::check(interrupt)?;
            let child = list.child(j)?.expect("within bounds");
            if f(&child)? {
                return Ok(true);
            }
        }
        i = window_end;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::encode;
    use crate::value::Value;

    fn sym(s: &str) -> Value {
        Value::symbol(s.as_bytes())
    }

    #[test]
    fn test_structural_containment_self_and_descendant() {
        let needle = Value::list(vec![sym("name"), Value::string(&b"alice"[..])]);
        let haystack = Value::list(vec![
            sym("user"),
            needle.clone(),
            Value::list(vec![sym("age"), Value::Integer(30)]),
        ]);
        let h = encode(&haystack);
        let n = encode(&needle);
        assert!(contains(&h, &n).unwrap());
        assert!(contains(&h, &h).unwrap());
    }

    #[test]
    fn test_structural_containment_rejects_reordered_sibling() {
        let needle = Value::list(vec![Value::Integer(30), sym("age")]);
        let haystack = Value::list(vec![sym("user"), Value::list(vec![sym("age"), Value::Integer(30)])]);
        let h = encode(&haystack);
        let n = encode(&needle);
        assert!(!contains(&h, &n).unwrap());
    }

    #[test]
    fn test_key_based_containment_order_insensitive_tail() {
        let needle = Value::list(vec![sym("user"), Value::list(vec![sym("age"), Value::Integer(30)])]);
        let haystack = Value::list(vec![
            sym("user"),
            Value::list(vec![sym("name"), Value::string(&b"alice"[..])]),
            Value::list(vec![sym("age"), Value::Integer(30)]),
        ]);
        let h = encode(&haystack);
        let n = encode(&needle);
        assert!(contains_key(&h, &n).unwrap());
        // Structural containment fails here: `needle` is not an exact subtree.
        assert!(!contains(&h, &n).unwrap());
    }

    #[test]
    fn test_key_based_containment_requires_matching_head() {
        let needle = Value::list(vec![sym("admin"), Value::Integer(1)]);
        let haystack = Value::list(vec![sym("user"), Value::Integer(1)]);
        let h = encode(&haystack);
        let n = encode(&needle);
        assert!(!contains_key(&h, &n).unwrap());
    }

    #[test]
    fn test_key_based_containment_atom_needle() {
        // An atom needle falls back to the structural "appears somewhere" rule.
        let haystack = Value::list(vec![sym("a"), sym("b"), sym("c")]);
        let h = encode(&haystack);
        let n = encode(&sym("b"));
        assert!(contains_key(&h, &n).unwrap());
        let missing = encode(&sym("z"));
        assert!(!contains_key(&h, &missing).unwrap());
    }

    #[test]
    fn test_key_based_containment_nil_needle() {
        let haystack = Value::list(vec![sym("a"), Value::Nil, sym("c")]);
        let h = encode(&haystack);
        let n = encode(&Value::Nil);
        assert!(contains_key(&h, &n).unwrap());
        assert!(!contains_key(&encode(&sym("a")), &n).unwrap());
    }

    #[test]
    fn test_key_based_scan_and_consume_not_maximum_matching() {
        // needle asks for two copies of `x`; haystack only has one spare slot
        // after the head match consumes position 0, so only one `x` is left
        // to match two needle elements both equal to `x`.
        let needle = Value::list(vec![sym("h"), sym("x"), sym("x")]);
        let haystack = Value::list(vec![sym("h"), sym("x"), sym("y")]);
        let h = encode(&haystack);
        let n = encode(&needle);
        assert!(!contains_key(&h, &n).unwrap());
    }

    #[test]
    fn test_interrupt_cancels_structural_scan() {
        // `needle` is actually present as a direct child, so its bloom bits
        // are guaranteed a subset of the haystack's and the walk reaches
        // `scan_windowed` instead of rejecting at the root.
        let haystack = Value::list(vec![sym("a"), sym("b"), sym("c")]);
        let needle = sym("a");
        let h = encode(&haystack);
        let n = encode(&needle);
        let already_cancelled = || true;
        assert_eq!(
            contains_with_interrupt(&h, &n, &already_cancelled),
            Err(crate::error::Error::Cancelled)
        );
    }

    #[test]
    fn test_interrupt_cancels_key_based_scan() {
        let haystack = Value::list(vec![sym("a"), sym("b"), sym("c")]);
        let needle = sym("a");
        let h = encode(&haystack);
        let n = encode(&needle);
        let already_cancelled = || true;
        assert_eq!(
            contains_key_with_interrupt(&h, &n, &already_cancelled),
            Err(crate::error::Error::Cancelled)
        );
    }
}
