//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The inverted-index adapter: `extract_value_keys`, `extract_query_keys`,
//! `consistent`, and `triconsistent` — the four functions a host database's
//! generalized-inverted-index support needs to build and probe an index over
//! this crate's values, in the shape of PostgreSQL's GIN opclass support
//! functions (`extractValue`/`extractQuery`/`consistent`/`triConsistent`).
//!
//! A value contributes one key per atom it contains (its element-hash), one
//! *pair key* per 2-element list whose first element is a symbol (`combine`
//! of both children's hashes, so `(name "alice")`-shaped entries are
//! probeable directly), and one *head key* per list of 3 or more children
//! (the head element's hash alone, so `(user ...)`-shaped records are
//! probeable by their leading symbol). Every subtree at every depth
//! contributes keys, not just the root, since a containment query may match
//! at any depth.

use std::collections::HashSet;

use log::debug;

use crate::cursor::{Cursor, Document, ElementView};
use crate::error::Result;
use crate::hash::combine;
use crate::interrupt::{self, Interrupt, Never};
use crate::ops::element_hash;
use crate::tunables;

pub type Key = u32;

/// The GIN strategy numbers this opclass registers, one per containment-style
/// operator.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Strategy {
    /// `@>s`: exact-subtree structural containment.
    Structural = 7,
    /// `<@`: this value is contained within the indexed value. GIN can't
    /// usefully pre-filter in this direction — every row is a candidate.
    ContainedBy = 8,
    /// `@>k`: key-based containment.
    KeyBased = 9,
}

/// The three-valued result `triConsistent` communicates to the index scan:
/// a definite match, a definite non-match, or "ask `consistent` and recheck".
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Tristate {
    True,
    False,
    Maybe,
}

/// Forces the top bit on so every real key is distinguishable from the
/// all-zero sentinel an open-addressed dedup set would otherwise use for an
/// empty slot.
const KEY_SENTINEL_BIT: Key = 1 << 31;

#[inline]
fn tag_key(raw: u32) -> Key {
    raw | KEY_SENTINEL_BIT
}

struct KeyCollector {
    seen: HashSet<Key>,
    keys: Vec<Key>,
    truncated: bool,
}

impl KeyCollector {
    fn new() -> Self {
        KeyCollector {
            seen: HashSet::new(),
            keys: Vec::new(),
            truncated: false,
        }
    }

    fn push(&mut self, raw: u32) {
        if self.keys.len() >= tunables::MAX_KEYS {
            if !self.truncated {
                debug!("index key extraction truncated at MAX_KEYS ({})", tunables::MAX_KEYS);
            }
            self.truncated = true;
            return;
        }
        let key = tag_key(raw);
        if self.seen.insert(key) {
            self.keys.push(key);
        }
    }
}

/// Extracts the indexable keys of a stored value: every atom's hash, every
/// 2-element list's pair key, and every 3-or-more-element list's head key, at
/// every depth. Truncated at [`tunables::MAX_KEYS`] distinct keys; callers
/// that need to know whether truncation occurred should use
/// [`extract_value_keys_checked`].
pub fn extract_value_keys(bytes: &[u8]) -> Result<Vec<Key>> {
    Ok(extract_value_keys_checked(bytes)?.0)
}

/// As [`extract_value_keys`], also reporting whether the key set was
/// truncated at [`tunables::MAX_KEYS`] — a truncated value's index entry is
/// necessarily incomplete, and a host relying on the index for correctness
/// (rather than as a pre-filter before a recheck) must treat such rows
/// specially.
pub fn extract_value_keys_checked(bytes: &[u8]) -> Result<(Vec<Key>, bool)> {
    extract_value_keys_checked_with_interrupt(bytes, &Never)
}

/// As [`extract_value_keys_checked`], polling `interrupt` once per visited
/// list child.
pub fn extract_value_keys_checked_with_interrupt(
    bytes: &[u8],
    interrupt: &dyn Interrupt,
) -> Result<(Vec<Key>, bool)> {
    let (_doc, cursor) = Document::parse(bytes)?;
    let mut collector = KeyCollector::new();
    collect_value_keys(&cursor, &mut collector, true, interrupt)?;
    Ok((collector.keys, collector.truncated))
}

fn collect_value_keys(
    cursor: &Cursor,
    collector: &mut KeyCollector,
    emit_pairs: bool,
    interrupt: &dyn Interrupt,
) -> Result<()> {
    let view = cursor.read_element()?.0;
    match &view {
        ElementView::List(list) => {
            let count = list.count();
            let head_is_symbol = count >= 1
                && matches!(list.child(0)?.expect("within bounds").read_element()?.0, ElementView::Symbol(_));
            if count == 2 && emit_pairs && head_is_symbol {
                let a = list.child(0)?.expect("within bounds");
                let b = list.child(1)?.expect("within bounds");
                collector.push(combine(element_hash(&a)?, element_hash(&b)?));
            } else if count >= 3 {
                let head = list.child(0)?.expect("within bounds");
                collector.push(element_hash(&head)?);
            }
            for i in 0..count {
                interrupt::check(interrupt)?;
                let child = list.child(i)?.expect("within bounds");
                collect_value_keys(&child, collector, emit_pairs, interrupt)?;
            }
        }
        ElementView::Nil => {}
        _ => collector.push(element_hash(cursor)?),
    }
    Ok(())
}

/// Extracts the keys a query of the given strategy should probe the index
/// with. `KeyBased` omits pair keys: key-based containment doesn't require a
/// 2-element list to appear verbatim, only its head, so indexing by pair
/// would miss matches where the tail element was reordered or accompanied by
/// siblings. `ContainedBy` returns no keys at all — every indexed row is a
/// candidate, since the query value, not the row, is the smaller side.
pub fn extract_query_keys(bytes: &[u8], strategy: Strategy) -> Result<Vec<Key>> {
    match strategy {
        Strategy::ContainedBy => Ok(Vec::new()),
        Strategy::Structural => {
            let (_doc, cursor) = Document::parse(bytes)?;
            let mut collector = KeyCollector::new();
            collect_value_keys(&cursor, &mut collector, true, &Never)?;
            Ok(collector.keys)
        }
        Strategy::KeyBased => {
            let (_doc, cursor) = Document::parse(bytes)?;
            let mut collector = KeyCollector::new();
            collect_value_keys(&cursor, &mut collector, false, &Never)?;
            Ok(collector.keys)
        }
    }
}

/// Boolean consistency check: given which of the extracted query keys were
/// found in a candidate row's key set (`check[i]` corresponds to the `i`-th
/// key `extract_query_keys` returned), decide whether the row can possibly
/// satisfy the query.
///
/// Both `Structural` and `KeyBased` require every query key to be present
/// (an AND across `check`): containment can only hold if nothing the query
/// needs is missing. `ContainedBy` never filters; it always defers to a
/// recheck against the actual values.
pub fn consistent(check: &[bool], strategy: Strategy) -> bool {
    match strategy {
        Strategy::Structural | Strategy::KeyBased => check.iter().all(|&b| b),
        Strategy::ContainedBy => true,
    }
}

/// Ternary consistency check, letting the index scan skip a recheck when the
/// answer is certain. A missing required key is a definite non-match (the
/// GIN bitmap is exact about absence). Finding every key is not itself
/// definite proof of containment in general — key collisions and the coarser
/// key granularity (pair/head keys summarize more than one element) mean the
/// actual subtree walk can still fail — except for the single-atom query
/// case: an atom contributes exactly one key, and that key's presence is
/// necessary and sufficient for "this atom occurs somewhere" up to hash
/// collision, which this predicate accepts as the cost of indexing.
///
/// `query_is_single_atom` tells the two cases apart; a host's `triConsistent`
/// support function knows this for free from the query datum it was handed
/// before ever computing `check`.
pub fn triconsistent(check: &[Tristate], strategy: Strategy, query_is_single_atom: bool) -> Tristate {
    match strategy {
        Strategy::Structural | Strategy::KeyBased => {
            if check.iter().any(|&c| c == Tristate::False) {
                Tristate::False
            } else if query_is_single_atom && check.iter().all(|&c| c == Tristate::True) {
                Tristate::True
            } else {
                Tristate::Maybe
            }
        }
        Strategy::ContainedBy => Tristate::Maybe,
    }
}
