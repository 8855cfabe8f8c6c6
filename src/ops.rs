//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Core element operations: type predicates, `car`/`cdr`/`nth`/`length`,
//! semantic hashing, and Bloom-signature computation — all working directly
//! against the binary cursor so a caller asking only `length(v)` never pays
//! to materialize children it did not ask for.

use crate::builder;
use crate::cursor::{Cursor, Document, ElementView, ListView};
use crate::error::{Error, Result};
use crate::hash::{self, TypeTag};
use crate::layout::Kind;
use crate::tunables;

/// One of `nil`, `symbol`, `string`, `integer`, `float`, `list`.
pub fn type_of(bytes: &[u8]) -> Result<&'static str> {
    let (_doc, cursor) = Document::parse(bytes)?;
    Ok(match cursor.kind()? {
        Kind::Nil => "nil",
        Kind::Symbol => "symbol",
        Kind::ShortString | Kind::LongString => "string",
        Kind::SmallInt | Kind::Integer => "integer",
        Kind::Float => "float",
        Kind::List => "list",
    })
}

pub fn is_nil(bytes: &[u8]) -> Result<bool> {
    Ok(type_of(bytes)? == "nil")
}

pub fn is_list(bytes: &[u8]) -> Result<bool> {
    let (_doc, cursor) = Document::parse(bytes)?;
    cursor.is_list()
}

pub fn is_atom(bytes: &[u8]) -> Result<bool> {
    Ok(!is_list(bytes)?)
}

pub fn is_symbol(bytes: &[u8]) -> Result<bool> {
    Ok(type_of(bytes)? == "symbol")
}

pub fn is_string(bytes: &[u8]) -> Result<bool> {
    Ok(type_of(bytes)? == "string")
}

pub fn is_number(bytes: &[u8]) -> Result<bool> {
    let t = type_of(bytes)?;
    Ok(t == "integer" || t == "float")
}

/// Zero for NIL, one for any other atom, the stored count for a list.
pub fn length(bytes: &[u8]) -> Result<i32> {
    let (_doc, cursor) = Document::parse(bytes)?;
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(0),
        ElementView::List(list) => Ok(list.count() as i32),
        _ => Ok(1),
    }
}

/// `car`: NIL has no car; an atom is a type error; a list yields its first
/// child as a new, standalone binary value (built via the header-reuse fast
/// path, not by rebuilding a minimal symbol table).
pub fn car(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let (doc, cursor) = Document::parse(bytes)?;
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(None),
        ElementView::List(list) => match list.child(0)? {
            Some(child) => Ok(Some(extract(&doc, &child)?)),
            None => Ok(None),
        },
        _ => Err(Error::NotAList),
    }
}

/// `cdr`: NIL has no cdr; an atom is a type error; a one-element list's cdr
/// is NIL; otherwise a new list of the remaining children, in whichever
/// small/large shape the resulting count warrants.
pub fn cdr(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let (doc, cursor) = Document::parse(bytes)?;
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(None),
        ElementView::List(list) => {
            let count = list.count();
            if count <= 1 {
                return Ok(Some(crate::value::NIL_BINARY.to_vec()));
            }
            let tail = decode_children(&doc, &list, 1, count)?;
            Ok(Some(builder::encode(&crate::value::Value::list(tail))))
        }
        _ => Err(Error::NotAList),
    }
}

fn decode_children(
    _doc: &Document,
    list: &ListView,
    start: usize,
    end: usize,
) -> Result<Vec<crate::value::Value>> {
    let mut out = Vec::with_capacity(end - start);
    for i in start..end {
        let child = list.child(i)?.ok_or(Error::CountNotExhausted)?;
        out.push(builder_decode(&child)?);
    }
    Ok(out)
}

fn builder_decode(cursor: &Cursor) -> Result<crate::value::Value> {
    use crate::value::Value;
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(Value::Nil),
        ElementView::Integer(n) => Ok(Value::Integer(n)),
        ElementView::Float(f) => Ok(Value::float(f)),
        ElementView::Symbol(text) => Ok(Value::symbol(text.to_vec())),
        ElementView::String(content) => Ok(Value::string(content.to_vec())),
        ElementView::List(list) => {
            let mut children = Vec::with_capacity(list.count());
            for i in 0..list.count() {
                let child = list.child(i)?.ok_or(Error::CountNotExhausted)?;
                children.push(builder_decode(&child)?);
            }
            Ok(Value::list(children))
        }
    }
}

/// `nth`: out-of-range returns `None`. Per the Open Questions resolution
/// (see DESIGN.md), `nth(0)` on a non-list atom returns the atom itself.
pub fn nth(bytes: &[u8], index: usize) -> Result<Option<Vec<u8>>> {
    let (doc, cursor) = Document::parse(bytes)?;
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(None),
        ElementView::List(list) => match list.child(index)? {
            Some(child) => Ok(Some(extract(&doc, &child)?)),
            None => Ok(None),
        },
        _ => {
            if index == 0 {
                Ok(Some(bytes.to_vec()))
            } else {
                Ok(None)
            }
        }
    }
}

/// Extracts `child` as a standalone value, reusing `doc`'s header.
fn extract(doc: &Document, child: &Cursor) -> Result<Vec<u8>> {
    let len = child.skip_element()?;
    Ok(builder::extract_child(doc, &child.bytes()[..len]))
}

/// The element-hash of a single element (not recursing into list structure
/// beyond what's needed): `combine(type_tag_hash, value_hash)` for atoms, the
/// order-sensitive fold over children's element-hashes for lists. Large lists
/// use their stored structural hash rather than recomputing it.
pub fn element_hash(cursor: &Cursor) -> Result<u32> {
    match cursor.read_element()?.0 {
        ElementView::Nil => Ok(hash::hash_atom(TypeTag::Nil, 0)),
        ElementView::Integer(n) => Ok(hash::hash_atom(TypeTag::Integer, hash::hash_i64(n))),
        ElementView::Float(f) => {
            let normalized = hash::normalize_float(f);
            Ok(hash::hash_atom(TypeTag::Float, hash::hash_f64_bits(normalized)))
        }
        ElementView::Symbol(text) => Ok(hash::hash_atom(TypeTag::Symbol, hash::hash_bytes(text))),
        ElementView::String(content) => {
            Ok(hash::hash_atom(TypeTag::String, hash::hash_bytes(content)))
        }
        ElementView::List(list) => {
            if let Some(stored) = list.structural_hash_hint() {
                return Ok(stored);
            }
            let count = list.count();
            let mut child_hashes = Vec::with_capacity(count);
            for i in 0..count {
                let child = list.child(i)?.ok_or(Error::CountNotExhausted)?;
                child_hashes.push(element_hash(&child)?);
            }
            Ok(hash::hash_list(count, child_hashes.into_iter()))
        }
    }
}

/// `hash(value) -> i32`: the 32-bit semantic hash of the whole document,
/// reinterpreted as a signed value the way a SQL `int4` hash function would.
pub fn hash_value(bytes: &[u8]) -> Result<i32> {
    let (_doc, cursor) = Document::parse(bytes)?;
    Ok(element_hash(&cursor)? as i32)
}

/// `hash_extended(value, seed) -> i64`: mixes a 64-bit seed into the base hash.
pub fn hash_extended(bytes: &[u8], seed: i64) -> Result<i64> {
    let (_doc, cursor) = Document::parse(bytes)?;
    let base = element_hash(&cursor)?;
    Ok(hash::extend(base, seed))
}

/// Computes the Bloom signature of a cursor's element, recomputed on demand
/// (never stored in the body, per spec) — a list's signature is the union of
/// its own element-hash's bits and every descendant's signature.
pub fn bloom_signature(cursor: &Cursor, k: u32) -> Result<u64> {
    let mut signature = 0u64;
    hash::bloom_insert(&mut signature, element_hash(cursor)?, k);
    if let ElementView::List(list) = cursor.read_element()?.0 {
        for i in 0..list.count() {
            let child = list.child(i)?.ok_or(Error::CountNotExhausted)?;
            signature |= bloom_signature(&child, k)?;
        }
    }
    Ok(signature)
}

pub fn bloom_signature_default(cursor: &Cursor) -> Result<u64> {
    bloom_signature(cursor, tunables::BLOOM_K)
}
