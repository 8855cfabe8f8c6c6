//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Encodes an owned [`Value`] tree into the binary container format, and
//! implements the child-extraction fast path: rather than rebuilding a
//! minimal symbol table for an extracted child, the parent's full header
//! (version + symbol table, verbatim) is reused and just the child's own
//! bytes are appended. The child's symbol references stay valid because they
//! index into the inherited table — see the contract documented on
//! [`extract_child`].

use std::collections::HashMap;

use crate::cursor::Document;
use crate::error::{Error, Result};
use crate::hash;
use crate::layout::{self, Kind};
use crate::tunables;
use crate::value::Value;
use crate::varint;

/// Collects the distinct symbol byte-strings referenced anywhere in `value`,
/// in order of first appearance, deduplicated via a hash map (doubled past a
/// load factor of 0.5, matching `std::collections::HashMap`'s own growth
/// policy, so no custom table is needed here).
fn collect_symbols(value: &Value, index: &mut HashMap<Vec<u8>, u32>, order: &mut Vec<Vec<u8>>) {
    match value {
        Value::Symbol(text) => {
            if !index.contains_key(text) {
                let next = order.len() as u32;
                index.insert(text.clone(), next);
                order.push(text.clone());
            }
        }
        Value::List(children) => {
            for child in children {
                collect_symbols(child, index, order);
            }
        }
        _ => {}
    }
}

fn encode_element(value: &Value, symbols: &HashMap<Vec<u8>, u32>, out: &mut Vec<u8>) {
    match value {
        Value::Nil => out.push(layout::tag_byte(Kind::Nil, 0)),
        Value::Integer(n) => encode_integer(*n, out),
        Value::Float(f) => {
            out.push(layout::tag_byte(Kind::Float, 0));
            out.extend_from_slice(&hash::normalize_float(f.into_inner()).to_ne_bytes());
        }
        Value::Symbol(text) => {
            let index = *symbols.get(text).expect("symbol collected before encode");
            out.push(layout::tag_byte(Kind::Symbol, 0));
            varint::encode_u64(index as u64, out);
        }
        Value::String(content) => encode_string(content, out),
        Value::List(children) => encode_list(children, symbols, out),
    }
}

fn encode_integer(n: i64, out: &mut Vec<u8>) {
    if (layout::SMALL_INT_MIN..=layout::SMALL_INT_MAX).contains(&n) {
        let payload = (n + layout::SMALL_INT_BIAS) as u8;
        out.push(layout::tag_byte(Kind::SmallInt, payload));
    } else {
        out.push(layout::tag_byte(Kind::Integer, 0));
        varint::encode_i64(n, out);
    }
}

fn encode_string(content: &[u8], out: &mut Vec<u8>) {
    if content.len() <= layout::SHORT_STRING_MAX_LEN {
        out.push(layout::tag_byte(Kind::ShortString, content.len() as u8));
        out.extend_from_slice(content);
    } else {
        out.push(layout::tag_byte(Kind::LongString, 0));
        varint::encode_u64(content.len() as u64, out);
        out.extend_from_slice(content);
    }
}

fn encode_list(children: &[Value], symbols: &HashMap<Vec<u8>, u32>, out: &mut Vec<u8>) {
    let count = children.len();
    if count <= tunables::SMALL_LIST_MAX {
        let mut payload = Vec::new();
        for child in children {
            encode_element(child, symbols, &mut payload);
        }
        out.push(layout::tag_byte(Kind::List, count as u8));
        varint::encode_u64(payload.len() as u64, out);
        out.extend_from_slice(&payload);
    } else {
        let child_bytes: Vec<Vec<u8>> = children
            .iter()
            .map(|c| {
                let mut buf = Vec::new();
                encode_element(c, symbols, &mut buf);
                buf
            })
            .collect();

        let mut offsets = Vec::with_capacity(count);
        let mut running = 0u32;
        for bytes in &child_bytes {
            offsets.push(running);
            running += bytes.len() as u32;
        }

        let structural_hash =
            hash::hash_list(count, children.iter().map(crate::value::element_hash));

        out.push(layout::tag_byte(Kind::List, 0));
        out.extend_from_slice(&(count as u32).to_le_bytes());
        out.extend_from_slice(&structural_hash.to_le_bytes());
        for (child, offset) in children.iter().zip(offsets.iter()) {
            let sentry_kind = layout::SEntryKind::from_element_kind(value_kind(child));
            let packed = layout::pack_entry(sentry_kind, *offset)
                .expect("list payload bounded well under 256MiB in practice");
            out.extend_from_slice(&packed.to_le_bytes());
        }
        for bytes in &child_bytes {
            out.extend_from_slice(bytes);
        }
    }
}

/// The wire [`Kind`] a value would be written with — used only to compute the
/// SEntry type code for a large list's entries array (integer vs. small-int
/// encoding doesn't matter there since both collapse to `SEntryKind::Int`).
fn value_kind(value: &Value) -> Kind {
    match value {
        Value::Nil => Kind::Nil,
        Value::Integer(_) => Kind::Integer,
        Value::Float(_) => Kind::Float,
        Value::Symbol(_) => Kind::Symbol,
        Value::String(_) => Kind::ShortString,
        Value::List(_) => Kind::List,
    }
}

/// Encodes `value` as a complete, self-contained binary container: version
/// byte, local symbol table, root element.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut index = HashMap::new();
    let mut order = Vec::new();
    collect_symbols(value, &mut index, &mut order);

    let mut out = Vec::new();
    out.push(tunables::FORMAT_VERSION);
    varint::encode_u64(order.len() as u64, &mut out);
    for symbol in &order {
        varint::encode_u64(symbol.len() as u64, &mut out);
        out.extend_from_slice(symbol);
    }
    encode_element(value, &index, &mut out);
    out
}

/// Builds a standalone binary value for a subtree extracted from `doc`, by
/// reusing the parent's header (version + full symbol table) verbatim and
/// appending just `child_bytes`.
///
/// # Contract
///
/// `child_bytes` must be exactly the encoded bytes of an element that only
/// references symbols present in `doc`'s symbol table — which holds for any
/// element reached by navigating `doc`'s own root via `car`/`cdr`/`nth`, since
/// those operations never introduce new symbol references. A general-purpose
/// transcoder that compacts or reorders a symbol table on write must not use
/// this path without first rewriting the child's symbol indices.
pub fn extract_child(doc: &Document, child_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(doc.header_len + child_bytes.len());
    out.extend_from_slice(&doc.full_buf[..doc.header_len]);
    out.extend_from_slice(child_bytes);
    out
}

/// Decodes a complete binary container back into an owned [`Value`] tree.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let (_doc, cursor) = Document::parse(bytes)?;
    decode_element(&cursor)
}

fn decode_element(cursor: &crate::cursor::Cursor) -> Result<Value> {
    use crate::cursor::ElementView;
    let (view, _len) = cursor.read_element()?;
    match view {
        ElementView::Nil => Ok(Value::Nil),
        ElementView::Integer(n) => Ok(Value::Integer(n)),
        ElementView::Float(f) => Ok(Value::float(f)),
        ElementView::Symbol(text) => Ok(Value::symbol(text.to_vec())),
        ElementView::String(content) => Ok(Value::string(content.to_vec())),
        ElementView::List(list) => {
            let mut children = Vec::with_capacity(list.count());
            for i in 0..list.count() {
                let child = list
                    .child(i)?
                    .ok_or(Error::CountNotExhausted)?;
                children.push(decode_element(&child)?);
            }
            Ok(Value::list(children))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip_atoms() {
        for v in [
            Value::Nil,
            Value::Integer(0),
            Value::Integer(-16),
            Value::Integer(15),
            Value::Integer(-17),
            Value::Integer(16),
            Value::Integer(i64::MAX),
            Value::Integer(i64::MIN),
            Value::float(-0.0),
            Value::float(3.5),
            Value::symbol(&b"hello"[..]),
            Value::string(&b"a string"[..]),
        ] {
            let bytes = encode(&v);
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn test_encode_decode_roundtrip_lists() {
        let small = Value::list(vec![Value::Integer(1), Value::Integer(2)]);
        let large = Value::list((0..20).map(Value::Integer).collect());
        let nested = Value::list(vec![
            Value::symbol(&b"a"[..]),
            Value::list(vec![Value::symbol(&b"b"[..]), Value::Integer(1)]),
        ]);
        for v in [small, large, nested] {
            let bytes = encode(&v);
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn test_short_long_string_boundary() {
        let short = Value::string(vec![b'x'; 31]);
        let long = Value::string(vec![b'x'; 32]);
        assert_eq!(decode(&encode(&short)).unwrap(), short);
        assert_eq!(decode(&encode(&long)).unwrap(), long);
    }

    #[test]
    fn test_small_large_list_boundary() {
        let small = Value::list(vec![Value::Integer(1); tunables::SMALL_LIST_MAX]);
        let large = Value::list(vec![Value::Integer(1); tunables::SMALL_LIST_MAX + 1]);
        assert_eq!(decode(&encode(&small)).unwrap(), small);
        assert_eq!(decode(&encode(&large)).unwrap(), large);
    }

    #[test]
    fn test_extract_child_reuses_header() {
        let v = Value::list(vec![
            Value::symbol(&b"a"[..]),
            Value::symbol(&b"b"[..]),
            Value::symbol(&b"c"[..]),
        ]);
        let bytes = encode(&v);
        let (doc, cursor) = Document::parse(&bytes).unwrap();
        let (list_view, _) = cursor.read_element().unwrap();
        let child = match list_view {
            crate::cursor::ElementView::List(l) => l.child(1).unwrap().unwrap(),
            _ => panic!("expected list"),
        };
        let child_len = child.skip_element().unwrap();
        let child_bytes = &child.bytes()[..child_len];
        let extracted = extract_child(&doc, child_bytes);
        let decoded = decode(&extracted).unwrap();
        assert_eq!(decoded, Value::symbol(&b"b"[..]));
    }
}
