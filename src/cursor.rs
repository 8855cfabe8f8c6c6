//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The zero-copy read cursor.
//!
//! Rather than walking a value via bare byte pointers (the reference
//! implementation's approach, deliberately re-architected per the design
//! notes), every read goes through typed primitives here: `read_tag`,
//! `read_varint`, `skip_element`, `child_bounds`. Bounds are checked
//! centrally; any violation becomes a data-corruption `Error`, never a panic
//! or unchecked slice index.

use std::convert::TryInto;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::layout::{self, Kind, SEntryKind};
use crate::tunables;
use crate::varint;

/// A parsed view of a value's symbol table. Tables of `SMALL_SYMTAB_SIZE` or
/// fewer entries live in a fixed-size inline array to avoid a heap allocation
/// per decode; larger tables spill to a `Vec`.
#[derive(Clone, Debug)]
pub enum SymbolTable<'a> {
    Stack([&'a [u8]; tunables::SMALL_SYMTAB_SIZE], usize),
    Heap(Vec<&'a [u8]>),
}

impl<'a> SymbolTable<'a> {
    fn new() -> Self {
        SymbolTable::Stack([&[][..]; tunables::SMALL_SYMTAB_SIZE], 0)
    }

    fn push(&mut self, symbol: &'a [u8]) {
        match self {
            SymbolTable::Stack(arr, len) => {
                if *len < tunables::SMALL_SYMTAB_SIZE {
                    arr[*len] = symbol;
                    *len += 1;
                } else {
                    let mut heap: Vec<&'a [u8]> = arr[..*len].to_vec();
                    heap.push(symbol);
                    *self = SymbolTable::Heap(heap);
                }
            }
            SymbolTable::Heap(v) => v.push(symbol),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SymbolTable::Stack(_, len) => *len,
            SymbolTable::Heap(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        match self {
            SymbolTable::Stack(arr, len) => {
                if index < *len {
                    Ok(arr[index])
                } else {
                    Err(Error::InvalidSymbolReference)
                }
            }
            SymbolTable::Heap(v) => v.get(index).copied().ok_or(Error::InvalidSymbolReference),
        }
    }
}

/// A parsed document: the version, symbol table, and the byte range of the
/// root element, all borrowed from the original buffer.
#[derive(Clone, Debug)]
pub struct Document<'a> {
    pub version: u8,
    pub symbols: SymbolTable<'a>,
    /// The full input buffer (used by extraction's header-reuse fast path).
    pub full_buf: &'a [u8],
    /// Byte offset of the header, i.e. everything before the root element.
    pub header_len: usize,
}

impl<'a> Document<'a> {
    /// Parses the container header (version + symbol table) and returns a
    /// `Document` plus a `Cursor` positioned at the root element.
    pub fn parse(buf: &'a [u8]) -> Result<(Document<'a>, Cursor<'a>)> {
        if buf.is_empty() {
            return Err(Error::UnexpectedEof);
        }
        let version = buf[0];
        if version > tunables::FORMAT_VERSION {
            debug!(
                "decode: stored version {} newer than supported version {}",
                version,
                tunables::FORMAT_VERSION
            );
            return Err(Error::UnsupportedVersion(version));
        }
        if version < tunables::FORMAT_VERSION {
            trace!("decode: stored version {} older than current {}", version, tunables::FORMAT_VERSION);
        }
        let mut pos = 1usize;
        let (symbol_count, len) = varint::decode_u64(&buf[pos..])?;
        pos += len;
        if symbol_count as usize > tunables::MAX_SYMBOLS {
            return Err(Error::TooManySymbols);
        }

        let mut symbols = SymbolTable::new();
        for _ in 0..symbol_count {
            let (sym_len, len) = varint::decode_u64(&buf[pos..])?;
            pos += len;
            let sym_len = sym_len as usize;
            let end = pos
                .checked_add(sym_len)
                .ok_or(Error::OffsetOutOfBounds)?;
            if end > buf.len() {
                return Err(Error::UnexpectedEof);
            }
            symbols.push(&buf[pos..end]);
            pos = end;
        }

        let document = Document {
            version,
            symbols,
            full_buf: buf,
            header_len: pos,
        };
        let cursor = Cursor {
            bytes: &buf[pos..],
            symbols: document.symbols.clone(),
        };
        Ok((document, cursor))
    }
}

/// A view of a decoded element's content, with any sub-structure left
/// unexpanded (lists hold a `ListView` rather than fully materialized
/// children) so that reading an element never does more work than asked.
#[derive(Clone, Debug)]
pub enum ElementView<'a> {
    Nil,
    Integer(i64),
    Float(f64),
    Symbol(&'a [u8]),
    String(&'a [u8]),
    List(ListView<'a>),
}

#[derive(Clone, Debug)]
pub enum ListView<'a> {
    Small {
        count: usize,
        /// Byte offset, from the start of the list element, at which the
        /// first child begins.
        children_start: usize,
        buf: &'a [u8],
        symbols: SymbolTable<'a>,
    },
    Large {
        count: usize,
        structural_hash: u32,
        /// Raw bytes of the `u32 × count` entries array.
        entries: &'a [u8],
        /// Byte offset, from the start of the list element, of the element-
        /// data region (immediately after the entries array).
        data_start: usize,
        buf: &'a [u8],
        symbols: SymbolTable<'a>,
    },
}

impl<'a> ListView<'a> {
    pub fn count(&self) -> usize {
        match self {
            ListView::Small { count, .. } => *count,
            ListView::Large { count, .. } => *count,
        }
    }

    /// O(1) for large lists (direct entry lookup); O(i) for small lists
    /// (bounded by `SMALL_LIST_MAX`, so this is still cheap in practice).
    pub fn child(&self, index: usize) -> Result<Option<Cursor<'a>>> {
        if index >= self.count() {
            return Ok(None);
        }
        match self {
            ListView::Small {
                children_start,
                buf,
                symbols,
                ..
            } => {
                let mut offset = *children_start;
                for _ in 0..index {
                    let (_, len) = read_element(&buf[offset..], symbols)?;
                    offset += len;
                }
                Ok(Some(Cursor {
                    bytes: &buf[offset..],
                    symbols: symbols.clone(),
                }))
            }
            ListView::Large {
                entries,
                data_start,
                buf,
                symbols,
                ..
            } => {
                let entry_bytes = &entries[index * 4..index * 4 + 4];
                let raw = u32::from_le_bytes(entry_bytes.try_into().unwrap());
                let (_, offset) = layout::unpack_entry(raw)?;
                let start = data_start
                    .checked_add(offset as usize)
                    .ok_or(Error::OffsetOutOfBounds)?;
                if start > buf.len() {
                    return Err(Error::OffsetOutOfBounds);
                }
                Ok(Some(Cursor {
                    bytes: &buf[start..],
                    symbols: symbols.clone(),
                }))
            }
        }
    }

    /// The SEntry type code of a large list's child, without following the
    /// offset — an O(1) type probe. Returns `None` for small lists, which
    /// carry no such index (callers fall back to reading the child's tag).
    pub fn child_kind_hint(&self, index: usize) -> Option<SEntryKind> {
        match self {
            ListView::Large { entries, count, .. } => {
                if index >= *count {
                    return None;
                }
                let entry_bytes = &entries[index * 4..index * 4 + 4];
                let raw = u32::from_le_bytes(entry_bytes.try_into().unwrap());
                layout::unpack_entry(raw).ok().map(|(kind, _)| kind)
            }
            ListView::Small { .. } => None,
        }
    }

    pub fn structural_hash_hint(&self) -> Option<u32> {
        match self {
            ListView::Large {
                structural_hash, ..
            } => Some(*structural_hash),
            ListView::Small { .. } => None,
        }
    }

    pub fn children(&self) -> Result<Vec<Cursor<'a>>> {
        (0..self.count())
            .map(|i| self.child(i).map(|c| c.unwrap()))
            .collect()
    }
}

/// A read position at the start of a single element.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    /// Suffix of the value's bytes starting exactly at this element's tag
    /// byte. May extend past the element's own end (e.g. when positioned at
    /// a sibling in a sequence); callers only ever read what `read_element`
    /// tells them the element occupies.
    bytes: &'a [u8],
    pub symbols: SymbolTable<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8], symbols: SymbolTable<'a>) -> Self {
        Cursor { bytes, symbols }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn read_tag(&self) -> Result<(Kind, u8)> {
        let byte = *self.bytes.first().ok_or(Error::UnexpectedEof)?;
        Ok((Kind::from_tag_byte(byte), Kind::payload_bits(byte)))
    }

    pub fn kind(&self) -> Result<Kind> {
        self.read_tag().map(|(k, _)| k)
    }

    pub fn is_nil(&self) -> Result<bool> {
        Ok(self.kind()? == Kind::Nil)
    }

    pub fn is_list(&self) -> Result<bool> {
        Ok(matches!(self.kind()?, Kind::Nil | Kind::List))
    }

    /// Decodes this element, returning its content view and total byte length.
    pub fn read_element(&self) -> Result<(ElementView<'a>, usize)> {
        read_element(self.bytes, &self.symbols)
    }

    /// Skips past this element without decoding its content, returning the
    /// number of bytes it occupies.
    pub fn skip_element(&self) -> Result<usize> {
        self.read_element().map(|(_, len)| len)
    }

    /// O(1) access to a list's `index`-th child, via `ListView::child`. Fails
    /// with `NotAList` if this element is an atom.
    pub fn child_bounds(&self, index: usize) -> Result<Option<Cursor<'a>>> {
        match self.read_element()?.0 {
            ElementView::List(view) => view.child(index),
            ElementView::Nil => Ok(None),
            _ => Err(Error::NotAList),
        }
    }
}

/// Decodes the element at the front of `bytes`, resolving any symbol
/// reference through `symbols`. Returns the view and the number of bytes
/// consumed by the element (tag byte included).
pub fn read_element<'a>(
    bytes: &'a [u8],
    symbols: &SymbolTable<'a>,
) -> Result<(ElementView<'a>, usize)> {
    let tag = *bytes.first().ok_or(Error::UnexpectedEof)?;
    let kind = Kind::from_tag_byte(tag);
    let payload = Kind::payload_bits(tag);

    match kind {
        Kind::Nil => Ok((ElementView::Nil, 1)),
        Kind::SmallInt => {
            let value = payload as i64 - layout::SMALL_INT_BIAS;
            Ok((ElementView::Integer(value), 1))
        }
        Kind::Integer => {
            let (value, len) = varint::decode_i64(&bytes[1..])?;
            Ok((ElementView::Integer(value), 1 + len))
        }
        Kind::Float => {
            if bytes.len() < 9 {
                return Err(Error::UnexpectedEof);
            }
            let raw: [u8; 8] = bytes[1..9].try_into().unwrap();
            let value = f64::from_ne_bytes(raw);
            Ok((ElementView::Float(value), 9))
        }
        Kind::Symbol => {
            let (index, len) = varint::decode_u64(&bytes[1..])?;
            let text = symbols.get(index as usize)?;
            Ok((ElementView::Symbol(text), 1 + len))
        }
        Kind::ShortString => {
            let str_len = payload as usize;
            let end = 1usize
                .checked_add(str_len)
                .ok_or(Error::OffsetOutOfBounds)?;
            if end > bytes.len() {
                return Err(Error::UnexpectedEof);
            }
            Ok((ElementView::String(&bytes[1..end]), end))
        }
        Kind::LongString => {
            let (str_len, len) = varint::decode_u64(&bytes[1..])?;
            let str_len = str_len as usize;
            let data_start = 1 + len;
            let end = data_start
                .checked_add(str_len)
                .ok_or(Error::OffsetOutOfBounds)?;
            if end > bytes.len() {
                return Err(Error::UnexpectedEof);
            }
            Ok((ElementView::String(&bytes[data_start..end]), end))
        }
        Kind::List => {
            if payload != 0 {
                // Small list: [tag|count][payload_size:varint][children...]
                let count = payload as usize;
                let (payload_size, len) = varint::decode_u64(&bytes[1..])?;
                let children_start = 1 + len;
                let total = children_start
                    .checked_add(payload_size as usize)
                    .ok_or(Error::OffsetOutOfBounds)?;
                if total > bytes.len() {
                    return Err(Error::UnexpectedEof);
                }
                Ok((
                    ElementView::List(ListView::Small {
                        count,
                        children_start,
                        buf: bytes,
                        symbols: symbols.clone(),
                    }),
                    total,
                ))
            } else {
                // Large list: [tag|0][count:u32][hash:u32][entries:u32*count][data...]
                if bytes.len() < 9 {
                    return Err(Error::UnexpectedEof);
                }
                let count = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
                let structural_hash = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
                let entries_start = 9usize;
                let entries_len = count
                    .checked_mul(4)
                    .ok_or(Error::ListDataTooLarge)?;
                let data_start = entries_start
                    .checked_add(entries_len)
                    .ok_or(Error::ListDataTooLarge)?;
                if data_start > bytes.len() {
                    return Err(Error::UnexpectedEof);
                }
                let entries = &bytes[entries_start..data_start];

                // Determine the total length by finding the furthest extent
                // among the entries' offsets plus their own element lengths.
                // We don't know individual child lengths without decoding, so
                // conservatively decode each child's length once to find the
                // end of the element-data region. This stays O(count) and
                // O(1) per already-known offset (no nested re-scan).
                let mut max_end = data_start;
                for i in 0..count {
                    let raw =
                        u32::from_le_bytes(entries[i * 4..i * 4 + 4].try_into().unwrap());
                    let (_, offset) = layout::unpack_entry(raw)?;
                    let start = data_start
                        .checked_add(offset as usize)
                        .ok_or(Error::OffsetOutOfBounds)?;
                    if start > bytes.len() {
                        return Err(Error::OffsetOutOfBounds);
                    }
                    let (_, child_len) = read_element(&bytes[start..], symbols)?;
                    max_end = max_end.max(start + child_len);
                }

                Ok((
                    ElementView::List(ListView::Large {
                        count,
                        structural_hash,
                        entries,
                        data_start,
                        buf: bytes,
                        symbols: symbols.clone(),
                    }),
                    max_end,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::value::Value;

    #[test]
    fn test_parse_nil() {
        let bytes = builder::encode(&Value::Nil);
        let (_doc, cursor) = Document::parse(&bytes).unwrap();
        assert!(cursor.is_nil().unwrap());
    }

    #[test]
    fn test_parse_small_list_children() {
        let v = Value::list(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        let bytes = builder::encode(&v);
        let (_doc, cursor) = Document::parse(&bytes).unwrap();
        let (view, _len) = cursor.read_element().unwrap();
        match view {
            ElementView::List(list) => {
                assert_eq!(list.count(), 3);
                let (child, _) = list.child(1).unwrap().unwrap().read_element().unwrap();
                match child {
                    ElementView::Integer(2) => {}
                    other => panic!("unexpected child {:?}", other),
                }
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_parse_large_list_children() {
        let children: Vec<Value> = (0..10).map(Value::Integer).collect();
        let v = Value::list(children);
        let bytes = builder::encode(&v);
        let (_doc, cursor) = Document::parse(&bytes).unwrap();
        let (view, _len) = cursor.read_element().unwrap();
        match view {
            ElementView::List(list) => {
                assert_eq!(list.count(), 10);
                let (child, _) = list.child(7).unwrap().unwrap().read_element().unwrap();
                match child {
                    ElementView::Integer(7) => {}
                    other => panic!("unexpected child {:?}", other),
                }
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = builder::encode(&Value::Nil);
        bytes[0] = tunables::FORMAT_VERSION + 1;
        assert_eq!(
            Document::parse(&bytes).unwrap_err(),
            Error::UnsupportedVersion(tunables::FORMAT_VERSION + 1)
        );
    }
}
