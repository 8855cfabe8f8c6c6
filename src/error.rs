//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std;
use std::fmt::{self, Display};

use serde::{de, ser};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing, decoding, or operating on S-expression values.
///
/// Variants group, in spirit, into the taxonomy from the design notes: user-visible
/// parse/limit/type errors versus fatal data-corruption and internal-invariant
/// errors. No variant here is recoverable by retrying the same operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Constructed from serialization and deserialization errors.
    Message(String),

    // --- Invalid text (parser) ---
    /// A list was opened but never closed.
    UnterminatedList,
    /// A string literal was opened but never closed.
    UnterminatedString,
    /// Non-whitespace content followed the root expression.
    TrailingGarbage,
    /// An atom was expected but an empty token was found between delimiters.
    EmptyAtom,
    /// The input did not contain a value at all.
    EmptyInput,

    // --- Limit exceeded ---
    /// Parser nesting exceeded `tunables::MAX_DEPTH`.
    MaxDepthExceeded,
    /// More distinct symbols were interned than `tunables::MAX_SYMBOLS` allows.
    TooManySymbols,
    /// A list-entry offset did not fit in 28 bits, or a list exceeded 256 MiB of
    /// element data.
    ListDataTooLarge,
    /// A varint's continuation bits implied a shift of 64 bits or more.
    VarintOverflow,

    // --- Datatype mismatch ---
    /// `car`/`cdr` was applied to a value that is neither NIL nor a list.
    NotAList,
    /// An operation that must return a result found none (out-of-range `nth`, etc).
    IndexOutOfRange,

    // --- Data corruption (fatal, unrecoverable) ---
    /// The version byte is newer than this crate understands.
    UnsupportedVersion(u8),
    /// A tag byte did not correspond to any known element kind.
    InvalidTag(u8),
    /// A symbol reference pointed outside the local symbol table.
    InvalidSymbolReference,
    /// A list entry's offset pointed outside its element-data region.
    OffsetOutOfBounds,
    /// A varint was truncated before its continuation bit cleared.
    TruncatedVarint,
    /// The input ended before the expected number of bytes were available.
    UnexpectedEof,
    /// A string was not valid UTF-8 where the caller required text (the binary
    /// layer itself is UTF-8-unconstrained per spec; this only fires when printing).
    InvalidUtf8,

    // --- Internal invariant ---
    /// A large list's stored structural hash did not match its children under
    /// strict verification (only produced by code paths that opt into
    /// re-verifying; not checked on every ordinary read).
    StructuralHashMismatch,
    /// A decode loop reached the end of its input before exhausting a stored count.
    CountNotExhausted,

    // --- Cancellation ---
    /// A host-supplied `Interrupt` reported cancellation mid-scan.
    Cancelled,
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(msg) =>
                formatter.write_str(msg),
            Error::UnterminatedList =>
                formatter.write_str("unterminated list"),
            Error::UnterminatedString =>
                formatter.write_str("unterminated string literal"),
            Error::TrailingGarbage =>
                formatter.write_str("trailing non-whitespace content after root expression"),
            Error::EmptyAtom =>
                formatter.write_str("empty atom between delimiters"),
            Error::EmptyInput =>
                formatter.write_str("no value found in input"),
            Error::MaxDepthExceeded =>
                formatter.write_str("nesting depth exceeds the configured maximum"),
            Error::TooManySymbols =>
                formatter.write_str("number of interned symbols exceeds the configured maximum"),
            Error::ListDataTooLarge =>
                formatter.write_str("list element data exceeds the 28-bit offset / 256 MiB bound"),
            Error::VarintOverflow =>
                formatter.write_str("varint decode exceeded 64 bits of shift"),
            Error::NotAList =>
                formatter.write_str("car/cdr requires a list or NIL"),
            Error::IndexOutOfRange =>
                formatter.write_str("index out of range"),
            Error::UnsupportedVersion(v) =>
                write!(formatter, "unsupported format version {}", v),
            Error::InvalidTag(t) =>
                write!(formatter, "invalid element tag byte {:#04x}", t),
            Error::InvalidSymbolReference =>
                formatter.write_str("symbol reference outside local symbol table"),
            Error::OffsetOutOfBounds =>
                formatter.write_str("list entry offset outside element-data region"),
            Error::TruncatedVarint =>
                formatter.write_str("varint truncated before continuation bit cleared"),
            Error::UnexpectedEof =>
                formatter.write_str("unexpected end of input"),
            Error::InvalidUtf8 =>
                formatter.write_str("content is not valid UTF-8"),
            Error::StructuralHashMismatch =>
                formatter.write_str("stored structural hash does not match recomputed hash"),
            Error::CountNotExhausted =>
                formatter.write_str("reached end of input before stored count was exhausted"),
            Error::Cancelled =>
                formatter.write_str("operation cancelled by host interrupt check"),
        }
    }
}

impl std::error::Error for Error {}
