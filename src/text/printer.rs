//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Renders a [`Value`] back into the textual grammar [`super::parser`]
//! accepts. Floats print via Rust's `Debug` formatting, which always emits
//! the shortest decimal that round-trips back to the same `f64` — exactly
//! the property a canonical printer needs and simpler than hand-rolling a
//! Grisu/Ryu-style formatter.

use crate::value::Value;

/// Prints `value` in canonical textual form.
pub fn print(value: &Value) -> String {
    let mut out = String::new();
    print_into(value, &mut out);
    out
}

fn print_into(value: &Value, out: &mut String) {
    match value {
        Value::Nil => out.push_str("()"),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&format!("{:?}", f.into_inner())),
        Value::Symbol(text) => out.push_str(&String::from_utf8_lossy(text)),
        Value::String(content) => print_string(content, out),
        Value::List(children) => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                print_into(child, out);
            }
            out.push(')');
        }
    }
}

fn print_string(content: &[u8], out: &mut String) {
    out.push('"');
    // Decode as UTF-8 (lossily for any non-UTF-8 content the binary layer's
    // unconstrained byte strings could in principle hold) rather than mapping
    // each raw byte to a `char`, which would split multi-byte sequences and
    // corrupt anything outside ASCII.
    for ch in String::from_utf8_lossy(content).chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parser::parse;

    fn sym(s: &str) -> Value {
        Value::symbol(s.as_bytes())
    }

    #[test]
    fn test_print_roundtrips_through_parse() {
        let v = Value::list(vec![
            sym("user"),
            Value::list(vec![sym("name"), Value::string(&b"alice"[..])]),
            Value::list(vec![sym("age"), Value::Integer(30)]),
        ]);
        let text = print(&v);
        assert_eq!(parse(&text).unwrap(), v);
    }

    #[test]
    fn test_print_nil() {
        assert_eq!(print(&Value::Nil), "()");
    }

    #[test]
    fn test_print_escapes_string() {
        let v = Value::string(b"a\"b\nc".to_vec());
        assert_eq!(print(&v), "\"a\\\"b\\nc\"");
    }

    #[test]
    fn test_print_string_preserves_multibyte_utf8() {
        let v = Value::string("café".as_bytes().to_vec());
        let text = print(&v);
        assert_eq!(parse(&text).unwrap(), v);
    }

    #[test]
    fn test_print_float_round_trips() {
        let v = Value::float(0.1);
        let text = print(&v);
        assert_eq!(parse(&text).unwrap(), v);
    }
}
