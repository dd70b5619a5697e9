//! PDF object serialization.
//!
//! Output is deterministic: dictionary keys are written in sorted order and
//! reals use a fixed precision, so equal payloads always give equal bytes.

use crate::object::{Dictionary, Object, ObjectRef};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging and tests).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, r: ObjectRef, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", r.id, r.gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => write_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => w.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    fn write_array(&self, w: &mut Vec<u8>, arr: &[Object]) {
        w.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.push(b' ');
            }
            self.write_object(w, obj);
        }
        w.push(b']');
    }

    fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dictionary) {
        w.extend_from_slice(b"<<");

        let mut keys: Vec<&String> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if self.compact {
                w.push(b' ');
            } else {
                w.extend_from_slice(b"\n  ");
            }
            write_name(w, key);
            w.push(b' ');
            self.write_object(w, &dict[key]);
        }

        if self.compact {
            w.push(b' ');
        } else if !dict.is_empty() {
            w.push(b'\n');
        }
        w.extend_from_slice(b">>");
    }

    /// `Length` always reflects the data actually written.
    fn write_stream(&self, w: &mut Vec<u8>, dict: &Dictionary, data: &[u8]) {
        let mut dict = dict.clone();
        dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
        self.write_dictionary(w, &dict);
        w.extend_from_slice(b"\nstream\n");
        w.extend_from_slice(data);
        w.extend_from_slice(b"\nendstream");
    }
}

/// Up to five decimals, trailing zeros trimmed; whole numbers print as integers.
fn write_real(w: &mut Vec<u8>, value: f64) {
    if !value.is_finite() {
        log::warn!("Non-finite real {} written as 0", value);
        w.push(b'0');
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        w.extend_from_slice((value as i64).to_string().as_bytes());
    } else {
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        let trimmed = if trimmed == "-0" { "0" } else { trimmed };
        w.extend_from_slice(trimmed.as_bytes());
    }
}

/// Literal syntax for printable text, hex syntax for anything else.
fn write_string(w: &mut Vec<u8>, data: &[u8]) {
    let printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if printable {
        w.push(b'(');
        for &byte in data {
            match byte {
                b'(' => w.extend_from_slice(b"\\("),
                b')' => w.extend_from_slice(b"\\)"),
                b'\\' => w.extend_from_slice(b"\\\\"),
                b'\n' => w.extend_from_slice(b"\\n"),
                b'\r' => w.extend_from_slice(b"\\r"),
                b'\t' => w.extend_from_slice(b"\\t"),
                _ => w.push(byte),
            }
        }
        w.push(b')');
    } else {
        w.push(b'<');
        for byte in data {
            w.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        w.push(b'>');
    }
}

/// Names escape delimiters, `#`, whitespace and non-ASCII bytes as `#xx`.
fn write_name(w: &mut Vec<u8>, name: &str) {
    w.push(b'/');
    for byte in name.bytes() {
        match byte {
            b'!'..=b'~'
                if !matches!(
                    byte,
                    b'#' | b'%' | b'(' | b')' | b'/' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
                ) =>
            {
                w.push(byte)
            },
            _ => w.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
        }
    }
}

/// Helper to create a name object.
pub fn name(s: &str) -> Object {
    Object::Name(s.to_string())
}

/// Helper to create a text string object.
pub fn string(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec())
}

/// Helper to create an integer object.
pub fn integer(i: i64) -> Object {
    Object::Integer(i)
}

/// Helper to create a real object.
pub fn real(r: f64) -> Object {
    Object::Real(r)
}

/// Helper to create a reference object.
pub fn reference(r: ObjectRef) -> Object {
    Object::Reference(r)
}

/// Helper to create a dictionary from pairs.
pub fn dict(pairs: Vec<(&str, Object)>) -> Object {
    Object::Dictionary(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Helper to create a `[llx lly urx ury]` rectangle.
pub fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
    Object::Array(vec![real(llx), real(lly), real(urx), real(ury)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    #[test]
    fn test_serialize_primitives() {
        let s = ObjectSerializer::compact();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(false)), "false");
        assert_eq!(s.serialize_to_string(&Object::Integer(-3)), "-3");
        assert_eq!(s.serialize_to_string(&real(2.0)), "2");
        assert_eq!(s.serialize_to_string(&real(0.125)), "0.125");
        assert_eq!(s.serialize_to_string(&real(1.0 / 3.0)), "0.33333");
        assert_eq!(s.serialize_to_string(&real(-0.000001)), "0");
    }

    #[test]
    fn test_serialize_strings() {
        let s = ObjectSerializer::compact();
        assert_eq!(s.serialize_to_string(&string("a(b)\\")), "(a\\(b\\)\\\\)");
        assert_eq!(s.serialize_to_string(&Object::String(vec![0xFE, 0xFF])), "<FEFF>");
    }

    #[test]
    fn test_serialize_names() {
        let s = ObjectSerializer::compact();
        assert_eq!(s.serialize_to_string(&name("Type")), "/Type");
        assert_eq!(s.serialize_to_string(&name("A B")), "/A#20B");
        assert_eq!(s.serialize_to_string(&name("a/b#")), "/a#2Fb#23");
    }

    #[test]
    fn test_dictionary_keys_sorted() {
        let s = ObjectSerializer::compact();
        let d = dict(vec![("Type", name("Page")), ("Annots", Object::Array(vec![]))]);
        assert_eq!(s.serialize_to_string(&d), "<< /Annots [] /Type /Page >>");
    }

    #[test]
    fn test_stream_length_is_rewritten() {
        let s = ObjectSerializer::new();
        let mut d = Dictionary::new();
        d.insert("Length".to_string(), integer(999));
        let stream = Object::Stream {
            dict: d,
            data: bytes::Bytes::from_static(b"q Q"),
        };
        let out = s.serialize_to_string(&stream);
        assert!(out.contains("/Length 3"));
        assert!(out.ends_with("stream\nq Q\nendstream"));
    }

    #[test]
    fn test_indirect_output_parses_back() {
        let s = ObjectSerializer::new();
        let d = dict(vec![
            ("Type", name("Catalog")),
            ("Pages", reference(ObjectRef::new(2, 0))),
            ("Lang", string("en-US")),
        ]);
        let bytes = s.serialize_indirect(ObjectRef::new(1, 0), &d);
        assert!(bytes.starts_with(b"1 0 obj\n"));
        assert!(bytes.ends_with(b"\nendobj\n"));

        let (_, parsed) = parse_object(&bytes[8..]).unwrap();
        assert_eq!(parsed, d);
    }
}
