//! PDF object types.
//!
//! [`Object`] is the payload held by every indirect object in the graph. Edges
//! between objects are plain [`Object::Reference`] values, never owning pointers.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{Error, Result};

/// Dictionary payload shared by dictionaries and stream headers.
pub type Dictionary = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data, still encoded
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Shorthand for `Object::Name(name.into())`.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable variant of [`Object::as_dict`].
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Check if object is a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self, Object::Stream { .. })
    }

    /// Look up `key` when this object is a dictionary or a stream.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Every reference this object holds, in the order they appear.
    ///
    /// Dictionary keys are visited in sorted order so the result is stable.
    pub fn references(&self) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(obj) = stack.pop() {
            match obj {
                Object::Reference(r) => out.push(*r),
                Object::Array(items) => stack.extend(items.iter().rev()),
                Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                    let mut keys: Vec<&String> = dict.keys().collect();
                    keys.sort();
                    for key in keys.into_iter().rev() {
                        stack.push(&dict[key]);
                    }
                },
                _ => {},
            }
        }
        out
    }

    /// Filter names of a stream, in application order.
    pub fn filter_names(&self) -> Vec<String> {
        self.get("Filter").map(extract_filter_names).unwrap_or_default()
    }

    /// Decode stream data.
    ///
    /// Only unfiltered and `FlateDecode` streams are handled; these are the
    /// encodings content streams and XMP packets use in archival files.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { data, .. } => {
                let mut decoded = data.to_vec();
                for filter in self.filter_names() {
                    decoded = match filter.as_str() {
                        "FlateDecode" | "Fl" => inflate(&decoded)?,
                        other => {
                            return Err(Error::Unsupported(format!("stream filter {}", other)))
                        },
                    };
                }
                Ok(decoded)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either:
/// - A single Name (e.g., /FlateDecode)
/// - An Array of Names (e.g., [/ASCII85Decode /FlateDecode])
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::name("Type");
        assert_eq!(obj.as_name(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_object_dictionary() {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::name("Page"));
        let obj = Object::Dictionary(dict);

        assert_eq!(obj.get("Type").and_then(|o| o.as_name()), Some("Page"));
        assert!(obj.get("Missing").is_none());
    }

    #[test]
    fn test_object_stream_dict_access() {
        let mut dict = HashMap::new();
        dict.insert("Length".to_string(), Object::Integer(100));
        let mut obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"stream data"),
        };

        assert_eq!(obj.get("Length").unwrap().as_integer(), Some(100));
        obj.as_dict_mut()
            .unwrap()
            .insert("Filter".to_string(), Object::name("FlateDecode"));
        assert!(obj.is_stream());
        assert_eq!(obj.filter_names(), vec!["FlateDecode"]);
    }

    #[test]
    fn test_object_ref_display() {
        let obj_ref = ObjectRef::new(10, 0);
        assert_eq!(format!("{}", obj_ref), "10 0 R");
        assert_eq!(Object::Reference(obj_ref).as_reference(), Some(obj_ref));
    }

    #[test]
    fn test_object_ref_ordering() {
        let mut refs = vec![ObjectRef::new(3, 0), ObjectRef::new(1, 2), ObjectRef::new(1, 0)];
        refs.sort();
        assert_eq!(refs, vec![ObjectRef::new(1, 0), ObjectRef::new(1, 2), ObjectRef::new(3, 0)]);
    }

    #[test]
    fn test_references_are_collected_in_stable_order() {
        let mut dict = HashMap::new();
        dict.insert("Parent".to_string(), Object::Reference(ObjectRef::new(2, 0)));
        dict.insert(
            "Kids".to_string(),
            Object::Array(vec![
                Object::Reference(ObjectRef::new(5, 0)),
                Object::Reference(ObjectRef::new(4, 0)),
            ]),
        );
        dict.insert("Count".to_string(), Object::Integer(2));
        let obj = Object::Dictionary(dict);

        assert_eq!(
            obj.references(),
            vec![ObjectRef::new(5, 0), ObjectRef::new(4, 0), ObjectRef::new(2, 0)]
        );
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let obj = Object::Stream {
            dict: HashMap::new(),
            data: bytes::Bytes::from_static(b"Hello"),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_flate() {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"q 1 0 0 1 0 0 cm Q").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::name("FlateDecode"));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from(compressed),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::name("DCTDecode"));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"\xff\xd8"),
        };
        assert!(matches!(obj.decode_stream_data(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let obj = Object::Integer(42);
        match obj.decode_stream_data() {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            _ => panic!("Expected InvalidObjectType error"),
        }
    }

    #[test]
    fn test_extract_filter_names_array() {
        let filter = Object::Array(vec![
            Object::name("ASCII85Decode"),
            Object::name("FlateDecode"),
        ]);
        assert_eq!(extract_filter_names(&filter), vec!["ASCII85Decode", "FlateDecode"]);
        assert!(extract_filter_names(&Object::Integer(42)).is_empty());
    }
}
