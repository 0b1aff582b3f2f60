//! PDF object types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A PDF dictionary.
///
/// Keyed by name (without the leading `/`). Insertion order is preserved so
/// that serialization is reproducible byte-for-byte.
pub type Dictionary = IndexMap<String, Object>;

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
    /// Name (starting with /)
    Name(String),
    /// Text string; re-encoded as UTF-16BE on output when it leaves the
    /// PDFDocEncoding-compatible range
    String(String),
    /// String rendered in hexadecimal form (file identifiers)
    HexString(Vec<u8>),
    /// Raw byte string rendered as an escaped literal string
    Buffer(Vec<u8>),
    /// Calendar date, serialized in PDF date syntax
    Date(DateTime<Utc>),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs, insertion-ordered)
    Dictionary(Dictionary),
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(_) => "String",
            Object::HexString(_) => "HexString",
            Object::Buffer(_) => "Buffer",
            Object::Date(_) => "Date",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
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

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
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

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to text string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to raw bytes. Works for both hex strings and buffers.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::HexString(b) | Object::Buffer(b) => Some(b),
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

    /// Try to cast to dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
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

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

/// Helper constructors for building object trees.
impl Object {
    /// Create a Name object.
    pub fn name(name: impl Into<String>) -> Object {
        Object::Name(name.into())
    }

    /// Create a text String object.
    pub fn string(text: impl Into<String>) -> Object {
        Object::String(text.into())
    }

    /// Create a Buffer object from raw bytes.
    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Object {
        Object::Buffer(bytes.into())
    }

    /// Create a hex-rendered string object.
    pub fn hex_string(bytes: impl Into<Vec<u8>>) -> Object {
        Object::HexString(bytes.into())
    }

    /// Create a Date object.
    pub fn date(date: DateTime<Utc>) -> Object {
        Object::Date(date)
    }

    /// Create a Reference object.
    pub fn reference(r: ObjectRef) -> Object {
        Object::Reference(r)
    }

    /// Build a dictionary from an entry list, preserving the given order.
    pub fn dict(entries: Vec<(&str, Object)>) -> Dictionary {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::Integer(value as i64)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<ObjectRef> for Object {
    fn from(value: ObjectRef) -> Self {
        Object::Reference(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Object::Array(value)
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::Dictionary(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
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
    fn test_object_string() {
        let obj = Object::string("Hello");
        assert_eq!(obj.as_string(), Some("Hello"));
        assert_eq!(obj.type_name(), "String");
    }

    #[test]
    fn test_object_bytes() {
        let hex = Object::hex_string(vec![0xAB, 0xCD]);
        let buf = Object::buffer(b"raw".to_vec());
        assert_eq!(hex.as_bytes(), Some(&[0xAB, 0xCD][..]));
        assert_eq!(buf.as_bytes(), Some(&b"raw"[..]));
    }

    #[test]
    fn test_object_array() {
        let obj = Object::Array(vec![Object::Integer(1), Object::Integer(2)]);
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0].as_integer(), Some(1));
    }

    #[test]
    fn test_dictionary_preserves_insertion_order() {
        let dict = Object::dict(vec![
            ("Zebra", Object::Integer(1)),
            ("Apple", Object::Integer(2)),
            ("Mango", Object::Integer(3)),
        ]);
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zebra", "Apple", "Mango"]);
    }

    #[test]
    fn test_object_reference() {
        let obj_ref = ObjectRef::new(10, 0);
        let obj = Object::Reference(obj_ref);
        assert_eq!(obj.as_reference(), Some(obj_ref));
        assert_eq!(format!("{}", obj_ref), "10 0 R");
    }

    #[test]
    fn test_object_ref_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ObjectRef::new(1, 0));
        set.insert(ObjectRef::new(2, 0));
        set.insert(ObjectRef::new(1, 0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Object::from(7i64), Object::Integer(7));
        assert_eq!(Object::from(true), Object::Boolean(true));
        assert_eq!(Object::from(1.5f64), Object::Real(1.5));
    }
}
