//! Minimal PDF object model (ISO 32000-1:2008 §7.3).
//!
//! Only the object kinds the reconstruction pipeline actually touches are
//! modeled: we need dictionaries, arrays, names, strings and numbers to
//! walk the page tree and decode content streams, not the full breadth of
//! annotation/form/signature dictionaries a general-purpose PDF editor
//! would need.

use std::collections::HashMap;

/// An indirect object reference, `N G R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number.
    pub number: u32,
    /// Generation number.
    pub generation: u16,
}

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// An integer numeric object.
    Integer(i64),
    /// A real numeric object.
    Real(f64),
    /// A literal or hex string, already unescaped.
    String(Vec<u8>),
    /// A `/Name`.
    Name(String),
    /// An array of objects.
    Array(Vec<Object>),
    /// A dictionary.
    Dict(HashMap<String, Object>),
    /// A stream: its dictionary plus raw (still-encoded) bytes.
    Stream(HashMap<String, Object>, Vec<u8>),
    /// An indirect reference.
    Reference(ObjectRef),
}

impl Object {
    /// View this object as a number, coercing `Integer` to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Integer(n) => Some(*n as f64),
            Object::Real(n) => Some(*n),
            _ => None,
        }
    }

    /// View this object as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(n) => Some(*n),
            Object::Real(n) => Some(*n as i64),
            _ => None,
        }
    }

    /// View this object as a dictionary (a bare dict or a stream's dict).
    pub fn as_dict(&self) -> Option<&HashMap<String, Object>> {
        match self {
            Object::Dict(dict) => Some(dict),
            Object::Stream(dict, _) => Some(dict),
            _ => None,
        }
    }

    /// View this object as an array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    /// View this object as a name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(name) => Some(name),
            _ => None,
        }
    }

    /// View this object as an indirect reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coerces_to_f64() {
        assert_eq!(Object::Integer(42).as_f64(), Some(42.0));
    }

    #[test]
    fn real_is_not_an_integer() {
        assert_eq!(Object::Real(1.5).as_i64(), Some(1));
    }

    #[test]
    fn stream_exposes_its_dict() {
        let mut dict = HashMap::new();
        dict.insert("Length".to_string(), Object::Integer(10));
        let stream = Object::Stream(dict, vec![0u8; 10]);
        assert!(stream.as_dict().unwrap().contains_key("Length"));
    }
}
