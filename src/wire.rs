//! Wire value domain: what the transport hands us before hydration.
//!
//! `TaggedValue` is closed: scalars, lists, maps and one recursive
//! `Structure` kind. Everything richer (nodes, paths, temporal types) is a
//! structure with a one-byte tag, interpreted by the hydrator.

use std::collections::HashMap;

use bytes::Bytes;

/// Structure tag for a node: `(id, labels, properties)`.
pub const NODE: u8 = b'N';
/// Structure tag for a relationship: `(id, start_id, end_id, type, properties)`.
pub const RELATIONSHIP: u8 = b'R';
/// Structure tag for an unbound relationship inside a path: `(id, type, properties)`.
pub const UNBOUND_RELATIONSHIP: u8 = b'r';
/// Structure tag for a path: `(nodes, unbound_relationships, sequence)`.
pub const PATH: u8 = b'P';

/// A decoded-but-not-hydrated wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Bytes),
    List(Vec<TaggedValue>),
    Map(HashMap<String, TaggedValue>),
    Structure(Structure),
}

/// A tagged structure with positional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub tag: u8,
    pub fields: Vec<TaggedValue>,
}

impl Structure {
    pub fn new(tag: u8, fields: Vec<TaggedValue>) -> Self {
        Self { tag, fields }
    }

    /// Tag rendered as a character, for messages.
    pub fn tag_char(&self) -> char {
        self.tag as char
    }
}

impl TaggedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            TaggedValue::Null => "NULL",
            TaggedValue::Bool(_) => "BOOLEAN",
            TaggedValue::Int(_) => "INTEGER",
            TaggedValue::Float(_) => "FLOAT",
            TaggedValue::String(_) => "STRING",
            TaggedValue::Bytes(_) => "BYTES",
            TaggedValue::List(_) => "LIST",
            TaggedValue::Map(_) => "MAP",
            TaggedValue::Structure(_) => "STRUCTURE",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, TaggedValue::Null) }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TaggedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TaggedValue::Float(f) => Some(*f),
            TaggedValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TaggedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TaggedValue]> {
        match self {
            TaggedValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Build a structure value.
    pub fn structure(tag: u8, fields: Vec<TaggedValue>) -> Self {
        TaggedValue::Structure(Structure::new(tag, fields))
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for TaggedValue { fn from(v: bool) -> Self { TaggedValue::Bool(v) } }
impl From<i32> for TaggedValue { fn from(v: i32) -> Self { TaggedValue::Int(v as i64) } }
impl From<i64> for TaggedValue { fn from(v: i64) -> Self { TaggedValue::Int(v) } }
impl From<f64> for TaggedValue { fn from(v: f64) -> Self { TaggedValue::Float(v) } }
impl From<String> for TaggedValue { fn from(v: String) -> Self { TaggedValue::String(v) } }
impl From<&str> for TaggedValue { fn from(v: &str) -> Self { TaggedValue::String(v.to_owned()) } }
impl From<Bytes> for TaggedValue { fn from(v: Bytes) -> Self { TaggedValue::Bytes(v) } }
impl From<Structure> for TaggedValue { fn from(v: Structure) -> Self { TaggedValue::Structure(v) } }
impl<T: Into<TaggedValue>> From<Vec<T>> for TaggedValue {
    fn from(v: Vec<T>) -> Self { TaggedValue::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<TaggedValue>> From<Option<T>> for TaggedValue {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(TaggedValue::Null) }
}
impl<K: Into<String>, V: Into<TaggedValue>> FromIterator<(K, V)> for TaggedValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TaggedValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_keeps_tag_and_fields() {
        let s = Structure::new(NODE, vec![TaggedValue::Int(1)]);
        assert_eq!(s.fields, vec![TaggedValue::Int(1)]);
        assert_eq!(s.tag_char(), 'N');
    }

    #[test]
    fn test_map_from_pairs() {
        let map: TaggedValue = [("name", "Alice")].into_iter().collect();
        match map {
            TaggedValue::Map(m) => assert_eq!(m["name"], TaggedValue::from("Alice")),
            other => panic!("expected map, got {other:?}"),
        }
    }
}
