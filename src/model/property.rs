//! PropertyMap: the validated key-value store on nodes and relationships.
//!
//! Only a subset of the wire domain is storable: booleans, integers within
//! [`MIN_INTEGER`]..=[`MAX_INTEGER`], floats, text, and homogeneous lists of
//! one of those scalar kinds. Validation happens at assignment, never later.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::wire::TaggedValue;

/// Smallest integer a property may hold.
pub const MIN_INTEGER: i64 = i64::MIN;
/// Largest integer a property may hold.
pub const MAX_INTEGER: i64 = i64::MAX;

/// Rejections raised while assigning a property value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("Integer {0} is outside the signed 64-bit property range")]
    IntegerOutOfRange(String),

    #[error("Heterogeneous list: {first} and {other} elements cannot be mixed")]
    HeterogeneousList { first: &'static str, other: &'static str },

    #[error("Nested lists are not supported as property values")]
    NestedList,

    #[error("Lists may not contain null elements")]
    NullInList,

    #[error("Mutable byte buffers are not supported as property values")]
    MutableBytes,

    #[error("Byte sequence is not valid UTF-8")]
    NonUtf8Bytes,

    #[error("{0} is not a supported property value type")]
    UnsupportedType(&'static str),
}

// ============================================================================
// PropertyValue
// ============================================================================

/// A single storable property value.
///
/// Floats compare and hash by bit pattern, so a container holding `NaN` is
/// still equal to itself and usable as a set member.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Homogeneous list of one scalar kind.
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "BOOLEAN",
            PropertyValue::Int(_) => "INTEGER",
            PropertyValue::Float(_) => "FLOAT",
            PropertyValue::String(_) => "STRING",
            PropertyValue::List(_) => "LIST",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Build a list, enforcing that every element is a scalar of one kind.
    pub fn list<I, T>(items: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = T>,
        T: IntoProperty,
    {
        let mut elements = Vec::new();
        for item in items {
            let element = item.into_property()?.ok_or(PropertyError::NullInList)?;
            if let PropertyValue::List(_) = element {
                return Err(PropertyError::NestedList);
            }
            if let Some(first) = elements.first() {
                if std::mem::discriminant(first) != std::mem::discriminant(&element) {
                    return Err(PropertyError::HeterogeneousList {
                        first: first.type_name(),
                        other: element.type_name(),
                    });
                }
            }
            elements.push(element);
        }
        Ok(PropertyValue::List(elements))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::List(a), PropertyValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            PropertyValue::Bool(b) => b.hash(state),
            PropertyValue::Int(i) => i.hash(state),
            PropertyValue::Float(f) => f.to_bits().hash(state),
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::List(l) => l.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            PropertyValue::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============================================================================
// IntoProperty: validating conversion
// ============================================================================

/// Conversion into a storable property value.
///
/// `Ok(None)` means null: assigning it removes the key.
pub trait IntoProperty {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError>;
}

fn check_range(value: i128) -> Result<i64, PropertyError> {
    if value < MIN_INTEGER as i128 || value > MAX_INTEGER as i128 {
        return Err(PropertyError::IntegerOutOfRange(value.to_string()));
    }
    Ok(value as i64)
}

fn text_from_bytes(bytes: &[u8]) -> Result<Option<PropertyValue>, PropertyError> {
    let text = std::str::from_utf8(bytes).map_err(|_| PropertyError::NonUtf8Bytes)?;
    Ok(Some(PropertyValue::String(text.to_owned())))
}

macro_rules! lossless_int {
    ($($t:ty),*) => {$(
        impl IntoProperty for $t {
            fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
                Ok(Some(PropertyValue::Int(self as i64)))
            }
        }
    )*};
}

macro_rules! checked_int {
    ($($t:ty),*) => {$(
        impl IntoProperty for $t {
            fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
                Ok(Some(PropertyValue::Int(check_range(self as i128)?)))
            }
        }
    )*};
}

lossless_int!(i8, i16, i32, i64, u8, u16, u32);
checked_int!(u64, usize, isize, i128);

impl IntoProperty for u128 {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        match i128::try_from(self) {
            Ok(v) => Ok(Some(PropertyValue::Int(check_range(v)?))),
            Err(_) => Err(PropertyError::IntegerOutOfRange(self.to_string())),
        }
    }
}

impl IntoProperty for bool {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Ok(Some(PropertyValue::Bool(self)))
    }
}

impl IntoProperty for f64 {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Ok(Some(PropertyValue::Float(self)))
    }
}

impl IntoProperty for f32 {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Ok(Some(PropertyValue::Float(self as f64)))
    }
}

impl IntoProperty for &str {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Ok(Some(PropertyValue::String(self.to_owned())))
    }
}

impl IntoProperty for String {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Ok(Some(PropertyValue::String(self)))
    }
}

/// Immutable byte sequences are stored as text.
impl IntoProperty for Bytes {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        text_from_bytes(&self)
    }
}

/// Mutable buffers are refused.
impl IntoProperty for BytesMut {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        Err(PropertyError::MutableBytes)
    }
}

impl IntoProperty for PropertyValue {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        match self {
            PropertyValue::List(items) => PropertyValue::list(items).map(Some),
            scalar => Ok(Some(scalar)),
        }
    }
}

impl<T: IntoProperty> IntoProperty for Option<T> {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        match self {
            Some(v) => v.into_property(),
            None => Ok(None),
        }
    }
}

impl<T: IntoProperty> IntoProperty for Vec<T> {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        PropertyValue::list(self).map(Some)
    }
}

impl IntoProperty for TaggedValue {
    fn into_property(self) -> Result<Option<PropertyValue>, PropertyError> {
        match self {
            TaggedValue::Null => Ok(None),
            TaggedValue::Bool(b) => b.into_property(),
            TaggedValue::Int(i) => i.into_property(),
            TaggedValue::Float(f) => f.into_property(),
            TaggedValue::String(s) => s.into_property(),
            TaggedValue::Bytes(b) => b.into_property(),
            TaggedValue::List(items) => PropertyValue::list(items).map(Some),
            other => Err(PropertyError::UnsupportedType(other.type_name())),
        }
    }
}

// ============================================================================
// PropertyMap
// ============================================================================

/// A map of property names to validated values.
///
/// Equality and hashing are by content, independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PropertyMap {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs; null values are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoProperty,
    {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.set(key, value)?;
        }
        Ok(map)
    }

    /// Assign a value. Null removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl IntoProperty) -> Result<(), PropertyError> {
        let key = key.into();
        match value.into_property()? {
            Some(v) => { self.entries.insert(key, v); }
            None => { self.entries.remove(&key); }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the value for `key`, inserting `default` first if the key is
    /// absent and a default was given.
    ///
    /// Without a default, a missing key yields `None` and is NOT inserted.
    pub fn setdefault<V: IntoProperty>(
        &mut self,
        key: impl Into<String>,
        default: Option<V>,
    ) -> Result<Option<PropertyValue>, PropertyError> {
        let key = key.into();
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Some(existing.clone()));
        }
        let Some(default) = default else {
            return Ok(None);
        };
        match default.into_property()? {
            Some(v) => {
                self.entries.insert(key, v.clone());
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every entry of `other` into this map, overwriting on conflict.
    pub fn update(&mut self, other: &PropertyMap) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}
