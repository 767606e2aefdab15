//! Record: one hydrated result row.
//!
//! Keys and values are positionally aligned. A record is also graph-shaped:
//! its [`GraphView`] covers the nodes, relationships and paths found among
//! its top-level values (nested lists and maps are not searched).

use std::collections::HashMap;
use std::fmt;
use std::ops::{Bound, RangeBounds};

use hashbrown::HashSet;

use super::{GraphView, Node, Path, Relationship, Value};
use crate::{Error, Result};

/// A single keyed row of hydrated values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record. Fails if the key and value counts differ.
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>, values: Vec<Value>) -> Result<Self> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.len() != values.len() {
            return Err(Error::Shape { keys: keys.len(), values: values.len() });
        }
        Ok(Self { keys, values })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for the first column named `key`.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| &self.values[i])
            .ok_or_else(|| Error::KeyNotFound(format!("Column '{key}'")))
    }

    /// Get a typed value from the row.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
        T::from_value(self.get(key)?)
    }

    /// Value at `index`; negative indices count from the end.
    pub fn value(&self, index: isize) -> Option<&Value> {
        let len = self.values.len() as isize;
        let index = if index < 0 { index + len } else { index };
        if (0..len).contains(&index) {
            self.values.get(index as usize)
        } else {
            None
        }
    }

    /// A new record over the selected columns, order preserved. Bounds past
    /// the end are clamped.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Record {
        let len = self.values.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        Record {
            keys: self.keys[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys.iter().cloned().zip(self.values.iter().cloned()).collect()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{k}: {v}")?;
        }
        write!(f, ")")
    }
}

impl GraphView for Record {
    fn node_set(&self) -> HashSet<Node> {
        let mut nodes = HashSet::new();
        for value in &self.values {
            match value {
                Value::Node(n) => { nodes.insert(n.clone()); }
                Value::Relationship(r) => nodes.extend(r.node_set()),
                Value::Path(p) => nodes.extend(p.node_set()),
                _ => {}
            }
        }
        nodes
    }

    fn relationship_set(&self) -> HashSet<Relationship> {
        let mut relationships = HashSet::new();
        for value in &self.values {
            match value {
                Value::Relationship(r) => { relationships.insert(r.clone()); }
                Value::Path(p) => relationships.extend(p.relationship_set()),
                _ => {}
            }
        }
        relationships
    }
}

// ============================================================================
// FromValue
// ============================================================================

/// Convert from Value to concrete types.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

fn type_error(expected: &str, got: &Value) -> Error {
    Error::TypeError {
        expected: expected.into(),
        got: got.type_name().into(),
    }
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for Node {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_node().cloned().ok_or_else(|| type_error("Node", val))
    }
}

impl FromValue for Relationship {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_relationship().cloned().ok_or_else(|| type_error("Relationship", val))
    }
}

impl FromValue for Path {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_path().cloned().ok_or_else(|| type_error("Path", val))
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_str().map(str::to_owned).ok_or_else(|| type_error("String", val))
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_int().ok_or_else(|| type_error("Integer", val))
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_float().ok_or_else(|| type_error("Float", val))
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Bool(b) => Ok(*b),
            _ => Err(type_error("Boolean", val)),
        }
    }
}
