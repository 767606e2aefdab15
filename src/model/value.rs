//! Hydrated value type: what the decoder hands back to callers.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Node, PropertyValue, Relationship, Path};

/// Neo4j-compatible hydrated value.
///
/// Covers:
/// - Scalars: Bool, Int, Float, String, Bytes
/// - Containers: List, Map
/// - Graph: Node, Relationship, Path (shared, identity-cached handles)
/// - Temporal and spatial values produced by the built-in hydration functions
/// - Structure: any tagged structure nobody registered a function for
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Bytes),
    List(Vec<Value>),
    Map(HashMap<String, Value>),

    // Graph types
    Node(Node),
    Relationship(Relationship),
    Path(Path),

    // Temporal types
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    LocalDateTime(NaiveDateTime),
    Duration(IsoDuration),

    // Spatial types
    Point2D { srid: i64, x: f64, y: f64 },
    Point3D { srid: i64, x: f64, y: f64, z: f64 },

    /// Unrecognised structure, fields hydrated recursively.
    Structure { tag: u8, fields: Vec<Value> },
}

/// ISO 8601 duration (months, days, seconds, nanoseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsoDuration {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: i64,
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Node(_) => "NODE",
            Value::Relationship(_) => "RELATIONSHIP",
            Value::Path(_) => "PATH",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::DateTime(_) => "DATETIME",
            Value::LocalDateTime(_) => "LOCAL_DATETIME",
            Value::Duration(_) => "DURATION",
            Value::Point2D { .. } => "POINT",
            Value::Point3D { .. } => "POINT",
            Value::Structure { .. } => "STRUCTURE",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<Node> for Value { fn from(v: Node) -> Self { Value::Node(v) } }
impl From<Relationship> for Value { fn from(v: Relationship) -> Self { Value::Relationship(v) } }
impl From<Path> for Value { fn from(v: Path) -> Self { Value::Path(v) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}
impl From<PropertyValue> for Value {
    fn from(v: PropertyValue) -> Self {
        match v {
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Int(i) => Value::Int(i),
            PropertyValue::Float(f) => Value::Float(f),
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::List(l) => Value::List(l.into_iter().map(Into::into).collect()),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "{n}"),
            Value::Relationship(r) => write!(f, "{r}"),
            Value::Path(p) => write!(f, "{p}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::LocalDateTime(dt) => write!(f, "{dt}"),
            Value::Duration(d) => write!(f, "P{}M{}DT{}.{:09}S", d.months, d.days, d.seconds, d.nanoseconds),
            Value::Point2D { x, y, srid } => write!(f, "point({{srid: {srid}, x: {x}, y: {y}}})"),
            Value::Point3D { x, y, z, srid } => write!(f, "point({{srid: {srid}, x: {x}, y: {y}, z: {z}}})"),
            Value::Structure { tag, fields } => {
                write!(f, "Structure<{}>(", *tag as char)?;
                for (i, v) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}
