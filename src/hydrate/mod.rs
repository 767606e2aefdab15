//! # Hydration
//!
//! Turns [`TaggedValue`]s into domain [`Value`]s.
//!
//! ```text
//! TaggedValue ──► Hydrator::decode ──┬── scalar / list / map ──► Value
//!                                    ├── N, R ──► EntityCache ──► Node / Relationship
//!                                    ├── P ────► path assembly ──► Path
//!                                    └── other ─► HydrationFunctions or Value::Structure
//! ```
//!
//! Legacy JSON payloads go through [`json::normalize`] first and then take
//! the same route.

pub mod builtin;
pub mod json;
mod path;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::{NodeFields, RelationshipFields, Source};
use crate::config::{HydrationConfig, WireFormat};
use crate::model::*;
use crate::wire::{self, Structure, TaggedValue};
use crate::{Error, Graph, Result};

// ============================================================================
// Hydration functions
// ============================================================================

/// Decode function for one structure tag. Receives the already decoded fields.
pub type HydrationFn = Arc<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;

/// Registry of tag → decode function for structures other than `N`/`R`/`P`.
#[derive(Clone, Default)]
pub struct HydrationFunctions {
    table: HashMap<u8, HydrationFn>,
}

impl HydrationFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard temporal and spatial functions.
    pub fn standard() -> Self {
        let mut functions = Self::new();
        builtin::register(&mut functions);
        functions
    }

    /// Register `f` for `tag`, replacing any earlier registration.
    pub fn register<F>(&mut self, tag: u8, f: F)
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.table.insert(tag, Arc::new(f));
    }

    pub fn get(&self, tag: u8) -> Option<&HydrationFn> {
        self.table.get(&tag)
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.table.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for HydrationFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<char> = self.table.keys().map(|t| *t as char).collect();
        tags.sort_unstable();
        f.debug_struct("HydrationFunctions").field("tags", &tags).finish()
    }
}

// ============================================================================
// Hydrator
// ============================================================================

/// Decodes the rows of one result against one graph.
///
/// Column keys are fixed at construction. Entity hints map a column key to
/// a caller-held node or relationship; when that column decodes to an entity,
/// the held instance is bound, refreshed in place and cached instead of
/// creating a duplicate. A held instance already bound to another entity is
/// ignored.
pub struct Hydrator<'g> {
    graph: &'g mut Graph,
    keys: Vec<String>,
    entities: HashMap<String, Entity>,
    functions: HydrationFunctions,
    format: WireFormat,
}

impl<'g> Hydrator<'g> {
    pub fn new<K: Into<String>>(graph: &'g mut Graph, keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            graph,
            keys: keys.into_iter().map(Into::into).collect(),
            entities: HashMap::new(),
            functions: HydrationFunctions::new(),
            format: WireFormat::default(),
        }
    }

    /// Apply a validated configuration.
    pub fn with_config(mut self, config: &HydrationConfig) -> Result<Self> {
        config.validate()?;
        self.format = config.format.clone();
        if config.builtin_functions {
            builtin::register(&mut self.functions);
        }
        Ok(self)
    }

    pub fn with_entities<K, E>(mut self, entities: impl IntoIterator<Item = (K, E)>) -> Self
    where
        K: Into<String>,
        E: Into<Entity>,
    {
        self.entities.extend(entities.into_iter().map(|(k, e)| (k.into(), e.into())));
        self
    }

    pub fn with_functions(mut self, functions: HydrationFunctions) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_function<F>(mut self, tag: u8, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.register(tag, f);
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn format(&self) -> &WireFormat {
        &self.format
    }

    pub fn functions(&self) -> &HydrationFunctions {
        &self.functions
    }

    /// Decode one row into a record aligned with the column keys.
    pub fn hydrate(&mut self, values: Vec<TaggedValue>) -> Result<Record> {
        self.check_shape(values.len())?;
        let mut decoded = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let hint = self.entities.get(&self.keys[index]).cloned();
            decoded.push(self.decode(value, hint)?);
        }
        Record::new(self.keys.clone(), decoded)
    }

    /// Decode one legacy JSON row. Requires a JSON wire format.
    pub fn hydrate_json(&mut self, values: Vec<serde_json::Value>) -> Result<Record> {
        if !self.format.is_json() {
            return Err(Error::Configuration(format!(
                "JSON hydration needs a JSON wire format, configured for {:?}",
                self.format
            )));
        }
        self.check_shape(values.len())?;
        let normalized = values
            .into_iter()
            .map(json::normalize)
            .collect::<Result<Vec<_>>>()?;
        self.hydrate(normalized)
    }

    fn check_shape(&self, values: usize) -> Result<()> {
        if values != self.keys.len() {
            return Err(Error::Shape { keys: self.keys.len(), values });
        }
        Ok(())
    }

    /// Decode a single value. `hint` is only honoured for a top-level
    /// `N` or `R` structure; nested values never receive it.
    pub fn decode(&mut self, value: TaggedValue, hint: Option<Entity>) -> Result<Value> {
        Ok(match value {
            TaggedValue::Null => Value::Null,
            TaggedValue::Bool(b) => Value::Bool(b),
            TaggedValue::Int(i) => Value::Int(i),
            TaggedValue::Float(f) => Value::Float(f),
            TaggedValue::String(s) => Value::String(s),
            TaggedValue::Bytes(b) => Value::Bytes(b),
            TaggedValue::List(items) => Value::List(
                items.into_iter().map(|v| self.decode(v, None)).collect::<Result<_>>()?,
            ),
            TaggedValue::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| -> Result<(String, Value)> { Ok((k, self.decode(v, None)?)) })
                    .collect::<Result<_>>()?,
            ),
            TaggedValue::Structure(s) => self.decode_structure(s, hint)?,
        })
    }

    fn decode_structure(&mut self, s: Structure, hint: Option<Entity>) -> Result<Value> {
        match s.tag {
            wire::NODE => {
                let hint = match hint {
                    Some(Entity::Node(node)) => Some(node),
                    Some(other) => {
                        debug!(?other, "ignoring relationship hint for a node structure");
                        None
                    }
                    None => None,
                };
                self.decode_node(s, hint).map(Value::Node)
            }
            wire::RELATIONSHIP => {
                let hint = match hint {
                    Some(Entity::Relationship(rel)) => Some(rel),
                    Some(other) => {
                        debug!(?other, "ignoring node hint for a relationship structure");
                        None
                    }
                    None => None,
                };
                self.decode_relationship(s, hint).map(Value::Relationship)
            }
            wire::PATH => self.decode_path(s).map(Value::Path),
            tag => {
                let fields = s
                    .fields
                    .into_iter()
                    .map(|v| self.decode(v, None))
                    .collect::<Result<Vec<_>>>()?;
                match self.functions.get(tag) {
                    Some(f) => f(fields),
                    None => {
                        let tag_char = tag as char;
                        debug!(tag = %tag_char, fields = fields.len(), "no hydration function; passing structure through");
                        Ok(Value::Structure { tag, fields })
                    }
                }
            }
        }
    }

    fn decode_node(&mut self, s: Structure, hint: Option<Node>) -> Result<Node> {
        let (identity, fields) = parse_node(s)?;
        let source = hint.map_or(Source::Construct, Source::Adopt);
        Ok(self.graph.cache_mut().update_node(identity, source, fields))
    }

    fn decode_relationship(&mut self, s: Structure, hint: Option<Relationship>) -> Result<Relationship> {
        let tag = s.tag;
        let [identity, start, end, rel_type, properties] = arity(s)?;
        let identity = int_field(tag, &identity, "id")?;
        let start = int_field(tag, &start, "start id")?;
        let end = int_field(tag, &end, "end id")?;
        let rel_type = optional_type(tag, rel_type)?;
        let properties = optional_properties(tag, properties)?;

        trace!(identity, start, end, "decoding relationship");
        let cache = self.graph.cache_mut();
        let start = cache.resolve_node(start);
        let end = cache.resolve_node(end);
        let source = hint.map_or(Source::Construct, Source::Adopt);
        Ok(cache.update_relationship(
            identity,
            source,
            RelationshipFields { start, end, rel_type, properties },
        ))
    }
}

impl fmt::Debug for Hydrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hydrator")
            .field("graph", &self.graph.id())
            .field("keys", &self.keys)
            .field("format", &self.format)
            .field("functions", &self.functions)
            .finish()
    }
}

// ============================================================================
// Field parsing
// ============================================================================

pub(crate) fn malformed(tag: u8, message: impl Into<String>) -> Error {
    Error::MalformedStructure { tag: tag as char, message: message.into() }
}

/// Split a structure into exactly `N` fields.
fn arity<const N: usize>(s: Structure) -> Result<[TaggedValue; N]> {
    let (tag, got) = (s.tag, s.fields.len());
    s.fields
        .try_into()
        .map_err(|_| malformed(tag, format!("expected {N} fields, got {got}")))
}

fn int_field(tag: u8, value: &TaggedValue, name: &str) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| malformed(tag, format!("{name} must be an integer, got {}", value.type_name())))
}

fn optional_labels(tag: u8, value: TaggedValue) -> Result<Option<Vec<String>>> {
    match value {
        TaggedValue::Null => Ok(None),
        TaggedValue::List(items) => items
            .into_iter()
            .map(|item| match item {
                TaggedValue::String(label) => Ok(label),
                other => Err(malformed(tag, format!("label must be a string, got {}", other.type_name()))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        other => Err(malformed(tag, format!("labels must be a list, got {}", other.type_name()))),
    }
}

fn optional_type(tag: u8, value: TaggedValue) -> Result<Option<String>> {
    match value {
        TaggedValue::Null => Ok(None),
        TaggedValue::String(rel_type) => Ok(Some(rel_type)),
        other => Err(malformed(tag, format!("type must be a string, got {}", other.type_name()))),
    }
}

fn optional_properties(tag: u8, value: TaggedValue) -> Result<Option<PropertyMap>> {
    match value {
        TaggedValue::Null => Ok(None),
        TaggedValue::Map(entries) => {
            let mut properties = PropertyMap::new();
            for (key, value) in entries {
                properties.set(key, value)?;
            }
            Ok(Some(properties))
        }
        other => Err(malformed(tag, format!("properties must be a map, got {}", other.type_name()))),
    }
}

/// Validate an `N` structure without touching any cache.
fn parse_node(s: Structure) -> Result<(i64, NodeFields)> {
    let tag = s.tag;
    if tag != wire::NODE {
        return Err(malformed(tag, "expected a node structure"));
    }
    let [identity, labels, properties] = arity(s)?;
    Ok((
        int_field(tag, &identity, "id")?,
        NodeFields {
            labels: optional_labels(tag, labels)?,
            properties: optional_properties(tag, properties)?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{NODE, RELATIONSHIP};

    fn node(id: i64, labels: Vec<&str>, name: &str) -> TaggedValue {
        TaggedValue::structure(NODE, vec![
            id.into(),
            labels.into(),
            [("name", name)].into_iter().collect(),
        ])
    }

    #[test]
    fn test_scalars_and_containers() {
        let mut graph = Graph::detached();
        let mut hydrator = graph.hydrator(["x"]);
        let value: TaggedValue = vec![TaggedValue::from(1), TaggedValue::Null, "a".into()].into();
        assert_eq!(
            hydrator.decode(value, None).unwrap(),
            Value::List(vec![Value::Int(1), Value::Null, Value::from("a")])
        );
        let map: TaggedValue = [("k", 2.5)].into_iter().collect();
        let Value::Map(map) = hydrator.decode(map, None).unwrap() else { panic!("expected a map") };
        assert_eq!(map.get("k"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_nested_node_in_list_is_cached() {
        let mut graph = Graph::detached();
        let mut hydrator = graph.hydrator(["x"]);
        let value: TaggedValue = vec![node(1, vec!["A"], "a"), node(1, vec!["A"], "b")].into();
        let Value::List(items) = hydrator.decode(value, None).unwrap() else { panic!("expected a list") };
        let (first, second) = (items[0].as_node().unwrap(), items[1].as_node().unwrap());
        assert!(first.ptr_eq(second));
        assert_eq!(first.get("name").and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("b"));
    }

    #[test]
    fn test_malformed_node() {
        let mut graph = Graph::detached();
        let mut hydrator = graph.hydrator(["x"]);
        let short = TaggedValue::structure(NODE, vec![1.into()]);
        assert!(matches!(hydrator.decode(short, None), Err(Error::MalformedStructure { tag: 'N', .. })));
        let bad_id = TaggedValue::structure(NODE, vec!["one".into(), TaggedValue::Null, TaggedValue::Null]);
        assert!(matches!(hydrator.decode(bad_id, None), Err(Error::MalformedStructure { .. })));
        assert!(graph.cache().is_empty());
    }

    #[test]
    fn test_relationship_resolves_endpoints() {
        let mut graph = Graph::detached();
        let mut hydrator = graph.hydrator(["a", "r"]);
        let record = hydrator
            .hydrate(vec![
                node(1, vec!["Person"], "Alice"),
                TaggedValue::structure(RELATIONSHIP, vec![
                    7.into(), 1.into(), 2.into(), "KNOWS".into(), TaggedValue::Null,
                ]),
            ])
            .unwrap();
        let alice: Node = record.get_as("a").unwrap();
        let knows: Relationship = record.get_as("r").unwrap();
        assert!(knows.start_node().ptr_eq(&alice));
        assert_eq!(knows.end_node().identity(), Some(2));
        assert!(knows.end_node().is_stale(Stale::ALL));
        assert!(!alice.is_stale(Stale::LABELS));
        assert!(knows.is_stale(Stale::PROPERTIES));
    }

    #[test]
    fn test_registered_function() {
        let mut graph = Graph::detached();
        let mut hydrator = graph
            .hydrator(["x"])
            .with_function(b'Z', |fields| Ok(Value::Int(fields.len() as i64)));
        let value = TaggedValue::structure(b'Z', vec![1.into(), 2.into()]);
        assert_eq!(hydrator.decode(value, None).unwrap(), Value::Int(2));
        assert!(hydrator.functions().contains(b'Z'));
    }

    #[test]
    fn test_shape_checked_before_decoding() {
        let mut graph = Graph::detached();
        let mut hydrator = graph.hydrator(["a", "b"]);
        let result = hydrator.hydrate(vec![node(1, vec![], "x")]);
        assert!(matches!(result, Err(Error::Shape { keys: 2, values: 1 })));
        assert!(graph.cache().is_empty());
    }
}
