//! Node in the property graph.
//!
//! A `Node` is a cheap, cloneable handle. Every clone points at the same
//! underlying state, so when the entity cache refreshes a node in place all
//! holders observe the new labels and properties.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashSet;
use parking_lot::RwLock;

use super::{Binding, GraphId, PropertyError, PropertyMap, PropertyValue, Stale};
use super::property::IntoProperty;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct NodeState {
    binding: Option<Binding>,
    labels: HashSet<String>,
    properties: PropertyMap,
    stale: Stale,
}

/// A node in the property graph.
#[derive(Clone, Default)]
pub struct Node {
    inner: Arc<RwLock<NodeState>>,
}

impl Node {
    /// A new node, not yet registered with any graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.update_labels(labels);
        self
    }

    pub fn with_properties(self, properties: PropertyMap) -> Self {
        self.inner.write().properties = properties;
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl IntoProperty) -> std::result::Result<Self, PropertyError> {
        self.set(key, value)?;
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    pub fn binding(&self) -> Option<Binding> {
        self.inner.read().binding
    }

    pub fn identity(&self) -> Option<i64> {
        self.binding().map(|b| b.identity)
    }

    pub fn graph(&self) -> Option<GraphId> {
        self.binding().map(|b| b.graph)
    }

    /// True if both handles share the same underlying state.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn bind(&self, binding: Binding) {
        self.inner.write().binding = Some(binding);
    }

    /// Apply a hydration payload. Absent fields keep their value and go
    /// stale; present fields (even empty ones) replace and become fresh.
    pub(crate) fn refresh(&self, labels: Option<Vec<String>>, properties: Option<PropertyMap>) {
        let mut state = self.inner.write();
        match labels {
            Some(labels) => {
                state.labels = labels.into_iter().collect();
                state.stale.remove(Stale::LABELS);
            }
            None => state.stale.insert(Stale::LABELS),
        }
        match properties {
            Some(properties) => {
                state.properties = properties;
                state.stale.remove(Stale::PROPERTIES);
            }
            None => state.stale.insert(Stale::PROPERTIES),
        }
    }

    pub fn stale(&self) -> Stale {
        self.inner.read().stale
    }

    pub fn is_stale(&self, field: Stale) -> bool {
        self.stale().contains(field)
    }

    // ------------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------------

    pub fn labels(&self) -> HashSet<String> {
        self.inner.read().labels.clone()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.inner.read().labels.contains(label)
    }

    pub fn add_label(&self, label: impl Into<String>) {
        self.inner.write().labels.insert(label.into());
    }

    /// Remove a label that must be present.
    pub fn remove_label(&self, label: &str) -> Result<()> {
        if self.inner.write().labels.remove(label) {
            Ok(())
        } else {
            Err(Error::KeyNotFound(format!("Label '{label}'")))
        }
    }

    /// Remove a label if present.
    pub fn discard_label(&self, label: &str) {
        self.inner.write().labels.remove(label);
    }

    pub fn clear_labels(&self) {
        self.inner.write().labels.clear();
    }

    pub fn update_labels(&self, labels: impl IntoIterator<Item = impl Into<String>>) {
        let mut state = self.inner.write();
        state.labels.extend(labels.into_iter().map(Into::into));
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    /// Snapshot of the current properties.
    pub fn properties(&self) -> PropertyMap {
        self.inner.read().properties.clone()
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.inner.read().properties.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl IntoProperty) -> std::result::Result<(), PropertyError> {
        self.inner.write().properties.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<PropertyValue> {
        self.inner.write().properties.remove(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.inner.read().properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sorted_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.labels().into_iter().collect();
        labels.sort();
        labels
    }
}

// Bound nodes are equal when they share (graph, identity); unbound ones
// only when they share state.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.binding(), other.binding()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.binding() {
            Some(binding) => binding.hash(state),
            None => (Arc::as_ptr(&self.inner) as usize).hash(state),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Node")
            .field("identity", &state.binding.map(|b| b.identity))
            .field("labels", &state.labels)
            .field("properties", &state.properties)
            .field("stale", &state.stale)
            .finish()
    }
}

/// Cypher-like rendering: `(_42:Person {name: "Alice"})`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(identity) = self.identity() {
            write!(f, "_{identity}")?;
        }
        for label in self.sorted_labels() {
            write!(f, ":{label}")?;
        }
        let properties = self.properties();
        if !properties.is_empty() {
            write!(f, " {properties}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Node {
        Node::new()
            .with_labels(["Person", "Employee"])
            .with_property("name", "Alice").unwrap()
            .with_property("age", 33).unwrap()
    }

    #[test]
    fn test_node_basics() {
        let node = alice();
        assert_eq!(node.len(), 2);
        assert!(node.has_label("Person"));
        assert_eq!(node.get("name").as_ref().and_then(|v| v.as_str()), Some("Alice"));
        assert_eq!(node.identity(), None);
        assert!(Node::new().is_empty());
    }

    #[test]
    fn test_unbound_nodes_compare_by_reference() {
        let a = alice();
        let b = alice();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_bound_nodes_compare_by_identity() {
        let graph = GraphId::next();
        let a = Node::new();
        let b = Node::new();
        a.bind(Binding { graph, identity: 7 });
        b.bind(Binding { graph, identity: 7 });
        assert_eq!(a, b);
        let other_graph = Node::new();
        other_graph.bind(Binding { graph: GraphId::next(), identity: 7 });
        assert_ne!(a, other_graph);
    }

    #[test]
    fn test_label_operations() {
        let node = Node::new().with_labels(["Person"]);
        node.add_label("Employee");
        node.add_label("Employee");
        assert_eq!(node.labels().len(), 2);
        node.remove_label("Employee").unwrap();
        assert!(matches!(node.remove_label("Employee"), Err(Error::KeyNotFound(_))));
        node.discard_label("Employee");
        node.update_labels(["Person", "Manager"]);
        assert_eq!(node.labels().len(), 2);
        node.clear_labels();
        assert!(node.labels().is_empty());
    }

    #[test]
    fn test_refresh_tracks_staleness() {
        let node = Node::new();
        node.refresh(None, None);
        assert_eq!(node.stale(), Stale::ALL);
        node.refresh(Some(vec!["Person".into()]), None);
        assert!(!node.is_stale(Stale::LABELS));
        assert!(node.is_stale(Stale::PROPERTIES));
        node.refresh(None, Some(PropertyMap::new()));
        assert!(node.is_stale(Stale::LABELS));
        assert!(!node.is_stale(Stale::PROPERTIES));
        assert!(node.has_label("Person"));
    }

    #[test]
    fn test_display() {
        let node = alice();
        node.bind(Binding { graph: GraphId::next(), identity: 42 });
        assert_eq!(node.to_string(), "(_42:Employee:Person {age: 33, name: \"Alice\"})");
    }
}
