//! Relationship (edge) in the property graph.
//!
//! Like [`Node`], a `Relationship` is a shared handle. Its endpoints are
//! node handles; nodes never point back at their relationships, so no
//! reference cycles form.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Binding, GraphId, Node, PropertyError, PropertyMap, PropertyValue, Stale};
use super::property::IntoProperty;

#[derive(Debug)]
struct RelationshipState {
    binding: Option<Binding>,
    start: Node,
    end: Node,
    rel_type: Option<String>,
    properties: PropertyMap,
    stale: Stale,
}

/// A relationship (directed edge) in the property graph.
#[derive(Clone)]
pub struct Relationship {
    inner: Arc<RwLock<RelationshipState>>,
}

impl Relationship {
    pub fn new(start: &Node, rel_type: impl Into<String>, end: &Node) -> Self {
        Self::with_optional_type(start, Some(rel_type.into()), end)
    }

    /// A relationship whose type is not (yet) known.
    pub fn untyped(start: &Node, end: &Node) -> Self {
        Self::with_optional_type(start, None, end)
    }

    pub(crate) fn with_optional_type(start: &Node, rel_type: Option<String>, end: &Node) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RelationshipState {
                binding: None,
                start: start.clone(),
                end: end.clone(),
                rel_type,
                properties: PropertyMap::new(),
                stale: Stale::NONE,
            })),
        }
    }

    pub fn with_properties(self, properties: PropertyMap) -> Self {
        self.inner.write().properties = properties;
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl IntoProperty) -> Result<Self, PropertyError> {
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

    pub fn ptr_eq(&self, other: &Relationship) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn bind(&self, binding: Binding) {
        self.inner.write().binding = Some(binding);
    }

    /// Apply a hydration payload. Endpoints are always replaced; an absent
    /// type keeps the previous one; absent properties keep their value and
    /// go stale.
    pub(crate) fn refresh(
        &self,
        start: Node,
        end: Node,
        rel_type: Option<String>,
        properties: Option<PropertyMap>,
    ) {
        let mut state = self.inner.write();
        state.start = start;
        state.end = end;
        if rel_type.is_some() {
            state.rel_type = rel_type;
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
    // Structure
    // ------------------------------------------------------------------------

    pub fn start_node(&self) -> Node {
        self.inner.read().start.clone()
    }

    pub fn end_node(&self) -> Node {
        self.inner.read().end.clone()
    }

    /// `(start, end)` in natural orientation.
    pub fn endpoints(&self) -> (Node, Node) {
        let state = self.inner.read();
        (state.start.clone(), state.end.clone())
    }

    pub fn rel_type(&self) -> Option<String> {
        self.inner.read().rel_type.clone()
    }

    pub fn is_loop(&self) -> bool {
        let (start, end) = self.endpoints();
        start == end
    }

    /// The "other" end of the relationship from the given node.
    pub fn other_node(&self, from: &Node) -> Option<Node> {
        let (start, end) = self.endpoints();
        if *from == start { Some(end) }
        else if *from == end { Some(start) }
        else { None }
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    pub fn properties(&self) -> PropertyMap {
        self.inner.read().properties.clone()
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.inner.read().properties.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl IntoProperty) -> Result<(), PropertyError> {
        self.inner.write().properties.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<PropertyValue> {
        self.inner.write().properties.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for Relationship {
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

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.binding() {
            Some(binding) => binding.hash(state),
            None => (Arc::as_ptr(&self.inner) as usize).hash(state),
        }
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Relationship")
            .field("identity", &state.binding.map(|b| b.identity))
            .field("start", &state.start.identity())
            .field("end", &state.end.identity())
            .field("rel_type", &state.rel_type)
            .field("properties", &state.properties)
            .field("stale", &state.stale)
            .finish()
    }
}

pub(crate) fn node_ref(node: &Node) -> String {
    match node.identity() {
        Some(identity) => format!("(_{identity})"),
        None => "()".to_string(),
    }
}

/// Cypher-like rendering: `(_1)-[_7:KNOWS {since: 1999}]->(_2)`.
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.endpoints();
        write!(f, "{}-[", node_ref(&start))?;
        if let Some(identity) = self.identity() {
            write!(f, "_{identity}")?;
        }
        if let Some(rel_type) = self.rel_type() {
            write!(f, ":{rel_type}")?;
        }
        let properties = self.properties();
        if !properties.is_empty() {
            write!(f, " {properties}")?;
        }
        write!(f, "]->{}", node_ref(&end))
    }
}
