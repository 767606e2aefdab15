//! Entity cache: one canonical node or relationship per identity.
//!
//! Each graph scope owns one `EntityCache`. The first hydration of an
//! identity materialises an instance; every later hydration merges into that
//! same instance and hands back the same handle, so anything already holding
//! it sees the refresh. A caller-held instance passed as a hint replaces the
//! cached one and becomes the handle later hydrations return.
//!
//! ## Concurrency
//!
//! The cache has no internal locking. Mutation needs `&mut EntityCache`
//! (reached through `&mut Graph`), so callers that hydrate from several
//! threads must serialise access themselves.

use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use crate::model::*;

/// How to obtain an instance when the identity is not cached yet.
#[derive(Debug, Clone)]
pub enum Source<T> {
    /// Materialise a fresh instance.
    Construct,
    /// Adopt a caller-held instance so the caller's handle becomes canonical.
    Adopt(T),
}

/// Incoming node fields. `None` means absent from the payload.
#[derive(Debug, Clone, Default)]
pub struct NodeFields {
    pub labels: Option<Vec<String>>,
    pub properties: Option<PropertyMap>,
}

/// Incoming relationship fields.
#[derive(Debug, Clone)]
pub struct RelationshipFields {
    pub start: Node,
    pub end: Node,
    pub rel_type: Option<String>,
    pub properties: Option<PropertyMap>,
}

/// What the cache needs to know about an entity type.
pub(crate) trait CachedEntity: Clone {
    type Fields;
    const KIND: &'static str;

    fn materialize(fields: &Self::Fields) -> Self;
    fn binding(&self) -> Option<Binding>;
    fn bind(&self, binding: Binding);
    fn refresh(&self, fields: Self::Fields);
    fn same(&self, other: &Self) -> bool;
}

impl CachedEntity for Node {
    type Fields = NodeFields;
    const KIND: &'static str = "node";

    fn materialize(_: &NodeFields) -> Self { Node::new() }
    fn binding(&self) -> Option<Binding> { Node::binding(self) }
    fn bind(&self, binding: Binding) { Node::bind(self, binding) }
    fn refresh(&self, fields: NodeFields) { Node::refresh(self, fields.labels, fields.properties) }
    fn same(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl CachedEntity for Relationship {
    type Fields = RelationshipFields;
    const KIND: &'static str = "relationship";

    fn materialize(fields: &RelationshipFields) -> Self {
        Relationship::with_optional_type(&fields.start, None, &fields.end)
    }
    fn binding(&self) -> Option<Binding> { Relationship::binding(self) }
    fn bind(&self, binding: Binding) { Relationship::bind(self, binding) }
    fn refresh(&self, fields: RelationshipFields) {
        Relationship::refresh(self, fields.start, fields.end, fields.rel_type, fields.properties)
    }
    fn same(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug)]
struct Store<T> {
    graph: GraphId,
    entries: HashMap<i64, T>,
}

impl<T: CachedEntity> Store<T> {
    fn new(graph: GraphId) -> Self {
        Self { graph, entries: HashMap::new() }
    }

    fn update(&mut self, identity: i64, source: Source<T>, fields: T::Fields) -> T {
        let binding = Binding { graph: self.graph, identity };

        if let Some(existing) = self.entries.get(&identity) {
            let instance = match source {
                Source::Adopt(hint) if hint.same(existing) => hint,
                Source::Adopt(hint) if hint.binding().is_none_or(|b| b == binding) => {
                    debug!(kind = T::KIND, identity, "adopting caller-held instance in place of cached one");
                    hint.bind(binding);
                    hint
                }
                Source::Adopt(hint) => {
                    warn!(
                        kind = T::KIND,
                        identity,
                        bound_to = ?hint.binding(),
                        "hint is bound to another entity; refreshing cached instance"
                    );
                    existing.clone()
                }
                Source::Construct => existing.clone(),
            };
            trace!(kind = T::KIND, identity, "refreshing cached entity");
            instance.refresh(fields);
            self.entries.insert(identity, instance.clone());
            return instance;
        }

        let instance = match source {
            Source::Adopt(hint) if hint.binding().is_none_or(|b| b == binding) => hint,
            Source::Adopt(hint) => {
                warn!(
                    kind = T::KIND,
                    identity,
                    bound_to = ?hint.binding(),
                    "hint is bound to another entity; materialising a new instance"
                );
                T::materialize(&fields)
            }
            Source::Construct => T::materialize(&fields),
        };
        instance.bind(binding);
        instance.refresh(fields);
        debug!(kind = T::KIND, identity, graph = %self.graph, "materialised entity");
        self.entries.insert(identity, instance.clone());
        instance
    }
}

// ============================================================================
// EntityCache
// ============================================================================

/// Identity-keyed stores for one graph scope.
#[derive(Debug)]
pub struct EntityCache {
    graph: GraphId,
    nodes: Store<Node>,
    relationships: Store<Relationship>,
}

impl EntityCache {
    pub fn new(graph: GraphId) -> Self {
        Self {
            graph,
            nodes: Store::new(graph),
            relationships: Store::new(graph),
        }
    }

    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Obtain the canonical node for `identity`, merging `fields` into it.
    pub fn update_node(&mut self, identity: i64, source: Source<Node>, fields: NodeFields) -> Node {
        self.nodes.update(identity, source, fields)
    }

    /// Obtain the canonical relationship for `identity`, merging `fields` into it.
    pub fn update_relationship(
        &mut self,
        identity: i64,
        source: Source<Relationship>,
        fields: RelationshipFields,
    ) -> Relationship {
        self.relationships.update(identity, source, fields)
    }

    /// The canonical node for `identity` without merging anything into an
    /// existing one. Unknown identities get a new, fully stale node.
    pub fn resolve_node(&mut self, identity: i64) -> Node {
        match self.nodes.entries.get(&identity) {
            Some(node) => node.clone(),
            None => self.nodes.update(identity, Source::Construct, NodeFields::default()),
        }
    }

    pub fn node(&self, identity: i64) -> Option<Node> {
        self.nodes.entries.get(&identity).cloned()
    }

    pub fn relationship(&self, identity: i64) -> Option<Relationship> {
        self.relationships.entries.get(&identity).cloned()
    }

    pub fn contains_node(&self, identity: i64) -> bool {
        self.nodes.entries.contains_key(&identity)
    }

    pub fn contains_relationship(&self, identity: i64) -> bool {
        self.relationships.entries.contains_key(&identity)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.entries.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.entries.len()
    }

    pub fn len(&self) -> usize {
        self.node_count() + self.relationship_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
