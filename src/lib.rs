//! # neo4j-hydrate: Identity-Cached Graph Hydration
//!
//! Turns query results, as tagged wire values or legacy REST JSON, into a
//! typed property graph model: nodes, relationships, paths and records.
//! Decoding the same entity twice hands back the same shared instance,
//! refreshed in place.
//!
//! ## Design Principles
//!
//! 1. **One canonical instance**: each `Graph` owns an `EntityCache` keyed by identity
//! 2. **Closed wire domain**: `TaggedValue` in, `Value` out; unknown tags pass through
//! 3. **Validate before publishing**: a malformed path never reaches the cache
//! 4. **Lookup at the seam**: legacy type repair goes through `EntityLookup`
//!
//! ## Quick Start
//!
//! ```rust
//! use neo4j_hydrate::{wire, Graph, Node, TaggedValue};
//!
//! # fn example() -> neo4j_hydrate::Result<()> {
//! let mut graph = Graph::detached();
//! let row = vec![TaggedValue::structure(wire::NODE, vec![
//!     42.into(),
//!     vec!["Person"].into(),
//!     [("name", "Alice")].into_iter().collect(),
//! ])];
//!
//! let record = graph.hydrator(["n"]).hydrate(row)?;
//! let alice: Node = record.get_as("n")?;
//! assert_eq!(alice.identity(), Some(42));
//! assert!(alice.has_label("Person"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Wire Formats
//!
//! | Format | Entry point | Notes |
//! |--------|-------------|-------|
//! | PackStream | `Hydrator::hydrate` | `N`, `R`, `r`, `P` structures |
//! | REST JSON | `Hydrator::hydrate_json` | version `"rest"` only, paths need a lookup |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod wire;
pub mod cache;
pub mod lookup;
pub mod config;
pub mod hydrate;

use std::fmt;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    walk, Binding, Entity, FromValue, GraphId, GraphView, IntoProperty, IsoDuration, Node, Path,
    PropertyError, PropertyMap, PropertyValue, Record, Relationship, Stale, Subgraph, Value,
    Walkable, MAX_INTEGER, MIN_INTEGER,
};

// ============================================================================
// Re-exports: Decoding
// ============================================================================

pub use cache::EntityCache;
pub use config::{HydrationConfig, WireFormat};
pub use hydrate::{HydrationFunctions, Hydrator};
pub use lookup::{EntityLookup, MemoryLookup, NoLookup};
pub use wire::{Structure, TaggedValue};

// ============================================================================
// Top-level Graph handle
// ============================================================================

/// One graph scope: a unique id, the entity cache for that scope, and the
/// lookup used to repair legacy results.
pub struct Graph {
    id: GraphId,
    cache: EntityCache,
    lookup: Box<dyn EntityLookup>,
}

impl Graph {
    /// Create a graph scope that repairs legacy data through `lookup`.
    pub fn new(lookup: impl EntityLookup + 'static) -> Self {
        let id = GraphId::next();
        tracing::debug!(graph = %id, "opened graph scope");
        Self {
            id,
            cache: EntityCache::new(id),
            lookup: Box::new(lookup),
        }
    }

    /// A graph scope with no lookup; legacy paths without types fail.
    pub fn detached() -> Self {
        Self::new(NoLookup)
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut EntityCache {
        &mut self.cache
    }

    pub(crate) fn lookup(&self) -> &dyn EntityLookup {
        self.lookup.as_ref()
    }

    /// The cached node with this identity, if it has been hydrated.
    pub fn node(&self, identity: i64) -> Option<Node> {
        self.cache.node(identity)
    }

    /// The cached relationship with this identity, if it has been hydrated.
    pub fn relationship(&self, identity: i64) -> Option<Relationship> {
        self.cache.relationship(identity)
    }

    /// Start decoding rows with the given column keys.
    pub fn hydrator<K: Into<String>>(&mut self, keys: impl IntoIterator<Item = K>) -> Hydrator<'_> {
        Hydrator::new(self, keys)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.cache.node_count())
            .field("relationships", &self.cache.relationship_count())
            .finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Path sequence has odd length {0}")]
    OddPathSequence(usize),

    #[error("Path index out of range: {0}")]
    PathIndexOutOfRange(String),

    #[error("Unresolved relationship types for ids {ids:?}")]
    UnresolvedType { ids: Vec<i64> },

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Shape error: {keys} keys but {values} values")]
    Shape { keys: usize, values: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed structure <{tag}>: {message}")]
    MalformedStructure { tag: char, message: String },

    #[error("Not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid walk: {0}")]
    InvalidWalk(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
