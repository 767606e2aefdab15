//! Graph scopes, entity bindings and staleness flags.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one graph scope. Entity identities are only
/// meaningful within the scope that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub u64);

impl GraphId {
    /// A process-unique scope id.
    pub fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a cache-registered entity lives: its scope and integer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub graph: GraphId,
    pub identity: i64,
}

bitflags::bitflags! {
    /// The fields of an entity that may lag behind the server.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Stale: u8 {
        const NONE = 0;
        const LABELS = 0b01;
        const PROPERTIES = 0b10;
        const ALL = Self::LABELS.bits() | Self::PROPERTIES.bits();
    }
}
