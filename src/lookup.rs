//! # Entity Lookup
//!
//! The collaborator the decoder calls when legacy path data arrives without
//! relationship types. One call per path, batched over exactly the ids that
//! are missing a type; ids absent from the answer count as unresolved.
//!
//! ## Implementations
//!
//! | Lookup | Description |
//! |--------|-------------|
//! | `NoLookup` | Resolves nothing (detached graphs) |
//! | `MemoryLookup` | In-memory table, for testing and embedding |
//! | any `Fn(&[i64]) -> Result<HashMap<i64, String>>` | Closure adapter |

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::Result;

/// Resolves relationship types by relationship identity.
pub trait EntityLookup: Send + Sync {
    /// Types for as many of `ids` as are known. Missing keys are unresolved.
    fn relationship_types(&self, ids: &[i64]) -> Result<HashMap<i64, String>>;
}

impl<F> EntityLookup for F
where
    F: Fn(&[i64]) -> Result<HashMap<i64, String>> + Send + Sync,
{
    fn relationship_types(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self(ids)
    }
}

/// Lookup that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl EntityLookup for NoLookup {
    fn relationship_types(&self, _ids: &[i64]) -> Result<HashMap<i64, String>> {
        Ok(HashMap::new())
    }
}

// ============================================================================
// MemoryLookup
// ============================================================================

/// Relationship types held in memory.
///
/// Clones share the same table, so a test can keep one clone to populate
/// while the graph owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    types: Arc<RwLock<HashMap<i64, String>>>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: i64, rel_type: impl Into<String>) {
        self.types.write().insert(identity, rel_type.into());
    }

    pub fn remove(&self, identity: i64) -> Option<String> {
        self.types.write().remove(&identity)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for MemoryLookup {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        let types = iter.into_iter().map(|(id, t)| (id, t.into())).collect();
        Self { types: Arc::new(RwLock::new(types)) }
    }
}

impl EntityLookup for MemoryLookup {
    fn relationship_types(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        let types = self.types.read();
        Ok(ids
            .iter()
            .filter_map(|id| types.get(id).map(|t| (*id, t.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_memory_lookup_partial_answer() {
        let lookup: MemoryLookup = [(1, "KNOWS"), (2, "LIKES")].into_iter().collect();
        let found = lookup.relationship_types(&[1, 3]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(&1).map(String::as_str), Some("KNOWS"));
    }

    #[test]
    fn test_clones_share_table() {
        let lookup = MemoryLookup::new();
        let shared = lookup.clone();
        shared.insert(9, "FOLLOWS");
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.remove(9).as_deref(), Some("FOLLOWS"));
        assert!(shared.is_empty());
    }

    #[test]
    fn test_closure_lookup() {
        let failing = |_: &[i64]| -> Result<HashMap<i64, String>> {
            Err(Error::Lookup("connection reset".into()))
        };
        assert!(matches!(failing.relationship_types(&[1]), Err(Error::Lookup(_))));
        assert!(NoLookup.relationship_types(&[1]).unwrap().is_empty());
    }
}
