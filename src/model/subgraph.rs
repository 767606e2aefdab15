//! Subgraph: an unordered collection of nodes and relationships.
//!
//! Every graph-shaped type (node, relationship, walk, subgraph, record)
//! implements [`GraphView`], and the set operators `| & - ^` work between
//! any two of them, always producing a [`Subgraph`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitXor, Sub};

use hashbrown::HashSet;

use super::{Node, Record, Relationship, Walkable};

/// Read-only graph capabilities shared by all graph-shaped types.
pub trait GraphView {
    /// Distinct nodes.
    fn node_set(&self) -> HashSet<Node>;

    /// Distinct relationships.
    fn relationship_set(&self) -> HashSet<Relationship>;

    /// Number of distinct nodes.
    fn order(&self) -> usize {
        self.node_set().len()
    }

    /// Number of distinct relationships.
    fn size(&self) -> usize {
        self.relationship_set().len()
    }

    /// Union of all node labels.
    fn labels(&self) -> HashSet<String> {
        self.node_set().iter().flat_map(|n| n.labels()).collect()
    }

    /// Set of relationship types; untyped relationships contribute nothing.
    fn types(&self) -> HashSet<String> {
        self.relationship_set().iter().filter_map(|r| r.rel_type()).collect()
    }

    /// Union of property keys across all member nodes and relationships.
    fn property_keys(&self) -> HashSet<String> {
        let node_keys = self.node_set().into_iter().flat_map(|n| {
            n.properties().keys().map(str::to_owned).collect::<Vec<_>>()
        });
        let rel_keys = self.relationship_set().into_iter().flat_map(|r| {
            r.properties().keys().map(str::to_owned).collect::<Vec<_>>()
        });
        node_keys.chain(rel_keys).collect()
    }

    fn to_subgraph(&self) -> Subgraph {
        Subgraph::new(self.node_set(), self.relationship_set())
    }
}

// ============================================================================
// Subgraph
// ============================================================================

/// A set of nodes and a set of relationships. The node set always contains
/// the endpoints of every relationship.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    nodes: HashSet<Node>,
    relationships: HashSet<Relationship>,
}

fn endpoints_of<'a>(relationships: impl IntoIterator<Item = &'a Relationship>) -> HashSet<Node> {
    relationships
        .into_iter()
        .flat_map(|r| {
            let (start, end) = r.endpoints();
            [start, end]
        })
        .collect()
}

impl Subgraph {
    pub fn new(
        nodes: impl IntoIterator<Item = Node>,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        let relationships: HashSet<Relationship> = relationships.into_iter().collect();
        let mut nodes: HashSet<Node> = nodes.into_iter().collect();
        nodes.extend(endpoints_of(&relationships));
        Self { nodes, relationships }
    }

    pub fn nodes(&self) -> &HashSet<Node> {
        &self.nodes
    }

    pub fn relationships(&self) -> &HashSet<Relationship> {
        &self.relationships
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// True when there are no nodes (and therefore no relationships).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn union(&self, other: &Subgraph) -> Subgraph {
        Subgraph {
            nodes: self.nodes.union(&other.nodes).cloned().collect(),
            relationships: self.relationships.union(&other.relationships).cloned().collect(),
        }
    }

    pub fn intersection(&self, other: &Subgraph) -> Subgraph {
        Subgraph::new(
            self.nodes.intersection(&other.nodes).cloned(),
            self.relationships.intersection(&other.relationships).cloned(),
        )
    }

    /// Relationships only in `self`, plus nodes only in `self` and the
    /// endpoints of the surviving relationships.
    pub fn difference(&self, other: &Subgraph) -> Subgraph {
        Subgraph::new(
            self.nodes.difference(&other.nodes).cloned(),
            self.relationships.difference(&other.relationships).cloned(),
        )
    }

    pub fn symmetric_difference(&self, other: &Subgraph) -> Subgraph {
        Subgraph::new(
            self.nodes.symmetric_difference(&other.nodes).cloned(),
            self.relationships.symmetric_difference(&other.relationships).cloned(),
        )
    }
}

impl PartialEq for Subgraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.relationships == other.relationships
    }
}

impl Eq for Subgraph {}

fn unordered_hash<'a, T: Hash + 'a>(items: impl IntoIterator<Item = &'a T>) -> u64 {
    items
        .into_iter()
        .map(|item| {
            let mut hasher = DefaultHasher::new();
            item.hash(&mut hasher);
            hasher.finish()
        })
        .fold(0u64, u64::wrapping_add)
}

impl Hash for Subgraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(unordered_hash(&self.nodes));
        state.write_u64(unordered_hash(&self.relationships));
    }
}

// ============================================================================
// GraphView impls
// ============================================================================

impl GraphView for Subgraph {
    fn node_set(&self) -> HashSet<Node> { self.nodes.clone() }
    fn relationship_set(&self) -> HashSet<Relationship> { self.relationships.clone() }
    fn to_subgraph(&self) -> Subgraph { self.clone() }
}

impl GraphView for Node {
    fn node_set(&self) -> HashSet<Node> {
        std::iter::once(self.clone()).collect()
    }

    fn relationship_set(&self) -> HashSet<Relationship> {
        HashSet::new()
    }
}

impl GraphView for Relationship {
    fn node_set(&self) -> HashSet<Node> {
        endpoints_of([self])
    }

    fn relationship_set(&self) -> HashSet<Relationship> {
        std::iter::once(self.clone()).collect()
    }
}

impl GraphView for Walkable {
    fn node_set(&self) -> HashSet<Node> {
        self.nodes().iter().cloned().collect()
    }

    fn relationship_set(&self) -> HashSet<Relationship> {
        self.relationships().iter().cloned().collect()
    }
}

// ============================================================================
// Set operators
// ============================================================================

macro_rules! subgraph_ops {
    ($($t:ty),*) => {$(
        impl<R: GraphView> BitOr<&R> for &$t {
            type Output = Subgraph;
            fn bitor(self, rhs: &R) -> Subgraph {
                self.to_subgraph().union(&rhs.to_subgraph())
            }
        }

        impl<R: GraphView> BitAnd<&R> for &$t {
            type Output = Subgraph;
            fn bitand(self, rhs: &R) -> Subgraph {
                self.to_subgraph().intersection(&rhs.to_subgraph())
            }
        }

        impl<R: GraphView> Sub<&R> for &$t {
            type Output = Subgraph;
            fn sub(self, rhs: &R) -> Subgraph {
                self.to_subgraph().difference(&rhs.to_subgraph())
            }
        }

        impl<R: GraphView> BitXor<&R> for &$t {
            type Output = Subgraph;
            fn bitxor(self, rhs: &R) -> Subgraph {
                self.to_subgraph().symmetric_difference(&rhs.to_subgraph())
            }
        }
    )*};
}

subgraph_ops!(Subgraph, Node, Relationship, Walkable, Record);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_inferred_from_relationships() {
        let alice = Node::new();
        let bob = Node::new();
        let knows = Relationship::new(&alice, "KNOWS", &bob);
        let subgraph = Subgraph::new([], [knows.clone()]);
        assert_eq!(subgraph.order(), 2);
        assert_eq!(subgraph.size(), 1);
        assert!(subgraph.nodes().contains(&alice));
        assert!(subgraph.nodes().contains(&bob));
    }

    #[test]
    fn test_hash_ignores_insertion_order() {
        let a = Node::new();
        let b = Node::new();
        let one = Subgraph::new([a.clone(), b.clone()], []);
        let two = Subgraph::new([b, a], []);
        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        one.hash(&mut h1);
        two.hash(&mut h2);
        assert_eq!(one, two);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_loop_has_order_one() {
        let dave = Node::new();
        let works_for = Relationship::new(&dave, "WORKS_FOR", &dave);
        assert_eq!(works_for.order(), 1);
        assert_eq!(works_for.size(), 1);
    }

    #[test]
    fn test_empty_subgraph() {
        let empty = Subgraph::default();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert!(!Node::new().to_subgraph().is_empty());
    }
}
