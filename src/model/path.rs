//! Walkable: a sequence of alternating nodes and relationships.
//!
//! A walk may revisit nodes and relationships, and each relationship may be
//! traversed with or against its natural direction. `len()` counts
//! relationship occurrences; `order()`/`size()` (from [`GraphView`]) count
//! distinct entities.
//!
//! [`GraphView`]: super::GraphView

use std::fmt;

use super::{Node, Relationship};
use super::relationship::node_ref;
use crate::{Error, Result};

/// Either kind of graph entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Node(Node),
    Relationship(Relationship),
}

impl From<Node> for Entity { fn from(n: Node) -> Self { Entity::Node(n) } }
impl From<Relationship> for Entity { fn from(r: Relationship) -> Self { Entity::Relationship(r) } }

/// A walk in the graph: node -[rel]- node -[rel]- node ...
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Walkable {
    /// Nodes along the walk. Always has one more element than `relationships`.
    nodes: Vec<Node>,
    /// Relationships connecting consecutive nodes, in either orientation.
    relationships: Vec<Relationship>,
}

/// Paths returned by the server are walkables.
pub type Path = Walkable;

fn connects(rel: &Relationship, a: &Node, b: &Node) -> bool {
    let (start, end) = rel.endpoints();
    (start == *a && end == *b) || (start == *b && end == *a)
}

impl Walkable {
    /// Build from an alternating Node/Relationship/.../Node sequence.
    pub fn new(sequence: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut relationships = Vec::new();
        for (i, entity) in sequence.into_iter().enumerate() {
            match (i % 2, entity) {
                (0, Entity::Node(node)) => {
                    if let Some(rel) = relationships.last() {
                        let prev = &nodes[nodes.len() - 1];
                        if !connects(rel, prev, &node) {
                            return Err(Error::InvalidWalk(format!(
                                "relationship {rel} does not connect {} and {}",
                                node_ref(prev),
                                node_ref(&node),
                            )));
                        }
                    }
                    nodes.push(node);
                }
                (_, Entity::Relationship(rel)) if i % 2 == 1 => relationships.push(rel),
                (_, entity) => {
                    return Err(Error::InvalidWalk(format!(
                        "expected alternating nodes and relationships, found {entity:?} at position {i}"
                    )));
                }
            }
        }
        if nodes.is_empty() || nodes.len() != relationships.len() + 1 {
            return Err(Error::InvalidWalk(
                "a walk must start and end with a node".into(),
            ));
        }
        Ok(Self { nodes, relationships })
    }

    pub fn single(node: Node) -> Self {
        Self { nodes: vec![node], relationships: Vec::new() }
    }

    /// Caller guarantees `nodes.len() == relationships.len() + 1` and adjacency.
    pub(crate) fn from_parts(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        debug_assert_eq!(nodes.len(), relationships.len() + 1);
        Self { nodes, relationships }
    }

    /// Compose walkables end to end. See [`walk`].
    pub fn join<I, W>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = W>,
        W: Into<Walkable>,
    {
        let mut items = items.into_iter();
        let first = items
            .next()
            .ok_or_else(|| Error::InvalidWalk("nothing to walk".into()))?;
        let mut joined = first.into();
        for item in items {
            joined.extend(item.into())?;
        }
        Ok(joined)
    }

    /// Concatenate with `other`, which must share a boundary node with the
    /// end of this walk. It is reversed if its end, not its start, matches.
    /// `None` returns this walk unchanged.
    pub fn concat(&self, other: Option<&Walkable>) -> Result<Walkable> {
        let mut joined = self.clone();
        if let Some(other) = other {
            joined.extend(other.clone())?;
        }
        Ok(joined)
    }

    fn extend(&mut self, mut other: Walkable) -> Result<()> {
        let end = self.end_node().clone();
        if end == *other.start_node() {
            // matches as-is
        } else if end == *other.end_node() {
            other = other.reversed();
        } else {
            return Err(Error::InvalidWalk(format!(
                "cannot append walk {other} to node {}",
                node_ref(&end),
            )));
        }
        self.nodes.extend(other.nodes.into_iter().skip(1));
        self.relationships.extend(other.relationships);
        Ok(())
    }

    /// Extend walk with a relationship and its target node.
    pub fn append(&mut self, rel: Relationship, node: Node) -> Result<()> {
        if !connects(&rel, self.end_node(), &node) {
            return Err(Error::InvalidWalk(format!(
                "relationship {rel} does not connect {} and {}",
                node_ref(self.end_node()),
                node_ref(&node),
            )));
        }
        self.relationships.push(rel);
        self.nodes.push(node);
        Ok(())
    }

    /// The same walk traversed from its end.
    pub fn reversed(&self) -> Walkable {
        let mut nodes = self.nodes.clone();
        let mut relationships = self.relationships.clone();
        nodes.reverse();
        relationships.reverse();
        Self { nodes, relationships }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Nodes in walk order, repeats included.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Relationships in walk order, repeats included.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Number of relationship occurrences.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn start_node(&self) -> &Node {
        self.nodes.first().expect("Walkable always has at least one node")
    }

    pub fn end_node(&self) -> &Node {
        self.nodes.last().expect("Walkable always has at least one node")
    }

    /// Relationship occurrence at `index`; negative indices count from the end.
    pub fn relationship(&self, index: isize) -> Option<&Relationship> {
        let len = self.relationships.len() as isize;
        let index = if index < 0 { index + len } else { index };
        if (0..len).contains(&index) {
            self.relationships.get(index as usize)
        } else {
            None
        }
    }

    /// Iterate relationship occurrences.
    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.relationships.iter()
    }

    /// The full alternating sequence.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        let head = std::iter::once(Entity::Node(self.start_node().clone()));
        let tail = self
            .relationships
            .iter()
            .zip(self.nodes.iter().skip(1))
            .flat_map(|(r, n)| [Entity::Relationship(r.clone()), Entity::Node(n.clone())]);
        head.chain(tail)
    }

    /// Sub-walk over relationship occurrences `start..end`.
    ///
    /// Negative bounds count from the end and out-of-range bounds are
    /// clamped. An empty range yields the single node at that boundary.
    pub fn slice(&self, start: Option<isize>, end: Option<isize>) -> Walkable {
        let len = self.relationships.len() as isize;
        let clamp = |i: isize| if i < 0 { (i + len).max(0) } else { i.min(len) };
        let start = start.map(clamp).unwrap_or(0);
        let end = end.map(clamp).unwrap_or(len).max(start);
        let (start, end) = (start as usize, end as usize);
        Self {
            nodes: self.nodes[start..=end].to_vec(),
            relationships: self.relationships[start..end].to_vec(),
        }
    }
}

impl<'a> IntoIterator for &'a Walkable {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.relationships.iter()
    }
}

impl From<Node> for Walkable {
    fn from(node: Node) -> Self { Walkable::single(node) }
}

impl From<&Node> for Walkable {
    fn from(node: &Node) -> Self { Walkable::single(node.clone()) }
}

impl From<Relationship> for Walkable {
    fn from(rel: Relationship) -> Self {
        let (start, end) = rel.endpoints();
        Walkable { nodes: vec![start, end], relationships: vec![rel] }
    }
}

impl From<&Relationship> for Walkable {
    fn from(rel: &Relationship) -> Self { Walkable::from(rel.clone()) }
}

impl From<&Walkable> for Walkable {
    fn from(walk: &Walkable) -> Self { walk.clone() }
}

/// Compose nodes, relationships and walks into one alternating sequence.
///
/// Each item must start or end at the node where the walk so far ends;
/// items joined at their end are traversed in reverse. No items yields an
/// empty sequence.
pub fn walk<I, W>(items: I) -> Result<Vec<Entity>>
where
    I: IntoIterator<Item = W>,
    W: Into<Walkable>,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return Ok(Vec::new());
    }
    Ok(Walkable::join(items)?.entities().collect())
}

/// Renders each hop in traversal direction: `(_1)-[:A]->(_2)<-[:B]-(_3)`.
impl fmt::Display for Walkable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", node_ref(self.start_node()))?;
        for (i, rel) in self.relationships.iter().enumerate() {
            let prev = &self.nodes[i];
            let next = &self.nodes[i + 1];
            let label = rel.rel_type().map(|t| format!(":{t}")).unwrap_or_default();
            if rel.start_node() == *prev {
                write!(f, "-[{label}]->{}", node_ref(next))?;
            } else {
                write!(f, "<-[{label}]-{}", node_ref(next))?;
            }
        }
        Ok(())
    }
}
