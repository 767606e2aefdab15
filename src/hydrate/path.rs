//! Path assembly from `P` structures.
//!
//! A `P` structure carries the distinct nodes, the distinct unbound
//! relationships, and a flat sequence of `(relationship index, node index)`
//! pairs. Relationship indices are 1-based; a negative index means the
//! relationship is traversed against its direction.
//!
//! Everything is validated, and missing relationship types are repaired via
//! the graph's [`EntityLookup`](crate::lookup::EntityLookup), before
//! anything reaches the entity cache. A failed path leaves the cache as it
//! was.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::{arity, int_field, malformed, optional_properties, optional_type, parse_node, Hydrator};
use crate::cache::{NodeFields, RelationshipFields, Source};
use crate::model::*;
use crate::wire::{self, Structure, TaggedValue};
use crate::{Error, Result};

/// A relationship known only by id, type and properties.
#[derive(Debug)]
struct UnboundRelationship {
    identity: i64,
    rel_type: Option<String>,
    properties: Option<PropertyMap>,
}

impl UnboundRelationship {
    fn parse(value: TaggedValue) -> Result<Self> {
        let TaggedValue::Structure(s) = value else {
            return Err(malformed(wire::PATH, format!("expected an unbound relationship, got {}", value.type_name())));
        };
        let tag = s.tag;
        if tag != wire::UNBOUND_RELATIONSHIP {
            return Err(malformed(tag, "expected an unbound relationship structure"));
        }
        let [identity, rel_type, properties] = arity(s)?;
        Ok(Self {
            identity: int_field(tag, &identity, "id")?,
            rel_type: optional_type(tag, rel_type)?,
            properties: optional_properties(tag, properties)?,
        })
    }
}

fn list_field(value: TaggedValue, name: &str) -> Result<Vec<TaggedValue>> {
    match value {
        TaggedValue::List(items) => Ok(items),
        other => Err(malformed(wire::PATH, format!("{name} must be a list, got {}", other.type_name()))),
    }
}

fn parse_path_node(value: TaggedValue) -> Result<(i64, NodeFields)> {
    match value {
        TaggedValue::Structure(s) => parse_node(s),
        other => Err(malformed(wire::PATH, format!("expected a node, got {}", other.type_name()))),
    }
}

/// Check the sequence against the node and relationship counts.
fn validate_sequence(sequence: &[i64], nodes: usize, relationships: usize) -> Result<()> {
    if nodes == 0 {
        return Err(Error::PathIndexOutOfRange("path has no nodes".into()));
    }
    if sequence.len() % 2 != 0 {
        return Err(Error::OddPathSequence(sequence.len()));
    }
    for pair in sequence.chunks_exact(2) {
        let (rel_index, node_index) = (pair[0], pair[1]);
        if rel_index == 0 || rel_index.unsigned_abs() > relationships as u64 {
            return Err(Error::PathIndexOutOfRange(format!(
                "relationship index {rel_index} with {relationships} relationships"
            )));
        }
        if node_index < 0 || node_index as u64 >= nodes as u64 {
            return Err(Error::PathIndexOutOfRange(format!(
                "node index {node_index} with {nodes} nodes"
            )));
        }
    }
    Ok(())
}

impl Hydrator<'_> {
    pub(super) fn decode_path(&mut self, s: Structure) -> Result<Path> {
        let [nodes, relationships, sequence] = arity(s)?;
        let nodes = list_field(nodes, "nodes")?
            .into_iter()
            .map(parse_path_node)
            .collect::<Result<Vec<_>>>()?;
        let mut unbound = list_field(relationships, "relationships")?
            .into_iter()
            .map(UnboundRelationship::parse)
            .collect::<Result<Vec<_>>>()?;
        let sequence = list_field(sequence, "sequence")?
            .iter()
            .map(|v| int_field(wire::PATH, v, "sequence entry"))
            .collect::<Result<Vec<_>>>()?;

        validate_sequence(&sequence, nodes.len(), unbound.len())?;
        self.repair_types(&mut unbound)?;

        let cache = self.graph.cache_mut();
        let nodes: Vec<Node> = nodes
            .into_iter()
            .map(|(identity, fields)| cache.update_node(identity, Source::Construct, fields))
            .collect();

        let mut last = nodes[0].clone();
        let mut path_nodes = Vec::with_capacity(sequence.len() / 2 + 1);
        let mut path_rels = Vec::with_capacity(sequence.len() / 2);
        path_nodes.push(last.clone());

        for pair in sequence.chunks_exact(2) {
            let next = nodes[pair[1] as usize].clone();
            let u = &unbound[(pair[0].unsigned_abs() - 1) as usize];
            let (start, end) = if pair[0] > 0 {
                (last.clone(), next.clone())
            } else {
                (next.clone(), last.clone())
            };
            trace!(identity = u.identity, reversed = pair[0] < 0, "path hop");
            let rel = cache.update_relationship(
                u.identity,
                Source::Construct,
                RelationshipFields {
                    start,
                    end,
                    rel_type: u.rel_type.clone(),
                    properties: u.properties.clone(),
                },
            );
            path_rels.push(rel);
            path_nodes.push(next.clone());
            last = next;
        }

        Ok(Walkable::from_parts(path_nodes, path_rels))
    }

    /// Fill in types missing from legacy data with one batched lookup.
    fn repair_types(&self, unbound: &mut [UnboundRelationship]) -> Result<()> {
        let mut missing: SmallVec<[i64; 8]> = unbound
            .iter()
            .filter(|u| u.rel_type.is_none())
            .map(|u| u.identity)
            .collect();
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return Ok(());
        }

        debug!(ids = ?missing.as_slice(), "looking up missing relationship types");
        let found = self
            .graph
            .lookup()
            .relationship_types(&missing)
            .inspect_err(|e| warn!(error = %e, "relationship type lookup failed"))?;

        let mut unresolved: Vec<i64> = missing.iter().copied().filter(|id| !found.contains_key(id)).collect();
        if !unresolved.is_empty() {
            unresolved.sort_unstable();
            unresolved.dedup();
            warn!(ids = ?unresolved, "relationship types could not be resolved");
            return Err(Error::UnresolvedType { ids: unresolved });
        }

        for u in unbound.iter_mut().filter(|u| u.rel_type.is_none()) {
            u.rel_type = found.get(&u.identity).cloned();
        }
        Ok(())
    }
}
