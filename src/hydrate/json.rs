//! Legacy REST JSON pre-pass.
//!
//! The REST interface returns entities as JSON objects identified by URIs
//! rather than tagged structures. [`normalize`] rewrites those shapes into
//! the `N`/`R`/`P` structures the decoder understands, bottom-up:
//!
//! | JSON object | Becomes |
//! |-------------|---------|
//! | has `self` and `type` | `R(id, start, end, type, data)` |
//! | has `self`, no `type` | `N(id, metadata.labels, data)` |
//! | has `nodes` and `relationships` | `P([N(id)…], [r(id)…], [1, 1, 2, 2, …])` |
//! | anything else | map, unchanged |
//!
//! Path relationships carry no type, so decoding them goes through the
//! graph's lookup.

use std::collections::HashMap;

use serde_json::{Map, Number, Value as Json};

use crate::model::PropertyError;
use crate::wire::{self, TaggedValue};
use crate::{Error, Result};

/// Identity from an entity URI: its last path segment.
pub fn uri_to_id(uri: &str) -> Result<i64> {
    let segment = uri.rsplit_once('/').map_or(uri, |(_, last)| last);
    segment.parse().map_err(|_| Error::InvalidUri(uri.to_owned()))
}

/// Rewrite a legacy JSON value into tagged values.
pub fn normalize(value: Json) -> Result<TaggedValue> {
    Ok(match value {
        Json::Null => TaggedValue::Null,
        Json::Bool(b) => TaggedValue::Bool(b),
        Json::Number(n) => number(&n)?,
        Json::String(s) => TaggedValue::String(s),
        Json::Array(items) => TaggedValue::List(items.into_iter().map(normalize).collect::<Result<_>>()?),
        Json::Object(map) => object(map)?,
    })
}

/// Integer literals must fit in `i64`; only literals with a fraction or
/// exponent become floats.
fn number(n: &Number) -> Result<TaggedValue> {
    if let Some(i) = n.as_i64() {
        return Ok(TaggedValue::Int(i));
    }
    let literal = n.to_string();
    if !literal.contains(['.', 'e', 'E']) {
        return Err(PropertyError::IntegerOutOfRange(literal).into());
    }
    match n.as_f64() {
        Some(f) => Ok(TaggedValue::Float(f)),
        None => Err(PropertyError::UnsupportedType("non-finite FLOAT").into()),
    }
}

fn object(map: Map<String, Json>) -> Result<TaggedValue> {
    let mut map = map
        .into_iter()
        .map(|(k, v)| -> Result<(String, TaggedValue)> { Ok((k, normalize(v)?)) })
        .collect::<Result<HashMap<String, TaggedValue>>>()?;

    if map.contains_key("self") {
        let identity = uri_field(&map, "self")?;
        let data = map.remove("data").unwrap_or(TaggedValue::Null);
        if let Some(rel_type) = map.remove("type") {
            let start = uri_field(&map, "start")?;
            let end = uri_field(&map, "end")?;
            return Ok(TaggedValue::structure(wire::RELATIONSHIP, vec![
                identity.into(),
                start.into(),
                end.into(),
                rel_type,
                data,
            ]));
        }
        let labels = match map.remove("metadata") {
            Some(TaggedValue::Map(mut metadata)) => metadata.remove("labels").unwrap_or(TaggedValue::Null),
            _ => TaggedValue::Null,
        };
        return Ok(TaggedValue::structure(wire::NODE, vec![identity.into(), labels, data]));
    }

    if map.contains_key("nodes") && map.contains_key("relationships") {
        let nodes = uri_list(&map, "nodes")?;
        let relationships = uri_list(&map, "relationships")?;
        let directions = map.get("directions").and_then(TaggedValue::as_list).unwrap_or_default();

        let sequence = (0..relationships.len())
            .flat_map(|i| {
                let hop = i as i64 + 1;
                let reversed = directions.get(i).and_then(TaggedValue::as_str) == Some("<-");
                [if reversed { -hop } else { hop }, hop]
            })
            .map(TaggedValue::Int)
            .collect::<Vec<_>>();

        let unresolved = |tag: u8, id: i64| {
            TaggedValue::structure(tag, vec![id.into(), TaggedValue::Null, TaggedValue::Null])
        };
        return Ok(TaggedValue::structure(wire::PATH, vec![
            TaggedValue::List(nodes.into_iter().map(|id| unresolved(wire::NODE, id)).collect()),
            TaggedValue::List(
                relationships
                    .into_iter()
                    .map(|id| unresolved(wire::UNBOUND_RELATIONSHIP, id))
                    .collect(),
            ),
            TaggedValue::List(sequence),
        ]));
    }

    Ok(TaggedValue::Map(map))
}

fn uri_field(map: &HashMap<String, TaggedValue>, key: &str) -> Result<i64> {
    map.get(key)
        .and_then(TaggedValue::as_str)
        .ok_or_else(|| Error::InvalidUri(format!("'{key}' is not a URI")))
        .and_then(uri_to_id)
}

fn uri_list(map: &HashMap<String, TaggedValue>, key: &str) -> Result<Vec<i64>> {
    map.get(key)
        .and_then(TaggedValue::as_list)
        .ok_or_else(|| Error::InvalidUri(format!("'{key}' is not a list of URIs")))?
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| Error::InvalidUri(format!("'{key}' holds a non-string entry")))
                .and_then(uri_to_id)
        })
        .collect()
}
