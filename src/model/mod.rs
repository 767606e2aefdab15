//! # Property Graph Model
//!
//! The types hydration produces. Nodes and relationships are shared handles
//! owned by a graph's entity cache; walks, subgraphs and records are plain
//! values built from those handles.
//!
//! Design rule: no wire types leak out of here except through the
//! `IntoProperty` conversions. This module does no I/O.

pub mod identity;
pub mod property;
pub mod node;
pub mod relationship;
pub mod path;
pub mod subgraph;
pub mod record;
pub mod value;

pub use identity::{Binding, GraphId, Stale};
pub use property::{IntoProperty, PropertyError, PropertyMap, PropertyValue, MAX_INTEGER, MIN_INTEGER};
pub use node::Node;
pub use relationship::Relationship;
pub use path::{walk, Entity, Path, Walkable};
pub use subgraph::{GraphView, Subgraph};
pub use record::{FromValue, Record};
pub use value::{IsoDuration, Value};
