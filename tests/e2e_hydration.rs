//! End-to-end hydration tests.
//!
//! Each test feeds tagged wire rows through `Graph::hydrator()` and checks
//! the resulting records, the shared entity instances and the cache.

use chrono::NaiveDate;
use hashbrown::HashMap;
use pretty_assertions::assert_eq;

use neo4j_hydrate::{
    wire, Error, Graph, GraphView, HydrationConfig, MemoryLookup, Node, Path, PropertyValue,
    Relationship, Stale, TaggedValue, Value,
};

fn node(id: i64, labels: &[&str], props: Vec<(&str, TaggedValue)>) -> TaggedValue {
    TaggedValue::structure(wire::NODE, vec![
        id.into(),
        labels.to_vec().into(),
        props.into_iter().collect(),
    ])
}

fn bare_node(id: i64) -> TaggedValue {
    TaggedValue::structure(wire::NODE, vec![id.into(), TaggedValue::Null, TaggedValue::Null])
}

fn unbound(id: i64, rel_type: Option<&str>) -> TaggedValue {
    TaggedValue::structure(wire::UNBOUND_RELATIONSHIP, vec![
        id.into(),
        rel_type.into(),
        TaggedValue::Map(Default::default()),
    ])
}

fn path(nodes: Vec<TaggedValue>, rels: Vec<TaggedValue>, sequence: &[i64]) -> TaggedValue {
    TaggedValue::structure(wire::PATH, vec![
        nodes.into(),
        rels.into(),
        sequence.to_vec().into(),
    ])
}

fn name_of(node: &Node) -> Option<String> {
    node.get("name").and_then(|v| v.as_str().map(str::to_owned))
}

// ============================================================================
// 1. Identity: the same entity decodes to the same instance
// ============================================================================

#[test]
fn test_repeated_node_is_same_instance() {
    let mut graph = Graph::detached();
    let mut hydrator = graph.hydrator(["n"]);

    let first = hydrator
        .hydrate(vec![node(1, &["Person"], vec![("name", "Alice".into())])])
        .unwrap();
    let second = hydrator
        .hydrate(vec![node(1, &["Person", "Admin"], vec![("name", "Alicia".into())])])
        .unwrap();

    let a: Node = first.get_as("n").unwrap();
    let b: Node = second.get_as("n").unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(a, b);
    // The instance held from the first row sees the second payload.
    assert_eq!(name_of(&a).as_deref(), Some("Alicia"));
    assert!(a.has_label("Admin"));
    assert_eq!(graph.cache().node_count(), 1);
}

#[test]
fn test_graph_scopes_do_not_share_entities() {
    let mut one = Graph::detached();
    let mut two = Graph::detached();
    let a: Node = one.hydrator(["n"]).hydrate(vec![bare_node(1)]).unwrap().get_as("n").unwrap();
    let b: Node = two.hydrator(["n"]).hydrate(vec![bare_node(1)]).unwrap().get_as("n").unwrap();
    assert_ne!(a, b);
    assert_eq!(one.node(1), Some(a));
    assert_eq!(two.node(1), Some(b));
}

// ============================================================================
// 2. Staleness: absent keeps the old value, empty replaces it
// ============================================================================

#[test]
fn test_absent_fields_keep_value_and_go_stale() {
    let mut graph = Graph::detached();
    let mut hydrator = graph.hydrator(["n"]);
    let alice: Node = hydrator
        .hydrate(vec![node(1, &["Person"], vec![("name", "Alice".into())])])
        .unwrap()
        .get_as("n")
        .unwrap();
    assert!(alice.stale().is_empty());

    hydrator.hydrate(vec![bare_node(1)]).unwrap();
    assert!(alice.is_stale(Stale::LABELS));
    assert!(alice.is_stale(Stale::PROPERTIES));
    assert!(alice.has_label("Person"));
    assert_eq!(name_of(&alice).as_deref(), Some("Alice"));

    hydrator.hydrate(vec![node(1, &[], vec![])]).unwrap();
    assert!(alice.stale().is_empty());
    assert!(alice.labels().is_empty());
    assert!(alice.is_empty());
}

#[test]
fn test_relationship_refresh_keeps_endpoints_canonical() {
    let mut graph = Graph::detached();
    let rel = |props: TaggedValue| {
        TaggedValue::structure(wire::RELATIONSHIP, vec![
            7.into(), 1.into(), 2.into(), "KNOWS".into(), props,
        ])
    };
    let mut hydrator = graph.hydrator(["a", "r"]);
    let row = hydrator
        .hydrate(vec![
            node(1, &["Person"], vec![]),
            rel([("since", 1999)].into_iter().collect()),
        ])
        .unwrap();
    let alice: Node = row.get_as("a").unwrap();
    let knows: Relationship = row.get_as("r").unwrap();
    assert!(knows.start_node().ptr_eq(&alice));
    // Resolving endpoints is a lookup, not a refresh.
    assert!(!alice.is_stale(Stale::LABELS));
    assert_eq!(knows.get("since"), Some(PropertyValue::Int(1999)));

    hydrator.hydrate(vec![node(1, &["Person"], vec![]), rel(TaggedValue::Null)]).unwrap();
    assert!(knows.is_stale(Stale::PROPERTIES));
    assert_eq!(knows.get("since"), Some(PropertyValue::Int(1999)));
    assert_eq!(knows.rel_type().as_deref(), Some("KNOWS"));
}

#[test]
fn test_invalid_property_lists_fail_the_row() {
    let cases = [
        TaggedValue::List(vec![1.into(), "two".into()]),
        TaggedValue::List(vec![TaggedValue::List(vec![1.into()])]),
    ];
    for list in cases {
        let mut graph = Graph::detached();
        let result = graph.hydrator(["n"]).hydrate(vec![node(1, &[], vec![("xs", list)])]);
        assert!(matches!(result, Err(Error::Property(_))), "{result:?}");
        assert!(graph.cache().is_empty());
    }
}

// ============================================================================
// 3. Pass-through and extension functions
// ============================================================================

#[test]
fn test_unknown_structure_passes_through() {
    let mut graph = Graph::detached();
    let value = TaggedValue::structure(b'Z', vec![1.into(), bare_node(5)]);
    let record = graph.hydrator(["z"]).hydrate(vec![value]).unwrap();
    let Value::Structure { tag, fields } = record.get("z").unwrap() else {
        panic!("expected a pass-through structure");
    };
    assert_eq!(*tag, b'Z');
    assert_eq!(fields[0], Value::Int(1));
    // Fields are still hydrated.
    assert_eq!(fields[1].as_node().and_then(Node::identity), Some(5));
}

#[test]
fn test_builtin_functions_from_config() {
    let mut graph = Graph::detached();
    let config = HydrationConfig::default().with_builtin_functions();
    let mut hydrator = graph.hydrator(["d", "p"]).with_config(&config).unwrap();
    let record = hydrator
        .hydrate(vec![
            TaggedValue::structure(b'D', vec![0.into()]),
            TaggedValue::structure(b'X', vec![7203.into(), 1.5.into(), 2.5.into()]),
        ])
        .unwrap();
    assert_eq!(record.get("d").unwrap(), &Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()));
    assert_eq!(record.get("p").unwrap(), &Value::Point2D { srid: 7203, x: 1.5, y: 2.5 });
}

#[test]
fn test_builtin_functions_off_by_default() {
    let mut graph = Graph::detached();
    let record = graph
        .hydrator(["d"])
        .hydrate(vec![TaggedValue::structure(b'D', vec![0.into()])])
        .unwrap();
    assert!(matches!(record.get("d").unwrap(), Value::Structure { tag: b'D', .. }));
}

// ============================================================================
// 4. Hints: caller-held instances are refreshed in place
// ============================================================================

#[test]
fn test_hint_is_adopted() {
    let mut graph = Graph::detached();
    let held = Node::new().with_labels(["Draft"]);
    let record = graph
        .hydrator(["n"])
        .with_entities([("n", held.clone())])
        .hydrate(vec![node(3, &["Person"], vec![("name", "Carol".into())])])
        .unwrap();
    let decoded: Node = record.get_as("n").unwrap();
    assert!(decoded.ptr_eq(&held));
    assert_eq!(held.identity(), Some(3));
    assert_eq!(held.graph(), Some(graph.id()));
    assert!(!held.has_label("Draft"));
    assert_eq!(name_of(&held).as_deref(), Some("Carol"));
}

#[test]
fn test_hint_only_applies_to_its_column() {
    let mut graph = Graph::detached();
    let held = Node::new();
    graph
        .hydrator(["other", "n"])
        .with_entities([("n", held.clone())])
        .hydrate(vec![bare_node(1), bare_node(2)])
        .unwrap();
    assert_eq!(held.identity(), Some(2));
    assert!(!graph.node(1).unwrap().ptr_eq(&held));
}

#[test]
fn test_hint_refreshed_when_identity_already_cached() {
    let mut graph = Graph::detached();
    let earlier: Node = graph.hydrator(["n"]).hydrate(vec![bare_node(5)]).unwrap().get_as("n").unwrap();
    let held = Node::new();
    let record = graph
        .hydrator(["n"])
        .with_entities([("n", held.clone())])
        .hydrate(vec![node(5, &["Person"], vec![("name", "Alice".into())])])
        .unwrap();
    let decoded: Node = record.get_as("n").unwrap();
    assert!(decoded.ptr_eq(&held));
    assert!(!decoded.ptr_eq(&earlier));
    assert_eq!(held.identity(), Some(5));
    assert_eq!(name_of(&held).as_deref(), Some("Alice"));
    assert!(graph.node(5).unwrap().ptr_eq(&held));
}

// ============================================================================
// 5. Paths
// ============================================================================

#[test]
fn test_path_with_reversed_hop() {
    let mut graph = Graph::detached();
    let value = path(
        vec![
            node(1, &["A"], vec![]),
            node(2, &["B"], vec![]),
            node(3, &["C"], vec![]),
        ],
        vec![unbound(10, Some("KNOWS")), unbound(11, Some("LIKES"))],
        &[1, 1, -2, 2],
    );
    let record = graph.hydrator(["p"]).hydrate(vec![value]).unwrap();
    let p: Path = record.get_as("p").unwrap();

    let ids: Vec<_> = p.nodes().iter().map(|n| n.identity().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    let (r10, r11) = (&p.relationships()[0], &p.relationships()[1]);
    assert_eq!(r10.start_node().identity(), Some(1));
    assert_eq!(r10.end_node().identity(), Some(2));
    // Negative index: traversed against its direction.
    assert_eq!(r11.start_node().identity(), Some(3));
    assert_eq!(r11.end_node().identity(), Some(2));
    assert_eq!(r11.rel_type().as_deref(), Some("LIKES"));
    assert_eq!(p.to_string(), "(_1)-[:KNOWS]->(_2)<-[:LIKES]-(_3)");
    assert_eq!(p.order(), 3);
    assert_eq!(p.size(), 2);

    // Path entities are the cached instances.
    assert!(graph.relationship(11).unwrap().ptr_eq(r11));
    assert!(graph.node(2).unwrap().ptr_eq(&p.nodes()[1]));
}

#[test]
fn test_revisiting_path() {
    let mut graph = Graph::detached();
    let value = path(
        vec![bare_node(1), bare_node(2)],
        vec![unbound(10, Some("KNOWS"))],
        &[1, 1, -1, 0],
    );
    let p: Path = graph.hydrator(["p"]).hydrate(vec![value]).unwrap().get_as("p").unwrap();
    assert_eq!(p.len(), 2);
    assert_eq!(p.size(), 1);
    assert_eq!(p.order(), 2);
    assert!(p.size() < p.len());
    assert_eq!(p.start_node(), p.end_node());
}

#[test]
fn test_zero_length_path() {
    let mut graph = Graph::detached();
    let value = path(vec![bare_node(1)], vec![], &[]);
    let p: Path = graph.hydrator(["p"]).hydrate(vec![value]).unwrap().get_as("p").unwrap();
    assert!(p.is_empty());
    assert_eq!(p.order(), 1);
}

#[test]
fn test_malformed_paths_leave_cache_untouched() {
    let cases = [
        (vec![bare_node(1), bare_node(2)], &[1, 1, 1][..]),
        (vec![bare_node(1), bare_node(2)], &[2, 1][..]),
        (vec![bare_node(1), bare_node(2)], &[1, 5][..]),
        (vec![bare_node(1), bare_node(2)], &[0, 1][..]),
        (vec![], &[][..]),
    ];
    for (nodes, sequence) in cases {
        let mut graph = Graph::detached();
        let result = graph
            .hydrator(["p"])
            .hydrate(vec![path(nodes, vec![unbound(10, Some("KNOWS"))], sequence)]);
        assert!(
            matches!(result, Err(Error::OddPathSequence(_) | Error::PathIndexOutOfRange(_))),
            "sequence {sequence:?} gave {result:?}"
        );
        assert!(graph.cache().is_empty());
    }
}

#[test]
fn test_untyped_relationship_repaired_by_lookup() {
    let lookup = MemoryLookup::new();
    lookup.insert(10, "KNOWS");
    let mut graph = Graph::new(lookup.clone());
    let value = path(vec![bare_node(1), bare_node(2)], vec![unbound(10, None)], &[1, 1]);
    let p: Path = graph.hydrator(["p"]).hydrate(vec![value]).unwrap().get_as("p").unwrap();
    assert_eq!(p.relationships()[0].rel_type().as_deref(), Some("KNOWS"));
}

#[test]
fn test_unresolved_type_fails_row() {
    let mut graph = Graph::detached();
    let value = path(
        vec![bare_node(1), bare_node(2), bare_node(3)],
        vec![unbound(10, None), unbound(11, Some("LIKES"))],
        &[1, 1, 2, 2],
    );
    let result = graph.hydrator(["p"]).hydrate(vec![value]);
    match result {
        Err(Error::UnresolvedType { ids }) => assert_eq!(ids, vec![10]),
        other => panic!("expected UnresolvedType, got {other:?}"),
    }
    assert!(!graph.cache().contains_relationship(10));
    assert!(!graph.cache().contains_relationship(11));
    assert!(graph.cache().is_empty());
}

#[test]
fn test_lookup_failure_aborts_row() {
    let mut graph = Graph::new(|_: &[i64]| -> neo4j_hydrate::Result<HashMap<i64, String>> {
        Err(Error::Lookup("connection refused".into()))
    });
    let value = path(vec![bare_node(1), bare_node(2)], vec![unbound(10, None)], &[1, 1]);
    let result = graph.hydrator(["p"]).hydrate(vec![value]);
    assert!(matches!(result, Err(Error::Lookup(_))));
    assert!(graph.cache().is_empty());
}

// ============================================================================
// 6. Records
// ============================================================================

#[test]
fn test_row_shape_mismatch() {
    let mut graph = Graph::detached();
    let result = graph.hydrator(["a", "b", "c"]).hydrate(vec![1.into()]);
    assert!(matches!(result, Err(Error::Shape { keys: 3, values: 1 })));
}

#[test]
fn test_record_graph_view() {
    let mut graph = Graph::detached();
    let row = vec![
        TaggedValue::from(1001),
        node(1, &["Person"], vec![("name", "Alice".into())]),
        path(
            vec![bare_node(2), bare_node(3)],
            vec![unbound(10, Some("KNOWS"))],
            &[1, 1],
        ),
    ];
    let record = graph.hydrator(["id", "n", "p"]).hydrate(row).unwrap();
    assert_eq!(record.order(), 3);
    assert_eq!(record.size(), 1);
    assert_eq!(record.types().into_iter().collect::<Vec<_>>(), vec!["KNOWS".to_owned()]);
    assert!(record.labels().contains("Person"));
    assert_eq!(record.value(0), Some(&Value::Int(1001)));
    assert_eq!(record.value(-3), Some(&Value::Int(1001)));
    assert!(matches!(record.get("missing"), Err(Error::KeyNotFound(_))));
}
