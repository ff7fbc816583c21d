use goalgraph_core::{GoalId, GoalStatus, TreeResponse};
use goalgraph_events::{AnomalyKind, MemorySink};
use goalgraph_graph::{
    CollapseStore, LayoutParams, RawGoalNode, build_tree, compute_layout, sanitize_tree,
    tree_stats,
};

const GOAL_TREE: &str = include_str!("fixtures/goal_tree.json");

#[test]
fn fetched_payload_flows_through_the_whole_pipeline() {
    let response: TreeResponse = serde_json::from_str(GOAL_TREE).unwrap();
    let sink = MemorySink::new();

    let mut collapse = CollapseStore::new();
    collapse.sync(&response.nodes);
    let merged = collapse.merge(&response.nodes);

    let built = build_tree(&merged, response.root_id.as_ref(), &sink)
        .unwrap()
        .unwrap();

    // The dangling "stray" node is diagnosed, everything else attaches.
    assert_eq!(built.node_count(), 5);
    assert_eq!(
        sink.take(),
        vec![(AnomalyKind::UnreachableNode, GoalId::from("stray"))]
    );

    // Builder output is already well-formed; the sanitizer confirms rather
    // than repairs.
    let sanitized = sanitize_tree(&RawGoalNode::from(&built), &sink);
    assert_eq!(sanitized, built);
    assert!(sink.is_empty());

    // Collapse state survived the merge without touching structure.
    let frontend = sanitized.find(&GoalId::from("frontend")).unwrap();
    assert!(frontend.ui.collapsed);

    let layout = compute_layout(&sanitized, &LayoutParams::new(1280.0, 720.0)).unwrap();
    assert_eq!(layout.nodes.len(), 5);
    assert_eq!(layout.links.len(), 4);

    let stats = tree_stats(&sanitized);
    assert_eq!(stats.total_goals, 5);
    assert_eq!(stats.completed_goals, 1);
    assert_eq!(stats.max_depth, 2);
}

#[test]
fn malformed_children_in_injected_tree_do_not_break_layout() {
    // A nested payload that bypassed the flat-list path: one node carries a
    // junk children value.
    let injected: RawGoalNode = serde_json::from_str(
        r#"{
            "id": "root",
            "title": "Root",
            "children": [
                {"id": "ok", "title": "Fine", "children": []},
                {"id": "broken", "title": "Broken", "children": {"bad": true}}
            ]
        }"#,
    )
    .unwrap();

    let sink = MemorySink::new();
    let sanitized = sanitize_tree(&injected, &sink);

    assert_eq!(
        sink.take(),
        vec![(AnomalyKind::MalformedChildren, GoalId::from("broken"))]
    );

    // Layout still produces valid coordinates for every node.
    let layout = compute_layout(&sanitized, &LayoutParams::new(800.0, 600.0)).unwrap();
    assert_eq!(layout.nodes.len(), 3);
    assert!(layout
        .nodes
        .iter()
        .all(|n| n.position.x.is_finite() && n.position.y.is_finite()));
}

#[test]
fn empty_collection_yields_no_tree_and_no_layout() {
    let sink = MemorySink::new();
    let built = build_tree(&[], None, &sink).unwrap();
    assert!(built.is_none());
    // Nothing to lay out: the caller renders the empty state instead.
}

#[test]
fn statuses_parse_from_the_wire_enumeration() {
    let response: TreeResponse = serde_json::from_str(GOAL_TREE).unwrap();
    let statuses: Vec<GoalStatus> = response.nodes.iter().map(|n| n.status).collect();
    assert!(statuses.contains(&GoalStatus::Blocked));
    assert!(statuses.contains(&GoalStatus::Done));
}
