//! Tests for insertion mode: inserting, popping and moving between graphs.

use super::abc_schema;
use crate::model::PropertyValue;
use crate::state::{LabelError, LabelState};

#[test]
fn test_fresh_state() {
    let schema = abc_schema();
    let label = LabelState::new(&schema);

    assert_eq!(label.graphs().len(), 1);
    assert!(label.graphs()[0].is_empty());
    assert_eq!(label.current_graph(), 0);
    assert_eq!(label.next_index(), 0);
    assert_eq!(label.selection(), None);
    assert_eq!(label.pending().index, 0);
    assert_eq!(
        label.pending().properties["is_visible"].value,
        PropertyValue::Boolean(true)
    );
}

#[test]
fn test_abc_scenario() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);

    assert_eq!(label.insert_next_point(&schema, 1.0, 1.0), Ok(0));
    assert_eq!(label.insert_next_point(&schema, 2.0, 2.0), Ok(1));
    assert_eq!(label.insert_next_point(&schema, 3.0, 3.0), Ok(2));

    let names: Vec<_> = label.graphs()[0].iter().map(|kp| kp.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert!(label.is_current_full(&schema));

    // A fourth insert is a no-op
    let before = label.clone();
    assert_eq!(
        label.insert_next_point(&schema, 4.0, 4.0),
        Err(LabelError::GraphFull { graph: 0 })
    );
    assert_eq!(label, before);

    assert_eq!(label.start_next_graph(&schema), Ok(1));
    assert_eq!(label.graphs().len(), 2);
    assert_eq!(label.next_index(), 0);
    assert_eq!(label.pending().index, 0);

    // Pop on the new empty graph is a no-op
    let before = label.clone();
    assert_eq!(
        label.pop_last_point().unwrap_err(),
        LabelError::GraphEmpty { graph: 1 }
    );
    assert_eq!(label, before);
    assert_eq!(label.graphs()[0].len(), 3);
}

#[test]
fn test_n_inserts_fill_graph() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);

    for i in 0..schema.len() {
        assert!(!label.is_current_full(&schema));
        label.insert_next_point(&schema, i as f64, 0.0).unwrap();
    }
    assert!(label.is_current_full(&schema));
    assert_eq!(label.point_count(), schema.len());
}

#[test]
fn test_pending_follows_next_index() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);

    label.insert_next_point(&schema, 0.0, 0.0).unwrap();
    assert_eq!(label.pending().index, 1);
    assert!(label.pending().properties.contains_key("note"));

    label.insert_next_point(&schema, 0.0, 0.0).unwrap();
    assert_eq!(label.pending().index, 2);
    assert!(label.pending().properties.contains_key("score"));

    // Inserting the last keypoint leaves the pending entry as it was
    label.insert_next_point(&schema, 0.0, 0.0).unwrap();
    assert_eq!(label.pending().index, 2);
}

#[test]
fn test_pending_property_used_by_insert() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);

    label
        .set_pending_property("is_visible", PropertyValue::Boolean(false))
        .unwrap();
    label.insert_next_point(&schema, 5.0, 6.0).unwrap();

    let a = label.keypoint(0, 0).unwrap();
    assert_eq!(a.properties["is_visible"].value, PropertyValue::Boolean(false));
    assert_eq!((a.x, a.y), (5.0, 6.0));

    // The next keypoint starts from its own defaults
    assert_eq!(
        label.pending().properties["note"].value,
        PropertyValue::String("none".into())
    );
}

#[test]
fn test_pending_property_errors() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);

    assert_eq!(
        label.set_pending_property("note", PropertyValue::String("x".into())),
        Err(LabelError::UnknownProperty { key: "note".into() })
    );
    assert!(matches!(
        label.set_pending_property("is_visible", PropertyValue::Number(1.0)),
        Err(LabelError::PropertyTypeMismatch { .. })
    ));
    assert_eq!(
        label.pending().properties["is_visible"].value,
        PropertyValue::Boolean(true)
    );
}

#[test]
fn test_pop_inverts_insert() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);
    label.insert_next_point(&schema, 1.0, 1.0).unwrap();
    let after_a = label.graphs().to_vec();

    label
        .set_pending_property("note", PropertyValue::String("elbow hidden".into()))
        .unwrap();
    label.insert_next_point(&schema, 2.0, 2.0).unwrap();
    let inserted = label.keypoint(0, 1).unwrap().clone();

    let popped = label.pop_last_point().unwrap();
    assert_eq!(popped, inserted);
    assert_eq!(label.graphs(), after_a.as_slice());
    assert_eq!(label.pending().index, 1);
    assert_eq!(label.pending().properties, inserted.properties);

    // Re-inserting restores the removed keypoint's values
    label.insert_next_point(&schema, 2.0, 2.0).unwrap();
    assert_eq!(label.keypoint(0, 1), Some(&inserted));
}

#[test]
fn test_next_graph_requires_full() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);
    label.insert_next_point(&schema, 1.0, 1.0).unwrap();

    let before = label.clone();
    assert_eq!(
        label.start_next_graph(&schema),
        Err(LabelError::GraphNotFull { graph: 0 })
    );
    assert_eq!(label, before);
}

#[test]
fn test_next_graph_advances_to_existing_graph() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);
    for _ in 0..3 {
        label.insert_next_point(&schema, 0.0, 0.0).unwrap();
    }
    label.start_next_graph(&schema).unwrap();
    label.insert_next_point(&schema, 9.0, 9.0).unwrap();

    label.select_graph(&schema, 0).unwrap();
    assert_eq!(label.current_graph(), 0);
    assert_eq!(label.pending().index, 0);

    // Graph 1 already exists, so nothing is appended
    assert_eq!(label.start_next_graph(&schema), Ok(1));
    assert_eq!(label.graphs().len(), 2);
    assert_eq!(label.next_index(), 1);
    assert_eq!(label.pending().index, 1);
}

#[test]
fn test_from_graphs_places_cursor_on_last_graph() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);
    for _ in 0..3 {
        label.insert_next_point(&schema, 0.0, 0.0).unwrap();
    }
    label.start_next_graph(&schema).unwrap();
    label.insert_next_point(&schema, 1.0, 1.0).unwrap();

    let restored = LabelState::from_graphs(&schema, label.graphs().to_vec());
    assert_eq!(restored.current_graph(), 1);
    assert_eq!(restored.next_index(), 1);
    assert_eq!(restored.pending().index, 1);
    assert_eq!(restored.selection(), None);

    assert_eq!(LabelState::from_graphs(&schema, Vec::new()), LabelState::new(&schema));
}

#[test]
fn test_reset() {
    let schema = abc_schema();
    let mut label = LabelState::new(&schema);
    label.insert_next_point(&schema, 1.0, 1.0).unwrap();
    label.reset(&schema);
    assert_eq!(label, LabelState::new(&schema));
}
