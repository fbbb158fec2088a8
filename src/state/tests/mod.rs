//! Unit tests for the label state machine and the session.
//!
//! These tests drive the state through the same operations the UI uses and
//! check the graph list, cursors and pending entry after each step.

mod insertion_tests;

use serde_json::json;

use crate::model::Schema;

/// Labeling config with three keypoints `A -> B -> C`, one property each.
fn abc_config() -> serde_json::Value {
    json!({
        "configVersion": "abc-v1",
        "keypointGraph": [
            {
                "name": "A",
                "properties": {
                    "is_visible": { "type": "boolean", "title": "Visible", "default": true }
                }
            },
            {
                "name": "B",
                "neighbors": [0],
                "edgeColors": ["#ff0000"],
                "properties": {
                    "note": { "type": "string", "title": "Note", "default": "none" }
                }
            },
            {
                "name": "C",
                "neighbors": [1],
                "edgeColors": [255],
                "properties": {
                    "score": { "type": "number", "title": "Score", "default": 0.5 }
                }
            }
        ]
    })
}

fn abc_schema() -> Schema {
    Schema::from_value(abc_config()).unwrap()
}
