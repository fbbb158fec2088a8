//! Placed keypoints and their property values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::schema::{PropertyType, PropertyValue};

/// A property value together with the schema information it was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Declared type; writes of other types are rejected
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Display label
    pub title: String,
    /// Current value
    pub value: PropertyValue,
}

/// Property values keyed by property name.
pub type Properties = BTreeMap<String, Property>;

/// A single labeled point in image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Schema name copied at creation time
    pub name: String,
    /// Image-space x
    pub x: f64,
    /// Image-space y
    pub y: f64,
    /// Per-point properties
    #[serde(default)]
    pub properties: Properties,
}

impl Keypoint {
    /// Create a keypoint.
    pub fn new(name: impl Into<String>, x: f64, y: f64, properties: Properties) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            properties,
        }
    }

    /// Squared distance to an image-space position.
    pub fn distance_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Ordered keypoints of one subject, in schema order.
pub type KeypointGraph = Vec<Keypoint>;

/// A skeleton edge ready for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSegment {
    /// Graph the edge belongs to
    pub graph: usize,
    /// Keypoint the edge starts from
    pub from: usize,
    /// Earlier keypoint the edge ends at
    pub to: usize,
    /// Start position
    pub start: (f64, f64),
    /// End position
    pub end: (f64, f64),
    /// Packed RGB color
    pub color: u32,
}

/// One row of the graph list panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    /// Position in the graph list
    pub index: usize,
    /// Number of placed points
    pub points: usize,
    /// Whether the graph has all schema keypoints
    pub full: bool,
    /// Whether this is the current graph
    pub current: bool,
    /// Whether the delete action is available
    pub deletable: bool,
}

impl GraphSummary {
    /// Row title, e.g. `Keypoint Graph #0`.
    pub fn title(&self) -> String {
        format!("Keypoint Graph #{}", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let mut props = Properties::new();
        props.insert(
            "is_visible".to_string(),
            Property {
                kind: PropertyType::Boolean,
                title: "Visible".to_string(),
                value: PropertyValue::Boolean(false),
            },
        );
        let kp = Keypoint::new("nose", 1.5, 2.0, props);

        let json = serde_json::to_value(&kp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "nose",
                "x": 1.5,
                "y": 2.0,
                "properties": {
                    "is_visible": { "type": "boolean", "title": "Visible", "value": false }
                }
            })
        );
    }

    #[test]
    fn test_distance() {
        let kp = Keypoint::new("nose", 0.0, 0.0, Properties::new());
        assert_eq!(kp.distance_sq(3.0, 4.0), 25.0);
    }
}
