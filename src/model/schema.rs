//! Keypoint schema (labeling config) types and validation.
//!
//! A schema is the versioned definition of which keypoints make up one graph,
//! in which order they are placed, how they connect for skeleton rendering and
//! which typed properties each keypoint carries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::keypoint::{Properties, Property};

/// Labeling config shipped with the application.
const BUNDLED_CONFIG: &str = include_str!("../../assets/labeling_config.json");

/// Value type of a keypoint property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// A checkbox-style flag
    Boolean,
    /// A floating point number
    Number,
    /// Free text
    String,
}

impl PropertyType {
    /// Get the config name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Number => "number",
            PropertyType::String => "string",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value. Serialized as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean value
    Boolean(bool),
    /// Numeric value
    Number(f64),
    /// Text value
    String(String),
}

impl PropertyValue {
    /// The value used when a schema omits a default.
    pub fn zero(kind: PropertyType) -> Self {
        match kind {
            PropertyType::Boolean => PropertyValue::Boolean(false),
            PropertyType::Number => PropertyValue::Number(0.0),
            PropertyType::String => PropertyValue::String(String::new()),
        }
    }

    /// The type this value belongs to.
    pub fn kind(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Number(_) => PropertyType::Number,
            PropertyValue::String(_) => PropertyType::String,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

/// Schema of one keypoint property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Expected value type
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Display label
    pub title: String,
    /// Value a new keypoint starts with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
}

impl PropertySchema {
    /// Create a property instance holding the default value.
    pub fn instantiate(&self) -> Property {
        Property {
            kind: self.kind,
            title: self.title.clone(),
            value: self
                .default
                .clone()
                .unwrap_or_else(|| PropertyValue::zero(self.kind)),
        }
    }
}

/// Color of a skeleton edge, written either as a number or as a hex string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeColor {
    /// Packed `0xRRGGBB` value
    Number(u32),
    /// `"0xRRGGBB"`, `"#RRGGBB"` or `"RRGGBB"`
    Text(String),
}

impl EdgeColor {
    /// Resolve to a packed 24-bit RGB value.
    pub fn rgb(&self) -> Option<u32> {
        let value = match self {
            EdgeColor::Number(n) => *n,
            EdgeColor::Text(s) => {
                let s = s.trim();
                let hex = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .or_else(|| s.strip_prefix('#'))
                    .unwrap_or(s);
                u32::from_str_radix(hex, 16).ok()?
            }
        };
        (value <= 0xFF_FFFF).then_some(value)
    }
}

/// Definition of one keypoint in the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeypointSchemaEntry {
    /// Stable identifier copied into every placed keypoint
    pub name: String,
    /// Human readable name, defaults to `name`
    #[serde(default)]
    pub display_text: String,
    /// Property schema keyed by property name
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    /// Indices of earlier keypoints this one connects to
    #[serde(default)]
    pub neighbors: Vec<usize>,
    /// One color per neighbor
    #[serde(default)]
    pub edge_colors: Vec<EdgeColor>,
}

impl KeypointSchemaEntry {
    /// Name to show in the UI.
    pub fn label(&self) -> &str {
        if self.display_text.is_empty() {
            &self.name
        } else {
            &self.display_text
        }
    }

    /// Fresh property values for a keypoint of this kind.
    pub fn default_properties(&self) -> Properties {
        self.properties
            .iter()
            .map(|(key, prop)| (key.clone(), prop.instantiate()))
            .collect()
    }
}

/// Raw config document as it appears on disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDocument {
    #[serde(default)]
    config_version: Option<String>,
    #[serde(default)]
    keypoint_graph: Option<Vec<KeypointSchemaEntry>>,
}

/// Errors that make a labeling config unusable.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not valid JSON or has the wrong shape
    #[error("Failed to parse labeling config: {0}")]
    Parse(#[from] serde_json::Error),

    /// `configVersion` is missing or empty
    #[error("Labeling config has no configVersion")]
    MissingVersion,

    /// `keypointGraph` is missing or empty
    #[error("Labeling config defines no keypoints")]
    EmptyKeypointGraph,

    /// A neighbor does not point at an earlier keypoint
    #[error("Keypoint #{index} ({name}) lists neighbor {neighbor}, which is not an earlier keypoint")]
    InvalidNeighbor {
        index: usize,
        name: String,
        neighbor: usize,
    },

    /// `edgeColors` and `neighbors` differ in length
    #[error("Keypoint #{index} ({name}) has {colors} edge colors for {neighbors} neighbors")]
    EdgeColorCountMismatch {
        index: usize,
        name: String,
        colors: usize,
        neighbors: usize,
    },

    /// An edge color could not be read as RGB
    #[error("Keypoint #{index} ({name}) has unreadable edge color {color:?}")]
    InvalidEdgeColor {
        index: usize,
        name: String,
        color: EdgeColor,
    },

    /// A property default does not match its declared type
    #[error("Property '{property}' of keypoint #{index} ({name}) needs a {expected} default")]
    DefaultTypeMismatch {
        index: usize,
        name: String,
        property: String,
        expected: PropertyType,
    },
}

/// A validated keypoint schema.
///
/// Immutable once loaded; a reload replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    config_version: String,
    keypoints: Vec<KeypointSchemaEntry>,
}

impl Schema {
    /// Parse and validate a labeling config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Validate an already parsed labeling config.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_json::from_value(value)?;
        Self::from_document(doc)
    }

    /// Build a schema directly from entries (validated like a loaded config).
    pub fn new(
        config_version: impl Into<String>,
        keypoints: Vec<KeypointSchemaEntry>,
    ) -> Result<Self, SchemaError> {
        Self::from_document(SchemaDocument {
            config_version: Some(config_version.into()),
            keypoint_graph: Some(keypoints),
        })
    }

    /// The labeling config bundled with the application.
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_CONFIG).expect("Bundled labeling config should always be valid")
    }

    fn from_document(doc: SchemaDocument) -> Result<Self, SchemaError> {
        let config_version = doc
            .config_version
            .filter(|v| !v.trim().is_empty())
            .ok_or(SchemaError::MissingVersion)?;
        let mut keypoints = doc
            .keypoint_graph
            .filter(|k| !k.is_empty())
            .ok_or(SchemaError::EmptyKeypointGraph)?;

        for (index, entry) in keypoints.iter_mut().enumerate() {
            validate_entry(index, entry)?;
            if entry.display_text.is_empty() {
                entry.display_text = entry.name.clone();
            }
        }

        log::debug!(
            "Validated labeling config {} with {} keypoints",
            config_version,
            keypoints.len()
        );

        Ok(Self {
            config_version,
            keypoints,
        })
    }

    /// Version string stamped on every label result.
    pub fn config_version(&self) -> &str {
        &self.config_version
    }

    /// Number of keypoints in a full graph.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Always false for a validated schema.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// All keypoint definitions in placement order.
    pub fn entries(&self) -> &[KeypointSchemaEntry] {
        &self.keypoints
    }

    /// Definition of the keypoint at `index`.
    pub fn entry(&self, index: usize) -> Option<&KeypointSchemaEntry> {
        self.keypoints.get(index)
    }

    /// Default property values for the keypoint at `index`.
    pub fn default_properties(&self, index: usize) -> Option<Properties> {
        self.entry(index).map(KeypointSchemaEntry::default_properties)
    }

    /// Whether a graph with `len` points is complete.
    pub fn is_full(&self, len: usize) -> bool {
        len >= self.keypoints.len()
    }

    /// Skeleton edges of the keypoint at `index` as `(neighbor, rgb)` pairs.
    pub fn edges_of(&self, index: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.entry(index).into_iter().flat_map(|entry| {
            entry
                .neighbors
                .iter()
                .zip(&entry.edge_colors)
                .filter_map(|(&neighbor, color)| color.rgb().map(|rgb| (neighbor, rgb)))
        })
    }

    /// Placement chain with the next keypoint bracketed, e.g. `A -> [B] -> C`.
    pub fn insertion_hint(&self, next: usize) -> String {
        self.keypoints
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                if i == next {
                    format!("[{}]", entry.label())
                } else {
                    entry.label().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

fn validate_entry(index: usize, entry: &KeypointSchemaEntry) -> Result<(), SchemaError> {
    if let Some(&neighbor) = entry.neighbors.iter().find(|&&n| n >= index) {
        return Err(SchemaError::InvalidNeighbor {
            index,
            name: entry.name.clone(),
            neighbor,
        });
    }

    if entry.edge_colors.len() != entry.neighbors.len() {
        return Err(SchemaError::EdgeColorCountMismatch {
            index,
            name: entry.name.clone(),
            colors: entry.edge_colors.len(),
            neighbors: entry.neighbors.len(),
        });
    }

    if let Some(color) = entry.edge_colors.iter().find(|c| c.rgb().is_none()) {
        return Err(SchemaError::InvalidEdgeColor {
            index,
            name: entry.name.clone(),
            color: color.clone(),
        });
    }

    for (key, prop) in &entry.properties {
        if let Some(default) = &prop.default {
            if default.kind() != prop.kind {
                return Err(SchemaError::DefaultTypeMismatch {
                    index,
                    name: entry.name.clone(),
                    property: key.clone(),
                    expected: prop.kind,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(name: &str, neighbors: Vec<usize>) -> serde_json::Value {
        let colors: Vec<_> = neighbors.iter().map(|_| "0xff5e08").collect();
        json!({
            "name": name,
            "displayText": name.to_uppercase(),
            "properties": {
                "is_visible": { "type": "boolean", "title": "Visible", "default": true }
            },
            "neighbors": neighbors,
            "edgeColors": colors,
        })
    }

    #[test]
    fn test_valid_config() {
        let schema = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [entry("a", vec![]), entry("b", vec![0]), entry("c", vec![0, 1])],
        }))
        .unwrap();

        assert_eq!(schema.config_version(), "v1");
        assert_eq!(schema.len(), 3);
        assert!(schema.is_full(3));
        assert!(!schema.is_full(2));
        assert_eq!(schema.entry(1).unwrap().label(), "B");
    }

    #[test]
    fn test_missing_version() {
        let err = Schema::from_value(json!({ "keypointGraph": [entry("a", vec![])] })).unwrap_err();
        assert!(matches!(err, SchemaError::MissingVersion));

        let err = Schema::from_value(json!({
            "configVersion": "",
            "keypointGraph": [entry("a", vec![])],
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingVersion));
    }

    #[test]
    fn test_empty_keypoint_graph() {
        let err = Schema::from_value(json!({ "configVersion": "v1" })).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyKeypointGraph));

        let err =
            Schema::from_value(json!({ "configVersion": "v1", "keypointGraph": [] })).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyKeypointGraph));
    }

    #[test]
    fn test_forward_neighbor_rejected() {
        let err = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [entry("a", vec![1]), entry("b", vec![])],
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidNeighbor { index: 0, neighbor: 1, .. }
        ));

        // Self-loops are not earlier keypoints either
        let err = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [entry("a", vec![]), entry("b", vec![1])],
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidNeighbor { index: 1, .. }));
    }

    #[test]
    fn test_edge_color_count_mismatch() {
        let err = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [
                entry("a", vec![]),
                { "name": "b", "neighbors": [0], "edgeColors": [] },
            ],
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::EdgeColorCountMismatch { colors: 0, neighbors: 1, .. }
        ));
    }

    #[test]
    fn test_default_type_mismatch() {
        let err = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [{
                "name": "a",
                "properties": { "is_visible": { "type": "boolean", "title": "Visible", "default": "yes" } },
            }],
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DefaultTypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_property_type_rejected() {
        let err = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [{
                "name": "a",
                "properties": { "side": { "type": "enum", "title": "Side" } },
            }],
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn test_missing_default_uses_zero_value() {
        let schema = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [{
                "name": "a",
                "properties": {
                    "flag": { "type": "boolean", "title": "Flag" },
                    "score": { "type": "number", "title": "Score" },
                    "note": { "type": "string", "title": "Note" },
                },
            }],
        }))
        .unwrap();

        let props = schema.default_properties(0).unwrap();
        assert_eq!(props["flag"].value, PropertyValue::Boolean(false));
        assert_eq!(props["score"].value, PropertyValue::Number(0.0));
        assert_eq!(props["note"].value, PropertyValue::String(String::new()));
        assert!(schema.default_properties(1).is_none());
    }

    #[test]
    fn test_display_text_falls_back_to_name() {
        let schema = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [{ "name": "nose" }],
        }))
        .unwrap();
        assert_eq!(schema.entry(0).unwrap().display_text, "nose");
    }

    #[test]
    fn test_edge_color_forms() {
        assert_eq!(EdgeColor::Text("0xff5e08".into()).rgb(), Some(0xff5e08));
        assert_eq!(EdgeColor::Text("#00FF00".into()).rgb(), Some(0x00ff00));
        assert_eq!(EdgeColor::Text("0000ff".into()).rgb(), Some(0x0000ff));
        assert_eq!(EdgeColor::Number(16711935).rgb(), Some(0xff00ff));
        assert_eq!(EdgeColor::Text("tomato".into()).rgb(), None);
        assert_eq!(EdgeColor::Number(0x1_000_000).rgb(), None);
    }

    #[test]
    fn test_edges_of() {
        let schema = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [
                entry("a", vec![]),
                entry("b", vec![0]),
                { "name": "c", "neighbors": [0, 1], "edgeColors": ["#010203", 42] },
            ],
        }))
        .unwrap();

        assert_eq!(schema.edges_of(0).count(), 0);
        assert_eq!(schema.edges_of(1).collect::<Vec<_>>(), vec![(0, 0xff5e08)]);
        assert_eq!(
            schema.edges_of(2).collect::<Vec<_>>(),
            vec![(0, 0x010203), (1, 42)]
        );
        assert_eq!(schema.edges_of(9).count(), 0);
    }

    #[test]
    fn test_insertion_hint() {
        let schema = Schema::from_value(json!({
            "configVersion": "v1",
            "keypointGraph": [{ "name": "a" }, { "name": "b" }, { "name": "c" }],
        }))
        .unwrap();
        assert_eq!(schema.insertion_hint(1), "a -> [b] -> c");
        assert_eq!(schema.insertion_hint(3), "a -> b -> c");
    }

    #[test]
    fn test_bundled_config_adjacency() {
        let schema = Schema::bundled();
        assert!(!schema.is_empty());
        for (index, entry) in schema.entries().iter().enumerate() {
            assert_eq!(entry.neighbors.len(), entry.edge_colors.len());
            for &neighbor in &entry.neighbors {
                assert!(neighbor < index, "{} -> {}", entry.name, neighbor);
            }
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Schema::from_json("{ not json"),
            Err(SchemaError::Parse(_))
        ));
    }
}
