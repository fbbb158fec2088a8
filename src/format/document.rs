//! Label result document: the per-image JSON sidecar.
//!
//! # Compatibility
//!
//! A document records the `configVersion` of the labeling config it was made
//! with. Only documents with exactly the active version are restored. Any
//! other version is rejected as a whole; keypoint names and property schemas
//! may have changed, so a partial migration is never attempted.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::model::{Keypoint, KeypointGraph, KeypointSchemaEntry, Schema};
use crate::state::LabelState;

/// Suffix that replaces the image extension in sidecar file names.
pub const LABEL_SUFFIX: &str = "_LABEL.json";

/// Path of the label result for `image`, e.g. `a/b.jpg` -> `a/b_LABEL.json`.
pub fn result_path_for(image: &Path) -> Result<PathBuf, FormatError> {
    let stem = image.file_stem().ok_or_else(|| FormatError::InvalidPath {
        path: image.to_path_buf(),
    })?;
    let mut name = OsString::from(stem);
    name.push(LABEL_SUFFIX);
    Ok(image.with_file_name(name))
}

/// Session errors stamped into a saved document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentErrors {
    /// Last labeling config error
    pub config_error: Option<String>,
    /// Image loading error for this image
    pub image_load_error: Option<String>,
}

/// The persisted label result for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDocument {
    /// Version of the labeling config used
    pub config_version: String,

    /// Config error at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,

    /// Image the labels belong to
    pub image_path: String,

    /// Image loading error at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_load_error: Option<String>,

    /// All keypoint graphs in order
    #[serde(default)]
    pub keypoint_graph_list: Vec<KeypointGraph>,
}

impl LabelDocument {
    /// Snapshot the label state into a document.
    pub fn from_state(
        schema: &Schema,
        label: &LabelState,
        image_path: &Path,
        errors: &DocumentErrors,
    ) -> Self {
        Self {
            config_version: schema.config_version().to_string(),
            config_error: errors.config_error.clone(),
            image_path: image_path.to_string_lossy().into_owned(),
            image_load_error: errors.image_load_error.clone(),
            keypoint_graph_list: label.graphs().to_vec(),
        }
    }

    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a document from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, FormatError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to JSON with pretty printing.
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, FormatError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Number of placed keypoints across all graphs.
    pub fn total_points(&self) -> usize {
        self.keypoint_graph_list.iter().map(Vec::len).sum()
    }

    /// Turn the document back into label state for `schema`.
    ///
    /// An empty graph list restores to a fresh state. Every stored keypoint
    /// must carry the name of its schema slot and exactly that slot's
    /// properties, each with a value of the declared type.
    pub fn restore(self, schema: &Schema) -> Result<LabelState, FormatError> {
        if self.config_version != schema.config_version() {
            return Err(FormatError::VersionMismatch {
                expected: schema.config_version().to_string(),
                found: self.config_version,
            });
        }

        for (g, graph) in self.keypoint_graph_list.iter().enumerate() {
            if graph.len() > schema.len() {
                return Err(FormatError::GraphTooLong {
                    graph: g,
                    len: graph.len(),
                    max: schema.len(),
                });
            }
            for (k, (keypoint, entry)) in graph.iter().zip(schema.entries()).enumerate() {
                check_keypoint(entry, g, k, keypoint)?;
            }
        }

        log::debug!(
            "Restoring {} graphs with {} points for {}",
            self.keypoint_graph_list.len(),
            self.total_points(),
            self.image_path
        );
        Ok(LabelState::from_graphs(schema, self.keypoint_graph_list))
    }
}

fn check_keypoint(
    entry: &KeypointSchemaEntry,
    graph: usize,
    index: usize,
    keypoint: &Keypoint,
) -> Result<(), FormatError> {
    if keypoint.name != entry.name {
        return Err(FormatError::KeypointNameMismatch {
            graph,
            keypoint: index,
            expected: entry.name.clone(),
            found: keypoint.name.clone(),
        });
    }

    let invalid = |key: &str, problem: String| FormatError::InvalidProperty {
        graph,
        keypoint: index,
        key: key.to_string(),
        problem,
    };
    if let Some(key) = keypoint
        .properties
        .keys()
        .find(|key| !entry.properties.contains_key(*key))
    {
        return Err(invalid(key, "is not in the labeling config".into()));
    }
    for (key, expected) in &entry.properties {
        let Some(stored) = keypoint.properties.get(key) else {
            return Err(invalid(key, "is missing".into()));
        };
        let found = stored.value.kind();
        if stored.kind != expected.kind || found != expected.kind {
            return Err(invalid(
                key,
                format!("holds a {} value, expected {}", found, expected.kind),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyValue;
    use serde_json::json;

    fn schema(version: &str) -> Schema {
        Schema::from_value(json!({
            "configVersion": version,
            "keypointGraph": [
                { "name": "A", "properties": { "is_visible": { "type": "boolean", "title": "Visible", "default": true } } },
                { "name": "B", "neighbors": [0], "edgeColors": ["0xff0000"] },
                { "name": "C", "neighbors": [1], "edgeColors": [255] },
            ],
        }))
        .unwrap()
    }

    fn labeled(schema: &Schema) -> LabelState {
        let mut label = LabelState::new(schema);
        for i in 0..3 {
            label
                .insert_next_point(schema, i as f64 + 0.25, i as f64 * 2.0)
                .unwrap();
        }
        label
            .set_point_property(0, 0, "is_visible", PropertyValue::Boolean(false))
            .unwrap();
        label.start_next_graph(schema).unwrap();
        label.insert_next_point(schema, 10.0, 20.0).unwrap();
        label
    }

    #[test]
    fn test_result_path() {
        assert_eq!(
            result_path_for(Path::new("/data/img/simple002.jpeg")).unwrap(),
            PathBuf::from("/data/img/simple002_LABEL.json")
        );
        assert_eq!(
            result_path_for(Path::new("a/b.c.png")).unwrap(),
            PathBuf::from("a/b.c_LABEL.json")
        );
        assert_eq!(
            result_path_for(Path::new("noext")).unwrap(),
            PathBuf::from("noext_LABEL.json")
        );
        assert!(result_path_for(Path::new("/")).is_err());
    }

    #[test]
    fn test_document_shape() {
        let schema = schema("v1");
        let label = LabelState::new(&schema);
        let doc = LabelDocument::from_state(
            &schema,
            &label,
            Path::new("img/a.png"),
            &DocumentErrors::default(),
        );

        let value = doc.to_value().unwrap();
        assert_eq!(
            value,
            json!({ "configVersion": "v1", "imagePath": "img/a.png", "keypointGraphList": [[]] })
        );

        let doc = LabelDocument::from_state(
            &schema,
            &label,
            Path::new("img/a.png"),
            &DocumentErrors {
                config_error: None,
                image_load_error: Some("decode failed".into()),
            },
        );
        assert_eq!(doc.to_value().unwrap()["imageLoadError"], "decode failed");
    }

    #[test]
    fn test_roundtrip_same_version() {
        let schema = schema("v1");
        let label = labeled(&schema);
        let doc = LabelDocument::from_state(
            &schema,
            &label,
            Path::new("a.jpg"),
            &DocumentErrors::default(),
        );

        let json = doc.to_json().unwrap();
        let restored = LabelDocument::from_json(&json)
            .unwrap()
            .restore(&schema)
            .unwrap();

        assert_eq!(restored.graphs(), label.graphs());
        assert_eq!(restored.current_graph(), 1);
        assert_eq!(restored.selection(), None);
        assert_eq!(restored.next_index(), 1);
        assert_eq!(restored.pending().index, 1);
    }

    #[test]
    fn test_restore_full_last_graph_prepares_first_keypoint() {
        let schema = schema("v1");
        let mut label = LabelState::new(&schema);
        for i in 0..3 {
            label.insert_next_point(&schema, i as f64, 0.0).unwrap();
        }
        let doc = LabelDocument::from_state(
            &schema,
            &label,
            Path::new("a.jpg"),
            &DocumentErrors::default(),
        );

        let mut restored = doc.restore(&schema).unwrap();
        assert_eq!(restored.pending().index, 0);
        assert!(restored.is_current_full(&schema));
        assert_eq!(restored.start_next_graph(&schema), Ok(1));
        assert_eq!(restored.graphs().len(), 2);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let old = schema("v1");
        let new = schema("v2");
        let doc = LabelDocument::from_state(
            &old,
            &labeled(&old),
            Path::new("a.jpg"),
            &DocumentErrors::default(),
        );

        let err = doc.restore(&new).unwrap_err();
        assert!(err.is_version_mismatch());
        match err {
            FormatError::VersionMismatch { expected, found } => {
                assert_eq!(expected, "v2");
                assert_eq!(found, "v1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_list_restores_fresh_state() {
        let schema = schema("v1");
        let doc = LabelDocument::from_value(json!({
            "configVersion": "v1",
            "imagePath": "a.jpg",
            "keypointGraphList": [],
        }))
        .unwrap();

        let restored = doc.restore(&schema).unwrap();
        assert_eq!(restored, LabelState::new(&schema));
    }

    #[test]
    fn test_graph_longer_than_schema_rejected() {
        let schema = schema("v1");
        let point = json!({ "name": "A", "x": 0.0, "y": 0.0, "properties": {} });
        let doc = LabelDocument::from_value(json!({
            "configVersion": "v1",
            "imagePath": "a.jpg",
            "keypointGraphList": [[point, point, point, point]],
        }))
        .unwrap();

        assert!(matches!(
            doc.restore(&schema),
            Err(FormatError::GraphTooLong { graph: 0, len: 4, max: 3 })
        ));
    }

    #[test]
    fn test_missing_image_path_is_invalid() {
        let err = LabelDocument::from_value(json!({ "configVersion": "v1" })).unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
    }

    fn single_point(point: serde_json::Value) -> LabelDocument {
        LabelDocument::from_value(json!({
            "configVersion": "v1",
            "imagePath": "a.jpg",
            "keypointGraphList": [[point]],
        }))
        .unwrap()
    }

    #[test]
    fn test_keypoint_in_wrong_slot_rejected() {
        let schema = schema("v1");
        let doc = single_point(json!({
            "name": "Z", "x": 1.0, "y": 1.0,
            "properties": { "is_visible": { "type": "boolean", "title": "Visible", "value": true } },
        }));

        match doc.restore(&schema) {
            Err(FormatError::KeypointNameMismatch {
                graph: 0,
                keypoint: 0,
                expected,
                found,
            }) => {
                assert_eq!(expected, "A");
                assert_eq!(found, "Z");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_property_of_wrong_type_rejected() {
        let schema = schema("v1");
        let doc = single_point(json!({
            "name": "A", "x": 1.0, "y": 1.0,
            "properties": { "is_visible": { "type": "boolean", "title": "Visible", "value": "yes" } },
        }));

        let err = doc.restore(&schema).unwrap_err();
        assert!(matches!(
            &err,
            FormatError::InvalidProperty { key, .. } if key == "is_visible"
        ));
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_unknown_or_missing_property_rejected() {
        let schema = schema("v1");
        let extra = single_point(json!({
            "name": "A", "x": 1.0, "y": 1.0,
            "properties": {
                "is_visible": { "type": "boolean", "title": "Visible", "value": true },
                "occluded": { "type": "boolean", "title": "Occluded", "value": false },
            },
        }));
        assert!(matches!(
            extra.restore(&schema),
            Err(FormatError::InvalidProperty { key, .. }) if key == "occluded"
        ));

        let missing = single_point(json!({ "name": "A", "x": 1.0, "y": 1.0, "properties": {} }));
        assert!(matches!(
            missing.restore(&schema),
            Err(FormatError::InvalidProperty { key, .. }) if key == "is_visible"
        ));
    }
}
