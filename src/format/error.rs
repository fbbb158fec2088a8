//! Error types for label result persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or restoring label results.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document was written with a different labeling config
    #[error("Label result uses config version {found}, but {expected} is loaded")]
    VersionMismatch {
        /// Version of the active schema
        expected: String,
        /// Version stored in the document
        found: String,
    },

    /// A stored graph has more points than the schema defines
    #[error("Keypoint graph #{graph} has {len} points, the labeling config allows {max}")]
    GraphTooLong {
        /// Index of the offending graph
        graph: usize,
        /// Stored length
        len: usize,
        /// Schema length
        max: usize,
    },

    /// A stored keypoint sits in a slot the schema gives another name
    #[error("Keypoint #{keypoint} of graph #{graph} is '{found}', the labeling config expects '{expected}'")]
    KeypointNameMismatch {
        graph: usize,
        keypoint: usize,
        expected: String,
        found: String,
    },

    /// A stored property is unknown, missing or of the wrong type
    #[error("Property '{key}' of keypoint #{keypoint} in graph #{graph} {problem}")]
    InvalidProperty {
        graph: usize,
        keypoint: usize,
        key: String,
        problem: String,
    },

    /// A path could not be turned into a label result path
    #[error("Cannot derive a label result path from {path:?}")]
    InvalidPath {
        /// The offending image path
        path: PathBuf,
    },
}

impl FormatError {
    /// Whether the document was rejected because of its config version.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, FormatError::VersionMismatch { .. })
    }
}
