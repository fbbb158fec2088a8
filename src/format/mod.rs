//! Label result persistence.
//!
//! Every labeled image gets a JSON sidecar next to it, named after the image
//! with its extension replaced by `_LABEL.json`:
//!
//! ```json
//! {
//!   "configVersion": "body-pose-14-v1",
//!   "imagePath": "/data/simple002.jpeg",
//!   "keypointGraphList": [[{ "name": "head_top", "x": 12.5, "y": 40.0, "properties": {} }]]
//! }
//! ```
//!
//! Documents are only restored against a labeling config with the same
//! `configVersion`.

mod auto_save;
mod document;
mod error;

pub use auto_save::AutoSaveManager;
pub use document::{DocumentErrors, LABEL_SUFFIX, LabelDocument, result_path_for};
pub use error::FormatError;
