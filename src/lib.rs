//! posetag - keypoint graph labeling
//!
//! Core of an image labeling tool for pose-style keypoint graphs. A JSON
//! labeling config defines the ordered keypoints, their skeleton edges and
//! per-point properties; labels for each image are stored in a `_LABEL.json`
//! file next to it.
//!
//! The [`Session`] owns all state and talks to the outside world through a
//! [`Shell`](shell::Shell), so the whole tool runs headless in tests.

pub mod config;
pub mod format;
pub mod handlers;
pub mod keybindings;
pub mod message;
pub mod model;
pub mod shell;
pub mod state;

pub use config::AppConfig;
pub use message::Message;
pub use model::Schema;
pub use state::{Session, SessionEvent};
