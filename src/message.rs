//! Application message types.
//!
//! Every user action reaches the session as a [`Message`], Elm style.

use std::path::PathBuf;

use crate::keybindings::Key;
use crate::model::PropertyValue;
use crate::state::{PointerButton, ToolMode};

/// Messages that can be sent to update session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Viewport
    /// Click on the image at image coordinates
    ViewportClicked {
        button: PointerButton,
        x: f64,
        y: f64,
    },
    /// Press on a drawn keypoint
    KeypointPressed { graph: usize, keypoint: usize },
    /// Drag of a drawn keypoint to image coordinates
    KeypointDragged {
        graph: usize,
        keypoint: usize,
        x: f64,
        y: f64,
    },

    // Keyboard
    /// Key went down; `repeat` is set for auto-repeat
    KeyPressed { key: Key, repeat: bool },
    /// Key went up
    KeyReleased { key: Key, repeat: bool },

    // Label panel
    /// Tool mode radio changed
    ToolModeSelected(ToolMode),
    /// "Next graph" button
    StartNextGraph,
    /// "Pop" button
    PopPoint,
    /// Graph row clicked
    SelectGraph(usize),
    /// Graph delete button
    DeleteGraph(usize),
    /// Position typed into the point editor
    SetPointPosition {
        graph: usize,
        keypoint: usize,
        x: f64,
        y: f64,
    },
    /// Property edited in the point editor
    SetPointProperty {
        graph: usize,
        keypoint: usize,
        key: String,
        value: PropertyValue,
    },
    /// Property edited in the next-keypoint panel
    SetPendingProperty { key: String, value: PropertyValue },
    /// Point editor closed
    DeselectPoint,

    // File and navigation
    /// Open a labeling config
    OpenConfig,
    /// Open a workspace folder
    SelectWorkspace,
    /// Open a specific image
    OpenImage(PathBuf),
    /// Go to the next image in the workspace
    NextImage,
    /// Go to the previous image in the workspace
    PrevImage,
    /// Save the current labels
    Save,
    /// Toggle auto-save
    SetAutoSave(bool),
}
