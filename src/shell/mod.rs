//! Request/response contracts with the desktop shell.
//!
//! The session never touches dialogs or the filesystem itself. It queues
//! [`Request`]s, a [`Shell`] implementation fulfils them and the answers come
//! back as [`Response`]s carrying the same [`RequestId`].

#[cfg(not(target_arch = "wasm32"))]
mod native;
mod queue;

use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeShell;
pub use queue::RequestQueue;

use crate::format::LabelDocument;

/// Identifier pairing a response with its request.
pub type RequestId = u64;

/// Work the shell is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// Let the user pick a labeling config file and parse it
    OpenConfigFile,
    /// Let the user pick a workspace directory and list its images
    SelectWorkspace,
    /// Write a label result
    SaveLabelResult {
        /// Sidecar path
        path: PathBuf,
        /// Document to write
        document: LabelDocument,
    },
    /// Read a label result, which may not exist
    LoadLabelResult {
        /// Sidecar path
        path: PathBuf,
    },
    /// Load an image and report its size
    LoadImage {
        /// Image path
        path: PathBuf,
    },
}

impl RequestKind {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::OpenConfigFile => "open-config-file",
            RequestKind::SelectWorkspace => "select-workspace",
            RequestKind::SaveLabelResult { .. } => "save-label-result",
            RequestKind::LoadLabelResult { .. } => "load-label-result",
            RequestKind::LoadImage { .. } => "load-image",
        }
    }
}

/// A queued request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Identifier echoed by the response
    pub id: RequestId,
    /// What to do
    pub kind: RequestKind,
}

/// A labeling config picked by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Where it was read from
    pub path: PathBuf,
    /// Parsed JSON, not yet validated
    pub value: serde_json::Value,
}

/// A workspace picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceListing {
    /// The chosen directory
    pub folder: PathBuf,
    /// Image files directly inside it
    pub images: Vec<PathBuf>,
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    /// The user dismissed a dialog
    Cancelled,
    /// Answer to [`RequestKind::OpenConfigFile`]
    ConfigLoaded(Result<ConfigFile, String>),
    /// Answer to [`RequestKind::SelectWorkspace`]
    WorkspaceSelected(Result<WorkspaceListing, String>),
    /// Answer to [`RequestKind::SaveLabelResult`]
    LabelResultSaved {
        /// Sidecar path
        path: PathBuf,
        /// Error detail on failure
        result: Result<(), String>,
    },
    /// Answer to [`RequestKind::LoadLabelResult`]; `Ok(None)` means no file exists
    LabelResultLoaded {
        /// Sidecar path
        path: PathBuf,
        /// Parsed document JSON
        result: Result<Option<serde_json::Value>, String>,
    },
    /// Answer to [`RequestKind::LoadImage`]
    ImageLoaded {
        /// Image path
        path: PathBuf,
        /// Width and height
        result: Result<(u32, u32), String>,
    },
}

/// A shell answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Identifier of the request being answered
    pub id: RequestId,
    /// Outcome
    pub kind: ResponseKind,
}

/// Something that can fulfil session requests.
pub trait Shell {
    /// Carry out `request` and report the outcome.
    fn fulfil(&mut self, request: &Request) -> Response;
}
