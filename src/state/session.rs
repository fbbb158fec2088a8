//! The labeling session: schema, labels, mode, current image and workspace.
//!
//! The session owns all mutable state. Work that needs the outside world is
//! queued as a [`Request`]; the shell's [`Response`] is fed back through
//! [`Session::handle_response`]. Observers registered with
//! [`Session::subscribe`] hear about every change.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::format::{AutoSaveManager, DocumentErrors, FormatError, LabelDocument, result_path_for};
use crate::keybindings::KeyBindings;
use crate::model::{Keypoint, PropertyValue, Schema, SchemaError};
use crate::shell::{
    ConfigFile, Request, RequestId, RequestKind, RequestQueue, Response, ResponseKind, Shell,
    WorkspaceListing,
};
use crate::state::control::{ControlState, ToolMode};
use crate::state::label::{LabelError, LabelState};
use crate::state::notice::{Notice, NoticeLevel};
use crate::state::workspace::WorkspaceState;

/// Change notifications delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Graphs, cursors or the pending entry changed
    LabelsChanged,
    /// Tool mode or pan mode changed
    ModeChanged,
    /// A new labeling config became active
    SchemaChanged,
    /// The current image, its size or its load error changed
    ImageChanged,
    /// A workspace was opened
    WorkspaceChanged,
    /// A message for the user
    Notice(Notice),
}

type Observer = Box<dyn FnMut(&SessionEvent)>;

/// Labeling session state.
pub struct Session {
    schema: Schema,
    schema_source: Option<PathBuf>,
    config_error: Option<String>,

    label: LabelState,
    control: ControlState,
    keybindings: KeyBindings,

    image: Option<PathBuf>,
    image_size: Option<(u32, u32)>,
    image_load_error: Option<String>,
    /// Sidecar whose load result is still outstanding
    awaiting_result: Option<PathBuf>,

    workspace: Option<WorkspaceState>,
    auto_save: AutoSaveManager,
    notices: Vec<Notice>,
    queue: RequestQueue,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config_version", &self.schema.config_version())
            .field("image", &self.image)
            .field("graphs", &self.label.graphs().len())
            .field("control", &self.control)
            .field("pending_requests", &self.queue.pending())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with `schema` active and no image open.
    pub fn new(schema: Schema, config: &AppConfig) -> Self {
        let auto_save = config.preferences.auto_save_manager();

        log::info!(
            "Session started with labeling config '{}' ({} keypoints)",
            schema.config_version(),
            schema.len()
        );

        Self {
            label: LabelState::new(&schema),
            schema,
            schema_source: None,
            config_error: None,
            control: ControlState::default(),
            keybindings: config.keybindings.clone(),
            image: None,
            image_size: None,
            image_load_error: None,
            awaiting_result: None,
            workspace: None,
            auto_save,
            notices: Vec::new(),
            queue: RequestQueue::new(),
            observers: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// File the active schema was read from, if any.
    pub fn schema_source(&self) -> Option<&Path> {
        self.schema_source.as_deref()
    }

    /// Last labeling config error.
    pub fn config_error(&self) -> Option<&str> {
        self.config_error.as_deref()
    }

    pub fn label(&self) -> &LabelState {
        &self.label
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    /// Path of the image being labeled.
    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    /// Width and height once the image has loaded.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn image_load_error(&self) -> Option<&str> {
        self.image_load_error.as_deref()
    }

    /// Whether the current image's label result is still being read.
    pub fn is_loading_labels(&self) -> bool {
        self.auto_save.is_loading()
    }

    pub fn workspace(&self) -> Option<&WorkspaceState> {
        self.workspace.as_ref()
    }

    pub fn auto_save(&self) -> &AutoSaveManager {
        &self.auto_save
    }

    /// Whether any request is still unanswered.
    pub fn has_pending_requests(&self) -> bool {
        !self.queue.is_idle()
    }

    /// Usage hint for the current mode.
    pub fn control_tips(&self) -> String {
        self.control.control_tips(&self.keybindings.pan.label())
    }

    // ------------------------------------------------------------------
    // Observers and notices
    // ------------------------------------------------------------------

    /// Register a change observer.
    pub fn subscribe(&mut self, observer: impl FnMut(&SessionEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Drain the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
        self.notices.push(notice.clone());
        self.emit(SessionEvent::Notice(notice));
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    /// Validate and activate a labeling config.
    ///
    /// On failure the previous schema and labels stay in place and the error
    /// is kept in [`Session::config_error`]. On success the labels are reset
    /// and, if an image is open, its label result is read again.
    pub fn load_schema_value(
        &mut self,
        value: serde_json::Value,
        source: Option<PathBuf>,
    ) -> Result<(), SchemaError> {
        let schema = match Schema::from_value(value) {
            Ok(schema) => schema,
            Err(e) => {
                self.config_error = Some(e.to_string());
                self.notify(Notice::error(format!("Invalid labeling config: {}", e)));
                return Err(e);
            }
        };

        if self.image.is_some() && self.auto_save.should_save_on_switch() {
            self.save();
        }

        log::debug!(
            "Activating labeling config '{}' from {:?}",
            schema.config_version(),
            source
        );
        self.schema = schema;
        self.schema_source = source;
        self.config_error = None;
        self.label.reset(&self.schema);
        self.emit(SessionEvent::SchemaChanged);
        self.notify(Notice::info(format!(
            "Loaded labeling config '{}' with {} keypoints",
            self.schema.config_version(),
            self.schema.len()
        )));

        match self.image.clone() {
            Some(image) => self.request_label_result(&image),
            None => self.auto_save.begin(false),
        }
        self.emit(SessionEvent::LabelsChanged);
        Ok(())
    }

    /// Ask the shell for a labeling config file.
    pub fn open_config(&mut self) -> RequestId {
        self.queue.push(RequestKind::OpenConfigFile)
    }

    // ------------------------------------------------------------------
    // Label operations
    // ------------------------------------------------------------------

    /// Apply an operation that changes the saved document.
    fn edit<T>(
        &mut self,
        op: impl FnOnce(&mut LabelState, &Schema) -> Result<T, LabelError>,
    ) -> Result<T, LabelError> {
        let value = op(&mut self.label, &self.schema)?;
        self.auto_save.record_edit();
        self.emit(SessionEvent::LabelsChanged);
        Ok(value)
    }

    /// Apply an operation that only moves cursors or staged values.
    fn navigate<T>(
        &mut self,
        op: impl FnOnce(&mut LabelState, &Schema) -> Result<T, LabelError>,
    ) -> Result<T, LabelError> {
        let value = op(&mut self.label, &self.schema)?;
        self.emit(SessionEvent::LabelsChanged);
        Ok(value)
    }

    pub fn insert_next_point(&mut self, x: f64, y: f64) -> Result<usize, LabelError> {
        self.edit(|label, schema| label.insert_next_point(schema, x, y))
    }

    pub fn pop_last_point(&mut self) -> Result<Keypoint, LabelError> {
        self.edit(|label, _| label.pop_last_point())
    }

    /// Move to the following graph, appending an empty one if needed.
    pub fn start_next_graph(&mut self) -> Result<usize, LabelError> {
        let appends = self.label.current_graph() + 1 == self.label.graphs().len();
        if appends {
            self.edit(|label, schema| label.start_next_graph(schema))
        } else {
            self.navigate(|label, schema| label.start_next_graph(schema))
        }
    }

    pub fn select_graph(&mut self, graph: usize) -> Result<(), LabelError> {
        self.navigate(|label, schema| label.select_graph(schema, graph))
    }

    pub fn set_pending_property(
        &mut self,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), LabelError> {
        self.navigate(|label, _| label.set_pending_property(key, value))
    }

    pub fn select_point(&mut self, graph: usize, keypoint: usize) -> Result<(), LabelError> {
        self.navigate(|label, _| label.select_point(graph, keypoint))
    }

    pub fn deselect_point(&mut self) {
        if self.label.selection().is_some() {
            self.label.deselect_point();
            self.emit(SessionEvent::LabelsChanged);
        }
    }

    pub fn move_point(
        &mut self,
        graph: usize,
        keypoint: usize,
        x: f64,
        y: f64,
    ) -> Result<(), LabelError> {
        self.edit(|label, _| label.move_point(graph, keypoint, x, y))
    }

    pub fn set_point_property(
        &mut self,
        graph: usize,
        keypoint: usize,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), LabelError> {
        self.edit(|label, _| label.set_point_property(graph, keypoint, key, value))
    }

    pub fn delete_graph(&mut self, graph: usize) -> Result<(), LabelError> {
        self.edit(|label, schema| label.delete_graph(schema, graph))
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    /// Switch tool mode. Always closes the point editor.
    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        self.label.deselect_point();
        if self.control.tool_mode != mode {
            log::debug!("Tool mode: {}", mode.name());
            self.control.tool_mode = mode;
            self.emit(SessionEvent::ModeChanged);
        }
        self.emit(SessionEvent::LabelsChanged);
    }

    pub fn set_pan_mode(&mut self, pan: bool) {
        if self.control.pan_mode != pan {
            log::debug!("Pan mode: {}", pan);
            self.control.pan_mode = pan;
            self.emit(SessionEvent::ModeChanged);
        }
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save.set_enabled(enabled);
    }

    // ------------------------------------------------------------------
    // Images and persistence
    // ------------------------------------------------------------------

    /// Switch to `path`, saving the current image first when auto-save
    /// applies, and request the new image and its label result.
    pub fn open_image(&mut self, path: PathBuf) {
        if self.auto_save.should_save_on_switch() {
            self.save();
        }

        log::info!("Opening image {:?}", path);
        if let Some(workspace) = &mut self.workspace {
            workspace.focus(&path);
        }

        self.label.reset(&self.schema);
        self.image = Some(path.clone());
        self.image_size = None;
        self.image_load_error = None;
        self.queue.push(RequestKind::LoadImage { path: path.clone() });
        self.request_label_result(&path);

        self.emit(SessionEvent::ImageChanged);
        self.emit(SessionEvent::LabelsChanged);
    }

    /// Read `image`'s label result into fresh labels.
    fn request_label_result(&mut self, image: &Path) {
        match result_path_for(image) {
            Ok(result_path) => {
                self.awaiting_result = Some(result_path.clone());
                self.queue.push(RequestKind::LoadLabelResult { path: result_path });
            }
            Err(e) => {
                self.awaiting_result = None;
                self.notify(Notice::error(e.to_string()));
            }
        }
        self.auto_save.begin(self.awaiting_result.is_some());
    }

    /// Open the next image of the workspace, wrapping around.
    pub fn next_image(&mut self) {
        self.step_image(WorkspaceState::next);
    }

    /// Open the previous image of the workspace, wrapping around.
    pub fn prev_image(&mut self) {
        self.step_image(WorkspaceState::prev);
    }

    fn step_image(&mut self, step: fn(&mut WorkspaceState)) {
        let Some(workspace) = &mut self.workspace else {
            log::info!("No workspace open");
            return;
        };
        step(workspace);
        if let Some(path) = workspace.current_image().cloned() {
            self.open_image(path);
        }
    }

    /// Ask the shell for a workspace directory.
    pub fn select_workspace(&mut self) -> RequestId {
        self.queue.push(RequestKind::SelectWorkspace)
    }

    /// Snapshot the current image's labels.
    pub fn document(&self) -> Option<LabelDocument> {
        let image = self.image.as_deref()?;
        let errors = DocumentErrors {
            config_error: self.config_error.clone(),
            image_load_error: self.image_load_error.clone(),
        };
        Some(LabelDocument::from_state(
            &self.schema,
            &self.label,
            image,
            &errors,
        ))
    }

    /// Queue a save of the current image's labels.
    ///
    /// Nothing is saved while the image's previous result is still loading
    /// and no edits have been made, so an unread file is never overwritten.
    pub fn save(&mut self) -> Option<RequestId> {
        let Some(image) = self.image.clone() else {
            self.notify(Notice::warning("No image open, nothing to save"));
            return None;
        };
        if !self.auto_save.may_save() {
            log::info!("Labels for {:?} are still loading, save skipped", image);
            return None;
        }

        let path = match result_path_for(&image) {
            Ok(path) => path,
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                return None;
            }
        };
        let document = self.document()?;

        log::info!(
            "Saving {} keypoints for {:?} to {:?}",
            document.total_points(),
            image,
            path
        );
        self.auto_save.record_save();
        Some(self.queue.push(RequestKind::SaveLabelResult { path, document }))
    }

    /// Periodic housekeeping: issues a debounced auto-save when due.
    pub fn tick(&mut self) -> Option<RequestId> {
        if self.image.is_some() && self.auto_save.should_save() {
            log::debug!("Auto-saving");
            self.save()
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Shell exchange
    // ------------------------------------------------------------------

    /// Next request for the shell, if any is ready.
    pub fn next_request(&mut self) -> Option<Request> {
        self.queue.next()
    }

    /// Run every ready request through `shell` until the queue drains.
    ///
    /// Returns the number of requests fulfilled.
    pub fn pump(&mut self, shell: &mut dyn Shell) -> usize {
        let mut count = 0;
        while let Some(request) = self.next_request() {
            log::trace!("Fulfilling {} #{}", request.kind.name(), request.id);
            let response = shell.fulfil(&request);
            self.handle_response(response);
            count += 1;
        }
        count
    }

    /// Apply a shell answer.
    pub fn handle_response(&mut self, response: Response) {
        let Some(request) = self.queue.complete(response.id) else {
            log::warn!("Response for unknown request #{}", response.id);
            return;
        };

        match response.kind {
            ResponseKind::Cancelled => log::info!("{} cancelled", request.name()),
            ResponseKind::ConfigLoaded(result) => self.on_config_loaded(result),
            ResponseKind::WorkspaceSelected(result) => self.on_workspace_selected(result),
            ResponseKind::LabelResultSaved { path, result } => {
                self.on_label_result_saved(path, result)
            }
            ResponseKind::LabelResultLoaded { path, result } => {
                self.on_label_result_loaded(path, result)
            }
            ResponseKind::ImageLoaded { path, result } => self.on_image_loaded(path, result),
        }
    }

    fn on_config_loaded(&mut self, result: Result<ConfigFile, String>) {
        match result {
            Ok(file) => {
                // Errors are recorded in config_error and raised as a notice
                let _ = self.load_schema_value(file.value, Some(file.path));
            }
            Err(e) => {
                self.config_error = Some(e.clone());
                self.notify(Notice::error(format!("Could not read labeling config: {}", e)));
            }
        }
    }

    fn on_workspace_selected(&mut self, result: Result<WorkspaceListing, String>) {
        let listing = match result {
            Ok(listing) => listing,
            Err(e) => {
                self.notify(Notice::error(format!("Could not open workspace: {}", e)));
                return;
            }
        };

        log::info!(
            "Workspace {:?} with {} images",
            listing.folder,
            listing.images.len()
        );
        let workspace = WorkspaceState::new(listing.folder, listing.images);
        let first = workspace.current_image().cloned();
        let folder = workspace.folder.clone();
        self.workspace = Some(workspace);
        self.emit(SessionEvent::WorkspaceChanged);

        match first {
            Some(path) => self.open_image(path),
            None => self.notify(Notice::warning(format!("No images found in {:?}", folder))),
        }
    }

    fn on_label_result_saved(&mut self, path: PathBuf, result: Result<(), String>) {
        match result {
            Ok(()) => log::info!("Saved label result {:?}", path),
            Err(e) => {
                let current = self
                    .image
                    .as_deref()
                    .and_then(|image| result_path_for(image).ok());
                if current.as_ref() == Some(&path) {
                    self.auto_save.record_failed_save();
                }
                self.notify(Notice::error(format!("Failed to save {:?}: {}", path, e)));
            }
        }
    }

    fn on_label_result_loaded(
        &mut self,
        path: PathBuf,
        result: Result<Option<serde_json::Value>, String>,
    ) {
        if self.awaiting_result.as_ref() != Some(&path) {
            log::debug!("Discarding stale label result {:?}", path);
            return;
        }
        self.awaiting_result = None;

        if self.auto_save.finish_loading() {
            self.notify(Notice::warning(format!(
                "Labels were edited before {:?} finished loading; keeping the edits",
                path
            )));
            return;
        }

        match result {
            Ok(None) => {
                log::info!("No label result at {:?}, starting fresh", path);
                self.label.reset(&self.schema);
            }
            Ok(Some(value)) => match self.restore(value) {
                Ok(label) => {
                    log::info!(
                        "Restored {} keypoint graphs from {:?}",
                        label.graphs().len(),
                        path
                    );
                    self.label = label;
                }
                Err(e) if e.is_version_mismatch() => {
                    self.label.reset(&self.schema);
                    self.notify(Notice::warning(format!(
                        "Discarded labels in {:?}: {}",
                        path, e
                    )));
                }
                Err(e) => {
                    self.label.reset(&self.schema);
                    self.notify(Notice::error(format!(
                        "Could not restore labels from {:?}: {}",
                        path, e
                    )));
                }
            },
            Err(e) => {
                self.label.reset(&self.schema);
                self.notify(Notice::error(format!("Failed to load {:?}: {}", path, e)));
            }
        }
        self.emit(SessionEvent::LabelsChanged);
    }

    fn restore(&self, value: serde_json::Value) -> Result<LabelState, FormatError> {
        LabelDocument::from_value(value)?.restore(&self.schema)
    }

    fn on_image_loaded(&mut self, path: PathBuf, result: Result<(u32, u32), String>) {
        if self.image.as_ref() != Some(&path) {
            log::debug!("Discarding stale image load {:?}", path);
            return;
        }

        match result {
            Ok((width, height)) => {
                log::info!("Loaded image {:?} ({}x{})", path, width, height);
                self.image_size = Some((width, height));
                self.image_load_error = None;
            }
            Err(e) => {
                self.image_load_error = Some(e.clone());
                self.notify(Notice::warning(format!(
                    "Failed to load image {:?}: {}",
                    path, e
                )));
            }
        }
        self.emit(SessionEvent::ImageChanged);
    }
}
