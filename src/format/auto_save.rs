//! Save bookkeeping for the label result of the open image.
//!
//! The manager follows one image at a time, from the moment it is opened:
//!
//! - while the image's previous result is still being read, a save is only
//!   allowed once the user has edited something, so an unread file is never
//!   overwritten with empty labels;
//! - a result that arrives after the user started editing is ignored, even if
//!   those edits were saved in the meantime;
//! - unsaved edits are written before switching away, and after a quiet
//!   period while the user keeps working on the same image.

use std::time::Duration;
use web_time::Instant;

/// Tracks edits and saves of the current image's labels.
#[derive(Debug)]
pub struct AutoSaveManager {
    enabled: bool,
    debounce_delay: Duration,
    save_interval: Duration,

    /// The image's previous result has not arrived yet
    loading: bool,
    /// Edited since the image was opened, saved or not
    edited: bool,
    /// Edited since the last save request
    dirty: bool,

    last_edit: Option<Instant>,
    last_save: Option<Instant>,
}

impl AutoSaveManager {
    /// Default minimum interval between idle saves.
    pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(30);

    /// Default quiet time after an edit.
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(3);

    pub fn new(enabled: bool, debounce_delay: Duration, save_interval: Duration) -> Self {
        Self {
            enabled,
            debounce_delay,
            save_interval,
            loading: false,
            edited: false,
            dirty: false,
            last_edit: None,
            last_save: None,
        }
    }

    /// Start following a freshly opened image.
    ///
    /// `loading` is set when its previous result has been requested.
    pub fn begin(&mut self, loading: bool) {
        self.loading = loading;
        self.edited = false;
        self.dirty = false;
        self.last_edit = None;
        self.last_save = None;
        log::trace!("Save tracking restarted (loading = {})", loading);
    }

    /// The previous result arrived.
    ///
    /// Returns whether the user edited in the meantime, in which case the
    /// result must not replace the labels.
    pub fn finish_loading(&mut self) -> bool {
        self.loading = false;
        self.edited
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Record a change to the saved document.
    pub fn record_edit(&mut self) {
        self.edited = true;
        self.dirty = true;
        self.last_edit = Some(Instant::now());
    }

    /// Whether there are edits not yet sent to a save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether writing the current labels is allowed at all.
    pub fn may_save(&self) -> bool {
        !self.loading || self.edited
    }

    /// Whether switching away from the image should save it first.
    pub fn should_save_on_switch(&self) -> bool {
        self.enabled && self.dirty
    }

    /// Whether an idle save is due.
    pub fn should_save(&self) -> bool {
        if !self.should_save_on_switch() {
            return false;
        }
        let quiet = self
            .last_edit
            .is_some_and(|edit| edit.elapsed() >= self.debounce_delay);
        let spaced = self
            .last_save
            .is_none_or(|save| save.elapsed() >= self.save_interval);
        quiet && spaced
    }

    /// A save request for the current labels was issued.
    pub fn record_save(&mut self) {
        self.dirty = false;
        self.last_save = Some(Instant::now());
    }

    /// The last save failed; the labels count as unsaved again.
    pub fn record_failed_save(&mut self) {
        self.dirty = true;
        self.last_edit.get_or_insert_with(Instant::now);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save enabled: {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for AutoSaveManager {
    fn default() -> Self {
        Self::new(true, Self::DEFAULT_DEBOUNCE_DELAY, Self::DEFAULT_SAVE_INTERVAL)
    }
}
