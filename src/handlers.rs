//! Message handlers for the labeling session.
//!
//! Each handler processes a specific category of messages, keeping
//! [`Session::update`] a flat dispatch.

use crate::keybindings::{Key, KeyAction};
use crate::message::Message;
use crate::model::PropertyValue;
use crate::state::{ClickAction, LabelError, PointerButton, Session, ToolMode};

/// Radius in image pixels within which a click hits a keypoint.
pub const KEYPOINT_HIT_RADIUS: f64 = 10.0;

impl Session {
    /// Apply a message.
    pub fn update(&mut self, message: Message) {
        match message {
            Message::ViewportClicked { button, x, y } => self.handle_viewport_click(button, x, y),
            Message::KeypointPressed { graph, keypoint } => {
                self.handle_keypoint_pressed(graph, keypoint)
            }
            Message::KeypointDragged {
                graph,
                keypoint,
                x,
                y,
            } => self.handle_keypoint_dragged(graph, keypoint, x, y),
            Message::KeyPressed { key, repeat } => self.handle_key_pressed(key, repeat),
            Message::KeyReleased { key, .. } => self.handle_key_released(key),

            Message::ToolModeSelected(mode) => self.set_tool_mode(mode),
            Message::StartNextGraph => report(self.start_next_graph()),
            Message::PopPoint => self.handle_pop(),
            Message::SelectGraph(graph) => report(self.select_graph(graph)),
            Message::DeleteGraph(graph) => report(self.delete_graph(graph)),
            Message::SetPointPosition {
                graph,
                keypoint,
                x,
                y,
            } => report(self.move_point(graph, keypoint, x, y)),
            Message::SetPointProperty {
                graph,
                keypoint,
                key,
                value,
            } => self.handle_point_property(graph, keypoint, &key, value),
            Message::SetPendingProperty { key, value } => {
                report(self.set_pending_property(&key, value))
            }
            Message::DeselectPoint => self.deselect_point(),

            Message::OpenConfig => {
                self.open_config();
            }
            Message::SelectWorkspace => {
                self.select_workspace();
            }
            Message::OpenImage(path) => self.open_image(path),
            Message::NextImage => self.next_image(),
            Message::PrevImage => self.prev_image(),
            Message::Save => {
                self.save();
            }
            Message::SetAutoSave(enabled) => self.set_auto_save(enabled),
        }
    }

    fn handle_viewport_click(&mut self, button: PointerButton, x: f64, y: f64) {
        match self.control().route_click(button) {
            ClickAction::Insert => report(self.insert_next_point(x, y)),
            ClickAction::Pop => report(self.pop_last_point()),
            ClickAction::Select => {
                match self.label().hit_test(x, y, KEYPOINT_HIT_RADIUS) {
                    Some((graph, keypoint)) => report(self.select_point(graph, keypoint)),
                    None => log::trace!("Click at ({:.1}, {:.1}) hit no keypoint", x, y),
                }
            }
            ClickAction::Ignore => {}
        }
    }

    fn handle_pop(&mut self) {
        if self.control().pop_allowed() {
            report(self.pop_last_point());
        } else {
            log::debug!("Pop ignored in {} mode", self.control().tool_mode.name());
        }
    }

    fn handle_keypoint_pressed(&mut self, graph: usize, keypoint: usize) {
        if self.control().keypoints_interactive() {
            report(self.select_point(graph, keypoint));
        }
    }

    fn handle_keypoint_dragged(&mut self, graph: usize, keypoint: usize, x: f64, y: f64) {
        if self.control().keypoints_interactive() {
            report(self.move_point(graph, keypoint, x, y));
        }
    }

    fn handle_point_property(
        &mut self,
        graph: usize,
        keypoint: usize,
        key: &str,
        value: PropertyValue,
    ) {
        report(self.set_point_property(graph, keypoint, key, value));
    }

    fn handle_key_pressed(&mut self, key: Key, repeat: bool) {
        if self.keybindings().is_pan(key) {
            if !repeat {
                self.set_pan_mode(true);
            }
            return;
        }
        if repeat {
            return;
        }

        let Some(action) = self.keybindings().action_for_key(key) else {
            return;
        };
        log::debug!("Key {} -> {:?}", key.label(), action);
        match action {
            KeyAction::InsertMode => self.set_tool_mode(ToolMode::Insert),
            KeyAction::EditMode => self.set_tool_mode(ToolMode::Edit),
            KeyAction::NextGraph => report(self.start_next_graph()),
            KeyAction::PopPoint => self.handle_pop(),
            KeyAction::Deselect => self.deselect_point(),
            KeyAction::Save => {
                self.save();
            }
            KeyAction::NextImage => self.next_image(),
            KeyAction::PrevImage => self.prev_image(),
        }
    }

    fn handle_key_released(&mut self, key: Key) {
        if self.keybindings().is_pan(key) {
            self.set_pan_mode(false);
        }
    }
}

/// Log a failed label operation. Boundary no-ops were already logged.
fn report<T>(result: Result<T, LabelError>) {
    if let Err(e) = result {
        if !e.is_boundary() {
            log::warn!("Label operation rejected: {}", e);
        }
    }
}
