//! Customizable keybindings.
//!
//! The pan key is held rather than pressed, so it is reported separately from
//! the one-shot actions.

use serde::{Deserialize, Serialize};

/// A keyboard key as delivered by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable character
    Char(char),
    Space,
    Backspace,
    Delete,
    Escape,
    Enter,
    Left,
    Right,
    Up,
    Down,
}

impl Key {
    /// Letters compare case-insensitively.
    pub fn normalized(self) -> Self {
        match self {
            Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }

    /// Short label for help text.
    pub fn label(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Space => "space".to_string(),
            Key::Backspace => "backspace".to_string(),
            Key::Delete => "delete".to_string(),
            Key::Escape => "esc".to_string(),
            Key::Enter => "enter".to_string(),
            Key::Left => "left".to_string(),
            Key::Right => "right".to_string(),
            Key::Up => "up".to_string(),
            Key::Down => "down".to_string(),
        }
    }

    /// Parse a label as produced by [`Key::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        let key = match label.to_ascii_lowercase().as_str() {
            "space" => Key::Space,
            "backspace" => Key::Backspace,
            "delete" => Key::Delete,
            "esc" | "escape" => Key::Escape,
            "enter" => Key::Enter,
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            _ => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

/// One-shot actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Switch to insert mode
    InsertMode,
    /// Switch to edit mode
    EditMode,
    /// Start the next keypoint graph
    NextGraph,
    /// Pop the last keypoint
    PopPoint,
    /// Close the point editor
    Deselect,
    /// Save the label result
    Save,
    /// Go to the next workspace image
    NextImage,
    /// Go to the previous workspace image
    PrevImage,
}

/// Keybinding configuration for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Held to pan the viewport
    pub pan: Key,
    /// Insert mode
    pub insert_mode: Key,
    /// Edit mode
    pub edit_mode: Key,
    /// Start next graph
    pub next_graph: Key,
    /// Pop last point
    pub pop_point: Key,
    /// Close point editor
    pub deselect: Key,
    /// Save label result
    pub save: Key,
    /// Next image
    pub next_image: Key,
    /// Previous image
    pub prev_image: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pan: Key::Space,
            insert_mode: Key::Char('i'),
            edit_mode: Key::Char('e'),
            next_graph: Key::Char('n'),
            pop_point: Key::Backspace,
            deselect: Key::Escape,
            save: Key::Char('s'),
            next_image: Key::Right,
            prev_image: Key::Left,
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is the pan key.
    pub fn is_pan(&self, key: Key) -> bool {
        key.normalized() == self.pan.normalized()
    }

    /// Get the action that corresponds to a key press, if any.
    pub fn action_for_key(&self, key: Key) -> Option<KeyAction> {
        let key = key.normalized();
        self.bindings()
            .into_iter()
            .find(|(bound, _)| bound.normalized() == key)
            .map(|(_, action)| action)
    }

    /// Get the key bound to an action.
    pub fn key_for_action(&self, action: KeyAction) -> Key {
        self.bindings()
            .into_iter()
            .find(|(_, bound)| *bound == action)
            .map(|(key, _)| key)
            .unwrap_or(self.pan)
    }

    /// Find actions that share a key with another action.
    pub fn find_conflicts(&self) -> Vec<(KeyAction, KeyAction)> {
        let bindings = self.bindings();
        let mut conflicts = Vec::new();
        for (i, (key_a, action_a)) in bindings.iter().enumerate() {
            for (key_b, action_b) in &bindings[i + 1..] {
                if key_a.normalized() == key_b.normalized() {
                    conflicts.push((*action_a, *action_b));
                }
            }
        }
        conflicts
    }

    fn bindings(&self) -> [(Key, KeyAction); 8] {
        [
            (self.insert_mode, KeyAction::InsertMode),
            (self.edit_mode, KeyAction::EditMode),
            (self.next_graph, KeyAction::NextGraph),
            (self.pop_point, KeyAction::PopPoint),
            (self.deselect, KeyAction::Deselect),
            (self.save, KeyAction::Save),
            (self.next_image, KeyAction::NextImage),
            (self.prev_image, KeyAction::PrevImage),
        ]
    }
}
