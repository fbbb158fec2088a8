//! Interaction mode state and pointer routing.

/// Interaction mode of the labeling tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Clicks append the next schema keypoint
    #[default]
    Insert,
    /// Clicks select existing keypoints
    Edit,
}

impl ToolMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::Insert => "Insert Mode",
            ToolMode::Edit => "Edit Mode",
        }
    }

    /// Get all modes.
    pub fn all() -> &'static [ToolMode] {
        &[ToolMode::Insert, ToolMode::Edit]
    }
}

/// Mouse button of a viewport click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button
    Primary,
    /// Right button
    Secondary,
    /// Wheel button
    Middle,
}

/// What a viewport click should do in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Place the next keypoint
    Insert,
    /// Remove the last keypoint
    Pop,
    /// Select the keypoint under the cursor
    Select,
    /// Nothing, e.g. while panning
    Ignore,
}

/// Tool mode and pan flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    /// True while the pan key is held
    pub pan_mode: bool,
    /// Current interaction mode
    pub tool_mode: ToolMode,
}

impl ControlState {
    /// Route a viewport click.
    pub fn route_click(&self, button: PointerButton) -> ClickAction {
        if self.pan_mode {
            return ClickAction::Ignore;
        }
        match (self.tool_mode, button) {
            (ToolMode::Insert, PointerButton::Primary) => ClickAction::Insert,
            (ToolMode::Insert, PointerButton::Secondary) => ClickAction::Pop,
            (ToolMode::Edit, PointerButton::Primary) => ClickAction::Select,
            _ => ClickAction::Ignore,
        }
    }

    /// Whether the pop shortcut and panel button apply, same as a right click.
    pub fn pop_allowed(&self) -> bool {
        self.route_click(PointerButton::Secondary) == ClickAction::Pop
    }

    /// Whether keypoints react to direct presses and drags.
    pub fn keypoints_interactive(&self) -> bool {
        self.tool_mode == ToolMode::Edit && !self.pan_mode
    }

    /// Usage hint shown under the viewport.
    pub fn control_tips(&self, pan_key: &str) -> String {
        let mode_tips = match self.tool_mode {
            ToolMode::Insert => {
                "[left click] to insert new keypoint; [right click] to pop out keypoint;"
            }
            ToolMode::Edit => "[left click] to select and drag keypoint;",
        };
        format!("press [{}] to pan; {}", pan_key, mode_tips)
    }
}
