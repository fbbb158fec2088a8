//! Application state management modules.

mod control;
mod label;
mod notice;
mod session;
mod workspace;

#[cfg(test)]
mod tests;

pub use control::{ClickAction, ControlState, PointerButton, ToolMode};
pub use label::{LabelError, LabelState, PendingEntry};
pub use notice::{Notice, NoticeLevel};
pub use session::{Session, SessionEvent};
pub use workspace::{IMAGE_EXTENSIONS, WorkspaceState, is_image_file, scan_images};
