//! Workspace state: a directory of images labeled one after another.

use std::path::{Path, PathBuf};

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Check if a path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List image files directly inside `folder`, sorted by path.
pub fn scan_images(folder: &Path) -> Result<Vec<PathBuf>, String> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(folder)
        .map_err(|e| format!("Failed to read folder {:?}: {}", folder, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();

    images.sort();
    log::info!("Scanned workspace {:?}: found {} images", folder, images.len());
    Ok(images)
}

/// State for an opened workspace directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceState {
    /// Path to the workspace folder
    pub folder: PathBuf,
    /// Image files directly inside the folder
    pub images: Vec<PathBuf>,
    /// Current image index
    pub current_index: usize,
}

impl WorkspaceState {
    /// Create a workspace from a folder and its image list.
    pub fn new(folder: PathBuf, images: Vec<PathBuf>) -> Self {
        Self {
            folder,
            images,
            current_index: 0,
        }
    }

    /// Get the current image path.
    pub fn current_image(&self) -> Option<&PathBuf> {
        self.images.get(self.current_index)
    }

    /// Get the current image filename for display.
    pub fn current_name(&self) -> String {
        self.current_image()
            .and_then(|path| path.file_name())
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Point the cursor at `path` if it belongs to this workspace.
    pub fn focus(&mut self, path: &Path) -> bool {
        match self.images.iter().position(|p| p == path) {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    /// Move to the next image, wrapping around.
    pub fn next(&mut self) {
        if !self.images.is_empty() {
            self.current_index = (self.current_index + 1) % self.images.len();
        }
    }

    /// Move to the previous image, wrapping around.
    pub fn prev(&mut self) {
        if !self.images.is_empty() {
            self.current_index = if self.current_index == 0 {
                self.images.len() - 1
            } else {
                self.current_index - 1
            };
        }
    }

    /// Get progress string like "3/15".
    pub fn progress(&self) -> String {
        format!("{}/{}", self.current_index + 1, self.images.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert!(is_image_file(Path::new("a/b.jpg")));
        assert!(is_image_file(Path::new("a/b.JPEG")));
        assert!(is_image_file(Path::new("b.Png")));
        assert!(is_image_file(Path::new("b.BMP")));
        assert!(!is_image_file(Path::new("b.tiff")));
        assert!(!is_image_file(Path::new("b_LABEL.json")));
        assert!(!is_image_file(Path::new("jpg")));
    }

    #[test]
    fn test_scan_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.bmp", "a_LABEL.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.jpg"), b"x").unwrap();

        let images = scan_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.bmp"]);
    }

    #[test]
    fn test_scan_missing_folder() {
        assert!(scan_images(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut ws = WorkspaceState::new(
            PathBuf::from("ws"),
            vec![PathBuf::from("ws/a.jpg"), PathBuf::from("ws/b.jpg")],
        );
        assert_eq!(ws.progress(), "1/2");
        ws.prev();
        assert_eq!(ws.current_name(), "b.jpg");
        ws.next();
        assert_eq!(ws.current_name(), "a.jpg");
        assert!(ws.focus(Path::new("ws/b.jpg")));
        assert_eq!(ws.progress(), "2/2");
        assert!(!ws.focus(Path::new("elsewhere.jpg")));
    }
}
