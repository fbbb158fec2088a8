//! Synchronous desktop shell: native dialogs and the local filesystem.

use std::path::{Path, PathBuf};

use crate::format::{FormatError, LabelDocument};
use crate::shell::{
    ConfigFile, Request, RequestKind, Response, ResponseKind, Shell, WorkspaceListing,
};
use crate::state::scan_images;

/// Fulfils requests on the calling thread.
///
/// Preset paths answer the next dialog of their kind without showing it,
/// which is how the binary handles command-line arguments and how tests run
/// headless.
#[derive(Debug, Default)]
pub struct NativeShell {
    dialogs: bool,
    config_path: Option<PathBuf>,
    workspace_path: Option<PathBuf>,
}

impl NativeShell {
    /// Shell that shows native dialogs.
    pub fn new() -> Self {
        Self {
            dialogs: true,
            ..Self::default()
        }
    }

    /// Shell that never opens a dialog; unanswered pickers are cancelled.
    pub fn headless() -> Self {
        Self::default()
    }

    /// Answer the next config picker with `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Answer the next workspace picker with `path`.
    pub fn with_workspace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_path = Some(path.into());
        self
    }

    /// Preset the answer to the next workspace picker.
    pub fn preset_workspace_path(&mut self, path: PathBuf) {
        self.workspace_path = Some(path);
    }

    fn pick_config(&mut self) -> Option<PathBuf> {
        self.config_path.take().or_else(|| {
            self.dialogs
                .then(|| {
                    rfd::FileDialog::new()
                        .set_title("Open labeling config")
                        .add_filter("Labeling config", &["json"])
                        .pick_file()
                })
                .flatten()
        })
    }

    fn pick_workspace(&mut self) -> Option<PathBuf> {
        self.workspace_path.take().or_else(|| {
            self.dialogs
                .then(|| {
                    rfd::FileDialog::new()
                        .set_title("Select workspace")
                        .pick_folder()
                })
                .flatten()
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;
    log::info!("Read labeling config {:?}", path);
    Ok(ConfigFile {
        path: path.to_path_buf(),
        value,
    })
}

fn save_label_result(path: &Path, document: &LabelDocument) -> Result<(), FormatError> {
    std::fs::write(path, document.to_json()?)?;
    log::info!("Wrote label result {:?}", path);
    Ok(())
}

fn load_label_result(path: &Path) -> Result<Option<serde_json::Value>, FormatError> {
    if !path.exists() {
        log::debug!("No label result at {:?}", path);
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn read_image_size(path: &Path) -> Result<(u32, u32), String> {
    image::image_dimensions(path).map_err(|e| format!("Failed to open image: {}", e))
}

impl Shell for NativeShell {
    fn fulfil(&mut self, request: &Request) -> Response {
        let kind = match &request.kind {
            RequestKind::OpenConfigFile => match self.pick_config() {
                Some(path) => ResponseKind::ConfigLoaded(read_config_file(&path)),
                None => ResponseKind::Cancelled,
            },
            RequestKind::SelectWorkspace => match self.pick_workspace() {
                Some(folder) => ResponseKind::WorkspaceSelected(
                    scan_images(&folder).map(|images| WorkspaceListing { folder, images }),
                ),
                None => ResponseKind::Cancelled,
            },
            RequestKind::SaveLabelResult { path, document } => ResponseKind::LabelResultSaved {
                path: path.clone(),
                result: save_label_result(path, document).map_err(|e| e.to_string()),
            },
            RequestKind::LoadLabelResult { path } => ResponseKind::LabelResultLoaded {
                path: path.clone(),
                result: load_label_result(path).map_err(|e| e.to_string()),
            },
            RequestKind::LoadImage { path } => ResponseKind::ImageLoaded {
                path: path.clone(),
                result: read_image_size(path),
            },
        };

        Response {
            id: request.id,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: RequestKind) -> Request {
        Request { id: 7, kind }
    }

    #[test]
    fn test_missing_result_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_LABEL.json");

        let response = NativeShell::headless().fulfil(&request(RequestKind::LoadLabelResult {
            path: path.clone(),
        }));
        assert_eq!(response.id, 7);
        assert_eq!(
            response.kind,
            ResponseKind::LabelResultLoaded {
                path,
                result: Ok(None)
            }
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_LABEL.json");
        let document = LabelDocument::from_value(json!({
            "configVersion": "v1",
            "imagePath": "a.jpg",
            "keypointGraphList": [[{ "name": "A", "x": 1.5, "y": 2.0, "properties": {} }]],
        }))
        .unwrap();

        let mut shell = NativeShell::headless();
        let saved = shell.fulfil(&request(RequestKind::SaveLabelResult {
            path: path.clone(),
            document: document.clone(),
        }));
        assert!(matches!(
            saved.kind,
            ResponseKind::LabelResultSaved { result: Ok(()), .. }
        ));

        let loaded = shell.fulfil(&request(RequestKind::LoadLabelResult { path }));
        match loaded.kind {
            ResponseKind::LabelResultLoaded {
                result: Ok(Some(value)),
                ..
            } => assert_eq!(LabelDocument::from_value(value).unwrap(), document),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_LABEL.json");
        std::fs::write(&path, "{ not json").unwrap();

        let response =
            NativeShell::headless().fulfil(&request(RequestKind::LoadLabelResult { path }));
        assert!(matches!(
            response.kind,
            ResponseKind::LabelResultLoaded { result: Err(_), .. }
        ));
    }

    #[test]
    fn test_headless_pickers_cancel() {
        let mut shell = NativeShell::headless();
        assert_eq!(
            shell.fulfil(&request(RequestKind::OpenConfigFile)).kind,
            ResponseKind::Cancelled
        );
        assert_eq!(
            shell.fulfil(&request(RequestKind::SelectWorkspace)).kind,
            ResponseKind::Cancelled
        );
    }

    #[test]
    fn test_preset_paths_are_used_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{ "configVersion": "v1", "keypointGraph": [] }"#).unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();

        let mut shell = NativeShell::headless()
            .with_config_path(&config)
            .with_workspace_path(dir.path());

        match shell.fulfil(&request(RequestKind::OpenConfigFile)).kind {
            ResponseKind::ConfigLoaded(Ok(file)) => {
                assert_eq!(file.path, config);
                assert_eq!(file.value["configVersion"], "v1");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        match shell.fulfil(&request(RequestKind::SelectWorkspace)).kind {
            ResponseKind::WorkspaceSelected(Ok(listing)) => {
                assert_eq!(listing.folder, dir.path());
                assert_eq!(
                    listing.images,
                    vec![dir.path().join("a.jpg"), dir.path().join("b.png")]
                );
            }
            other => panic!("unexpected response: {:?}", other),
        }

        assert_eq!(
            shell.fulfil(&request(RequestKind::OpenConfigFile)).kind,
            ResponseKind::Cancelled
        );
    }

    #[test]
    fn test_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        image::RgbImage::new(4, 3).save(&good).unwrap();
        let bad = dir.path().join("bad.jpg");
        std::fs::write(&bad, b"not an image").unwrap();

        let mut shell = NativeShell::headless();
        assert_eq!(
            shell.fulfil(&request(RequestKind::LoadImage { path: good.clone() })).kind,
            ResponseKind::ImageLoaded {
                path: good,
                result: Ok((4, 3))
            }
        );
        assert!(matches!(
            shell.fulfil(&request(RequestKind::LoadImage { path: bad })).kind,
            ResponseKind::ImageLoaded { result: Err(_), .. }
        ));
    }
}
