//! Model store layout checks
//!
//! Avatar models are distributed as zip packages and unpacked under a store
//! root before use. A model is usable once both its directory and its unpack
//! marker exist, and the same holds for the shared base resources every
//! model depends on:
//!
//! ```text
//! <root>/model/<name>        unpacked model directory
//! <root>/model/tmp/<name>    marker: <name> finished unpacking
//! ```
//!
//! Checks run on the caller thread before an init command is submitted; the
//! render loop itself never probes the filesystem.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Directory name of the shared base resources (lip-sync weights, shaders)
pub const BASE_RES: &str = "base_res";

const MODEL_DIR: &str = "model";
const MARKER_DIR: &str = "tmp";

/// Errors from model resolution, in check order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model identifier is empty")]
    EmptyName,

    #[error("base resources missing: {0}")]
    BaseMissing(String),

    #[error("base resource marker missing: {0}")]
    BaseMarkerMissing(String),

    #[error("model directory missing: {0}")]
    ModelMissing(String),

    #[error("model marker missing: {0}")]
    ModelMarkerMissing(String),
}

/// Filesystem layout checks for unpacked avatar models
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under `~/.visage`, the default unpack location
    pub fn default_root() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".visage")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract the model name from a bare name or a download URL.
    ///
    /// URLs resolve to their trailing path segment with a `.zip` suffix
    /// stripped, matching the directory name the package unpacks to. A
    /// bare name is taken verbatim, extension and all.
    pub fn model_name(source: &str) -> Result<String, ModelError> {
        let name = if source.starts_with("https://") || source.starts_with("http://") {
            let tail = source.rsplit('/').next().unwrap_or(source);
            tail.strip_suffix(".zip").unwrap_or(tail)
        } else {
            source
        };
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        Ok(name.to_string())
    }

    /// Directory a named model unpacks to
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(MODEL_DIR).join(name)
    }

    /// Marker file recording that a named package finished unpacking
    pub fn marker(&self, name: &str) -> PathBuf {
        self.root.join(MODEL_DIR).join(MARKER_DIR).join(name)
    }

    /// Resolve a model source to its validated directory.
    ///
    /// `source` may be a bare model name or a download URL. Checks run in a
    /// fixed order (base dir, base marker, model dir, model marker) so a
    /// broken install reports its first missing piece.
    pub fn resolve(&self, source: &str) -> Result<PathBuf, ModelError> {
        let name = Self::model_name(source)?;

        let base = self.model_dir(BASE_RES);
        if !base.is_dir() {
            return Err(ModelError::BaseMissing(base.display().to_string()));
        }
        let base_marker = self.marker(BASE_RES);
        if !base_marker.exists() {
            return Err(ModelError::BaseMarkerMissing(
                base_marker.display().to_string(),
            ));
        }

        let dir = self.model_dir(&name);
        if !dir.is_dir() {
            return Err(ModelError::ModelMissing(dir.display().to_string()));
        }
        let marker = self.marker(&name);
        if !marker.exists() {
            return Err(ModelError::ModelMarkerMissing(marker.display().to_string()));
        }

        log::debug!("resolved model '{}' at {}", name, dir.display());
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn install(store: &ModelStore, name: &str) {
        fs::create_dir_all(store.model_dir(name)).unwrap();
        fs::create_dir_all(store.marker(name).parent().unwrap()).unwrap();
        fs::write(store.marker(name), b"ok").unwrap();
    }

    #[test]
    fn test_model_name_bare_name_is_verbatim() {
        assert_eq!(ModelStore::model_name("anna").unwrap(), "anna");
        // A bare name is not rewritten, even when it looks like a package
        assert_eq!(ModelStore::model_name("anna.zip").unwrap(), "anna.zip");
    }

    #[test]
    fn test_model_name_from_url_strips_zip() {
        let url = "https://cdn.example.com/packages/anna_hd.zip";
        assert_eq!(ModelStore::model_name(url).unwrap(), "anna_hd");
        assert_eq!(
            ModelStore::model_name("http://cdn.example.com/anna.zip").unwrap(),
            "anna"
        );
    }

    #[test]
    fn test_model_name_url_keeps_non_zip_extension() {
        let url = "https://cdn.example.com/packages/anna.tar";
        assert_eq!(ModelStore::model_name(url).unwrap(), "anna.tar");
    }

    #[test]
    fn test_model_name_empty_inputs_rejected() {
        assert_eq!(ModelStore::model_name("").unwrap_err(), ModelError::EmptyName);
        assert_eq!(
            ModelStore::model_name("https://cdn.example.com/anna.zip/").unwrap_err(),
            ModelError::EmptyName
        );
        assert_eq!(
            ModelStore::model_name("https://cdn.example.com/.zip").unwrap_err(),
            ModelError::EmptyName
        );
    }

    #[test]
    fn test_resolve_happy_path() {
        let root = tempfile::tempdir().unwrap();
        let store = ModelStore::new(root.path());
        install(&store, BASE_RES);
        install(&store, "anna");

        let dir = store.resolve("anna").unwrap();
        assert_eq!(dir, store.model_dir("anna"));
    }

    #[test]
    fn test_resolve_url_source() {
        let root = tempfile::tempdir().unwrap();
        let store = ModelStore::new(root.path());
        install(&store, BASE_RES);
        install(&store, "anna");

        let dir = store.resolve("https://cdn.example.com/anna.zip").unwrap();
        assert_eq!(dir, store.model_dir("anna"));
    }

    #[test]
    fn test_resolve_reports_first_missing_piece() {
        let root = tempfile::tempdir().unwrap();
        let store = ModelStore::new(root.path());

        // Nothing installed: base directory is the first failure
        assert!(matches!(
            store.resolve("anna").unwrap_err(),
            ModelError::BaseMissing(_)
        ));

        // Base dir without marker
        fs::create_dir_all(store.model_dir(BASE_RES)).unwrap();
        assert!(matches!(
            store.resolve("anna").unwrap_err(),
            ModelError::BaseMarkerMissing(_)
        ));

        // Base complete, model dir absent
        install(&store, BASE_RES);
        assert!(matches!(
            store.resolve("anna").unwrap_err(),
            ModelError::ModelMissing(_)
        ));

        // Model dir without marker
        fs::create_dir_all(store.model_dir("anna")).unwrap();
        assert!(matches!(
            store.resolve("anna").unwrap_err(),
            ModelError::ModelMarkerMissing(_)
        ));
    }
}
