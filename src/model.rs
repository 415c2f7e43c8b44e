//! Local storage for the neural network files.
//!
//! Model files are downloaded on first use and reused on every later run.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Base URL the model files are downloaded from by default.
pub const DEFAULT_MODEL_URL: &str = "https://raw.githubusercontent.com/SludgePhD/Zaru/main/3rdparty/onnx";

/// Directory the model files are stored in by default.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// A model file and the URL it can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    file_name: String,
    url: String,
}

impl ModelAsset {
    pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: url.into(),
        }
    }

    /// The palm detection network, downloaded from `base_url`.
    pub fn palm_detection(base_url: &str) -> Self {
        Self::from_base_url(base_url, "palm_detection_full.onnx")
    }

    /// The hand landmark network, downloaded from `base_url`.
    pub fn hand_landmark(base_url: &str) -> Self {
        Self::from_base_url(base_url, "hand_landmark_full.onnx")
    }

    fn from_base_url(base_url: &str, file_name: &str) -> Self {
        Self::new(
            file_name,
            format!("{}/{}", base_url.trim_end_matches('/'), file_name),
        )
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A directory of model files.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_DIR)
    }
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path `asset` is stored at, whether or not it exists.
    pub fn path_of(&self, asset: &ModelAsset) -> PathBuf {
        self.dir.join(&asset.file_name)
    }

    /// Returns the local path of `asset`, downloading it first if it is missing.
    ///
    /// Downloads are written to a temporary file and moved into place once complete, so an
    /// interrupted download is never mistaken for a usable model.
    pub fn ensure(&self, asset: &ModelAsset) -> anyhow::Result<PathBuf> {
        let path = self.path_of(asset);
        if path.exists() {
            log::debug!("using cached model {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create model directory {}", self.dir.display()))?;

        log::info!("downloading {} from {}", asset.file_name, asset.url);
        let bytes = reqwest::blocking::get(&asset.url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .with_context(|| format!("failed to download {}", asset.url))?;

        let tmp = self.dir.join(format!("{}.part", asset.file_name));
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        drop(file);
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move model into place at {}", path.display()))?;

        log::info!(
            "model downloaded to {} ({} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> ModelStore {
        let dir = std::env::temp_dir().join(format!(
            "fingerstate-{}-{}-{}",
            name,
            std::process::id(),
            fastrand::u32(..)
        ));
        ModelStore::new(dir)
    }

    #[test]
    fn asset_urls() {
        let palm = ModelAsset::palm_detection("https://example.com/models/");
        assert_eq!(palm.file_name(), "palm_detection_full.onnx");
        assert_eq!(palm.url(), "https://example.com/models/palm_detection_full.onnx");

        let hand = ModelAsset::hand_landmark(DEFAULT_MODEL_URL);
        assert_eq!(
            hand.url(),
            format!("{DEFAULT_MODEL_URL}/hand_landmark_full.onnx")
        );
    }

    #[test]
    fn reuses_existing_file() {
        let store = temp_store("reuse");
        // Unroutable URL: any network access would fail the test.
        let asset = ModelAsset::new("model.onnx", "http://127.0.0.1:9/model.onnx");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_of(&asset), b"cached").unwrap();

        let path = store.ensure(&asset).unwrap();
        assert_eq!(path, store.dir().join("model.onnx"));
        assert_eq!(fs::read(&path).unwrap(), b"cached");

        fs::remove_dir_all(store.dir()).unwrap();
    }

    #[test]
    fn failed_download_leaves_nothing_behind() {
        let store = temp_store("fail");
        let asset = ModelAsset::new("model.onnx", "http://127.0.0.1:9/model.onnx");

        assert!(store.ensure(&asset).is_err());
        assert!(!store.path_of(&asset).exists());

        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn default_dir() {
        assert_eq!(ModelStore::default().dir(), Path::new(DEFAULT_MODEL_DIR));
    }
}
