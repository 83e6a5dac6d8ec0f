//! Bundle manifests: the on-disk shape of an installable artifact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::artifact::ArtifactPath;
use crate::error::{HarnessError, Result};

/// One DNA inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnaManifest {
    pub name: String,
    #[serde(default)]
    pub zomes: Vec<String>,
    /// Entry types the DNA's zomes are allowed to create.
    #[serde(default)]
    pub entry_types: Vec<String>,
}

/// Top-level bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub dnas: Vec<DnaManifest>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl BundleManifest {
    pub fn declares_entry_type(&self, entry_type: &str) -> bool {
        self.dnas
            .iter()
            .any(|dna| dna.entry_types.iter().any(|t| t == entry_type))
    }

    pub fn has_zome(&self, zome: &str) -> bool {
        self.dnas.iter().any(|dna| dna.zomes.iter().any(|z| z == zome))
    }
}

/// A bundle read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub path: ArtifactPath,
    pub manifest: BundleManifest,
    /// SHA-256 of the raw file bytes, hex encoded.
    pub digest: String,
}

impl Bundle {
    /// Read and parse the bundle at `path`.
    pub fn load(path: &ArtifactPath) -> Result<Self> {
        let bytes = std::fs::read(path.as_path()).map_err(|e| read_error(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// [`Bundle::load`] without blocking the runtime.
    pub async fn load_async(path: &ArtifactPath) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_path())
            .await
            .map_err(|e| read_error(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// Parse raw bundle bytes read from `path`.
    pub fn from_bytes(path: &ArtifactPath, bytes: &[u8]) -> Result<Self> {
        let manifest: BundleManifest =
            serde_json::from_slice(bytes).map_err(|e| HarnessError::BundleInvalid {
                path: path.as_path().to_path_buf(),
                reason: e.to_string(),
            })?;

        if manifest.name.trim().is_empty() {
            return Err(HarnessError::BundleInvalid {
                path: path.as_path().to_path_buf(),
                reason: "bundle name must not be empty".to_string(),
            });
        }

        Ok(Self {
            path: path.clone(),
            manifest,
            digest: digest_bytes(bytes),
        })
    }
}

fn read_error(path: &ArtifactPath, err: std::io::Error) -> HarnessError {
    if err.kind() == std::io::ErrorKind::NotFound {
        HarnessError::ArtifactMissing {
            path: path.as_path().to_path_buf(),
        }
    } else {
        HarnessError::Io(err)
    }
}

fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_bundle(dir: &tempfile::TempDir, name: &str, body: &str) -> ArtifactPath {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        ArtifactPath::new(path)
    }

    #[test]
    fn test_load_valid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(
            &dir,
            "app.happ",
            r#"{"name":"app","dnas":[{"name":"d","zomes":["z"],"entry_types":["post"]}]}"#,
        );
        let bundle = Bundle::load(&path).unwrap();
        assert_eq!(bundle.manifest.name, "app");
        assert_eq!(bundle.manifest.version, "0.0.0");
        assert_eq!(bundle.digest.len(), 64);
        assert!(bundle.manifest.declares_entry_type("post"));
        assert!(bundle.manifest.has_zome("z"));
        assert!(!bundle.manifest.has_zome("other"));
    }

    #[test]
    fn test_load_missing_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = ArtifactPath::new(dir.path().join("nope.happ"));
        let err = Bundle::load(&path).unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactMissing { .. }));
    }

    #[test]
    fn test_load_malformed_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(&dir, "bad.happ", "not json");
        let err = Bundle::load(&path).unwrap_err();
        assert!(matches!(err, HarnessError::BundleInvalid { .. }));
    }

    #[tokio::test]
    async fn test_load_async_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(&dir, "app.happ", r#"{"name":"app","version":"1.2.0"}"#);
        let sync = Bundle::load(&path).unwrap();
        let async_loaded = Bundle::load_async(&path).await.unwrap();
        assert_eq!(sync, async_loaded);
        assert_eq!(sync.manifest.version, "1.2.0");
    }

    #[test]
    fn test_same_bytes_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_bundle(&dir, "a.happ", r#"{"name":"x"}"#);
        let b = write_bundle(&dir, "b.happ", r#"{"name":"x"}"#);
        assert_eq!(
            Bundle::load(&a).unwrap().digest,
            Bundle::load(&b).unwrap().digest
        );
    }
}
