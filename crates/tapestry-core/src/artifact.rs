//! Artifact location relative to a test module.
//!
//! Suites declare where their compiled bundle lives as a fixed offset from
//! the test file's own directory (for example `../workdir/app.happ`). The
//! locator turns that offset into an absolute, lexically normalized path.
//! It never touches the filesystem: a missing bundle is reported by the
//! network when it tries to install it.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Absolute path to a compiled bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    /// Wrap an already-resolved path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether a file currently exists at this path.
    pub fn exists(&self) -> bool {
        self.0.is_file()
    }

    /// File stem, used as a fallback app name.
    pub fn stem(&self) -> Option<&str> {
        self.0.file_stem().and_then(|s| s.to_str())
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ArtifactPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolves artifact offsets against a module directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    module_dir: PathBuf,
}

impl ArtifactLocator {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Apply `offset` to the module directory.
    ///
    /// An absolute `offset` is normalized and returned as-is. Relative module
    /// directories are anchored at the current working directory.
    pub fn resolve(&self, offset: impl AsRef<Path>) -> Result<ArtifactPath> {
        let joined = self.module_dir.join(offset.as_ref());
        let absolute = std::path::absolute(&joined).map_err(|e| {
            HarnessError::Config(format!(
                "cannot make {} absolute: {}",
                joined.display(),
                e
            ))
        })?;
        Ok(ArtifactPath(normalize_lexically(&absolute)))
    }
}

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// `..` past the root is dropped, matching how the OS treats `/..`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Directory containing `file`, given the crate manifest directory.
///
/// `file!()` is relative to wherever cargo invoked rustc: the workspace root
/// for members, the crate root for standalone builds. The overlap between
/// the tail of `manifest_dir` and the head of `file` is stripped so both
/// cases land on the same directory.
pub fn module_dir_from(manifest_dir: &str, file: &str) -> PathBuf {
    let manifest = Path::new(manifest_dir);
    let file = Path::new(file);
    if file.is_absolute() {
        return file.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    let manifest_parts: Vec<_> = manifest.components().collect();
    let file_parts: Vec<_> = file.components().collect();

    let mut overlap = 0;
    for len in (1..=manifest_parts.len().min(file_parts.len())).rev() {
        if manifest_parts[manifest_parts.len() - len..] == file_parts[..len] {
            overlap = len;
            break;
        }
    }

    let relative: PathBuf = file_parts[overlap..].iter().map(|c| c.as_os_str()).collect();
    let full = manifest.join(relative);
    full.parent().map(Path::to_path_buf).unwrap_or(full)
}

/// Directory of the source file that invokes the macro.
///
/// ```ignore
/// let locator = ArtifactLocator::new(tapestry_core::module_dir!());
/// let happ = locator.resolve("../workdir/tragedy-commons.happ")?;
/// ```
#[macro_export]
macro_rules! module_dir {
    () => {
        $crate::artifact::module_dir_from(env!("CARGO_MANIFEST_DIR"), file!())
    };
}
