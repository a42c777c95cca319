use std::path::{Path, PathBuf};
use thiserror::Error;

/// Containment check for batch targets declared relative to a root.
///
/// Paths are canonicalized so symlinks and `..` components cannot escape
/// the declared root.
#[derive(Debug, Clone)]
pub struct RootGuard {
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path is outside root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl RootGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// Resolve `path` against the root and check containment.
    ///
    /// Returns the canonicalized absolute path if it stays inside.
    ///
    /// Note: canonicalization happens at validation time. Callers that must
    /// close the TOCTOU window should call [`RootGuard::revalidate`]
    /// immediately before writing.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let canonical = absolute.canonicalize()?;

        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: canonical,
                root: self.root.clone(),
            });
        }

        Ok(canonical)
    }

    /// Re-check a previously-validated canonical path.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        self.validate_path(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
