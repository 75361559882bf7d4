//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that the backup-root safety check
//! can be unit-tested without touching the real filesystem. Production code
//! uses [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.

use std::path::Path;

/// Abstraction over the filesystem queries made by the job engine.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create `path` and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// ```ignore
/// let fs = MockFileSystemOps::new().with_dir("/mnt/backup");
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    dirs: std::sync::Mutex<std::collections::HashSet<std::path::PathBuf>>,
    created: std::sync::Mutex<Vec<std::path::PathBuf>>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with no directories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as an existing directory.
    #[must_use]
    pub fn with_dir(self, path: impl Into<std::path::PathBuf>) -> Self {
        if let Ok(mut dirs) = self.dirs.lock() {
            dirs.insert(path.into());
        }
        self
    }

    /// Directories created through [`FileSystemOps::create_dir_all`].
    pub fn created(&self) -> Vec<std::path::PathBuf> {
        self.created.lock().map_or_else(|_| vec![], |c| c.clone())
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().is_ok_and(|d| d.contains(path))
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        if let Ok(mut created) = self.created.lock() {
            created.push(path.to_path_buf());
        }
        if let Ok(mut dirs) = self.dirs.lock() {
            dirs.insert(path.to_path_buf());
        }
        Ok(())
    }
}
