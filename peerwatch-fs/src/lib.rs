//! Filesystem abstraction for peerwatch.
//!
//! The notification ledger, the status heartbeat and the optional range files all go
//! through the [`Filesystem`] trait so that persistence can be exercised against an
//! in-memory [`MockFilesystem`] in tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("path error: {0}")]
    Path(String),
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Write data atomically to a path (write to temp, then rename).
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Append data to a file, creating it if it doesn't exist.
    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Read file contents as a string.
    fn read_file(&self, path: &Path) -> Result<String, FsError>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
}

impl<F: Filesystem + ?Sized> Filesystem for Arc<F> {
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        (**self).write_atomic(path, data)
    }

    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        (**self).append_atomic(path, data)
    }

    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        (**self).read_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        (**self).create_dir_all(path)
    }
}

/// Create the parent directory of `path` if it has a non-empty one.
fn ensure_parent(path: &Path) -> Result<(), FsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;

        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        // Rename is atomic on the same filesystem
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        file.write_all(data)?;
        file.sync_data()?;

        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        Ok(fs::read_to_string(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<RwLock<HashSet<PathBuf>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all files in the mock filesystem.
    pub fn files(&self) -> HashMap<PathBuf, Vec<u8>> {
        self.files.read().unwrap().clone()
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Get content of a specific file as UTF-8 text.
    pub fn get_text(&self, path: &Path) -> Option<String> {
        self.get_file(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: PathBuf, data: Vec<u8>) {
        self.files.write().unwrap().insert(path, data);
    }

    /// Make every subsequent write or append fail with a permission error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write().unwrap() = fail;
    }

    fn check_writable(&self, path: &Path) -> Result<(), FsError> {
        if *self.fail_writes.read().unwrap() {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write refused: {}", path.display()),
            )));
        }
        Ok(())
    }
}

impl Filesystem for MockFilesystem {
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        self.check_writable(path)?;
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn append_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        self.check_writable(path)?;
        let mut files = self.files.write().unwrap();
        files
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        let files = self.files.read().unwrap();
        match files.get(path) {
            Some(data) => String::from_utf8(data.clone())
                .map_err(|e| FsError::Path(format!("invalid utf8: {}", e))),
            None => Err(FsError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ))),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path) || self.dirs.read().unwrap().contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        self.dirs.write().unwrap().insert(path.to_path_buf());
        Ok(())
    }
}
