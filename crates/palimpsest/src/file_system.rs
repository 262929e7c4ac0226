//! File access behind a trait, with disk and in-memory backends.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;

/// Files above this size still load, with a warning.
pub const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Storage used by the editor for every buffer load and save.
pub trait FileSystem {
    fn read(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Entry paths of a directory, sorted.
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    /// Absolute, normalised form of `path`. Works for paths that do not exist yet.
    fn canonicalize(&self, path: &Path) -> PathBuf;
}

/// Lexically removes `.` and resolves `..` without touching the disk.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn read_error(path: &Path, e: &io::Error) -> anyhow::Error {
    let msg = match e.kind() {
        io::ErrorKind::PermissionDenied => {
            format!("Permission denied reading file: {}", path.display())
        }
        io::ErrorKind::NotFound => format!("File not found: {}", path.display()),
        io::ErrorKind::InvalidData => {
            format!("File is not valid UTF-8: {}", path.display())
        }
        _ => format!("Failed to read file: {} - {}", path.display(), e),
    };
    anyhow::anyhow!(msg)
}

fn write_error(path: &Path, e: &io::Error) -> anyhow::Error {
    let msg = match e.kind() {
        io::ErrorKind::PermissionDenied => {
            format!("Permission denied writing file: {}", path.display())
        }
        io::ErrorKind::WriteZero => {
            format!("Disk may be full, nothing written: {}", path.display())
        }
        _ => format!("Failed to write file: {} - {}", path.display(), e),
    };
    anyhow::anyhow!(msg)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl DiskFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for DiskFileSystem {
    fn read(&self, path: &Path) -> Result<String> {
        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.is_dir() {
                return Err(anyhow::anyhow!("Path is a directory: {}", path.display()));
            }
            if metadata.len() > LARGE_FILE_THRESHOLD {
                log::warn!(
                    "Large file detected ({} bytes): {}",
                    metadata.len(),
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
        if content.contains('\0') {
            return Err(anyhow::anyhow!(
                "File appears to be binary: {}",
                path.display()
            ));
        }
        Ok(content)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    anyhow::anyhow!("Failed to create directory: {} - {}", parent.display(), e)
                })?;
                log::info!("Created directory: {}", parent.display());
            }
        }
        std::fs::write(path, contents.as_bytes()).map_err(|e| write_error(path, &e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .map_err(|e| anyhow::anyhow!("Failed to list directory: {} - {}", path.display(), e))?;
        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => log::warn!("Skipping unreadable entry in {}: {}", path.display(), e),
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path.to_path_buf(),
            }
        };
        if let Ok(real) = std::fs::canonicalize(&absolute) {
            return real;
        }
        // Missing file: resolve the parent so the key matches once it exists.
        let cleaned = clean_path(&absolute);
        match (cleaned.parent(), cleaned.file_name()) {
            (Some(parent), Some(name)) => match std::fs::canonicalize(parent) {
                Ok(real_parent) => real_parent.join(name),
                Err(_) => cleaned,
            },
            _ => cleaned,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, String>,
    fail_writes: bool,
}

/// In-memory storage. Clones share the same files.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let key = clean_path(&Self::rooted(path.as_ref()));
        self.state.borrow_mut().files.insert(key, contents.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let key = clean_path(&Self::rooted(path.as_ref()));
        self.state.borrow_mut().files.remove(&key).is_some()
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = clean_path(&Self::rooted(path.as_ref()));
        self.state.borrow().files.get(&key).cloned()
    }

    /// Makes every subsequent write fail, for exercising save errors.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    fn rooted(path: &Path) -> PathBuf {
        if path.has_root() {
            path.to_path_buf()
        } else {
            Path::new("/").join(path)
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> Result<String> {
        let key = self.canonicalize(path);
        self.state
            .borrow()
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let key = self.canonicalize(path);
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(anyhow::anyhow!(
                "Permission denied writing file: {}",
                path.display()
            ));
        }
        state.files.insert(key, contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let key = self.canonicalize(path);
        let state = self.state.borrow();
        state.files.contains_key(&key) || state.files.keys().any(|p| p.starts_with(&key) && *p != key)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let key = self.canonicalize(path);
        let state = self.state.borrow();
        !state.files.contains_key(&key) && state.files.keys().any(|p| p.starts_with(&key))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let key = self.canonicalize(path);
        if !self.is_dir(&key) {
            return Err(anyhow::anyhow!("Not a directory: {}", path.display()));
        }
        let state = self.state.borrow();
        let mut entries: Vec<PathBuf> = state
            .files
            .keys()
            .filter_map(|p| p.strip_prefix(&key).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| key.join(first.as_os_str()))
            .collect();
        entries.dedup();
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        clean_path(&Self::rooted(path))
    }
}
