use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::errors::{CrlError, CrlResult};

/// Persistent CRL number, stored as uppercase hexadecimal text.
///
/// A missing file means no CRL was issued yet; the first number is 1.
#[derive(Debug, Clone)]
pub struct CrlNumberStore {
    path: PathBuf,
}

impl CrlNumberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number the next CRL must carry
    pub fn read(&self) -> CrlResult<u64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, starting at CRL number 1", self.path.display());
                return Ok(1);
            }
            Err(e) => return Err(CrlError::io("read CRL number", &self.path, e)),
        };

        let invalid = || CrlError::CrlNumber {
            path: self.path.clone(),
            content: content.clone(),
        };
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        u64::from_str_radix(trimmed, 16).map_err(|_| invalid())
    }

    /// Records that `current` was used, so the next read yields `current + 1`
    pub fn advance(&self, current: u64) -> CrlResult<u64> {
        let next = current.checked_add(1).ok_or_else(|| CrlError::CrlNumber {
            path: self.path.clone(),
            content: format!("{current:X}"),
        })?;
        write_atomic(&self.path, format!("{next:02X}\n").as_bytes())?;
        Ok(next)
    }
}

/// Sibling path used while a file is being replaced
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to a temporary sibling, syncs it, then renames it over `path`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> CrlResult<()> {
    let temp = temp_path(path);
    write_synced(&temp, bytes)?;
    replace(&temp, path)
}

pub(crate) fn write_synced(path: &Path, bytes: &[u8]) -> CrlResult<()> {
    let mut file = fs::File::create(path).map_err(|e| CrlError::io("create", path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| CrlError::io("write", path, e))
}

pub(crate) fn replace(from: &Path, to: &Path) -> CrlResult<()> {
    fs::rename(from, to).map_err(|e| {
        let _ = fs::remove_file(from);
        CrlError::io("replace", to, e)
    })
}
