use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use super::{StatusError, StatusResult};
use crate::pki::crl::RevocationReason;
use crate::pki::ledger::{LedgerEntry, LedgerStatus};

/// Serial placeholder some ledgers carry for unissued rows
const UNKNOWN_SERIAL: &str = "unknown";

/// Answer to a status lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Good,
    Revoked(RevocationReason),
    Unknown,
}

impl CertificateStatus {
    /// Upper-case label used in signed messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Revoked(_) => "REVOKED",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn reason(&self) -> Option<RevocationReason> {
        match self {
            Self::Revoked(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revoked(reason) => write!(f, "REVOKED ({})", reason.description()),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedEntry {
    status: LedgerStatus,
    reason: RevocationReason,
}

/// Read-only map from ledger serial token to its current status.
///
/// Tokens are matched literally, so `1000` and `01000` are different keys.
/// When a token appears more than once, the later ledger line wins.
#[derive(Debug, Clone, Default)]
pub struct CertificateStatusIndex {
    entries: HashMap<String, IndexedEntry>,
    skipped: usize,
}

impl CertificateStatusIndex {
    pub fn load(path: impl AsRef<Path>) -> StatusResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StatusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::parse(&text);
        debug!(
            "Indexed {} certificate(s) from {} ({} line(s) skipped)",
            index.len(),
            path.display(),
            index.skipped
        );
        Ok(index)
    }

    pub fn parse(text: &str) -> Self {
        let mut index = Self::default();
        for (number, line) in text.lines().enumerate() {
            match LedgerEntry::parse_line(line) {
                Ok(Some(entry)) if entry.serial.eq_ignore_ascii_case(UNKNOWN_SERIAL) => {}
                Ok(Some(entry)) => {
                    let reason = entry.reason();
                    index.entries.insert(
                        entry.serial,
                        IndexedEntry {
                            status: entry.status,
                            reason,
                        },
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping ledger line {}: {}", number + 1, e);
                    index.skipped += 1;
                }
            }
        }
        index
    }

    pub fn lookup(&self, serial: &str) -> CertificateStatus {
        match self.entries.get(serial.trim()) {
            Some(IndexedEntry {
                status: LedgerStatus::Valid,
                ..
            }) => CertificateStatus::Good,
            Some(IndexedEntry {
                status: LedgerStatus::Revoked,
                reason,
            }) => CertificateStatus::Revoked(*reason),
            _ => CertificateStatus::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
