//! Reader for the append-only certificate ledger (OpenSSL `index.txt`).
//!
//! Each line holds `status`, `expiry`, `revocation`, `serial` and optional
//! trailing fields. Tab-separated lines keep empty fields, which is how a
//! valid certificate leaves its revocation field blank. Lines without tabs,
//! or whose tab split is too short to hold the serial, are split on
//! whitespace.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::asn1::der::GENERALIZED_TIME_FORMAT;
use crate::pki::crl::{RevocationReason, RevocationRecord, SerialNumber};

const MIN_FIELDS: usize = 4;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a single ledger line is skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected at least {MIN_FIELDS} fields, found {0}")]
    MissingFields(usize),

    #[error("unparsable revocation time {0:?}")]
    Timestamp(String),

    #[error("invalid serial {0:?}")]
    Serial(String),

    #[error("duplicate serial {0}")]
    DuplicateSerial(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    Valid,
    Revoked,
    Expired,
    Other(String),
}

impl LedgerStatus {
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "V" => Self::Valid,
            "R" => Self::Revoked,
            "E" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One parsed ledger line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub status: LedgerStatus,
    pub revocation_field: String,
    /// Serial exactly as written in the ledger
    pub serial: String,
}

impl LedgerEntry {
    /// Parses one line. Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, LineError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            // Mixed or space-only delimiters
            fields = line.split_whitespace().collect();
        }
        if fields.len() < MIN_FIELDS {
            return Err(LineError::MissingFields(fields.len()));
        }

        Ok(Some(Self {
            status: LedgerStatus::from_flag(fields[0]),
            revocation_field: fields[2].to_string(),
            serial: fields[3].to_string(),
        }))
    }

    /// Splits the revocation field into its time and optional reason label.
    ///
    /// OpenSSL appends extra comma-separated data after some reasons
    /// (e.g. hold instructions); only the first label is kept.
    pub fn revocation_parts(&self) -> (&str, Option<&str>) {
        let mut parts = self.revocation_field.splitn(3, ',');
        let time = parts.next().unwrap_or_default().trim();
        let label = parts.next().map(str::trim).filter(|l| !l.is_empty());
        (time, label)
    }

    pub fn reason(&self) -> RevocationReason {
        self.revocation_parts()
            .1
            .map(RevocationReason::from_label)
            .unwrap_or(RevocationReason::Unspecified)
    }

    /// Builds the revocation record for an `R` line
    pub fn to_revocation_record(&self) -> Result<RevocationRecord, LineError> {
        let (time, label) = self.revocation_parts();
        let revocation_time = parse_revocation_time(time)?;
        let serial = SerialNumber::from_hex(&self.serial)
            .map_err(|_| LineError::Serial(self.serial.clone()))?;
        let raw_reason_label = label.unwrap_or(RevocationReason::Unspecified.label());

        Ok(RevocationRecord {
            serial,
            revocation_time,
            reason: RevocationReason::from_label(raw_reason_label),
            raw_reason_label: raw_reason_label.to_string(),
        })
    }
}

/// Parses `YYMMDDHHMMSSZ` or `YYYYMMDDHHMMSSZ` as UTC.
///
/// Two-digit years use the RFC 5280 UTCTime pivot: 50-99 are 19xx.
pub fn parse_revocation_time(value: &str) -> Result<DateTime<Utc>, LineError> {
    let invalid = || LineError::Timestamp(value.to_string());
    if !value.is_ascii() {
        return Err(invalid());
    }

    let full = match value.len() {
        13 => {
            let yy: u32 = value[..2].parse().map_err(|_| invalid())?;
            let century = if yy >= 50 { "19" } else { "20" };
            format!("{century}{value}")
        }
        15 => value.to_string(),
        _ => return Err(invalid()),
    };

    NaiveDateTime::parse_from_str(&full, GENERALIZED_TIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|_| invalid())
}

/// Revoked certificates read from one ledger snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Revocations in ledger order
    pub records: Vec<RevocationRecord>,
    /// Lines that could not be used
    pub skipped: usize,
}

impl LedgerSnapshot {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::parse(&text);
        debug!(
            "Read {} revoked certificate(s) from {} ({} line(s) skipped)",
            snapshot.records.len(),
            path.display(),
            snapshot.skipped
        );
        Ok(snapshot)
    }

    pub fn parse(text: &str) -> Self {
        let mut snapshot = Self::default();
        let mut seen = HashSet::new();

        for (number, line) in text.lines().enumerate() {
            let record = match LedgerEntry::parse_line(line) {
                Ok(Some(entry)) if entry.status == LedgerStatus::Revoked => {
                    entry.to_revocation_record().and_then(|record| {
                        if seen.insert(record.serial.clone()) {
                            Ok(record)
                        } else {
                            Err(LineError::DuplicateSerial(record.serial.to_string()))
                        }
                    })
                }
                Ok(_) => continue,
                Err(e) => Err(e),
            };

            match record {
                Ok(record) => snapshot.records.push(record),
                Err(e) => {
                    warn!("Skipping ledger line {}: {}", number + 1, e);
                    snapshot.skipped += 1;
                }
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LEDGER: &str = "\
V\t270101000000Z\t\t0FFF\tunknown\t/CN=valid.example
R\t270101000000Z\t250101000000Z,keyCompromise\t1000\tunknown\t/CN=one.example
R\t270101000000Z\t20250315123000Z\t1001\tunknown\t/CN=two.example
E\t240101000000Z\t\t1002\tunknown\t/CN=expired.example
R\t270101000000Z\t250201000000Z,superseded\t1003\tunknown\t/CN=three.example
";

    #[test]
    fn test_parse_revoked_records_in_order() {
        let snapshot = LedgerSnapshot::parse(LEDGER);
        assert_eq!(snapshot.skipped, 0);

        let serials: Vec<String> = snapshot
            .records
            .iter()
            .map(|r| r.serial.to_string())
            .collect();
        assert_eq!(serials, vec!["1000", "1001", "1003"]);

        let first = &snapshot.records[0];
        assert_eq!(first.reason, RevocationReason::KeyCompromise);
        assert_eq!(first.raw_reason_label, "keyCompromise");
        assert_eq!(
            first.revocation_time,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );

        let second = &snapshot.records[1];
        assert_eq!(second.reason, RevocationReason::Unspecified);
        assert_eq!(second.raw_reason_label, "unspecified");
        assert_eq!(
            second.revocation_time,
            Utc.with_ymd_and_hms(2025, 3, 15, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_minimal_revoked_line() {
        let snapshot = LedgerSnapshot::parse("R\t(ignored)\t250101000000Z,keyCompromise\t1000\t...\n");
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].serial, SerialNumber::from(0x1000));
    }

    #[test]
    fn test_whitespace_separated_line() {
        let snapshot =
            LedgerSnapshot::parse("R 270101000000Z 250101000000Z,cessationOfOperation 2A unknown");
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(
            snapshot.records[0].reason,
            RevocationReason::CessationOfOperation
        );
    }

    #[test]
    fn test_mixed_delimiters_fall_back_to_whitespace() {
        let snapshot =
            LedgerSnapshot::parse("R 270101000000Z 250101000000Z,keyCompromise\t1000\n");
        assert_eq!(snapshot.skipped, 0);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].serial.to_string(), "1000");
        assert_eq!(snapshot.records[0].reason, RevocationReason::KeyCompromise);
    }

    #[test]
    fn test_malformed_lines_are_counted() {
        let text = "\
R\t270101000000Z\tnot-a-time\t1000\tunknown
R\t270101000000Z
R\t270101000000Z\t251301000000Z\t1001\tunknown
R\t270101000000Z\t250101000000Z\tXYZ\tunknown

# comment
R\t270101000000Z\t250101000000Z\t1004\tunknown
R\t270101000000Z\t250102000000Z\t1004\tunknown
";
        let snapshot = LedgerSnapshot::parse(text);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].serial.to_string(), "1004");
        assert_eq!(snapshot.skipped, 5);
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(
            parse_revocation_time("491231235959Z").unwrap(),
            Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap()
        );
        assert_eq!(
            parse_revocation_time("500101000000Z").unwrap(),
            Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_revocation_time("250101000000").is_err());
        assert!(parse_revocation_time("2501010000Z").is_err());
        assert!(parse_revocation_time("").is_err());
    }

    #[test]
    fn test_reason_with_hold_instruction() {
        let entry = LedgerEntry::parse_line(
            "R\t270101000000Z\t250101000000Z,certificateHold,holdInstructionReject\t10\tunknown",
        )
        .unwrap()
        .unwrap();
        assert_eq!(entry.reason(), RevocationReason::CertificateHold);
        assert_eq!(
            entry.to_revocation_record().unwrap().raw_reason_label,
            "certificateHold"
        );
    }

    #[test]
    fn test_read_missing_file() {
        let err = LedgerSnapshot::read("/nonexistent/index.txt").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/index.txt"));
    }
}
