use std::path::PathBuf;
use thiserror::Error;

use crate::asn1;
use crate::crypto::{KeyExtractionError, SigningError};
use crate::pki::ledger::LedgerError;

/// Errors that abort a CRL build
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("Missing required input: {0}")]
    Configuration(String),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid issuer certificate: {0}")]
    Issuer(String),

    #[error("Key extraction failed: {0}")]
    KeyExtraction(#[from] KeyExtractionError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("DER encoding failed: {0}")]
    Encoding(#[from] asn1::Error),

    #[error("Invalid CRL number in {path}: {content:?}")]
    CrlNumber { path: PathBuf, content: String },

    #[error("CRL artifact check failed: {0}")]
    Artifact(String),
}

impl CrlError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
