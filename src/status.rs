//! Certificate status responder
//!
//! A lightweight status service answering `serial=<token>` queries over TCP
//! with a signed plaintext attestation. This is a proprietary text protocol,
//! not OCSP (RFC 6960).

pub mod client;
mod index;
pub mod protocol;
pub mod server;
mod service;

use std::path::PathBuf;
use thiserror::Error;

use crate::crypto::{KeyExtractionError, SigningError};

pub use client::query_status;
pub use index::{CertificateStatus, CertificateStatusIndex};
pub use server::StatusServer;
pub use service::{MESSAGE_PREFIX, StatusAttestation, StatusService, load_key, status_message};

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Missing required input: {0}")]
    Configuration(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key extraction failed: {0}")]
    KeyExtraction(#[from] KeyExtractionError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Request timed out")]
    Timeout,
}

/// Convenient Result type alias
pub type StatusResult<T> = Result<T, StatusError>;
