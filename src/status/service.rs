use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::index::{CertificateStatus, CertificateStatusIndex};
use super::{StatusError, StatusResult};
use crate::asn1::der::GENERALIZED_TIME_FORMAT;
use crate::config::{ResponderConfig, SignerConfig};
use crate::crypto::{KeyMaterial, SigningError, SigningProvider, sign_bounded};

/// Prefix of every signed status message
pub const MESSAGE_PREFIX: &str = "CERTSTATUS";

/// Signed answer to one status query. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAttestation {
    pub serial: String,
    pub status: CertificateStatus,
    pub timestamp: DateTime<Utc>,
    /// The exact bytes that were signed, as text
    pub message: String,
    pub signature: Vec<u8>,
    pub algorithm: String,
}

/// Looks up certificate status and signs the answer
pub struct StatusService {
    index: CertificateStatusIndex,
    provider: Arc<dyn SigningProvider>,
    key: KeyMaterial,
    max_signature_len: usize,
}

impl StatusService {
    pub fn new(
        index: CertificateStatusIndex,
        provider: Arc<dyn SigningProvider>,
        key: KeyMaterial,
    ) -> Self {
        let max_signature_len = provider.max_signature_len();
        Self {
            index,
            provider,
            key,
            max_signature_len,
        }
    }

    /// Caps accepted signatures below the provider's own limit
    pub fn with_max_signature_len(mut self, max: usize) -> Self {
        self.max_signature_len = max;
        self
    }

    /// Loads the status index and signing key named by the configuration
    pub fn from_config(
        responder: &ResponderConfig,
        signer: &SignerConfig,
        provider: Arc<dyn SigningProvider>,
    ) -> StatusResult<Self> {
        for (what, path) in [
            ("ledger", &responder.ledger_path),
            ("private key", &responder.key_path),
        ] {
            if !path.exists() {
                return Err(StatusError::Configuration(format!(
                    "{what} not found at {}",
                    path.display()
                )));
            }
        }

        let index = CertificateStatusIndex::load(&responder.ledger_path)?;
        let key = load_key(&responder.key_path, signer)?;
        info!(
            "Status service ready: {} certificate(s), {} key",
            index.len(),
            provider.name()
        );
        Ok(Self::new(index, provider, key).with_max_signature_len(signer.max_signature_len))
    }

    pub fn index(&self) -> &CertificateStatusIndex {
        &self.index
    }

    pub fn attest(&self, serial: &str) -> StatusResult<StatusAttestation> {
        self.attest_at(serial, Utc::now())
    }

    pub fn attest_at(&self, serial: &str, now: DateTime<Utc>) -> StatusResult<StatusAttestation> {
        let serial = serial.trim();
        let status = self.index.lookup(serial);
        let message = status_message(serial, &status, &now);
        let signature = sign_bounded(self.provider.as_ref(), message.as_bytes(), &self.key)?;
        if signature.len() > self.max_signature_len {
            return Err(SigningError::SignatureTooLong {
                max: self.max_signature_len,
                actual: signature.len(),
            }
            .into());
        }

        Ok(StatusAttestation {
            serial: serial.to_string(),
            status,
            timestamp: now,
            message,
            signature,
            algorithm: self.provider.name(),
        })
    }
}

/// Reads and extracts the signing key from its PKCS#8 container
pub fn load_key(path: &Path, signer: &SignerConfig) -> StatusResult<KeyMaterial> {
    let layout = signer.key_layout()?;
    let container = std::fs::read(path).map_err(|source| StatusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(KeyMaterial::from_container(&container, &layout)?)
}

/// `CERTSTATUS|<serial>|<STATUS>[|<reason>]|<timestamp>`
pub fn status_message(serial: &str, status: &CertificateStatus, at: &DateTime<Utc>) -> String {
    let timestamp = at.format(GENERALIZED_TIME_FORMAT);
    match status.reason() {
        Some(reason) => format!(
            "{MESSAGE_PREFIX}|{serial}|{}|{}|{timestamp}",
            status.label(),
            reason.label()
        ),
        None => format!("{MESSAGE_PREFIX}|{serial}|{}|{timestamp}", status.label()),
    }
}
