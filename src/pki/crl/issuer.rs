use std::path::Path;

use tracing::debug;
use x509_parser::prelude::*;

use super::errors::{CrlError, CrlResult};
use crate::pki::pem;

/// Identity of the CRL issuer, taken from its own certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerIdentity {
    /// Raw DER of the certificate's subject Name
    pub distinguished_name_der: Vec<u8>,
    pub subject_key_identifier: Option<Vec<u8>>,
}

impl IssuerIdentity {
    /// Reads the issuer identity from a PEM or DER certificate
    pub fn from_certificate(data: &[u8]) -> CrlResult<Self> {
        let der = pem::decode_if_armored(data).map_err(|e| CrlError::Issuer(e.to_string()))?;
        let (_, cert) =
            X509Certificate::from_der(&der).map_err(|e| CrlError::Issuer(e.to_string()))?;

        let subject_key_identifier = cert.extensions().iter().find_map(|ext| {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(ski) => Some(ski.0.to_vec()),
                _ => None,
            }
        });

        debug!(
            "Issuer {} (subject key identifier: {})",
            cert.tbs_certificate.subject,
            subject_key_identifier
                .as_deref()
                .map(hex::encode)
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Self {
            distinguished_name_der: cert.tbs_certificate.subject.as_raw().to_vec(),
            subject_key_identifier,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> CrlResult<Self> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).map_err(|e| CrlError::io("read issuer certificate", path, e))?;
        Self::from_certificate(&data)
    }
}
