use std::{collections::HashMap, path::PathBuf};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::crypto::{KeyExtractionError, KeyLayout};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crl: CrlConfig,
    pub responder: ResponderConfig,
    pub signer: SignerConfig,
}

/// Inputs and outputs of one CRL generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrlConfig {
    pub ledger_path: PathBuf,
    pub issuer_cert_path: PathBuf,
    pub key_path: PathBuf,
    pub output_path: PathBuf,
    pub crl_number_path: PathBuf,
    /// Days between thisUpdate and nextUpdate
    pub validity_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    pub host: String,
    pub port: u16,
    pub ledger_path: PathBuf,
    pub key_path: PathBuf,
    pub max_request_bytes: usize,
}

impl ResponderConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Length of the expanded secret key
    pub key_len: usize,
    pub seed_len: usize,
    pub max_signature_len: usize,
    /// Dotted OID placed in the CRL's AlgorithmIdentifier
    pub signature_oid: String,
}

impl SignerConfig {
    pub fn key_layout(&self) -> Result<KeyLayout, KeyExtractionError> {
        KeyLayout::new(self.key_len, self.seed_len)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("crl.ledger_path", "index.txt")?
            .set_default("crl.issuer_cert_path", "certs/intermediate_ca.crt")?
            .set_default("crl.key_path", "private/intermediate_ca.key")?
            .set_default("crl.output_path", "intermediate.crl.pem")?
            .set_default("crl.crl_number_path", "crlnumber")?
            .set_default("crl.validity_days", 30)?
            .set_default("responder.host", "127.0.0.1")?
            .set_default("responder.port", 2560)?
            .set_default("responder.ledger_path", "index.txt")?
            .set_default("responder.key_path", "private/intermediate_ca.key")?
            .set_default("responder.max_request_bytes", 1024)?
            .set_default("signer.key_len", 4896)?
            .set_default("signer.seed_len", 32)?
            .set_default("signer.max_signature_len", 4627)?
            .set_default("signer.signature_oid", crate::asn1::oid::ID_ML_DSA_87)?
            .add_source(File::with_name("config/settings").required(false));

        // An explicit map replaces the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. APP_RESPONDER__PORT or APP_CRL__VALIDITY_DAYS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
