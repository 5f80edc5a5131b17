//! Certificate Revocation List (CRL) issuance
//!
//! This module builds X.509 v2 CRLs signed with ML-DSA-87 according to RFC 5280 §5
//!
//! # Features
//! - Reading revoked certificates from the issuance ledger
//! - Encoding the `TBSCertList` with CRL number and authority key identifier
//! - Signing through a pluggable [`SigningProvider`](crate::crypto::SigningProvider)
//! - Persisting the monotonic CRL number alongside the PEM artifact

mod builder;
mod counter;
mod errors;
mod generator;
mod issuer;
mod types;

// Re-export public types
pub use builder::{CrlBuilder, SignedCrl, TbsCertList, extension};
pub use counter::CrlNumberStore;
pub use errors::{CrlError, CrlResult};
pub use generator::{CrlGenerator, CrlReport};
pub use issuer::IssuerIdentity;
pub use types::{RevocationReason, RevocationRecord, SerialNumber};
