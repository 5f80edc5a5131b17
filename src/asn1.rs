//! Minimal ASN.1 DER support for building X.509 revocation lists.
//!
//! The encoders in [`der`] produce canonical DER only: definite lengths in
//! their shortest form and minimal integers. [`walker`] is a restricted
//! decoder used to locate structures inside containers such as PKCS#8.

pub mod der;
pub mod oid;
pub mod walker;

pub use der::Tlv;
pub use walker::{DerNode, walk};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),
}
