//! Object identifiers used when issuing revocation lists.

// Signature algorithms (NIST CSOR, FIPS 204)
pub const ID_ML_DSA_87: &str = "2.16.840.1.101.3.4.3.19";

// Certificate and CRL extensions (RFC 5280 §4.2 and §5.2)
pub const ID_CE_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
pub const ID_CE_CRL_NUMBER: &str = "2.5.29.20";
pub const ID_CE_CRL_REASONS: &str = "2.5.29.21";
pub const ID_CE_AUTHORITY_KEY_IDENTIFIER: &str = "2.5.29.35";

// Attribute types
pub const ID_AT_COMMON_NAME: &str = "2.5.4.3";
