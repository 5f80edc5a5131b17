//! PEM armor helpers.

use ::pem::{EncodeConfig, LineEnding, Pem, PemError};

pub const CRL_LABEL: &str = "X509 CRL";

/// Convert DER-encoded data into a PEM-encoded string with the provided label.
///
/// Lines are LF-terminated and the base64 body wraps at 64 columns.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = Pem::new(label, der);
    ::pem::encode_config(&pem, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Convert a PEM-encoded string to DER-encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>, PemError> {
    let pem = ::pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(PemError::MismatchedTags(
            expected_label.to_string(),
            pem.tag().to_string(),
        ));
    }
    Ok(pem.contents().to_vec())
}

/// Returns the DER content of `data`, unwrapping PEM armor when present
pub fn decode_if_armored(data: &[u8]) -> Result<Vec<u8>, PemError> {
    if is_armored(data) {
        Ok(::pem::parse(data)?.contents().to_vec())
    } else {
        Ok(data.to_vec())
    }
}

fn is_armored(data: &[u8]) -> bool {
    const BEGIN: &[u8] = b"-----BEGIN ";
    data.windows(BEGIN.len()).any(|w| w == BEGIN)
}
