//! Text framing of the status protocol.
//!
//! A request is a single UTF-8 line `serial=<token>`. The response is a
//! block of `Key: value` lines between a header and a footer rule. Only
//! the first 64 hex digits of the signature and 32 of its SHA-256 digest
//! are shown.

use std::fmt::Write as _;

use thiserror::Error;

use super::service::StatusAttestation;
use crate::asn1::der::GENERALIZED_TIME_FORMAT;
use crate::crypto::sha256;

pub const REQUEST_PREFIX: &str = "serial=";

const SIGNATURE_PREVIEW: usize = 64;
const DIGEST_PREVIEW: usize = 32;
const RULE: &str = "================================================================";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request is not valid UTF-8")]
    NotUtf8,

    #[error("expected `serial=<token>`")]
    Malformed,

    #[error("invalid serial token {0:?}")]
    InvalidSerial(String),
}

pub fn format_request(serial: &str) -> String {
    format!("{REQUEST_PREFIX}{serial}\n")
}

/// Extracts the serial token from a raw request
pub fn parse_request(raw: &[u8]) -> Result<String, RequestError> {
    let text = std::str::from_utf8(raw).map_err(|_| RequestError::NotUtf8)?;
    let token = text
        .trim()
        .strip_prefix(REQUEST_PREFIX)
        .ok_or(RequestError::Malformed)?
        .trim();

    // `|` separates fields of the signed message
    let valid = !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic() && c != '|');
    if !valid {
        return Err(RequestError::InvalidSerial(token.to_string()));
    }
    Ok(token.to_string())
}

pub fn render_response(attestation: &StatusAttestation) -> String {
    let signature_hex = hex::encode(&attestation.signature);
    let digest_hex = hex::encode(sha256(&attestation.signature));

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "CERTIFICATE STATUS RESPONSE ({})", attestation.algorithm);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Serial:     {}", attestation.serial);
    let _ = writeln!(out, "Status:     {}", attestation.status);
    let _ = writeln!(
        out,
        "Timestamp:  {}",
        attestation.timestamp.format(GENERALIZED_TIME_FORMAT)
    );
    let _ = writeln!(out, "Message:    {}", attestation.message);
    let _ = writeln!(
        out,
        "Signed:     {} ({} bytes)",
        attestation.algorithm,
        attestation.signature.len()
    );
    let _ = writeln!(out, "Signature:  {}...", preview(&signature_hex, SIGNATURE_PREVIEW));
    let _ = writeln!(out, "Hash:       {}...", preview(&digest_hex, DIGEST_PREVIEW));
    let _ = writeln!(out, "{RULE}");
    out
}

/// Unsigned error block
pub fn render_error(message: &str) -> String {
    format!("{RULE}\nERROR\n{RULE}\nReason:     {message}\n{RULE}\n")
}

fn preview(hex: &str, len: usize) -> &str {
    &hex[..hex.len().min(len)]
}
