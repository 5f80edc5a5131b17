//! Key material handling and the signing provider seam.

mod errors;
mod keys;
pub mod signer;

pub use errors::{ContainerDiagnostic, KeyExtractionError, OctetStringLocation, SigningError};
pub use keys::{KeyLayout, KeyMaterial, SEED_SEARCH_WINDOW, extract_key_material};
pub use signer::{MlDsa87Signer, PROBE_MESSAGE, SigningProvider, self_test, sign_bounded};

/// SHA-256 digest, used to fingerprint signatures in status responses
pub fn sha256(data: impl AsRef<[u8]>) -> Vec<u8> {
    ring::digest::digest(&ring::digest::SHA256, data.as_ref())
        .as_ref()
        .to_vec()
}
