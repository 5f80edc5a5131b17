use pqcrypto_mldsa::mldsa87;
use pqcrypto_traits::sign::{DetachedSignature as _, SecretKey as _};
use tracing::debug;

use super::errors::SigningError;
use super::keys::KeyMaterial;

/// A signature primitive that signs a message with raw key material.
///
/// Calls are synchronous and are not cancelled or retried by callers.
#[cfg_attr(test, mockall::automock)]
pub trait SigningProvider: Send + Sync {
    /// Human readable algorithm name
    fn name(&self) -> String;

    /// Largest signature this provider can return
    fn max_signature_len(&self) -> usize;

    fn sign(&self, message: &[u8], key: &KeyMaterial) -> Result<Vec<u8>, SigningError>;
}

/// Signs `message` and rejects signatures longer than the provider's maximum
pub fn sign_bounded(
    provider: &dyn SigningProvider,
    message: &[u8],
    key: &KeyMaterial,
) -> Result<Vec<u8>, SigningError> {
    let max = provider.max_signature_len();
    let signature = provider.sign(message, key)?;
    if signature.len() > max {
        return Err(SigningError::SignatureTooLong {
            max,
            actual: signature.len(),
        });
    }
    debug!(
        "{} produced a {}-byte signature over {} bytes",
        provider.name(),
        signature.len(),
        message.len()
    );
    Ok(signature)
}

/// Message signed by [`self_test`]
pub const PROBE_MESSAGE: &[u8] = b"signing provider self-test";

/// Signs [`PROBE_MESSAGE`] to confirm that `key` is usable with `provider`.
/// Returns the signature length.
pub fn self_test(provider: &dyn SigningProvider, key: &KeyMaterial) -> Result<usize, SigningError> {
    let signature = sign_bounded(provider, PROBE_MESSAGE, key)?;
    if signature.is_empty() {
        return Err(SigningError::Provider {
            code: 0,
            message: "empty signature".to_string(),
        });
    }
    Ok(signature.len())
}

/// ML-DSA-87 (FIPS 204) signatures through `pqcrypto-mldsa`
#[derive(Debug, Clone, Copy, Default)]
pub struct MlDsa87Signer;

impl MlDsa87Signer {
    pub fn new() -> Self {
        Self
    }
}

impl SigningProvider for MlDsa87Signer {
    fn name(&self) -> String {
        "ML-DSA-87".to_string()
    }

    fn max_signature_len(&self) -> usize {
        mldsa87::signature_bytes()
    }

    fn sign(&self, message: &[u8], key: &KeyMaterial) -> Result<Vec<u8>, SigningError> {
        let expected = mldsa87::secret_key_bytes();
        if key.len() != expected {
            return Err(SigningError::InvalidKeyLength {
                expected,
                actual: key.len(),
            });
        }

        let secret_key =
            mldsa87::SecretKey::from_bytes(key.expose_secret()).map_err(|e| {
                SigningError::Provider {
                    code: -1,
                    message: format!("{e:?}"),
                }
            })?;
        let signature = mldsa87::detached_sign(message, &secret_key);
        Ok(signature.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqcrypto_traits::sign::{DetachedSignature as _, SecretKey as _};

    #[test]
    fn test_mldsa87_sizes() {
        let signer = MlDsa87Signer::new();
        assert_eq!(signer.max_signature_len(), 4627);
        assert_eq!(mldsa87::secret_key_bytes(), 4896);
    }

    #[test]
    fn test_mldsa87_signature_verifies() {
        let (pk, sk) = mldsa87::keypair();
        let key = KeyMaterial::new(sk.as_bytes());
        let message = b"status probe";

        let signer = MlDsa87Signer::new();
        let signature = sign_bounded(&signer, message, &key).unwrap();
        assert!(signature.len() <= signer.max_signature_len());

        let detached = mldsa87::DetachedSignature::from_bytes(&signature).unwrap();
        assert!(mldsa87::verify_detached_signature(&detached, message, &pk).is_ok());
    }

    #[test]
    fn test_mldsa87_rejects_wrong_key_length() {
        let signer = MlDsa87Signer::new();
        let err = signer
            .sign(b"message", &KeyMaterial::new(vec![0u8; 4864]))
            .unwrap_err();
        assert_eq!(
            err,
            SigningError::InvalidKeyLength {
                expected: 4896,
                actual: 4864
            }
        );
    }

    #[test]
    fn test_sign_bounded_rejects_oversized_signature() {
        let mut provider = MockSigningProvider::new();
        provider.expect_max_signature_len().return_const(4usize);
        provider
            .expect_sign()
            .returning(|_, _| Ok(vec![0u8; 5]));
        provider
            .expect_name()
            .return_const("mock".to_string());

        let err = sign_bounded(&provider, b"m", &KeyMaterial::new(vec![1])).unwrap_err();
        assert_eq!(err, SigningError::SignatureTooLong { max: 4, actual: 5 });
    }

    #[test]
    fn test_self_test_signs_probe() {
        let mut provider = MockSigningProvider::new();
        provider.expect_max_signature_len().return_const(4627usize);
        provider.expect_name().return_const("mock".to_string());
        provider
            .expect_sign()
            .withf(|message, _| message == PROBE_MESSAGE)
            .times(1)
            .returning(|_, _| Ok(vec![7u8; 4627]));

        assert_eq!(self_test(&provider, &KeyMaterial::new(vec![1])).unwrap(), 4627);
    }

    #[test]
    fn test_self_test_rejects_empty_signature() {
        let mut provider = MockSigningProvider::new();
        provider.expect_max_signature_len().return_const(4627usize);
        provider.expect_name().return_const("mock".to_string());
        provider.expect_sign().returning(|_, _| Ok(Vec::new()));

        assert!(self_test(&provider, &KeyMaterial::new(vec![1])).is_err());
    }

    #[test]
    fn test_sign_bounded_passes_provider_errors_through() {
        let mut provider = MockSigningProvider::new();
        provider.expect_max_signature_len().return_const(4627usize);
        provider.expect_sign().returning(|_, _| {
            Err(SigningError::Provider {
                code: 3,
                message: "internal failure".into(),
            })
        });

        let err = sign_bounded(&provider, b"m", &KeyMaterial::new(vec![1])).unwrap_err();
        assert!(matches!(err, SigningError::Provider { code: 3, .. }));
    }
}
