#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use pqc_crl::{
    asn1::{
        der::{
            bit_string, explicit_tag, generalized_time, integer, object_identifier, octet_string,
            sequence, set, utf8_string,
        },
        oid::{ID_AT_COMMON_NAME, ID_CE_SUBJECT_KEY_IDENTIFIER, ID_ML_DSA_87},
    },
    config::{CrlConfig, ResponderConfig, SignerConfig},
    crypto::{KeyMaterial, SigningError, SigningProvider},
    pki::pem::der_to_pem,
};
use tempfile::TempDir;

pub const ISSUER_CN: &str = "Test Intermediate CA";
pub const SKI: [u8; 20] = [
    0x3A, 0x11, 0x5C, 0x02, 0x9E, 0x41, 0x77, 0x0B, 0xC8, 0x19, 0x6D, 0xE2, 0x05, 0x4F, 0xA0,
    0x8B, 0x13, 0x72, 0xD4, 0x66,
];

// Mock implementation of SigningProvider for testing
mockall::mock! {
    pub Signer {}

    impl SigningProvider for Signer {
        fn name(&self) -> String;
        fn max_signature_len(&self) -> usize;
        fn sign(&self, message: &[u8], key: &KeyMaterial) -> Result<Vec<u8>, SigningError>;
    }
}

/// A signer returning a fixed-size signature
pub fn fixed_signer(len: usize) -> MockSigner {
    let mut signer = MockSigner::new();
    signer.expect_name().return_const("ML-DSA-87".to_string());
    signer.expect_max_signature_len().return_const(4627usize);
    signer
        .expect_sign()
        .returning(move |_, _| Ok(vec![0x42; len]));
    signer
}

pub fn failing_signer() -> MockSigner {
    let mut signer = MockSigner::new();
    signer.expect_name().return_const("ML-DSA-87".to_string());
    signer.expect_max_signature_len().return_const(4627usize);
    signer.expect_sign().returning(|_, _| {
        Err(SigningError::Provider {
            code: -2,
            message: "provider unavailable".to_string(),
        })
    });
    signer
}

/// `SEQUENCE { SET { SEQUENCE { commonName, UTF8String } } }`
pub fn name(common_name: &str) -> Vec<u8> {
    let attribute = sequence([
        object_identifier(ID_AT_COMMON_NAME).unwrap(),
        utf8_string(common_name),
    ]);
    sequence([set([attribute])])
}

/// A minimal v3 certificate for the issuing CA
pub fn issuer_certificate(ski: Option<&[u8]>) -> Vec<u8> {
    let algorithm = sequence([object_identifier(ID_ML_DSA_87).unwrap()]);
    let not_before = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let not_after = Utc.with_ymd_and_hms(2034, 1, 1, 0, 0, 0).unwrap();

    let mut tbs = vec![
        explicit_tag(0, integer(2)),
        integer(0x0100),
        algorithm.clone(),
        name("Test Root CA"),
        sequence([generalized_time(&not_before), generalized_time(&not_after)]),
        name(ISSUER_CN),
        sequence([algorithm.clone(), bit_string([0x55u8; 64])]),
    ];
    if let Some(ski) = ski {
        let extension = sequence([
            object_identifier(ID_CE_SUBJECT_KEY_IDENTIFIER).unwrap(),
            octet_string(octet_string(ski)),
        ]);
        tbs.push(explicit_tag(3, sequence([extension])));
    }

    sequence([sequence(tbs), algorithm, bit_string([0x66u8; 64])])
}

/// PKCS#8 `OneAsymmetricKey` holding the raw key as one OCTET STRING
pub fn pkcs8_flat(key: &[u8]) -> Vec<u8> {
    sequence([
        integer(0),
        sequence([object_identifier(ID_ML_DSA_87).unwrap()]),
        octet_string(octet_string(key)),
    ])
}

/// PKCS#8 container storing the key as a seed followed by the expanded part
pub fn pkcs8_seed_expanded(key: &[u8], seed_len: usize) -> Vec<u8> {
    let (seed, expanded) = key.split_at(seed_len);
    sequence([
        integer(0),
        sequence([object_identifier(ID_ML_DSA_87).unwrap()]),
        octet_string(sequence([octet_string(seed), octet_string(expanded)])),
    ])
}

/// Deterministic stand-in for a 4896-byte secret key
pub fn fake_key() -> Vec<u8> {
    (0..4896u32).map(|i| (i % 251) as u8 | 0x80).collect()
}

pub fn signer_config() -> SignerConfig {
    SignerConfig {
        key_len: 4896,
        seed_len: 32,
        max_signature_len: 4627,
        signature_oid: ID_ML_DSA_87.to_string(),
    }
}

/// Issuer certificate, key and ledger laid out in a temporary directory
pub struct CaFixture {
    pub dir: TempDir,
    pub crl: CrlConfig,
    pub responder: ResponderConfig,
    pub signer: SignerConfig,
}

impl CaFixture {
    pub fn new(ledger: &str) -> Self {
        Self::with_key(ledger, &pkcs8_flat(&fake_key()), Some(&SKI))
    }

    pub fn with_key(ledger: &str, key_container: &[u8], ski: Option<&[u8]>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("certs")).unwrap();
        std::fs::create_dir_all(root.join("private")).unwrap();

        let cert = der_to_pem(&issuer_certificate(ski), "CERTIFICATE");
        std::fs::write(root.join("certs/intermediate_ca.crt"), cert).unwrap();
        let key = der_to_pem(key_container, "PRIVATE KEY");
        std::fs::write(root.join("private/intermediate_ca.key"), key).unwrap();
        std::fs::write(root.join("index.txt"), ledger).unwrap();

        let crl = CrlConfig {
            ledger_path: root.join("index.txt"),
            issuer_cert_path: root.join("certs/intermediate_ca.crt"),
            key_path: root.join("private/intermediate_ca.key"),
            output_path: root.join("intermediate.crl.pem"),
            crl_number_path: root.join("crlnumber"),
            validity_days: 30,
        };
        let responder = ResponderConfig {
            host: "127.0.0.1".to_string(),
            // Use a random OS port
            port: 0,
            ledger_path: root.join("index.txt"),
            key_path: root.join("private/intermediate_ca.key"),
            max_request_bytes: 1024,
        };

        Self {
            dir,
            crl,
            responder,
            signer: signer_config(),
        }
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn read_counter(&self) -> Option<String> {
        std::fs::read_to_string(&self.crl.crl_number_path).ok()
    }
}
