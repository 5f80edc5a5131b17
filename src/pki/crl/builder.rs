use chrono::{DateTime, Utc};

use super::errors::CrlResult;
use super::issuer::IssuerIdentity;
use super::types::RevocationRecord;
use crate::asn1::der::{
    bit_string, boolean, enumerated, explicit_tag, generalized_time, implicit_tag, integer,
    object_identifier, octet_string, sequence, unsigned_integer,
};
use crate::asn1::oid::{ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_CRL_NUMBER, ID_CE_CRL_REASONS};
use crate::crypto::{KeyMaterial, SigningProvider, sign_bounded};
use crate::pki::pem::{CRL_LABEL, der_to_pem};

/// Encodes an X.509 Extension: `SEQUENCE { extnID, critical?, extnValue }`
pub fn extension(oid: &str, critical: bool, value_der: &[u8]) -> CrlResult<Vec<u8>> {
    let mut parts = vec![object_identifier(oid)?];
    if critical {
        parts.push(boolean(true));
    }
    parts.push(octet_string(value_der));
    Ok(sequence(parts))
}

/// Assembles `TBSCertList` structures for one issuer
#[derive(Debug, Clone)]
pub struct CrlBuilder<'a> {
    issuer: &'a IssuerIdentity,
    signature_oid: &'a str,
}

impl<'a> CrlBuilder<'a> {
    pub fn new(issuer: &'a IssuerIdentity, signature_oid: &'a str) -> Self {
        Self {
            issuer,
            signature_oid,
        }
    }

    /// AlgorithmIdentifier carrying only the signature OID (no parameters)
    pub fn algorithm_identifier(&self) -> CrlResult<Vec<u8>> {
        Ok(sequence([object_identifier(self.signature_oid)?]))
    }

    pub fn build(
        &self,
        records: &[RevocationRecord],
        this_update: &DateTime<Utc>,
        next_update: &DateTime<Utc>,
        crl_number: u64,
    ) -> CrlResult<TbsCertList> {
        let algorithm_identifier = self.algorithm_identifier()?;

        let mut content = vec![
            algorithm_identifier.clone(),
            self.issuer.distinguished_name_der.clone(),
            generalized_time(this_update),
            generalized_time(next_update),
        ];

        // An empty list is omitted entirely
        if !records.is_empty() {
            let entries = records
                .iter()
                .map(revoked_certificate)
                .collect::<CrlResult<Vec<_>>>()?;
            content.push(sequence(entries));
        }

        content.push(explicit_tag(0, sequence(self.crl_extensions(crl_number)?)));

        Ok(TbsCertList {
            der: sequence(content),
            algorithm_identifier,
            crl_number,
            entry_count: records.len(),
        })
    }

    fn crl_extensions(&self, crl_number: u64) -> CrlResult<Vec<Vec<u8>>> {
        let mut extensions = vec![extension(ID_CE_CRL_NUMBER, false, &integer(crl_number))?];
        if let Some(ski) = &self.issuer.subject_key_identifier {
            let aki = sequence([implicit_tag(0, ski)]);
            extensions.push(extension(ID_CE_AUTHORITY_KEY_IDENTIFIER, false, &aki)?);
        }
        Ok(extensions)
    }
}

fn revoked_certificate(record: &RevocationRecord) -> CrlResult<Vec<u8>> {
    let reason = extension(ID_CE_CRL_REASONS, false, &enumerated(record.reason.code()))?;
    Ok(sequence([
        unsigned_integer(record.serial.as_bytes()),
        generalized_time(&record.revocation_time),
        sequence([reason]),
    ]))
}

/// DER of an unsigned `TBSCertList` and the AlgorithmIdentifier it names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertList {
    der: Vec<u8>,
    algorithm_identifier: Vec<u8>,
    crl_number: u64,
    entry_count: usize,
}

impl TbsCertList {
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn algorithm_identifier(&self) -> &[u8] {
        &self.algorithm_identifier
    }

    pub fn crl_number(&self) -> u64 {
        self.crl_number
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Signs the TBS bytes and wraps them into a `CertificateList`
    pub fn sign(self, provider: &dyn SigningProvider, key: &KeyMaterial) -> CrlResult<SignedCrl> {
        let signature = sign_bounded(provider, &self.der, key)?;
        let der = sequence([
            self.der.as_slice(),
            self.algorithm_identifier.as_slice(),
            bit_string(&signature).as_slice(),
        ]);
        Ok(SignedCrl {
            der,
            crl_number: self.crl_number,
            entry_count: self.entry_count,
            signature_len: signature.len(),
        })
    }
}

/// A complete, signed CRL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCrl {
    der: Vec<u8>,
    crl_number: u64,
    entry_count: usize,
    signature_len: usize,
}

impl SignedCrl {
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn crl_number(&self) -> u64 {
        self.crl_number
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn signature_len(&self) -> usize {
        self.signature_len
    }

    pub fn to_pem(&self) -> String {
        der_to_pem(&self.der, CRL_LABEL)
    }
}
