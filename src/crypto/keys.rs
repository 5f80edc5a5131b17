use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use tracing::debug;

use crate::asn1::der::{TAG_OCTET_STRING, parse_header};
use crate::asn1::walk;
use crate::crypto::errors::{
    ContainerDiagnostic, KeyExtractionError, OctetStringLocation,
};
use crate::pki::pem;

/// How far before the expanded key the seed may start
pub const SEED_SEARCH_WINDOW: usize = 40;

/// OCTET STRINGs longer than this are reported in diagnostics
const LARGE_OCTET_STRING: usize = 100;

/// Sizes of the raw secret key expected by a signing provider.
///
/// Some encoders store the key flat (`key_len` bytes). Others store a seed
/// of `seed_len` bytes followed by the remaining expanded key, and the
/// provider expects their concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    pub key_len: usize,
    pub seed_len: usize,
}

impl KeyLayout {
    /// ML-DSA-87 (FIPS 204): 4896-byte secret key, 32-byte seed
    pub const ML_DSA_87: Self = Self {
        key_len: 4896,
        seed_len: 32,
    };

    pub fn new(key_len: usize, seed_len: usize) -> Result<Self, KeyExtractionError> {
        if key_len == 0 || seed_len == 0 || seed_len >= key_len {
            return Err(KeyExtractionError::Layout(format!(
                "seed length {seed_len} must be non-zero and below key length {key_len}"
            )));
        }
        Ok(Self { key_len, seed_len })
    }

    pub fn expanded_len(&self) -> usize {
        self.key_len - self.seed_len
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::ML_DSA_87
    }
}

/// Raw secret key bytes, held in memory only
pub struct KeyMaterial(SecretSlice<u8>);

impl KeyMaterial {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(SecretSlice::new(data.into().into()))
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Extracts key material from a PEM or DER encoded PKCS#8 container
    pub fn from_container(
        container: &[u8],
        layout: &KeyLayout,
    ) -> Result<Self, KeyExtractionError> {
        let der = pem::decode_if_armored(container)
            .map_err(|e| KeyExtractionError::Container(e.to_string()))?;
        extract_key_material(&der, layout)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {}])", self.len())
    }
}

#[derive(Debug, Clone, Copy)]
struct OctetString<'a> {
    offset: usize,
    end: usize,
    content: &'a [u8],
}

/// Finds the raw secret key inside a DER-encoded PKCS#8 container.
///
/// A flat OCTET STRING of exactly `key_len` bytes wins. Otherwise an
/// OCTET STRING holding the expanded part is paired with the closest
/// seed-sized OCTET STRING that starts at most [`SEED_SEARCH_WINDOW`]
/// bytes before it.
pub fn extract_key_material(
    der: &[u8],
    layout: &KeyLayout,
) -> Result<KeyMaterial, KeyExtractionError> {
    let layout = KeyLayout::new(layout.key_len, layout.seed_len)?;
    let candidates = octet_strings(der);

    if let Some(flat) = candidates
        .iter()
        .find(|os| os.content.len() == layout.key_len)
    {
        debug!(
            "Found {}-byte secret key at DER offset {}",
            layout.key_len, flat.offset
        );
        return Ok(KeyMaterial::new(flat.content));
    }

    let Some(expanded) = candidates
        .iter()
        .find(|os| os.content.len() == layout.expanded_len())
    else {
        return Err(KeyExtractionError::NotFound {
            expected: layout.key_len,
            diagnostic: diagnose(der, &candidates),
        });
    };

    let window_start = expanded.offset.saturating_sub(SEED_SEARCH_WINDOW);
    let seed = candidates.iter().rev().find(|os| {
        os.content.len() == layout.seed_len
            && os.offset >= window_start
            && os.end <= expanded.offset
    });
    let Some(seed) = seed else {
        return Err(KeyExtractionError::SeedNotFound {
            seed_len: layout.seed_len,
            window: SEED_SEARCH_WINDOW,
            expanded_offset: expanded.offset,
            diagnostic: diagnose(der, &candidates),
        });
    };

    let mut key = Vec::with_capacity(layout.key_len);
    key.extend_from_slice(seed.content);
    key.extend_from_slice(expanded.content);
    if key.len() != layout.key_len {
        return Err(KeyExtractionError::LengthMismatch {
            expected: layout.key_len,
            actual: key.len(),
        });
    }

    debug!(
        "Assembled {}-byte secret key from seed at offset {} and expanded key at offset {}",
        key.len(),
        seed.offset,
        expanded.offset
    );
    Ok(KeyMaterial::new(key))
}

/// Lists OCTET STRINGs in document order.
///
/// Well-formed containers are walked structurally. If the walk fails the
/// buffer is scanned for any byte that starts a complete OCTET STRING.
fn octet_strings(der: &[u8]) -> Vec<OctetString<'_>> {
    match walk(der) {
        Ok(nodes) => nodes
            .into_iter()
            .filter(|node| node.is_octet_string())
            .map(|node| OctetString {
                offset: node.offset,
                end: node.end(),
                content: node.content,
            })
            .collect(),
        Err(e) => {
            debug!("Structured walk of key container failed ({e}), scanning raw bytes");
            raw_octet_strings(der)
        }
    }
}

fn raw_octet_strings(der: &[u8]) -> Vec<OctetString<'_>> {
    (0..der.len())
        .filter(|&i| der[i] == TAG_OCTET_STRING)
        .filter_map(|i| {
            let (_, length, value_start) = parse_header(der, i).ok()?;
            Some(OctetString {
                offset: i,
                end: value_start + length,
                content: &der[value_start..value_start + length],
            })
        })
        .collect()
}

fn diagnose(der: &[u8], candidates: &[OctetString<'_>]) -> ContainerDiagnostic {
    let large_octet_strings = candidates
        .iter()
        .filter(|os| os.content.len() > LARGE_OCTET_STRING)
        .map(|os| OctetStringLocation {
            offset: os.offset,
            length: os.content.len(),
        })
        .collect();

    ContainerDiagnostic {
        container_len: der.len(),
        large_octet_strings,
    }
}
