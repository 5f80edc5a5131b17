use std::fmt;

use thiserror::Error;

/// Position and declared length of an OCTET STRING inside a key container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctetStringLocation {
    pub offset: usize,
    pub length: usize,
}

impl fmt::Display for OctetStringLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.length, self.offset)
    }
}

/// What the extractor saw in a container it could not use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDiagnostic {
    pub container_len: usize,
    pub large_octet_strings: Vec<OctetStringLocation>,
}

impl fmt::Display for ContainerDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DER length {} bytes, large OCTET STRINGs (length@offset): [",
            self.container_len
        )?;
        for (i, location) in self.large_octet_strings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{location}")?;
        }
        f.write_str("]")
    }
}

/// Errors raised while locating raw key material in a PKCS#8 container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyExtractionError {
    #[error("Failed to decode key container: {0}")]
    Container(String),

    #[error("Invalid key layout: {0}")]
    Layout(String),

    #[error("No {expected}-byte secret key found ({diagnostic})")]
    NotFound {
        expected: usize,
        diagnostic: ContainerDiagnostic,
    },

    #[error(
        "Expanded key at offset {expanded_offset} has no {seed_len}-byte seed in the preceding {window} bytes ({diagnostic})"
    )]
    SeedNotFound {
        seed_len: usize,
        window: usize,
        expanded_offset: usize,
        diagnostic: ContainerDiagnostic,
    },

    #[error("Assembled key is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl KeyExtractionError {
    /// Scan details for failures caused by the container layout
    pub fn diagnostic(&self) -> Option<&ContainerDiagnostic> {
        match self {
            Self::NotFound { diagnostic, .. } | Self::SeedNotFound { diagnostic, .. } => {
                Some(diagnostic)
            }
            _ => None,
        }
    }
}

/// Errors returned by a signing provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("Key material is {actual} bytes, provider expects {expected}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Signing provider failed with code {code}: {message}")]
    Provider { code: i32, message: String },

    #[error("Signature of {actual} bytes exceeds the {max}-byte maximum")]
    SignatureTooLong { max: usize, actual: usize },
}
