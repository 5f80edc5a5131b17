use chrono::{DateTime, Utc};
use std::fmt;

/// CRL entry reason codes (RFC 5280 §5.3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RevocationReason {
    Unspecified = 0,
    KeyCompromise = 1,
    CaCompromise = 2,
    AffiliationChanged = 3,
    Superseded = 4,
    CessationOfOperation = 5,
    CertificateHold = 6,
    RemoveFromCrl = 8,
    PrivilegeWithdrawn = 9,
    AaCompromise = 10,
}

impl RevocationReason {
    const ALL: [Self; 10] = [
        Self::Unspecified,
        Self::KeyCompromise,
        Self::CaCompromise,
        Self::AffiliationChanged,
        Self::Superseded,
        Self::CessationOfOperation,
        Self::CertificateHold,
        Self::RemoveFromCrl,
        Self::PrivilegeWithdrawn,
        Self::AaCompromise,
    ];

    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.code() == code)
    }

    /// Maps a ledger label such as `keyCompromise` to a reason.
    ///
    /// Matching ignores ASCII case so that both `cACompromise` and the
    /// `CACompromise` spelling written by OpenSSL are accepted. Unknown
    /// labels map to [`RevocationReason::Unspecified`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|reason| reason.label().eq_ignore_ascii_case(label))
            .unwrap_or(Self::Unspecified)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The RFC 5280 identifier of this reason
    pub fn label(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::KeyCompromise => "keyCompromise",
            Self::CaCompromise => "cACompromise",
            Self::AffiliationChanged => "affiliationChanged",
            Self::Superseded => "superseded",
            Self::CessationOfOperation => "cessationOfOperation",
            Self::CertificateHold => "certificateHold",
            Self::RemoveFromCrl => "removeFromCRL",
            Self::PrivilegeWithdrawn => "privilegeWithdrawn",
            Self::AaCompromise => "aACompromise",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::KeyCompromise => "Key Compromise",
            Self::CaCompromise => "CA Compromise",
            Self::AffiliationChanged => "Affiliation Changed",
            Self::Superseded => "Superseded",
            Self::CessationOfOperation => "Cessation of Operation",
            Self::CertificateHold => "Certificate Hold",
            Self::RemoveFromCrl => "Remove from CRL",
            Self::PrivilegeWithdrawn => "Privilege Withdrawn",
            Self::AaCompromise => "AA Compromise",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Certificate serial number as an unsigned big-endian magnitude without
/// leading zero bytes. Zero is the empty magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        Self(bytes[skip..].to_vec())
    }

    /// Parses the hexadecimal serial notation used by the ledger
    pub fn from_hex(token: &str) -> Result<Self, hex::FromHexError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let bytes = if token.len() % 2 == 1 {
            hex::decode(format!("0{token}"))?
        } else {
            hex::decode(token)?
        };
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u64> for SerialNumber {
    fn from(value: u64) -> Self {
        Self::from_bytes(value.to_be_bytes())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("00");
        }
        f.write_str(&hex::encode_upper(&self.0))
    }
}

/// One revoked certificate taken from the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationRecord {
    pub serial: SerialNumber,
    pub revocation_time: DateTime<Utc>,
    pub reason: RevocationReason,
    pub raw_reason_label: String,
}
