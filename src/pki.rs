pub mod crl;
pub mod ledger;
pub mod pem;

// Re-export commonly used types
pub use crl::{CrlError, CrlGenerator, RevocationReason, RevocationRecord};
pub use ledger::{LedgerEntry, LedgerSnapshot, LedgerStatus};
