use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use tracing::{debug, info, warn};

use super::builder::{CrlBuilder, SignedCrl};
use super::counter::{CrlNumberStore, replace, temp_path, write_synced};
use super::errors::{CrlError, CrlResult};
use super::issuer::IssuerIdentity;
use crate::config::{CrlConfig, SignerConfig};
use crate::crypto::{KeyMaterial, SigningError, SigningProvider};
use crate::pki::ledger::LedgerSnapshot;
use crate::pki::pem::{CRL_LABEL, pem_to_der};

/// Outcome of a successful CRL generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlReport {
    pub crl_number: u64,
    pub next_crl_number: u64,
    /// Revoked certificates listed in the CRL
    pub entries: usize,
    /// Ledger lines that could not be used
    pub skipped_lines: usize,
    pub der_len: usize,
    pub output_path: PathBuf,
    pub this_update: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

/// Produces signed CRLs from the ledger, the issuer certificate and its key
pub struct CrlGenerator {
    config: CrlConfig,
    signer: SignerConfig,
    provider: Arc<dyn SigningProvider>,
}

impl CrlGenerator {
    pub fn new(config: CrlConfig, signer: SignerConfig, provider: Arc<dyn SigningProvider>) -> Self {
        Self {
            config,
            signer,
            provider,
        }
    }

    pub fn generate(&self) -> CrlResult<CrlReport> {
        self.generate_at(Utc::now())
    }

    /// Builds, signs and writes a CRL with `now` as its thisUpdate.
    ///
    /// The CRL number is advanced only after the artifact has been written
    /// and verified. A failure before that point leaves the counter and
    /// the previous CRL untouched.
    pub fn generate_at(&self, now: DateTime<Utc>) -> CrlResult<CrlReport> {
        self.check_inputs()?;
        let layout = self.signer.key_layout()?;

        let snapshot = LedgerSnapshot::read(&self.config.ledger_path)?;
        for record in &snapshot.records {
            info!(
                "Revoked serial {} ({}) at {}",
                record.serial,
                record.reason.description(),
                record.revocation_time.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        if snapshot.skipped > 0 {
            warn!("{} ledger line(s) skipped", snapshot.skipped);
        }

        let store = CrlNumberStore::new(&self.config.crl_number_path);
        let crl_number = store.read()?;

        let container = fs::read(&self.config.key_path)
            .map_err(|e| CrlError::io("read private key", &self.config.key_path, e))?;
        let key = KeyMaterial::from_container(&container, &layout)?;
        debug!("Extracted {}-byte signing key", key.len());

        let issuer = IssuerIdentity::load(&self.config.issuer_cert_path)?;

        let this_update = truncate_to_minute(now);
        let next_update = TimeDelta::try_days(i64::from(self.config.validity_days))
            .and_then(|validity| this_update.checked_add_signed(validity))
            .ok_or_else(|| {
                CrlError::Configuration(format!(
                    "validity of {} days is out of range",
                    self.config.validity_days
                ))
            })?;

        let tbs = CrlBuilder::new(&issuer, &self.signer.signature_oid).build(
            &snapshot.records,
            &this_update,
            &next_update,
            crl_number,
        )?;
        let crl = tbs.sign(self.provider.as_ref(), &key)?;
        if crl.signature_len() > self.signer.max_signature_len {
            return Err(SigningError::SignatureTooLong {
                max: self.signer.max_signature_len,
                actual: crl.signature_len(),
            }
            .into());
        }

        let output = &self.config.output_path;
        let staged = temp_path(output);
        if let Err(e) = stage_artifact(&staged, &crl).and_then(|_| store.advance(crl_number)) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
        replace(&staged, output)?;

        info!(
            "Wrote CRL #{} with {} entr{} to {} ({} bytes DER, next update {})",
            crl_number,
            crl.entry_count(),
            if crl.entry_count() == 1 { "y" } else { "ies" },
            output.display(),
            crl.as_der().len(),
            next_update.format("%Y-%m-%d %H:%M UTC")
        );

        Ok(CrlReport {
            crl_number,
            next_crl_number: crl_number + 1,
            entries: crl.entry_count(),
            skipped_lines: snapshot.skipped,
            der_len: crl.as_der().len(),
            output_path: output.clone(),
            this_update,
            next_update,
        })
    }

    fn check_inputs(&self) -> CrlResult<()> {
        let required = [
            ("ledger", &self.config.ledger_path),
            ("issuer certificate", &self.config.issuer_cert_path),
            ("private key", &self.config.key_path),
        ];
        for (what, path) in required {
            if !path.exists() {
                return Err(CrlError::Configuration(format!(
                    "{what} not found at {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn truncate_to_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Writes the PEM artifact and reads it back to confirm the armor
fn stage_artifact(path: &Path, crl: &SignedCrl) -> CrlResult<()> {
    write_synced(path, crl.to_pem().as_bytes())?;

    let written =
        fs::read_to_string(path).map_err(|e| CrlError::io("read back CRL", path, e))?;
    let der = pem_to_der(&written, CRL_LABEL).map_err(|e| CrlError::Artifact(e.to_string()))?;
    if der != crl.as_der() {
        return Err(CrlError::Artifact(format!(
            "{} does not contain the signed CRL",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_to_minute() {
        let time = Utc
            .with_ymd_and_hms(2025, 6, 1, 12, 34, 56)
            .unwrap()
            .with_nanosecond(789)
            .unwrap();
        assert_eq!(
            truncate_to_minute(time),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 34, 0).unwrap()
        );
    }
}
