use std::sync::Arc;

use color_eyre::eyre::{bail, eyre};
use pqc_crl::{
    config::Config,
    crypto::{MlDsa87Signer, SigningProvider, self_test},
    pki::CrlGenerator,
    status::{StatusServer, StatusService, load_key, query_status},
    telemetry,
};

const USAGE: &str = "usage: pqc-crl <generate-crl | serve | query <serial> | selftest>";

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let provider: Arc<dyn SigningProvider> = Arc::new(MlDsa87Signer::new());
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["generate-crl"] => {
            let generator = CrlGenerator::new(config.crl, config.signer, provider);
            // Signing is CPU bound and synchronous
            let report = tokio::task::spawn_blocking(move || generator.generate()).await??;
            println!(
                "CRL #{} written to {} ({} revoked, {} bytes DER, next update {})",
                report.crl_number,
                report.output_path.display(),
                report.entries,
                report.der_len,
                report.next_update.format("%Y-%m-%d %H:%M UTC")
            );
        }
        ["serve"] => {
            let service = StatusService::from_config(&config.responder, &config.signer, provider)?;
            let server = StatusServer::bind(
                &config.responder.address(),
                Arc::new(service),
                config.responder.max_request_bytes,
            )
            .await?;
            server.run().await?;
        }
        ["query", serial] => {
            let response = query_status(&config.responder.address(), serial).await?;
            print!("{response}");
        }
        ["selftest"] => {
            let key = load_key(&config.crl.key_path, &config.signer)?;
            let len = self_test(provider.as_ref(), &key)
                .map_err(|e| eyre!("{} self-test failed: {}", provider.name(), e))?;
            println!("{} self-test passed ({} byte signature)", provider.name(), len);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
