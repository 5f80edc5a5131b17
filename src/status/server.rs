use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::protocol::{parse_request, render_error, render_response};
use super::service::StatusService;
use super::{StatusError, StatusResult};

/// Longest a client may take to send its request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP front end of the [`StatusService`].
///
/// Connections are handled one at a time in accept order: read the
/// request, sign the answer, write it and close.
pub struct StatusServer {
    listener: TcpListener,
    service: Arc<StatusService>,
    max_request_bytes: usize,
}

impl StatusServer {
    pub async fn bind(
        addr: &str,
        service: Arc<StatusService>,
        max_request_bytes: usize,
    ) -> StatusResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            max_request_bytes: max_request_bytes.max(1),
        })
    }

    pub fn local_addr(&self) -> StatusResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until Ctrl-C
    pub async fn run(self) -> StatusResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves until `shutdown` completes. The listener is closed on return.
    pub async fn run_until<F>(self, shutdown: F) -> StatusResult<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Status responder listening on {} ({} certificate(s))",
            self.local_addr()?,
            self.service.index().len()
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = self.handle_connection(stream, peer).await {
                            warn!("Request from {} failed: {}", peer, e);
                        }
                    }
                    Err(e) => warn!("Failed to accept connection: {}", e),
                },
            }
        }

        info!("Status responder shutting down");
        Ok(())
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) -> StatusResult<()> {
        // One request line, capped at max_request_bytes
        let mut buf = Vec::new();
        let n = {
            let mut reader = BufReader::new(&mut stream).take(self.max_request_bytes as u64);
            timeout(REQUEST_TIMEOUT, reader.read_until(b'\n', &mut buf))
                .await
                .map_err(|_| StatusError::Timeout)??
        };
        if n == 0 {
            return Ok(());
        }

        let response = if !buf.ends_with(b"\n") && n >= self.max_request_bytes {
            warn!(
                "Request from {} exceeds {} bytes",
                peer, self.max_request_bytes
            );
            render_error("request too long")
        } else {
            match parse_request(&buf) {
                Ok(serial) => {
                    debug!("Status request from {} for serial {}", peer, serial);
                    self.answer(serial).await
                }
                Err(e) => {
                    warn!("Malformed request from {}: {}", peer, e);
                    render_error(&e.to_string())
                }
            }
        };

        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    async fn answer(&self, serial: String) -> String {
        // Signing is blocking and runs off the async worker
        let service = Arc::clone(&self.service);
        match tokio::task::spawn_blocking(move || service.attest(&serial)).await {
            Ok(Ok(attestation)) => {
                info!(
                    "Serial {}: {} (signature {} bytes)",
                    attestation.serial,
                    attestation.status,
                    attestation.signature.len()
                );
                render_response(&attestation)
            }
            Ok(Err(e)) => {
                error!("Failed to attest status: {}", e);
                render_error("status could not be signed")
            }
            Err(e) => {
                error!("Signing task failed: {}", e);
                render_error("internal error")
            }
        }
    }
}
