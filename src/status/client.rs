use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::protocol::format_request;
use super::{StatusError, StatusResult};

/// Largest response accepted from a responder
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

/// Sends one status query and returns the responder's text block
pub async fn query_status(addr: &str, serial: &str) -> StatusResult<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(format_request(serial).as_bytes()).await?;

    let mut response = String::new();
    timeout(
        std::time::Duration::from_secs(30),
        (&mut stream)
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut response),
    )
    .await
    .map_err(|_| StatusError::Timeout)??;
    Ok(response)
}
