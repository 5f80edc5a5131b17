mod common;

use std::sync::Arc;

use common::{CaFixture, failing_signer, fixed_signer};
use pqc_crl::status::{
    CertificateStatus, StatusError, StatusServer, StatusService, query_status,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

const LEDGER: &str = "\
V\t270101000000Z\t\t1005\tunknown\t/CN=good.example
R\t270101000000Z\t250101000000Z,keyCompromise\t1000\tunknown\t/CN=revoked.example
E\t240101000000Z\t\t1002\tunknown\t/CN=expired.example
";

// Helper function to spawn a responder on a random port
async fn spawn_responder(
    service: StatusService,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let server = StatusServer::bind("127.0.0.1:0", Arc::new(service), 1024)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        server
            .run_until(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("failed to run responder");
    });

    (addr, shutdown_tx, handle)
}

fn service(fixture: &CaFixture) -> StatusService {
    StatusService::from_config(
        &fixture.responder,
        &fixture.signer,
        Arc::new(fixed_signer(4627)),
    )
    .unwrap()
}

#[test]
fn test_lookup_statuses() {
    let fixture = CaFixture::new(LEDGER);
    let service = service(&fixture);

    assert_eq!(service.attest("1005").unwrap().status, CertificateStatus::Good);
    assert!(matches!(
        service.attest("1000").unwrap().status,
        CertificateStatus::Revoked(_)
    ));
    assert_eq!(service.attest("1002").unwrap().status, CertificateStatus::Unknown);
    assert_eq!(service.attest("FFFF").unwrap().status, CertificateStatus::Unknown);
}

#[test]
fn test_missing_ledger_is_configuration_error() {
    let fixture = CaFixture::new(LEDGER);
    std::fs::remove_file(&fixture.responder.ledger_path).unwrap();

    let result = StatusService::from_config(
        &fixture.responder,
        &fixture.signer,
        Arc::new(fixed_signer(4627)),
    );
    assert!(matches!(result, Err(StatusError::Configuration(_))));
}

#[tokio::test]
async fn test_query_round_trip() {
    let fixture = CaFixture::new(LEDGER);
    let (addr, shutdown, handle) = spawn_responder(service(&fixture)).await;

    let revoked = query_status(&addr, "1000").await.unwrap();
    assert!(revoked.contains("Serial:     1000\n"));
    assert!(revoked.contains("Status:     REVOKED (Key Compromise)\n"));
    assert!(revoked.contains("Message:    CERTSTATUS|1000|REVOKED|keyCompromise|"));
    assert!(revoked.contains("Signed:     ML-DSA-87 (4627 bytes)\n"));
    assert!(revoked.contains(&format!("Signature:  {}...\n", "42".repeat(32))));

    // Connections are served one after another
    let good = query_status(&addr, "1005").await.unwrap();
    assert!(good.contains("Status:     GOOD\n"));
    let unknown = query_status(&addr, "ABCD").await.unwrap();
    assert!(unknown.contains("Status:     UNKNOWN\n"));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
    assert!(TcpStream::connect(&addr).await.is_err());
}

#[tokio::test]
async fn test_malformed_request_gets_error_block() {
    let fixture = CaFixture::new(LEDGER);
    let (addr, shutdown, handle) = spawn_responder(service(&fixture)).await;

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.contains("\nERROR\n"));
    assert!(!response.contains("Signature:"));

    // The responder keeps serving after a bad request
    let good = query_status(&addr, "1005").await.unwrap();
    assert!(good.contains("Status:     GOOD\n"));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_signing_failure_is_reported_without_signature() {
    let fixture = CaFixture::new(LEDGER);
    let service = StatusService::from_config(
        &fixture.responder,
        &fixture.signer,
        Arc::new(failing_signer()),
    )
    .unwrap();
    let (addr, shutdown, handle) = spawn_responder(service).await;

    let response = query_status(&addr, "1005").await.unwrap();
    assert!(response.contains("\nERROR\n"));
    assert!(!response.contains("Status:"));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_request_split_across_writes_is_reassembled() {
    let fixture = CaFixture::new(LEDGER);
    let (addr, shutdown, handle) = spawn_responder(service(&fixture)).await;

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    stream.write_all(b"serial=10").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    stream.write_all(b"00\n").await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.contains("Serial:     1000\n"));
    assert!(response.contains("Status:     REVOKED (Key Compromise)\n"));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_oversized_request_is_refused() {
    let fixture = CaFixture::new(LEDGER);
    let (addr, shutdown, handle) = spawn_responder(service(&fixture)).await;

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    let request = format!("serial=1000{}\n", "0".repeat(1100));
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.contains("\nERROR\n"));
    assert!(response.contains("request too long"));
    assert!(!response.contains("Signature:"));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}
