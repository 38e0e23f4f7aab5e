//! Basic scan example demonstrating the session lifecycle.
//!
//! This example shows how to:
//! - Configure a scanner session
//! - Stream bytes and scan a local file through one session
//! - Read the result envelope
//!
//! Run with: cargo run --example basic_scan
//!
//! The example uses the in-process mock connector. Set `AMAAS_REGION` and
//! `AMAAS_API_KEY` and drop `with_connector` to talk to a real backend.

use blobscan::prelude::*;
use blobscan::transport::MockConnector;
use std::io::Write;

fn report(label: &str, result: &ScanResult) {
    println!("--- {label} ---");
    match (result.is_clean(), result.error()) {
        (true, _) => println!("CLEAN - no threats detected"),
        (false, None) => println!(
            "INFECTED - {} detection(s)",
            result.malware_count().unwrap_or_default()
        ),
        (false, Some(error)) => println!("ERROR - {error}"),
    }
    println!("Timestamp: {}", result.timestamp());
    println!("Details: {}\n", serde_json::Value::Object(result.details().clone()));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== blobscan Basic Scan Example ===\n");

    let connector = MockConnector::new_clean();
    let config = ScannerConfig::new("us-1", "example-key");
    let mut session = ScannerSession::new(config)?.with_connector(connector.clone());
    session.connect().await?;

    // Streamed bytes (in practice, an uploaded blob)
    let result = session
        .scan_stream(&b"This is the content of a clean file."[..], "document.txt")
        .await?;
    report("document.txt", &result);

    // A local file
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"quarterly numbers")?;
    let result = session.scan_file(file.path()).await?;
    report("local file", &result);

    // A path that does not exist fails without reaching the backend
    let result = session.scan_file("/no/such/file.bin").await?;
    report("missing file", &result);

    session.close().await;

    // Scoped usage releases the handle on every exit path
    println!("=== Scanning an Infected Stream ===\n");

    let session = ScannerSession::new(ScannerConfig::new("us-1", "example-key"))?
        .with_connector(MockConnector::new_infected(1));
    let result = session
        .scoped(|s| Box::pin(async move { s.scan_stream(&b"X5O!P%@AP"[..], "eicar.txt").await }))
        .await??;
    report("eicar.txt", &result);

    println!("Backend calls on first session: {}", connector.scan_count());
    println!("\n=== Example Complete ===");
    Ok(())
}
