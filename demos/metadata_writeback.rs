//! Recording scan verdicts back onto blobs.
//!
//! This example shows how to:
//! - Build the scan request queued for an uploaded blob
//! - Scan the blob's bytes
//! - Write the verdict as blob metadata and index tags
//!
//! Run with: cargo run --example metadata_writeback

use blobscan::blob::InMemoryMetadataWriter;
use blobscan::prelude::*;
use blobscan::transport::MockConnector;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== blobscan Metadata Write-back Example ===\n");

    // The queue message a blob-created trigger would emit
    let request = BlobScanRequest::new(
        "https://acme.blob.core.windows.net/uploads/2024/invoice.pdf?sv=2024-01-01&sig=redacted",
    )?
    .with_content_type("application/pdf")
    .with_size(9);
    println!("Queued: {}\n", serde_json::to_string_pretty(&request)?);

    let session = ScannerSession::new(ScannerConfig::new("us-1", "example-key"))?
        .with_connector(MockConnector::new_infected(2));

    // In practice the bytes come from downloading `request.blob_url`
    let blob_name = request.blob_name.clone();
    let result = session
        .scoped(|s| Box::pin(async move { s.scan_stream(&b"malicious"[..], &blob_name).await }))
        .await??;

    let writer = InMemoryMetadataWriter::new();
    let location = request.location()?;
    let record = record_verdict(&writer, &location, &result).await?;

    println!("Blob:   {location}");
    println!("Status: {}", record.status.as_str());
    println!("\nMetadata:");
    for (key, value) in writer.metadata(&location).unwrap_or_default() {
        println!("  {key} = {value}");
    }
    println!("\nTags:");
    for (key, value) in writer.tags(&location).unwrap_or_default() {
        println!("  {key} = {value}");
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
