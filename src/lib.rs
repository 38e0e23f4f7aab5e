//! # blobscan
//!
//! Anti-malware scan orchestration for uploaded blobs, with verdict
//! normalization and compliance-ready audit logging.
//!
//! ## Overview
//!
//! blobscan sits between a storage pipeline and a remote, region-scoped
//! scanning backend. It lets you:
//!
//! - Open a scanner session once and reuse it for many scans
//! - Scan by multipart upload, by streaming bytes, or by local file path
//! - Turn heterogeneous backend responses into one clean/unclean verdict
//! - Record verdicts back onto the scanned blob as metadata and tags
//! - Emit structured audit events for every session and scan
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blobscan::{ScannerConfig, ScannerSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScannerConfig::from_env()?;
//!     let mut session = ScannerSession::open(config).await?;
//!
//!     let result = session.scan_file("/tmp/upload.bin").await?;
//!     if result.is_clean() {
//!         println!("File is clean!");
//!     } else if let Some(error) = result.error() {
//!         println!("Scan failed: {error}");
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the command-line binary
//! - `cli` - The `blobscan` binary (clap, anyhow, tracing-subscriber)
//!
//! ## Architecture
//!
//! - **Core**: Configuration, errors, the result envelope and the verdict
//!   normalizer
//! - **Transport**: The multipart uploader and the session channel
//! - **Session**: Handle lifecycle and scan dispatch
//! - **Blob**: Scan requests and verdict write-back for storage collaborators
//! - **Audit**: Structured logging for compliance

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod blob;
pub mod core;
pub mod session;
pub mod transport;

// Re-export commonly used types at the crate root
pub use crate::core::{
    BlobError, CaCertificate, ScanError, ScanOptions, ScanResult, ScanStrategy, ScannerConfig,
    Verdict,
};
pub use crate::session::ScannerSession;

/// Prelude module for convenient imports.
///
/// ```rust
/// use blobscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::blob::{
        record_verdict, BlobLocation, BlobScanRequest, MetadataWriter, ScanMetadata, ScanStatus,
    };
    pub use crate::core::{
        BlobError, CaCertificate, ScanError, ScanOptions, ScanResult, ScanStrategy, ScannerConfig,
        Verdict,
    };
    pub use crate::session::ScannerSession;
    pub use crate::transport::{Connector, ScanChannel};
}
