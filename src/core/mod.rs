//! Core types for the blobscan library.
//!
//! - [`config`] - Validated scanner configuration
//! - [`error`] - Structured error types
//! - [`input`] - Byte stream input and counting wrapper
//! - [`result`] - The scan result envelope
//! - [`types`] - Transport strategies and scan options
//! - [`verdict`] - Normalization of raw backend responses

pub mod config;
pub mod error;
pub mod input;
pub mod result;
pub mod types;
pub mod verdict;

pub use config::{CaCertificate, ScannerConfig};
pub use error::{BlobError, ScanError};
pub use input::{ByteStream, CountingReader};
pub use result::ScanResult;
pub use types::{ScanOptions, ScanStrategy};
pub use verdict::{normalize, EngineCount, Verdict, VerdictProfile};
