//! Blob storage collaborators.
//!
//! The scanning core never talks to storage itself. This module holds the
//! contracts its neighbours use: the queued [`BlobScanRequest`] and the
//! [`MetadataWriter`] that records a verdict on the scanned blob.

mod metadata;
mod request;

pub use metadata::{
    record_verdict, Annotations, InMemoryMetadataWriter, MetadataWriter, ScanMetadata,
    ScanStatus, DEFAULT_ENGINE, DEFAULT_VERSION,
};
pub use request::{BlobLocation, BlobScanRequest};
