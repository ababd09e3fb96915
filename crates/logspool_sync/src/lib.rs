//! # logspool Sync
//!
//! Upload of closed segments to a remote collector.
//!
//! This crate provides:
//! - [`FileSynchronizer`] - Drains the pending-upload ledger, never
//!   submitting the same segment twice concurrently
//! - [`CollectorUploader`] - POSTs segment bytes from a background thread
//! - [`HttpClient`] seam with a blocking `reqwest` implementation
//! - [`NetworkPolicy`] / [`NetworkMonitor`] - Keeps uploads off metered and
//!   constrained networks
//! - [`RetryConfig`] - Exponential backoff for the periodic retry loop
//!
//! ## Key Invariants
//!
//! - The ledger is the source of truth; in-memory state only tracks what is
//!   in flight
//! - A segment leaves the ledger only after the collector confirms it
//! - Failures are retried on a later pass, never dropped

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod network;
mod synchronizer;
mod uploader;

pub use config::{RetryConfig, UploadConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, ReqwestClient};
pub use network::{AlwaysOnline, NetworkConditions, NetworkMonitor, NetworkPolicy};
pub use synchronizer::{FileSynchronizer, RetryLoop};
pub use uploader::{CollectorUploader, OnComplete, Uploader};
