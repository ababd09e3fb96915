//! # logspool Core
//!
//! The logging entry point: a buffering segment store, a logger facade and
//! a handful of thin sinks.
//!
//! This crate provides:
//! - [`BufferingStore`] - Buffers records and persists them to rotating
//!   segments, flushing urgent records before `log` returns
//! - [`Logger`] - Stamps identity and source location onto records
//! - [`ConsoleSink`], [`SocketSink`], [`FanoutSink`] - Sinks with no
//!   durability of their own
//!
//! ## Usage
//!
//! ```rust
//! use logspool_core::{BufferingStore, Logger, LoggerConfig, StoreConfig};
//! use std::sync::Arc;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let store = Arc::new(BufferingStore::open(StoreConfig::new(temp.path())).unwrap());
//! let log = Logger::new(LoggerConfig::new("com.example.app"), store.clone());
//!
//! log.info("buffered");
//! log.error("on disk before this returns");
//!
//! assert!(store.priority_dir().join("0").exists());
//! ```
//!
//! ## Key Invariants
//!
//! - Logging never fails the caller; write and upload failures are reported
//!   through `tracing`
//! - A record above `Warning` is on disk when `log` returns
//! - A segment is deleted only after the collector accepts it, or when it
//!   falls out of the local retention window without a collector

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod console;
mod error;
mod logger;
mod save;
mod sink;
mod socket;
mod store;

pub use config::{LoggerConfig, StoreConfig};
pub use console::{format_line, ConsoleSink};
pub use error::{CoreError, CoreResult};
pub use logger::Logger;
pub use save::PendingSave;
pub use sink::{FanoutSink, Sink};
pub use socket::{Connection, ConnectionState, Connector, SocketSink, TcpConnector};
pub use store::BufferingStore;
