//! # logspool Testkit
//!
//! Test utilities shared by the logspool crates.
//!
//! This crate provides:
//! - Record fixtures with deterministic content
//! - Property-based test generators using proptest
//! - A one-call `tracing` subscriber for test output
//!
//! ## Usage
//!
//! ```rust
//! use logspool_testkit::prelude::*;
//!
//! init_tracing();
//! let records = sample_records(3);
//! assert_eq!(records[2].message, "sample record 2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
