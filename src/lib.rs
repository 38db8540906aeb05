//! STA Mock - resumable-file-upload protocol simulator
//!
//! Simulates the STA file-transfer API: clients open an upload session
//! ("protocol"), push byte ranges in arbitrary order, query which ranges
//! have been received, and read back content from either the in-progress
//! local session or the S3-compatible durable store once finalized.

pub mod config;
pub mod content_server;
pub mod envelope;
pub mod error;
pub mod http_server;
pub mod logging;
pub mod range_resolver;
pub mod range_set;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod store;

pub use error::{Result, StaError};
