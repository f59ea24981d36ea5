//! Shared types and utilities for Auditor
//!
//! This crate contains the data structures exchanged with the Auditor service
//! (event records, detail records, the response envelope) and small utilities
//! used by both the client library and the `alog` command.

pub mod protocol;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use protocol::envelope::{Envelope, EnvelopeError};
pub use types::{detail::*, event::*};
