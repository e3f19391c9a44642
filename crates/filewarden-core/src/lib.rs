//! Core types for filewarden.
//!
//! This crate provides the data model shared by the scanning and audit
//! crates: tracked entries, the path-keyed snapshot database, run
//! configuration and errors.

mod config;
mod database;
mod entry;
mod error;

pub use config::{DEFAULT_BUFFER_SIZE, HashAlgorithm, WardenConfig, WardenConfigBuilder};
pub use database::{Database, DatabaseCounts};
pub use entry::{Attributes, ContentHash, Entry, EntryKind, parse_octal_mode};
pub use error::WardenError;
