//! Shared error model and settings for catenate.
//!
//! This crate is the foundation depended on by all other catenate crates.
//! It provides:
//! - [`CatenateError`], the unified error type
//! - [`Settings`], layered run configuration, and [`options_summary`]

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    DEFAULT_IMPORT_SOURCE, DEFAULT_NAMESPACE, DEFAULT_OPEN_LIMIT, DEFAULT_TARGET_PARENT, Settings,
    options_summary,
};
pub use error::{CatenateError, Result};
