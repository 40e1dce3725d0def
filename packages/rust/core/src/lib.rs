//! Core ingestion engine for catenate.
//!
//! [`Collector`] loads a template document, then merges the fragments
//! selected from many source files under its insertion point, reading the
//! files concurrently and merging them in input order.

pub mod collector;
pub mod source;

pub use collector::{Collector, MAX_LIMIT, MIN_LIMIT};
pub use source::{DocumentParser, FileSource, FsSource};
