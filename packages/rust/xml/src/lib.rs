//! XML parsing, path selection, and serialization for catenate.
//!
//! Documents live in an `xee-xpath` [`Documents`] store backed by a single
//! `xot` arena, so nodes selected from one document can be cloned into
//! another held by the same store.
//!
//! - [`parse`]: text to a document in the store
//! - [`PathSelector`]: XPath with an optional `kml` namespace binding
//! - [`to_string`]: document to text

pub mod parser;
pub mod select;
pub mod serializer;

pub use parser::parse;
pub use select::{NAMESPACE_PREFIX, PathSelector};
pub use serializer::to_string;
pub use xee_xpath::{DocumentHandle, Documents};
pub use xot::{Node, Xot};
