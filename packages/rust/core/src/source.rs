//! Pluggable seams of the collector: where bytes come from and how text
//! becomes a tree.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use catenate_shared::{CatenateError, Result};
use catenate_xml::{DocumentHandle, Documents};

/// Asynchronous byte source for template and input files.
///
/// Reads run on worker tasks, so implementations must be shareable across
/// threads and their futures must be `Send`.
pub trait FileSource: Send + Sync + 'static {
    /// Read the whole file at `path`.
    fn read(&self, path: &Path) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads files from the local filesystem with `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl FileSource for FsSource {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| CatenateError::io(path, e))
    }
}

/// Read through `source`, failing with [`CatenateError::Timeout`] when a
/// timeout is set and exceeded.
pub(crate) async fn read_with_timeout<S: FileSource>(
    source: &S,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, source.read(path))
            .await
            .map_err(|_| CatenateError::Timeout {
                path: path.to_path_buf(),
                timeout: limit,
            })?,
        None => source.read(path).await,
    }
}

/// Text-to-tree parser used for the template and every source document.
///
/// Parsed documents go into the collector's store so their nodes can be
/// cloned into the target. Implemented for any
/// `Fn(&mut Documents, &str) -> Result<DocumentHandle>`, so a closure or a
/// plain function can stand in for the default [`catenate_xml::parse`].
pub trait DocumentParser: Send + Sync {
    fn parse(&self, documents: &mut Documents, text: &str) -> Result<DocumentHandle>;
}

impl<F> DocumentParser for F
where
    F: Fn(&mut Documents, &str) -> Result<DocumentHandle> + Send + Sync,
{
    fn parse(&self, documents: &mut Documents, text: &str) -> Result<DocumentHandle> {
        self(documents, text)
    }
}
