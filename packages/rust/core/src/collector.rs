//! Document collector: merges fragments of many XML files into one template.
//!
//! Lifecycle: a [`Collector`] starts uninitialized, becomes ready once a
//! template is loaded, and from then on every ingestion appends the
//! fragments selected from each source document under the template's
//! insertion point.
//!
//! [`Collector::ingest_all`] overlaps file reads on a fixed pool of worker
//! tasks (never more than `limit` reads outstanding) but merges strictly in
//! input order once every read has finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use catenate_shared::{CatenateError, Result};
use catenate_xml::{DocumentHandle, Documents, Node, PathSelector};

use crate::source::{DocumentParser, FileSource, FsSource, read_with_timeout};

/// Smallest accepted concurrency limit.
pub const MIN_LIMIT: usize = 1;

/// Largest accepted concurrency limit.
pub const MAX_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

enum State {
    Uninitialized,
    Ready(Target),
}

/// The loaded template and where fragments go.
struct Target {
    /// Holds the template and every source parsed for it.
    documents: Documents,
    insertion_point: Node,
    /// Set by the first ingestion call; the template is frozen afterwards.
    ingestion_started: bool,
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates imported fragments into a single template document.
pub struct Collector<S = FsSource> {
    import_path: String,
    limit: usize,
    selector: PathSelector,
    parser: Box<dyn DocumentParser>,
    source: Arc<S>,
    read_timeout: Option<Duration>,
    state: State,
}

impl Collector<FsSource> {
    /// Create a collector that imports the nodes selected by `import_path`
    /// with at most `limit` concurrent file reads.
    ///
    /// Fails with [`CatenateError::Config`] if `import_path` is empty or
    /// `limit` is outside `1..=100`.
    pub fn new(import_path: impl Into<String>, limit: usize) -> Result<Self> {
        let import_path = import_path.into();
        if import_path.trim().is_empty() {
            return Err(CatenateError::config(
                "a path to select imported elements is required",
            ));
        }
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(CatenateError::config(format!(
                "invalid number of concurrent operations: {limit} (expected {MIN_LIMIT}-{MAX_LIMIT})"
            )));
        }

        Ok(Self {
            import_path,
            limit,
            selector: PathSelector::unbound(),
            parser: Box::new(
                catenate_xml::parse as fn(&mut Documents, &str) -> Result<DocumentHandle>,
            ),
            source: Arc::new(FsSource),
            read_timeout: None,
            state: State::Uninitialized,
        })
    }
}

impl<S: FileSource> Collector<S> {
    /// Use `selector` (and its namespace binding) for all path expressions.
    pub fn with_selector(mut self, selector: PathSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Replace the default parser.
    pub fn with_parser(mut self, parser: impl DocumentParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Read files through `source` instead of the filesystem.
    pub fn with_source<T: FileSource>(self, source: T) -> Collector<T> {
        Collector {
            import_path: self.import_path,
            limit: self.limit,
            selector: self.selector,
            parser: self.parser,
            source: Arc::new(source),
            read_timeout: self.read_timeout,
            state: self.state,
        }
    }

    /// Fail any single read that takes longer than `timeout`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether a template has been loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// The store holding the target document, once a template is loaded.
    pub fn documents(&self) -> Option<&Documents> {
        match &self.state {
            State::Ready(target) => Some(&target.documents),
            State::Uninitialized => None,
        }
    }

    /// The element fragments are appended to.
    pub fn insertion_point(&self) -> Option<Node> {
        match &self.state {
            State::Ready(target) => Some(target.insertion_point),
            State::Uninitialized => None,
        }
    }

    /// Serialize the target document.
    ///
    /// Namespace declarations repeated from an ancestor are dropped first.
    pub fn to_xml(&mut self) -> Result<String> {
        let target = match &mut self.state {
            State::Ready(target) => target,
            State::Uninitialized => {
                return Err(CatenateError::not_initialized(
                    "no template has been loaded; nothing to serialize",
                ));
            }
        };
        let xot = target.documents.xot_mut();
        let root = xot.root(target.insertion_point);
        xot.deduplicate_namespaces(root);
        catenate_xml::to_string(&target.documents, target.insertion_point)
    }

    // -----------------------------------------------------------------------
    // Template loading
    // -----------------------------------------------------------------------

    /// Read and parse the template at `path` and resolve the insertion point.
    ///
    /// `insertion_expr` must select exactly one element. Loading again
    /// replaces the template, which is only allowed until ingestion starts.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), insertion = insertion_expr))]
    pub async fn load_template(
        &mut self,
        path: impl AsRef<Path>,
        insertion_expr: &str,
    ) -> Result<&mut Self> {
        self.ensure_template_replaceable()?;
        let bytes = read_with_timeout(self.source.as_ref(), path.as_ref(), self.read_timeout).await?;
        self.load_template_text(&String::from_utf8_lossy(&bytes), insertion_expr)
    }

    /// Parse an already-read template and resolve the insertion point.
    pub fn load_template_text(&mut self, text: &str, insertion_expr: &str) -> Result<&mut Self> {
        self.ensure_template_replaceable()?;

        let mut documents = Documents::new();
        let template = self.parser.parse(&mut documents, text)?;
        let selected = self.selector.select(insertion_expr, &mut documents, template)?;
        let insertion_point = match selected.as_slice() {
            [node] => *node,
            _ => {
                return Err(CatenateError::InvalidSelection {
                    expr: insertion_expr.to_string(),
                    expected: 1,
                    actual: selected.len(),
                });
            }
        };
        if !documents.xot().is_element(insertion_point) {
            return Err(CatenateError::config(format!(
                "the path <{insertion_expr}> does not select an element"
            )));
        }

        if self.is_ready() {
            debug!("replacing previously loaded template");
        }
        info!(insertion = insertion_expr, "template loaded");

        self.state = State::Ready(Target {
            documents,
            insertion_point,
            ingestion_started: false,
        });
        Ok(self)
    }

    fn ensure_template_replaceable(&self) -> Result<()> {
        match &self.state {
            State::Ready(target) if target.ingestion_started => Err(CatenateError::state(
                "the template cannot be replaced after ingestion has started",
            )),
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Parse `bytes`, select the import fragment, and append a copy of each
    /// selected node under the insertion point, in document order.
    pub fn ingest_one(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.merge(bytes)?;
        Ok(self)
    }

    /// Read every file in `files` with bounded concurrency, then merge them
    /// in the order given.
    ///
    /// If any read fails, no file from this batch is merged and the first
    /// error is returned. Reads already in flight are allowed to finish.
    #[instrument(skip_all, fields(files = files.len(), limit = self.limit))]
    pub async fn ingest_all<P: AsRef<Path>>(&mut self, files: &[P]) -> Result<()> {
        self.begin_ingestion(
            "load_template must be called to initialize the collector document",
        )?;
        if files.is_empty() {
            debug!("no files to ingest");
            return Ok(());
        }

        let paths: Arc<[PathBuf]> = files.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let contents = self.read_all(paths.clone()).await?;

        let mut appended = 0;
        for (path, bytes) in paths.iter().zip(contents) {
            match self.merge(&bytes) {
                Ok(count) => {
                    debug!(path = %path.display(), nodes = count, "merged fragment");
                    appended += count;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "merge failed");
                    return Err(e);
                }
            }
        }

        info!(files = paths.len(), nodes = appended, "ingestion complete");
        Ok(())
    }

    /// Mark ingestion as started, failing if no template is loaded.
    fn begin_ingestion(&mut self, requirement: &str) -> Result<()> {
        match &mut self.state {
            State::Ready(target) => {
                target.ingestion_started = true;
                Ok(())
            }
            State::Uninitialized => Err(CatenateError::not_initialized(requirement)),
        }
    }

    /// Merge one source document. Returns the number of nodes appended.
    ///
    /// Every selected node is checked and cloned before any is appended, so a
    /// rejected selection leaves the target unchanged.
    fn merge(&mut self, bytes: &[u8]) -> Result<usize> {
        let target = match &mut self.state {
            State::Ready(target) => target,
            State::Uninitialized => {
                return Err(CatenateError::not_initialized(
                    "the collector hasn't been initialized with a template",
                ));
            }
        };
        target.ingestion_started = true;

        let documents = &mut target.documents;
        let source = self.parser.parse(documents, &String::from_utf8_lossy(bytes))?;
        let selected = self.selector.select(&self.import_path, documents, source)?;

        let xot = documents.xot_mut();
        let mut fragment = Vec::with_capacity(selected.len());
        for node in selected {
            // The document node stands for its document element.
            let node = if xot.is_document(node) {
                xot.document_element(node)
                    .map_err(|e| CatenateError::parse(e.to_string()))?
            } else {
                node
            };
            let appendable = xot.is_element(node)
                || xot.is_text(node)
                || xot.is_comment(node)
                || xot.is_processing_instruction(node);
            if !appendable {
                return Err(CatenateError::path(
                    self.import_path.as_str(),
                    "selects attribute or namespace nodes, which cannot be appended",
                ));
            }
            fragment.push(xot.clone_with_prefixes(node));
        }

        let count = fragment.len();
        for copy in fragment {
            xot.append(target.insertion_point, copy)
                .map_err(|e| CatenateError::state(e.to_string()))?;
        }
        Ok(count)
    }

    /// Read all `paths` on at most `limit` worker tasks.
    ///
    /// Each worker claims the next unread index from a shared cursor and
    /// keeps its results tagged with that index; results are then placed by
    /// position, so completion order never affects the output order.
    async fn read_all(&self, paths: Arc<[PathBuf]>) -> Result<Vec<Vec<u8>>> {
        let total = paths.len();
        let workers = self.limit.min(total);
        let cursor = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));

        debug!(total, workers, "starting reads");

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let paths = paths.clone();
            let cursor = cursor.clone();
            let failed = failed.clone();
            let source = self.source.clone();
            let timeout = self.read_timeout;

            set.spawn(async move {
                let mut done: Vec<(usize, Vec<u8>)> = Vec::new();
                while !failed.load(Ordering::Acquire) {
                    let index = cursor.fetch_add(1, Ordering::AcqRel);
                    let Some(path) = paths.get(index) else {
                        break;
                    };
                    debug!(worker, index, path = %path.display(), "reading file");
                    match read_with_timeout(source.as_ref(), path, timeout).await {
                        Ok(bytes) => done.push((index, bytes)),
                        Err(e) => {
                            failed.store(true, Ordering::Release);
                            return Err(e);
                        }
                    }
                }
                Ok(done)
            });
        }

        let mut slots: Vec<Option<Vec<u8>>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<CatenateError> = None;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    for (index, bytes) in done {
                        slots[index] = Some(bytes);
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "read failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    failed.store(true, Ordering::Release);
                    if first_error.is_none() {
                        first_error = Some(CatenateError::Task(e.to_string()));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| CatenateError::Task(format!("no content read for file #{index}")))
            })
            .collect()
    }
}
