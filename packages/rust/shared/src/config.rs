//! Runtime settings for catenate.
//!
//! Settings are layered: built-in defaults, then `CATENATE_*` environment
//! variables, then CLI flags (applied by the CLI crate).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CatenateError, Result};

/// Default XML namespace bound to the `kml` prefix in path expressions.
pub const DEFAULT_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Default number of concurrently open source files.
pub const DEFAULT_OPEN_LIMIT: usize = 5;

/// Default path expression for the element fragments are appended to.
pub const DEFAULT_TARGET_PARENT: &str = "//kml:Document";

/// Default path expression selecting fragments in source documents.
pub const DEFAULT_IMPORT_SOURCE: &str = "//kml:Placemark";

pub const ENV_NAMESPACE: &str = "CATENATE_DEFAULT_NAMESPACE";
pub const ENV_OPEN_LIMIT: &str = "CATENATE_OPEN_LIMIT";
pub const ENV_TARGET_PARENT: &str = "CATENATE_TARGET_PARENT";
pub const ENV_IMPORT_SOURCE: &str = "CATENATE_IMPORT_SOURCE";
pub const ENV_TEMPLATE_PATH: &str = "CATENATE_TEMPLATE_PATH";
pub const ENV_READ_TIMEOUT_MS: &str = "CATENATE_READ_TIMEOUT_MS";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Resolved settings for one catenate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Namespace URI bound to the `kml` prefix. `None` runs queries unbound.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Maximum number of concurrently outstanding file reads.
    #[serde(default = "default_open_limit")]
    pub open_limit: usize,

    /// Path expression selecting the insertion point in the template.
    #[serde(default = "default_target_parent")]
    pub target_parent: String,

    /// Path expression selecting fragments in each source document.
    #[serde(default = "default_import_source")]
    pub import_source: String,

    /// Template file. `None` uses the template bundled with the binary.
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    /// Per-file read timeout in milliseconds. `None` waits indefinitely.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: Some(DEFAULT_NAMESPACE.into()),
            open_limit: default_open_limit(),
            target_parent: default_target_parent(),
            import_source: default_import_source(),
            template_path: None,
            read_timeout_ms: None,
        }
    }
}

fn default_open_limit() -> usize {
    DEFAULT_OPEN_LIMIT
}
fn default_target_parent() -> String {
    DEFAULT_TARGET_PARENT.into()
}
fn default_import_source() -> String {
    DEFAULT_IMPORT_SOURCE.into()
}

impl Settings {
    /// Resolve settings from the process environment over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary variable lookup over the defaults.
    ///
    /// An empty namespace value disables the namespace binding. Empty values
    /// for the other variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(ns) = lookup(ENV_NAMESPACE) {
            settings.namespace = (!ns.is_empty()).then_some(ns);
        }
        if let Some(limit) = non_empty(lookup(ENV_OPEN_LIMIT)) {
            settings.open_limit = limit.trim().parse().map_err(|_| {
                CatenateError::config(format!(
                    "{ENV_OPEN_LIMIT} must be a non-negative integer, got '{limit}'"
                ))
            })?;
        }
        if let Some(parent) = non_empty(lookup(ENV_TARGET_PARENT)) {
            settings.target_parent = parent;
        }
        if let Some(import) = non_empty(lookup(ENV_IMPORT_SOURCE)) {
            settings.import_source = import;
        }
        if let Some(path) = non_empty(lookup(ENV_TEMPLATE_PATH)) {
            settings.template_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = non_empty(lookup(ENV_READ_TIMEOUT_MS)) {
            let ms = ms.trim().parse().map_err(|_| {
                CatenateError::config(format!(
                    "{ENV_READ_TIMEOUT_MS} must be a number of milliseconds, got '{ms}'"
                ))
            })?;
            settings.read_timeout_ms = Some(ms);
        }

        tracing::debug!(?settings, "resolved settings from environment");
        Ok(settings)
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CatenateError::config(e.to_string()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Help text
// ---------------------------------------------------------------------------

/// Describe every environment option together with its resolved value.
pub fn options_summary(settings: &Settings) -> String {
    let namespace = settings.namespace.as_deref().unwrap_or("");
    let template = settings
        .template_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "bundled shell.kml".into());
    let timeout = settings
        .read_timeout_ms
        .map(|ms| ms.to_string())
        .unwrap_or_else(|| "none".into());

    format!(
        "\nOptions are specified as environment settings (or the matching flags):\n\
         {ENV_NAMESPACE} (set to <{namespace}>): XML namespace URI bound to the `kml` prefix in path expressions; empty disables the binding\n\
         {ENV_OPEN_LIMIT} (set to <{limit}>): Number of concurrently open files (1-100)\n\
         {ENV_TARGET_PARENT} (set to <{parent}>): XPath expression for the element to append to in the template document\n\
         {ENV_IMPORT_SOURCE} (set to <{import}>): XPath expression for the elements in source documents to include in the result\n\
         {ENV_TEMPLATE_PATH} (set to <{template}>): Filesystem path of the template document\n\
         {ENV_READ_TIMEOUT_MS} (set to <{timeout}>): Per-file read timeout in milliseconds\n",
        limit = settings.open_limit,
        parent = settings.target_parent,
        import = settings.import_source,
    )
}
