//! CLI definition, settings resolution, tracing setup, and the run loop.

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches, Parser};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use catenate_core::Collector;
use catenate_shared::{Settings, options_summary};
use catenate_xml::PathSelector;

/// Template used when no template path is configured.
const BUNDLED_TEMPLATE: &str = include_str!("../resources/shell.kml");

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// catenate: merge the fragments of many XML documents into one.
#[derive(Parser)]
#[command(
    name = "catenate",
    version,
    about = "Append the elements selected from each XML file, in order, under one element of a template document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// XML files to catenate, merged in the order given.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Namespace URI bound to the `kml` prefix in path expressions.
    #[arg(long, conflicts_with = "no_namespace")]
    pub namespace: Option<String>,

    /// Evaluate path expressions without a namespace binding.
    #[arg(long)]
    pub no_namespace: bool,

    /// Number of concurrently open files (1-100).
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// XPath expression for the template element to append to.
    #[arg(long)]
    pub target_parent: Option<String>,

    /// XPath expression for the elements to import from each file.
    #[arg(long)]
    pub import_source: Option<String>,

    /// Template document (defaults to the bundled KML shell).
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Fail if a single file read takes longer than this many milliseconds.
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Print the resolved settings as TOML and exit.
    #[arg(long)]
    pub show_config: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Parse the command line. Usage errors print the options summary and exit.
pub(crate) fn parse_args() -> Cli {
    let summary = options_summary(&Settings::from_env().unwrap_or_default());
    let parsed = Cli::command()
        .after_help(summary)
        .try_get_matches()
        .and_then(|matches| Cli::from_arg_matches(&matches));

    match parsed {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => usage_error(&e.to_string()),
    }
}

/// Print `message` and the options summary to stderr, then exit with status 1.
fn usage_error(message: &str) -> ! {
    eprintln!("{}", message.trim_end());
    eprintln!("{}", options_summary(&Settings::from_env().unwrap_or_default()));
    std::process::exit(1);
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Standard output is reserved for
/// the merged document, so logs are written to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "catenate=warn",
        1 => "catenate=info",
        2 => "catenate=debug",
        _ => "catenate=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Load the template, ingest every file, and print the merged document.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let settings = match Settings::from_env() {
        Ok(settings) => apply_flags(&cli, settings),
        Err(e) => usage_error(&e.to_string()),
    };

    if cli.show_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    match cli.files.first() {
        None => usage_error("Please provide a list of XML files to catenate as command-line arguments."),
        Some(first) if first.to_string_lossy().starts_with('-') => usage_error(&format!(
            "'{}' looks like an option, not an XML file.",
            first.display()
        )),
        Some(_) => {}
    }

    let mut collector = match build_collector(&settings) {
        Ok(collector) => collector,
        Err(e) => usage_error(&e.to_string()),
    };

    info!(
        files = cli.files.len(),
        limit = settings.open_limit,
        template = ?settings.template_path,
        "catenating documents"
    );

    let loaded = match &settings.template_path {
        Some(path) => collector.load_template(path, &settings.target_parent).await,
        None => collector.load_template_text(BUNDLED_TEMPLATE, &settings.target_parent),
    };
    loaded.wrap_err("failed to load the template document")?;

    collector
        .ingest_all(&cli.files)
        .await
        .wrap_err("failed to ingest source documents")?;

    print!("{}", collector.to_xml()?);
    Ok(())
}

/// Layer CLI flags over environment-resolved settings.
fn apply_flags(cli: &Cli, mut settings: Settings) -> Settings {
    if cli.no_namespace {
        settings.namespace = None;
    } else if let Some(ns) = &cli.namespace {
        settings.namespace = (!ns.is_empty()).then(|| ns.clone());
    }
    if let Some(limit) = cli.limit {
        settings.open_limit = limit;
    }
    if let Some(parent) = &cli.target_parent {
        settings.target_parent = parent.clone();
    }
    if let Some(import) = &cli.import_source {
        settings.import_source = import.clone();
    }
    if let Some(template) = &cli.template {
        settings.template_path = Some(template.clone());
    }
    if let Some(ms) = cli.read_timeout_ms {
        settings.read_timeout_ms = Some(ms);
    }
    settings
}

fn build_collector(settings: &Settings) -> catenate_shared::Result<Collector> {
    let mut collector = Collector::new(settings.import_source.as_str(), settings.open_limit)?
        .with_selector(PathSelector::new(settings.namespace.as_deref()));
    if let Some(ms) = settings.read_timeout_ms {
        collector = collector.with_read_timeout(Duration::from_millis(ms));
    }
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("catenate").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn flags_override_settings() {
        let cli = cli(&[
            "--limit",
            "7",
            "--import-source",
            "//item",
            "--target-parent",
            "/root",
            "--template",
            "shell.xml",
            "a.xml",
            "b.xml",
        ]);
        let settings = apply_flags(&cli, Settings::default());

        assert_eq!(settings.open_limit, 7);
        assert_eq!(settings.import_source, "//item");
        assert_eq!(settings.target_parent, "/root");
        assert_eq!(settings.template_path, Some(PathBuf::from("shell.xml")));
        assert_eq!(cli.files, [PathBuf::from("a.xml"), PathBuf::from("b.xml")]);
    }

    #[test]
    fn namespace_flags() {
        let settings = apply_flags(&cli(&["--no-namespace", "a.xml"]), Settings::default());
        assert!(settings.namespace.is_none());

        let settings = apply_flags(&cli(&["--namespace", "urn:x", "a.xml"]), Settings::default());
        assert_eq!(settings.namespace.as_deref(), Some("urn:x"));

        assert!(
            Cli::try_parse_from(["catenate", "--namespace", "urn:x", "--no-namespace", "a.xml"])
                .is_err()
        );
    }

    #[test]
    fn unset_flags_keep_settings() {
        let base = Settings {
            open_limit: 9,
            ..Settings::default()
        };
        let settings = apply_flags(&cli(&["a.xml"]), base.clone());
        assert_eq!(settings, base);
    }

    #[test]
    fn out_of_range_limit_is_rejected_by_the_collector() {
        let settings = Settings {
            open_limit: 0,
            ..Settings::default()
        };
        let err = build_collector(&settings).err().expect("limit 0 must fail");
        assert!(matches!(err, catenate_shared::CatenateError::Config { .. }));
    }

    #[test]
    fn bundled_template_accepts_default_placemarks() {
        let settings = Settings::default();
        let mut collector = build_collector(&settings).unwrap();
        collector
            .load_template_text(BUNDLED_TEMPLATE, &settings.target_parent)
            .unwrap();
        collector
            .ingest_one(
                br#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document><Placemark><name>x</name></Placemark></Document></kml>"#,
            )
            .unwrap();

        let xml = collector.to_xml().unwrap();
        assert!(xml.contains("<Placemark><name>x</name></Placemark>"));
    }
}
