//! catenate CLI: concatenate the fragments of many XML documents into one.
//!
//! Selects the same kind of element (KML Placemarks by default) from every
//! input file and appends them, in argument order, under a single element
//! of a template document printed to standard output.

mod commands;

use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = commands::parse_args();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
