//! Controller OpenAPI - command-line front end.
//!
//! Loads a controller manifest and either prints the resolved route table or synthesizes an
//! OpenAPI 3.0 document from the controllers' annotations.
//!
//! # Usage
//!
//! ```bash
//! controller-openapi [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Merge the generated paths into an existing document:
//! ```bash
//! controller-openapi controllers.yaml --base openapi.base.yaml -o openapi.yaml
//! ```
//!
//! Derive component schemas from Rust declarations and emit JSON:
//! ```bash
//! controller-openapi controllers.yaml --schemas '**/*.rs' --schema-root src/types -f json
//! ```
//!
//! List the routes a registrar would receive:
//! ```bash
//! controller-openapi controllers.yaml --routes
//! ```

use anyhow::Result;
use clap::Parser;
use controller_openapi::cli;
use log::info;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("controller-openapi starting...");

    let args = cli::validate_args(args)?;
    cli::run(args)?;

    Ok(())
}
