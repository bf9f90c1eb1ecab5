use crate::manifest::ControllerManifest;
use crate::openapi_builder::{synthesize, OpenApiDocument};
use crate::router::resolve_routes;
use crate::schema_aggregator::SchemaSource;
use crate::serializer::{load_document, serialize_json, serialize_yaml, write_to_file};
use crate::type_resolver::RustTypeDeriver;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Controller OpenAPI - Route tables and OpenAPI documents from annotated controllers
#[derive(Parser, Debug)]
#[command(name = "controller-openapi")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Controller manifest (YAML, or JSON with a .json extension)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Base OpenAPI document to merge the generated paths into
    #[arg(short = 'b', long = "base", value_name = "FILE")]
    pub base: Option<PathBuf>,

    /// Glob pattern of Rust declaration files to derive component schemas from
    #[arg(short = 's', long = "schemas", value_name = "GLOB")]
    pub schemas: Option<String>,

    /// Directory the schema pattern is matched against
    #[arg(long = "schema-root", value_name = "DIR", default_value = ".")]
    pub schema_root: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Print the resolved route table instead of the document
    #[arg(short = 'r', long = "routes")]
    pub routes: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn validate_args(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest.is_file() {
        anyhow::bail!("Manifest does not exist: {}", args.manifest.display());
    }
    if let Some(base) = &args.base {
        if !base.is_file() {
            anyhow::bail!("Base document does not exist: {}", base.display());
        }
    }
    if args.schemas.is_some() && !args.schema_root.is_dir() {
        anyhow::bail!(
            "Schema root is not a directory: {}",
            args.schema_root.display()
        );
    }

    info!("Manifest: {}", args.manifest.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let manifest = ControllerManifest::load(&args.manifest)?;
    let controllers = manifest.into_controllers()?;
    info!("Built {} controllers", controllers.len());

    if args.routes {
        let routes = resolve_routes(&controllers)?;
        let table: Vec<String> = routes.iter().map(ToString::to_string).collect();
        emit(&table.join("\n"), &args)?;
        info!("Resolved {} routes", routes.len());
        return Ok(());
    }

    let base = match &args.base {
        Some(path) => load_document(path)?,
        None => OpenApiDocument::default(),
    };

    let schema_source = args.schemas.as_deref().map(|pattern| {
        info!(
            "Deriving schemas from {} under {}",
            pattern,
            args.schema_root.display()
        );
        SchemaSource::new(args.schema_root.clone(), pattern, RustTypeDeriver)
    });

    let document = synthesize(&base, &controllers, schema_source.as_ref())?;
    info!(
        "OpenAPI document built with {} paths",
        document.paths.len()
    );

    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };
    emit(&content, &args)
}

fn emit(content: &str, args: &CliArgs) -> Result<()> {
    match &args.output_path {
        Some(output_path) => {
            write_to_file(content, output_path)?;
            info!("Wrote {}", output_path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
