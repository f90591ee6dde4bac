//! jsonrest - query a JSON array with OData-style parameters
//!
//! This is the command-line entry point.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use jsonrest::config::{Config, LogFormat};
use jsonrest::service::{EndpointService, Reply};
use jsonrest::store::MemoryStore;
use jsonrest::JsonRestError;
use serde_json::Value;
use tracing::{debug, info};

/// Default configuration file name
const DEFAULT_CONFIG_FILE: &str = "jsonrest.toml";

/// jsonrest - OData-style queries over JSON arrays
///
/// Loads a JSON array from a file and filters, sorts, projects and pages it.
#[derive(Parser, Debug)]
#[command(name = "jsonrest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (TOML)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        env = "JSONREST_CONFIG",
        global = true
    )]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "JSONREST_LOG_LEVEL",
        global = true
    )]
    loglevel: Option<String>,

    /// Log format: pretty, json (overrides config file)
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        env = "JSONREST_LOG_FORMAT",
        global = true
    )]
    log_format: Option<String>,

    /// Dump effective configuration to stdout and exit
    #[arg(long = "dump-config", action = ArgAction::SetTrue, global = true)]
    dump_config: bool,

    /// Runtime config overrides in key=value format (can be specified multiple times)
    #[arg(long = "set", value_name = "KEY=VALUE", action = ArgAction::Append, global = true)]
    config_overrides: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a query against a JSON array file
    Query {
        /// File holding the JSON array
        file: PathBuf,

        /// Query string, e.g. "filter=age gt 30&orderby=name&top=5"
        #[arg(short = 'p', long = "params", value_name = "QS", default_value = "")]
        params: String,

        /// Property identifying each record (used by cursor paging)
        #[arg(long = "id-prop", value_name = "NAME")]
        id_prop: Option<String>,
    },

    /// Infer a JSON Schema for a JSON array file
    Schema {
        /// File holding the JSON array
        file: PathBuf,
    },

    /// Write a configuration file with the default settings
    Init {
        /// Output path for the configuration file
        #[arg(short = 'o', long = "output", default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(short = 'f', long = "force", action = ArgAction::SetTrue)]
        force: bool,
    },
}

impl Cli {
    /// Apply CLI argument overrides to the configuration
    fn apply_to_config(&self, config: &mut Config) -> Result<(), String> {
        if let Some(ref level) = self.loglevel {
            config.logging.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config
                .set_param("logging.format", format)
                .map_err(|e| e.to_string())?;
        }

        for override_str in &self.config_overrides {
            let (key, value) = override_str.split_once('=').ok_or_else(|| {
                format!(
                    "Invalid config override '{}': expected key=value format",
                    override_str
                )
            })?;
            config.set_param(key, value).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile(PathBuf),
    Defaults,
}

impl ConfigSource {
    fn label(&self) -> String {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::DefaultFile(path) => {
                path.display().to_string()
            }
            ConfigSource::Defaults => "built-in defaults".to_string(),
        }
    }
}

fn load_config(cli: &Cli) -> Result<(Config, ConfigSource), JsonRestError> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(JsonRestError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = Config::from_file(path)?;
        return Ok((config, ConfigSource::Explicit(path.clone())));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        let config = Config::from_file(&default_path)?;
        return Ok((config, ConfigSource::DefaultFile(default_path)));
    }

    Ok((Config::default(), ConfigSource::Defaults))
}

/// Load, override and validate the configuration
fn prepare_config(cli: &Cli) -> Result<(Config, ConfigSource), String> {
    let (mut config, source) = load_config(cli).map_err(|e| e.to_string())?;
    cli.apply_to_config(&mut config)?;
    config.validate().map_err(|e| e.to_string())?;
    Ok((config, source))
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // stdout carries the query output
    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Read a JSON file into a value
async fn read_json(path: &Path) -> Result<Value, JsonRestError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Print a reply body, mapping the status to an exit code
fn emit(reply: Reply) -> ExitCode {
    let rendered = serde_json::to_string_pretty(&reply.body).unwrap_or_else(|_| reply.body.to_string());
    if reply.is_success() {
        println!("{}", rendered);
        ExitCode::SUCCESS
    } else {
        eprintln!("{} {}", reply.status, rendered);
        ExitCode::FAILURE
    }
}

async fn cmd_query(
    config: &Config,
    file: &Path,
    params: &str,
    id_prop: Option<&str>,
) -> ExitCode {
    let service = EndpointService::new(
        Arc::new(MemoryStore::new().with_first_page_size(config.store.first_page_size)),
        config.query.clone(),
    );

    let result = async {
        let raw = read_json(file).await?;
        let endpoint = service.create(id_prop, raw).await?;
        debug!(id = %endpoint.id, file = %file.display(), "collection loaded");
        service.query(&endpoint.id, params).await
    }
    .await;

    emit(Reply::from_result(result))
}

async fn cmd_schema(config: &Config, file: &Path) -> ExitCode {
    let service = EndpointService::new(Arc::new(MemoryStore::new()), config.query.clone());

    let result = async {
        let raw = read_json(file).await?;
        let endpoint = service.create(None, raw).await?;
        service.schema(&endpoint.id).await
    }
    .await;

    emit(Reply::from_result(result))
}

fn cmd_init(output: &Path, force: bool) -> ExitCode {
    if output.exists() && !force {
        eprintln!(
            "Configuration file '{}' already exists. Use --force to overwrite it.",
            output.display()
        );
        return ExitCode::FAILURE;
    }

    let config_content = match Config::default().to_toml() {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let written = fs::File::create(output).and_then(|mut file| {
        file.write_all(b"# jsonrest configuration\n\n")?;
        file.write_all(config_content.as_bytes())
    });
    if let Err(e) = written {
        eprintln!("Failed to write {}: {}", output.display(), e);
        return ExitCode::FAILURE;
    }

    println!("Created configuration file: {}", output.display());
    println!();
    println!("To use it:");
    println!("  jsonrest --config {} query data.json", output.display());

    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Init { output, force } = &cli.command {
        return cmd_init(output, *force);
    }

    let (config, source) = match prepare_config(&cli) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        return match config.to_toml() {
            Ok(toml) => {
                println!("{}", toml);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    init_logging(&config);
    info!(config = %source.label(), "configuration loaded");

    match &cli.command {
        Commands::Query {
            file,
            params,
            id_prop,
        } => cmd_query(&config, file, params, id_prop.as_deref()).await,
        Commands::Schema { file } => cmd_schema(&config, file).await,
        Commands::Init { .. } => ExitCode::SUCCESS,
    }
}
