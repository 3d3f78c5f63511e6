use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::container::Container;
use crate::echo::EchoController;
use crate::filter::FilterFactoryRegistry;
use crate::logging::LogConfig;
use crate::metadata::load_manifest;
use crate::registration::AnnotationProcessor;
use crate::router::{Route, RouteTable};

/// Command-line interface for routeforge
#[derive(Parser)]
#[command(name = "routeforge")]
#[command(about = "Inspect and validate controller manifests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Debug-level, human-readable logs instead of the environment settings
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Logging settings for this invocation.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        if self.verbose {
            LogConfig::default_dev()
        } else {
            LogConfig::from_env()
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the route table a manifest produces
    Inspect {
        /// Controller manifest (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Application config (YAML, JSON or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print routes as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a manifest without printing routes
    Check {
        /// Controller manifest (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Application config (YAML, JSON or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// One line of `inspect` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub method: String,
    pub pattern: String,
    pub name: Option<String>,
    pub middlewares: Vec<String>,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            method: route.method().to_string(),
            pattern: route.pattern().to_string(),
            name: route.name().map(str::to_string),
            middlewares: route
                .middlewares()
                .iter()
                .map(|m| m.name().to_string())
                .collect(),
        }
    }
}

/// Load config and manifest, bind every class to an [`EchoController`] and
/// run registration.
pub fn build_routes(manifest: &Path, config: Option<&Path>) -> anyhow::Result<RouteTable> {
    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides();

    let metadata = load_manifest(manifest, &FilterFactoryRegistry::with_builtins())?;

    let mut container = Container::new();
    container.set_fallback_controller(|class| Arc::new(EchoController::new(class)));
    config.register_services(&mut container);

    let mut table = RouteTable::new();
    AnnotationProcessor::new(&metadata, &container)
        .with_context_url(config.context_url.clone())
        .process(&mut table)
        .with_context(|| format!("Route registration failed for {}", manifest.display()))?;
    Ok(table)
}

/// Render the table as aligned text, one route per line.
#[must_use]
pub fn render_table(table: &RouteTable) -> String {
    let rows: Vec<RouteSummary> = table.routes().iter().map(RouteSummary::from).collect();
    let width = rows.iter().map(|r| r.pattern.len()).max().unwrap_or(0);
    let mut out = String::new();
    for row in rows {
        let name = row.name.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{:<7} {:<width$}  {}  [{}]\n",
            row.method,
            row.pattern,
            name,
            row.middlewares.join(", "),
            width = width
        ));
    }
    out
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Inspect {
            manifest,
            config,
            json,
        } => {
            let table = build_routes(&manifest, config.as_deref())?;
            if json {
                let rows: Vec<RouteSummary> =
                    table.routes().iter().map(RouteSummary::from).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_table(&table));
            }
            Ok(())
        }
        Commands::Check { manifest, config } => {
            let table = build_routes(&manifest, config.as_deref())?;
            info!(routes = table.len(), manifest = %manifest.display(), "Manifest is valid");
            println!("{}: {} routes OK", manifest.display(), table.len());
            Ok(())
        }
    }
}
