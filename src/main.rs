// src/main.rs - Virtual printer host with an HTTP management API
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use virtual_printers::config::{self, Config};
use virtual_printers::web::api::{create_router, AppState};
use virtual_printers::{JobEnvironment, ManagementDirectory, PrinterRegistry, PrinterSettings};

#[derive(Parser, Debug)]
#[command(name = "printer-host", about = "Hosts virtual printers and exposes them for management.")]
struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address of the management API (overrides [server] bind)
    #[arg(long)]
    bind: Option<String>,

    /// Extra printer name file, read after the configured ones
    #[arg(long = "names-file")]
    names_files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    config.registry.names_files.extend(cli.names_files);
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(config.logging.max_level()?)
        .init();

    tracing::info!("Starting virtual printer host");
    if let Some(path) = &cli.config {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    let management = Arc::new(ManagementDirectory::new());
    let settings = PrinterSettings {
        output: config.output.provider(),
        environment: JobEnvironment::from_system(),
        ..PrinterSettings::default()
    };
    let registry = PrinterRegistry::new(settings, management.clone());
    registry.initialize(
        config.registry.printer_names(),
        config.registry.default_printer.as_deref(),
    );
    tracing::info!("Printers: {}", registry.printer_names().join(", "));

    let app = create_router(AppState {
        registry,
        management,
    });

    let addr: SocketAddr = config.server.bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Management API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
