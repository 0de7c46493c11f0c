use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pgai_adapters::HttpGateway;
use pgai_core::config::{default_log_path, ClientConfig, FileConfigStore};
use pgai_core::workspace::Workspace;
use pgai_tui::{TuiError, TuiOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn run_app(
    config: &ClientConfig,
    run_tui: impl FnOnce(Workspace, TuiOptions) -> Result<(), TuiError>,
) -> Result<(), Box<dyn Error>> {
    let workspace = Workspace::new(config.default_page_size, config.row_limit);
    run_tui(workspace, tui_options(config))?;
    Ok(())
}

fn tui_options(config: &ClientConfig) -> TuiOptions {
    TuiOptions {
        export_delimiter: config.export_delimiter,
        ..TuiOptions::default()
    }
}

fn log_filter(config: &ClientConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// The terminal owns stdout and stderr while the workspace is up, so logs go
// to a file or nowhere.
fn init_logging(config: &ClientConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let file = open_log_file(&default_log_path()?)?;
    install_subscriber(config, file)
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn install_subscriber(config: &ClientConfig, file: File) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
}

fn main() -> Result<(), Box<dyn Error>> {
    let store = FileConfigStore::load_default()?;
    let config = store.config().clone();
    if let Err(error) = init_logging(&config) {
        eprintln!("pgai: logging disabled: {error}");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let gateway = Arc::new(HttpGateway::new(&config)?);
    info!(gateway = %gateway.base_url(), config = %store.path().display(), "starting pgai");

    let result = run_app(&config, |workspace, options| {
        pgai_tui::run(runtime.handle(), gateway, workspace, options)
    });
    if let Err(error) = &result {
        warn!(%error, "workspace exited with an error");
    }
    result
}
