use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pm_app::{build_session, resolve_config, ui_options, Cli};
use pm_ui::{Ui, UiShellState};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let layout = config.layout();
    init_file_logging(&layout.log_path, &config.logging.level)?;

    let session = build_session(&config).with_context(|| {
        format!("failed to open pm data in {}", layout.data_dir.display())
    })?;
    let options = ui_options(&config);
    let mut shell = UiShellState::new(session).with_scroll_step(options.scroll_step);

    let mut ui = Ui::init(options)?;
    ui.run(&mut shell)?;
    drop(ui);

    if shell.session().has_unsaved_changes() {
        tracing::warn!("exited with unsaved changes");
        eprintln!("pm: exited with unsaved changes");
    }
    tracing::info!("pm exited");
    Ok(())
}

fn init_file_logging(log_path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create pm log directory '{}'", parent.display())
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open pm log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
