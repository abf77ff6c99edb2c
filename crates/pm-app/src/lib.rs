use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use integration_shell::{
    EditorNoteEditor, ProcessCommandRunner, ShellWorkspaceLauncher, VcsResourceFetcher,
};
use pm_config::{ConfigError, PmConfig};
use pm_core::{Capabilities, CoreError, Session, ViewState, YamlDocumentStore};
use pm_ui::UiOptions;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "pm")]
#[command(about = "Keep track of projects and the contexts they belong to", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory holding Active_Projects.yaml and Contexts.yaml
    #[arg(value_name = "LOCATION")]
    pub location: Option<PathBuf>,

    /// Config file to use instead of ~/.config/pm/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Loads the config named on the command line (or through the environment)
/// and applies the `LOCATION` override.
pub fn resolve_config(cli: &Cli) -> Result<PmConfig, ConfigError> {
    let config = match &cli.config {
        Some(path) => pm_config::load_from_path(path)?,
        None => pm_config::load_from_env()?,
    };
    Ok(match &cli.location {
        Some(location) => config.with_data_dir(location),
        None => config,
    })
}

pub fn build_capabilities(config: &PmConfig) -> Result<Capabilities, CoreError> {
    let layout = config.layout();
    let tools = &config.tools;
    Ok(Capabilities {
        notes: Box::new(EditorNoteEditor::new(
            ProcessCommandRunner,
            &tools.editor,
            layout.notes_dir,
        )?),
        resources: Box::new(VcsResourceFetcher::new(
            ProcessCommandRunner,
            &tools.git,
            &tools.svn,
            &tools.opener,
            layout.repos_dir.clone(),
        )?),
        workspace: Box::new(ShellWorkspaceLauncher::new(
            ProcessCommandRunner,
            &tools.code,
            &tools.git,
            layout.repos_dir,
            layout.data_dir,
        )?),
    })
}

/// Creates the data directory if needed and loads both documents from it.
pub fn build_session(config: &PmConfig) -> Result<Session, CoreError> {
    let layout = config.layout();
    fs::create_dir_all(&layout.data_dir).map_err(|error| {
        CoreError::Persistence(format!(
            "failed to create data directory {}: {error}",
            layout.data_dir.display()
        ))
    })?;

    let documents = YamlDocumentStore::new(layout.projects_path, layout.contexts_path);
    let capabilities = build_capabilities(config)?;
    let session = Session::load(
        Box::new(documents),
        capabilities,
        ViewState::with_show_resources(config.ui.show_resources),
    )?;
    tracing::info!(
        data_dir = %layout.data_dir.display(),
        projects = session.store().projects().count(),
        "session loaded"
    );
    Ok(session)
}

pub fn ui_options(config: &PmConfig) -> UiOptions {
    let view = config.ui_view();
    UiOptions {
        scroll_step: view.scroll_step,
        poll_interval: Duration::from_millis(view.poll_interval_ms),
    }
}
