use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PM_CONFIG: &str = "PM_CONFIG";

const DEFAULT_PROJECTS_FILE: &str = "Active_Projects.yaml";
const DEFAULT_CONTEXTS_FILE: &str = "Contexts.yaml";
const DEFAULT_NOTES_DIR: &str = "notes";
const DEFAULT_REPOS_DIR: &str = "repos";
const DEFAULT_EDITOR: &str = "vi";
const DEFAULT_GIT_BINARY: &str = "git";
const DEFAULT_SVN_BINARY: &str = "svn";
const DEFAULT_CODE_BINARY: &str = "code";
const DEFAULT_SHOW_RESOURCES: bool = false;
const DEFAULT_UI_SCROLL_STEP: usize = 10;
const DEFAULT_UI_POLL_INTERVAL_MS: u64 = 250;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FILE: &str = "pm.log";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[cfg(target_os = "macos")]
const DEFAULT_OPENER_BINARY: &str = "open";
#[cfg(not(target_os = "macos"))]
const DEFAULT_OPENER_BINARY: &str = "xdg-open";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PmConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_projects_file")]
    pub projects_file: String,
    #[serde(default = "default_contexts_file")]
    pub contexts_file: String,
    #[serde(default = "default_notes_dir")]
    pub notes_dir: String,
    #[serde(default = "default_repos_dir")]
    pub repos_dir: String,
    #[serde(default)]
    pub tools: ToolsConfigToml,
    #[serde(default)]
    pub ui: UiConfigToml,
    #[serde(default)]
    pub logging: LoggingConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsConfigToml {
    #[serde(default = "default_editor")]
    pub editor: String,
    #[serde(default = "default_git_binary")]
    pub git: String,
    #[serde(default = "default_svn_binary")]
    pub svn: String,
    #[serde(default = "default_opener_binary")]
    pub opener: String,
    #[serde(default = "default_code_binary")]
    pub code: String,
}

impl Default for ToolsConfigToml {
    fn default() -> Self {
        Self {
            editor: default_editor(),
            git: default_git_binary(),
            svn: default_svn_binary(),
            opener: default_opener_binary(),
            code: default_code_binary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfigToml {
    #[serde(default = "default_show_resources")]
    pub show_resources: bool,
    #[serde(default = "default_ui_scroll_step")]
    pub scroll_step: usize,
    #[serde(default = "default_ui_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for UiConfigToml {
    fn default() -> Self {
        Self {
            show_resources: default_show_resources(),
            scroll_step: default_ui_scroll_step(),
            poll_interval_ms: default_ui_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfigToml {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfigToml {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Resolved filesystem locations. Relative entries in the config are taken
/// relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub projects_path: PathBuf,
    pub contexts_path: PathBuf,
    pub notes_dir: PathBuf,
    pub repos_dir: PathBuf,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiViewConfig {
    pub show_resources: bool,
    pub scroll_step: usize,
    pub poll_interval_ms: u64,
}

impl PmConfig {
    /// Replaces the data directory, as the `LOCATION` argument does.
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = absolutize_path(data_dir.as_ref().to_path_buf())
            .to_string_lossy()
            .to_string();
        self
    }

    pub fn layout(&self) -> DataLayout {
        let data_dir = PathBuf::from(&self.data_dir);
        DataLayout {
            projects_path: resolve_in(&data_dir, &self.projects_file),
            contexts_path: resolve_in(&data_dir, &self.contexts_file),
            notes_dir: resolve_in(&data_dir, &self.notes_dir),
            repos_dir: resolve_in(&data_dir, &self.repos_dir),
            log_path: resolve_in(log_base(&data_dir), &self.logging.file),
            data_dir,
        }
    }

    pub fn ui_view(&self) -> UiViewConfig {
        UiViewConfig {
            show_resources: self.ui.show_resources,
            scroll_step: self.ui.scroll_step,
            poll_interval_ms: self.ui.poll_interval_ms,
        }
    }
}

impl Default for PmConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            projects_file: default_projects_file(),
            contexts_file: default_contexts_file(),
            notes_dir: default_notes_dir(),
            repos_dir: default_repos_dir(),
            tools: ToolsConfigToml::default(),
            ui: UiConfigToml::default(),
            logging: LoggingConfigToml::default(),
        }
    }
}

pub fn load_from_env() -> Result<PmConfig, ConfigError> {
    let path = config_path_from_env()?;
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PmConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home.join(".config").join("pm").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_PM_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration("PM_CONFIG contained invalid UTF-8")),
    }
}

// Relative log paths resolve beside the data directory, outside what backup commits.
fn log_base(data_dir: &Path) -> &Path {
    data_dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(data_dir)
}

fn resolve_in(base: &Path, entry: &str) -> PathBuf {
    let entry = Path::new(entry);
    if entry.is_absolute() {
        entry.to_path_buf()
    } else {
        base.join(entry)
    }
}

fn resolve_data_local_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = resolve_home_dir() {
            return home.join("Library").join("Application Support");
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if let Ok(path) = std::env::var("XDG_DATA_HOME") {
            let path = path.trim();
            if !path.is_empty() {
                return absolutize_path(PathBuf::from(path));
            }
        }
        if let Some(home) = resolve_home_dir() {
            return home.join(".local").join("share");
        }
    }

    std::env::temp_dir()
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn absolutize_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }

    if let Ok(current) = std::env::current_dir() {
        return current.join(path);
    }

    std::env::temp_dir().join(path)
}

fn default_data_dir() -> String {
    resolve_data_local_dir()
        .join("pm")
        .to_string_lossy()
        .to_string()
}

fn default_projects_file() -> String {
    DEFAULT_PROJECTS_FILE.to_owned()
}

fn default_contexts_file() -> String {
    DEFAULT_CONTEXTS_FILE.to_owned()
}

fn default_notes_dir() -> String {
    DEFAULT_NOTES_DIR.to_owned()
}

fn default_repos_dir() -> String {
    DEFAULT_REPOS_DIR.to_owned()
}

fn default_editor() -> String {
    std::env::var("EDITOR")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_owned())
}

fn default_git_binary() -> String {
    DEFAULT_GIT_BINARY.to_owned()
}

fn default_svn_binary() -> String {
    DEFAULT_SVN_BINARY.to_owned()
}

fn default_opener_binary() -> String {
    DEFAULT_OPENER_BINARY.to_owned()
}

fn default_code_binary() -> String {
    DEFAULT_CODE_BINARY.to_owned()
}

fn default_show_resources() -> bool {
    DEFAULT_SHOW_RESOURCES
}

fn default_ui_scroll_step() -> usize {
    DEFAULT_UI_SCROLL_STEP
}

fn default_ui_poll_interval_ms() -> u64 {
    DEFAULT_UI_POLL_INTERVAL_MS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_owned()
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_owned()
}

fn persist_config(path: &Path, config: &PmConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize PM_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write PM_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<PmConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for PM_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = PmConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read PM_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: PmConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse PM_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    if normalize_config(&mut config) {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut PmConfig) -> bool {
    let mut changed = false;

    changed |= normalize_non_empty_string(&mut config.data_dir, default_data_dir());
    changed |= normalize_non_empty_string(&mut config.projects_file, default_projects_file());
    changed |= normalize_non_empty_string(&mut config.contexts_file, default_contexts_file());
    changed |= normalize_non_empty_string(&mut config.notes_dir, default_notes_dir());
    changed |= normalize_non_empty_string(&mut config.repos_dir, default_repos_dir());
    changed |= normalize_tools_config(&mut config.tools);
    changed |= normalize_ui_config(&mut config.ui);
    changed |= normalize_logging_config(&mut config.logging);

    changed
}

pub fn normalize_tools_config(config: &mut ToolsConfigToml) -> bool {
    let mut changed = false;
    changed |= normalize_non_empty_string(&mut config.editor, default_editor());
    changed |= normalize_non_empty_string(&mut config.git, default_git_binary());
    changed |= normalize_non_empty_string(&mut config.svn, default_svn_binary());
    changed |= normalize_non_empty_string(&mut config.opener, default_opener_binary());
    changed |= normalize_non_empty_string(&mut config.code, default_code_binary());
    changed
}

pub fn normalize_ui_config(config: &mut UiConfigToml) -> bool {
    let mut changed = false;

    let scroll_step = config.scroll_step.clamp(1, 100);
    if scroll_step != config.scroll_step {
        config.scroll_step = scroll_step;
        changed = true;
    }

    let poll_interval_ms = config.poll_interval_ms.clamp(16, 2_000);
    if poll_interval_ms != config.poll_interval_ms {
        config.poll_interval_ms = poll_interval_ms;
        changed = true;
    }

    changed
}

pub fn normalize_logging_config(config: &mut LoggingConfigToml) -> bool {
    let mut changed = false;

    let level = normalize_log_level(&config.level);
    if level != config.level {
        config.level = level;
        changed = true;
    }
    changed |= normalize_non_empty_string(&mut config.file, default_log_file());

    changed
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_log_level(value: &str) -> String {
    let candidate = value.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&candidate.as_str()) {
        candidate
    } else {
        default_log_level()
    }
}
