//! Application configuration for Runoff.
//!
//! User config lives at `~/.runoff/runoff.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunoffError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "runoff.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".runoff";

// ---------------------------------------------------------------------------
// Config structs (matching runoff.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scenario parameter defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External toolkit settings.
    #[serde(default)]
    pub toolkit: ToolkitConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default uniform rainfall rate (mm/hr).
    #[serde(default = "default_rainfall_rate")]
    pub rainfall_rate: f64,

    /// Default simulation worker count.
    #[serde(default = "default_nprocs")]
    pub nprocs: u32,

    /// Default minimum depth (m) retained when filtering is requested.
    #[serde(default = "default_min_depth")]
    pub min_depth: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            rainfall_rate: default_rainfall_rate(),
            nprocs: default_nprocs(),
            min_depth: default_min_depth(),
        }
    }
}

fn default_rainfall_rate() -> f64 {
    10.0
}
fn default_nprocs() -> u32 {
    30
}
fn default_min_depth() -> f64 {
    0.01
}

/// `[toolkit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// GRASS launcher binary (name on PATH or absolute path).
    #[serde(default = "default_grass_bin")]
    pub grass_bin: String,

    /// GRASS project (location) directory the scenarios run against.
    /// Empty means "must be supplied on the command line".
    #[serde(default)]
    pub project: String,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            grass_bin: default_grass_bin(),
            project: String::new(),
        }
    }
}

fn default_grass_bin() -> String {
    "grass".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.runoff/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RunoffError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.runoff/runoff.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RunoffError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RunoffError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RunoffError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RunoffError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RunoffError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the GRASS project directory from an optional CLI override and
/// the loaded config. Errors if neither supplies one.
pub fn resolve_project(cli_project: Option<&str>, config: &AppConfig) -> Result<PathBuf> {
    let project = match cli_project {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => config.toolkit.project.clone(),
    };

    if project.is_empty() {
        return Err(RunoffError::config(
            "no GRASS project configured. Pass --project or set toolkit.project in runoff.toml",
        ));
    }

    Ok(PathBuf::from(project))
}
