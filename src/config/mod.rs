use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::directory::DEFAULT_TIMEOUT;

/// User configuration from `config.toml`.
///
/// ```toml
/// [directory]
/// url = "https://gitlab.example.com"
/// token = "glpat-..."
/// timeout_secs = 10
///
/// [identity]
/// path = "~/.ssh/id_ed25519"
///
/// [display]
/// censor = false
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub directory: DirectoryConfig,
    pub identity: IdentityConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub censor: bool,
}

impl Settings {
    /// Load from `config_path`, or from the platform config dir.
    /// A missing file yields defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = match config_path {
            Some(p) => PathBuf::from(p),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if config_path.is_some() {
                anyhow::bail!("config file '{}' not found", path.display());
            }
            return Ok(Self::default());
        }

        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        self.directory
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// `<config dir>/agelab/config.toml`
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "agelab", "agelab").map(|d| d.config_dir().join("config.toml"))
}

/// First non-empty value, in precedence order.
pub fn pick(flag_or_env: Option<&str>, file: Option<&str>) -> Option<String> {
    flag_or_env
        .filter(|s| !s.trim().is_empty())
        .or(file.filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
