use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config_version: u32,
    /// Directory the session opens in. The current directory when unset.
    pub start_dir: Option<PathBuf>,
    pub show_hidden: bool,
    pub preview_max_bytes: usize,
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: 1,
            start_dir: None,
            show_hidden: false,
            preview_max_bytes: 64 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_or_default() -> Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let parsed = toml::from_str::<AppConfig>(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        Ok(parsed)
    }

    /// A first command-line argument wins over `start_dir`.
    pub fn resolve_start_dir(&self, cli_arg: Option<PathBuf>) -> Result<PathBuf> {
        let dir = match cli_arg.or_else(|| self.start_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir().context("failed to read current directory")?,
        };
        fs::canonicalize(&dir)
            .with_context(|| format!("failed to open start directory: {}", dir.display()))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not resolve config directory")?;
    Ok(base.join("dirpilot").join("config.toml"))
}
