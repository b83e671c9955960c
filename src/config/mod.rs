use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::table::DEFAULT_INDENT_WIDTH;

const DEFAULT_SPEAKER_POOL: usize = 5;

/// Top-level chatlog config file structure. Every field is optional; a
/// missing file means all defaults.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ChatlogConfig {
    /// Spaces per reply level in the threaded view.
    pub indent_width: Option<usize>,
    /// Number of pre-allocated speakers seeded into a fresh transcript.
    pub speaker_pool: Option<usize>,
    /// Default output format: "table" or "json".
    pub output: Option<String>,
}

impl ChatlogConfig {
    /// Load config from `path`, or from ~/.chatlog/config.toml when no
    /// override is given. A missing file is not an error.
    pub fn load(path_override: Option<&Path>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        if !path.exists() {
            return Ok(ChatlogConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: ChatlogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn indent_width(&self) -> usize {
        self.indent_width.unwrap_or(DEFAULT_INDENT_WIDTH)
    }

    /// Fixed-pool size, clamped to the 26 available speaker ids.
    pub fn speaker_pool(&self) -> usize {
        self.speaker_pool.unwrap_or(DEFAULT_SPEAKER_POOL).min(26)
    }

    /// True when the configured default output format is JSON.
    pub fn json_by_default(&self) -> bool {
        self.output.as_deref() == Some("json")
    }

    /// Effective settings, one per line, for `chatlog config`.
    pub fn display(&self) -> String {
        format!(
            "indent_width = {}\nspeaker_pool = {}\noutput = \"{}\"",
            self.indent_width(),
            self.speaker_pool(),
            self.output.as_deref().unwrap_or("table"),
        )
    }
}

/// Path to the config file: ~/.chatlog/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".chatlog").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.chatlog/config.toml

# Spaces per reply level in `chatlog show`
# indent_width = 4

# Speakers pre-allocated for a fresh (empty) chat block, max 26
# speaker_pool = 5

# Default output format: "table" or "json"
# output = "table"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}
