//! On-disk settings file
//!
//! Optional JSON file under the XDG config directory. Every field is optional;
//! anything missing falls through to the built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::paths;
use crate::error::PreviewError;

/// One layer of raw, unvalidated settings.
///
/// Used both for the config file and for the CLI/env layer so the two can be
/// merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bg_color: Option<String>,
    pub fg_color: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub font_size: Option<u32>,
    pub preview_text: Option<String>,
    pub search_prompt: Option<String>,
    pub output: Option<PathBuf>,
    pub trigger: Option<String>,
}

impl Settings {
    /// Default config path: `$XDG_CONFIG_HOME/fontpreview/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::CONFIG_FILENAME);
        path
    }

    /// Load settings from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to read config file {}", path.display()));
            }
        };

        let settings = Self::parse(&contents).map_err(|e| PreviewError::InvalidConfiguration {
            field: "config file",
            value: format!("{} ({e})", path.display()),
            expected: "a JSON object with known fontpreview keys",
        })?;
        info!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }

    /// Overlay `self` on top of `lower`: fields set here win.
    pub fn over(self, lower: Settings) -> Settings {
        Settings {
            bg_color: self.bg_color.or(lower.bg_color),
            fg_color: self.fg_color.or(lower.fg_color),
            size: self.size.or(lower.size),
            location: self.location.or(lower.location),
            font_size: self.font_size.or(lower.font_size),
            preview_text: self.preview_text.or(lower.preview_text),
            search_prompt: self.search_prompt.or(lower.search_prompt),
            output: self.output.or(lower.output),
            trigger: self.trigger.or(lower.trigger),
        }
    }
}
