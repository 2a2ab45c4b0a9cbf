//! Configuration management for fontpreview
//!
//! Settings are layered (CLI flag > environment > config file > defaults) and
//! validated exactly once into an immutable [`PreviewConfig`].

pub mod settings;

pub use settings::Settings;

use std::path::PathBuf;

use crate::constants::defaults;
use crate::error::PreviewError;
use crate::types::{Dimensions, Geometry, HexColor, Location, PointSize};

/// Validated configuration, read-only after startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub bg_color: HexColor,
    pub fg_color: HexColor,
    pub size: Dimensions,
    pub location: Location,
    pub font_size: PointSize,
    pub preview_text: String,
    pub search_prompt: String,
    pub output: PathBuf,
    /// True when `output` is a per-session temp file that must be removed at teardown
    pub output_is_temporary: bool,
    pub trigger: String,
}

impl PreviewConfig {
    /// Validate merged settings, filling gaps from built-in defaults
    pub fn from_settings(settings: Settings) -> Result<Self, PreviewError> {
        let bg_color = HexColor::parse(
            "background color",
            settings.bg_color.as_deref().unwrap_or(defaults::BG_COLOR),
        )?;
        let fg_color = HexColor::parse(
            "foreground color",
            settings.fg_color.as_deref().unwrap_or(defaults::FG_COLOR),
        )?;
        let size = Dimensions::parse("size", settings.size.as_deref().unwrap_or(defaults::SIZE))?;
        let location = Location::parse(
            "location",
            settings.location.as_deref().unwrap_or(defaults::LOCATION),
        )?;
        let font_size = PointSize::new("font size", settings.font_size.unwrap_or(defaults::FONT_SIZE))?;
        let trigger = settings.trigger.unwrap_or_else(|| defaults::TRIGGER.to_string());
        validate_trigger(&trigger)?;

        let (output, output_is_temporary) = match settings.output {
            Some(path) => (path, false),
            None => (session_temp_image(), true),
        };

        Ok(Self {
            bg_color,
            fg_color,
            size,
            location,
            font_size,
            preview_text: settings
                .preview_text
                .unwrap_or_else(|| defaults::PREVIEW_TEXT.to_string()),
            search_prompt: settings
                .search_prompt
                .unwrap_or_else(|| defaults::SEARCH_PROMPT.to_string()),
            output,
            output_is_temporary,
            trigger,
        })
    }

    /// Viewer window geometry: canvas size at the configured location
    pub fn geometry(&self) -> Geometry {
        Geometry {
            size: self.size,
            location: self.location,
        }
    }
}

/// Per-process temp image path
fn session_temp_image() -> PathBuf {
    std::env::temp_dir().join(format!("fontpreview-{}.png", std::process::id()))
}

/// Trigger names are fuzzy-finder key/event names such as `focus` or `ctrl-p`
fn validate_trigger(trigger: &str) -> Result<(), PreviewError> {
    let valid = !trigger.is_empty()
        && trigger
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PreviewError::InvalidConfiguration {
            field: "trigger",
            value: trigger.to_string(),
            expected: "a key or event name like focus, tab or ctrl-p",
        })
    }
}
