//! Sample image rasterization through ImageMagick

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::config::PreviewConfig;
use crate::constants::programs;
use crate::error::{PreviewError, PreviewResult};
use crate::font::FontId;

/// Produces a preview image file for one font
pub trait Rasterizer {
    fn render(&self, font: &FontId, config: &PreviewConfig, output: &Path) -> PreviewResult<()>;
}

/// Runs `convert` once per preview and waits for it
#[derive(Debug, Clone)]
pub struct MagickRasterizer {
    program: OsString,
}

impl Default for MagickRasterizer {
    fn default() -> Self {
        Self::new(programs::RASTERIZER)
    }
}

impl MagickRasterizer {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one invocation: centered text on a flat canvas
    pub fn args(font: &FontId, config: &PreviewConfig, output: &Path) -> Vec<OsString> {
        vec![
            "-size".into(),
            config.size.to_string().into(),
            format!("xc:{}", config.bg_color).into(),
            "-fill".into(),
            config.fg_color.to_string().into(),
            "-font".into(),
            font.as_os_str().to_os_string(),
            "-pointsize".into(),
            config.font_size.get().to_string().into(),
            "-gravity".into(),
            "center".into(),
            "-annotate".into(),
            "+0+0".into(),
            config.preview_text.clone().into(),
            "-flatten".into(),
            output.as_os_str().to_os_string(),
        ]
    }
}

impl Rasterizer for MagickRasterizer {
    fn render(&self, font: &FontId, config: &PreviewConfig, output: &Path) -> PreviewResult<()> {
        let args = Self::args(font, config, output);
        debug!(program = ?self.program, args = ?args, "Running rasterizer");

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output_status = match result {
            Ok(out) => out,
            Err(e) => {
                return Err(PreviewError::RasterizationFailure {
                    font: font.to_string(),
                    detail: format!("failed to run {}: {e}", self.program.to_string_lossy()),
                });
            }
        };

        if !output_status.status.success() {
            return Err(PreviewError::RasterizationFailure {
                font: font.to_string(),
                detail: String::from_utf8_lossy(&output_status.stderr).into_owned(),
            });
        }

        info!(font = %font, output = %output.display(), "Rendered preview image");
        Ok(())
    }
}
