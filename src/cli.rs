//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::constants::env;

/// Fuzzy-search installed fonts and preview them in an image viewer
#[derive(Debug, Parser)]
#[command(name = "fontpreview", version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Background color of the preview image, as #rrggbb
    #[arg(short = 'b', long, value_name = "COLOR", env = env::BG_COLOR)]
    pub bg_color: Option<String>,

    /// Text color of the preview image, as #rrggbb
    #[arg(short = 'f', long, value_name = "COLOR", env = env::FG_COLOR)]
    pub fg_color: Option<String>,

    /// Point size of the sample text
    #[arg(short = 's', long, value_name = "POINTS", env = env::FONT_SIZE)]
    pub font_size: Option<u32>,

    /// Viewer window location, as +X+Y
    #[arg(short = 'l', long, value_name = "+X+Y", allow_hyphen_values = true, env = env::LOCATION)]
    pub location: Option<String>,

    /// Where to write the rendered preview image
    #[arg(short = 'o', long, value_name = "PATH", env = env::OUTPUT)]
    pub output: Option<PathBuf>,

    /// Fuzzy-finder prompt
    #[arg(short = 'p', long, value_name = "PROMPT", env = env::SEARCH_PROMPT)]
    pub prompt: Option<String>,

    /// Preview image size, as WxH
    #[arg(short = 'z', long, value_name = "WxH", env = env::SIZE)]
    pub size: Option<String>,

    /// Sample text; a literal \n starts a new line
    #[arg(short = 't', long, value_name = "TEXT", env = env::PREVIEW_TEXT)]
    pub text: Option<String>,

    /// Fuzzy-finder event or key that shows a preview
    #[arg(long, value_name = "EVENT", env = env::TRIGGER)]
    pub trigger: Option<String>,

    /// Alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Preview these font files instead of searching installed fonts
    #[arg(value_name = "FONT_FILE")]
    pub fonts: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Forward a highlighted finder line to a running session
    #[command(name = "__preview", hide = true)]
    Preview {
        #[arg(long)]
        socket: PathBuf,

        #[arg(allow_hyphen_values = true)]
        selection: String,
    },
}

impl Cli {
    /// The flag/environment layer, highest priority
    pub fn settings(&self) -> Settings {
        Settings {
            bg_color: self.bg_color.clone(),
            fg_color: self.fg_color.clone(),
            size: self.size.clone(),
            location: self.location.clone(),
            font_size: self.font_size,
            preview_text: self.text.clone(),
            search_prompt: self.prompt.clone(),
            output: self.output.clone(),
            trigger: self.trigger.clone(),
        }
    }
}
