//! Application-wide constants
//!
//! Defaults, external program names and timing values live here so the rest
//! of the crate never hardcodes them.

/// External programs the tool shells out to
pub mod programs {
    /// Fuzzy-finder driving the interactive session
    pub const FUZZY_FINDER: &str = "fzf";

    /// ImageMagick rasterizer
    pub const RASTERIZER: &str = "convert";

    /// Image viewer showing the rendered sample
    pub const VIEWER: &str = "sxiv";
}

/// Built-in configuration defaults (lowest precedence)
pub mod defaults {
    pub const BG_COLOR: &str = "#ffffff";
    pub const FG_COLOR: &str = "#000000";
    pub const SIZE: &str = "532x365";
    pub const LOCATION: &str = "+0+0";
    pub const FONT_SIZE: u32 = 38;
    pub const SEARCH_PROMPT: &str = "❯ ";

    /// Fuzzy-finder event that fires whenever the highlighted line changes
    pub const TRIGGER: &str = "focus";

    /// Escaped newlines are expanded by the rasterizer's annotate option
    pub const PREVIEW_TEXT: &str = "ABCDEFGHIJKLM\\nNOPQRSTUVWXYZ\\n\
abcdefghijklm\\nnopqrstuvwxyz\\n1234567890\\n!@$\\%(){}[]";
}

/// Font selection line format
pub mod selection {
    /// Joins a display label and a font file path; never occurs in family names
    pub const SEPARATOR: &str = " <- ";

    /// Replaces spaces when a label is turned into a family identifier
    pub const FAMILY_FILLER: char = '-';
}

/// Viewer lifecycle timing
pub mod timing {
    use std::time::Duration;

    /// Hard ceiling for the viewer to appear and take focus
    pub const FOCUS_HANDOFF_TIMEOUT: Duration = Duration::from_secs(3);

    /// Sleep between liveness/focus checks
    pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

    /// How long a viewer gets to exit after SIGTERM before it is killed outright
    pub const TERMINATE_GRACE: Duration = Duration::from_secs(1);

    /// Sleep between non-blocking accept attempts on the IPC socket
    pub const ACCEPT_INTERVAL: Duration = Duration::from_millis(25);
}

/// Filesystem locations
pub mod paths {
    /// Directory under the XDG config/runtime dirs
    pub const APP_DIR: &str = "fontpreview";

    /// Config file name inside the config directory
    pub const CONFIG_FILENAME: &str = "config.json";
}

/// Environment variables read by the CLI layer
pub mod env {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const BG_COLOR: &str = "FONTPREVIEW_BG_COLOR";
    pub const FG_COLOR: &str = "FONTPREVIEW_FG_COLOR";
    pub const FONT_SIZE: &str = "FONTPREVIEW_FONT_SIZE";
    pub const LOCATION: &str = "FONTPREVIEW_POSITION";
    pub const OUTPUT: &str = "FONTPREVIEW_OUTPUT";
    pub const SEARCH_PROMPT: &str = "FONTPREVIEW_SEARCH_PROMPT";
    pub const SIZE: &str = "FONTPREVIEW_SIZE";
    pub const PREVIEW_TEXT: &str = "FONTPREVIEW_PREVIEW_TEXT";
    pub const TRIGGER: &str = "FONTPREVIEW_TRIGGER";
}

/// Fuzzy-finder exit codes that mean "nothing chosen" rather than failure
pub mod finder_exit {
    pub const NO_MATCH: i32 = 1;
    pub const INTERRUPTED: i32 = 130;
}
