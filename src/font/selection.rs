//! Font selection lines
//!
//! A candidate line is a display label optionally followed by the separator
//! and an explicit font file path, e.g. `Fira Sans Bold <- /usr/share/fonts/FiraSans-Bold.ttf`.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::selection::{FAMILY_FILLER, SEPARATOR};
use crate::error::PreviewError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSelection {
    pub label: String,
    pub path: Option<PathBuf>,
}

/// What the rasterizer receives as its font argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontId {
    File(PathBuf),
    Family(String),
}

impl FontId {
    pub fn as_os_str(&self) -> &OsStr {
        match self {
            FontId::File(path) => path.as_os_str(),
            FontId::Family(family) => OsStr::new(family),
        }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontId::File(path) => write!(f, "{}", path.display()),
            FontId::Family(family) => f.write_str(family),
        }
    }
}

impl FontSelection {
    pub fn new(label: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path,
        }
    }

    /// Selection for a font file named directly on the command line
    pub fn from_file(path: &Path) -> Self {
        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(label, Some(path.to_path_buf()))
    }

    /// Parse a candidate line as handed back by the fuzzy-finder
    pub fn parse(line: &str) -> Result<Self, PreviewError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return Err(PreviewError::EmptySelection);
        }

        match line.rsplit_once(SEPARATOR) {
            Some((label, path)) if !path.trim().is_empty() => {
                Ok(Self::new(label.trim(), Some(PathBuf::from(path.trim()))))
            }
            Some((label, _)) => Ok(Self::new(label.trim(), None)),
            None => Ok(Self::new(line.trim(), None)),
        }
    }

    /// Explicit file path wins; otherwise the label becomes a family name
    pub fn font_id(&self) -> FontId {
        match &self.path {
            Some(path) => FontId::File(path.clone()),
            None => FontId::Family(self.label.replace(' ', &FAMILY_FILLER.to_string())),
        }
    }

    /// Format as a candidate line for the fuzzy-finder
    pub fn to_line(&self) -> String {
        match &self.path {
            Some(path) => format!("{}{}{}", self.label, SEPARATOR, path.display()),
            None => self.label.clone(),
        }
    }
}
