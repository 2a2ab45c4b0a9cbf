use std::path::PathBuf;

use thiserror::Error;

/// Every failure the tool can report. All of them end the session.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("required program '{program}' was not found in PATH")]
    MissingDependency { program: String },

    #[error("invalid {field} '{value}', expected {expected}")]
    InvalidConfiguration {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to render a preview for '{font}'; is the rasterizer missing a font backend (freetype, ghostscript)?")]
    RasterizationFailure { font: String, detail: String },

    #[error("preview viewer exited before it became visible (exit status: {})", describe_code(*.code))]
    ViewerCrash { code: Option<i32> },

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("empty font selection")]
    EmptySelection,

    #[error("font file '{}' does not exist", .0.display())]
    MissingFontFile(PathBuf),

    #[error("window focus error: {0}")]
    Focus(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    /// Extra lines printed under the main error message
    pub fn detail_lines(&self) -> Vec<String> {
        match self {
            PreviewError::RasterizationFailure { detail, .. } => detail
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}

pub type PreviewResult<T> = Result<T, PreviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_crash_message_includes_code() {
        let err = PreviewError::ViewerCrash { code: Some(2) };
        assert!(err.to_string().contains("exit status: 2"));

        let err = PreviewError::ViewerCrash { code: None };
        assert!(err.to_string().contains("killed by signal"));
    }

    #[test]
    fn test_rasterization_detail_lines_skip_blank_output() {
        let err = PreviewError::RasterizationFailure {
            font: "Foo".to_string(),
            detail: "convert: unable to read font\n\n  delegate missing  \n".to_string(),
        };
        assert_eq!(
            err.detail_lines(),
            vec!["convert: unable to read font".to_string(), "  delegate missing".to_string()]
        );
    }
}
