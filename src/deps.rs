//! External program checks
//!
//! Every helper program is looked up once before anything is spawned, so a
//! missing tool is reported by name instead of as a failed spawn mid-session.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::programs;
use crate::error::{PreviewError, PreviewResult};

/// Programs needed by the interactive finder mode
pub const INTERACTIVE: &[&str] = &[programs::FUZZY_FINDER, programs::RASTERIZER, programs::VIEWER];

/// Programs needed to preview font files directly
pub const DIRECT: &[&str] = &[programs::RASTERIZER, programs::VIEWER];

/// Fail with [`PreviewError::MissingDependency`] on the first program not on `PATH`
pub fn require(required: &[&str]) -> PreviewResult<()> {
    let path = std::env::var_os("PATH").unwrap_or_default();
    require_in(required, &path)
}

fn require_in(required: &[&str], path: &OsStr) -> PreviewResult<()> {
    for program in required {
        match find_program(program, path) {
            Some(found) => debug!(program, path = %found.display(), "Found dependency"),
            None => {
                return Err(PreviewError::MissingDependency {
                    program: program.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn find_program(program: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fontpreview-deps-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(unix)]
    fn write_program(dir: &Path, name: &str, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_executables_across_path_entries() {
        let first = scratch_dir("first");
        let second = scratch_dir("second");
        write_program(&first, "fzf", 0o755);
        write_program(&second, "convert", 0o755);
        write_program(&second, "sxiv", 0o755);

        let path = std::env::join_paths([&first, &second]).unwrap();
        assert!(require_in(INTERACTIVE, &path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_missing() {
        let dir = scratch_dir("noexec");
        write_program(&dir, "convert", 0o755);
        write_program(&dir, "sxiv", 0o644);

        let err = require_in(DIRECT, dir.as_os_str()).unwrap_err();
        assert!(matches!(err, PreviewError::MissingDependency { ref program } if program == "sxiv"));
    }

    #[test]
    fn test_empty_path_reports_first_program() {
        let err = require_in(INTERACTIVE, &OsString::new()).unwrap_err();
        assert!(matches!(err, PreviewError::MissingDependency { ref program } if program == "fzf"));
    }

    #[test]
    fn test_direct_mode_does_not_need_finder() {
        assert!(!DIRECT.contains(&programs::FUZZY_FINDER));
        assert!(INTERACTIVE.contains(&programs::FUZZY_FINDER));
    }
}
