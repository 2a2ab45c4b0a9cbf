//! Viewer process launching and control

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::constants::programs;
use crate::error::{PreviewError, PreviewResult};
use crate::types::Geometry;

/// Observed state of a viewer process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Reaped; `None` when killed by a signal
    Exited(Option<i32>),
}

/// Handle to one launched viewer
pub trait ViewerProcess {
    fn pid(&self) -> u32;

    /// Non-blocking liveness check; reaps the process if it has exited
    fn state(&mut self) -> io::Result<ProcessState>;

    /// Ask the process to exit (SIGTERM)
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the process to exit (SIGKILL)
    fn kill(&mut self) -> io::Result<()>;

    /// Block until the process has exited and return its exit code
    fn wait(&mut self) -> io::Result<Option<i32>>;
}

/// Something that can show an image in a window
pub trait Viewer {
    /// Start a detached viewer showing `image`
    fn launch(&self, image: &Path, geometry: &Geometry) -> PreviewResult<Box<dyn ViewerProcess>>;
}

/// Borderless `sxiv` window placed with an X geometry string
#[derive(Debug, Clone)]
pub struct SxivViewer {
    program: OsString,
}

impl Default for SxivViewer {
    fn default() -> Self {
        Self::new(programs::VIEWER)
    }
}

impl SxivViewer {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(image: &Path, geometry: &Geometry) -> Vec<OsString> {
        vec![
            "-b".into(),
            "-g".into(),
            geometry.to_string().into(),
            image.as_os_str().to_os_string(),
        ]
    }
}

impl Viewer for SxivViewer {
    fn launch(&self, image: &Path, geometry: &Geometry) -> PreviewResult<Box<dyn ViewerProcess>> {
        let mut command = Command::new(&self.program);
        command
            .args(Self::args(image, geometry))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Own process group: terminal interrupts go to the session, which reaps the viewer itself
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PreviewError::MissingDependency {
                program: self.program.to_string_lossy().into_owned(),
            },
            _ => PreviewError::Io(e),
        })?;
        debug!(pid = child.id(), image = %image.display(), geometry = %geometry, "Spawned viewer");
        Ok(Box::new(ChildProcess { child }))
    }
}

/// [`ViewerProcess`] backed by a real child process
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

impl ViewerProcess for ChildProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn state(&mut self) -> io::Result<ProcessState> {
        Ok(match self.child.try_wait()? {
            Some(status) => ProcessState::Exited(status.code()),
            None => ProcessState::Running,
        })
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = i32::try_from(self.child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            // Already gone (exited, waiting to be reaped)
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }

    fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.wait()?.code())
    }
}
