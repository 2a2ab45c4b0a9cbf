//! Preview viewer lifecycle
//!
//! [`ViewerManager`] owns at most one running viewer. Every new preview first
//! terminates and reaps the previous viewer, then renders, launches, waits for
//! the viewer window to take focus and hands focus back to the session window.
//! Dropping the manager tears down whatever is still running.

mod process;

pub use process::{ProcessState, SxivViewer, Viewer, ViewerProcess};

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::PreviewConfig;
use crate::constants::timing;
use crate::error::{PreviewError, PreviewResult};
use crate::font::FontSelection;
use crate::render::Rasterizer;
use crate::x11_utils::{WindowFocus, WindowId};

/// The live viewer and the image it shows
pub struct PreviewHandle {
    process: Box<dyn ViewerProcess>,
    image: PathBuf,
}

impl PreviewHandle {
    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    pub fn image(&self) -> &Path {
        &self.image
    }
}

pub struct ViewerManager<R: Rasterizer, V: Viewer, F: WindowFocus> {
    rasterizer: R,
    viewer: V,
    focus: F,
    config: PreviewConfig,
    self_window: WindowId,
    handle: Option<PreviewHandle>,
    handoff_timeout: Duration,
    poll_interval: Duration,
    terminate_grace: Duration,
}

impl<R: Rasterizer, V: Viewer, F: WindowFocus> ViewerManager<R, V, F> {
    /// Captures the current foreground window as the one to return focus to
    pub fn new(rasterizer: R, viewer: V, focus: F, config: PreviewConfig) -> PreviewResult<Self> {
        let self_window = focus.active_window()?;
        info!(window = self_window, "Captured session window");
        Ok(Self {
            rasterizer,
            viewer,
            focus,
            config,
            self_window,
            handle: None,
            handoff_timeout: timing::FOCUS_HANDOFF_TIMEOUT,
            poll_interval: timing::POLL_INTERVAL,
            terminate_grace: timing::TERMINATE_GRACE,
        })
    }

    #[cfg(test)]
    pub fn with_timing(mut self, handoff_timeout: Duration, poll_interval: Duration) -> Self {
        self.handoff_timeout = handoff_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn self_window(&self) -> WindowId {
        self.self_window
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&PreviewHandle> {
        self.handle.as_ref()
    }

    /// Replace any running preview with one for `selection`, rendered to `output`
    pub fn show_preview(&mut self, selection: &FontSelection, output: &Path) -> PreviewResult<()> {
        self.kill_preview()?;

        let font = selection.font_id();
        self.rasterizer.render(&font, &self.config, output)?;

        let mut process = self.viewer.launch(output, &self.config.geometry())?;
        let pid = process.pid();
        info!(pid = pid, font = %font, image = %output.display(), "Launched preview viewer");

        let handoff = self.wait_for_handoff(process.as_mut());
        // Track before looking at the result so a focus error still leaves it reapable
        self.handle = Some(PreviewHandle {
            process,
            image: output.to_path_buf(),
        });

        match handoff? {
            ProcessState::Running => {
                self.focus.activate(self.self_window)?;
                debug!(pid = pid, window = self.self_window, "Returned focus to session window");
                Ok(())
            }
            ProcessState::Exited(code) => {
                // Already reaped by the liveness check
                self.handle = None;
                error!(pid = pid, code = ?code, "Preview viewer exited before becoming visible");
                Err(PreviewError::ViewerCrash { code })
            }
        }
    }

    /// Stop the running preview, if any. Safe to call repeatedly.
    pub fn kill_preview(&mut self) -> PreviewResult<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        let pid = handle.pid();
        info!(pid = pid, image = %handle.image().display(), "Stopping preview viewer");
        let code = terminate_and_reap(handle.process.as_mut(), self.terminate_grace, self.poll_interval)?;
        debug!(pid = pid, code = ?code, "Preview viewer reaped");
        Ok(())
    }

    /// Poll until the viewer is alive and has taken focus, the deadline passes,
    /// or the viewer exits. Returns the last observed state.
    fn wait_for_handoff(&self, process: &mut dyn ViewerProcess) -> PreviewResult<ProcessState> {
        let deadline = Instant::now() + self.handoff_timeout;
        loop {
            let state = process.state()?;
            if let ProcessState::Exited(_) = state {
                return Ok(state);
            }
            if self.focus.active_window()? != self.self_window {
                return Ok(state);
            }
            if Instant::now() >= deadline {
                warn!(
                    pid = process.pid(),
                    timeout_ms = self.handoff_timeout.as_millis() as u64,
                    "Viewer did not take focus before the deadline"
                );
                return Ok(state);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl<R: Rasterizer, V: Viewer, F: WindowFocus> Drop for ViewerManager<R, V, F> {
    fn drop(&mut self) {
        if let Err(err) = self.kill_preview() {
            error!(error = %err, "Failed to stop preview viewer during teardown");
        }
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL. Always reaps, even when the
/// graceful path fails; that failure is still returned.
pub(crate) fn terminate_and_reap(
    process: &mut dyn ViewerProcess,
    grace: Duration,
    poll_interval: Duration,
) -> PreviewResult<Option<i32>> {
    match terminate_gracefully(process, grace, poll_interval) {
        Ok(code) => Ok(code),
        Err(err) => {
            warn!(pid = process.pid(), error = %err, "Graceful viewer shutdown failed, killing it");
            if let Err(e) = process.kill().and_then(|()| process.wait()) {
                error!(pid = process.pid(), error = %e, "Failed to kill viewer");
            }
            Err(err)
        }
    }
}

fn terminate_gracefully(
    process: &mut dyn ViewerProcess,
    grace: Duration,
    poll_interval: Duration,
) -> PreviewResult<Option<i32>> {
    process.terminate()?;
    let deadline = Instant::now() + grace;
    loop {
        if let ProcessState::Exited(code) = process.state()? {
            return Ok(code);
        }
        if Instant::now() >= deadline {
            warn!(pid = process.pid(), "Viewer ignored SIGTERM, killing it");
            process.kill()?;
            return Ok(process.wait()?);
        }
        thread::sleep(poll_interval);
    }
}
