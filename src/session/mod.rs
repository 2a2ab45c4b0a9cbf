//! Interactive session driver and direct file previews
//!
//! The session runs the fuzzy-finder, serves preview requests coming back
//! from its key binding, and guarantees teardown on every exit path.

mod finder;
mod ipc_handler;

pub use finder::{Finder, FinderOutcome, FzfProcess};
pub use ipc_handler::{spawn_ipc_listener, IpcListener, PendingPreview};

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::config::PreviewConfig;
use crate::constants::timing;
use crate::error::PreviewError;
use crate::font::{self, FontSelection};
use crate::ipc::{self, PreviewClient, PreviewRequest, PreviewResponse, PreviewServer};
use crate::render::{MagickRasterizer, Rasterizer};
use crate::viewer::{ProcessState, SxivViewer, Viewer, ViewerManager};
use crate::x11_utils::{WindowFocus, X11Focus};

/// Turn SIGINT/SIGTERM/SIGHUP into a flag the session loops poll
#[cfg(unix)]
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM, SIGHUP] {
        signal_hook::flag::register(signal, flag.clone())
            .context(format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(flag)
}

#[cfg(not(unix))]
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    Ok(Arc::new(AtomicBool::new(false)))
}

/// Everything a running session owns. Dropping it tears the session down.
pub struct Session<R: Rasterizer, V: Viewer, F: WindowFocus, Fd: Finder> {
    manager: ViewerManager<R, V, F>,
    requests: Option<mpsc::Receiver<PendingPreview>>,
    listener: Option<IpcListener>,
    finder: Option<Fd>,
    interrupted: Arc<AtomicBool>,
    temp_image: Option<PathBuf>,
}

impl<R: Rasterizer, V: Viewer, F: WindowFocus, Fd: Finder> Session<R, V, F, Fd> {
    pub fn new(
        manager: ViewerManager<R, V, F>,
        requests: mpsc::Receiver<PendingPreview>,
        listener: IpcListener,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        let config = manager.config();
        let temp_image = config.output_is_temporary.then(|| config.output.clone());
        Self {
            manager,
            requests: Some(requests),
            listener: Some(listener),
            finder: None,
            interrupted,
            temp_image,
        }
    }

    pub fn attach_finder(&mut self, finder: Fd) {
        self.finder = Some(finder);
    }

    /// Serve previews until the finder exits, the user interrupts, or a preview fails
    pub fn run(&mut self) -> Result<Option<FontSelection>> {
        let output = self.manager.config().output.clone();
        loop {
            if self.interrupted.load(Ordering::Relaxed) {
                info!("Session interrupted");
                return Ok(None);
            }

            let requests = self
                .requests
                .as_ref()
                .ok_or_else(|| anyhow!("session already torn down"))?;
            match requests.recv_timeout(timing::POLL_INTERVAL) {
                Ok(pending) => self.serve(pending, &output)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => bail!("IPC listener stopped unexpectedly"),
            }

            let finder = self
                .finder
                .as_mut()
                .ok_or_else(|| anyhow!("no fuzzy-finder attached to the session"))?;
            if let Some(outcome) = finder.try_finish()? {
                return match outcome {
                    FinderOutcome::Chosen(line) => Ok(Some(FontSelection::parse(&line)?)),
                    FinderOutcome::Cancelled => Ok(None),
                };
            }
        }
    }

    fn serve(&mut self, pending: PendingPreview, output: &Path) -> Result<()> {
        let result = FontSelection::parse(&pending.selection)
            .and_then(|selection| self.manager.show_preview(&selection, output));
        match result {
            Ok(()) => {
                if let Some(handle) = self.manager.current() {
                    debug!(pid = handle.pid(), "Preview ready");
                }
                pending.reply(PreviewResponse::Ready);
                Ok(())
            }
            Err(err) => {
                pending.reply(PreviewResponse::Error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Ordered cleanup: finder, viewer, pending requests, listener, temp image
    pub fn teardown(&mut self) {
        if let Some(mut finder) = self.finder.take() {
            if let Err(e) = finder.abort() {
                error!(error = ?e, "Failed to stop fuzzy-finder");
            }
        }
        if let Err(e) = self.manager.kill_preview() {
            error!(error = %e, "Failed to stop preview viewer");
        }
        // Unblocks helpers still waiting on a reply before joining the listener
        self.requests.take();
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
        if let Some(image) = self.temp_image.take() {
            remove_temp_image(&image);
        }
        debug!("Session torn down");
    }
}

impl<R: Rasterizer, V: Viewer, F: WindowFocus, Fd: Finder> Drop for Session<R, V, F, Fd> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn remove_temp_image(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temp image"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp image"),
    }
}

/// Fuzzy-search installed fonts with live previews; returns the final choice
pub fn run_interactive(config: PreviewConfig) -> Result<Option<FontSelection>> {
    let interrupted = install_interrupt_flag()?;
    let focus = X11Focus::connect()?;
    let manager = ViewerManager::new(MagickRasterizer::default(), SxivViewer::default(), focus, config)?;

    let socket = ipc::session_socket_path()?;
    let server = PreviewServer::bind_to(socket.clone())?;
    let (tx, rx) = mpsc::channel();
    let listener = spawn_ipc_listener(server, tx);

    info!(window = manager.self_window(), socket = %socket.display(), "Starting preview session");
    let mut session = Session::new(manager, rx, listener, interrupted);

    let fonts = font::list_fonts()?;
    if fonts.is_empty() {
        warn!("fontconfig reported no fonts");
    }
    let exe = std::env::current_exe().context("Failed to resolve executable path")?;
    let config = session.manager.config();
    let finder = FzfProcess::spawn(&config.search_prompt, &config.trigger, &exe, &socket, fonts)?;
    session.attach_finder(finder);

    let result = session.run();
    session.teardown();
    result
}

/// Render and show each font file in turn, each viewer in the foreground
pub fn preview_files<R: Rasterizer, V: Viewer>(
    rasterizer: &R,
    viewer: &V,
    config: &PreviewConfig,
    files: &[PathBuf],
    interrupted: &AtomicBool,
) -> Result<()> {
    let result = preview_each(rasterizer, viewer, config, files, interrupted);
    if config.output_is_temporary {
        remove_temp_image(&config.output);
    }
    result
}

fn preview_each<R: Rasterizer, V: Viewer>(
    rasterizer: &R,
    viewer: &V,
    config: &PreviewConfig,
    files: &[PathBuf],
    interrupted: &AtomicBool,
) -> Result<()> {
    for file in files {
        if !file.is_file() {
            return Err(PreviewError::MissingFontFile(file.clone()).into());
        }
        let selection = FontSelection::from_file(file);
        rasterizer.render(&selection.font_id(), config, &config.output)?;

        let mut process = viewer.launch(&config.output, &config.geometry())?;
        info!(pid = process.pid(), font = %file.display(), "Showing preview");
        loop {
            if interrupted.load(Ordering::Relaxed) {
                info!("Interrupted, closing preview");
                crate::viewer::terminate_and_reap(process.as_mut(), timing::TERMINATE_GRACE, timing::POLL_INTERVAL)?;
                return Ok(());
            }
            match process.state()? {
                ProcessState::Running => thread::sleep(timing::POLL_INTERVAL),
                ProcessState::Exited(Some(0)) => break,
                ProcessState::Exited(code) => return Err(PreviewError::ViewerCrash { code }.into()),
            }
        }
    }
    Ok(())
}

/// Hidden helper run by the fuzzy-finder binding
pub fn send_preview(socket: &Path, selection: String) -> Result<()> {
    // Nothing highlighted: the query matches no font
    if selection.trim().is_empty() {
        debug!("No highlighted font, nothing to preview");
        return Ok(());
    }
    let mut client = PreviewClient::connect_to(socket)?;
    match client.request(PreviewRequest::Show { selection })? {
        PreviewResponse::Ready => Ok(()),
        PreviewResponse::Error(message) => Err(PreviewError::Ipc(message).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::font::FontId;
    use crate::types::Geometry;
    use crate::viewer::ViewerProcess;
    use crate::x11_utils::WindowId;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Shared between fakes and the test body
    #[derive(Default)]
    struct Counters {
        live: Cell<u32>,
        launched: Cell<u32>,
    }

    struct OkRasterizer;

    impl Rasterizer for OkRasterizer {
        fn render(&self, _font: &FontId, _config: &PreviewConfig, output: &Path) -> crate::error::PreviewResult<()> {
            std::fs::write(output, b"png")?;
            Ok(())
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn render(&self, font: &FontId, _config: &PreviewConfig, _output: &Path) -> crate::error::PreviewResult<()> {
            Err(PreviewError::RasterizationFailure {
                font: font.to_string(),
                detail: String::new(),
            })
        }
    }

    struct CountingViewer(Rc<Counters>);

    struct CountingProcess {
        pid: u32,
        running: bool,
        counters: Rc<Counters>,
    }

    impl Viewer for CountingViewer {
        fn launch(&self, _image: &Path, _geometry: &Geometry) -> crate::error::PreviewResult<Box<dyn ViewerProcess>> {
            let pid = self.0.launched.get() + 1;
            self.0.launched.set(pid);
            self.0.live.set(self.0.live.get() + 1);
            Ok(Box::new(CountingProcess {
                pid,
                running: true,
                counters: self.0.clone(),
            }))
        }
    }

    impl CountingProcess {
        fn stop(&mut self) {
            if self.running {
                self.running = false;
                self.counters.live.set(self.counters.live.get() - 1);
            }
        }
    }

    impl ViewerProcess for CountingProcess {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn state(&mut self) -> io::Result<ProcessState> {
            Ok(if self.running {
                ProcessState::Running
            } else {
                ProcessState::Exited(None)
            })
        }

        fn terminate(&mut self) -> io::Result<()> {
            self.stop();
            Ok(())
        }

        fn kill(&mut self) -> io::Result<()> {
            self.stop();
            Ok(())
        }

        fn wait(&mut self) -> io::Result<Option<i32>> {
            self.stop();
            Ok(None)
        }
    }

    /// Viewer always "takes focus" immediately
    struct FlipFocus {
        active: Cell<WindowId>,
    }

    impl WindowFocus for FlipFocus {
        fn active_window(&self) -> crate::error::PreviewResult<WindowId> {
            let current = self.active.get();
            // Every query after the first sees the viewer window in front
            self.active.set(2);
            Ok(current)
        }

        fn activate(&self, window: WindowId) -> crate::error::PreviewResult<()> {
            self.active.set(window);
            Ok(())
        }
    }

    /// Finishes with `outcome` once `done` is set
    struct ScriptedFinder {
        done: Arc<AtomicBool>,
        outcome: FinderOutcome,
        aborted: Rc<Cell<bool>>,
    }

    impl Finder for ScriptedFinder {
        fn try_finish(&mut self) -> Result<Option<FinderOutcome>> {
            Ok(self.done.load(Ordering::SeqCst).then(|| self.outcome.clone()))
        }

        fn abort(&mut self) -> Result<()> {
            self.aborted.set(true);
            Ok(())
        }
    }

    static SOCKET_SEQ: Mutex<u32> = Mutex::new(0);

    fn test_socket() -> PathBuf {
        let mut seq = SOCKET_SEQ.lock().unwrap();
        *seq += 1;
        std::env::temp_dir()
            .join(format!("fontpreview-session-test-{}", std::process::id()))
            .join(format!("s{}.sock", *seq))
    }

    fn test_config(output: &Path, temporary: bool) -> PreviewConfig {
        let mut config = PreviewConfig::from_settings(Settings {
            output: Some(output.to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        config.output_is_temporary = temporary;
        config
    }

    struct Harness<R: Rasterizer> {
        session: Session<R, CountingViewer, FlipFocus, ScriptedFinder>,
        counters: Rc<Counters>,
        done: Arc<AtomicBool>,
        interrupted: Arc<AtomicBool>,
        aborted: Rc<Cell<bool>>,
        socket: PathBuf,
        image: PathBuf,
    }

    fn harness<R: Rasterizer>(rasterizer: R, outcome: FinderOutcome) -> Harness<R> {
        let socket = test_socket();
        let image = socket.with_extension("png");
        let counters = Rc::new(Counters::default());
        let manager = ViewerManager::new(
            rasterizer,
            CountingViewer(counters.clone()),
            FlipFocus { active: Cell::new(1) },
            test_config(&image, true),
        )
        .unwrap()
        .with_timing(Duration::from_millis(100), Duration::from_millis(1));

        let server = PreviewServer::bind_to(socket.clone()).unwrap();
        let (tx, rx) = mpsc::channel();
        let listener = spawn_ipc_listener(server, tx);
        let interrupted = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let aborted = Rc::new(Cell::new(false));

        let mut session = Session::new(manager, rx, listener, interrupted.clone());
        session.attach_finder(ScriptedFinder {
            done: done.clone(),
            outcome,
            aborted: aborted.clone(),
        });
        Harness {
            session,
            counters,
            done,
            interrupted,
            aborted,
            socket,
            image,
        }
    }

    #[test]
    fn test_previews_then_choice_then_clean_teardown() {
        let mut h = harness(
            OkRasterizer,
            FinderOutcome::Chosen("Hack <- /fonts/Hack.ttf".to_string()),
        );

        let socket = h.socket.clone();
        let done = h.done.clone();
        let helper = thread::spawn(move || {
            send_preview(&socket, "Font A <- /fonts/A.ttf".to_string()).unwrap();
            send_preview(&socket, "Font B".to_string()).unwrap();
            done.store(true, Ordering::SeqCst);
        });

        let choice = h.session.run().unwrap();
        helper.join().unwrap();

        assert_eq!(choice.unwrap().path, Some(PathBuf::from("/fonts/Hack.ttf")));
        assert_eq!(h.counters.launched.get(), 2);
        assert_eq!(h.counters.live.get(), 1);
        assert!(h.image.exists());

        h.session.teardown();
        assert_eq!(h.counters.live.get(), 0);
        assert!(h.aborted.get());
        assert!(!h.socket.exists(), "socket should be removed");
        assert!(!h.image.exists(), "temp image should be removed");
    }

    #[test]
    fn test_rasterization_failure_ends_session() {
        let mut h = harness(FailingRasterizer, FinderOutcome::Cancelled);

        let socket = h.socket.clone();
        let helper = thread::spawn(move || send_preview(&socket, "Broken Font".to_string()));

        let err = h.session.run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreviewError>(),
            Some(PreviewError::RasterizationFailure { .. })
        ));
        let helper_err = helper.join().unwrap().unwrap_err();
        assert!(matches!(helper_err.downcast_ref::<PreviewError>(), Some(PreviewError::Ipc(_))));
        assert_eq!(h.counters.launched.get(), 0);
    }

    #[test]
    fn test_interrupt_stops_session() {
        let mut h = harness(OkRasterizer, FinderOutcome::Cancelled);
        h.interrupted.store(true, Ordering::SeqCst);
        assert!(h.session.run().unwrap().is_none());
    }

    #[test]
    fn test_interrupt_after_preview_leaves_nothing_behind() {
        let mut h = harness(OkRasterizer, FinderOutcome::Cancelled);

        let socket = h.socket.clone();
        let interrupted = h.interrupted.clone();
        let helper = thread::spawn(move || {
            send_preview(&socket, "Font A <- /fonts/A.ttf".to_string()).unwrap();
            interrupted.store(true, Ordering::SeqCst);
        });

        assert!(h.session.run().unwrap().is_none());
        helper.join().unwrap();
        assert_eq!(h.counters.launched.get(), 1);
        assert_eq!(h.counters.live.get(), 1);
        assert!(h.image.exists());
        assert!(!h.aborted.get());

        let Harness {
            session,
            counters,
            aborted,
            socket,
            image,
            ..
        } = h;
        drop(session);
        assert_eq!(counters.live.get(), 0);
        assert!(aborted.get());
        assert!(!socket.exists(), "socket should be removed");
        assert!(!image.exists(), "temp image should be removed");
    }

    #[test]
    fn test_stalled_helper_does_not_hold_up_teardown() {
        let mut h = harness(OkRasterizer, FinderOutcome::Cancelled);
        let _stalled = std::os::unix::net::UnixStream::connect(&h.socket).unwrap();
        // Give the listener time to accept and start waiting on the request
        thread::sleep(Duration::from_millis(50));

        let start = std::time::Instant::now();
        h.session.teardown();
        assert!(start.elapsed() < ipc::REQUEST_TIMEOUT * 3);
        assert!(!h.socket.exists());
    }

    #[test]
    fn test_cancelled_finder_returns_none() {
        let mut h = harness(OkRasterizer, FinderOutcome::Cancelled);
        h.done.store(true, Ordering::SeqCst);
        assert!(h.session.run().unwrap().is_none());
    }

    #[test]
    fn test_drop_tears_down_live_preview() {
        let mut h = harness(OkRasterizer, FinderOutcome::Cancelled);
        let (pending, reply) = PendingPreview::new("Font A".to_string());
        h.session.serve(pending, &h.image.clone()).unwrap();
        assert_eq!(reply.recv().unwrap(), PreviewResponse::Ready);
        assert_eq!(h.counters.live.get(), 1);

        let socket = h.socket.clone();
        let image = h.image.clone();
        let counters = h.counters.clone();
        let aborted = h.aborted.clone();
        drop(h);
        assert!(aborted.get());
        assert_eq!(counters.live.get(), 0);
        assert!(!socket.exists());
        assert!(!image.exists());
    }

    #[test]
    fn test_empty_highlight_sends_nothing() {
        // No session is listening; an empty line must not even connect
        let socket = test_socket();
        assert!(send_preview(&socket, "  ".to_string()).is_ok());
    }

    #[test]
    fn test_preview_files_runs_each_viewer_to_completion() {
        let dir = std::env::temp_dir().join(format!("fontpreview-direct-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let font_file = dir.join("Sample.ttf");
        std::fs::write(&font_file, b"font").unwrap();
        let image = dir.join("out.png");
        let config = test_config(&image, true);

        // `true` stands in for both programs: exits 0 immediately
        let result = preview_files(
            &MagickRasterizer::new("true"),
            &SxivViewer::new("true"),
            &config,
            &[font_file.clone(), font_file],
            &AtomicBool::new(false),
        );
        assert!(result.is_ok());
        assert!(!image.exists());
    }

    #[test]
    fn test_preview_files_reports_viewer_crash() {
        let dir = std::env::temp_dir().join(format!("fontpreview-crash-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let font_file = dir.join("Sample.ttf");
        std::fs::write(&font_file, b"font").unwrap();
        let config = test_config(&dir.join("out.png"), false);

        let err = preview_files(
            &MagickRasterizer::new("true"),
            &SxivViewer::new("false"),
            &config,
            &[font_file],
            &AtomicBool::new(false),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreviewError>(),
            Some(PreviewError::ViewerCrash { code: Some(1) })
        ));
    }

    #[test]
    fn test_preview_files_rejects_missing_file() {
        let config = test_config(Path::new("/tmp/unused-fontpreview.png"), false);
        let err = preview_files(
            &MagickRasterizer::new("true"),
            &SxivViewer::new("true"),
            &config,
            &[PathBuf::from("/nonexistent/font.ttf")],
            &AtomicBool::new(false),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreviewError>(),
            Some(PreviewError::MissingFontFile(_))
        ));
    }
}
