//! IPC listener thread for the interactive session
//!
//! Accepts helper connections and forwards their preview requests to the
//! session thread, which is the only owner of the viewer.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::constants::timing;
use crate::ipc::{PreviewConnection, PreviewRequest, PreviewResponse, PreviewServer};

/// A preview request waiting for the session thread
#[derive(Debug)]
pub struct PendingPreview {
    pub selection: String,
    reply: mpsc::Sender<PreviewResponse>,
}

impl PendingPreview {
    pub fn new(selection: String) -> (Self, mpsc::Receiver<PreviewResponse>) {
        let (reply, rx) = mpsc::channel();
        (Self { selection, reply }, rx)
    }

    /// Answer the helper. The helper may already be gone, which is fine.
    pub fn reply(self, response: PreviewResponse) {
        if self.reply.send(response).is_err() {
            debug!("Preview helper went away before the reply");
        }
    }
}

/// Running listener thread
pub struct IpcListener {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl IpcListener {
    /// Stop accepting and wait for the thread; the socket file goes with it
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("IPC listener thread panicked");
            }
        }
    }
}

impl Drop for IpcListener {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Spawn IPC listener thread to forward helper requests to the session
pub fn spawn_ipc_listener(server: PreviewServer, requests: mpsc::Sender<PendingPreview>) -> IpcListener {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    let handle = thread::spawn(move || {
        if let Err(e) = run_ipc_loop(&server, &requests, &flag) {
            error!(error = ?e, "IPC listener thread crashed");
        }
    });
    IpcListener {
        handle: Some(handle),
        shutdown,
    }
}

fn run_ipc_loop(
    server: &PreviewServer,
    requests: &mpsc::Sender<PendingPreview>,
    shutdown: &AtomicBool,
) -> Result<()> {
    info!(socket = ?server.path(), "IPC listener started");

    while !shutdown.load(Ordering::Relaxed) {
        match server.try_accept()? {
            Some(conn) => {
                if let Err(e) = handle_connection(conn, requests) {
                    warn!(error = ?e, "IPC connection closed or error");
                }
            }
            None => thread::sleep(timing::ACCEPT_INTERVAL),
        }
    }

    info!("IPC listener stopped");
    Ok(())
}

/// One helper connection carries exactly one request
fn handle_connection(mut conn: PreviewConnection, requests: &mpsc::Sender<PendingPreview>) -> Result<()> {
    let PreviewRequest::Show { selection } = conn.recv_request()?;
    debug!(selection = %selection, "Preview requested");
    let (pending, reply) = PendingPreview::new(selection);
    let response = if requests.send(pending).is_err() {
        PreviewResponse::Error("preview session is shutting down".to_string())
    } else {
        // Dropped unanswered when the session tears down
        reply
            .recv()
            .unwrap_or_else(|_| PreviewResponse::Error("preview session ended".to_string()))
    };
    conn.send_response(&response)
        .context("Failed to send IPC response")
}
