//! IPC (Inter-Process Communication) via Unix sockets
//!
//! The fuzzy-finder runs preview bindings as short-lived helper processes.
//! Helpers forward the highlighted line to the session process, which owns the
//! viewer, over a per-session socket using length-prefixed JSON.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod messages;
pub use messages::{PreviewRequest, PreviewResponse};

use crate::constants::paths;

/// Maximum message size (1 MB); a candidate line is far smaller
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long a helper waits for the session to answer; covers a full focus handoff
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the session waits for a connected helper to send its request.
/// The listener is joined at teardown, so a stalled helper must not hold it.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Socket path for this process (XDG_RUNTIME_DIR with fallback to cache)
pub fn session_socket_path() -> Result<PathBuf> {
    let file = format!("session-{}.sock", std::process::id());
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(paths::APP_DIR).join(file));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(paths::APP_DIR).join(file))
}

/// Client connection to the session (used by the preview helper)
pub struct PreviewClient {
    stream: UnixStream,
}

impl PreviewClient {
    /// Connect to specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to preview session at {}", path.display()))?;
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .context("Failed to set socket read timeout")?;
        Ok(Self { stream })
    }

    /// Send request and wait for response
    pub fn request(&mut self, req: PreviewRequest) -> Result<PreviewResponse> {
        write_message(&mut self.stream, &req)?;
        read_message(&mut self.stream)
    }
}

/// Server side of one accepted connection
pub struct PreviewConnection {
    stream: UnixStream,
}

impl PreviewConnection {
    pub fn recv_request(&mut self) -> Result<PreviewRequest> {
        read_message(&mut self.stream)
    }

    pub fn send_response(&mut self, resp: &PreviewResponse) -> Result<()> {
        write_message(&mut self.stream, resp)
    }
}

/// Listening socket owned by the session
pub struct PreviewServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl PreviewServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Leftover from a crashed session that had the same pid
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Owner only
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        // Accept is polled so the listener thread can notice shutdown
        listener
            .set_nonblocking(true)
            .context("Failed to make IPC socket non-blocking")?;

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept a pending connection, `None` if nobody is waiting
    pub fn try_accept(&self) -> Result<Option<PreviewConnection>> {
        match self.listener.accept() {
            Ok((stream, _addr)) => {
                stream
                    .set_nonblocking(false)
                    .context("Failed to make IPC connection blocking")?;
                stream
                    .set_read_timeout(Some(REQUEST_TIMEOUT))
                    .context("Failed to set socket read timeout")?;
                stream
                    .set_write_timeout(Some(REQUEST_TIMEOUT))
                    .context("Failed to set socket write timeout")?;
                Ok(Some(PreviewConnection { stream }))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e).context("Failed to accept IPC connection"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Write length-prefixed message to stream
pub(crate) fn write_message<T: Serialize, W: Write>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Length prefix (u32 little-endian)
    let len = u32::try_from(json.len()).context("Message too large to send")?;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;
    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
pub(crate) fn read_message<T: for<'de> Deserialize<'de>, R: Read>(stream: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
