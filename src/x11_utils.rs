use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::error::{PreviewError, PreviewResult};

/// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;

pub type WindowId = u32;

/// Query and set the foreground window
pub trait WindowFocus {
    fn active_window(&self) -> PreviewResult<WindowId>;
    fn activate(&self, window: WindowId) -> PreviewResult<()>;
}

/// EWMH focus control over a live X11 connection
pub struct X11Focus {
    conn: RustConnection,
    root: Window,
    net_active_window: Atom,
}

impl X11Focus {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
        let root = conn.setup().roots[screen_num].root;
        // Intern once at startup, every poll reuses it
        let net_active_window = conn
            .intern_atom(false, b"_NET_ACTIVE_WINDOW")
            .context("Failed to intern _NET_ACTIVE_WINDOW atom")?
            .reply()
            .context("Failed to get reply for _NET_ACTIVE_WINDOW atom")?
            .atom;
        debug!(screen = screen_num, root = root, "Connected to X11 server");
        Ok(Self {
            conn,
            root,
            net_active_window,
        })
    }
}

fn focus_error(action: &str, err: impl std::fmt::Display) -> PreviewError {
    PreviewError::Focus(format!("{action}: {err}"))
}

impl WindowFocus for X11Focus {
    fn active_window(&self) -> PreviewResult<WindowId> {
        let prop = self
            .conn
            .get_property(false, self.root, self.net_active_window, AtomEnum::WINDOW, 0, 1)
            .map_err(|e| focus_error("failed to query _NET_ACTIVE_WINDOW", e))?
            .reply()
            .map_err(|e| focus_error("failed to read _NET_ACTIVE_WINDOW", e))?;

        prop.value32()
            .and_then(|mut values| values.next())
            .ok_or_else(|| focus_error("_NET_ACTIVE_WINDOW", "property is not set by the window manager"))
    }

    /// Raise the window and ask the window manager to focus it
    fn activate(&self, window: WindowId) -> PreviewResult<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .map_err(|e| focus_error(&format!("failed to raise window {window}"), e))?;

        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_: self.net_active_window,
            data: ClientMessageData::from([
                ACTIVE_WINDOW_SOURCE_PAGER,
                x11rb::CURRENT_TIME,
                0, // Requestor's currently active window (0 = none)
                0,
                0,
            ]),
        };

        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                &event,
            )
            .map_err(|e| focus_error(&format!("failed to send _NET_ACTIVE_WINDOW for {window}"), e))?;

        self.conn
            .flush()
            .map_err(|e| focus_error("failed to flush X11 connection", e))?;
        debug!(window = window, "Activated window");
        Ok(())
    }
}
