//! IPC message types for preview helper ↔ session communication

use serde::{Deserialize, Serialize};

/// Requests sent by the fuzzy-finder key binding to the session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PreviewRequest {
    /// Preview the highlighted candidate line
    Show { selection: String },
}

/// Responses sent from the session back to the helper
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PreviewResponse {
    /// Preview is up and focus is back on the prompt
    Ready,

    /// Preview failed; the session is ending
    Error(String),
}
