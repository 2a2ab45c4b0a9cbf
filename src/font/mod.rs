//! Font enumeration and selection lines

mod discovery;
mod selection;

pub use discovery::list_fonts;
pub use selection::{FontId, FontSelection};
