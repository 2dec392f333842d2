//! Save, autosave and replay files
//!
//! Features:
//! - Line-oriented text format shared by all three artifact kinds
//! - Replays embed the recorded input transitions after the save block
//! - Autosave rotation by lexicographic (timestamp) order
//!
//! Loads either produce complete data or an error; nothing is half-built.

pub mod format;
pub mod store;

pub use format::{ItemRecord, ReplayData, SaveData};
pub use store::SaveStore;

use crate::items::ItemError;

/// Persistence failures, surfaced to whoever asked for the load or save
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("save file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: missing {what}")]
    MissingLine { line: usize, what: &'static str },

    #[error("line {line}: invalid {what} {value:?}")]
    InvalidValue {
        line: usize,
        what: &'static str,
        value: String,
    },

    #[error("unknown item type {0:?}")]
    UnknownItem(String),

    #[error("bad item values: {0}")]
    Item(#[from] ItemError),

    #[error("no level {0} in the campaign")]
    UnknownLevel(u32),

    #[error("line {line}: invalid input record {value:?}")]
    InvalidRecord { line: usize, value: String },

    #[error("unsupported player count {0}")]
    PlayerCount(usize),
}
