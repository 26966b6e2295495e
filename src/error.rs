/// Structural level-data errors. All detected at load time, all fatal:
/// level data is static, so retrying cannot help.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level \"{level}\" has no start marker 'S'")]
    MissingStart { level: String },

    #[error("level \"{level}\" has no exit marker 'E'")]
    MissingExit { level: String },

    #[error("level index {index} out of range (catalog has {len} levels)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("level catalog is empty")]
    EmptyCatalog,
}
