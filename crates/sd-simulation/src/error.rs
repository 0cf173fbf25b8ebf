use std::path::PathBuf;

use sd_core::CoreError;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while loading a game or running its frames.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A scripting error from the world, a handler, or the tag registry.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No config file was found for the game folder.
    #[error("unable to locate a suitable {name}.cfg file in {}", dir.display())]
    MissingConfig {
        /// The config name that was looked up.
        name: String,
        /// The game folder that was searched.
        dir: PathBuf,
    },

    /// A config file that does not parse or fails validation.
    #[error("invalid config {}: {reason}", path.display())]
    InvalidConfig {
        /// The offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A level names an entity class that is not built in.
    #[error("unknown entity class \"{0}\"")]
    UnknownClass(String),

    /// A level refers to an entity or cell by a name nothing has.
    #[error("no entity named \"{0}\"")]
    UnknownEntity(String),

    /// A save file that does not parse or comes from a newer version.
    #[error("invalid save game {}: {reason}", path.display())]
    InvalidSave {
        /// The offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a save game failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
