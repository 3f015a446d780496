//! Errors reported to the command surface.

use thiserror::Error;

use crate::store::StoreError;

/// Alias for `Result<T, CommandError>`.
pub type CommandResult<T> = Result<T, CommandError>;

/// Why a mutation requested by a command was rejected or failed.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The new value could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A trigger pattern is not a valid regular expression.
    #[error("invalid pattern `{pattern}`: {source}")]
    Compilation {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No known emoji answers to the given token.
    #[error("I don't know the emoji `{0}`")]
    UnknownEmoji(String),
}
