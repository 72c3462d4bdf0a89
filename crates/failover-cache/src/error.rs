//! Error type for the in-memory store.

use crate::classify::CommandError;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`MemoryStore`](crate::MemoryStore).
///
/// Only [`StoreError::Command`] is a command error; every other variant
/// models a transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The server rejected the command. Displays the server's message verbatim.
    #[error("{0}")]
    Command(String),

    /// The connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// No reply arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::Command`].
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// Returns `true` for [`StoreError::Command`].
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }
}

impl CommandError for StoreError {
    fn command_message(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Command(message) => Some(Cow::Borrowed(message)),
            _ => None,
        }
    }
}
