//! Error classification: which failures are failover noise and which are real.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// Command errors a cluster emits while a failover is in progress.
///
/// - a replica rejecting a write after demotion
/// - a freshly promoted node still loading its dataset
/// - an ElastiCache replica rejecting a write
pub const DEFAULT_IGNORED_COMMAND_ERRORS: [&str; 3] = [
    "READONLY You can't write against a read only slave.",
    "LOADING Redis is loading the dataset in memory",
    "A write operation was issued to an ELASTICACHE slave node.",
];

/// Separates server-rejected commands from every other failure.
///
/// A client's error type implements this so the decorator can tell a command
/// the server refused (which may be failover noise) from a broken connection,
/// a timeout or a decode failure (which never is).
pub trait CommandError {
    /// The server's literal error message, or `None` if this error did not
    /// come from the server rejecting a command.
    fn command_message(&self) -> Option<Cow<'_, str>>;
}

/// The immutable set of command error messages that degrade instead of failing.
///
/// Matching is exact string equality. A server that rewords or localizes one
/// of these messages will no longer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredCommandErrors {
    messages: HashSet<String>,
}

impl IgnoredCommandErrors {
    /// Builds a set from the given messages.
    pub fn new<I, M>(messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `message` is exactly one of the ignored messages.
    pub fn contains(&self, message: &str) -> bool {
        self.messages.contains(message)
    }

    /// Number of messages in the set.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing will ever be degraded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over the messages in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

impl Default for IgnoredCommandErrors {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_COMMAND_ERRORS)
    }
}

/// Why an error was handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateReason {
    /// Transport, timeout, protocol or any other non-command failure.
    NotCommandError,
    /// `raise_errors` is enabled.
    RaiseErrors,
    /// The command error's message is not in the ignored set.
    UnknownCommandError,
}

impl PropagateReason {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCommandError => "not_command_error",
            Self::RaiseErrors => "raise_errors",
            Self::UnknownCommandError => "unknown_command_error",
        }
    }
}

impl fmt::Display for PropagateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Return the operation's sentinel. Carries the matched message.
    Degrade(String),
    /// Return the original error.
    Propagate(PropagateReason),
}

/// The classification policy: an ignored set plus the raise override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    ignored: IgnoredCommandErrors,
    raise_errors: bool,
}

impl Classifier {
    /// Creates a classifier.
    pub fn new(ignored: IgnoredCommandErrors, raise_errors: bool) -> Self {
        Self {
            ignored,
            raise_errors,
        }
    }

    /// The active ignored set.
    pub fn ignored_command_errors(&self) -> &IgnoredCommandErrors {
        &self.ignored
    }

    /// Whether every error propagates regardless of the ignored set.
    pub fn raise_errors(&self) -> bool {
        self.raise_errors
    }

    /// Decides the disposition of `error`.
    ///
    /// Non-command errors are decided before the override or the set are
    /// looked at.
    pub fn classify<E: CommandError + ?Sized>(&self, error: &E) -> Disposition {
        let Some(message) = error.command_message() else {
            return Disposition::Propagate(PropagateReason::NotCommandError);
        };
        if self.raise_errors {
            return Disposition::Propagate(PropagateReason::RaiseErrors);
        }
        if !self.ignored.contains(&message) {
            return Disposition::Propagate(PropagateReason::UnknownCommandError);
        }
        Disposition::Degrade(message.into_owned())
    }

    /// Resolves a finished call without recording anything.
    ///
    /// Successes pass through, degraded errors become `sentinel` and every
    /// other error is handed back unchanged.
    pub fn decide<T, E: CommandError>(&self, result: Result<T, E>, sentinel: T) -> Outcome<T, E> {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => {
                let disposition = self.classify(&error);
                Outcome::from_error(error, &disposition, sentinel)
            }
        }
    }
}

/// The result of one wrapped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The client succeeded; the value is untouched.
    Success(T),
    /// The client failed with an ignored command error; holds the sentinel.
    Degraded(T),
    /// The client failed and the original error goes back to the caller.
    Propagated(E),
}

impl<T, E> Outcome<T, E> {
    /// Applies an already computed `disposition` to a failed call.
    pub fn from_error(error: E, disposition: &Disposition, sentinel: T) -> Self {
        match disposition {
            Disposition::Degrade(_) => Self::Degraded(sentinel),
            Disposition::Propagate(_) => Self::Propagated(error),
        }
    }

    /// Collapses the outcome into what the caller sees.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success(value) | Self::Degraded(value) => Ok(value),
            Self::Propagated(error) => Err(error),
        }
    }

    /// Returns `true` for [`Outcome::Degraded`].
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Degraded(_) => "degraded",
            Self::Propagated(_) => "propagated",
        }
    }
}
