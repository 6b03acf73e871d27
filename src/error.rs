//! Error types shared by channels, controllers, messages and actors.
use std::fmt;

/// Errors raised by the primitives in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A channel handed to `select` is registered with another controller.
    #[error("channel at position {position} does not belong to the controller")]
    ControllerMismatch { position: usize },

    /// A message was extracted as a type other than the one it holds.
    #[error("message holds `{found}`, not `{expected}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The value of a message was already consumed by a successful match.
    #[error("message of type `{type_name}` was already matched")]
    AlreadyMatched { type_name: &'static str },

    #[error("failed to spawn the worker thread of actor `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handler of actor `{name}` panicked")]
    ActorPanicked { name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returned by [`Channel::send`](crate::Channel::send) when the channel is
/// closing or its controller is terminating. Carries the rejected value.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel closed")
    }
}

impl<T> std::error::Error for SendError<T> {}

/// Returned by [`Channel::try_send`](crate::Channel::try_send).
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    /// The channel is at capacity.
    Full(T),
    /// The channel is closing or its controller is terminating.
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }
}

impl<T> From<SendError<T>> for TrySendError<T> {
    fn from(SendError(value): SendError<T>) -> Self {
        TrySendError::Closed(value)
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(..) => "Full(..)".fmt(f),
            TrySendError::Closed(..) => "Closed(..)".fmt(f),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(..) => write!(f, "no available capacity"),
            TrySendError::Closed(..) => write!(f, "channel closed"),
        }
    }
}

impl<T> std::error::Error for TrySendError<T> {}
