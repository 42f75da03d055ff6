//! Error types for the agent scheduler.

/// Error from a rule scan or an effect, indicating how the scheduler reacts.
///
/// # Severity Levels
///
/// - **Transient**: the scan could not complete safely (a matched work item
///   vanished, a collection was in an unexpected shape). The scheduler treats
///   this as "nothing to do this tick" and suspends until the next ring.
///
/// - **Fatal**: a programming-contract violation, such as a collaborator that
///   was never wired or a work item referring to something that cannot exist.
///   The scheduler exits and reports [`AgentPhase::Failed`](crate::AgentPhase).
///
/// - **Stopped**: the agent observed the stop signal while blocked in a
///   rendezvous or while reaching for a peer that has been torn down. The
///   scheduler exits cleanly.
///
/// # When to use each
///
/// Return `Transient` when retrying on the next ring might succeed. Return
/// `Fatal` when retrying can never succeed and continuing would hide a bug.
/// Domain outcomes (out of stock, cannot afford, nothing fulfillable) are not
/// errors at all; they are ordinary messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Abort this scan, try again after the next ring.
    Transient(String),
    /// Contract violation. The scheduler exits.
    Fatal(String),
    /// Stop signal observed mid-action.
    Stopped,
}

impl HandlerError {
    /// Create a transient error (retry on next ring).
    pub fn transient(e: impl Into<String>) -> Self {
        HandlerError::Transient(e.into())
    }

    /// Create a fatal error (scheduler exits as failed).
    pub fn fatal(e: impl Into<String>) -> Self {
        HandlerError::Fatal(e.into())
    }

    /// Returns `true` for errors the scheduler recovers from locally.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, HandlerError::Transient(_))
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Transient(e) => write!(f, "transient: {}", e),
            HandlerError::Fatal(e) => write!(f, "FATAL: {}", e),
            HandlerError::Stopped => write!(f, "agent stopped"),
        }
    }
}

impl std::error::Error for HandlerError {}

/// Result type for rule actions and effects.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Error returned when the timer service can no longer accept work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer thread has shut down.
    Disconnected,
}

impl std::fmt::Display for TimerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerError::Disconnected => write!(f, "timer service has shut down"),
        }
    }
}

impl std::error::Error for TimerError {}

impl<T> From<crossbeam_channel::SendError<T>> for TimerError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        TimerError::Disconnected
    }
}

impl From<TimerError> for HandlerError {
    fn from(_: TimerError) -> Self {
        // Timers only disappear during shutdown.
        HandlerError::Stopped
    }
}
