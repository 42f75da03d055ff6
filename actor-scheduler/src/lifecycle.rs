//! Agent lifecycle: the scheduler's observable phase.
//!
//! ```text
//! (spawned) ──► Suspended ◄──► Scanning ──► Completed   (stop signal)
//!                                     └───► Failed(msg) (contract violation)
//! ```
//!
//! `Suspended` and `Scanning` are live phases reported by
//! [`Doorbell::phase`](crate::Doorbell::phase). `Completed` and `Failed` are
//! returned when the scheduler thread exits, and `Doorbell::phase` reports
//! them from then on.

/// The observable phase of an agent's scheduler thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentPhase {
    /// Blocked on the doorbell, no rule matched on the last scan.
    Suspended,

    /// Running the rule table (or performing the effects of a fired rule).
    Scanning,

    /// Clean exit: the stop signal was observed.
    Completed,

    /// Exited on `HandlerError::Fatal`. The message describes the violation.
    Failed(String),
}

impl AgentPhase {
    /// Returns `true` if the phase represents an abnormal exit.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, AgentPhase::Failed(_))
    }

    /// Returns `true` if the phase represents a clean exit.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, AgentPhase::Completed)
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentPhase::Suspended => write!(f, "Suspended"),
            AgentPhase::Scanning => write!(f, "Scanning"),
            AgentPhase::Completed => write!(f, "Completed"),
            AgentPhase::Failed(msg) => write!(f, "Failed({msg})"),
        }
    }
}
