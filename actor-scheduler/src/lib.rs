//! Actor Scheduler - thread-per-agent rule scanning
//!
//! Each agent owns private state behind a [`Mailbox`] and an ordered
//! [`RuleTable`]. Other threads never call into an agent's logic; they
//! deliver a mutation and ring the agent's [`Doorbell`]. The agent's own
//! scheduler thread then scans the rule table and fires at most one rule per
//! iteration.
//!
//! # Architecture
//!
//! ```text
//!            deliver(|s| ...)                         scheduler thread
//! sender ───► lock ─ mutate ─ unlock ─ ring ───► wait() ─► scan rules (locked)
//! timer  ───►        (same path)                          fire ≤ 1 action
//!                                                         unlock
//!                                                         perform effects
//!                                                         loop / suspend
//! ```
//!
//! 1. A ring is latched: one that lands mid-scan triggers another scan.
//! 2. Rule actions only mutate state and queue effects on an [`Outbox`].
//! 3. Effects (messages to other agents, timers) run after the lock is
//!    released, so no two mailbox locks are ever nested.
//!
//! # Example
//!
//! ```rust
//! use actor_scheduler::{Agent, HandlerResult, Mailbox, RuleTable, Troupe};
//! use std::sync::Arc;
//!
//! struct Echo {
//!     mailbox: Mailbox<Vec<String>>,
//!     rules: RuleTable<Vec<String>, String>,
//! }
//!
//! impl Agent for Echo {
//!     type State = Vec<String>;
//!     type Effect = String;
//!
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!     fn mailbox(&self) -> &Mailbox<Vec<String>> {
//!         &self.mailbox
//!     }
//!     fn rules(&self) -> &RuleTable<Vec<String>, String> {
//!         &self.rules
//!     }
//!     fn perform(&self, effect: String) -> HandlerResult {
//!         println!("{}", effect);
//!         Ok(())
//!     }
//! }
//!
//! let echo = Arc::new(Echo {
//!     mailbox: Mailbox::new(Vec::new()),
//!     rules: RuleTable::<Vec<String>, String>::new().rule(
//!         "echo",
//!         |lines| (!lines.is_empty()).then_some(0),
//!         |lines, i, out| {
//!             out.push(lines.remove(i));
//!             Ok(())
//!         },
//!     ),
//! });
//!
//! let mut troupe = Troupe::new();
//! troupe.spawn(Arc::clone(&echo)).unwrap();
//! echo.mailbox().deliver(|lines| lines.push("hello".to_string()));
//! let report = troupe.shutdown();
//! assert!(report[0].1.is_completed());
//! ```

mod error;
mod lifecycle;
mod mailbox;
mod rendezvous;
mod rules;
mod timer;

pub use error::{HandlerError, HandlerResult, TimerError};
pub use lifecycle::AgentPhase;
pub use mailbox::{AgentId, Checkpoint, Doorbell, Mailbox, Wake};
pub use rendezvous::Rendezvous;
pub use rules::{matched, Action, Condition, Outbox, Rule, RuleTable};
pub use timer::{TimerId, TimerService, Timers};

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, error, info};

/// The Agent trait - implement this to give an agent its rules and effects.
///
/// Implementors hold their [`Mailbox`] and [`RuleTable`]; the scheduler does
/// the rest. `perform` is the only place an agent talks to the outside
/// world, and it runs with no lock held.
pub trait Agent: Send + Sync + 'static {
    /// Private state guarded by the mailbox.
    type State: Send + 'static;
    /// Work queued by rule actions for after the scan.
    type Effect;

    fn name(&self) -> &str;

    fn mailbox(&self) -> &Mailbox<Self::State>;

    fn rules(&self) -> &RuleTable<Self::State, Self::Effect>;

    /// Carry out one queued effect.
    fn perform(&self, effect: Self::Effect) -> HandlerResult;

    /// One scheduler iteration: fire at most one rule, then perform its
    /// effects. Returns `true` if a rule fired.
    ///
    /// # Errors
    ///
    /// Propagates errors from the fired action and from `perform`.
    fn pick_and_execute_an_action(&self) -> HandlerResult<bool> {
        let mut outbox = Outbox::new();
        let fired = self
            .mailbox()
            .scan(|state| self.rules().fire(state, &mut outbox))?;

        for effect in outbox {
            self.perform(effect)?;
        }
        Ok(fired.is_some())
    }
}

/// The Main Scheduler Loop.
///
/// Suspends on the doorbell. Once woken, calls
/// [`Agent::pick_and_execute_an_action`] until nothing fires, then suspends
/// again. Returns the terminal phase when the doorbell is stopped or a
/// fatal error occurs.
pub fn run<A: Agent + ?Sized>(agent: &A) -> AgentPhase {
    let doorbell = Arc::clone(agent.mailbox().doorbell());
    let phase = scan_until_stopped(agent, &doorbell);
    doorbell.retire(phase.clone());
    debug!("{} scheduler exited: {}", agent.name(), phase);
    phase
}

fn scan_until_stopped<A: Agent + ?Sized>(agent: &A, doorbell: &Doorbell) -> AgentPhase {
    loop {
        if doorbell.wait() == Wake::Stop {
            return AgentPhase::Completed;
        }

        loop {
            match doorbell.checkpoint() {
                Checkpoint::Continue => {}
                Checkpoint::Pause => break,
                Checkpoint::Stop => return AgentPhase::Completed,
            }

            match agent.pick_and_execute_an_action() {
                Ok(true) => {}
                Ok(false) => break,
                Err(HandlerError::Transient(msg)) => {
                    debug!("{}: no action this tick ({})", agent.name(), msg);
                    break;
                }
                Err(HandlerError::Fatal(msg)) => {
                    error!("{}: {}", agent.name(), msg);
                    return AgentPhase::Failed(msg);
                }
                Err(HandlerError::Stopped) => return AgentPhase::Completed,
            }
        }
    }
}

struct Member {
    name: String,
    doorbell: Arc<Doorbell>,
    handle: JoinHandle<AgentPhase>,
}

/// A collection of agents managed as a single unit.
///
/// `Troupe` owns every agent thread. Dropping it stops the agents without
/// waiting for them; use [`Troupe::shutdown`] to join and collect their
/// exit phases.
#[derive(Default)]
pub struct Troupe {
    members: Vec<Member>,
}

impl Troupe {
    /// Create a new empty Troupe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an agent's scheduler on its own thread and give it its first
    /// activation.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn<A: Agent>(&mut self, agent: Arc<A>) -> io::Result<()> {
        let name = agent.name().to_string();
        let doorbell = Arc::clone(agent.mailbox().doorbell());

        let handle = std::thread::Builder::new()
            .name(format!("agent-{}", name))
            .spawn(move || run(agent.as_ref()))?;

        doorbell.ring();
        debug!("spawned agent {}", name);
        self.members.push(Member {
            name,
            doorbell,
            handle,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Hold every scheduler before its next scan.
    pub fn pause_all(&self) {
        for member in &self.members {
            member.doorbell.pause();
        }
        info!("paused {} agent(s)", self.members.len());
    }

    pub fn resume_all(&self) {
        for member in &self.members {
            member.doorbell.resume();
        }
        info!("resumed {} agent(s)", self.members.len());
    }

    /// No agent is scanning and none has a ring pending.
    ///
    /// Pending timers are not visible here; an idle troupe may wake again.
    pub fn is_idle(&self) -> bool {
        self.members.iter().all(|m| m.doorbell.is_idle())
    }

    /// Live phase of every agent, in spawn order.
    pub fn phases(&self) -> Vec<(String, AgentPhase)> {
        self.members
            .iter()
            .map(|m| (m.name.clone(), m.doorbell.phase()))
            .collect()
    }

    fn stop_all(&self) {
        for member in &self.members {
            member.doorbell.stop();
        }
    }

    /// Stop every agent, wait for its thread and report how it ended.
    pub fn shutdown(mut self) -> Vec<(String, AgentPhase)> {
        self.stop_all();
        std::mem::take(&mut self.members)
            .into_iter()
            .map(|member| {
                let phase = member.handle.join().unwrap_or_else(|_| {
                    error!("agent {} panicked", member.name);
                    AgentPhase::Failed("panicked".to_string())
                });
                (member.name, phase)
            })
            .collect()
    }
}

impl Drop for Troupe {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Tally {
        inbox: Vec<u32>,
        poison: bool,
    }

    struct Counter {
        mailbox: Mailbox<Tally>,
        rules: RuleTable<Tally, u32>,
        seen: Mutex<Vec<u32>>,
        performs: AtomicUsize,
    }

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                mailbox: Mailbox::new(Tally::default()),
                rules: RuleTable::<Tally, u32>::new()
                    .rule(
                        "poisoned",
                        |t| t.poison.then_some(0),
                        |_, _, _| Err(HandlerError::fatal("poisoned")),
                    )
                    .rule(
                        "count",
                        |t| (!t.inbox.is_empty()).then_some(0),
                        |t, i, out| {
                            out.push(t.inbox.remove(i));
                            Ok(())
                        },
                    ),
                seen: Mutex::new(Vec::new()),
                performs: AtomicUsize::new(0),
            })
        }

        fn seen(&self) -> Vec<u32> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Agent for Counter {
        type State = Tally;
        type Effect = u32;

        fn name(&self) -> &str {
            "counter"
        }
        fn mailbox(&self) -> &Mailbox<Tally> {
            &self.mailbox
        }
        fn rules(&self) -> &RuleTable<Tally, u32> {
            &self.rules
        }
        fn perform(&self, n: u32) -> HandlerResult {
            self.performs.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(n);
            Ok(())
        }
    }

    fn eventually(what: &str, mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn one_rule_per_iteration() {
        let counter = Counter::new();
        counter.mailbox().deliver(|t| t.inbox.extend([1, 2, 3]));

        assert!(counter.pick_and_execute_an_action().unwrap());
        assert_eq!(counter.seen(), vec![1]);
        assert!(counter.pick_and_execute_an_action().unwrap());
        assert!(counter.pick_and_execute_an_action().unwrap());
        assert!(!counter.pick_and_execute_an_action().unwrap());
        assert!(!counter.pick_and_execute_an_action().unwrap());
        assert_eq!(counter.seen(), vec![1, 2, 3]);
    }

    #[test]
    fn burst_drains_without_further_rings() {
        let counter = Counter::new();
        let mut troupe = Troupe::new();
        troupe.spawn(Arc::clone(&counter)).unwrap();

        counter.mailbox().deliver(|t| t.inbox.extend(0..50));
        eventually("burst drained", || counter.seen().len() == 50);

        assert_eq!(counter.seen(), (0..50).collect::<Vec<_>>());
        let report = troupe.shutdown();
        assert_eq!(report, vec![("counter".to_string(), AgentPhase::Completed)]);
    }

    #[test]
    fn suspended_agent_wakes_on_delivery() {
        let counter = Counter::new();
        let mut troupe = Troupe::new();
        troupe.spawn(Arc::clone(&counter)).unwrap();
        eventually("first activation settles", || troupe.is_idle());

        counter.mailbox().deliver(|t| t.inbox.push(42));
        eventually("delivery handled", || counter.seen() == vec![42]);
        troupe.shutdown();
    }

    #[test]
    fn fatal_error_reports_failed_phase() {
        let counter = Counter::new();
        let mut troupe = Troupe::new();
        troupe.spawn(Arc::clone(&counter)).unwrap();

        counter.mailbox().deliver(|t| {
            t.poison = true;
            t.inbox.push(7);
        });
        eventually("agent exits", || troupe.phases()[0].1.is_failed());
        assert_eq!(
            troupe.phases(),
            vec![("counter".to_string(), AgentPhase::Failed("poisoned".to_string()))]
        );
        assert!(troupe.is_idle());

        let report = troupe.shutdown();
        assert_eq!(report[0].1, AgentPhase::Failed("poisoned".to_string()));
        assert!(counter.seen().is_empty(), "higher rule fired first");
    }

    #[test]
    fn pause_holds_scans_until_resume() {
        let counter = Counter::new();
        let mut troupe = Troupe::new();
        troupe.spawn(Arc::clone(&counter)).unwrap();
        eventually("first activation settles", || troupe.is_idle());

        troupe.pause_all();
        counter.mailbox().deliver(|t| t.inbox.push(1));
        thread::sleep(Duration::from_millis(50));
        assert!(counter.seen().is_empty());

        troupe.resume_all();
        eventually("resumed agent scans", || counter.seen() == vec![1]);
        troupe.shutdown();
    }

    #[test]
    fn shutdown_of_paused_troupe_completes() {
        let counter = Counter::new();
        let mut troupe = Troupe::new();
        troupe.spawn(Arc::clone(&counter)).unwrap();
        troupe.pause_all();

        let report = troupe.shutdown();
        assert!(report.iter().all(|(_, phase)| phase.is_completed()));
    }
}
