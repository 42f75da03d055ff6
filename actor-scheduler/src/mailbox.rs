//! Message delivery: the agent's guarded state plus its doorbell.
//!
//! A message is not a queued object. Delivering one means running the
//! handler's mutation against the agent's state under the agent's lock and
//! then ringing the doorbell. The scheduler thread re-derives what to do by
//! scanning that state.
//!
//! ```text
//! sender thread                     agent thread
//! ─────────────                     ────────────
//! mailbox.deliver(|s| s.push(x))
//!   lock ── mutate ── unlock
//!   doorbell.ring()  ─────────────► doorbell.wait() returns Scan
//!                                   mailbox.scan(|s| rules.fire(s))
//! ```
//!
//! # No lost wake-ups
//!
//! The doorbell is a latched flag, not an edge. A ring that lands while the
//! agent is mid-scan leaves `pending` set, so the next `wait()` returns at
//! once and the agent scans again. Many rings before a scan collapse into one
//! pending flag; one pending scan is sufficient because the scan looks at all
//! of the state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};

use crate::lifecycle::AgentPhase;

/// Process-unique identity of an agent.
///
/// Agents compare each other by id rather than by pointer, so trait objects,
/// mocks and real agents are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u64);

static AGENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl AgentId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        AgentId(AGENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for AgentId {
    /// A fresh id, never a shared zero value.
    fn default() -> Self {
        AgentId::next()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a suspended scheduler was woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// State may have changed. Scan the rule table.
    Scan,
    /// The agent has been told to stop.
    Stop,
}

/// Between two scans: may the scheduler keep going?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    /// Paused. The pending flag has been re-latched; go back to `wait()`.
    Pause,
    Stop,
}

#[derive(Debug, Default)]
struct Bell {
    pending: bool,
    scanning: bool,
    paused: bool,
    stopped: bool,
    /// Set by the scheduler thread as it exits.
    exit: Option<AgentPhase>,
}

/// Something blocked outside the doorbell that must wake when it stops.
pub(crate) trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Latched wake signal with stop and pause control.
#[derive(Debug, Default)]
pub struct Doorbell {
    bell: Mutex<Bell>,
    signal: Condvar,
    watchers: Mutex<Vec<Weak<dyn Interrupt>>>,
}

impl Doorbell {
    /// A doorbell with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Bell> {
        self.bell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal that state changed. Never blocks beyond the flag's own lock.
    pub fn ring(&self) {
        self.lock().pending = true;
        self.signal.notify_all();
    }

    /// Block until rung (and not paused) or stopped.
    ///
    /// Consumes the pending flag. Marks the agent as scanning on `Wake::Scan`.
    pub fn wait(&self) -> Wake {
        let mut bell = self.lock();
        bell.scanning = false;
        loop {
            if bell.stopped {
                return Wake::Stop;
            }
            if bell.pending && !bell.paused {
                bell.pending = false;
                bell.scanning = true;
                return Wake::Scan;
            }
            bell = self
                .signal
                .wait(bell)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Checked by the scheduler between consecutive rule firings.
    pub fn checkpoint(&self) -> Checkpoint {
        let mut bell = self.lock();
        if bell.stopped {
            Checkpoint::Stop
        } else if bell.paused {
            // Resume must trigger a fresh scan of whatever the burst left.
            bell.pending = true;
            Checkpoint::Pause
        } else {
            Checkpoint::Continue
        }
    }

    /// Tell the scheduler to exit. Idempotent.
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.signal.notify_all();
        let watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        for watcher in watchers.iter().filter_map(Weak::upgrade) {
            watcher.interrupt();
        }
    }

    /// Have `watcher` interrupted by [`Doorbell::stop`]. Registering twice is
    /// a no-op.
    ///
    /// Register before checking [`Doorbell::is_stopped`]; a stop that lands
    /// after the check is then guaranteed to interrupt.
    pub(crate) fn watch(&self, watcher: Weak<dyn Interrupt>) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|w| w.strong_count() > 0);
        if !watchers.iter().any(|w| Weak::ptr_eq(w, &watcher)) {
            watchers.push(watcher);
        }
    }

    /// Called by the scheduler thread on its way out, whatever the reason.
    pub fn retire(&self, exit: AgentPhase) {
        let mut bell = self.lock();
        bell.stopped = true;
        bell.scanning = false;
        bell.pending = false;
        bell.exit = Some(exit);
        drop(bell);
        self.signal.notify_all();
    }

    /// Hold the scheduler before its next scan.
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Release a paused scheduler.
    pub fn resume(&self) {
        self.lock().paused = false;
        self.signal.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// No ring pending and no scan in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let bell = self.lock();
        !bell.pending && !bell.scanning
    }

    /// Live phase of the scheduler attached to this doorbell, or the phase
    /// it exited with.
    #[must_use]
    pub fn phase(&self) -> AgentPhase {
        let bell = self.lock();
        if let Some(exit) = &bell.exit {
            exit.clone()
        } else if bell.scanning {
            AgentPhase::Scanning
        } else {
            AgentPhase::Suspended
        }
    }
}

struct Inner<S> {
    state: Mutex<S>,
    doorbell: Arc<Doorbell>,
}

/// An agent's private state behind its lock, paired with its doorbell.
///
/// Cloning a `Mailbox` yields another handle to the same state; timer
/// callbacks capture a clone so they can deliver like any other sender.
pub struct Mailbox<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Mailbox<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Mailbox<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("doorbell", &self.inner.doorbell)
            .finish_non_exhaustive()
    }
}

impl<S> Mailbox<S> {
    /// Wrap the initial state. The doorbell starts with nothing pending.
    pub fn new(state: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                doorbell: Arc::new(Doorbell::new()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a message handler's mutation, then ring the doorbell.
    ///
    /// Safe from any thread. The handler must only record facts; it must not
    /// call into another agent (that would nest two mailbox locks).
    pub fn deliver<R>(&self, handler: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut state = self.lock();
            handler(&mut state)
        };
        self.inner.doorbell.ring();
        result
    }

    /// Read-only access for accessors and observers. Does not ring.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.lock();
        f(&state)
    }

    /// Exclusive access for one whole rule scan. Does not ring.
    ///
    /// Concurrent deliveries wait until the scan returns, so a scan never
    /// observes a half-applied append.
    pub fn scan<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.lock();
        f(&mut state)
    }

    /// Ring without mutating (e.g. after a rendezvous release).
    pub fn ring(&self) {
        self.inner.doorbell.ring();
    }

    /// The doorbell shared with this agent's scheduler and its troupe.
    pub fn doorbell(&self) -> &Arc<Doorbell> {
        &self.inner.doorbell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn ring_before_wait_is_not_lost() {
        let bell = Doorbell::new();
        bell.ring();
        assert_eq!(bell.wait(), Wake::Scan);
        assert!(!bell.is_idle(), "a woken scheduler is scanning");
    }

    #[test]
    fn many_rings_collapse_into_one_scan() {
        let bell = Arc::new(Doorbell::new());
        for _ in 0..10 {
            bell.ring();
        }
        assert_eq!(bell.wait(), Wake::Scan);

        let waiter = Arc::clone(&bell);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished(), "second wait should block");
        bell.stop();
        assert_eq!(handle.join().unwrap(), Wake::Stop);
    }

    #[test]
    fn stop_wins_over_pending() {
        let bell = Doorbell::new();
        bell.ring();
        bell.stop();
        assert_eq!(bell.wait(), Wake::Stop);
    }

    #[test]
    fn pause_holds_pending_ring_until_resume() {
        let bell = Arc::new(Doorbell::new());
        bell.pause();
        bell.ring();

        let waiter = Arc::clone(&bell);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished(), "paused doorbell must not wake");

        bell.resume();
        assert_eq!(handle.join().unwrap(), Wake::Scan);
    }

    #[test]
    fn checkpoint_relatches_on_pause() {
        let bell = Doorbell::new();
        assert_eq!(bell.checkpoint(), Checkpoint::Continue);
        bell.pause();
        assert_eq!(bell.checkpoint(), Checkpoint::Pause);
        bell.resume();
        assert_eq!(bell.wait(), Wake::Scan);
    }

    #[test]
    fn retired_doorbell_reports_exit_phase() {
        let bell = Doorbell::new();
        bell.ring();
        assert_eq!(bell.wait(), Wake::Scan);
        assert_eq!(bell.phase(), AgentPhase::Scanning);

        bell.retire(AgentPhase::Failed("no recipe".to_string()));
        assert_eq!(bell.phase(), AgentPhase::Failed("no recipe".to_string()));
        assert!(bell.is_stopped());
        assert!(bell.is_idle());
    }

    #[derive(Default)]
    struct Flag(std::sync::atomic::AtomicBool);

    impl Interrupt for Flag {
        fn interrupt(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn stop_interrupts_each_watcher_once_registered() {
        let bell = Doorbell::new();
        let flag = Arc::new(Flag::default());
        let watcher: Arc<dyn Interrupt> = flag.clone();
        bell.watch(Arc::downgrade(&watcher));
        bell.watch(Arc::downgrade(&watcher));
        assert_eq!(bell.watchers.lock().unwrap().len(), 1);

        let gone: Arc<dyn Interrupt> = Arc::new(Flag::default());
        bell.watch(Arc::downgrade(&gone));
        drop(gone);
        bell.watch(Arc::downgrade(&watcher));
        assert_eq!(bell.watchers.lock().unwrap().len(), 1, "dead watchers are pruned");

        bell.stop();
        assert!(flag.0.load(Ordering::SeqCst));
    }

    #[test]
    fn deliver_mutates_then_rings() {
        let mailbox = Mailbox::new(Vec::<u32>::new());
        assert!(mailbox.doorbell().is_idle());

        mailbox.deliver(|v| v.push(7));

        assert!(!mailbox.doorbell().is_idle());
        assert_eq!(mailbox.read(|v| v.clone()), vec![7]);
    }

    #[test]
    fn scan_and_read_do_not_ring() {
        let mailbox = Mailbox::new(0u32);
        mailbox.scan(|n| *n += 1);
        let seen = mailbox.read(|n| *n);
        assert_eq!(seen, 1);
        assert!(mailbox.doorbell().is_idle());
    }

    #[test]
    fn agent_ids_are_unique() {
        let a = AgentId::next();
        let b = AgentId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }
}
