//! Shared timer thread.
//!
//! One coordinator thread owns a min-heap of deadlines. Agents hand it
//! closures through a [`Timers`] handle; when a deadline passes the closure
//! runs on the timer thread. Closures are expected to do nothing but
//! [`Mailbox::deliver`](crate::Mailbox::deliver) a mutation, so a timer
//! firing is indistinguishable from a message.
//!
//! ```text
//! agent thread ──after(d, cb)──► [command channel] ──► timer thread
//!                                                      heap.pop() at deadline
//!                                                      cb()  ──► mailbox.deliver
//! ```
//!
//! Timers sharing a deadline fire in the order they were scheduled. Timers
//! still pending at shutdown are dropped without running.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};

use crate::error::TimerError;

type Callback = Box<dyn FnOnce() + Send>;

/// Identity of a scheduled timer, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

struct Entry {
    id: u64,
    deadline: Instant,
    callback: Callback,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and we want the earliest deadline,
    // then the earliest id, on top.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

enum Command {
    Schedule {
        id: u64,
        deadline: Instant,
        callback: Callback,
    },
    Shutdown,
}

/// Cloneable handle for scheduling one-shot timers.
#[derive(Clone)]
pub struct Timers {
    commands: Sender<Command>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for Timers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timers")
            .field("scheduled", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Timers {
    /// Run `callback` once, no earlier than `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Disconnected`] after the service has shut down.
    pub fn after<F>(&self, delay: Duration, callback: F) -> Result<TimerId, TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.commands.send(Command::Schedule {
            id,
            deadline: Instant::now() + delay,
            callback: Box::new(callback),
        })?;
        trace!("timer-{} scheduled in {:?}", id, delay);
        Ok(TimerId(id))
    }
}

/// Owner of the timer thread.
pub struct TimerService {
    timers: Timers,
    join_handle: Option<JoinHandle<()>>,
}

impl TimerService {
    /// Spawn the coordinator thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn start() -> io::Result<Self> {
        let (commands, rx) = unbounded();
        let join_handle = thread::Builder::new()
            .name("timers".to_string())
            .spawn(move || run(rx))?;

        Ok(Self {
            timers: Timers {
                commands,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            join_handle: Some(join_handle),
        })
    }

    /// A handle agents keep for scheduling.
    pub fn handle(&self) -> Timers {
        self.timers.clone()
    }

    /// Stop the thread, dropping pending timers, and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let _ = self.timers.commands.send(Command::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            self.stop_and_join();
        }
    }
}

fn run(commands: Receiver<Command>) {
    let mut heap: BinaryHeap<Entry> = BinaryHeap::new();

    loop {
        while heap
            .peek()
            .is_some_and(|entry| entry.deadline <= Instant::now())
        {
            if let Some(entry) = heap.pop() {
                trace!("timer-{} fired", entry.id);
                (entry.callback)();
            }
        }

        let command = match heap.peek() {
            Some(next) => {
                let timeout = next.deadline.saturating_duration_since(Instant::now());
                match commands.recv_timeout(timeout) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Schedule {
                id,
                deadline,
                callback,
            } => heap.push(Entry {
                id,
                deadline,
                callback,
            }),
            Command::Shutdown => break,
        }
    }

    debug!("timer thread exiting, {} pending timer(s) dropped", heap.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn fires_once_after_delay() {
        let service = TimerService::start().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let started = Instant::now();

        service
            .handle()
            .after(Duration::from_millis(20), move || {
                let _ = tx.send(Instant::now());
            })
            .unwrap();

        let fired_at = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired_at.duration_since(started) >= Duration::from_millis(20));
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Disconnected),
            "callback consumed, sender dropped"
        );
        service.shutdown();
    }

    #[test]
    fn fires_in_deadline_order() {
        let service = TimerService::start().unwrap();
        let timers = service.handle();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        for (label, ms) in [("slow", 60u64), ("fast", 10), ("mid", 30)] {
            let order = Arc::clone(&order);
            let done_tx = done_tx.clone();
            timers
                .after(Duration::from_millis(ms), move || {
                    order.lock().unwrap().push(label);
                    let _ = done_tx.send(());
                })
                .unwrap();
        }
        for _ in 0..3 {
            done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["fast", "mid", "slow"]);
        service.shutdown();
    }

    #[test]
    fn shutdown_drops_pending_and_rejects_new_work() {
        let service = TimerService::start().unwrap();
        let timers = service.handle();
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        timers
            .after(Duration::from_secs(30), move || *flag.lock().unwrap() = true)
            .unwrap();

        service.shutdown();

        assert!(!*fired.lock().unwrap());
        assert_eq!(
            timers.after(Duration::ZERO, || {}),
            Err(TimerError::Disconnected)
        );
    }
}
