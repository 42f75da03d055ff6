//! Counting permit for "wait until the outside world says so" handshakes.
//!
//! An agent's own thread calls [`Rendezvous::acquire`] from inside an effect
//! and blocks until another thread calls [`Rendezvous::release`]. A release
//! that arrives first is banked, so the order of the two calls does not
//! matter. The blocked agent's doorbell interrupts the wait when it is
//! stopped, so shutdown is never held up by a cue that will never come.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::mailbox::{Doorbell, Interrupt};

#[derive(Debug)]
struct Gate {
    permits: Mutex<usize>,
    signal: Condvar,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Interrupt for Gate {
    fn interrupt(&self) {
        // Taking the lock orders this wake after a waiter's stop check.
        let _permits = self.lock();
        self.signal.notify_all();
    }
}

#[derive(Debug)]
pub struct Rendezvous {
    name: &'static str,
    gate: Arc<Gate>,
}

impl Rendezvous {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            gate: Arc::new(Gate {
                permits: Mutex::new(0),
                signal: Condvar::new(),
            }),
        }
    }

    /// Add one permit and wake a blocked acquirer. Never blocks.
    pub fn release(&self) {
        *self.gate.lock() += 1;
        self.gate.signal.notify_all();
    }

    /// Take one permit, blocking until one is available.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Stopped`] if `doorbell` is stopped while
    /// waiting.
    pub fn acquire(&self, doorbell: &Doorbell) -> HandlerResult {
        let gate: Arc<dyn Interrupt> = self.gate.clone();
        doorbell.watch(Arc::downgrade(&gate));

        let mut permits = self.gate.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return Ok(());
            }
            if doorbell.is_stopped() {
                debug!("rendezvous '{}' abandoned on stop", self.name);
                return Err(HandlerError::Stopped);
            }
            permits = self
                .gate
                .signal
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Permits banked and not yet acquired.
    pub fn available(&self) -> usize {
        *self.gate.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn release_before_acquire_is_banked() {
        let doorbell = Doorbell::new();
        let gate = Rendezvous::new("gate");
        gate.release();
        assert_eq!(gate.available(), 1);
        gate.acquire(&doorbell).unwrap();
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn acquire_blocks_until_released() {
        let doorbell = Arc::new(Doorbell::new());
        let gate = Arc::new(Rendezvous::new("gate"));

        let (g, d) = (Arc::clone(&gate), Arc::clone(&doorbell));
        let handle = thread::spawn(move || g.acquire(&d));

        thread::sleep(Duration::from_millis(40));
        assert!(!handle.is_finished());
        gate.release();
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn stop_interrupts_a_blocked_acquire() {
        let doorbell = Arc::new(Doorbell::new());
        let gate = Arc::new(Rendezvous::new("gate"));

        let (g, d) = (Arc::clone(&gate), Arc::clone(&doorbell));
        let handle = thread::spawn(move || g.acquire(&d));

        thread::sleep(Duration::from_millis(20));
        doorbell.stop();
        assert_eq!(handle.join().unwrap(), Err(HandlerError::Stopped));
    }

    #[test]
    fn reused_rendezvous_still_wakes_on_stop() {
        let doorbell = Arc::new(Doorbell::new());
        let gate = Arc::new(Rendezvous::new("gate"));
        for _ in 0..3 {
            gate.release();
            gate.acquire(&doorbell).unwrap();
        }

        let (g, d) = (Arc::clone(&gate), Arc::clone(&doorbell));
        let handle = thread::spawn(move || g.acquire(&d));
        thread::sleep(Duration::from_millis(20));

        let stopped_at = Instant::now();
        doorbell.stop();
        assert_eq!(handle.join().unwrap(), Err(HandlerError::Stopped));
        assert!(stopped_at.elapsed() < Duration::from_millis(500));
    }
}
