//! Deferred task scheduling
//!
//! Servo moves are fire-and-forget, a caller that wants to know when a move has physically
//! finished hands a callback to the servo which is scheduled on a [`Timer`] for the estimated
//! move duration. Scheduled tasks always fire exactly once and cannot be cancelled.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, trace, warn};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// A task to run once a delay has elapsed.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something tasks can be scheduled onto.
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Callback);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timer backed by a single worker thread.
///
/// Tasks run on the worker thread in deadline order, so a long running task delays the ones
/// behind it.
pub struct ThreadTimer {
    sender: Mutex<Sender<Pending>>,
}

/// Timer which only runs tasks when told to.
#[derive(Default)]
pub struct ManualTimer {
    pending: Mutex<Vec<(Duration, Callback)>>,
}

struct Pending {
    deadline: Instant,
    seq: u64,
    task: Callback,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ThreadTimer {
    /// Start the worker thread.
    pub fn new() -> std::io::Result<Self> {
        let (tx, rx) = channel();

        thread::Builder::new()
            .name("arm_timer".into())
            .spawn(move || timer_thread(rx))?;

        Ok(Self {
            sender: Mutex::new(tx),
        })
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, task: Callback) {
        let pending = Pending {
            deadline: Instant::now() + delay,
            seq: 0,
            task,
        };

        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(pending).is_err() {
            warn!("Timer thread has exited, dropping task scheduled in {:?}", delay);
        }
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Delays of the tasks waiting to fire, in the order they were scheduled.
    pub fn delays(&self) -> Vec<Duration> {
        self.lock().iter().map(|(d, _)| *d).collect()
    }

    /// Fire every task currently waiting, returning how many ran.
    ///
    /// Tasks scheduled by the fired tasks are left pending.
    pub fn fire_all(&self) -> usize {
        let tasks: Vec<_> = self.lock().drain(..).collect();
        let count = tasks.len();

        for (_, task) in tasks {
            task();
        }

        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Duration, Callback)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: Callback) {
        self.lock().push((delay, task));
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    /// Reversed so the `BinaryHeap` pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn timer_thread(receiver: Receiver<Pending>) {
    let mut queue = BinaryHeap::new();
    let mut next_seq = 0u64;
    let mut connected = true;

    while connected || !queue.is_empty() {
        let received = match queue.peek() {
            Some(Pending { deadline, .. }) if connected => {
                receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            Some(Pending { deadline, .. }) => {
                // Nothing more can arrive, just wait for the next deadline
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                Err(RecvTimeoutError::Timeout)
            }
            None => receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(mut pending) => {
                pending.seq = next_seq;
                next_seq += 1;
                queue.push(pending);
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => connected = false,
        }

        // Fire everything that is due
        while queue
            .peek()
            .map_or(false, |p| p.deadline <= Instant::now())
        {
            if let Some(pending) = queue.pop() {
                trace!("Firing timer task {}", pending.seq);
                let seq = pending.seq;
                if panic::catch_unwind(AssertUnwindSafe(pending.task)).is_err() {
                    error!("Timer task {} panicked", seq);
                }
            }
        }
    }

    trace!("Timer thread exiting");
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
