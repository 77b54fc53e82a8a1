//! Single-threaded task queue with timers.
//!
//! Models the page's main thread: one-shot timeouts and repeating intervals are
//! queued against a clock and delivered one at a time. Time is virtual; hosts move
//! it forward with [`EventLoop::advance`] (tests, simulations) or
//! [`EventLoop::run_for`] (which sleeps in real time between due timers).
//!
//! Timers fire in `(due time, registration order)`. No internal borrow is held
//! while a callback runs, so callbacks may schedule or cancel timers, including
//! the one that is currently firing.
//!
//! Not thread-safe. Handles are `Rc`-based and meant to stay on one thread.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};

/// Identifies a scheduled timer. Ids are never reused within a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeat {
        period: chrono::Duration,
        callback: Rc<dyn Fn()>,
    },
}

struct Timer {
    due: DateTime<Utc>,
    task: Task,
}

struct LoopState {
    now: DateTime<Utc>,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer>,
}

enum Due {
    Once(Box<dyn FnOnce()>),
    Repeat(Rc<dyn Fn()>),
}

#[derive(Clone)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

/// Converts to millisecond precision, the resolution page timers run at.
pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    let millis = duration.as_millis().min(i64::MAX as u128) as i64;
    chrono::Duration::milliseconds(millis)
}

/// `at + delta`, pinned to the end of representable time on overflow.
fn saturating_add(at: DateTime<Utc>, delta: chrono::Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl EventLoop {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Starts the clock at `now`, truncated to whole milliseconds.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        EventLoop {
            state: Rc::new(RefCell::new(LoopState {
                now: now.trunc_subsecs(3),
                next_id: 1,
                timers: BTreeMap::new(),
            })),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.state.borrow().now
    }

    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        self.schedule(to_chrono(delay), Task::Once(Box::new(callback)))
    }

    /// Schedules `callback` every `period`. Periods under 1ms are raised to 1ms.
    pub fn set_interval(&self, period: Duration, callback: impl Fn() + 'static) -> TimerId {
        let period = to_chrono(period).max(chrono::Duration::milliseconds(1));
        self.schedule(
            period,
            Task::Repeat {
                period,
                callback: Rc::new(callback),
            },
        )
    }

    fn schedule(&self, delay: chrono::Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let due = saturating_add(state.now, delay);
        state.timers.insert(id, Timer { due, task });
        id
    }

    /// Cancels a timer. Returns false if it already fired (one-shot) or was cleared.
    pub fn clear(&self, id: TimerId) -> bool {
        self.state.borrow_mut().timers.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.state.borrow().timers.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().timers.values().map(|timer| timer.due).min()
    }

    /// Moves the clock forward by `by`, firing everything due on the way.
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = saturating_add(self.now(), to_chrono(by));
        self.advance_to(target)
    }

    pub fn advance_to(&self, target: DateTime<Utc>) -> usize {
        let mut fired = 0;
        while self.fire_next(target) {
            fired += 1;
        }
        let mut state = self.state.borrow_mut();
        if target > state.now {
            state.now = target;
        }
        fired
    }

    /// Runs the loop in real time for `duration`, sleeping until each timer is due.
    pub fn run_for(&self, duration: Duration) -> usize {
        let target = saturating_add(self.now(), to_chrono(duration));
        let mut fired = 0;
        while let Some(due) = self.next_due().filter(|due| *due <= target) {
            let wait = (due - self.now()).to_std().unwrap_or_default();
            thread::sleep(wait);
            fired += self.advance_to(due);
        }
        let rest = (target - self.now()).to_std().unwrap_or_default();
        thread::sleep(rest);
        fired + self.advance_to(target)
    }

    fn fire_next(&self, target: DateTime<Utc>) -> bool {
        let due = {
            let mut state = self.state.borrow_mut();
            let next = state
                .timers
                .iter()
                .filter(|(_, timer)| timer.due <= target)
                .min_by_key(|(id, timer)| (timer.due, **id))
                .map(|(id, _)| *id);
            let Some(id) = next else {
                return false;
            };
            let Some(timer) = state.timers.remove(&id) else {
                return false;
            };
            if timer.due > state.now {
                state.now = timer.due;
            }
            match timer.task {
                Task::Once(callback) => Due::Once(callback),
                Task::Repeat { period, callback } => {
                    let fire = Rc::clone(&callback);
                    // An interval whose next tick is past the end of time is done.
                    if let Some(due) = timer.due.checked_add_signed(period) {
                        state.timers.insert(
                            id,
                            Timer {
                                due,
                                task: Task::Repeat { period, callback },
                            },
                        );
                    }
                    Due::Repeat(fire)
                }
            }
        };

        match due {
            Due::Once(callback) => callback(),
            Due::Repeat(callback) => callback(),
        }
        true
    }
}
