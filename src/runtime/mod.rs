//! Cooperative runtime - timer and animation-frame queues.
//!
//! Models the host UI runtime's task queues deterministically:
//! - `set_timeout` / `clear_timeout` - one-shot timers, cancelable
//! - `request_frame` - callbacks run at the next frame opportunity
//! - `advance(ms)` - test driver; runs due timers in deadline order and
//!   flushes frame callbacks between tasks
//!
//! Every suspension point of the relation engine goes through this module;
//! recomputation never blocks the calling event handler. Callbacks may
//! schedule further timers and frames reentrantly - the queue borrow is
//! released before any callback runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Cancellation handle for a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

type Task = Box<dyn FnOnce()>;

struct Timer {
    id: u64,
    deadline: u64,
    task: Task,
}

struct RuntimeInner {
    now: u64,
    next_id: u64,
    timers: Vec<Timer>,
    frames: VecDeque<Task>,
}

/// Clonable handle to the task queues.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RefCell<RuntimeInner>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            inner: Rc::new(RefCell::new(RuntimeInner {
                now: 0,
                next_id: 0,
                timers: Vec::new(),
                frames: VecDeque::new(),
            })),
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Schedule `task` to run once after `delay_ms`.
    pub fn set_timeout(&self, delay_ms: u64, task: impl FnOnce() + 'static) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.now + delay_ms;
        inner.timers.push(Timer {
            id,
            deadline,
            task: Box::new(task),
        });
        TimerId(id)
    }

    /// Cancel a pending timer. Returns whether it was still pending.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.timers.len();
        inner.timers.retain(|t| t.id != id.0);
        inner.timers.len() != before
    }

    /// Queue `task` for the next frame opportunity.
    pub fn request_frame(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().frames.push_back(Box::new(task));
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Advance virtual time by `ms`.
    ///
    /// Runs all timers whose deadline falls inside the window, in deadline
    /// order (insertion order breaks ties), flushing frame callbacks before
    /// each timer batch and once at the end. Timers scheduled by callbacks
    /// run within the same call when their deadline fits the window.
    pub fn advance(&self, ms: u64) {
        let target = self.inner.borrow().now + ms;
        loop {
            self.flush_frames();
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.id))
                    .map(|(at, _)| at);
                due.map(|at| inner.timers.remove(at))
            };
            match next {
                Some(timer) => {
                    {
                        let mut inner = self.inner.borrow_mut();
                        inner.now = inner.now.max(timer.deadline);
                    }
                    (timer.task)();
                }
                None => break,
            }
        }
        self.flush_frames();
        self.inner.borrow_mut().now = target;
    }

    /// Run queued frame callbacks, including ones queued while flushing.
    pub fn flush_frames(&self) {
        loop {
            let task = self.inner.borrow_mut().frames.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_timers_run_in_deadline_order() {
        let rt = Runtime::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        rt.set_timeout(50, move || o.borrow_mut().push("b"));
        let o = Rc::clone(&order);
        rt.set_timeout(10, move || o.borrow_mut().push("a"));
        let o = Rc::clone(&order);
        rt.set_timeout(90, move || o.borrow_mut().push("c"));

        rt.advance(100);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
        assert_eq!(rt.now_ms(), 100);
    }

    #[test]
    fn test_timer_not_due_stays_pending() {
        let rt = Runtime::new();
        let fired = Rc::new(RefCell::new(false));
        let f = Rc::clone(&fired);
        rt.set_timeout(100, move || *f.borrow_mut() = true);

        rt.advance(99);
        assert!(!*fired.borrow());
        assert_eq!(rt.pending_timers(), 1);

        rt.advance(1);
        assert!(*fired.borrow());
        assert_eq!(rt.pending_timers(), 0);
    }

    #[test]
    fn test_clear_timeout() {
        let rt = Runtime::new();
        let fired = Rc::new(RefCell::new(false));
        let f = Rc::clone(&fired);
        let id = rt.set_timeout(10, move || *f.borrow_mut() = true);

        assert!(rt.clear_timeout(id));
        assert!(!rt.clear_timeout(id));
        rt.advance(20);
        assert!(!*fired.borrow());
    }

    #[test]
    fn test_reentrant_timer_within_window() {
        let rt = Runtime::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        let rt_clone = rt.clone();
        rt.set_timeout(10, move || {
            o.borrow_mut().push(1);
            let o2 = Rc::clone(&o);
            rt_clone.set_timeout(10, move || o2.borrow_mut().push(2));
        });

        rt.advance(30);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_frames_flush_before_and_between_timers() {
        let rt = Runtime::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        rt.request_frame(move || o.borrow_mut().push("frame"));
        let o = Rc::clone(&order);
        let rt_clone = rt.clone();
        rt.set_timeout(10, move || {
            o.borrow_mut().push("timer");
            let o2 = Rc::clone(&o);
            rt_clone.request_frame(move || o2.borrow_mut().push("frame-after"));
        });

        rt.advance(10);
        assert_eq!(*order.borrow(), vec!["frame", "timer", "frame-after"]);
        assert_eq!(rt.pending_frames(), 0);
    }

    #[test]
    fn test_now_advances_to_deadline_during_callbacks() {
        let rt = Runtime::new();
        let seen = Rc::new(RefCell::new(0));
        let s = Rc::clone(&seen);
        let rt_clone = rt.clone();
        rt.set_timeout(40, move || *s.borrow_mut() = rt_clone.now_ms());

        rt.advance(100);
        assert_eq!(*seen.borrow(), 40);
    }
}
