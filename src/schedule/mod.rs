//! Update scheduler - coalescing primitives for geometry-changing events.
//!
//! Two primitives, both built on [`Runtime`] timers:
//! - [`Throttle`] - fixed window, trailing edge. At most one invocation per
//!   window; the most recent call's argument is used for the delayed
//!   invocation.
//! - [`Debounce`] - cancel-and-restart single timer; fires once after
//!   quiescence. `call_in` overrides the delay per call (fast paths).
//!
//! Instances own their primitives (no shared state across instances) and
//! cancel them on destruction - a cleared timer is never replayed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::{Runtime, TimerId};

struct Pending<T> {
    timer: Option<TimerId>,
    value: Option<T>,
}

// =============================================================================
// THROTTLE
// =============================================================================

/// Fixed-window, trailing-edge invocation limiter.
pub struct Throttle<T> {
    runtime: Runtime,
    window_ms: u64,
    action: Rc<dyn Fn(T)>,
    state: Rc<RefCell<Pending<T>>>,
}

impl<T: 'static> Throttle<T> {
    pub fn new(runtime: &Runtime, window_ms: u64, action: impl Fn(T) + 'static) -> Self {
        Throttle {
            runtime: runtime.clone(),
            window_ms,
            action: Rc::new(action),
            state: Rc::new(RefCell::new(Pending {
                timer: None,
                value: None,
            })),
        }
    }

    /// Record `value` and arm the window timer if idle. Calls arriving while
    /// the window is open only replace the stored value.
    pub fn call(&self, value: T) {
        let mut state = self.state.borrow_mut();
        state.value = Some(value);
        if state.timer.is_none() {
            let shared = Rc::clone(&self.state);
            let action = Rc::clone(&self.action);
            state.timer = Some(self.runtime.set_timeout(self.window_ms, move || {
                let value = {
                    let mut shared = shared.borrow_mut();
                    shared.timer = None;
                    shared.value.take()
                };
                if let Some(value) = value {
                    action(value);
                }
            }));
        }
    }

    /// Drop any pending invocation.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(timer) = state.timer.take() {
            self.runtime.clear_timeout(timer);
        }
        state.value = None;
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().timer.is_some()
    }
}

// =============================================================================
// DEBOUNCE
// =============================================================================

/// Delay-and-restart invocation limiter ("stable update").
pub struct Debounce<T> {
    runtime: Runtime,
    delay_ms: u64,
    action: Rc<dyn Fn(T)>,
    state: Rc<RefCell<Pending<T>>>,
}

impl<T: 'static> Debounce<T> {
    pub fn new(runtime: &Runtime, delay_ms: u64, action: impl Fn(T) + 'static) -> Self {
        Debounce {
            runtime: runtime.clone(),
            delay_ms,
            action: Rc::new(action),
            state: Rc::new(RefCell::new(Pending {
                timer: None,
                value: None,
            })),
        }
    }

    /// Restart the timer with the default delay.
    pub fn call(&self, value: T) {
        self.call_in(value, self.delay_ms);
    }

    /// Restart the timer with an explicit delay. A shorter delay on a later
    /// call shortens the pending fire - last call wins entirely.
    pub fn call_in(&self, value: T, delay_ms: u64) {
        let mut state = self.state.borrow_mut();
        if let Some(timer) = state.timer.take() {
            self.runtime.clear_timeout(timer);
        }
        state.value = Some(value);
        let shared = Rc::clone(&self.state);
        let action = Rc::clone(&self.action);
        state.timer = Some(self.runtime.set_timeout(delay_ms, move || {
            let value = {
                let mut shared = shared.borrow_mut();
                shared.timer = None;
                shared.value.take()
            };
            if let Some(value) = value {
                action(value);
            }
        }));
    }

    /// Drop any pending invocation.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        if let Some(timer) = state.timer.take() {
            self.runtime.clear_timeout(timer);
        }
        state.value = None;
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = Rc::clone(&seen);
        (seen, move |v| inner.borrow_mut().push(v))
    }

    #[test]
    fn test_throttle_burst_coalesces_to_one_trailing_call() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let throttle = Throttle::new(&rt, 90, action);

        throttle.call(1);
        rt.advance(10);
        throttle.call(2);
        rt.advance(10);
        throttle.call(3);

        rt.advance(70); // window boundary at t=90
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn test_throttle_at_most_one_per_window() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let throttle = Throttle::new(&rt, 50, action);

        throttle.call(1);
        rt.advance(50);
        throttle.call(2);
        rt.advance(50);

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_throttle_cancel() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let throttle = Throttle::new(&rt, 50, action);

        throttle.call(1);
        throttle.cancel();
        rt.advance(100);
        assert!(seen.borrow().is_empty());
        assert!(!throttle.is_pending());
    }

    #[test]
    fn test_debounce_restarts_on_each_call() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let debounce = Debounce::new(&rt, 140, action);

        debounce.call(1);
        rt.advance(100);
        debounce.call(2);
        rt.advance(100);
        assert!(seen.borrow().is_empty()); // restarted at t=100

        rt.advance(40); // quiescent since t=100, fires at t=240
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_debounce_fast_path_delay_override() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let debounce = Debounce::new(&rt, 140, action);

        debounce.call(1);
        debounce.call_in(2, 70);
        rt.advance(70);
        assert_eq!(*seen.borrow(), vec![2]);

        rt.advance(200);
        assert_eq!(*seen.borrow(), vec![2]); // default-delay timer was cancelled
    }

    #[test]
    fn test_debounce_cancel() {
        let rt = Runtime::new();
        let (seen, action) = counter();
        let debounce = Debounce::new(&rt, 50, action);

        debounce.call(1);
        debounce.cancel();
        rt.advance(100);
        assert!(seen.borrow().is_empty());
    }
}
