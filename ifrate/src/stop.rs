use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

/// Stop signal shared between a [`MonitorContext`] and its polling
/// threads.
///
/// [`MonitorContext`]: crate::MonitorContext
#[derive(Debug)]
pub(crate) struct Stop(AtomicBool);

const ORDERING: Ordering = Ordering::SeqCst;

/// longest a polling thread sleeps before checking the flag again
const WAKE_UP: Duration = Duration::from_millis(10);

impl Stop {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub(crate) fn get(&self) -> bool {
        self.0.load(ORDERING)
    }

    /// set the stop signal
    #[inline]
    pub(crate) fn toggle(&self) {
        self.0.store(true, ORDERING)
    }

    /// sleep until `deadline`, waking up regularly to check the flag
    ///
    /// returns `true` if the stop signal was set before the deadline.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.get() {
                return true;
            }

            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now) else {
                return false;
            };
            if remaining.is_zero() {
                return false;
            }

            thread::sleep(remaining.min(WAKE_UP));
        }
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new()
    }
}
