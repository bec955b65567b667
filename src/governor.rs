//! Admission control for probe launches.
//!
//! A launch is admitted only while fewer than `limit` launches happened in
//! the trailing second and fewer than `limit` probes are in flight. Waiters
//! sleep on a condition variable and are woken when a permit is released;
//! the wait is also bounded so an expiring launch is noticed without an
//! explicit wake-up.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::constants::{ADMISSION_POLL_MS, LAUNCH_WINDOW_MS};

#[derive(Debug)]
struct AdmissionState {
    launches: VecDeque<Instant>,
    in_flight: usize,
}

#[derive(Debug)]
pub struct Governor {
    limit: usize,
    window: Duration,
    poll: Duration,
    state: Mutex<AdmissionState>,
    released: Condvar,
}

/// Proof of admission. Holding it counts as one probe in flight.
#[derive(Debug)]
pub struct Permit {
    governor: Arc<Governor>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut state = self.governor.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.governor.released.notify_one();
    }
}

impl Governor {
    pub fn new(limit: usize) -> Arc<Self> {
        Self::with_timing(
            limit,
            Duration::from_millis(LAUNCH_WINDOW_MS),
            Duration::from_millis(ADMISSION_POLL_MS),
        )
    }

    pub fn with_timing(limit: usize, window: Duration, poll: Duration) -> Arc<Self> {
        Arc::new(Self {
            limit: limit.max(1),
            window,
            poll,
            state: Mutex::new(AdmissionState {
                launches: VecDeque::new(),
                in_flight: 0,
            }),
            released: Condvar::new(),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Blocks until a launch is admitted.
    #[cfg(test)]
    pub(crate) fn acquire(self: &Arc<Self>) -> Permit {
        loop {
            if let Some(permit) = self.acquire_timeout(self.poll) {
                return permit;
            }
        }
    }

    /// Waits at most `timeout` for admission.
    pub fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Option<Permit> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            let now = Instant::now();
            self.expire(&mut state, now);

            if state.launches.len() < self.limit && state.in_flight < self.limit {
                state.launches.push_back(now);
                state.in_flight += 1;
                return Some(Permit {
                    governor: Arc::clone(self),
                });
            }

            if now >= deadline {
                return None;
            }

            let mut wait = self.poll.min(deadline - now);
            if state.launches.len() >= self.limit {
                if let Some(oldest) = state.launches.front() {
                    let expires_in = (*oldest + self.window).saturating_duration_since(now);
                    wait = wait.min(expires_in);
                }
            }
            self.released.wait_for(&mut state, wait);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Launches admitted within the trailing window.
    pub fn recent_launches(&self) -> usize {
        let mut state = self.state.lock();
        self.expire(&mut state, Instant::now());
        state.launches.len()
    }

    fn expire(&self, state: &mut AdmissionState, now: Instant) {
        while let Some(oldest) = state.launches.front() {
            if now.duration_since(*oldest) >= self.window {
                state.launches.pop_front();
            } else {
                break;
            }
        }
    }
}
