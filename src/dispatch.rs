use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::constants::FAILURE_SENTINEL;
use crate::governor::{Governor, Permit};
use crate::probe::Probe;
use crate::window::SampleWindow;

#[derive(Debug, Default)]
pub struct ProbeCounters {
    launched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub launched: u64,
    pub completed: u64,
    pub failed: u64,
}

impl ProbeCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            launched: self.launched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Starts `size` probe workers fed from `jobs`. Each job is a permit: the
/// worker runs the probe, records the sample, then releases the permit.
/// Workers exit once every job sender is gone. If the OS refuses a thread the
/// pool runs with the workers it already has.
pub fn spawn_workers(
    size: usize,
    jobs: Receiver<Permit>,
    probe: Arc<dyn Probe>,
    window: Arc<Mutex<SampleWindow>>,
    counters: Arc<ProbeCounters>,
) -> Vec<JoinHandle<()>> {
    let mut workers = Vec::with_capacity(size);
    for id in 0..size {
        let jobs = jobs.clone();
        let probe = Arc::clone(&probe);
        let window = Arc::clone(&window);
        let counters = Arc::clone(&counters);
        let spawned = thread::Builder::new()
            .name(format!("probe-worker-{id}"))
            .spawn(move || {
                for permit in jobs.iter() {
                    let sample = probe.run();
                    window.lock().append(sample);
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    if sample == FAILURE_SENTINEL {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    drop(permit);
                }
            });
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                warn!(error = %e, spawned = workers.len(), requested = size, "failed to spawn probe worker");
                break;
            }
        }
    }
    workers
}

/// Admission loop: waits for the governor, hands the permit to a worker and
/// goes straight back to waiting. Runs until `stop` is raised.
pub fn spawn_dispatcher(
    governor: Arc<Governor>,
    jobs: Sender<Permit>,
    counters: Arc<ProbeCounters>,
    poll: Duration,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(limit = governor.limit(), "dispatcher started");
        while !stop.load(Ordering::Acquire) {
            let Some(permit) = governor.acquire_timeout(poll) else {
                continue;
            };
            counters.launched.fetch_add(1, Ordering::Relaxed);
            if jobs.send(permit).is_err() {
                debug!("probe workers gone, dispatcher exiting");
                break;
            }
        }
        info!("dispatcher stopped");
    })
}
