//! Wires the governor, probe workers, sample window and aggregator together.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::info;

use crate::aggregator::spawn_aggregator;
use crate::constants::{ADMISSION_POLL_MS, LAUNCH_WINDOW_MS, MAX_RATE, TICK_RATE_MS};
use crate::dispatch::{spawn_dispatcher, spawn_workers, CounterSnapshot, ProbeCounters};
use crate::governor::Governor;
use crate::probe::Probe;
use crate::stats::AggregationRecord;
use crate::window::SampleWindow;

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub rate: usize,
    pub tick: Duration,
    pub launch_window: Duration,
    pub poll: Duration,
}

impl PipelineSettings {
    pub fn new(rate: usize) -> Self {
        Self {
            rate: rate.clamp(1, MAX_RATE),
            tick: Duration::from_millis(TICK_RATE_MS),
            launch_window: Duration::from_millis(LAUNCH_WINDOW_MS),
            poll: Duration::from_millis(ADMISSION_POLL_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    pub in_flight: usize,
    /// Launches admitted within the trailing launch window.
    pub recent_launches: usize,
    pub window_len: usize,
    pub samples_appended: u64,
    pub probes: CounterSnapshot,
}

/// Read-only view of a running pipeline, cheap to clone into a display.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    governor: Arc<Governor>,
    window: Arc<Mutex<SampleWindow>>,
    counters: Arc<ProbeCounters>,
}

impl StatusHandle {
    pub fn status(&self) -> PipelineStatus {
        let (window_len, samples_appended) = {
            let window = self.window.lock();
            (window.len(), window.total_appended())
        };
        PipelineStatus {
            in_flight: self.governor.in_flight(),
            recent_launches: self.governor.recent_launches(),
            window_len,
            samples_appended,
            probes: self.counters.snapshot(),
        }
    }
}

pub struct Pipeline {
    governor: Arc<Governor>,
    window: Arc<Mutex<SampleWindow>>,
    counters: Arc<ProbeCounters>,
    stop: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
    aggregator: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Starts probing immediately. Records are pushed to `records` every
    /// `settings.tick`.
    pub fn start(
        settings: PipelineSettings,
        probe: Arc<dyn Probe>,
        records: Sender<AggregationRecord>,
    ) -> Self {
        let rate = settings.rate;
        let governor = Governor::with_timing(rate, settings.launch_window, settings.poll);
        let window = Arc::new(Mutex::new(SampleWindow::new(rate)));
        let counters = Arc::new(ProbeCounters::default());
        let stop = Arc::new(AtomicBool::new(false));

        let (jobs_tx, jobs_rx) = crossbeam_channel::bounded(rate);
        // Workers are detached: a probe stuck in a slow sub-process is
        // abandoned at shutdown, not drained.
        spawn_workers(
            rate,
            jobs_rx,
            probe,
            Arc::clone(&window),
            Arc::clone(&counters),
        );
        let dispatcher = spawn_dispatcher(
            Arc::clone(&governor),
            jobs_tx,
            Arc::clone(&counters),
            settings.poll,
            Arc::clone(&stop),
        );
        let aggregator = spawn_aggregator(
            Arc::clone(&window),
            records,
            settings.tick,
            Arc::clone(&stop),
        );

        info!(rate, tick_ms = settings.tick.as_millis() as u64, "pipeline started");
        Self {
            governor,
            window,
            counters,
            stop,
            dispatcher: Some(dispatcher),
            aggregator: Some(aggregator),
        }
    }

    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            governor: Arc::clone(&self.governor),
            window: Arc::clone(&self.window),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.status_handle().status()
    }

    /// Stops dispatching and aggregating. In-flight probes are left to finish
    /// on their own.
    pub fn shutdown(&mut self) -> PipelineStatus {
        self.stop.store(true, Ordering::Release);
        for handle in [self.dispatcher.take(), self.aggregator.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.join();
        }
        let status = self.status();
        info!(
            launched = status.probes.launched,
            completed = status.probes.completed,
            failed = status.probes.failed,
            in_flight = status.in_flight,
            "pipeline stopped"
        );
        status
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}
