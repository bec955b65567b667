use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::stats::AggregationRecord;
use crate::window::SampleWindow;

/// Summarises the current window contents.
pub fn aggregate(window: &Mutex<SampleWindow>) -> AggregationRecord {
    let samples = window.lock().snapshot();
    AggregationRecord::from_samples(&samples)
}

/// Emits one record per `tick` until `stop` is raised or the consumer hangs
/// up. A full queue blocks the thread rather than dropping records.
pub fn spawn_aggregator(
    window: Arc<Mutex<SampleWindow>>,
    records: Sender<AggregationRecord>,
    tick: Duration,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let ticker = crossbeam_channel::tick(tick);
        loop {
            if ticker.recv().is_err() || stop.load(Ordering::Acquire) {
                break;
            }
            let record = aggregate(&window);
            trace!(?record, "aggregated window");
            if records.send(record).is_err() {
                debug!("record consumer gone, aggregator exiting");
                break;
            }
        }
    })
}
