use std::{
    fs,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use probe_monitor::{
    app::{App, Control, SeriesSet},
    constants::{FAILURE_SENTINEL, MAX_RATE},
    display::DisplaySurface,
    error::DisplayError,
    pipeline::{Pipeline, PipelineSettings},
    probe::{Probe, ScriptProbe},
    stats::AggregationRecord,
};

fn fast_settings(rate: usize) -> PipelineSettings {
    PipelineSettings {
        tick: Duration::from_millis(20),
        ..PipelineSettings::new(rate)
    }
}

/// Sleeps, tracks how many copies run at once and when each started.
#[derive(Default)]
struct TrackingProbe {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicU64,
    starts: Mutex<Vec<Instant>>,
}

impl TrackingProbe {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }
}

impl Probe for TrackingProbe {
    fn run(&self) -> f64 {
        self.starts.lock().push(Instant::now());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delay.as_secs_f64()
    }
}

struct FailingProbe;

impl Probe for FailingProbe {
    fn run(&self) -> f64 {
        FAILURE_SENTINEL
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn in_flight_and_window_stay_within_rate() {
    let rate = 4;
    let probe = TrackingProbe::new(Duration::from_millis(40));
    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(rate), probe.clone(), tx);

    let deadline = Instant::now() + Duration::from_millis(700);
    while Instant::now() < deadline {
        let status = pipeline.status();
        assert!(status.in_flight <= rate);
        assert!(status.window_len <= rate);
        assert!(status.recent_launches <= rate);
        thread::sleep(Duration::from_millis(5));
    }

    drop(rx);
    pipeline.shutdown();
    assert!(probe.peak.load(Ordering::SeqCst) <= rate);
    assert!(probe.calls.load(Ordering::SeqCst) > 0);
}

#[test]
fn launches_per_second_are_capped() {
    let rate = 5;
    let probe = TrackingProbe::new(Duration::ZERO);
    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(rate), probe.clone(), tx);

    thread::sleep(Duration::from_millis(2300));
    drop(rx);
    pipeline.shutdown();

    let starts = probe.starts.lock().clone();
    assert!(starts.len() >= rate, "only {} launches", starts.len());
    // three windows opened in 2.3s at most
    assert!(starts.len() <= rate * 3, "{} launches", starts.len());

    // start times trail admission slightly, so compare over a window
    // shortened by the admission polling interval
    let span = Duration::from_millis(900);
    for (i, first) in starts.iter().enumerate() {
        let within = starts[i..].iter().take_while(|t| t.duration_since(*first) < span).count();
        assert!(within <= rate, "{within} launches within {span:?}");
    }
}

#[test]
fn every_completed_probe_lands_in_the_window_once() {
    let rate = 8;
    let probe = TrackingProbe::new(Duration::from_millis(5));
    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(rate), probe.clone(), tx);

    thread::sleep(Duration::from_millis(1200));
    drop(rx);
    pipeline.shutdown();
    assert!(wait_until(Duration::from_secs(2), || pipeline.status().in_flight == 0));

    let status = pipeline.status();
    let calls = probe.calls.load(Ordering::SeqCst);
    assert_eq!(status.samples_appended, calls);
    assert_eq!(status.probes.completed, calls);
    assert_eq!(status.probes.launched, calls);
    assert_eq!(status.probes.failed, 0);
}

#[test]
fn failures_show_up_as_sentinels_in_records() {
    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(2), Arc::new(FailingProbe), tx);

    let record = rx
        .iter()
        .take(100)
        .find(|r| r.min == FAILURE_SENTINEL)
        .expect("sentinel never aggregated");
    assert_eq!(record.max, FAILURE_SENTINEL);

    drop(rx);
    pipeline.shutdown();
    assert!(pipeline.status().probes.failed > 0);
}

#[test]
fn script_probe_feeds_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("probe.sh");
    fs::write(&path, "echo 0.25\n").unwrap();

    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(3), Arc::new(ScriptProbe::new(&path)), tx);

    let record = rx
        .iter()
        .take(200)
        .find(|r| r.max > 0.0)
        .expect("no sample aggregated");
    assert_eq!(record.max, 0.25);
    assert_eq!(record.min, 0.25);

    drop(rx);
    pipeline.shutdown();
}

#[derive(Default, Clone)]
struct SharedRecorder {
    renders: Arc<Mutex<Vec<SeriesSet>>>,
}

impl DisplaySurface for SharedRecorder {
    fn render(&mut self, series: &SeriesSet) -> Result<(), DisplayError> {
        self.renders.lock().push(series.clone());
        Ok(())
    }
}

#[test]
fn accumulator_runs_against_live_pipeline_until_cancelled() {
    let (records_tx, records_rx) = crossbeam_channel::bounded(1000);
    let (controls_tx, controls_rx) = crossbeam_channel::unbounded();
    let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);

    let probe = TrackingProbe::new(Duration::from_millis(10));
    let mut pipeline = Pipeline::start(fast_settings(3), probe, records_tx);

    let recorder = SharedRecorder::default();
    let app = App::new(recorder.clone());
    let handle = thread::spawn(move || app.run(records_rx, controls_rx, cancel_rx));

    assert!(wait_until(Duration::from_secs(2), || recorder.renders.lock().len() >= 5));
    controls_tx.send(Control::Reset).unwrap();
    thread::sleep(Duration::from_millis(30));
    cancel_tx.send(()).unwrap();

    let (series, _) = handle.join().unwrap().unwrap();
    pipeline.shutdown();

    // reset happened after at least five appends
    let renders = recorder.renders.lock().len();
    assert!(renders >= 5);
    assert!(series.len() < renders);
}

#[test]
fn oversized_rate_is_clamped_before_start() {
    let settings = fast_settings(usize::MAX);
    assert_eq!(settings.rate, MAX_RATE);

    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(settings, Arc::new(FailingProbe), tx);
    assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    drop(rx);
    let status = pipeline.shutdown();
    assert!(status.window_len <= MAX_RATE);
}

#[test]
fn empty_window_aggregates_to_zero() {
    struct Stuck;
    impl Probe for Stuck {
        fn run(&self) -> f64 {
            thread::sleep(Duration::from_secs(5));
            0.0
        }
    }

    let (tx, rx) = crossbeam_channel::bounded(1000);
    let mut pipeline = Pipeline::start(fast_settings(1), Arc::new(Stuck), tx);
    let record = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(record, AggregationRecord::default());

    drop(rx);
    pipeline.shutdown();
}
