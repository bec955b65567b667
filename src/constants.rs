pub const TICK_RATE_MS: u64 = 250; // aggregation interval
pub const ADMISSION_POLL_MS: u64 = 100;
pub const INPUT_POLL_MS: u64 = 100;
pub const LAUNCH_WINDOW_MS: u64 = 1000;

pub const RECORD_QUEUE_CAPACITY: usize = 1000;
pub const TRIM_AMOUNT: usize = 100;

/// Sample value recorded for a probe that failed or printed garbage.
pub const FAILURE_SENTINEL: f64 = -1.0;

pub const DEFAULT_RATE: usize = 3;
/// Upper bound on `--rate`; each unit of rate is one worker thread.
pub const MAX_RATE: usize = 1000;
pub const DEFAULT_MAX: &str = "5.0s";
pub const DEFAULT_EDITOR: &str = "nano";
pub const DEFAULT_LOG_FILE: &str = "probe-monitor.log";
