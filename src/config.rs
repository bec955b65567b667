use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::constants::{DEFAULT_LOG_FILE, DEFAULT_MAX, DEFAULT_RATE, MAX_RATE};
use crate::error::ConfigError;

/// Plot live latency statistics of a repeatedly executed probe command
#[derive(Debug, Parser)]
#[command(name = "probe-monitor")]
#[command(about = "Run a curl probe at a bounded rate and chart min/mean/max/p99 latency", long_about = None)]
pub struct Args {
    /// Command file to probe with, or an http(s) URL to curl.
    /// A missing file is created and opened in $EDITOR.
    pub input: String,

    /// Probes per second; also the in-flight cap and the sample window size
    #[arg(long, default_value_t = DEFAULT_RATE)]
    pub rate: usize,

    /// Maximum duration of a single probe (e.g. 5.0s, 1500ms)
    #[arg(long, default_value = DEFAULT_MAX)]
    pub max: String,

    /// Print one line per aggregation instead of drawing a chart
    #[arg(long)]
    pub plain: bool,

    /// Log destination while the chart owns the terminal
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: String,
    pub rate: usize,
    pub max: Duration,
    pub plain: bool,
    pub log_file: PathBuf,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        if self.rate == 0 {
            return Err(ConfigError::InvalidRate(self.rate));
        }
        if self.rate > MAX_RATE {
            return Err(ConfigError::RateTooHigh {
                rate: self.rate,
                max: MAX_RATE,
            });
        }
        let max = parse_max_duration(&self.max)?;
        let log_file = self
            .log_file
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE));

        Ok(Config {
            input: self.input,
            rate: self.rate,
            max,
            plain: self.plain,
            log_file,
        })
    }
}

/// Accepts humantime strings (`5s`, `1500ms`, `1m 30s`) as well as decimal
/// seconds with an optional `s` suffix (`5.0s`, `2.5`).
pub fn parse_max_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    let invalid = |reason: String| ConfigError::InvalidMax {
        input: input.to_string(),
        reason,
    };

    let duration = match humantime::parse_duration(trimmed) {
        Ok(duration) => duration,
        Err(humantime_err) => {
            let secs: f64 = trimmed
                .strip_suffix('s')
                .unwrap_or(trimmed)
                .parse()
                .map_err(|_| invalid(humantime_err.to_string()))?;
            Duration::try_from_secs_f64(secs).map_err(|e| invalid(e.to_string()))?
        }
    };

    if duration.is_zero() {
        return Err(invalid("duration must be greater than zero".to_string()));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(rate: usize, max: &str) -> Args {
        Args {
            input: "probe.sh".to_string(),
            rate,
            max: max.to_string(),
            plain: false,
            log_file: None,
        }
    }

    #[test]
    fn parses_decimal_and_humantime_durations() {
        assert_eq!(parse_max_duration("5.0s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_max_duration("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_max_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_max_duration("1m").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(matches!(
            parse_max_duration("soon"),
            Err(ConfigError::InvalidMax { .. })
        ));
        assert!(parse_max_duration("0s").is_err());
        assert!(parse_max_duration("-1.0s").is_err());
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = args(0, "5s").into_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRate(0)));
    }

    #[test]
    fn oversized_rate_is_rejected() {
        let err = Args::try_parse_from(["probe-monitor", "probe.sh", "--rate", "18446744073709551615"])
            .unwrap()
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::RateTooHigh { max: MAX_RATE, .. }));

        assert_eq!(args(MAX_RATE, "5s").into_config().unwrap().rate, MAX_RATE);
        assert!(args(MAX_RATE + 1, "5s").into_config().is_err());
    }

    #[test]
    fn defaults_come_from_clap() {
        let config = Args::try_parse_from(["probe-monitor", "https://example.com"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.rate, DEFAULT_RATE);
        assert_eq!(config.max, Duration::from_secs(5));
        assert!(!config.plain);
        assert!(config.log_file.ends_with(DEFAULT_LOG_FILE));
    }
}
