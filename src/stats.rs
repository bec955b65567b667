/// Point-in-time summary of the sample window, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregationRecord {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub p99: f64,
}

impl AggregationRecord {
    /// Summarises `samples`. Any statistic that cannot be computed (empty
    /// input, non-finite result) is reported as `0.0`.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;

        Self {
            min: or_zero(min),
            mean: or_zero(mean),
            max: or_zero(max),
            p99: or_zero(percentile(samples, 99.0)),
        }
    }
}

/// Linear interpolation between the closest ranks of the sorted samples.
pub fn percentile(samples: &[f64], pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
