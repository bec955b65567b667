use crate::constants::FAILURE_SENTINEL;

// Format seconds for display, milliseconds below one second
pub fn format_latency(secs: f64) -> String {
    if secs == FAILURE_SENTINEL {
        "failed".to_string()
    } else if secs.abs() < 1.0 {
        format!("{:.1} ms", secs * 1000.0)
    } else {
        format!("{:.2} s", secs)
    }
}

/// Y-axis bounds covering every point, never collapsing to zero height.
pub fn value_bounds<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> [f64; 2] {
    let (lo, hi) = series
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo < f64::EPSILON {
        [lo, lo + 1.0]
    } else {
        [lo, hi * 1.05]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_units() {
        assert_eq!(format_latency(0.0), "0.0 ms");
        assert_eq!(format_latency(0.2345), "234.5 ms");
        assert_eq!(format_latency(1.5), "1.50 s");
        assert_eq!(format_latency(FAILURE_SENTINEL), "failed");
    }

    #[test]
    fn bounds_include_sentinels_and_zero() {
        let a = [0.5, 1.0];
        let b = [-1.0];
        assert_eq!(value_bounds([&a[..], &b[..]]), [-1.0, 1.05]);
        assert_eq!(value_bounds(Vec::<&[f64]>::new()), [0.0, 1.0]);
    }
}
