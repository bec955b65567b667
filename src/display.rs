use std::io::Write;

use chrono::Local;

use crate::app::SeriesSet;
use crate::error::DisplayError;
use crate::util::format_latency;

/// Receives the whole series history after every aggregation record.
pub trait DisplaySurface {
    fn render(&mut self, series: &SeriesSet) -> Result<(), DisplayError>;
}

/// Line-per-record output for pipes and dumb terminals.
pub struct PlainDisplay<W: Write> {
    out: W,
}

impl<W: Write> PlainDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySurface for PlainDisplay<W> {
    fn render(&mut self, series: &SeriesSet) -> Result<(), DisplayError> {
        let Some(latest) = series.latest() else {
            return Ok(());
        };
        writeln!(
            self.out,
            "{} min={} mean={} max={} p99={}",
            Local::now().format("%H:%M:%S%.3f"),
            format_latency(latest.min),
            format_latency(latest.mean),
            format_latency(latest.max),
            format_latency(latest.p99),
        )?;
        self.out.flush()?;
        Ok(())
    }
}
