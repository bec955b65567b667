use crossbeam_channel::{never, select, Receiver};
use tracing::{debug, info};

use crate::display::DisplaySurface;
use crate::error::DisplayError;
use crate::stats::AggregationRecord;

/// Operator commands serviced by the accumulator loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Reset,
    Trim(usize),
}

/// Display history: one series per statistic, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    pub min: Vec<f64>,
    pub mean: Vec<f64>,
    pub max: Vec<f64>,
    pub p99: Vec<f64>,
}

impl SeriesSet {
    pub fn push(&mut self, record: &AggregationRecord) {
        self.min.push(record.min);
        self.mean.push(record.mean);
        self.max.push(record.max);
        self.p99.push(record.p99);
    }

    /// Drops the oldest `amount` points of every series long enough to lose
    /// them. Shorter series are left alone, not cleared.
    pub fn trim(&mut self, amount: usize) {
        for series in self.all_mut() {
            if series.len() >= amount {
                series.drain(..amount);
            }
        }
    }

    pub fn reset(&mut self) {
        for series in self.all_mut() {
            series.clear();
        }
    }

    /// Series in drawing order, back to front.
    pub fn named(&self) -> [(&'static str, &[f64]); 4] {
        [
            ("max", self.max.as_slice()),
            ("p99", self.p99.as_slice()),
            ("mean", self.mean.as_slice()),
            ("min", self.min.as_slice()),
        ]
    }

    pub fn latest(&self) -> Option<AggregationRecord> {
        Some(AggregationRecord {
            min: *self.min.last()?,
            mean: *self.mean.last()?,
            max: *self.max.last()?,
            p99: *self.p99.last()?,
        })
    }

    pub fn len(&self) -> usize {
        self.all().iter().map(|s| s.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.all().iter().all(|s| s.is_empty())
    }

    fn all(&self) -> [&Vec<f64>; 4] {
        [&self.min, &self.mean, &self.max, &self.p99]
    }

    fn all_mut(&mut self) -> [&mut Vec<f64>; 4] {
        [&mut self.min, &mut self.mean, &mut self.max, &mut self.p99]
    }
}

enum Event {
    Record(Option<AggregationRecord>),
    Control(Option<Control>),
    Cancel,
}

/// Sole owner of the series history. Appends records, applies operator
/// commands and renders once per record until cancelled.
pub struct App<D: DisplaySurface> {
    series: SeriesSet,
    display: D,
}

impl<D: DisplaySurface> App<D> {
    pub fn new(display: D) -> Self {
        Self {
            series: SeriesSet::default(),
            display,
        }
    }

    pub fn series(&self) -> &SeriesSet {
        &self.series
    }

    pub fn on_record(&mut self, record: AggregationRecord) -> Result<(), DisplayError> {
        self.series.push(&record);
        self.display.render(&self.series)
    }

    pub fn on_control(&mut self, control: Control) {
        match control {
            Control::Reset => self.series.reset(),
            Control::Trim(amount) => self.series.trim(amount),
        }
        debug!(?control, points = self.series.len(), "applied control");
    }

    /// Runs until `cancel` fires or the record feed closes. Returns the
    /// display so the caller can tear it down.
    pub fn run(
        mut self,
        records: Receiver<AggregationRecord>,
        controls: Receiver<Control>,
        cancel: Receiver<()>,
    ) -> Result<(SeriesSet, D), DisplayError> {
        let mut controls = controls;
        loop {
            let event = select! {
                recv(records) -> msg => Event::Record(msg.ok()),
                recv(controls) -> msg => Event::Control(msg.ok()),
                recv(cancel) -> _ => Event::Cancel,
            };

            match event {
                Event::Record(Some(record)) => self.on_record(record)?,
                Event::Record(None) => {
                    info!("record feed closed");
                    break;
                }
                Event::Control(Some(control)) => self.on_control(control),
                Event::Control(None) => controls = never(),
                Event::Cancel => {
                    info!("cancelled");
                    break;
                }
            }
        }
        Ok((self.series, self.display))
    }
}
