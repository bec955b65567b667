//! Runs a latency probe at a bounded rate and keeps a rolling
//! min/mean/max/p99 history for display.
//!
//! Data flows one way: the dispatcher admits probe launches through the
//! [`governor::Governor`], workers push samples into the
//! [`window::SampleWindow`], the aggregator summarises the window every tick,
//! and [`app::App`] folds the summaries into the series it renders.

pub mod aggregator;
pub mod app;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod governor;
pub mod logging;
pub mod pipeline;
pub mod probe;
pub mod script;
pub mod source;
pub mod stats;
pub mod ui;
pub mod util;
pub mod window;

use std::time::Duration;

use crate::script::ProbeScript;

/// Turns the operator's input into a ready-to-run probe script.
pub fn prepare_probe(input: &str, editor: &str, max: Duration) -> error::Result<ProbeScript> {
    let command = source::resolve_command(input, editor)?;
    Ok(ProbeScript::build(&command, max)?)
}
