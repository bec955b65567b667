use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info};

use probe_monitor::{
    app::{App, Control},
    config::{Args, Config},
    constants::RECORD_QUEUE_CAPACITY,
    display::PlainDisplay,
    logging,
    pipeline::{Pipeline, PipelineSettings},
    prepare_probe,
    probe::ScriptProbe,
    source::default_editor,
    stats::AggregationRecord,
    ui::{self, TerminalDisplay},
};

struct Feeds {
    records: Receiver<AggregationRecord>,
    controls: (Sender<Control>, Receiver<Control>),
    cancel: (Sender<()>, Receiver<()>),
}

fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    let _log_guard = if config.plain {
        logging::init_stderr();
        None
    } else {
        Some(logging::init_file(&config.log_file)?)
    };
    info!(input = %config.input, rate = config.rate, max = ?config.max, "starting");

    let script = prepare_probe(&config.input, &default_editor(), config.max)
        .context("failed to prepare probe")?;
    let probe = Arc::new(ScriptProbe::new(script.path()));

    let (records_tx, records_rx) = crossbeam_channel::bounded(RECORD_QUEUE_CAPACITY);
    let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);
    let feeds = Feeds {
        records: records_rx,
        controls: crossbeam_channel::unbounded(),
        cancel: (cancel_tx.clone(), cancel_rx),
    };

    ctrlc::set_handler(move || {
        let _ = cancel_tx.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let mut pipeline = Pipeline::start(PipelineSettings::new(config.rate), probe, records_tx);

    let result = if config.plain {
        run_plain(feeds)
    } else {
        run_tui(&config, &pipeline, feeds)
    };

    pipeline.shutdown();
    if let Err(e) = &result {
        error!(error = %e, "exiting on error");
    }
    result
}

fn run_plain(feeds: Feeds) -> Result<()> {
    let Feeds { records, controls, cancel } = feeds;
    let display = PlainDisplay::new(io::stdout().lock());
    App::new(display).run(records, controls.1, cancel.1)?;
    Ok(())
}

fn run_tui(config: &Config, pipeline: &Pipeline, feeds: Feeds) -> Result<()> {
    let Feeds { records, controls, cancel } = feeds;

    let terminal = ui::enter_terminal().context("failed to set up terminal")?;
    let display = TerminalDisplay::new(terminal, config.input.as_str(), config.rate)
        .with_status(pipeline.status_handle());

    let stop_input = Arc::new(AtomicBool::new(false));
    let input = ui::spawn_input_thread(controls.0, cancel.0, Arc::clone(&stop_input));

    let res = App::new(display).run(records, controls.1, cancel.1);

    stop_input.store(true, Ordering::Release);
    let _ = input.join();
    ui::restore_terminal().context("failed to restore terminal")?;

    res?;
    Ok(())
}
