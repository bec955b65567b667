use std::{
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use tracing::debug;

use crate::constants::FAILURE_SENTINEL;

/// One latency measurement, in seconds.
pub trait Probe: Send + Sync {
    /// Runs the probe to completion. Failures come back as
    /// [`FAILURE_SENTINEL`], never as errors.
    fn run(&self) -> f64;
}

/// Runs a prepared probe script in its own `sh` process and reads the
/// elapsed seconds from the last line it prints.
#[derive(Debug, Clone)]
pub struct ScriptProbe {
    path: PathBuf,
}

impl ScriptProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn execute(&self) -> std::io::Result<Output> {
        Command::new("sh")
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
    }
}

impl Probe for ScriptProbe {
    fn run(&self) -> f64 {
        let output = match self.execute() {
            Ok(output) => output,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "probe failed to spawn");
                return FAILURE_SENTINEL;
            }
        };

        if !output.status.success() {
            debug!(path = %self.path.display(), status = %output.status, "probe exited unsuccessfully");
            return FAILURE_SENTINEL;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_elapsed(&stdout) {
            Some(secs) => secs,
            None => {
                debug!(path = %self.path.display(), stdout = %stdout.trim(), "probe output is not a number");
                FAILURE_SENTINEL
            }
        }
    }
}

/// Last non-blank line of the probe output as finite seconds.
pub fn parse_elapsed(stdout: &str) -> Option<f64> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    line.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
