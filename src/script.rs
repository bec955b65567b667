use std::{
    fs,
    io::Write,
    os::unix::fs::PermissionsExt,
    path::Path,
    time::Duration,
};

use tempfile::TempPath;
use tracing::{debug, info};

use crate::error::ScriptError;

/// User read + execute.
const SCRIPT_MODE: u32 = 0o500;

/// Arguments that turn any curl command into a time-to-first-byte probe.
pub fn measurement_args(max: Duration) -> Vec<String> {
    vec![
        "-L".to_string(),
        "--silent".to_string(),
        "-o /dev/null".to_string(),
        "-w '%{time_starttransfer}\\n'".to_string(),
        format!("--max-time {:.6}", max.as_secs_f64()),
    ]
}

/// Joins the operator's command lines with the measurement arguments into
/// one continued shell command.
pub fn render_script(command: &str, max: Duration) -> String {
    command
        .trim()
        .lines()
        .map(|line| line.strip_suffix('\\').unwrap_or(line).to_string())
        .chain(measurement_args(max))
        .collect::<Vec<_>>()
        .join(" \\\n")
}

/// The probe command written to a temporary file. The file is removed when
/// this value is dropped.
#[derive(Debug)]
pub struct ProbeScript {
    path: TempPath,
}

impl ProbeScript {
    pub fn build(command: &str, max: Duration) -> Result<Self, ScriptError> {
        let body = render_script(command, max);

        let mut file = tempfile::Builder::new()
            .prefix("probe-")
            .suffix(".sh")
            .tempfile()
            .map_err(ScriptError::Write)?;
        file.write_all(body.as_bytes()).map_err(ScriptError::Write)?;
        file.flush().map_err(ScriptError::Write)?;
        // close the handle before anything tries to run the file
        let path = file.into_temp_path();

        fs::set_permissions(&path, fs::Permissions::from_mode(SCRIPT_MODE)).map_err(|source| {
            ScriptError::Permissions {
                path: path.to_path_buf(),
                source,
            }
        })?;

        info!(path = %path.display(), max_secs = max.as_secs_f64(), "probe script ready");
        debug!(script = %body, "probe script body");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
