//! Where the probe command comes from: a URL, an existing file, or a file
//! the operator writes in an editor on the spot.

use std::{fs, path::Path, process::Command};

use tracing::info;
use url::Url;

use crate::constants::DEFAULT_EDITOR;
use crate::error::SourceError;

/// Editor used for new command files: `$EDITOR`, else nano.
pub fn default_editor() -> String {
    std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

/// `Some` when `input` is an http(s) URL.
pub fn as_http_url(input: &str) -> Option<Url> {
    Url::parse(input)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Resolves `input` to the text of the probe command.
pub fn resolve_command(input: &str, editor: &str) -> Result<String, SourceError> {
    let text = if let Some(url) = as_http_url(input) {
        info!(%url, "probing URL with plain curl");
        format!("curl {url}")
    } else {
        let path = Path::new(input);
        if !path.exists() {
            edit_new_file(path, editor)?;
        }
        fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(SourceError::Empty(input.to_string()));
    }
    Ok(text)
}

fn edit_new_file(path: &Path, editor: &str) -> Result<(), SourceError> {
    fs::File::create(path).map_err(|source| SourceError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), editor, "opening editor for new command file");
    let status = Command::new(editor)
        .arg(path)
        .status()
        .map_err(|source| SourceError::EditorSpawn {
            editor: editor.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(SourceError::EditorFailed {
            editor: editor.to_string(),
            status,
        });
    }
    Ok(())
}
