//! Macro and workbook-export files attached to a message.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["xlsm", "txt", "vba", "bas", "cls", "frm"];

const DEFAULT_PROMPT: &str = "Analyze the attached files.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("{0}: unsupported file type")]
    Unsupported(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}: not valid UTF-8 text")]
    NotText(PathBuf),
}

pub fn is_accepted(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

pub async fn read_attachment(path: &Path) -> Result<FileAttachment, AttachmentError> {
    if !is_accepted(path) {
        return Err(AttachmentError::Unsupported(path.to_path_buf()));
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| AttachmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content =
        String::from_utf8(bytes).map_err(|_| AttachmentError::NotText(path.to_path_buf()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(FileAttachment { name, content })
}

/// Read files one after another, logging and skipping any that fail.
pub async fn read_attachments(paths: &[PathBuf]) -> Vec<FileAttachment> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match read_attachment(path).await {
            Ok(file) => {
                tracing::debug!(file = %file.name, bytes = file.content.len(), "Attached file");
                files.push(file);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping attachment"),
        }
    }
    files
}

/// Build the outbound text for a message with attached files.
pub fn compose_with_attachments(content: &str, files: &[FileAttachment]) -> String {
    let prompt = if content.trim().is_empty() {
        DEFAULT_PROMPT
    } else {
        content
    };

    let rendered: Vec<String> = files
        .iter()
        .map(|file| format!("\n--- {} ---\n```vba\n{}\n```", file.name, file.content))
        .collect();

    format!("{}\n\nAttached files:\n{}", prompt, rendered.join("\n"))
}
