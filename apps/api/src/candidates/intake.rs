//! Upload intake: persist the raw file, then turn it into resume text.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Extensions accepted as audio. Speech-to-text is not wired in.
const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "m4a", "flac"];

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed to access upload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audio uploads (.{0}) are not supported; upload a text or PDF resume")]
    UnsupportedMedia(String),

    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("upload is not valid UTF-8 text")]
    NotUtf8,

    #[error("upload contains no resume text")]
    Empty,

    #[error("text extraction worker failed: {0}")]
    Worker(#[from] JoinError),
}

/// Lowercased extension of an uploaded file name, if it has a sane one.
fn extension_of(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    let sane = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    sane.then_some(ext)
}

/// Writes the upload under a fresh unique name, keeping the original extension.
pub async fn save_upload(
    dir: &Path,
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<PathBuf, IntakeError> {
    let stored = match extension_of(file_name) {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    };
    let path = dir.join(stored);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| IntakeError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| IntakeError::Io {
            path: path.clone(),
            source,
        })?;

    debug!(path = %path.display(), size = bytes.len(), "upload saved");
    Ok(path)
}

/// Reads a saved upload as resume text. PDFs are parsed on a blocking worker.
pub async fn read_resume_text(path: &Path) -> Result<String, IntakeError> {
    let ext = extension_of(path.file_name().and_then(|n| n.to_str()));
    if let Some(ext) = ext.as_deref() {
        if AUDIO_EXTENSIONS.contains(&ext) {
            return Err(IntakeError::UnsupportedMedia(ext.to_string()));
        }
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IntakeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let text = if ext.as_deref() == Some("pdf") {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await?
            .map_err(|e| IntakeError::Pdf(e.to_string()))?
    } else {
        String::from_utf8(bytes).map_err(|_| IntakeError::NotUtf8)?
    };

    if text.trim().is_empty() {
        return Err(IntakeError::Empty);
    }
    Ok(text)
}

/// Best-effort removal of a stored upload.
pub async fn discard_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove upload");
    }
}
