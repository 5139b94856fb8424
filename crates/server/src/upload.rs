//! Upload validation and storage

use crate::error::AppError;
use axum::extract::multipart::Field;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Part content types accepted for an upload
const ALLOWED_CONTENT_TYPES: [&str; 2] = ["application/pdf", "application/octet-stream"];

/// Check the part's declared media type, ignoring parameters
pub(crate) fn validate_content_type(content_type: Option<&str>) -> Result<(), AppError> {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match media_type {
        Some(mt) if ALLOWED_CONTENT_TYPES.contains(&mt.as_str()) => Ok(()),
        _ => Err(AppError::bad_request("Content-Type must be application/pdf")),
    }
}

/// Check the client filename and return the lowercased extension
pub(crate) fn validate_filename(file_name: Option<&str>) -> Result<String, AppError> {
    let file_name = file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::bad_request("File must have a filename"))?;

    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("pdf") => Ok("pdf".to_string()),
        _ => Err(AppError::bad_request("Only PDF files are allowed")),
    }
}

/// Stream a multipart field into `dir/<uuid>.<extension>`
///
/// A partially written file is removed when the body fails mid-stream.
pub(crate) async fn save_upload(
    mut field: Field<'_>,
    dir: &Path,
    extension: &str,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("{}.{extension}", Uuid::new_v4().simple()));
    let mut file = File::create(&path).await?;

    let mut written = 0u64;
    let copied: Result<(), AppError> = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = copied {
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %remove_err, "failed to remove partial upload");
        }
        return Err(e);
    }

    debug!(path = %path.display(), bytes = written, "saved upload");
    Ok(path)
}
