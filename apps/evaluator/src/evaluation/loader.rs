//! Loader — reads a whole input document as UTF-8 text.

use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::errors::EvaluationError;
use crate::models::evaluation::Document;

/// Reads `path` in full. Never returns partial content: invalid UTF-8 is a `ReadError`,
/// blank content is `EmptyDocument`.
pub async fn load_document(path: &Path) -> Result<Document, EvaluationError> {
    info!("Loading file: {}", path.display());

    let bytes = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            EvaluationError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            EvaluationError::ReadError {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let text = String::from_utf8(bytes).map_err(|e| EvaluationError::ReadError {
        path: path.to_path_buf(),
        source: std::io::Error::new(ErrorKind::InvalidData, e),
    })?;

    if text.trim().is_empty() {
        return Err(EvaluationError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    Ok(Document {
        source: path.to_path_buf(),
        text,
    })
}
