//! Text extraction: pull the full plain text out of a PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so Tokio worker threads never stall on a large document.
//!
//! The `%PDF` magic bytes are validated before pdfium ever sees the file,
//! so callers get a meaningful error rather than a library crash on an
//! arbitrary upload.

use crate::error::ReportError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extract the text of every page, joined with newlines.
///
/// # Errors
/// * [`ReportError::FileNotFound`] / [`ReportError::PermissionDenied`] /
///   [`ReportError::NotAPdf`] for input problems
/// * [`ReportError::ExtractionFailed`] when pdfium cannot open the document
///   or no page yields any text (image-only scans)
///
/// The minimum-length threshold is NOT applied here — that precondition
/// belongs to the caller ([`crate::report::generate_report_from_pdf`]), which
/// knows the configured limit.
pub async fn extract_text(path: &Path) -> Result<String, ReportError> {
    validate_pdf_path(path)?;

    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || extract_text_blocking(&owned))
        .await
        .map_err(|e| ReportError::Internal(format!("Extraction task panicked: {e}")))??;

    debug!("Extracted {} characters from {}", text.len(), path.display());
    Ok(text)
}

/// Validate existence, readability, and the `%PDF` magic bytes.
pub fn validate_pdf_path(path: &Path) -> Result<(), ReportError> {
    if !path.exists() {
        return Err(ReportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ReportError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ReportError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(ReportError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Blocking implementation of the text extraction.
fn extract_text_blocking(path: &PathBuf) -> Result<String, ReportError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ReportError::ExtractionFailed {
            path: path.clone(),
            detail: format!("{e:?}"),
        })?;

    let mut pages_text: Vec<String> = Vec::new();
    for page in document.pages().iter() {
        let page_text = page
            .text()
            .map(|t| t.all())
            .map_err(|e| ReportError::ExtractionFailed {
                path: path.clone(),
                detail: format!("{e:?}"),
            })?;
        pages_text.push(page_text);
    }

    let joined = pages_text.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return Err(ReportError::ExtractionFailed {
            path: path.clone(),
            detail: "no extractable text — the PDF may contain only images".into(),
        });
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_rejected() {
        let err = validate_pdf_path(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_bytes_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Hello, this is not a PDF at all").unwrap();

        let err = validate_pdf_path(file.path()).unwrap_err();
        match err {
            ReportError::NotAPdf { magic, .. } => assert_eq!(&magic, b"Hell"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn pdf_magic_bytes_pass_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7 rest of the document").unwrap();

        assert!(validate_pdf_path(file.path()).is_ok());
    }

    // Real pdfium extraction needs the shared library and a fixture PDF;
    // it is exercised by the gated end-to-end test in tests/report.rs.
}
