//! Request-scoped uploaded files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A file uploaded with a chat message and parked on local disk for the
/// duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
  /// Name supplied by the client.
  pub filename:     String,
  /// Temporary location on disk; removed when the request finishes.
  pub path:         PathBuf,
  /// MIME type, either client-declared or inferred from the extension.
  pub content_type: String,
}

impl UploadedFile {
  pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    let filename = filename.into();
    let content_type = guess_content_type(&filename).to_string();
    Self { filename, path: path.into(), content_type }
  }

  /// Whether the completion model should receive the raw bytes of this file
  /// for multimodal interpretation.
  pub fn is_multimodal(&self) -> bool {
    self.content_type.starts_with("image/") || self.content_type == "application/pdf"
  }

  pub fn extension(&self) -> Option<String> {
    Path::new(&self.filename)
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase)
  }
}

/// Map a filename extension onto a MIME type.
pub fn guess_content_type(filename: &str) -> &'static str {
  let ext = Path::new(filename)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("pdf") => "application/pdf",
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("txt") => "text/plain",
    Some("md") => "text/markdown",
    Some("csv") => "text/csv",
    Some("doc") => "application/msword",
    Some("docx") => {
      "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    }
    _ => "application/octet-stream",
  }
}

/// Inline bytes of an uploaded file handed to a completion model.
#[derive(Debug, Clone)]
pub struct Attachment {
  pub filename:     String,
  pub content_type: String,
  pub data:         bytes::Bytes,
}

/// Removes every tracked upload from disk when dropped.
///
/// Held for the whole of a chat request so cleanup runs on every exit path,
/// including early returns through `?`.
#[derive(Debug, Default)]
pub struct UploadGuard {
  paths: Vec<PathBuf>,
}

impl UploadGuard {
  pub fn new(files: &[UploadedFile]) -> Self {
    Self { paths: files.iter().map(|f| f.path.clone()).collect() }
  }
}

impl Drop for UploadGuard {
  fn drop(&mut self) {
    for path in &self.paths {
      match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
          tracing::warn!(path = %path.display(), error = %e, "failed to remove upload")
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn content_type_from_extension() {
    assert_eq!(guess_content_type("brief.PDF"), "application/pdf");
    assert_eq!(guess_content_type("scan.jpeg"), "image/jpeg");
    assert_eq!(guess_content_type("notes"), "application/octet-stream");
  }

  #[test]
  fn images_and_pdfs_are_multimodal() {
    assert!(UploadedFile::new("a.png", "/tmp/a").is_multimodal());
    assert!(UploadedFile::new("a.pdf", "/tmp/a").is_multimodal());
    assert!(!UploadedFile::new("a.txt", "/tmp/a").is_multimodal());
  }

  #[test]
  fn guard_removes_files_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.txt");
    std::fs::write(&path, "contents").unwrap();
    let files = vec![UploadedFile::new("upload.txt", &path)];

    {
      let _guard = UploadGuard::new(&files);
      assert!(path.exists());
    }
    assert!(!path.exists());
  }

  #[test]
  fn guard_tolerates_missing_files() {
    let files = vec![UploadedFile::new("gone.txt", "/nonexistent/gone.txt")];
    drop(UploadGuard::new(&files));
  }
}
