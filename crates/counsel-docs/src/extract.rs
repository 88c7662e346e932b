//! Text extraction from uploaded files.
//!
//! An [`ExtractionChain`] holds ordered [`Extractor`] stages. Each stage says
//! whether it handles a file and then tries to pull text out of its bytes;
//! the first stage that yields non-blank text wins.

use std::panic::{self, AssertUnwindSafe};

use counsel_core::upload::UploadedFile;

use crate::{Error, Result};

/// Characters of extracted text kept per file.
pub const MAX_EXTRACTED_CHARS: usize = 2000;

/// One extraction strategy.
pub trait Extractor: Send + Sync {
  /// Stage name reported with the extracted text.
  fn name(&self) -> &'static str;

  fn accepts(&self, file: &UploadedFile) -> bool;

  /// `Ok(None)` means the stage ran but found no text.
  fn extract(&self, bytes: &[u8]) -> Result<Option<String>>;
}

// ─── Stages ──────────────────────────────────────────────────────────────────

fn is_pdf(file: &UploadedFile) -> bool { file.extension().as_deref() == Some("pdf") }

fn non_blank(text: String) -> Option<String> {
  let cleaned = text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect::<Vec<_>>()
    .join("\n");
  (!cleaned.is_empty()).then_some(cleaned)
}

/// Fast text extraction with `pdf-extract`.
pub struct PdfExtractStage;

impl Extractor for PdfExtractStage {
  fn name(&self) -> &'static str { "pdf-extract" }

  fn accepts(&self, file: &UploadedFile) -> bool { is_pdf(file) }

  fn extract(&self, bytes: &[u8]) -> Result<Option<String>> {
    // pdf-extract panics on some malformed inputs.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
      pdf_extract::extract_text_from_mem(bytes)
    }))
    .map_err(|_| Error::Extraction("pdf-extract panicked".into()))?;

    let text = outcome.map_err(|e| Error::Extraction(e.to_string()))?;
    Ok(non_blank(text))
  }
}

/// Content-stream text via `lopdf`, for files `pdf-extract` cannot read.
pub struct LopdfStage;

impl Extractor for LopdfStage {
  fn name(&self) -> &'static str { "lopdf" }

  fn accepts(&self, file: &UploadedFile) -> bool { is_pdf(file) }

  fn extract(&self, bytes: &[u8]) -> Result<Option<String>> {
    let doc =
      lopdf::Document::load_mem(bytes).map_err(|e| Error::Extraction(e.to_string()))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc
      .extract_text(&pages)
      .map_err(|e| Error::Extraction(e.to_string()))?;
    Ok(non_blank(text))
  }
}

/// Lossy UTF-8 read for text-like uploads.
pub struct PlainTextStage;

impl PlainTextStage {
  const EXTENSIONS: &'static [&'static str] = &["txt", "md", "csv", "doc", "docx"];
}

impl Extractor for PlainTextStage {
  fn name(&self) -> &'static str { "plain-text" }

  fn accepts(&self, file: &UploadedFile) -> bool {
    file
      .extension()
      .is_some_and(|ext| Self::EXTENSIONS.contains(&ext.as_str()))
  }

  fn extract(&self, bytes: &[u8]) -> Result<Option<String>> {
    let text = String::from_utf8_lossy(bytes).into_owned();
    Ok((!text.trim().is_empty()).then_some(text))
  }
}

// ─── Chain ───────────────────────────────────────────────────────────────────

/// Result of running the chain over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
  Text { stage: &'static str, text: String },
  Unsupported,
  Failed(String),
}

pub struct ExtractionChain {
  stages: Vec<Box<dyn Extractor>>,
}

impl Default for ExtractionChain {
  fn default() -> Self {
    Self::new(vec![
      Box::new(PdfExtractStage),
      Box::new(LopdfStage),
      Box::new(PlainTextStage),
    ])
  }
}

impl ExtractionChain {
  pub fn new(stages: Vec<Box<dyn Extractor>>) -> Self { Self { stages } }

  /// Run the stages that accept `file` until one yields text.
  pub fn extract(&self, file: &UploadedFile) -> Extraction {
    let accepting: Vec<&dyn Extractor> = self
      .stages
      .iter()
      .map(|s| &**s)
      .filter(|s| s.accepts(file))
      .collect();

    if accepting.is_empty() {
      return Extraction::Unsupported;
    }

    let bytes = match std::fs::read(&file.path) {
      Ok(bytes) => bytes,
      Err(e) => return Extraction::Failed(e.to_string()),
    };

    let mut last_error = None;
    for stage in accepting {
      match stage.extract(&bytes) {
        Ok(Some(text)) => {
          tracing::debug!(file = %file.filename, stage = stage.name(), "extracted upload text");
          return Extraction::Text { stage: stage.name(), text };
        }
        Ok(None) => {
          tracing::debug!(file = %file.filename, stage = stage.name(), "stage found no text");
        }
        Err(e) => {
          tracing::debug!(file = %file.filename, stage = stage.name(), error = %e, "stage failed");
          last_error = Some(e.to_string());
        }
      }
    }

    Extraction::Failed(last_error.unwrap_or_else(|| "no extractable text".into()))
  }

  /// One description per file, joined by blank lines, in the form the prompt
  /// expects under `File Analysis:`.
  pub fn describe(&self, files: &[UploadedFile]) -> String {
    files
      .iter()
      .map(|file| match self.extract(file) {
        Extraction::Text { text, .. } => {
          let head: String = text.chars().take(MAX_EXTRACTED_CHARS).collect();
          format!("File: {}\nContent: {head}...", file.filename)
        }
        Extraction::Unsupported => format!("File: {} (unsupported format)", file.filename),
        Extraction::Failed(reason) => {
          format!("File: {} (error reading: {reason})", file.filename)
        }
      })
      .collect::<Vec<_>>()
      .join("\n\n")
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn upload(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> UploadedFile {
    let path = dir.path().join(name);
    std::fs::File::create(&path).unwrap().write_all(body).unwrap();
    UploadedFile::new(name, path)
  }

  #[test]
  fn plain_text_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let file = upload(&dir, "notes.txt", b"Lease ends in May.");

    let chain = ExtractionChain::default();
    assert_eq!(chain.extract(&file), Extraction::Text {
      stage: "plain-text",
      text:  "Lease ends in May.".into(),
    });
    assert_eq!(
      chain.describe(&[file]),
      "File: notes.txt\nContent: Lease ends in May...."
    );
  }

  #[test]
  fn long_text_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let body = "a".repeat(MAX_EXTRACTED_CHARS + 500);
    let file = upload(&dir, "long.md", body.as_bytes());

    let described = ExtractionChain::default().describe(&[file]);
    let content = described.strip_prefix("File: long.md\nContent: ").unwrap();
    assert_eq!(content.chars().count(), MAX_EXTRACTED_CHARS + 3);
  }

  #[test]
  fn unknown_type_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let file = upload(&dir, "photo.png", &[0x89, b'P', b'N', b'G']);
    assert_eq!(
      ExtractionChain::default().describe(&[file]),
      "File: photo.png (unsupported format)"
    );
  }

  #[test]
  fn broken_pdf_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = upload(&dir, "broken.pdf", b"not a pdf at all");

    let described = ExtractionChain::default().describe(&[file]);
    assert!(described.starts_with("File: broken.pdf (error reading: "));
  }

  #[test]
  fn missing_file_reports_error() {
    let file = UploadedFile::new("gone.txt", "/nonexistent/counsel/gone.txt");
    let described = ExtractionChain::default().describe(&[file]);
    assert!(described.starts_with("File: gone.txt (error reading: "));
  }

  #[test]
  fn files_are_joined_by_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let a = upload(&dir, "a.txt", b"alpha");
    let b = upload(&dir, "b.zip", b"PK");

    assert_eq!(
      ExtractionChain::default().describe(&[a, b]),
      "File: a.txt\nContent: alpha...\n\nFile: b.zip (unsupported format)"
    );
  }
}
