//! PDF artifacts.
//!
//! A reply is first reduced to a list of [`Block`]s by a per-line classifier,
//! then wrapped and drawn onto Letter pages with the built-in Helvetica
//! faces.
//!
//! The built-in faces only cover the WinAnsi (CP1252) repertoire. Other
//! characters, such as CJK text or emoji, are drawn as `?` so the reader can
//! see something was lost.

use std::{io::BufWriter, sync::LazyLock};

use chrono::NaiveDate;
use counsel_core::format::strip_preamble;
use printpdf::{
  BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use regex::Regex;

use crate::{Error, Result};

/// Non-breaking space used to keep runs of spaces intact in paragraphs.
pub const NBSP: char = '\u{a0}';

/// CP1252 characters outside Latin-1 that the built-in faces can draw.
const CP1252_EXTRAS: &[char] = &[
  '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•', '–',
  '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
];

/// All-caps lines need more than this many letters to count as headings.
const HEADING_MIN_LETTERS: usize = 3;

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\s*([-*•]|\d+[.)])\s+(.*)$").expect("valid regex")
});

// ─── Layout ──────────────────────────────────────────────────────────────────

/// A run of text in one weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
  pub text: String,
  pub bold: bool,
}

impl Span {
  fn regular(text: impl Into<String>) -> Self { Self { text: text.into(), bold: false } }

  fn bold(text: impl Into<String>) -> Self { Self { text: text.into(), bold: true } }
}

/// One classified line of the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
  /// Vertical space standing in for one or more blank lines.
  Spacing,
  Heading(String),
  /// A line containing `**` markers, split into weighted spans.
  Rich(Vec<Span>),
  Bullet { marker: String, spans: Vec<Span> },
  Paragraph(String),
}

/// Classify every line of `reply` (preamble removed).
pub fn layout(reply: &str) -> Vec<Block> {
  let mut blocks = Vec::new();

  for line in strip_preamble(reply).lines() {
    let block = classify_line(line);
    if block == Block::Spacing
      && matches!(blocks.last(), None | Some(Block::Spacing))
    {
      continue;
    }
    blocks.push(block);
  }

  if blocks.last() == Some(&Block::Spacing) {
    blocks.pop();
  }
  blocks
}

fn classify_line(line: &str) -> Block {
  let line = line.trim_end();
  let trimmed = line.trim_start();

  if trimmed.is_empty() {
    return Block::Spacing;
  }

  if let Some(caps) = BULLET.captures(line) {
    let marker = match &caps[1] {
      "*" | "•" => "-".to_owned(),
      other => other.to_owned(),
    };
    return Block::Bullet { marker, spans: parse_spans(&caps[2]) };
  }

  if trimmed.contains("**") {
    return Block::Rich(parse_spans(trimmed));
  }

  if let Some(heading) = trimmed.strip_prefix('#') {
    return Block::Heading(heading.trim_start_matches('#').trim().to_owned());
  }

  if is_all_caps(trimmed) {
    return Block::Heading(trimmed.to_owned());
  }

  Block::Paragraph(line.replace("  ", &format!("{NBSP}{NBSP}")))
}

fn is_all_caps(text: &str) -> bool {
  let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
  letters.len() > HEADING_MIN_LETTERS && letters.iter().all(|c| c.is_uppercase())
}

/// Split on `**` markers; odd segments are bold. An unmatched trailing
/// marker is kept as literal text.
fn parse_spans(text: &str) -> Vec<Span> {
  let mut parts: Vec<String> = text.split("**").map(str::to_owned).collect();
  if parts.len() % 2 == 0 {
    let tail = parts.pop().unwrap_or_default();
    if let Some(last) = parts.last_mut() {
      last.push_str("**");
      last.push_str(&tail);
    }
  }

  parts
    .into_iter()
    .enumerate()
    .filter(|(_, p)| !p.is_empty())
    .map(|(i, p)| if i % 2 == 1 { Span::bold(p) } else { Span::regular(p) })
    .collect()
}

// ─── Wrapping ────────────────────────────────────────────────────────────────

/// Greedy word wrap over weighted spans. Only plain spaces break lines, so
/// non-breaking runs stay on one line.
pub fn wrap_spans(spans: &[Span], max_chars: usize) -> Vec<Vec<Span>> {
  let mut lines: Vec<Vec<Span>> = Vec::new();
  let mut current: Vec<Span> = Vec::new();
  let mut width = 0usize;

  for span in spans {
    for word in span.text.split(' ').filter(|w| !w.is_empty()) {
      let len = word.chars().count();
      if width > 0 && width + 1 + len > max_chars {
        lines.push(std::mem::take(&mut current));
        width = 0;
      }

      let piece = if width > 0 { format!(" {word}") } else { word.to_owned() };
      width += piece.chars().count();
      match current.last_mut() {
        Some(last) if last.bold == span.bold => last.text.push_str(&piece),
        _ => current.push(Span { text: piece, bold: span.bold }),
      }
    }
  }

  if !current.is_empty() {
    lines.push(current);
  }
  lines
}

// ─── Rendering ───────────────────────────────────────────────────────────────

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 20.0;
const BULLET_INDENT: f32 = 6.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;
const META_SIZE: f32 = 10.0;

/// Rough Helvetica capacity of a line at `size` points over `width` mm.
fn chars_per_line(size: f32, width: f32) -> usize {
  let width_pt = width * 72.0 / 25.4;
  (width_pt / (size * 0.5)).floor().max(10.0) as usize
}

fn line_height(size: f32) -> f32 { size * 0.5 }

struct Canvas {
  doc:     PdfDocumentReference,
  layer:   PdfLayerReference,
  regular: IndirectFontRef,
  bold:    IndirectFontRef,
  y:       f32,
  pages:   usize,
}

impl Canvas {
  fn new(title: &str) -> Result<Self> {
    let (doc, page, layer) =
      PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let regular = doc
      .add_builtin_font(BuiltinFont::Helvetica)
      .map_err(|e| Error::Pdf(e.to_string()))?;
    let bold = doc
      .add_builtin_font(BuiltinFont::HelveticaBold)
      .map_err(|e| Error::Pdf(e.to_string()))?;

    Ok(Self { doc, layer, regular, bold, y: PAGE_HEIGHT - MARGIN, pages: 1 })
  }

  fn ensure_room(&mut self, height: f32) {
    if self.y - height >= MARGIN {
      return;
    }
    self.pages += 1;
    let (page, layer) = self.doc.add_page(
      Mm(PAGE_WIDTH),
      Mm(PAGE_HEIGHT),
      format!("Layer {}", self.pages),
    );
    self.layer = self.doc.get_page(page).get_layer(layer);
    self.y = PAGE_HEIGHT - MARGIN;
  }

  fn skip(&mut self, height: f32) { self.y -= height; }

  /// Draw one already-wrapped line at the current position.
  fn line(&mut self, spans: &[Span], size: f32, x: f32) {
    let height = line_height(size);
    self.ensure_room(height);
    self.y -= height;

    self.layer.begin_text_section();
    self.layer.set_text_cursor(Mm(x), Mm(self.y));
    for span in spans {
      let font = if span.bold { &self.bold } else { &self.regular };
      self.layer.set_font(font, size);
      self.layer.write_text(winansi(&span.text), font);
    }
    self.layer.end_text_section();
  }

  fn paragraph(&mut self, spans: &[Span], size: f32, x: f32) {
    let max = chars_per_line(size, PAGE_WIDTH - MARGIN - x);
    for line in wrap_spans(spans, max) {
      self.line(&line, size, x);
    }
  }

  fn finish(self) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    self
      .doc
      .save(&mut BufWriter::new(&mut bytes))
      .map_err(|e| Error::Pdf(e.to_string()))?;
    Ok(bytes)
  }
}

/// Replace characters the built-in faces cannot draw with `?`.
fn winansi(text: &str) -> String {
  text
    .chars()
    .map(|c| match c {
      '\t' => ' ',
      ' '..='~' | '\u{a0}'..='\u{ff}' => c,
      c if CP1252_EXTRAS.contains(&c) => c,
      _ => '?',
    })
    .collect()
}

/// Render `reply` as a PDF with a title block naming `title` and the
/// generation date.
pub fn render_pdf(title: &str, reply: &str, generated_on: NaiveDate) -> Result<Vec<u8>> {
  let mut canvas = Canvas::new(title)?;

  canvas.line(&[Span::bold("LEGAL DOCUMENT")], TITLE_SIZE, MARGIN);
  canvas.skip(4.0);
  let date = format!("Generated on: {}", generated_on.format("%B %d, %Y"));
  canvas.line(&[Span::regular(date)], META_SIZE, MARGIN);
  let kind: String = title.chars().take(50).collect();
  canvas.line(&[Span::regular(format!("Document Type: {kind}"))], META_SIZE, MARGIN);
  canvas.skip(8.0);

  for block in layout(reply) {
    match block {
      Block::Spacing => canvas.skip(line_height(BODY_SIZE) * 0.6),
      Block::Heading(text) => {
        canvas.skip(1.5);
        canvas.paragraph(&[Span::bold(text)], HEADING_SIZE, MARGIN);
      }
      Block::Rich(spans) => canvas.paragraph(&spans, BODY_SIZE, MARGIN),
      Block::Bullet { marker, spans } => {
        let mut with_marker = vec![Span::regular(marker)];
        with_marker.extend(spans);
        canvas.paragraph(&with_marker, BODY_SIZE, MARGIN + BULLET_INDENT);
      }
      Block::Paragraph(text) => {
        canvas.paragraph(&[Span::regular(text)], BODY_SIZE, MARGIN)
      }
    }
  }

  tracing::debug!(pages = canvas.pages, "rendered pdf artifact");
  canvas.finish()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
