//! CSV artifacts from pipe-delimited reply lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Markdown alignment cells such as `---`, `:---:` or `--:`.
static ALIGNMENT_CELL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^:?-{3,}:?$").expect("valid regex"));

/// Rows found in `content`: every line containing `|`, split into trimmed
/// cells, with the empty cells produced by leading/trailing pipes removed.
/// Markdown alignment rows are skipped.
pub fn table_rows(content: &str) -> Vec<Vec<String>> {
  content
    .lines()
    .filter(|line| line.contains('|'))
    .filter_map(|line| {
      let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();
      while cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
      }
      while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
      }

      if cells.is_empty() || cells.iter().all(|c| ALIGNMENT_CELL.is_match(c)) {
        return None;
      }
      Some(cells.into_iter().map(str::to_owned).collect())
    })
    .collect()
}

/// Convert `content` to CSV bytes. Without any table rows the whole content
/// becomes a single one-field row.
pub fn render_csv(content: &str) -> Result<Vec<u8>> {
  let mut rows = table_rows(content);
  if rows.is_empty() {
    tracing::debug!("no pipe-delimited rows, emitting single-field csv");
    rows = vec![vec![content.trim().to_owned()]];
  }

  let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
  for row in &rows {
    writer.write_record(row)?;
  }
  writer
    .into_inner()
    .map_err(|e| Error::CsvBuffer(e.to_string()))
}
