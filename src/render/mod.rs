//! Document rendering: turns the four generated content strings into a PDF
//! file on disk.
//!
//! The engine only sees the `DocumentRenderer` trait; the PDF layout details
//! live in `markup` (parsing) and `pdf` (file writing). Render failures are
//! ordinary values, folded into the document record exactly like a backend
//! failure.

use std::path::PathBuf;

use chrono::Local;
use tracing::{info, instrument};

pub mod markup;
pub mod pdf;

use markup::{parse_blocks, parse_inline, Block, Span};
use pdf::{Font, Line, Segment};

/// Narrow rendering contract consumed by the generation engine.
pub trait DocumentRenderer: Send + Sync {
  fn render(
    &self,
    title: &str,
    description: &str,
    content: &str,
    learning_goals: &str,
  ) -> Result<PathBuf, String>;
}

/// Sanitized, timestamped output file name: alphanumerics/space/hyphen/
/// underscore kept, spaces collapsed to underscores, truncated to 50 chars.
pub fn output_filename(title: &str, timestamp: &str) -> String {
  let safe: String = title
    .chars()
    .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
    .collect();
  let safe: String = safe.replace(' ', "_").chars().take(50).collect();
  format!("{safe}_{timestamp}.pdf")
}

/// Renders documents into single-column PDFs under `output_dir`.
pub struct PdfRenderer {
  output_dir: PathBuf,
}

impl PdfRenderer {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self { output_dir: output_dir.into() }
  }
}

impl DocumentRenderer for PdfRenderer {
  #[instrument(level = "info", skip_all, fields(title_len = title.len(), content_len = content.len()))]
  fn render(
    &self,
    title: &str,
    description: &str,
    content: &str,
    learning_goals: &str,
  ) -> Result<PathBuf, String> {
    std::fs::create_dir_all(&self.output_dir)
      .map_err(|e| format!("cannot create output dir: {e}"))?;

    let now = Local::now();
    let filename = output_filename(title, &now.format("%Y%m%d_%H%M%S").to_string());
    let path = self.output_dir.join(&filename);

    let mut lines: Vec<Line> = Vec::new();
    push_heading(&mut lines, title, 20.0, 0.0);
    lines.push(Line::blank(8.0));

    push_heading(&mut lines, "Overview", 14.0, 10.0);
    layout_blocks(&parse_blocks(description), &mut lines);
    lines.push(Line::blank(8.0));

    push_heading(&mut lines, "Learning Goals", 14.0, 10.0);
    layout_blocks(&parse_blocks(learning_goals), &mut lines);

    let heading_idx = lines.len();
    push_heading(&mut lines, "Document Content", 14.0, 10.0);
    lines[heading_idx].page_break_before = true;
    layout_blocks(&parse_blocks(content), &mut lines);

    lines.push(Line::blank(10.0));
    lines.push(Line {
      segments: vec![Segment {
        font: Font::Italic,
        text: format!("Generated by Tabletop Exercise Portal | {}", now.format("%Y-%m-%d %H:%M")),
      }],
      size: 9.0,
      indent: 0.0,
      space_before: 4.0,
      page_break_before: false,
    });

    pdf::write_pdf(&lines, &path).map_err(|e| format!("PDF write failed: {e}"))?;
    info!(target: "document", path = %path.display(), "Rendered PDF");
    Ok(path)
  }
}

fn push_heading(lines: &mut Vec<Line>, text: &str, size: f32, space_before: f32) {
  lines.push(Line {
    segments: heading_segments(text),
    size,
    indent: 0.0,
    space_before,
    page_break_before: false,
  });
}

/// Headings render bold throughout; matched emphasis markers are consumed,
/// code runs keep the mono face.
fn heading_segments(text: &str) -> Vec<Segment> {
  parse_inline(text)
    .into_iter()
    .map(|span| match span {
      Span::Text(t) | Span::Bold(t) | Span::Italic(t) => Segment { font: Font::Bold, text: t },
      Span::Code(t) => Segment { font: Font::Mono, text: t },
    })
    .collect()
}

fn body_segments(text: &str) -> Vec<Segment> {
  parse_inline(text)
    .into_iter()
    .map(|span| match span {
      Span::Text(t) => Segment { font: Font::Body, text: t },
      Span::Bold(t) => Segment { font: Font::Bold, text: t },
      Span::Italic(t) => Segment { font: Font::Italic, text: t },
      Span::Code(t) => Segment { font: Font::Mono, text: t },
    })
    .collect()
}

/// Flatten parsed blocks into wrapped, styled lines.
fn layout_blocks(blocks: &[Block], lines: &mut Vec<Line>) {
  for block in blocks {
    match block {
      Block::Heading { level, text } => {
        let (size, space) = match level {
          1 => (16.0, 10.0),
          2 => (14.0, 8.0),
          _ => (12.0, 6.0),
        };
        for (i, row) in wrap_text(text, budget(size, 0.0, Font::Bold)).into_iter().enumerate() {
          push_heading(lines, &row, size, if i == 0 { space } else { 0.0 });
        }
      }
      Block::Bullet(text) => push_list_item(lines, "- ", text),
      Block::Numbered { marker, text } => push_list_item(lines, &format!("{marker} "), text),
      Block::Paragraph(text) => {
        for row in wrap_text(text, budget(11.0, 0.0, Font::Body)) {
          lines.push(Line {
            segments: body_segments(&row),
            size: 11.0,
            indent: 0.0,
            space_before: 0.0,
            page_break_before: false,
          });
        }
      }
      Block::Blank => lines.push(Line::blank(6.0)),
    }
  }
}

fn push_list_item(lines: &mut Vec<Line>, prefix: &str, text: &str) {
  let indent = 14.0;
  let hang = 12.0;
  let rows = wrap_text(text, budget(11.0, indent + hang, Font::Body));
  for (i, row) in rows.into_iter().enumerate() {
    let full = if i == 0 { format!("{prefix}{row}") } else { row };
    lines.push(Line {
      segments: body_segments(&full),
      size: 11.0,
      indent: if i == 0 { indent } else { indent + hang },
      space_before: 0.0,
      page_break_before: false,
    });
  }
}

/// Character budget for a line at the given size/indent.
fn budget(size: f32, indent: f32, font: Font) -> usize {
  let usable = pdf::PAGE_WIDTH - 2.0 * pdf::MARGIN - indent;
  (usable / font.char_width(size)).max(8.0) as usize
}

/// Greedy word wrap on a character budget. Overlong words are hard-split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
  let mut rows: Vec<String> = Vec::new();
  let mut current = String::new();
  let mut current_len = 0usize;

  for word in text.split_whitespace() {
    let wlen = word.chars().count();
    if current_len > 0 && current_len + 1 + wlen > max_chars {
      rows.push(std::mem::take(&mut current));
      current_len = 0;
    }
    if wlen > max_chars {
      // hard-split a word that cannot fit on any line
      let mut chunk = String::new();
      for c in word.chars() {
        if chunk.chars().count() == max_chars {
          rows.push(std::mem::take(&mut chunk));
        }
        chunk.push(c);
      }
      current = chunk;
      current_len = current.chars().count();
      continue;
    }
    if current_len > 0 {
      current.push(' ');
      current_len += 1;
    }
    current.push_str(word);
    current_len += wlen;
  }
  if !current.is_empty() {
    rows.push(current);
  }
  if rows.is_empty() {
    rows.push(String::new());
  }
  rows
}
