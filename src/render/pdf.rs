//! Minimal PDF writer for generated documents.
//!
//! Output is deliberately simple: US-letter pages, the base-14 Helvetica and
//! Courier fonts, one text object per line. Text is emitted as WinAnsi with
//! octal escapes; characters outside that range are replaced. This keeps the
//! whole writer dependency-free and the files small.

use std::io::Write;
use std::path::Path;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
  Body,
  Bold,
  Italic,
  Mono,
}

impl Font {
  fn resource(&self) -> &'static str {
    match self {
      Font::Body => "/F1",
      Font::Bold => "/F2",
      Font::Italic => "/F3",
      Font::Mono => "/F4",
    }
  }

  /// Rough average glyph advance, used only for line wrapping.
  pub fn char_width(&self, size: f32) -> f32 {
    match self {
      Font::Mono => size * 0.60,
      Font::Bold => size * 0.53,
      _ => size * 0.50,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Segment {
  pub font: Font,
  pub text: String,
}

/// One laid-out line of output text.
#[derive(Clone, Debug)]
pub struct Line {
  pub segments: Vec<Segment>,
  pub size: f32,
  pub indent: f32,
  /// Extra vertical space above the line (heading separation).
  pub space_before: f32,
  pub page_break_before: bool,
}

impl Line {
  pub fn blank(size: f32) -> Self {
    Line { segments: Vec::new(), size, indent: 0.0, space_before: 0.0, page_break_before: false }
  }
}

/// Serialize lines into a PDF file at `path`.
pub fn write_pdf(lines: &[Line], path: &Path) -> std::io::Result<()> {
  let streams = paginate(lines);
  let bytes = assemble(&streams);
  let mut f = std::fs::File::create(path)?;
  f.write_all(&bytes)?;
  Ok(())
}

/// Break the line list into per-page content streams.
fn paginate(lines: &[Line]) -> Vec<String> {
  let mut streams: Vec<String> = Vec::new();
  let mut current = String::new();
  let mut y = PAGE_HEIGHT - MARGIN;

  for line in lines {
    let height = line.size * 1.4;
    let needs_break =
      line.page_break_before && !current.is_empty() || y - line.space_before - height < MARGIN;
    if needs_break {
      streams.push(std::mem::take(&mut current));
      y = PAGE_HEIGHT - MARGIN;
    }
    y -= line.space_before + height;

    if line.segments.is_empty() {
      continue;
    }

    current.push_str("BT\n");
    current.push_str(&format!("1 0 0 1 {:.1} {:.1} Tm\n", MARGIN + line.indent, y));
    let mut active: Option<Font> = None;
    for seg in &line.segments {
      if active != Some(seg.font) {
        current.push_str(&format!("{} {:.1} Tf\n", seg.font.resource(), line.size));
        active = Some(seg.font);
      }
      current.push_str(&format!("({}) Tj\n", escape_text(&seg.text)));
    }
    current.push_str("ET\n");
  }

  streams.push(current);
  streams
}

/// Build the full file: header, objects, xref, trailer.
fn assemble(streams: &[String]) -> Vec<u8> {
  let n_pages = streams.len();
  let first_page_id = 7;
  let page_id = |i: usize| first_page_id + 2 * i;
  let content_id = |i: usize| first_page_id + 2 * i + 1;

  let kids = (0..n_pages).map(|i| format!("{} 0 R", page_id(i))).collect::<Vec<_>>().join(" ");

  let mut objects: Vec<(usize, String)> = vec![
    (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
    (2, format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, n_pages)),
    (3, font_object("Helvetica")),
    (4, font_object("Helvetica-Bold")),
    (5, font_object("Helvetica-Oblique")),
    (6, font_object("Courier")),
  ];

  for (i, stream) in streams.iter().enumerate() {
    objects.push((
      page_id(i),
      format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
         /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R /F4 6 0 R >> >> \
         /Contents {} 0 R >>",
        PAGE_WIDTH,
        PAGE_HEIGHT,
        content_id(i)
      ),
    ));
    objects.push((
      content_id(i),
      format!("<< /Length {} >>\nstream\n{}endstream", stream.len(), stream),
    ));
  }

  let mut out: Vec<u8> = Vec::new();
  out.extend_from_slice(b"%PDF-1.4\n");

  let max_id = objects.iter().map(|(id, _)| *id).max().unwrap_or(0);
  let mut offsets = vec![0usize; max_id + 1];
  for (id, body) in &objects {
    offsets[*id] = out.len();
    out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
  }

  let xref_start = out.len();
  out.extend_from_slice(format!("xref\n0 {}\n", max_id + 1).as_bytes());
  out.extend_from_slice(b"0000000000 65535 f \n");
  for id in 1..=max_id {
    out.extend_from_slice(format!("{:010} 00000 n \n", offsets[id]).as_bytes());
  }
  out.extend_from_slice(
    format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", max_id + 1, xref_start)
      .as_bytes(),
  );
  out
}

fn font_object(base: &str) -> String {
  format!("<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>", base)
}

/// Escape a text run for a PDF literal string. Non-WinAnsi characters are
/// replaced rather than dropped.
fn escape_text(s: &str) -> String {
  let mut out = String::new();
  for c in s.chars() {
    match c {
      '(' => out.push_str("\\("),
      ')' => out.push_str("\\)"),
      '\\' => out.push_str("\\\\"),
      c if (c as u32) < 0x20 => out.push(' '),
      c if c.is_ascii() => out.push(c),
      c if (c as u32) <= 0xFF => out.push_str(&format!("\\{:03o}", c as u32)),
      _ => out.push('?'),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn body_line(text: &str) -> Line {
    Line {
      segments: vec![Segment { font: Font::Body, text: text.to_string() }],
      size: 11.0,
      indent: 0.0,
      space_before: 0.0,
      page_break_before: false,
    }
  }

  #[test]
  fn escaping_protects_delimiters() {
    assert_eq!(escape_text("a (b) \\c"), "a \\(b\\) \\\\c");
    assert_eq!(escape_text("café"), "caf\\351");
    assert_eq!(escape_text("中"), "?");
  }

  #[test]
  fn one_page_for_short_documents() {
    let streams = paginate(&[body_line("hello"), body_line("world")]);
    assert_eq!(streams.len(), 1);
    assert!(streams[0].contains("(hello) Tj"));
  }

  #[test]
  fn long_documents_spill_onto_new_pages() {
    let lines: Vec<Line> = (0..120).map(|i| body_line(&format!("line {i}"))).collect();
    let streams = paginate(&lines);
    assert!(streams.len() > 1);
  }

  #[test]
  fn explicit_page_break_starts_a_page() {
    let mut second = body_line("second");
    second.page_break_before = true;
    let streams = paginate(&[body_line("first"), second]);
    assert_eq!(streams.len(), 2);
    assert!(streams[1].contains("(second) Tj"));
  }

  #[test]
  fn written_file_has_pdf_magic_and_trailer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    write_pdf(&[body_line("content")], &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
  }
}
