//! Text rendering utilities

use crate::document::Color;
use crate::font::StandardFont;
use crate::geometry::PageRotation;
use crate::Align;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text color (RGB)
    pub color: Color,
}

/// Calculate X offset for text alignment
///
/// # Arguments
/// * `text_width` - Width of text in points
/// * `container_width` - Available width for alignment
/// * `align` - Desired alignment
pub fn calculate_x_offset(text_width: f64, container_width: f64, align: Align) -> f64 {
    match align {
        Align::Left => 0.0,
        Align::Center => (container_width - text_width) / 2.0,
        Align::Right => container_width - text_width,
    }
}

/// WinAnsi code for a character outside Latin-1
fn win_ansi_extra(c: char) -> Option<u8> {
    let code = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // •
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99, // ™
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Encode text for a WinAnsi standard font
///
/// ASCII and the Latin-1 supplement map to themselves, the typographic
/// punctuation of 0x80..=0x9F to their WinAnsi codes. Every other
/// character becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => win_ansi_extra(c).unwrap_or(b'?'),
        })
        .collect()
}

/// Write encoded bytes as a PDF literal string, e.g. `(To Verify)`
fn literal_string(encoded: &[u8]) -> String {
    let mut out = String::with_capacity(encoded.len() + 2);
    out.push('(');
    for &b in encoded {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out.push(')');
    out
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, rg, Tf, Td or Tm, Tj, ET) to render
/// one line of WinAnsi-encoded text starting at `(x, y)`. On a rotated page
/// the text matrix turns the line so it reads upright.
///
/// # Arguments
/// * `encoded` - WinAnsi-encoded text (see [`encode_win_ansi`])
/// * `x` - X coordinate of the line start (PDF user space)
/// * `y` - Y coordinate of the baseline (PDF user space)
/// * `rotation` - The page's `/Rotate`
/// * `ctx` - Text rendering context
pub fn generate_text_operators(
    encoded: &[u8],
    x: f64,
    y: f64,
    rotation: PageRotation,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    match rotation {
        PageRotation::Deg0 => ops.push_str(&format!("{x} {y} Td\n")),
        _ => {
            let ((a, b), (c, d)) = rotation.axes();
            ops.push_str(&format!("{a} {b} {c} {d} {x} {y} Tm\n"));
        }
    }
    ops.push_str(&format!("{} Tj\n", literal_string(encoded)));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Split text into lines no wider than `max_width` points
///
/// Breaks on whitespace and honours explicit newlines. A single word wider
/// than `max_width` stays on its own line.
pub fn wrap_to_width(text: &str, font: StandardFont, size: f32, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();

        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
                continue;
            }

            let candidate = format!("{current_line} {word}");
            if font.text_width_points(&candidate, size) <= max_width {
                current_line = candidate;
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        lines.push(current_line);
    }

    lines
}
