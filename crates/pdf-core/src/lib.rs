//! PDF Core - Low-level PDF page editing
//!
//! This crate provides functionality for:
//! - Opening and saving existing PDF documents
//! - Resolving page geometry (CropBox / MediaBox, with inheritance)
//! - Inserting images (JPEG, PNG) into page rectangles
//! - Inserting text in the built-in base-14 fonts
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, PdfDocument, Rect, StandardFont};
//!
//! let mut doc = PdfDocument::open("report.pdf")?;
//! let page = doc.page_rect(1)?;
//! let qr = Rect::new(page.x1 - 120.0, page.y1 - 120.0, page.x1 - 24.0, page.y1 - 24.0);
//! doc.insert_image_in_rect(&png_bytes, 1, qr, true)?;
//! doc.set_font(StandardFont::Helvetica, 10.0);
//! doc.insert_text_box("To Verify", 1, qr, Align::Center)?;
//! doc.save("stamped.pdf")?;
//! ```

mod document;
mod font;
mod geometry;
mod image;
mod text;

pub use document::{Color, PdfDocument};
pub use font::StandardFont;
pub use geometry::{PageRotation, Rect};
pub use image::ImageScaleMode;
pub use text::{encode_win_ansi, generate_text_operators, wrap_to_width, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Encrypted PDF documents are not supported")]
    Encrypted,

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}
