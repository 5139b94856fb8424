//! Stamp - QR verification stamps for PDF documents
//!
//! This crate generates the verification QR code and overlays it, with a
//! short caption, on every page of a PDF.
//!
//! # Example
//!
//! ```ignore
//! use stamp::{generate_qr_png, overlay_qr_on_pdf, QrOptions, StampLayout, VERIFICATION_TEXT};
//!
//! let qr_png = generate_qr_png(VERIFICATION_TEXT, &QrOptions::default(), "output")?;
//! let layout = StampLayout::default().with_qr_size(110.0);
//! let report = overlay_qr_on_pdf("uploads/in.pdf", "output/in_stamped.pdf", &qr_png, &layout)?;
//! println!("stamped {} pages", report.pages);
//! ```

mod layout;
mod overlay;
mod qr;

pub use layout::{calculate_qr_rect, label_rect, StampLayout};
pub use overlay::{overlay_qr_on_pdf, StampReport};
pub use qr::{generate_qr_png, render_qr_image, render_qr_png, ErrorCorrection, QrOptions, VERIFICATION_TEXT};

use thiserror::Error;

/// Errors that can occur while stamping
#[derive(Debug, Error)]
pub enum StampError {
    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("QR encoding error: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stamp operations
pub type Result<T> = std::result::Result<T, StampError>;
