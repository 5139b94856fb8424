//! Stamp placement on a page

use pdf_core::{Align, Rect, StandardFont};

/// Size and position of the QR stamp and its caption, in points
#[derive(Debug, Clone, PartialEq)]
pub struct StampLayout {
    /// Side of the square QR box
    pub qr_size: f64,
    /// Distance from the right and bottom page edges
    pub margin: f64,
    /// Gap between the QR box and the caption
    pub label_margin: f64,
    pub label_height: f64,
    pub label_font: StandardFont,
    pub label_font_size: f32,
    pub label_text: String,
    pub label_align: Align,
}

impl Default for StampLayout {
    fn default() -> Self {
        Self {
            qr_size: 96.0,
            margin: 24.0,
            label_margin: 6.0,
            label_height: 12.0,
            label_font: StandardFont::Helvetica,
            label_font_size: 10.0,
            label_text: "To Verify".to_string(),
            label_align: Align::Center,
        }
    }
}

impl StampLayout {
    pub fn with_qr_size(mut self, qr_size: f64) -> Self {
        self.qr_size = qr_size;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

/// QR box anchored at the bottom-right corner of the page, inset by `margin`
pub fn calculate_qr_rect(page_rect: &Rect, qr_width: f64, qr_height: f64, margin: f64) -> Rect {
    let width = page_rect.width();
    let height = page_rect.height();

    Rect::new(
        width - margin - qr_width,
        height - margin - qr_height,
        width - margin,
        height - margin,
    )
}

/// Caption box directly below the QR box, spanning its width
pub fn label_rect(qr_rect: &Rect, layout: &StampLayout) -> Rect {
    let top = qr_rect.y1 + layout.label_margin;
    Rect::new(qr_rect.x0, top, qr_rect.x1, top + layout.label_height)
}
