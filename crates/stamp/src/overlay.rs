//! Stamping pipeline: QR image plus caption on every page

use crate::layout::{calculate_qr_rect, label_rect, StampLayout};
use crate::Result;
use pdf_core::PdfDocument;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of a stamping run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampReport {
    /// Pages that received a QR code
    pub pages: usize,
    /// Pages that also received the caption
    pub labelled_pages: usize,
}

/// Deletes the temporary QR image when dropped
struct TempFile<'a>(&'a Path);

impl Drop for TempFile<'_> {
    fn drop(&mut self) {
        match std::fs::remove_file(self.0) {
            Ok(()) => debug!(path = %self.0.display(), "removed QR image"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "failed to remove QR image"),
        }
    }
}

/// Stamp every page of `input` with the QR image and write `output`
///
/// The QR box sits in the bottom-right corner of each page and the caption
/// goes right below it when that stays on the page. The QR image at
/// `qr_png_path` is deleted when this returns, on success and on error.
pub fn overlay_qr_on_pdf<I, O, Q>(
    input: I,
    output: O,
    qr_png_path: Q,
    layout: &StampLayout,
) -> Result<StampReport>
where
    I: AsRef<Path>,
    O: AsRef<Path>,
    Q: AsRef<Path>,
{
    let _qr_png = TempFile(qr_png_path.as_ref());

    let mut doc = PdfDocument::open(input.as_ref())?;
    let qr_png = std::fs::read(qr_png_path.as_ref())?;
    doc.set_font(layout.label_font, layout.label_font_size);

    let mut report = StampReport::default();

    for page in 1..=doc.page_count() {
        let page_rect = doc.page_rect(page)?;
        let qr_rect = calculate_qr_rect(&page_rect, layout.qr_size, layout.qr_size, layout.margin);
        doc.insert_image_in_rect(&qr_png, page, qr_rect, true)?;
        report.pages += 1;

        let label = label_rect(&qr_rect, layout);
        if label.y1 > page_rect.height() {
            debug!(page, "caption would leave the page, skipping");
            continue;
        }
        if doc.insert_text_box(&layout.label_text, page, label, layout.label_align)? {
            report.labelled_pages += 1;
        }
    }

    doc.save(output.as_ref())?;

    info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        pages = report.pages,
        labelled = report.labelled_pages,
        "stamped PDF"
    );

    Ok(report)
}
