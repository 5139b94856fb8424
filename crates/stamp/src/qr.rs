//! QR code generation

use crate::Result;
use image::{DynamicImage, GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Text encoded in every verification stamp ("the report is complete")
pub const VERIFICATION_TEXT: &str = "التقرير كامل";

/// QR error correction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorCorrection {
    L,
    M,
    Q,
    #[default]
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(ec: ErrorCorrection) -> Self {
        match ec {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

/// Rendering options for a QR image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Pixels per module
    pub scale: u32,
    /// Quiet zone width in modules
    pub border: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            scale: 6,
            border: 2,
            error_correction: ErrorCorrection::H,
        }
    }
}

/// Render `text` as a grayscale QR image
///
/// Dark modules are black and light modules white. The image side is
/// `(modules + 2 * border) * scale` pixels.
pub fn render_qr_image(text: &str, options: &QrOptions) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), options.error_correction.into())?;
    let modules = code.width() as u32;
    let scale = options.scale.max(1);
    let side = (modules + 2 * options.border) * scale;

    let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));

    for (i, color) in code.to_colors().iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let x = (i as u32 % modules + options.border) * scale;
        let y = (i as u32 / modules + options.border) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x + dx, y + dy, Luma([0u8]));
            }
        }
    }

    debug!(modules, side, "rendered QR code");
    Ok(img)
}

/// Render `text` as QR code PNG bytes
pub fn render_qr_png(text: &str, options: &QrOptions) -> Result<Vec<u8>> {
    let img = render_qr_image(text, options)?;

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;

    Ok(bytes)
}

/// Write a QR code PNG for `text` into `dir` and return its path
///
/// Files are named `qr_<uuid>.png`, so concurrent calls never collide. A
/// failed write leaves no file behind.
pub fn generate_qr_png<P: AsRef<Path>>(text: &str, options: &QrOptions, dir: P) -> Result<PathBuf> {
    let png = render_qr_png(text, options)?;
    let path = dir
        .as_ref()
        .join(format!("qr_{}.png", Uuid::new_v4().simple()));

    write_new_file(&path, |file| file.write_all(&png))?;
    debug!(path = %path.display(), "wrote QR image");

    Ok(path)
}

/// Create `path` (which must not exist) and fill it with `write`
///
/// When `write` fails the partly written file is removed.
fn write_new_file<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(e) = write(&mut file) {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "failed to remove partial QR image");
        }
        return Err(e);
    }

    Ok(())
}
