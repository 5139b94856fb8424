//! Image XObjects for PDF documents

use crate::geometry::PageRotation;
use crate::{PdfError, Result};
use image::DynamicImage;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Supported image encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect the encoding from magic bytes
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.starts_with(&PNG_MAGIC) {
            Ok(ImageFormat::Png)
        } else if data.starts_with(&JPEG_MAGIC) {
            Ok(ImageFormat::Jpeg)
        } else {
            Err(PdfError::ImageError("Unknown image format".to_string()))
        }
    }
}

/// How an image is sized against a target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageScaleMode {
    /// Fill the box exactly
    #[default]
    Stretch,
    /// Use the box width, derive the height
    FitWidth,
    /// Use the box height, derive the width
    FitHeight,
    /// Largest size inside the box, keeping the aspect ratio
    FitBox,
}

impl ImageScaleMode {
    /// Display size in points for an image of `pixels` drawn into `target`
    pub fn apply(self, pixels: (u32, u32), target: (f64, f64)) -> (f64, f64) {
        let (pw, ph) = (pixels.0 as f64, pixels.1 as f64);
        let (tw, th) = target;

        match self {
            ImageScaleMode::Stretch => target,
            ImageScaleMode::FitWidth => (tw, tw * ph / pw),
            ImageScaleMode::FitHeight => (th * pw / ph, th),
            ImageScaleMode::FitBox => {
                let scale = (tw / pw).min(th / ph);
                (pw * scale, ph * scale)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static [u8] {
        match self {
            ColorSpace::DeviceGray => b"DeviceGray",
            ColorSpace::DeviceRgb => b"DeviceRGB",
        }
    }
}

/// Stream filter holding the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// JPEG bytes, embedded untouched
    Dct,
    /// zlib-compressed raw samples
    Flate,
}

impl ImageFilter {
    fn pdf_name(self) -> &'static [u8] {
        match self {
            ImageFilter::Dct => b"DCTDecode",
            ImageFilter::Flate => b"FlateDecode",
        }
    }
}

/// An image ready to be added as an XObject (8 bits per component)
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub filter: ImageFilter,
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Build from JPEG or PNG bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match ImageFormat::detect(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// JPEG data is passed through with `DCTDecode`; only the frame
    /// header is parsed.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let frame = read_jpeg_frame(data)?;

        Ok(Self {
            width: frame.width,
            height: frame.height,
            color_space: if frame.components == 1 {
                ColorSpace::DeviceGray
            } else {
                ColorSpace::DeviceRgb
            },
            filter: ImageFilter::Dct,
            data: data.to_vec(),
        })
    }

    /// PNG data is decoded and its samples re-compressed with `FlateDecode`.
    ///
    /// Transparency is flattened onto white. Grayscale images stay
    /// single-channel.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
        let (width, height) = (image.width(), image.height());
        let color = image.color();

        let (samples, color_space) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (image.into_luma8().into_raw(), ColorSpace::DeviceGray),
            (false, true) => {
                let samples = image
                    .into_luma_alpha8()
                    .pixels()
                    .map(|p| blend_on_white(p[0], p[1]))
                    .collect();
                (samples, ColorSpace::DeviceGray)
            }
            (true, false) => (image.into_rgb8().into_raw(), ColorSpace::DeviceRgb),
            (true, true) => (flatten_rgba(image), ColorSpace::DeviceRgb),
        };

        Ok(Self {
            width,
            height,
            color_space,
            filter: ImageFilter::Flate,
            data: zlib_compress(&samples)?,
        })
    }

    /// Image XObject stream
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set("ColorSpace", Object::Name(self.color_space.pdf_name().to_vec()));
        dict.set("BitsPerComponent", 8_i64);
        dict.set("Filter", Object::Name(self.filter.pdf_name().to_vec()));

        // Already encoded; keep lopdf from compressing it again
        Stream::new(dict, self.data.clone()).with_compression(false)
    }
}

struct JpegFrame {
    width: u32,
    height: u32,
    components: u8,
}

/// Walk JPEG marker segments until the first start-of-frame
fn read_jpeg_frame(data: &[u8]) -> Result<JpegFrame> {
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        let segment_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;

        // SOFn, excluding DHT (C4), JPG (C8) and DAC (CC)
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            let header = data
                .get(pos + 4..pos + 10)
                .ok_or_else(|| PdfError::ImageError("Truncated JPEG frame header".to_string()))?;
            return Ok(JpegFrame {
                height: u16::from_be_bytes([header[1], header[2]]) as u32,
                width: u16::from_be_bytes([header[3], header[4]]) as u32,
                components: header[5],
            });
        }

        if segment_len < 2 {
            break;
        }
        pos += 2 + segment_len;
    }

    Err(PdfError::ImageError(
        "Could not parse JPEG info".to_string(),
    ))
}

fn blend_on_white(value: u8, alpha: u8) -> u8 {
    let alpha = alpha as f32 / 255.0;
    (value as f32 * alpha + 255.0 * (1.0 - alpha)) as u8
}

fn flatten_rgba(image: DynamicImage) -> Vec<u8> {
    image
        .into_rgba8()
        .pixels()
        .flat_map(|p| {
            [
                blend_on_white(p[0], p[3]),
                blend_on_white(p[1], p[3]),
                blend_on_white(p[2], p[3]),
            ]
        })
        .collect()
}

/// zlib-compress bytes for a `FlateDecode` stream
pub(crate) fn zlib_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Operators painting image resource `name` with its displayed bottom-left
/// corner at `(x, y)` in PDF user space
///
/// The image is turned against `rotation` so it reads upright on a page
/// carrying `/Rotate`.
pub fn generate_image_operators(
    name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rotation: PageRotation,
) -> Vec<u8> {
    let ((rx, ry), (ux, uy)) = rotation.axes();
    let (a, b) = (rx * width, ry * width);
    let (c, d) = (ux * height, uy * height);
    format!("q\n{a} {b} {c} {d} {x} {y} cm\n/{name} Do\nQ\n").into_bytes()
}
