//! PDF Document wrapper

use crate::font::StandardFont;
use crate::geometry::{PageRotation, Rect};
use crate::image::{generate_image_operators, zlib_compress, ImageScaleMode, ImageXObject};
use crate::text::{
    calculate_x_offset, encode_win_ansi, generate_text_operators, wrap_to_width, TextRenderContext,
};
use crate::{Align, PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::debug;

/// A4 portrait, used when a page carries no usable box
const DEFAULT_PAGE_BOX: [f64; 4] = [0.0, 0.0, 595.28, 841.89];

/// Maximum `/Parent` hops followed when resolving inherited attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// A page's visible box and rotation
///
/// Maps top-left-origin coordinates of the page as displayed to PDF user
/// space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageSpace {
    /// `[llx, lly, urx, ury]` in user space
    bbox: [f64; 4],
    rotation: PageRotation,
}

impl PageSpace {
    /// Displayed width and height
    fn size(&self) -> (f64, f64) {
        let [llx, lly, urx, ury] = self.bbox;
        if self.rotation.is_sideways() {
            (ury - lly, urx - llx)
        } else {
            (urx - llx, ury - lly)
        }
    }

    /// Convert a displayed top-left-origin point to user space
    fn user_space_point(&self, x: f64, y_from_top: f64) -> (f64, f64) {
        let [llx, lly, urx, ury] = self.bbox;
        match self.rotation {
            PageRotation::Deg0 => (llx + x, ury - y_from_top),
            PageRotation::Deg90 => (llx + y_from_top, lly + x),
            PageRotation::Deg180 => (urx - x, lly + y_from_top),
            PageRotation::Deg270 => (urx - y_from_top, ury - x),
        }
    }
}

/// An embedded image XObject and its pixel size
#[derive(Debug, Clone, Copy)]
struct EmbeddedImage {
    object_id: ObjectId,
    width: u32,
    height: u32,
}

/// PDF Document wrapper providing page overlay operations
///
/// Drawing calls are buffered per page and written in one pass by
/// [`PdfDocument::save`] / [`PdfDocument::to_bytes`].
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Current font
    current_font: StandardFont,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Font dictionaries added to the document
    font_objects: HashMap<StandardFont, ObjectId>,
    /// Page font resources (page number -> font -> resource name)
    page_font_resources: HashMap<usize, HashMap<StandardFont, String>>,
    /// Embedded images (data hash -> XObject)
    embedded_images: HashMap<u64, EmbeddedImage>,
    /// Page image resources (page number -> object ID -> resource name)
    page_image_resources: HashMap<usize, HashMap<ObjectId, String>>,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: HashMap<usize, Vec<u8>>,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("report.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    fn from_document(inner: Document) -> Result<Self> {
        if inner.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self {
            inner,
            current_font: StandardFont::default(),
            current_font_size: 12.0,
            current_text_color: Color::default(),
            font_objects: HashMap::new(),
            page_font_resources: HashMap::new(),
            embedded_images: HashMap::new(),
            page_image_resources: HashMap::new(),
            page_content_buffer: HashMap::new(),
        })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Set the current font and size for subsequent text calls
    pub fn set_font(&mut self, font: StandardFont, size: f32) {
        self.current_font = font;
        self.current_font_size = size;
    }

    /// Set the text color
    ///
    /// # Example
    /// ```ignore
    /// doc.set_text_color(Color::red());
    /// doc.set_text_color(Color::from_rgb(255, 128, 0)); // Orange
    /// ```
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    /// Visible page rectangle in top-left-origin coordinates
    ///
    /// Uses the CropBox when present, otherwise the MediaBox, following
    /// `/Parent` inheritance. The rectangle is the page as displayed: for a
    /// `/Rotate` of 90 or 270 width and height are swapped. It always starts
    /// at `(0, 0)`, and every other method takes coordinates in this space.
    pub fn page_rect(&self, page: usize) -> Result<Rect> {
        let (width, height) = self.page_space(page)?.size();
        Ok(Rect::from_size(width, height))
    }

    /// Insert a single line of text
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Baseline Y coordinate in points (from top)
    /// * `align` - Alignment relative to `x`
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        let space = self.page_space(page)?;

        if text.is_empty() {
            return Ok(());
        }

        let encoded = encode_win_ansi(text);
        let text_width = self
            .current_font
            .encoded_width_points(&encoded, self.current_font_size);
        let start_x = match align {
            Align::Left => x,
            Align::Center => x - text_width / 2.0,
            Align::Right => x - text_width,
        };

        self.draw_encoded_line(page, &space, &encoded, start_x, y)
    }

    /// Insert word-wrapped text inside a rectangle
    ///
    /// Lines are wrapped to the rectangle width and stacked from its top
    /// edge, the first baseline [`StandardFont::box_ascent_points`] below
    /// it. When the wrapped text does not fit the rectangle, nothing is
    /// drawn and `false` is returned.
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `rect` - Target rectangle (top-left origin)
    /// * `align` - Horizontal alignment inside the rectangle
    pub fn insert_text_box(
        &mut self,
        text: &str,
        page: usize,
        rect: Rect,
        align: Align,
    ) -> Result<bool> {
        let space = self.page_space(page)?;

        if text.is_empty() {
            return Ok(true);
        }

        let font = self.current_font;
        let size = self.current_font_size;
        let lines = wrap_to_width(text, font, size, rect.width());
        let line_height = font.line_height_points(size);

        let total_height = line_height * lines.len() as f64;
        let too_wide = lines
            .iter()
            .any(|line| font.text_width_points(line, size) > rect.width());
        if total_height > rect.height() || too_wide {
            debug!(
                page,
                lines = lines.len(),
                total_height,
                box_height = rect.height(),
                "text does not fit box, skipping"
            );
            return Ok(false);
        }

        let first_baseline = rect.y0 + font.box_ascent_points(size);
        for (i, line) in lines.iter().enumerate() {
            let encoded = encode_win_ansi(line);
            let line_width = font.encoded_width_points(&encoded, size);
            let x = rect.x0 + calculate_x_offset(line_width, rect.width(), align);
            let baseline = first_baseline + line_height * i as f64;
            self.draw_encoded_line(page, &space, &encoded, x, baseline)?;
        }

        Ok(true)
    }

    /// Buffer operators for one line starting at a top-origin baseline point
    fn draw_encoded_line(
        &mut self,
        page: usize,
        space: &PageSpace,
        encoded: &[u8],
        x: f64,
        baseline_from_top: f64,
    ) -> Result<()> {
        let font_resource_name = self.get_or_create_font_ref(self.current_font, page)?;
        let (pdf_x, pdf_y) = space.user_space_point(x, baseline_from_top);

        let ctx = TextRenderContext {
            font_name: font_resource_name,
            font_size: self.current_font_size,
            color: self.current_text_color,
        };

        let operators = generate_text_operators(encoded, pdf_x, pdf_y, space.rotation, &ctx);
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Insert an image at a specific position
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `width` - Image width in points
    /// * `height` - Image height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.insert_image_scaled(data, page, x, y, width, height, ImageScaleMode::Stretch)
    }

    /// Insert an image with scaling mode
    ///
    /// The image is anchored at the top-left corner `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_scaled(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        mode: ImageScaleMode,
    ) -> Result<()> {
        let space = self.page_space(page)?;
        let image = self.get_or_create_image(data)?;

        let (actual_width, actual_height) = mode.apply((image.width, image.height), (width, height));

        self.draw_image(
            page,
            &space,
            image,
            Rect::new(x, y, x + actual_width, y + actual_height),
        )
    }

    /// Insert an image inside a rectangle
    ///
    /// With `keep_proportion` the image is scaled to fit the rectangle
    /// and centred in it; otherwise it is stretched to fill it.
    pub fn insert_image_in_rect(
        &mut self,
        data: &[u8],
        page: usize,
        rect: Rect,
        keep_proportion: bool,
    ) -> Result<()> {
        let space = self.page_space(page)?;
        let image = self.get_or_create_image(data)?;

        let target = if keep_proportion {
            let (w, h) = ImageScaleMode::FitBox
                .apply((image.width, image.height), (rect.width(), rect.height()));
            rect.center_box(w, h)
        } else {
            rect
        };

        self.draw_image(page, &space, image, target)
    }

    fn draw_image(
        &mut self,
        page: usize,
        space: &PageSpace,
        image: EmbeddedImage,
        target: Rect,
    ) -> Result<()> {
        let resource_name = self.get_or_create_image_ref(image.object_id, page)?;

        // Image space is anchored at its displayed bottom-left corner
        let (pdf_x, pdf_y) = space.user_space_point(target.x0, target.y1);
        let operators = generate_image_operators(
            &resource_name,
            pdf_x,
            pdf_y,
            target.width(),
            target.height(),
            space.rotation,
        );
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flush_content_buffers()?;

        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Resolve a 1-indexed page number to its object ID
    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        if page == 0 || page > pages.len() {
            return Err(PdfError::InvalidPage(page, pages.len()));
        }
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Visible page box and `/Rotate` of a page
    fn page_space(&self, page: usize) -> Result<PageSpace> {
        let page_id = self.page_id(page)?;

        let crop_box = self.get_inherited_attribute(page_id, b"CropBox")?;
        let media_box = self.get_inherited_attribute(page_id, b"MediaBox")?;

        let parsed = crop_box
            .as_ref()
            .and_then(|obj| self.parse_box(obj))
            .or_else(|| media_box.as_ref().and_then(|obj| self.parse_box(obj)));

        let rotation = match self.get_inherited_attribute(page_id, b"Rotate")? {
            Some(obj) => {
                let degrees = self.number_value(&obj).unwrap_or(0.0).round() as i64;
                PageRotation::from_degrees(degrees).unwrap_or_else(|| {
                    debug!(page, degrees, "ignoring /Rotate that is not a quarter turn");
                    PageRotation::Deg0
                })
            }
            None => PageRotation::Deg0,
        };

        Ok(PageSpace {
            bbox: parsed.unwrap_or(DEFAULT_PAGE_BOX),
            rotation,
        })
    }

    /// Look up a page attribute, following the `/Parent` chain
    fn get_inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page node is not a dictionary".to_string()))?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Parse a rectangle array (direct or by reference), normalising corners
    fn parse_box(&self, obj: &Object) -> Option<[f64; 4]> {
        let array = match obj {
            Object::Array(arr) => arr,
            Object::Reference(id) => self.inner.get_object(*id).ok()?.as_array().ok()?,
            _ => return None,
        };

        if array.len() < 4 {
            return None;
        }

        let mut values = [0.0f64; 4];
        for (slot, value) in values.iter_mut().zip(array.iter()) {
            *slot = self.number_value(value)?;
        }

        let [ax, ay, bx, by] = values;
        let normalised = [ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)];
        if normalised[2] - normalised[0] <= 0.0 || normalised[3] - normalised[1] <= 0.0 {
            return None;
        }
        Some(normalised)
    }

    fn number_value(&self, obj: &Object) -> Option<f64> {
        match obj {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            Object::Reference(id) => self.number_value(self.inner.get_object(*id).ok()?),
            _ => None,
        }
    }

    /// Follow a reference to a dictionary, cloning it
    fn resolve_dict(&self, obj: &Object) -> Option<Dictionary> {
        match obj {
            Object::Dictionary(dict) => Some(dict.clone()),
            Object::Reference(id) => self.inner.get_object(*id).ok()?.as_dict().ok().cloned(),
            _ => None,
        }
    }

    /// The page's effective Resources dictionary (inherited, dereferenced)
    fn page_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let resources = self.get_inherited_attribute(page_id, b"Resources")?;
        Ok(resources
            .and_then(|obj| self.resolve_dict(&obj))
            .unwrap_or_else(Dictionary::new))
    }

    /// Add `name -> object_id` to a Resources category (`Font`, `XObject`)
    ///
    /// The resolved Resources are written directly onto the page, so a
    /// Resources dictionary shared with other pages is never modified.
    fn set_page_resource(
        &mut self,
        page: usize,
        category: &[u8],
        name: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut resources = self.page_resources(page_id)?;

        let mut entries = resources
            .get(category)
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
            .unwrap_or_else(Dictionary::new);
        entries.set(name.as_bytes(), Object::Reference(object_id));
        resources.set(category, Object::Dictionary(entries));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set(b"Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    /// First `prefix<n>` name not yet used in the page's Resources category
    fn unused_resource_name(&self, page: usize, category: &[u8], prefix: &str) -> Result<String> {
        let page_id = self.page_id(page)?;
        let entries = self
            .page_resources(page_id)?
            .get(category)
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
            .unwrap_or_else(Dictionary::new);

        let mut n = 1;
        loop {
            let candidate = format!("{prefix}{n}");
            if !entries.has(candidate.as_bytes()) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Get or create a font reference for a specific page
    ///
    /// Returns the resource name (e.g. "F1") for use in content streams.
    fn get_or_create_font_ref(&mut self, font: StandardFont, page: usize) -> Result<String> {
        if let Some(name) = self
            .page_font_resources
            .get(&page)
            .and_then(|fonts| fonts.get(&font))
        {
            return Ok(name.clone());
        }

        let object_id = match self.font_objects.get(&font) {
            Some(id) => *id,
            None => {
                let id = self.inner.add_object(font.to_pdf_dictionary());
                self.font_objects.insert(font, id);
                id
            }
        };

        let resource_name = self.unused_resource_name(page, b"Font", "F")?;
        self.set_page_resource(page, b"Font", &resource_name, object_id)?;
        self.page_font_resources
            .entry(page)
            .or_default()
            .insert(font, resource_name.clone());

        Ok(resource_name)
    }

    /// Embed image data once per document, deduplicated by content hash
    fn get_or_create_image(&mut self, data: &[u8]) -> Result<EmbeddedImage> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if let Some(image) = self.embedded_images.get(&data_hash) {
            return Ok(*image);
        }

        let xobject = ImageXObject::from_bytes(data)
            .map_err(|e| PdfError::ImageError(format!("Failed to create image XObject: {e}")))?;
        let object_id = self.inner.add_object(xobject.to_pdf_stream());

        let image = EmbeddedImage {
            object_id,
            width: xobject.width,
            height: xobject.height,
        };
        self.embedded_images.insert(data_hash, image);

        Ok(image)
    }

    /// Get or create an image resource name (e.g. "Im1") on a page
    fn get_or_create_image_ref(&mut self, object_id: ObjectId, page: usize) -> Result<String> {
        if let Some(name) = self
            .page_image_resources
            .get(&page)
            .and_then(|images| images.get(&object_id))
        {
            return Ok(name.clone());
        }

        let resource_name = self.unused_resource_name(page, b"XObject", "Im")?;
        self.set_page_resource(page, b"XObject", &resource_name, object_id)?;
        self.page_image_resources
            .entry(page)
            .or_default()
            .insert(object_id, resource_name.clone());

        Ok(resource_name)
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    fn flush_content_buffers(&mut self) -> Result<()> {
        let mut buffers: Vec<(usize, Vec<u8>)> = self.page_content_buffer.drain().collect();
        buffers.sort_by_key(|(page, _)| *page);

        for (page, content) in buffers {
            if !content.is_empty() {
                debug!(page, bytes = content.len(), "appending overlay content");
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page, isolating the existing content
    ///
    /// The page's `/Contents` becomes `[q, <existing streams>, Q + content]`.
    /// Existing streams are referenced, never decoded or rewritten.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        let existing: Vec<Object> = match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.inner.get_object(*id) {
                // An indirect array of streams
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(Object::Stream(stream)) => {
                let id = self.inner.add_object(stream.clone());
                vec![Object::Reference(id)]
            }
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if existing.is_empty() {
            contents.push(Object::Reference(self.add_flate_stream(content)?));
        } else {
            contents.push(Object::Reference(self.add_flate_stream(b"q\n")?));
            contents.extend(existing);

            let mut overlay = b"\nQ\n".to_vec();
            overlay.extend_from_slice(content);
            contents.push(Object::Reference(self.add_flate_stream(&overlay)?));
        }

        page_dict.set(b"Contents", Object::Array(contents));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    fn add_flate_stream(&mut self, content: &[u8]) -> Result<ObjectId> {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let stream = Stream::new(dict, zlib_compress(content)?);
        Ok(self.inner.add_object(stream))
    }
}
