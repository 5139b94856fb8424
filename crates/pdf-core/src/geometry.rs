//! Page geometry

/// Rectangle in page space, in points.
///
/// Uses a top-left origin: `y0` is the top edge and `y1` the bottom edge.
/// Conversion to PDF user space (bottom-left origin) happens inside
/// [`crate::PdfDocument`] when operators are generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle anchored at the origin with the given size
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True when `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Centre a `width` x `height` box inside this rectangle
    pub fn center_box(&self, width: f64, height: f64) -> Rect {
        let x0 = self.x0 + (self.width() - width) / 2.0;
        let y0 = self.y0 + (self.height() - height) / 2.0;
        Rect::new(x0, y0, x0 + width, y0 + height)
    }
}

/// Clockwise page rotation applied by viewers (`/Rotate`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl PageRotation {
    /// Normalise a `/Rotate` value; anything not a multiple of 90 is `None`
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(PageRotation::Deg0),
            90 => Some(PageRotation::Deg90),
            180 => Some(PageRotation::Deg180),
            270 => Some(PageRotation::Deg270),
            _ => None,
        }
    }

    /// True when the displayed page has width and height swapped
    pub fn is_sideways(&self) -> bool {
        matches!(self, PageRotation::Deg90 | PageRotation::Deg270)
    }

    /// Directions of displayed "right" and displayed "up" in user space
    ///
    /// These are the columns of the matrix that draws content upright on
    /// the rotated page: `[right.0 right.1 up.0 up.1 e f]`.
    pub fn axes(&self) -> ((f64, f64), (f64, f64)) {
        match self {
            PageRotation::Deg0 => ((1.0, 0.0), (0.0, 1.0)),
            PageRotation::Deg90 => ((0.0, 1.0), (-1.0, 0.0)),
            PageRotation::Deg180 => ((-1.0, 0.0), (0.0, -1.0)),
            PageRotation::Deg270 => ((0.0, -1.0), (1.0, 0.0)),
        }
    }
}
