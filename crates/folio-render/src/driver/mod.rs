//! The output driver abstraction.
//!
//! Every rendering backend implements [`OutputDriver`]. The capability set
//! covers:
//!
//! - driver lifecycle: [`open`](OutputDriver::open) validates the geometry
//!   computed at construction, [`close`](OutputDriver::close) flushes and
//!   releases the sink
//! - page lifecycle: [`open_page`](OutputDriver::open_page) and
//!   [`close_page`](OutputDriver::close_page)
//! - drawing primitives (lines, intersections, boxes, polylines)
//! - font selection and text measurement/drawing
//! - an optional [`submit`](OutputDriver::submit) fast path for formats with
//!   first-class tables
//!
//! Primitives a driver does not implement return
//! [`OutputError::Unsupported`] through the provided defaults.
//!
//! # State machine
//!
//! ```text
//! Closed --open--> Open --open_page--> PageOpen
//!   ^               |  ^                  |
//!   +-----close-----+  +----close_page----+
//! ```
//!
//! Drawing and text primitives are only valid in `PageOpen`; calling them in
//! any other state is a contract violation and panics.

pub mod ascii;
mod native;
mod registry;
pub mod wrap;

pub use native::{CsvFormat, HtmlFormat, HtmlOptions, JsonFormat, NativeDriver, TableFormat};
pub use registry::{ClassLease, DriverClass, DriverRegistry};

use serde::Serialize;

use crate::boxes::Sides;
use crate::error::{OutputError, Result};
use crate::table::{CellFlags, Justify, LineStyle, Table};

/// Lifecycle state of a driver instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverState {
    #[default]
    Closed,
    /// Driver open, no page in progress.
    Open,
    PageOpen,
}

/// A position on the current page, in device units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Pen {
    pub x: usize,
    pub y: usize,
}

impl Pen {
    pub fn new(x: usize, y: usize) -> Self {
        Pen { x, y }
    }
}

/// A measured size, in device units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
}

impl Extent {
    pub fn new(width: usize, height: usize) -> Self {
        Extent { width, height }
    }
}

/// A half-open rectangle `[x0, x1) x [y0, y1)` in device units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Page geometry of an open driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Usable page width in device units.
    pub width: usize,
    /// Usable page length in device units.
    pub length: usize,
    /// Line height of the default font.
    pub font_height: usize,
    /// Width of an em in the default font.
    pub em_width: usize,
}

/// The four font positions a text device can emulate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Font {
    #[default]
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

impl Font {
    /// Font for a cell with `flags`: titles bold, emphasis italic.
    pub fn for_flags(flags: CellFlags) -> Font {
        match (
            flags.contains(CellFlags::TITLE),
            flags.contains(CellFlags::EMPHASIS),
        ) {
            (false, false) => Font::Regular,
            (false, true) => Font::Italic,
            (true, false) => Font::Bold,
            (true, true) => Font::BoldItalic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Font::Regular => "regular",
            Font::Italic => "italic",
            Font::Bold => "bold",
            Font::BoldItalic => "bold-italic",
        }
    }

    pub fn from_name(name: &str) -> Option<Font> {
        match name.to_ascii_lowercase().as_str() {
            "regular" | "roman" | "r" => Some(Font::Regular),
            "italic" | "i" => Some(Font::Italic),
            "bold" | "b" => Some(Font::Bold),
            "bold-italic" | "bolditalic" | "bi" => Some(Font::BoldItalic),
            _ => None,
        }
    }
}

/// How a caller names a font.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontSpec {
    Name(String),
    Family(String),
    Position(Font),
}

/// A text request for measurement or drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSpec<'a> {
    pub text: &'a str,
    pub x: usize,
    pub y: usize,
    /// Width allotted to the text; justification is relative to it.
    pub width: usize,
    /// Stop after this many device units of height.
    pub max_height: Option<usize>,
    pub justify: Justify,
    /// Wrap at `width` instead of clipping.
    pub wrap: bool,
    /// Draw only part of the laid-out text.
    pub clip: Option<Clip>,
}

/// A visible window onto text laid out at a larger size. The text starts
/// `skip` device units before the drawing position on each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clip {
    pub skip: Pen,
    pub visible: Extent,
}

impl<'a> TextSpec<'a> {
    pub fn new(text: &'a str) -> Self {
        TextSpec {
            text,
            x: 0,
            y: 0,
            width: usize::MAX,
            max_height: None,
            justify: Justify::Left,
            wrap: false,
            clip: None,
        }
    }

    pub fn at(mut self, x: usize, y: usize) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn max_height(mut self, height: usize) -> Self {
        self.max_height = Some(height);
        self
    }

    pub fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn clip(mut self, skip: Pen, visible: Extent) -> Self {
        self.clip = Some(Clip { skip, visible });
        self
    }
}

/// Numbering and caption for one submitted table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmitContext {
    pub table_number: usize,
    pub subtable_number: usize,
    pub command: Option<String>,
    /// Full caption, or `None` when the table is untitled.
    pub caption: Option<String>,
}

/// Outcome of the [`OutputDriver::submit`] fast path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The driver laid out and wrote the whole table itself.
    Rendered,
    /// The driver wants the generic layout engine to drive its primitives.
    Declined,
}

/// A rendering backend.
pub trait OutputDriver {
    /// Instance name, used in logs and reports.
    fn name(&self) -> &str;

    /// The class this instance belongs to.
    fn class(&self) -> &'static dyn DriverClass;

    fn state(&self) -> DriverState;

    fn geometry(&self) -> Geometry;

    fn pen(&self) -> Pen;

    fn set_pen(&mut self, pen: Pen);

    /// Validate the geometry computed at construction and activate the driver.
    fn open(&mut self) -> Result<()>;

    /// Flush everything and release the sink.
    fn close(&mut self) -> Result<()>;

    fn open_page(&mut self) -> Result<()>;

    fn close_page(&mut self) -> Result<()>;

    /// Thickness of a vertical rule of `style`.
    fn line_width(&self, style: LineStyle) -> usize;

    /// Thickness of a horizontal rule of `style`.
    fn line_height(&self, style: LineStyle) -> usize;

    fn line_horizontal(&mut self, _rect: Rect, _style: LineStyle) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "line_horizontal"))
    }

    fn line_vertical(&mut self, _rect: Rect, _style: LineStyle) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "line_vertical"))
    }

    fn line_intersection(&mut self, _rect: Rect, _sides: Sides) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "line_intersection"))
    }

    fn draw_box(&mut self, _rect: Rect, _border: LineStyle, _fill: bool) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "draw_box"))
    }

    fn polyline_begin(&mut self, _at: Pen) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "polyline_begin"))
    }

    fn polyline_point(&mut self, _to: Pen) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "polyline_point"))
    }

    fn polyline_end(&mut self) -> Result<()> {
        Err(OutputError::unsupported(self.class().name(), "polyline_end"))
    }

    fn set_font(&mut self, font: &FontSpec) -> Result<()>;

    fn font_name(&self) -> Option<String>;

    fn font_family(&self) -> Option<String>;

    /// Request a nominal font size in points. Returns false if the device
    /// cannot honor it.
    fn set_size(&mut self, points: f64) -> bool;

    /// `(line height, em width)` of the current font.
    fn size(&self) -> (usize, usize);

    /// Measure `text` without touching the page.
    fn text_metrics(&self, text: &TextSpec<'_>) -> Extent;

    /// Measure and draw `text` onto the open page.
    fn text_draw(&mut self, text: &TextSpec<'_>) -> Result<Extent>;

    /// Lay out a whole table natively. The default declines.
    fn submit(&mut self, _table: &Table, _context: &SubmitContext) -> Result<Submission> {
        Ok(Submission::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_for_flags() {
        assert_eq!(Font::for_flags(CellFlags::empty()), Font::Regular);
        assert_eq!(Font::for_flags(CellFlags::TITLE), Font::Bold);
        assert_eq!(Font::for_flags(CellFlags::EMPHASIS), Font::Italic);
        assert_eq!(
            Font::for_flags(CellFlags::TITLE | CellFlags::EMPHASIS | CellFlags::FIXED),
            Font::BoldItalic
        );
    }

    #[test]
    fn font_names_round_trip() {
        for font in [Font::Regular, Font::Italic, Font::Bold, Font::BoldItalic] {
            assert_eq!(Font::from_name(font.name()), Some(font));
        }
        assert_eq!(Font::from_name("BI"), Some(Font::BoldItalic));
        assert_eq!(Font::from_name("condensed"), None);
    }

    #[test]
    fn text_spec_builder() {
        let spec = TextSpec::new("abc")
            .at(3, 4)
            .width(10)
            .max_height(2)
            .justify(Justify::Right)
            .wrap(true);
        assert_eq!((spec.x, spec.y, spec.width), (3, 4, 10));
        assert_eq!(spec.max_height, Some(2));
        assert!(spec.wrap);
        assert_eq!(spec.clip, None);
        let clipped = spec.clip(Pen::new(1, 0), Extent::new(4, 2));
        assert_eq!(clipped.clip.map(|clip| clip.visible), Some(Extent::new(4, 2)));
    }

    #[test]
    fn rect_dimensions() {
        let rect = Rect::new(2, 3, 7, 3);
        assert_eq!(rect.width(), 5);
        assert_eq!(rect.height(), 0);
        assert!(rect.is_empty());
    }
}
