//! Character-cell text driver.
//!
//! Renders onto a page of fixed-width cells and writes plain text, one line
//! per row. Rules become box-drawing glyphs; bold and italic are produced
//! with escape strings or by overstriking (see [`compose`]).
//!
//! ```rust
//! use folio_pipe::MemorySink;
//! use folio_render::driver::ascii::{AsciiDriver, AsciiOptions};
//! use folio_render::driver::{OutputDriver, TextSpec};
//!
//! let sink = MemorySink::new();
//! let mut driver = AsciiDriver::new("listing", AsciiOptions::plain(20, 5), Box::new(sink.clone()));
//! driver.open().unwrap();
//! driver.open_page().unwrap();
//! driver.text_draw(&TextSpec::new("hello").at(2, 1)).unwrap();
//! driver.close().unwrap();
//!
//! assert_eq!(sink.contents(), "\n  hello\n");
//! ```

pub mod compose;
mod options;
pub mod page;

pub use options::{
    AsciiOptions, BoxOverride, CarriageReturn, FontEmulation, Overstrike, HEADER_LINES,
    MIN_LENGTH, MIN_WIDTH,
};

use std::borrow::Cow;

use folio_pipe::Sink;

use self::compose::{Composer, OutputBuffer, RunningHeader};
use self::page::{Cell, PageBuffer};
use super::wrap::{char_width, delineate};
use super::{
    DriverClass, DriverState, Extent, Font, FontSpec, Geometry, OutputDriver, Pen, Rect,
    TextSpec,
};
use crate::boxes::{BoxCode, BoxTable, Sides};
use crate::error::{OutputError, Result};
use crate::table::LineStyle;

/// The character-cell driver class.
pub struct AsciiClass;

impl DriverClass for AsciiClass {
    fn name(&self) -> &'static str {
        "ascii"
    }
}

pub static ASCII_CLASS: AsciiClass = AsciiClass;

/// A text-device driver instance.
pub struct AsciiDriver {
    name: String,
    options: AsciiOptions,
    out: OutputBuffer,
    state: DriverState,
    page: PageBuffer,
    boxes: BoxTable,
    header: RunningHeader,
    page_number: usize,
    pen: Pen,
    font: Font,
    width: usize,
    length: usize,
}

impl AsciiDriver {
    /// Create a driver writing to `sink`. Nothing is written until
    /// [`open`](OutputDriver::open) succeeds.
    pub fn new(name: impl Into<String>, options: AsciiOptions, sink: Box<dyn Sink>) -> Self {
        let mut options = options;
        if options.fit_terminal {
            if let Some((terminal_size::Width(columns), _)) = terminal_size::terminal_size() {
                options.width = usize::from(columns);
            }
        }
        let width = options.usable_width();
        let length = options.usable_length();
        let header = RunningHeader::new(&options);
        AsciiDriver {
            name: name.into(),
            options,
            out: OutputBuffer::new(sink),
            state: DriverState::Closed,
            page: PageBuffer::new(),
            boxes: BoxTable::default(),
            header,
            page_number: 0,
            pen: Pen::default(),
            font: Font::Regular,
            width,
            length,
        }
    }

    /// Pages completed so far.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    fn require_page(&self, operation: &str) {
        assert!(
            self.state == DriverState::PageOpen,
            "{operation} on driver `{}` requires an open page",
            self.name
        );
    }

    fn fill(&mut self, rect: Rect, cell: Cell) {
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                self.page.put(x, y, cell);
            }
        }
    }

    fn prepare_text<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.options.transliterate && !text.is_ascii() {
            Cow::Owned(deunicode::deunicode(text))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// The font cells get tagged with; without emphasis everything is regular.
    fn cell_font(&self) -> Font {
        if self.options.emphasis {
            self.font
        } else {
            Font::Regular
        }
    }

    /// Draw one laid-out line whose first column is `skip` units left of
    /// `x`, keeping only the `visible` units from `x` on.
    fn draw_line(&mut self, line: &str, x: usize, y: usize, spec: &TextSpec<'_>, skip: usize, visible: usize) {
        let offset = if spec.width == usize::MAX {
            0
        } else {
            spec.justify.offset(spec.width, super::wrap::str_width(line))
        };
        let font = self.cell_font();
        let mut column = offset;
        for c in line.chars() {
            let w = char_width(c);
            if w == 0 {
                continue;
            }
            let at = column;
            column += w;
            if at < skip {
                continue;
            }
            let rel = at - skip;
            if rel.saturating_add(w) > visible {
                break;
            }
            let c = if c == '\t' { ' ' } else { c };
            if !self.page.put_char(x + rel, y, c, w, font) {
                break;
            }
        }
    }

    fn limit(&self, spec: &TextSpec<'_>) -> usize {
        if spec.wrap {
            spec.width
        } else {
            usize::MAX
        }
    }
}

impl OutputDriver for AsciiDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> &'static dyn DriverClass {
        &ASCII_CLASS
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            width: self.width,
            length: self.length,
            font_height: 1,
            em_width: 1,
        }
    }

    fn pen(&self) -> Pen {
        self.pen
    }

    fn set_pen(&mut self, pen: Pen) {
        self.pen = pen;
    }

    fn open(&mut self) -> Result<()> {
        assert_eq!(self.state, DriverState::Closed, "driver `{}` is already open", self.name);
        if self.width < MIN_WIDTH || self.length < MIN_LENGTH {
            return Err(OutputError::Configuration(format!(
                "driver `{}`: usable page of {}x{} is smaller than the minimum {}x{}",
                self.name, self.width, self.length, MIN_WIDTH, MIN_LENGTH
            )));
        }
        self.options
            .validate()
            .map_err(|err| OutputError::Configuration(format!("driver `{}`: {err}", self.name)))?;
        self.boxes = self.options.box_table();

        if let Some(init) = &self.options.init {
            self.out.write(init.as_bytes())?;
            self.out.flush()?;
        }
        tracing::debug!(driver = %self.name, sink = %self.out.describe(), "opened ascii driver");
        self.state = DriverState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.state == DriverState::Closed {
            return Ok(());
        }
        let pending = if self.state == DriverState::PageOpen {
            self.close_page()
        } else {
            Ok(())
        };
        self.state = DriverState::Closed;
        let done = match &self.options.done {
            Some(done) => self.out.write(done.as_bytes()),
            None => Ok(()),
        };
        let closed = self.out.close();
        pending?;
        done?;
        closed?;
        Ok(())
    }

    fn open_page(&mut self) -> Result<()> {
        assert_eq!(
            self.state,
            DriverState::Open,
            "driver `{}` cannot open a page in state {:?}",
            self.name,
            self.state
        );
        self.page_number += 1;
        self.page.prepare(self.width, self.length);
        self.pen = Pen::default();
        self.font = Font::Regular;
        self.state = DriverState::PageOpen;
        Ok(())
    }

    fn close_page(&mut self) -> Result<()> {
        self.require_page("close_page");
        self.state = DriverState::Open;
        let composer = Composer {
            options: &self.options,
            boxes: &self.boxes,
        };
        if let Err(err) = composer.compose_page(&self.page, self.page_number, &self.header, &mut self.out) {
            self.out.discard();
            return Err(err.into());
        }
        Ok(())
    }

    fn line_width(&self, style: LineStyle) -> usize {
        usize::from(!style.is_none())
    }

    fn line_height(&self, style: LineStyle) -> usize {
        usize::from(!style.is_none())
    }

    fn line_horizontal(&mut self, rect: Rect, style: LineStyle) -> Result<()> {
        self.require_page("line_horizontal");
        if !style.is_none() {
            self.fill(rect, Cell::rule(BoxCode::from(Sides::horizontal(style))));
        }
        Ok(())
    }

    fn line_vertical(&mut self, rect: Rect, style: LineStyle) -> Result<()> {
        self.require_page("line_vertical");
        if !style.is_none() {
            self.fill(rect, Cell::rule(BoxCode::from(Sides::vertical(style))));
        }
        Ok(())
    }

    fn line_intersection(&mut self, rect: Rect, sides: Sides) -> Result<()> {
        self.require_page("line_intersection");
        if !sides.is_empty() {
            self.fill(rect, Cell::rule(BoxCode::from(sides)));
        }
        Ok(())
    }

    fn draw_box(&mut self, rect: Rect, border: LineStyle, fill: bool) -> Result<()> {
        self.require_page("draw_box");
        if rect.is_empty() {
            return Ok(());
        }
        if fill {
            self.fill(rect, Cell::BLANK);
        }
        if border.is_none() {
            return Ok(());
        }
        if rect.height() == 1 {
            return self.line_horizontal(rect, border);
        }
        if rect.width() == 1 {
            return self.line_vertical(rect, border);
        }

        let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1 - 1, rect.y1 - 1);
        let none = LineStyle::None;
        self.fill(
            Rect::new(x0 + 1, y0, x1, y0 + 1),
            Cell::rule(BoxCode::from(Sides::horizontal(border))),
        );
        self.fill(
            Rect::new(x0 + 1, y1, x1, y1 + 1),
            Cell::rule(BoxCode::from(Sides::horizontal(border))),
        );
        self.fill(
            Rect::new(x0, y0 + 1, x0 + 1, y1),
            Cell::rule(BoxCode::from(Sides::vertical(border))),
        );
        self.fill(
            Rect::new(x1, y0 + 1, x1 + 1, y1),
            Cell::rule(BoxCode::from(Sides::vertical(border))),
        );
        let corners = [
            (x0, y0, Sides::new(none, none, border, border)),
            (x1, y0, Sides::new(none, border, border, none)),
            (x0, y1, Sides::new(border, none, none, border)),
            (x1, y1, Sides::new(border, border, none, none)),
        ];
        for (x, y, sides) in corners {
            self.page.put(x, y, Cell::rule(BoxCode::from(sides)));
        }
        Ok(())
    }

    fn set_font(&mut self, font: &FontSpec) -> Result<()> {
        self.require_page("set_font");
        match font {
            FontSpec::Position(font) => self.font = *font,
            FontSpec::Name(name) => {
                self.font = Font::from_name(name)
                    .ok_or_else(|| OutputError::unsupported("ascii", "set_font"))?;
            }
            FontSpec::Family(family) => {
                if !matches!(family.to_ascii_lowercase().as_str(), "monospace" | "fixed" | "courier") {
                    return Err(OutputError::unsupported("ascii", "set_font"));
                }
            }
        }
        Ok(())
    }

    fn font_name(&self) -> Option<String> {
        Some(self.font.name().to_string())
    }

    fn font_family(&self) -> Option<String> {
        Some("monospace".to_string())
    }

    fn set_size(&mut self, _points: f64) -> bool {
        false
    }

    fn size(&self) -> (usize, usize) {
        (1, 1)
    }

    fn text_metrics(&self, spec: &TextSpec<'_>) -> Extent {
        let text = self.prepare_text(spec.text);
        delineate(&text, self.limit(spec), spec.max_height, |_, _| {})
    }

    fn text_draw(&mut self, spec: &TextSpec<'_>) -> Result<Extent> {
        self.require_page("text_draw");
        let text = self.prepare_text(spec.text);
        let mut lines = Vec::new();
        let extent = delineate(&text, self.limit(spec), spec.max_height, |index, line| {
            lines.push((index, line));
        });
        let (skip, visible) = match spec.clip {
            Some(clip) => (clip.skip, clip.visible),
            None => (Pen::default(), Extent::new(usize::MAX, usize::MAX)),
        };
        for (index, line) in lines {
            let Some(row) = index.checked_sub(skip.y) else {
                continue;
            };
            if row >= visible.height {
                break;
            }
            self.draw_line(line, spec.x, spec.y + row, spec, skip.x, visible.width);
        }
        Ok(extent)
    }
}
