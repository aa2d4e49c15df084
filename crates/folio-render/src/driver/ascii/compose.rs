//! Turning a page of cells into device bytes.
//!
//! Fonts are emulated either with configured escape strings or by
//! overstriking. Per-character overstrike backspaces after every glyph. Line
//! overstrike prints the row, returns the carriage and prints it again: a
//! second pass underlines italic and re-strikes bold, and a third pass
//! underlines bold-italic.

use folio_pipe::{Sink, SinkError};
use time::macros::format_description;
use time::OffsetDateTime;

use super::options::{AsciiOptions, CarriageReturn, FontEmulation, Overstrike};
use super::page::{Cell, Glyph, PageBuffer};
use crate::boxes::BoxTable;
use crate::driver::wrap::{char_width, str_width};
use crate::driver::Font;

/// Size of the output line buffer.
pub const LINE_BUFFER_SIZE: usize = 1024;

const BACKSPACE: u8 = 0x08;
const FORM_FEED: u8 = 0x0c;

/// Buffers bytes on their way to a sink, flushing when full.
pub struct OutputBuffer {
    sink: Box<dyn Sink>,
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub fn new(sink: Box<dyn Sink>) -> Self {
        OutputBuffer {
            sink,
            buf: Vec::with_capacity(LINE_BUFFER_SIZE),
        }
    }

    pub fn describe(&self) -> String {
        self.sink.describe()
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.buf.len() + bytes.len() > LINE_BUFFER_SIZE {
            self.flush()?;
        }
        if bytes.len() > LINE_BUFFER_SIZE {
            return self.sink.write(bytes);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.sink.write(&self.buf);
        self.buf.clear();
        result
    }

    /// Discard anything buffered but not yet written.
    pub fn discard(&mut self) {
        self.buf.clear();
    }

    pub fn close(&mut self) -> Result<(), SinkError> {
        self.flush()?;
        self.sink.close()
    }
}

/// The two header lines printed at the top of each page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningHeader {
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub version: String,
    pub host: String,
}

impl RunningHeader {
    pub fn new(options: &AsciiOptions) -> Self {
        RunningHeader {
            title: options.title.clone().unwrap_or_default(),
            subtitle: options.subtitle.clone().unwrap_or_default(),
            date: options.date.clone().unwrap_or_else(today),
            version: options
                .version
                .clone()
                .unwrap_or_else(|| format!("folio {}", env!("CARGO_PKG_VERSION"))),
            host: options
                .host
                .clone()
                .or_else(|| std::env::var("HOSTNAME").ok())
                .unwrap_or_else(|| "localhost".to_string()),
        }
    }

    pub fn lines(&self, page_number: usize, width: usize) -> [String; 2] {
        [
            header_line(
                &self.title,
                &format!("{} - Page {}", self.date, page_number),
                width,
            ),
            header_line(
                &self.subtitle,
                &format!("{} - {}", self.version, self.host),
                width,
            ),
        ]
    }
}

fn today() -> String {
    let format = format_description!("[day] [month repr:short] [year]");
    OffsetDateTime::now_utc().format(format).unwrap_or_default()
}

/// Longest prefix of `s` no wider than `width` columns.
fn clip(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (index, c) in s.char_indices() {
        used += char_width(c);
        if used > width {
            return &s[..index];
        }
    }
    s
}

/// `left` flush left and `right` flush right, each clipped to `width`.
fn header_line(left: &str, right: &str, width: usize) -> String {
    let right = clip(right, width);
    let left = clip(left, width - str_width(right));
    let gap = width - str_width(left) - str_width(right);
    let mut line = String::with_capacity(width);
    line.push_str(left);
    line.extend(std::iter::repeat(' ').take(gap));
    line.push_str(right);
    line.trim_end().to_string()
}

/// Encodes pages using one driver's options and box table.
pub struct Composer<'a> {
    pub options: &'a AsciiOptions,
    pub boxes: &'a BoxTable,
}

impl Composer<'_> {
    /// Write a whole page, framed by margins and the running header.
    pub fn compose_page(
        &self,
        page: &PageBuffer,
        page_number: usize,
        header: &RunningHeader,
        out: &mut OutputBuffer,
    ) -> Result<(), SinkError> {
        let options = self.options;
        let mut line = Vec::with_capacity(page.width() * 2 + 2);

        for _ in 0..options.top_margin {
            out.write(b"\n")?;
        }
        if options.headers {
            for text in header.lines(page_number, page.width()) {
                line.clear();
                self.margin(&mut line);
                line.extend_from_slice(text.as_bytes());
                line.push(b'\n');
                out.write(&line)?;
            }
            out.write(b"\n")?;
        }

        let last = (0..page.height())
            .rev()
            .find(|&y| !page.trimmed_row(y).is_empty());
        if let Some(last) = last {
            let mut previous_blank = false;
            for y in 0..=last {
                let row = page.trimmed_row(y);
                let blank = row.is_empty();
                if blank && previous_blank && options.squeeze {
                    continue;
                }
                previous_blank = blank;

                line.clear();
                if blank {
                    line.push(b'\n');
                } else {
                    self.compose_row(row, &mut line);
                }
                out.write(&line)?;
            }
        }

        for _ in 0..options.bottom_margin {
            out.write(b"\n")?;
        }
        if options.paginate {
            out.write(&[FORM_FEED])?;
        }
        out.flush()
    }

    /// Encode one row, newline included. Returns the number of passes.
    pub fn compose_row(&self, row: &[Cell], out: &mut Vec<u8>) -> usize {
        let mut second = 0;
        let mut third = 0;

        self.margin(out);
        let mut start = 0;
        while start < row.len() {
            let font = row[start].font;
            let end = row[start..]
                .iter()
                .position(|cell| cell.font != font)
                .map_or(row.len(), |n| start + n);
            let run = &row[start..end];

            match self.options.emulation(font) {
                None => self.plain(run, start, true, out),
                Some(FontEmulation::Escape { on, off }) => {
                    out.extend_from_slice(on.as_bytes());
                    self.plain(run, start, false, out);
                    out.extend_from_slice(off.as_bytes());
                }
                Some(FontEmulation::Overstrike) => match self.options.overstrike {
                    Overstrike::PerChar => {
                        for cell in run {
                            self.overstruck(cell, out);
                        }
                    }
                    Overstrike::Line => {
                        self.plain(run, start, false, out);
                        second = end;
                        if font == Font::BoldItalic {
                            third = end;
                        }
                    }
                },
            }
            start = end;
        }

        let mut passes = 1;
        if second > 0 {
            self.carriage_return(&row[..], out);
            self.margin(out);
            for cell in &row[..second] {
                match cell.font {
                    Font::Italic if self.options.is_line_overstrike(Font::Italic) => {
                        self.repeat(b'_', self.columns(cell), out)
                    }
                    font @ (Font::Bold | Font::BoldItalic)
                        if self.options.is_line_overstrike(font) =>
                    {
                        self.push_glyph(cell, out)
                    }
                    _ => self.repeat(b' ', self.columns(cell), out),
                }
            }
            passes = 2;
        }
        if third > 0 {
            self.carriage_return(&row[..second], out);
            self.margin(out);
            for cell in &row[..third] {
                let mark = if cell.font == Font::BoldItalic { b'_' } else { b' ' };
                self.repeat(mark, self.columns(cell), out);
            }
            passes = 3;
        }
        out.push(b'\n');
        passes
    }

    fn margin(&self, out: &mut Vec<u8>) {
        self.repeat(b' ', self.options.left_margin, out);
    }

    fn repeat(&self, byte: u8, count: usize, out: &mut Vec<u8>) {
        out.extend(std::iter::repeat(byte).take(count));
    }

    /// Columns a cell advances the print head.
    fn columns(&self, cell: &Cell) -> usize {
        match cell.glyph {
            Glyph::Char(c) => char_width(c),
            Glyph::Continuation => 0,
            Glyph::Rule(code) => str_width(self.boxes.glyph(code)),
        }
    }

    fn push_glyph(&self, cell: &Cell, out: &mut Vec<u8>) {
        match cell.glyph {
            Glyph::Char(c) => {
                let mut buf = [0; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            Glyph::Continuation => {}
            Glyph::Rule(code) => out.extend_from_slice(self.boxes.glyph(code).as_bytes()),
        }
    }

    /// Emit `run` as-is, optionally folding spaces into tabs. `column` is the
    /// row position of the first cell.
    fn plain(&self, run: &[Cell], column: usize, tabs: bool, out: &mut Vec<u8>) {
        let tab_width = if tabs { self.options.tab_width } else { 0 };
        let mut i = 0;
        while i < run.len() {
            if tab_width > 0 && run[i].is_blank() {
                let spaces = run[i..].iter().take_while(|cell| cell.is_blank()).count();
                let margin = self.options.left_margin;
                let mut at = margin + column + i;
                let stop = at + spaces;
                loop {
                    let next = (at / tab_width + 1) * tab_width;
                    if next > stop || next - at < 2 {
                        break;
                    }
                    out.push(b'\t');
                    at = next;
                }
                self.repeat(b' ', stop - at, out);
                i += spaces;
            } else {
                self.push_glyph(&run[i], out);
                i += 1;
            }
        }
    }

    fn overstruck(&self, cell: &Cell, out: &mut Vec<u8>) {
        let width = self.columns(cell);
        self.push_glyph(cell, out);
        if width == 0 {
            return;
        }
        match cell.font {
            Font::Regular => {}
            Font::Italic => {
                self.repeat(BACKSPACE, width, out);
                self.repeat(b'_', width, out);
            }
            Font::Bold => {
                self.repeat(BACKSPACE, width, out);
                self.push_glyph(cell, out);
            }
            Font::BoldItalic => {
                self.repeat(BACKSPACE, width, out);
                self.repeat(b'_', width, out);
                self.repeat(BACKSPACE, width, out);
                self.push_glyph(cell, out);
            }
        }
    }

    /// Return to column 0 after printing `printed`.
    fn carriage_return(&self, printed: &[Cell], out: &mut Vec<u8>) {
        match self.options.carriage_return {
            CarriageReturn::Cr => out.push(b'\r'),
            CarriageReturn::Bs => {
                let columns: usize = printed.iter().map(|cell| self.columns(cell)).sum();
                self.repeat(BACKSPACE, self.options.left_margin + columns, out);
            }
        }
    }
}
