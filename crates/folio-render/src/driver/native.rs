//! Drivers for formats with first-class tables.
//!
//! A [`NativeDriver`] accepts every table through the
//! [`submit`](OutputDriver::submit) fast path and hands it to a
//! [`TableFormat`] for serialization. It never draws primitives, so the
//! generic layout engine is never involved.

use std::fmt::Write as _;

use folio_pipe::Sink;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use super::wrap::delineate;
use super::{
    DriverClass, DriverState, Extent, Font, FontSpec, Geometry, OutputDriver, Pen, Submission,
    SubmitContext, TextSpec,
};
use crate::error::{OutputError, Result};
use crate::table::{CellFlags, CellRef, Headers, Justify, LineStyle, Span, Table, TextCell};

/// Nominal page size reported by native drivers. They never paginate.
const NOMINAL_PAGE: usize = 1 << 20;

/// Serializes whole tables for a [`NativeDriver`].
pub trait TableFormat {
    fn class(&self) -> &'static dyn DriverClass;

    /// Written when the driver opens.
    fn prologue(&self) -> String {
        String::new()
    }

    /// Written when the driver closes.
    fn epilogue(&self) -> String {
        String::new()
    }

    fn format_table(&self, table: &Table, context: &SubmitContext) -> Result<Vec<u8>>;
}

struct FormatClass {
    name: &'static str,
}

impl DriverClass for FormatClass {
    fn name(&self) -> &'static str {
        self.name
    }
}

static HTML_CLASS: FormatClass = FormatClass { name: "html" };
static JSON_CLASS: FormatClass = FormatClass { name: "json" };
static CSV_CLASS: FormatClass = FormatClass { name: "csv" };

/// A driver that serializes every submitted table with `F`.
pub struct NativeDriver<F> {
    name: String,
    format: F,
    sink: Box<dyn Sink>,
    state: DriverState,
    pen: Pen,
    font: Font,
}

impl<F: TableFormat> NativeDriver<F> {
    pub fn new(name: impl Into<String>, format: F, sink: Box<dyn Sink>) -> Self {
        NativeDriver {
            name: name.into(),
            format,
            sink,
            state: DriverState::Closed,
            pen: Pen::default(),
            font: Font::Regular,
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        if !text.is_empty() {
            self.sink.write(text.as_bytes())?;
        }
        Ok(())
    }
}

impl<F: TableFormat> OutputDriver for NativeDriver<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> &'static dyn DriverClass {
        self.format.class()
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            width: NOMINAL_PAGE,
            length: NOMINAL_PAGE,
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
        let prologue = self.format.prologue();
        self.write(&prologue)?;
        tracing::debug!(driver = %self.name, sink = %self.sink.describe(), "opened native driver");
        self.state = DriverState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.state == DriverState::Closed {
            return Ok(());
        }
        self.state = DriverState::Closed;
        let epilogue = self.format.epilogue();
        let written = self.write(&epilogue);
        let closed = self.sink.close();
        written?;
        closed?;
        Ok(())
    }

    fn open_page(&mut self) -> Result<()> {
        self.state = DriverState::PageOpen;
        self.pen = Pen::default();
        Ok(())
    }

    fn close_page(&mut self) -> Result<()> {
        self.state = DriverState::Open;
        Ok(())
    }

    fn line_width(&self, _style: LineStyle) -> usize {
        0
    }

    fn line_height(&self, _style: LineStyle) -> usize {
        0
    }

    fn set_font(&mut self, font: &FontSpec) -> Result<()> {
        match font {
            FontSpec::Position(font) => self.font = *font,
            FontSpec::Name(name) => {
                self.font = Font::from_name(name)
                    .ok_or_else(|| OutputError::unsupported(self.format.class().name(), "set_font"))?;
            }
            FontSpec::Family(_) => {}
        }
        Ok(())
    }

    fn font_name(&self) -> Option<String> {
        Some(self.font.name().to_string())
    }

    fn font_family(&self) -> Option<String> {
        None
    }

    fn set_size(&mut self, _points: f64) -> bool {
        false
    }

    fn size(&self) -> (usize, usize) {
        (1, 1)
    }

    fn text_metrics(&self, spec: &TextSpec<'_>) -> Extent {
        let limit = if spec.wrap { spec.width } else { usize::MAX };
        delineate(spec.text, limit, spec.max_height, |_, _| {})
    }

    fn text_draw(&mut self, _spec: &TextSpec<'_>) -> Result<Extent> {
        Err(OutputError::unsupported(self.format.class().name(), "text_draw"))
    }

    fn submit(&mut self, table: &Table, context: &SubmitContext) -> Result<Submission> {
        let bytes = self.format.format_table(table, context)?;
        self.sink.write(&bytes)?;
        Ok(Submission::Rendered)
    }
}

/// True for cells inside the frozen header rows or columns.
fn in_headers(headers: Headers, table: &Table, row: usize, col: usize) -> bool {
    row < headers.top
        || row >= table.n_rows() - headers.bottom
        || col < headers.left
        || col >= table.n_cols() - headers.right
}

/// Cells in row-major order, each join reported once at its owner.
fn owned_cells(
    table: &Table,
) -> impl Iterator<Item = (usize, usize, Option<Span>, Option<&TextCell>)> + '_ {
    (0..table.n_rows()).flat_map(move |row| {
        (0..table.n_cols()).filter_map(move |col| match table.cell_at(col, row) {
            CellRef::Empty => Some((row, col, None, None)),
            CellRef::Text(cell) => Some((row, col, None, Some(cell))),
            CellRef::Joined { span, cell, .. } => {
                span.is_owner(col, row).then_some((row, col, Some(span), Some(cell)))
            }
        })
    })
}

/// Options for [`HtmlFormat`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    /// Document title.
    pub title: Option<String>,
    /// Stylesheet linked from the document head.
    pub stylesheet: Option<String>,
}

/// HTML documents, one `<table>` per submitted table.
#[derive(Clone, Debug, Default)]
pub struct HtmlFormat {
    pub options: HtmlOptions,
}

impl HtmlFormat {
    pub fn new(options: HtmlOptions) -> Self {
        HtmlFormat { options }
    }
}

fn html_text(cell: &TextCell) -> String {
    let text = escape(cell.text.as_str()).replace('\n', "<br>");
    if cell.flags.contains(CellFlags::EMPHASIS) {
        format!("<em>{text}</em>")
    } else {
        text
    }
}

impl TableFormat for HtmlFormat {
    fn class(&self) -> &'static dyn DriverClass {
        &HTML_CLASS
    }

    fn prologue(&self) -> String {
        let title = self.options.title.as_deref().unwrap_or("Output");
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape(title));
        if let Some(stylesheet) = &self.options.stylesheet {
            let _ = writeln!(
                out,
                "<link rel=\"stylesheet\" href=\"{}\">",
                escape(stylesheet.as_str())
            );
        }
        out.push_str("</head>\n<body>\n");
        out
    }

    fn epilogue(&self) -> String {
        "</body>\n</html>\n".to_string()
    }

    fn format_table(&self, table: &Table, context: &SubmitContext) -> Result<Vec<u8>> {
        let mut out = String::new();
        if table.is_paragraph() {
            if let Some(cell) = table.cell_at(0, 0).text() {
                let _ = writeln!(out, "<p>{}</p>", html_text(cell));
            }
            return Ok(out.into_bytes());
        }

        let ruled = (0..table.n_rows()).any(|r| (0..=table.n_cols()).any(|c| !table.rule_v(c, r).is_none()))
            || (0..=table.n_rows()).any(|r| (0..table.n_cols()).any(|c| !table.rule_h(c, r).is_none()));
        out.push_str(if ruled { "<table border=\"1\">\n" } else { "<table>\n" });
        if let Some(caption) = &context.caption {
            let _ = writeln!(out, "<caption>{}</caption>", escape(caption.as_str()));
        }

        let headers = table.headers();
        let mut current_row = None;
        for (row, col, span, cell) in owned_cells(table) {
            if current_row != Some(row) {
                if current_row.is_some() {
                    out.push_str("</tr>\n");
                }
                out.push_str("<tr>");
                current_row = Some(row);
            }
            let Some(cell) = cell else {
                out.push_str("<td></td>");
                continue;
            };
            let tag = if in_headers(headers, table, row, col) || cell.flags.contains(CellFlags::TITLE) {
                "th"
            } else {
                "td"
            };
            let _ = write!(out, "<{tag}");
            match cell.justify {
                Justify::Left => {}
                Justify::Right => out.push_str(" align=\"right\""),
                Justify::Center => out.push_str(" align=\"center\""),
            }
            if let Some(span) = span {
                if span.width() > 1 {
                    let _ = write!(out, " colspan=\"{}\"", span.width());
                }
                if span.height() > 1 {
                    let _ = write!(out, " rowspan=\"{}\"", span.height());
                }
            }
            let _ = write!(out, ">{}</{tag}>", html_text(cell));
        }
        if current_row.is_some() {
            out.push_str("</tr>\n");
        }
        out.push_str("</table>\n");
        Ok(out.into_bytes())
    }
}

#[derive(Serialize)]
struct TableRecord<'a> {
    kind: &'static str,
    table: usize,
    subtable: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    cols: usize,
    rows: usize,
    headers: Headers,
    cells: Vec<CellRecord<'a>>,
    rules: RuleRecord,
}

#[derive(Serialize)]
struct CellRecord<'a> {
    row: usize,
    col: usize,
    text: &'a str,
    justify: Justify,
    #[serde(skip_serializing_if = "CellFlags::is_empty")]
    flags: CellFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    span: Option<Span>,
}

#[derive(Serialize)]
struct RuleRecord {
    horizontal: Vec<Vec<LineStyle>>,
    vertical: Vec<Vec<LineStyle>>,
}

/// JSON Lines: one object per submitted table.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormat;

impl TableFormat for JsonFormat {
    fn class(&self) -> &'static dyn DriverClass {
        &JSON_CLASS
    }

    fn format_table(&self, table: &Table, context: &SubmitContext) -> Result<Vec<u8>> {
        let cells = owned_cells(table)
            .filter_map(|(row, col, span, cell)| {
                cell.map(|cell| CellRecord {
                    row,
                    col,
                    text: &cell.text,
                    justify: cell.justify,
                    flags: cell.flags,
                    span,
                })
            })
            .collect();
        let rules = RuleRecord {
            horizontal: (0..=table.n_rows())
                .map(|r| (0..table.n_cols()).map(|c| table.rule_h(c, r)).collect())
                .collect(),
            vertical: (0..table.n_rows())
                .map(|r| (0..=table.n_cols()).map(|c| table.rule_v(c, r)).collect())
                .collect(),
        };
        let record = TableRecord {
            kind: if table.is_paragraph() { "paragraph" } else { "table" },
            table: context.table_number,
            subtable: context.subtable_number,
            command: context.command.as_deref(),
            caption: context.caption.as_deref(),
            cols: table.n_cols(),
            rows: table.n_rows(),
            headers: table.headers(),
            cells,
            rules,
        };
        let mut bytes = serde_json::to_vec(&record)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Comma-separated values, tables separated by a blank line.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsvFormat;

impl TableFormat for CsvFormat {
    fn class(&self) -> &'static dyn DriverClass {
        &CSV_CLASS
    }

    fn format_table(&self, table: &Table, context: &SubmitContext) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        if let Some(caption) = &context.caption {
            writer.write_record([format!("Table: {caption}")])?;
        }
        for row in 0..table.n_rows() {
            let record: Vec<&str> = (0..table.n_cols())
                .map(|col| match table.cell_at(col, row) {
                    CellRef::Empty => "",
                    CellRef::Text(cell) => cell.text.as_str(),
                    CellRef::Joined { span, cell, .. } if span.is_owner(col, row) => {
                        cell.text.as_str()
                    }
                    CellRef::Joined { .. } => "",
                })
                .collect();
            writer.write_record(&record)?;
        }
        let mut bytes = writer.into_inner()?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Rect;
    use folio_pipe::MemorySink;

    fn sample() -> Table {
        let mut table = Table::new(3, 3).unwrap();
        table.set_headers(1, 0, 1, 0).unwrap();
        table.joint_text(1, 0, 2, 0, Justify::Center, CellFlags::TITLE, "A & B");
        table.text(0, 1, Justify::Left, CellFlags::empty(), "x");
        table.text(1, 1, Justify::Right, CellFlags::empty(), "1");
        table.text(2, 1, Justify::Right, CellFlags::EMPHASIS, "<2>");
        table.text(0, 2, Justify::Left, CellFlags::empty(), "y");
        table.hline(LineStyle::Single, 0, 2, 1);
        table
    }

    fn context() -> SubmitContext {
        SubmitContext {
            table_number: 1,
            subtable_number: 2,
            command: Some("DESCRIPTIVES".into()),
            caption: Some("1.2 DESCRIPTIVES.  Stats".into()),
        }
    }

    #[test]
    fn html_document() {
        let sink = MemorySink::new();
        let mut driver = NativeDriver::new("web", HtmlFormat::default(), Box::new(sink.clone()));
        driver.open().unwrap();
        assert_eq!(driver.submit(&sample(), &context()).unwrap(), Submission::Rendered);
        driver.close().unwrap();

        let html = sink.contents();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<caption>1.2 DESCRIPTIVES.  Stats</caption>"));
        assert!(html.contains("<tr><td></td><th align=\"center\" colspan=\"2\">A &amp; B</th></tr>"));
        assert!(html.contains("<tr><th>x</th><td align=\"right\">1</td>"));
        assert!(html.contains("<td align=\"right\"><em>&lt;2&gt;</em></td>"));
        assert!(html.ends_with("</body>\n</html>\n"));
        assert!(sink.is_closed());
    }

    #[test]
    fn html_paragraph() {
        let bytes = HtmlFormat::default()
            .format_table(&Table::paragraph("a < b"), &SubmitContext::default())
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "<p>a &lt; b</p>\n");
    }

    #[test]
    fn json_lines_record() {
        let bytes = JsonFormat.format_table(&sample(), &context()).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["kind"], "table");
        assert_eq!(value["subtable"], 2);
        assert_eq!(value["cells"][0]["span"]["x2"], 2);
        assert_eq!(value["cells"][0]["flags"], "TITLE");
        assert_eq!(value["rules"]["horizontal"][1][0], "single");
        assert_eq!(value["cells"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn csv_rows() {
        let bytes = CsvFormat.format_table(&sample(), &context()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Table: 1.2 DESCRIPTIVES.  Stats\n,A & B,\nx,1,<2>\ny,,\n\n"
        );
    }

    #[test]
    fn primitives_are_unsupported() {
        let mut driver = NativeDriver::new("csv", CsvFormat, Box::new(MemorySink::new()));
        driver.open().unwrap();
        driver.open_page().unwrap();
        assert!(matches!(
            driver.text_draw(&TextSpec::new("x")),
            Err(OutputError::Unsupported { driver: "csv", .. })
        ));
        assert!(driver
            .line_horizontal(Rect::new(0, 0, 1, 1), LineStyle::Single)
            .is_err());
    }
}
