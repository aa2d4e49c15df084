//! Strategy selection and pagination of one table on one driver.

use std::ops::Range;

use super::metrics::TableMetrics;
use super::render::{JoinHits, SubTable};
use super::{caption, DriverReport, Placement, Strategy};
use crate::driver::wrap::{delineate, str_width};
use crate::driver::{
    DriverState, Extent, Font, FontSpec, Geometry, OutputDriver, Pen, Submission, SubmitContext,
    TextSpec,
};
use crate::error::Result;
use crate::table::{ColumnStyle, Headers, Table, TableFlags};

/// Side-by-side copies that must fit before a table is tiled.
pub const REPEAT_MIN_COPIES: usize = 2;
/// Tiling needs more body rows than this.
pub const REPEAT_MIN_BODY_ROWS: usize = 5;

pub(super) struct Layout<'a> {
    pub driver: &'a mut dyn OutputDriver,
    pub table: &'a Table,
    pub context: &'a SubmitContext,
    pub hits: &'a mut JoinHits,
    pub report: &'a mut DriverReport,
}

/// Row or column indexes: the leading headers, a body band, the trailing
/// headers.
fn with_headers(lead: usize, body: Range<usize>, trail: Range<usize>) -> Vec<usize> {
    (0..lead).chain(body).chain(trail).collect()
}

impl Layout<'_> {
    pub fn run(mut self) -> Result<()> {
        if self.driver.submit(self.table, self.context)? == Submission::Rendered {
            self.report.strategy = Some(Strategy::Native);
            return Ok(());
        }
        if self.driver.state() != DriverState::PageOpen {
            self.driver.open_page()?;
            self.driver.set_pen(Pen::default());
        }
        if self.table.is_paragraph() {
            return self.paragraph();
        }

        let geometry = self.driver.geometry();
        let metrics = TableMetrics::measure(self.table, &*self.driver);
        self.space_before(geometry);

        let table = self.table;
        let headers = table.headers();
        let all_cols: Vec<usize> = (0..table.n_cols()).collect();
        let all_rows: Vec<usize> = (0..table.n_rows()).collect();
        let tw = metrics.width_of(&all_cols);
        let th = metrics.height_of(&all_rows);
        let body_rows = table.n_rows() - headers.top - headers.bottom;

        let strategy = if table.column_layout().style == ColumnStyle::RepeatDown
            && REPEAT_MIN_COPIES * (tw + geometry.em_width) <= geometry.width
            && body_rows > REPEAT_MIN_BODY_ROWS
        {
            Strategy::RepeatDown
        } else if self.fits(tw, th + self.title_height(0, 0, geometry.width), geometry) {
            Strategy::SingleBlock
        } else {
            Strategy::Segmented
        };
        tracing::debug!(driver = %self.driver.name(), ?strategy, tw, th, "selected layout strategy");
        self.report.strategy = Some(strategy);

        match strategy {
            Strategy::RepeatDown => self.repeat_down(&metrics, geometry, tw),
            Strategy::SingleBlock => self.single_block(&metrics, geometry),
            _ => self.segmented(&metrics, geometry),
        }
    }

    fn space_before(&mut self, geometry: Geometry) {
        let pen = self.driver.pen();
        let no_spacing = self.table.flags().contains(TableFlags::NO_SPACING);
        if !(no_spacing && pen.y != 0) {
            self.driver
                .set_pen(Pen::new(0, pen.y + geometry.font_height));
        }
    }

    fn fits(&self, width: usize, height: usize, geometry: Geometry) -> bool {
        let pen = self.driver.pen();
        width <= geometry.width.saturating_sub(pen.x)
            && height <= geometry.length.saturating_sub(pen.y)
    }

    fn eject(&mut self) -> Result<()> {
        tracing::debug!(driver = %self.driver.name(), "page eject");
        self.driver.close_page()?;
        self.driver.open_page()?;
        self.driver.set_pen(Pen::default());
        self.report.ejects += 1;
        Ok(())
    }

    fn caption(&self, x: usize, y: usize) -> Option<String> {
        if self.table.flags().contains(TableFlags::NO_TITLE) {
            return None;
        }
        Some(caption(
            self.context.table_number,
            self.context.subtable_number,
            x,
            y,
            self.context.command.as_deref(),
            self.table.title(),
        ))
    }

    fn title_height(&self, x: usize, y: usize, width: usize) -> usize {
        self.caption(x, y).map_or(0, |text| {
            self.driver
                .text_metrics(&TextSpec::new(&text).width(width).wrap(true))
                .height
        })
    }

    /// Caption width for repeat-down band `index` at `pen`: the band width,
    /// widened to keep the leading number whole, within the line.
    fn slot_width(&self, index: usize, pen: Pen, tw: usize, geometry: Geometry) -> usize {
        let number = self
            .caption(index, 0)
            .and_then(|text| text.split_whitespace().next().map(str_width))
            .unwrap_or(0);
        tw.max(number).min(geometry.width.saturating_sub(pen.x))
    }

    fn draw_title(&mut self, x: usize, y: usize, at: Pen, width: usize) -> Result<Extent> {
        let Some(text) = self.caption(x, y) else {
            return Ok(Extent::default());
        };
        self.driver.set_font(&FontSpec::Position(Font::Regular))?;
        self.driver.text_draw(
            &TextSpec::new(&text)
                .at(at.x, at.y)
                .width(width)
                .wrap(true),
        )
    }

    /// Draw a titled band at `at` and record it.
    fn place(
        &mut self,
        metrics: &TableMetrics,
        index: (usize, usize),
        cols: Range<usize>,
        rows: Range<usize>,
        at: Pen,
        title_width: usize,
    ) -> Result<Extent> {
        let table = self.table;
        let headers = table.headers();
        let col_list = with_headers(
            headers.left,
            cols.clone(),
            table.n_cols() - headers.right..table.n_cols(),
        );
        let row_list = with_headers(
            headers.top,
            rows.clone(),
            table.n_rows() - headers.bottom..table.n_rows(),
        );

        let title = self.draw_title(index.0, index.1, at, title_width)?;
        let sub = SubTable {
            table,
            metrics,
            cols: &col_list,
            rows: &row_list,
        };
        let body = sub.draw(&mut *self.driver, Pen::new(at.x, at.y + title.height), self.hits)?;
        let extent = Extent::new(body.width.max(title.width), title.height + body.height);
        self.report.placements.push(Placement {
            index,
            cols,
            rows,
            at,
            extent,
        });
        Ok(extent)
    }

    /// Largest `k` in `start..=end`, stepping by `group`, whose band of body
    /// rows `start..k` fits in `available` with the row headers.
    fn fit_rows(
        &self,
        metrics: &TableMetrics,
        start: usize,
        end: usize,
        available: usize,
        group: usize,
    ) -> usize {
        let table = self.table;
        let headers = table.headers();
        let trail = table.n_rows() - headers.bottom..table.n_rows();
        let mut best = start;
        while best < end {
            let next = (best + group).min(end);
            let rows = with_headers(headers.top, start..next, trail.clone());
            if metrics.height_of(&rows) > available {
                break;
            }
            best = next;
        }
        best
    }

    /// True when the header rows alone fit in `available`.
    fn headers_fit(&self, metrics: &TableMetrics, headers: Headers, available: usize) -> bool {
        let n_rows = self.table.n_rows();
        let rows = with_headers(headers.top, 0..0, n_rows - headers.bottom..n_rows);
        metrics.height_of(&rows) <= available
    }

    /// Body column bands that each fit the page width with the column
    /// headers, at least one column per band.
    fn column_bands(&self, metrics: &TableMetrics, width: usize) -> Vec<Range<usize>> {
        let table = self.table;
        let headers = table.headers();
        let first = headers.left;
        let end = table.n_cols() - headers.right;
        let trail = end..table.n_cols();
        if first == end {
            return vec![first..first];
        }

        let mut bands = Vec::new();
        let mut x0 = first;
        while x0 < end {
            let mut x1 = x0 + 1;
            while x1 < end
                && metrics.width_of(&with_headers(headers.left, x0..x1 + 1, trail.clone())) <= width
            {
                x1 += 1;
            }
            bands.push(x0..x1);
            x0 = x1;
        }
        bands
    }

    fn single_block(&mut self, metrics: &TableMetrics, geometry: Geometry) -> Result<()> {
        let table = self.table;
        let headers = table.headers();
        let pen = self.driver.pen();
        let extent = self.place(
            metrics,
            (0, 0),
            headers.left..table.n_cols() - headers.right,
            headers.top..table.n_rows() - headers.bottom,
            pen,
            geometry.width.saturating_sub(pen.x),
        )?;
        self.driver.set_pen(Pen::new(0, pen.y + extent.height));
        Ok(())
    }

    fn segmented(&mut self, metrics: &TableMetrics, geometry: Geometry) -> Result<()> {
        let table = self.table;
        let headers = table.headers();
        let body = headers.top..table.n_rows() - headers.bottom;

        for (xi, band) in self.column_bands(metrics, geometry.width).into_iter().enumerate() {
            let mut y0 = body.start;
            let mut yi = 0;
            loop {
                let pen = self.driver.pen();
                let title = self.title_height(xi, yi, geometry.width);
                let available = geometry.length.saturating_sub(pen.y + title);
                let mut y1 = self.fit_rows(metrics, y0, body.end, available, 1);
                let progress = if body.is_empty() {
                    self.headers_fit(metrics, headers, available)
                } else {
                    y1 > y0
                };
                if !progress {
                    if pen.y > 0 {
                        self.eject()?;
                        continue;
                    }
                    y1 = (y0 + 1).min(body.end);
                }

                let extent = self.place(
                    metrics,
                    (xi, yi),
                    band.clone(),
                    y0..y1,
                    Pen::new(0, pen.y),
                    geometry.width,
                )?;
                self.driver.set_pen(Pen::new(0, pen.y + extent.height));
                yi += 1;
                y0 = y1;
                if y0 >= body.end {
                    break;
                }
            }
        }
        Ok(())
    }

    fn repeat_down(&mut self, metrics: &TableMetrics, geometry: Geometry, tw: usize) -> Result<()> {
        let table = self.table;
        let headers = table.headers();
        let group = table.column_layout().group.max(1);
        let cols = headers.left..table.n_cols() - headers.right;
        let body_end = table.n_rows() - headers.bottom;

        let mut y0 = headers.top;
        let mut index = 0;
        let mut band_height = 0;
        while y0 < body_end {
            let pen = self.driver.pen();
            let slot = self.slot_width(index, pen, tw, geometry);
            let title = self.title_height(index, 0, slot);
            let available = geometry.length.saturating_sub(pen.y + title);
            let mut y1 = self.fit_rows(metrics, y0, body_end, available, group);
            if y1 == y0 {
                if pen.x > 0 || pen.y > 0 {
                    self.eject()?;
                    band_height = 0;
                    continue;
                }
                y1 = (y0 + group).min(body_end);
            }

            let extent = self.place(metrics, (index, 0), cols.clone(), y0..y1, pen, slot)?;
            index += 1;
            band_height = band_height.max(extent.height);

            let next_x = pen.x + extent.width + geometry.em_width;
            if next_x + tw <= geometry.width {
                self.driver.set_pen(Pen::new(next_x, pen.y));
            } else {
                self.driver.set_pen(Pen::new(0, pen.y + band_height));
                band_height = 0;
            }
            y0 = y1;
        }

        let pen = self.driver.pen();
        if pen.x > 0 {
            self.driver.set_pen(Pen::new(0, pen.y + band_height));
        }
        Ok(())
    }

    /// The 1x1 case: wrapped text with no title, rules or spacing at the top
    /// of a page.
    fn paragraph(&mut self) -> Result<()> {
        self.report.strategy = Some(Strategy::Paragraph);
        let table = self.table;
        let Some(cell) = table.cell_at(0, 0).text() else {
            return Ok(());
        };
        let geometry = self.driver.geometry();
        let font = Font::for_flags(cell.flags);

        let mut lines = Vec::new();
        let extent = delineate(&cell.text, geometry.width, None, |_, line| lines.push(line));

        let start = self.driver.pen().y;
        let mut y = if start > 0 {
            start + geometry.font_height
        } else {
            0
        };
        let at = Pen::new(0, y);
        for line in lines {
            if y > 0 && y + geometry.font_height > geometry.length {
                self.eject()?;
                y = 0;
            }
            self.driver.set_font(&FontSpec::Position(font))?;
            self.driver.text_draw(
                &TextSpec::new(line)
                    .at(0, y)
                    .width(geometry.width)
                    .justify(cell.justify),
            )?;
            y += geometry.font_height;
        }
        self.driver.set_pen(Pen::new(0, y));
        self.report.placements.push(Placement {
            index: (0, 0),
            cols: 0..1,
            rows: 0..1,
            at,
            extent: Extent::new(extent.width, extent.height * geometry.font_height),
        });
        Ok(())
    }
}
