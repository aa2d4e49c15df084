//! Layout terminates and covers every body row on arbitrary table shapes.

use folio_pipe::MemorySink;
use folio_render::driver::wrap::delineate;
use folio_render::driver::{
    DriverClass, DriverState, Extent, Font, FontSpec, Geometry, OutputDriver, Pen, Rect, TextSpec,
};
use folio_render::som::{DriverReport, Strategy as Layout};
use folio_render::table::ColumnStyle;
use folio_render::{
    AsciiDriver, AsciiOptions, CellFlags, Justify, LayoutEngine, LineStyle, OutputError, Sides,
    Table,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

type DriverResult<T> = folio_render::Result<T>;

struct GridClass;

impl DriverClass for GridClass {
    fn name(&self) -> &'static str {
        "grid"
    }
}

static GRID_CLASS: GridClass = GridClass;

/// A character grid of any size that draws nothing. Without `rules` its line
/// primitives are left unsupported.
struct GridDriver {
    width: usize,
    length: usize,
    rules: bool,
    state: DriverState,
    pen: Pen,
    font: Font,
}

impl GridDriver {
    fn new(width: usize, length: usize) -> Self {
        GridDriver {
            width,
            length,
            rules: true,
            state: DriverState::Closed,
            pen: Pen::default(),
            font: Font::Regular,
        }
    }

    fn without_rules(mut self) -> Self {
        self.rules = false;
        self
    }

    fn rule(&self, operation: &'static str) -> DriverResult<()> {
        if self.rules {
            Ok(())
        } else {
            Err(OutputError::unsupported("grid", operation))
        }
    }
}

impl OutputDriver for GridDriver {
    fn name(&self) -> &str {
        "grid"
    }

    fn class(&self) -> &'static dyn DriverClass {
        &GRID_CLASS
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

    fn open(&mut self) -> DriverResult<()> {
        self.state = DriverState::Open;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.state = DriverState::Closed;
        Ok(())
    }

    fn open_page(&mut self) -> DriverResult<()> {
        self.state = DriverState::PageOpen;
        self.pen = Pen::default();
        Ok(())
    }

    fn close_page(&mut self) -> DriverResult<()> {
        self.state = DriverState::Open;
        Ok(())
    }

    fn line_width(&self, style: LineStyle) -> usize {
        usize::from(!style.is_none())
    }

    fn line_height(&self, style: LineStyle) -> usize {
        usize::from(!style.is_none())
    }

    fn line_horizontal(&mut self, _rect: Rect, _style: LineStyle) -> DriverResult<()> {
        self.rule("line_horizontal")
    }

    fn line_vertical(&mut self, _rect: Rect, _style: LineStyle) -> DriverResult<()> {
        self.rule("line_vertical")
    }

    fn line_intersection(&mut self, _rect: Rect, _sides: Sides) -> DriverResult<()> {
        self.rule("line_intersection")
    }

    fn set_font(&mut self, font: &FontSpec) -> DriverResult<()> {
        if let FontSpec::Position(font) = font {
            self.font = *font;
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

    fn text_draw(&mut self, spec: &TextSpec<'_>) -> DriverResult<Extent> {
        Ok(self.text_metrics(spec))
    }
}

#[derive(Debug, Clone)]
struct Shape {
    cols: usize,
    rows: usize,
    headers: (usize, usize, usize, usize),
    words: Vec<String>,
    ruled: bool,
    repeat: bool,
}

fn shape() -> impl Strategy<Value = Shape> {
    (1usize..7, 2usize..30)
        .prop_flat_map(|(cols, rows)| {
            (
                Just(cols),
                Just(rows),
                (0..=cols.min(2), 0..=rows.min(3)),
                prop::collection::vec("[a-z]{0,14}( [a-z]{1,6}){0,3}", cols * rows),
                any::<bool>(),
                any::<bool>(),
            )
        })
        .prop_map(|(cols, rows, (left, top), words, ruled, repeat)| Shape {
            cols,
            rows,
            headers: (left.min(cols - 1), 0, top.min(rows - 1), 0),
            words,
            ruled,
            repeat,
        })
}

fn build(shape: &Shape) -> Table {
    let mut table = Table::new(shape.cols, shape.rows).unwrap();
    let (left, right, top, bottom) = shape.headers;
    table.set_headers(left, right, top, bottom).unwrap();
    for r in 0..shape.rows {
        for c in 0..shape.cols {
            let text = &shape.words[r * shape.cols + c];
            table.text(c, r, Justify::Left, CellFlags::empty(), text.as_str());
        }
    }
    if shape.ruled {
        let rule = Some(LineStyle::Single);
        table.frame(rule, rule, rule, rule, 0, 0, shape.cols - 1, shape.rows - 1);
    }
    if shape.repeat {
        table.set_columns(ColumnStyle::RepeatDown, 1);
    }
    table
}

/// Every body row is placed once in the first column band, and pages are
/// only ejected to make room for a placement.
fn check_coverage(shape: &Shape, outcome: &DriverReport) -> Result<(), TestCaseError> {
    prop_assert!(outcome.error.is_none(), "driver failed: {:?}", outcome.error);
    prop_assert!(!outcome.placements.is_empty());
    prop_assert!(outcome.ejects <= outcome.placements.len());

    let (left, _, top, _) = shape.headers;
    let body_rows = shape.rows - top;
    let body_cols = shape.cols - left;
    prop_assert!(outcome.placements.len() <= body_cols.max(1) * body_rows.max(1));

    match outcome.strategy {
        Some(Layout::RepeatDown) | Some(Layout::SingleBlock) => {
            let rows: usize = outcome.placements.iter().map(|p| p.rows.len()).sum();
            prop_assert_eq!(rows, body_rows);
        }
        Some(Layout::Segmented) => {
            let first_band = outcome.placements[0].cols.clone();
            let rows: usize = outcome
                .placements
                .iter()
                .filter(|p| p.cols == first_band)
                .map(|p| p.rows.len())
                .sum();
            prop_assert_eq!(rows, body_rows);
        }
        other => prop_assert!(false, "unexpected strategy {:?}", other),
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_body_row_is_placed(
        shape in shape(),
        width in 10usize..40,
        length in 5usize..16,
    ) {
        let table = build(&shape);
        let sink = MemorySink::new();
        let mut engine = LayoutEngine::new();
        engine
            .add_driver(Box::new(AsciiDriver::new(
                "listing",
                AsciiOptions::plain(width, length),
                Box::new(sink.clone()),
            )))
            .unwrap();

        let report = engine.submit(&table);
        check_coverage(&shape, &report.drivers[0])?;
        prop_assert!(engine.finish().is_ok());
    }

    #[test]
    fn tiny_pages_still_terminate(
        shape in shape(),
        width in 1usize..=3,
        length in 1usize..=3,
    ) {
        let table = build(&shape);
        let mut engine = LayoutEngine::new();
        engine.add_driver(Box::new(GridDriver::new(width, length))).unwrap();

        let report = engine.submit(&table);
        let outcome = &report.drivers[0];
        check_coverage(&shape, outcome)?;
        prop_assert!(engine.finish().is_ok());
    }
}

#[test]
fn single_unit_page_places_every_cell_of_a_grid() {
    let shape = Shape {
        cols: 4,
        rows: 5,
        headers: (0, 0, 0, 0),
        words: (0..20).map(|i| format!("w{i}")).collect(),
        ruled: true,
        repeat: false,
    };
    let mut engine = LayoutEngine::new();
    engine.add_driver(Box::new(GridDriver::new(1, 1))).unwrap();

    let report = engine.submit(&build(&shape));
    let outcome = &report.drivers[0];
    assert_eq!(outcome.strategy, Some(Layout::Segmented));
    assert_eq!(outcome.placements.len(), 20);
    assert_eq!(outcome.ejects, 20);
    assert!(outcome.error.is_none());
    engine.finish().unwrap();
}

#[test]
fn missing_primitive_disables_the_driver_as_a_fault() {
    let shape = Shape {
        cols: 2,
        rows: 2,
        headers: (0, 0, 0, 0),
        words: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        ruled: true,
        repeat: false,
    };
    let mut engine = LayoutEngine::new();
    engine
        .add_driver(Box::new(GridDriver::new(40, 20).without_rules()))
        .unwrap();

    let report = engine.submit(&build(&shape));
    let outcome = &report.drivers[0];
    assert!(outcome.disabled);
    assert!(!outcome.recoverable);
    assert!(outcome.error.as_deref().unwrap().contains("line_"));
    assert!(engine.is_disabled(0));
}
