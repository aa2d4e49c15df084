//! Box-drawing glyph lookup for character-cell devices.
//!
//! Every boundary intersection is described by the line style on each of its
//! four sides. The four 2-bit styles pack into an 8-bit [`BoxCode`], which
//! indexes a 256-entry [`BoxTable`] of short strings (usually one glyph).
//!
//! Slots are filled by a deterministic default rule, so a driver never needs
//! per-slot configuration; configured overrides replace individual slots.
//!
//! | Sides ruled | Default |
//! |-------------|---------|
//! | none | `" "` |
//! | any special | `"#"` |
//! | left/right only | `"-"` or `"="` when double |
//! | top/bottom only | `"\|"` or `"#"` when double |
//! | both axes | `"+"` or `"#"` when double |

use serde::{Deserialize, Serialize};

use crate::table::LineStyle;

/// Number of distinct box codes: four sides, four styles each.
pub const BOX_CODES: usize = 256;

/// Line style on each side of an intersection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Sides {
    pub top: LineStyle,
    pub left: LineStyle,
    pub bottom: LineStyle,
    pub right: LineStyle,
}

impl Sides {
    pub fn new(top: LineStyle, left: LineStyle, bottom: LineStyle, right: LineStyle) -> Self {
        Sides {
            top,
            left,
            bottom,
            right,
        }
    }

    /// A horizontal line segment.
    pub fn horizontal(style: LineStyle) -> Self {
        Sides::new(LineStyle::None, style, LineStyle::None, style)
    }

    /// A vertical line segment.
    pub fn vertical(style: LineStyle) -> Self {
        Sides::new(style, LineStyle::None, style, LineStyle::None)
    }

    pub fn is_empty(&self) -> bool {
        self.all().iter().all(|s| s.is_none())
    }

    fn all(&self) -> [LineStyle; 4] {
        [self.top, self.left, self.bottom, self.right]
    }
}

/// Packed 4x2-bit side styles: top in bits 0-1, then left, bottom, right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoxCode(u8);

impl BoxCode {
    pub fn from_index(index: usize) -> Option<BoxCode> {
        u8::try_from(index).ok().map(BoxCode)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn sides(self) -> Sides {
        let bits = self.0 as usize;
        Sides {
            top: LineStyle::from_bits(bits),
            left: LineStyle::from_bits(bits >> 2),
            bottom: LineStyle::from_bits(bits >> 4),
            right: LineStyle::from_bits(bits >> 6),
        }
    }
}

impl From<Sides> for BoxCode {
    fn from(sides: Sides) -> Self {
        let packed = sides.top.bits()
            | sides.left.bits() << 2
            | sides.bottom.bits() << 4
            | sides.right.bits() << 6;
        BoxCode(packed as u8)
    }
}

/// Which glyph family the defaults come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxGlyphs {
    /// Plain ASCII: `-`, `|`, `=`, `#`, `+`.
    #[default]
    Ascii,
    /// Unicode box-drawing characters.
    Unicode,
}

/// A fully populated code-to-glyph table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxTable {
    glyphs: Vec<String>,
}

impl Default for BoxTable {
    fn default() -> Self {
        BoxTable::new(BoxGlyphs::Ascii)
    }
}

impl BoxTable {
    /// Build a table with every slot set from the default rule of `family`.
    pub fn new(family: BoxGlyphs) -> Self {
        let glyphs = (0..BOX_CODES)
            .map(|index| {
                let sides = BoxCode(index as u8).sides();
                match family {
                    BoxGlyphs::Ascii => ascii_glyph(sides).to_string(),
                    BoxGlyphs::Unicode => unicode_glyph(sides).to_string(),
                }
            })
            .collect();
        BoxTable { glyphs }
    }

    /// Replace individual slots. An empty override string keeps the default.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (BoxCode, &'a str)>,
    {
        for (code, glyph) in overrides {
            if !glyph.is_empty() {
                self.glyphs[code.index()] = glyph.to_string();
            }
        }
        self
    }

    pub fn glyph(&self, code: BoxCode) -> &str {
        &self.glyphs[code.index()]
    }

    pub fn get(&self, sides: Sides) -> &str {
        self.glyph(BoxCode::from(sides))
    }

    /// True when every slot holds a non-empty string.
    pub fn is_complete(&self) -> bool {
        self.glyphs.len() == BOX_CODES && self.glyphs.iter().all(|g| !g.is_empty())
    }
}

fn ascii_glyph(sides: Sides) -> &'static str {
    let all = sides.all();
    if sides.is_empty() {
        return " ";
    }
    if all.contains(&LineStyle::Special) {
        return "#";
    }
    let horizontal = !sides.left.is_none() || !sides.right.is_none();
    let vertical = !sides.top.is_none() || !sides.bottom.is_none();
    let double = all.contains(&LineStyle::Double);
    match (horizontal, vertical, double) {
        (true, false, false) => "-",
        (true, false, true) => "=",
        (false, true, false) => "|",
        (true, true, false) => "+",
        _ => "#",
    }
}

fn unicode_glyph(sides: Sides) -> char {
    let t = !sides.top.is_none();
    let l = !sides.left.is_none();
    let b = !sides.bottom.is_none();
    let r = !sides.right.is_none();
    let heavy = sides
        .all()
        .iter()
        .any(|s| matches!(s, LineStyle::Double | LineStyle::Special));

    if heavy {
        match (t, l, b, r) {
            (false, false, false, false) => ' ',
            (false, _, false, _) => '═',
            (_, false, _, false) => '║',
            (true, true, true, true) => '╬',
            (true, false, true, true) => '╠',
            (true, true, true, false) => '╣',
            (false, true, true, true) => '╦',
            (true, true, false, true) => '╩',
            (false, false, true, true) => '╔',
            (false, true, true, false) => '╗',
            (true, false, false, true) => '╚',
            (true, true, false, false) => '╝',
        }
    } else {
        match (t, l, b, r) {
            (false, false, false, false) => ' ',
            (false, true, false, false) => '╴',
            (false, false, false, true) => '╶',
            (true, false, false, false) => '╵',
            (false, false, true, false) => '╷',
            (false, true, false, true) => '─',
            (true, false, true, false) => '│',
            (true, true, true, true) => '┼',
            (true, false, true, true) => '├',
            (true, true, true, false) => '┤',
            (false, true, true, true) => '┬',
            (true, true, false, true) => '┴',
            (false, false, true, true) => '┌',
            (false, true, true, false) => '┐',
            (true, false, false, true) => '└',
            (true, true, false, false) => '┘',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineStyle::{Double as D, None as N, Single as S, Special as X};

    #[test]
    fn code_packing_round_trips() {
        for index in 0..BOX_CODES {
            let code = BoxCode::from_index(index).unwrap();
            assert_eq!(BoxCode::from(code.sides()), code);
        }
        assert!(BoxCode::from_index(BOX_CODES).is_none());
    }

    #[test]
    fn side_bit_positions() {
        assert_eq!(BoxCode::from(Sides::new(S, N, N, N)).index(), 0b0000_0001);
        assert_eq!(BoxCode::from(Sides::new(N, D, N, N)).index(), 0b0000_1000);
        assert_eq!(BoxCode::from(Sides::new(N, N, X, N)).index(), 0b0011_0000);
        assert_eq!(BoxCode::from(Sides::new(N, N, N, S)).index(), 0b0100_0000);
    }

    #[test]
    fn ascii_defaults() {
        let table = BoxTable::default();
        assert_eq!(table.get(Sides::default()), " ");
        assert_eq!(table.get(Sides::horizontal(S)), "-");
        assert_eq!(table.get(Sides::horizontal(D)), "=");
        assert_eq!(table.get(Sides::vertical(S)), "|");
        assert_eq!(table.get(Sides::vertical(D)), "#");
        assert_eq!(table.get(Sides::new(S, S, S, S)), "+");
        assert_eq!(table.get(Sides::new(S, D, S, D)), "#");
        assert_eq!(table.get(Sides::horizontal(X)), "#");
    }

    #[test]
    fn unicode_defaults() {
        let table = BoxTable::new(BoxGlyphs::Unicode);
        assert_eq!(table.get(Sides::horizontal(S)), "─");
        assert_eq!(table.get(Sides::vertical(D)), "║");
        assert_eq!(table.get(Sides::new(N, N, S, S)), "┌");
        assert_eq!(table.get(Sides::new(D, D, D, D)), "╬");
    }

    #[test]
    fn every_slot_is_populated() {
        assert!(BoxTable::new(BoxGlyphs::Ascii).is_complete());
        assert!(BoxTable::new(BoxGlyphs::Unicode).is_complete());
    }

    #[test]
    fn overrides_replace_single_slots() {
        let cross = BoxCode::from(Sides::new(S, S, S, S));
        let table = BoxTable::default().with_overrides([(cross, "*"), (BoxCode(0), "")]);
        assert_eq!(table.glyph(cross), "*");
        assert_eq!(table.glyph(BoxCode(0)), " ");
        assert_eq!(table.get(Sides::horizontal(S)), "-");
    }
}
