//! Configuration of the character-cell driver.

use serde::{Deserialize, Serialize};

use crate::boxes::{BoxCode, BoxGlyphs, BoxTable};
use crate::driver::Font;
use crate::error::ConfigError;

/// Smallest usable page, in columns, after margins.
pub const MIN_WIDTH: usize = 10;
/// Smallest usable page, in lines, after margins and headers.
pub const MIN_LENGTH: usize = 5;

/// Lines taken by the running header: two text lines and a blank.
pub const HEADER_LINES: usize = 3;

/// How the print head returns to column 0 between overstrike passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarriageReturn {
    /// A single `\r`.
    #[default]
    Cr,
    /// One backspace per column emitted.
    Bs,
}

/// Granularity of overstrike emulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overstrike {
    /// Backspace after every character.
    #[default]
    PerChar,
    /// Print the whole line, return the carriage, and print it again.
    Line,
}

/// How one non-regular font reaches the device.
///
/// In configuration this is either the word `overstrike` or a map
/// `escape: { on: ..., off: ... }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EmulationRepr", into = "EmulationRepr")]
pub enum FontEmulation {
    /// Underline for italic, double-strike for bold.
    #[default]
    Overstrike,
    /// Device escape strings bracketing each run.
    Escape { on: String, off: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EmulationMode {
    Overstrike,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EscapeStrings {
    on: String,
    off: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum EmulationRepr {
    Mode(EmulationMode),
    Escape { escape: EscapeStrings },
}

impl From<EmulationRepr> for FontEmulation {
    fn from(repr: EmulationRepr) -> Self {
        match repr {
            EmulationRepr::Mode(EmulationMode::Overstrike) => FontEmulation::Overstrike,
            EmulationRepr::Escape { escape } => FontEmulation::Escape {
                on: escape.on,
                off: escape.off,
            },
        }
    }
}

impl From<FontEmulation> for EmulationRepr {
    fn from(emulation: FontEmulation) -> Self {
        match emulation {
            FontEmulation::Overstrike => EmulationRepr::Mode(EmulationMode::Overstrike),
            FontEmulation::Escape { on, off } => EmulationRepr::Escape {
                escape: EscapeStrings { on, off },
            },
        }
    }
}

/// A single box table slot override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxOverride {
    pub index: usize,
    pub glyph: String,
}

/// Options for [`AsciiDriver`](super::AsciiDriver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsciiOptions {
    /// Page width in columns.
    pub width: usize,
    /// Use the terminal width when standard output is a terminal.
    pub fit_terminal: bool,
    /// Page length in lines.
    pub length: usize,
    pub left_margin: usize,
    pub right_margin: usize,
    pub top_margin: usize,
    pub bottom_margin: usize,
    /// Print the two-line running header on each page.
    pub headers: bool,
    /// End each page with a form feed.
    pub paginate: bool,
    /// Collapse runs of blank lines to one.
    pub squeeze: bool,
    /// Render bold and italic fonts; otherwise everything prints regular.
    pub emphasis: bool,
    /// Replace non-ASCII text with ASCII approximations.
    pub transliterate: bool,
    /// Replace runs of spaces reaching a tab stop with tabs; 0 disables.
    pub tab_width: usize,
    pub carriage_return: CarriageReturn,
    pub overstrike: Overstrike,
    pub italic: FontEmulation,
    pub bold: FontEmulation,
    pub bold_italic: FontEmulation,
    /// Written once when the driver opens.
    pub init: Option<String>,
    /// Written once when the driver closes.
    pub done: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Date shown in the header; defaults to today.
    pub date: Option<String>,
    pub version: Option<String>,
    pub host: Option<String>,
    pub boxes: BoxGlyphs,
    #[serde(rename = "box")]
    pub box_overrides: Vec<BoxOverride>,
}

impl Default for AsciiOptions {
    fn default() -> Self {
        AsciiOptions {
            width: 79,
            fit_terminal: false,
            length: 66,
            left_margin: 0,
            right_margin: 0,
            top_margin: 2,
            bottom_margin: 2,
            headers: true,
            paginate: true,
            squeeze: false,
            emphasis: false,
            transliterate: false,
            tab_width: 0,
            carriage_return: CarriageReturn::Cr,
            overstrike: Overstrike::PerChar,
            italic: FontEmulation::Overstrike,
            bold: FontEmulation::Overstrike,
            bold_italic: FontEmulation::Overstrike,
            init: None,
            done: None,
            title: None,
            subtitle: None,
            date: None,
            version: None,
            host: None,
            boxes: BoxGlyphs::Ascii,
            box_overrides: Vec::new(),
        }
    }
}

impl AsciiOptions {
    /// Options for a bare page: no margins, headers or form feeds.
    pub fn plain(width: usize, length: usize) -> Self {
        AsciiOptions {
            width,
            length,
            top_margin: 0,
            bottom_margin: 0,
            headers: false,
            paginate: false,
            ..Default::default()
        }
    }

    /// Emulation configured for `font`; `None` for regular text.
    pub fn emulation(&self, font: Font) -> Option<&FontEmulation> {
        match font {
            Font::Regular => None,
            Font::Italic => Some(&self.italic),
            Font::Bold => Some(&self.bold),
            Font::BoldItalic => Some(&self.bold_italic),
        }
    }

    /// True when `font` is emulated by reprinting the whole line.
    pub fn is_line_overstrike(&self, font: Font) -> bool {
        self.overstrike == Overstrike::Line
            && matches!(self.emulation(font), Some(FontEmulation::Overstrike))
    }

    /// Usable columns after margins.
    pub fn usable_width(&self) -> usize {
        self.width
            .saturating_sub(self.left_margin)
            .saturating_sub(self.right_margin)
    }

    /// Usable lines after margins and the running header.
    pub fn usable_length(&self) -> usize {
        let header = if self.headers { HEADER_LINES } else { 0 };
        self.length
            .saturating_sub(self.top_margin)
            .saturating_sub(self.bottom_margin)
            .saturating_sub(header)
    }

    /// Check everything that does not depend on the page geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.box_overrides {
            if BoxCode::from_index(entry.index).is_none() {
                return Err(ConfigError::BoxIndex(entry.index));
            }
            if entry.glyph.is_empty() {
                return Err(ConfigError::EmptyGlyph(entry.index));
            }
        }
        for (name, emulation) in [
            ("italic", &self.italic),
            ("bold", &self.bold),
            ("bold_italic", &self.bold_italic),
        ] {
            if let FontEmulation::Escape { on, off } = emulation {
                if on.is_empty() && off.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{name} escape strings are both empty"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The box table with overrides applied.
    pub fn box_table(&self) -> BoxTable {
        BoxTable::new(self.boxes).with_overrides(self.box_overrides.iter().filter_map(|entry| {
            BoxCode::from_index(entry.index).map(|code| (code, entry.glyph.as_str()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_line_printer_page() {
        let options = AsciiOptions::default();
        assert_eq!(options.usable_width(), 79);
        assert_eq!(options.usable_length(), 66 - 4 - HEADER_LINES);
        assert!(options.paginate);
        assert_eq!(options.tab_width, 0);
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = r#"
width: 100
headers: false
overstrike: line
bold:
  escape: { on: "\e[1m", off: "\e[0m" }
box:
  - { index: 85, glyph: "*" }
"#;
        let options: AsciiOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.width, 100);
        assert_eq!(options.length, 66);
        assert_eq!(options.overstrike, Overstrike::Line);
        assert_eq!(
            options.bold,
            FontEmulation::Escape {
                on: "\x1b[1m".into(),
                off: "\x1b[0m".into()
            }
        );
        assert_eq!(options.italic, FontEmulation::Overstrike);
        assert!(options.is_line_overstrike(Font::Italic));
        assert!(!options.is_line_overstrike(Font::Bold));
        assert_eq!(options.box_table().glyph(BoxCode::from_index(85).unwrap()), "*");
    }

    #[test]
    fn font_emulation_accepts_word_or_escape_map() {
        let word: FontEmulation = serde_yaml::from_str("overstrike").unwrap();
        assert_eq!(word, FontEmulation::Overstrike);
        assert!(serde_yaml::from_str::<FontEmulation>("underline").is_err());
        assert!(serde_yaml::from_str::<FontEmulation>("escape: { on: x }").is_err());

        let escape = FontEmulation::Escape {
            on: "<b>".into(),
            off: "</b>".into(),
        };
        let yaml = serde_yaml::to_string(&escape).unwrap();
        assert!(yaml.starts_with("escape:"));
        assert_eq!(serde_yaml::from_str::<FontEmulation>(&yaml).unwrap(), escape);
    }

    #[test]
    fn rejects_bad_box_overrides() {
        let mut options = AsciiOptions::default();
        options.box_overrides.push(BoxOverride {
            index: 256,
            glyph: "x".into(),
        });
        assert!(matches!(options.validate(), Err(ConfigError::BoxIndex(256))));

        options.box_overrides[0] = BoxOverride {
            index: 3,
            glyph: String::new(),
        };
        assert!(matches!(options.validate(), Err(ConfigError::EmptyGlyph(3))));
    }
}
