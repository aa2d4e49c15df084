//! Loading driver definitions from YAML.
//!
//! ```yaml
//! drivers:
//!   - type: ascii
//!     name: listing
//!     output: listing.txt
//!     options:
//!       width: 132
//!       emphasis: true
//!       bold: overstrike
//!       italic:
//!         escape: { on: "\e[3m", off: "\e[23m" }
//!   - type: html
//!     name: web
//!     output: report.html
//!     options:
//!       title: Frequencies
//!   - type: json
//!     name: spool
//!     output: "|gzip > spool.jsonl.gz"
//! ```
//!
//! `output` is `-` for standard output, `|command` to pipe into a shell
//! command, otherwise a file path.

use std::collections::HashSet;
use std::path::Path;

use folio_pipe::open_target;
use serde::{Deserialize, Serialize};

use crate::driver::ascii::{AsciiDriver, AsciiOptions};
use crate::driver::{CsvFormat, HtmlFormat, HtmlOptions, JsonFormat, NativeDriver, OutputDriver};
use crate::error::ConfigError;

fn stdout_target() -> String {
    "-".to_string()
}

/// One configured output driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DriverConfig {
    Ascii {
        name: String,
        #[serde(default = "stdout_target")]
        output: String,
        #[serde(default)]
        options: AsciiOptions,
    },
    Html {
        name: String,
        #[serde(default = "stdout_target")]
        output: String,
        #[serde(default)]
        options: HtmlOptions,
    },
    Json {
        name: String,
        #[serde(default = "stdout_target")]
        output: String,
    },
    Csv {
        name: String,
        #[serde(default = "stdout_target")]
        output: String,
    },
}

impl DriverConfig {
    pub fn name(&self) -> &str {
        match self {
            DriverConfig::Ascii { name, .. }
            | DriverConfig::Html { name, .. }
            | DriverConfig::Json { name, .. }
            | DriverConfig::Csv { name, .. } => name,
        }
    }

    pub fn output(&self) -> &str {
        match self {
            DriverConfig::Ascii { output, .. }
            | DriverConfig::Html { output, .. }
            | DriverConfig::Json { output, .. }
            | DriverConfig::Csv { output, .. } => output,
        }
    }

    /// Check the entry without touching its output target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name().trim().is_empty() {
            return Err(ConfigError::Invalid("driver name is empty".into()));
        }
        if self.output().trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "driver `{}` has an empty output target",
                self.name()
            )));
        }
        if let DriverConfig::Ascii { options, .. } = self {
            options.validate()?;
        }
        Ok(())
    }

    /// Validate and construct the driver. The driver is not opened.
    pub fn build(&self) -> Result<Box<dyn OutputDriver>, ConfigError> {
        self.validate()?;
        let sink = open_target(self.output());
        let driver: Box<dyn OutputDriver> = match self {
            DriverConfig::Ascii { name, options, .. } => {
                Box::new(AsciiDriver::new(name.as_str(), options.clone(), sink))
            }
            DriverConfig::Html { name, options, .. } => Box::new(NativeDriver::new(
                name.as_str(),
                HtmlFormat::new(options.clone()),
                sink,
            )),
            DriverConfig::Json { name, .. } => {
                Box::new(NativeDriver::new(name.as_str(), JsonFormat, sink))
            }
            DriverConfig::Csv { name, .. } => {
                Box::new(NativeDriver::new(name.as_str(), CsvFormat, sink))
            }
        };
        Ok(driver)
    }
}

/// The set of drivers for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub drivers: Vec<DriverConfig>,
}

impl OutputConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: OutputConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Every entry must be valid and driver names unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for driver in &self.drivers {
            driver.validate()?;
            if !seen.insert(driver.name()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate driver name `{}`",
                    driver.name()
                )));
            }
        }
        Ok(())
    }

    /// Construct every configured driver, in order.
    pub fn build(&self) -> Result<Vec<Box<dyn OutputDriver>>, ConfigError> {
        self.validate()?;
        self.drivers.iter().map(DriverConfig::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ascii::{FontEmulation, Overstrike};

    #[test]
    fn parses_every_driver_type() {
        let config = OutputConfig::from_yaml(
            r#"
drivers:
  - type: ascii
    name: listing
    options:
      width: 132
      emphasis: true
      overstrike: line
      italic:
        escape: { on: "<i>", off: "</i>" }
  - type: html
    name: web
    output: report.html
    options:
      title: Frequencies
  - type: json
    name: spool
    output: "|cat > /dev/null"
  - type: csv
    name: sheet
    output: out.csv
"#,
        )
        .unwrap();

        assert_eq!(config.drivers.len(), 4);
        let DriverConfig::Ascii { name, output, options } = &config.drivers[0] else {
            panic!("expected ascii driver");
        };
        assert_eq!((name.as_str(), output.as_str()), ("listing", "-"));
        assert_eq!(options.width, 132);
        assert_eq!(options.length, 66);
        assert!(options.emphasis);
        assert_eq!(options.overstrike, Overstrike::Line);
        assert_eq!(
            options.italic,
            FontEmulation::Escape {
                on: "<i>".into(),
                off: "</i>".into()
            }
        );
        assert_eq!(config.drivers[1].output(), "report.html");
        assert_eq!(config.drivers[2].name(), "spool");
        assert!(matches!(config.drivers[3], DriverConfig::Csv { .. }));
    }

    #[test]
    fn rejects_unknown_driver_type() {
        let err = OutputConfig::from_yaml("drivers:\n  - type: postscript\n    name: ps\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = OutputConfig::from_yaml(
            "drivers:\n  - type: json\n    name: a\n  - type: csv\n    name: a\n",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "duplicate driver name `a`");
    }

    #[test]
    fn rejects_bad_box_override() {
        let err = OutputConfig::from_yaml(
            "drivers:\n  - type: ascii\n    name: t\n    options:\n      box:\n        - { index: 300, glyph: \"*\" }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BoxIndex(300)));
    }

    #[test]
    fn builds_unopened_drivers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = OutputConfig {
            drivers: vec![DriverConfig::Json {
                name: "spool".into(),
                output: path.display().to_string(),
            }],
        };
        let drivers = config.build().unwrap();
        assert_eq!(drivers[0].name(), "spool");
        assert_eq!(drivers[0].state(), crate::driver::DriverState::Closed);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = OutputConfig::from_file("/nonexistent/folio.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/folio.yaml"));
    }
}
