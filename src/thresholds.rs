//! Breaking thresholds keyed by bond class.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// How threshold values are expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdUnit {
    /// Absolute length at which the bond breaks.
    #[default]
    Length,
    /// Relative elongation `|r - r0| / r0` at which the bond breaks.
    Strain,
}

/// Mapping from bond class to breaking threshold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThresholdTable {
    /// Unit of every stored value.
    unit: ThresholdUnit,
    /// Threshold for each bond class.
    values: BTreeMap<u32, f64>,
}

impl ThresholdTable {
    /// Create an empty table.
    #[must_use]
    pub fn new(unit: ThresholdUnit) -> Self {
        Self {
            unit,
            values: BTreeMap::new(),
        }
    }

    /// Number of classes with a threshold.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when no class has a threshold.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Set the threshold of a bond class, replacing any previous value.
    pub fn insert(&mut self, class: u32, value: f64) {
        self.values.insert(class, value);
    }

    /// Raw threshold value of a bond class.
    #[must_use]
    pub fn get(&self, class: u32) -> Option<f64> {
        self.values.get(&class).copied()
    }

    /// Breaking strain of a bond class for a spring of the given rest length.
    #[must_use]
    pub fn strain_threshold(&self, class: u32, rest_length: f64) -> Option<f64> {
        let value = self.get(class)?;
        Some(match self.unit {
            ThresholdUnit::Strain => value,
            ThresholdUnit::Length => value / rest_length - 1.0,
        })
    }

    /// Parse the `<class> <value>` text format.
    ///
    /// Blank lines and lines starting with `#` are ignored; anything else must
    /// hold an integer class followed by a number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedThreshold`] for an unparseable line and
    /// [`ConfigError::EmptyThresholds`] when no entry was found.
    ///
    /// # Examples
    /// ```
    /// use springnet::{ThresholdTable, ThresholdUnit};
    ///
    /// let table = ThresholdTable::parse("# class length\n2 1.25\n3 1.5\n", ThresholdUnit::Length)
    ///     .expect("valid thresholds");
    /// assert_eq!(table.get(3), Some(1.5));
    /// ```
    pub fn parse(text: &str, unit: ThresholdUnit) -> Result<Self, ConfigError> {
        let mut table = Self::new(unit);
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = || ConfigError::MalformedThreshold {
                line: index + 1,
                content: line.to_owned(),
            };
            let mut fields = line.split_whitespace();
            let class = fields
                .next()
                .and_then(|field| field.parse::<u32>().ok())
                .ok_or_else(malformed)?;
            let value = fields
                .next()
                .and_then(|field| field.parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .ok_or_else(malformed)?;
            table.insert(class, value);
        }
        if table.is_empty() {
            return Err(ConfigError::EmptyThresholds);
        }
        tracing::info!(classes = table.len(), "loaded breaking thresholds");
        Ok(table)
    }

    /// Read and parse a threshold file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`ThresholdTable::parse`].
    pub fn from_path(path: &Path, unit: ThresholdUnit) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, unit)
    }

    /// Render the table in the format accepted by [`ThresholdTable::parse`].
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let header = match self.unit {
            ThresholdUnit::Length => "# Bond Type, Breaking Length",
            ThresholdUnit::Strain => "# Bond Type, Breaking Strain",
        };
        writeln!(&mut output, "{header}").expect("writing to string cannot fail");
        for (class, value) in &self.values {
            writeln!(&mut output, "{class} {value:.6}").expect("writing to string cannot fail");
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let table = ThresholdTable::parse("\n# header\n\n2 1.1\n  4   1.3  \n", ThresholdUnit::Length)
            .expect("valid table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(4), Some(1.3));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn malformed_line_is_fatal() {
        let error = ThresholdTable::parse("2 1.1\n3 abc\n", ThresholdUnit::Length)
            .expect_err("bad value rejected");
        assert!(matches!(error, ConfigError::MalformedThreshold { line: 2, .. }));
    }

    #[test]
    fn empty_source_is_fatal() {
        let error = ThresholdTable::parse("# nothing here\n", ThresholdUnit::Strain)
            .expect_err("empty table rejected");
        assert!(matches!(error, ConfigError::EmptyThresholds));
    }

    #[test]
    fn lengths_convert_to_strains() {
        let mut table = ThresholdTable::new(ThresholdUnit::Length);
        table.insert(2, 1.25);
        assert_relative_eq!(table.strain_threshold(2, 1.0).expect("present"), 0.25);
        assert_relative_eq!(table.strain_threshold(2, 0.5).expect("present"), 1.5);

        let mut strains = ThresholdTable::new(ThresholdUnit::Strain);
        strains.insert(2, 0.3);
        assert_relative_eq!(strains.strain_threshold(2, 7.0).expect("present"), 0.3);
    }

    #[test]
    fn rendered_text_parses_back() {
        let mut table = ThresholdTable::new(ThresholdUnit::Length);
        table.insert(2, 1.5);
        table.insert(7, 1.125);
        let parsed = ThresholdTable::parse(&table.to_text(), ThresholdUnit::Length)
            .expect("rendered table parses");
        assert_eq!(parsed, table);
    }
}
