use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Plot style parameters keyed the way plotting backends name them, e.g. `font.size`
///
/// This is a plain value handed to whichever backend draws the figure, nothing is registered
/// globally. The defaults are the house style used for analysis figures: large fonts, inward ticks
/// on all four sides and a major grid.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotStyle {
    params: BTreeMap<String, StyleValue>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        use StyleValue::{Bool, Float, Integer, Text};

        let defaults = [
            ("font.weight", Text("normal".to_owned())),
            ("font.size", Integer(16)),
            ("text.usetex", Bool(false)),
            ("figure.titlesize", Integer(16)),
            ("axes.linewidth", Float(1.5)),
            ("axes.labelweight", Text("normal".to_owned())),
            ("axes.titlesize", Integer(16)),
            ("axes.labelsize", Integer(16)),
            ("axes.grid", Bool(true)),
            ("axes.grid.axis", Text("both".to_owned())),
            ("axes.grid.which", Text("major".to_owned())),
            ("xtick.top", Bool(true)),
            ("xtick.bottom", Bool(true)),
            ("ytick.right", Bool(true)),
            ("ytick.left", Bool(true)),
            ("xtick.direction", Text("in".to_owned())),
            ("ytick.direction", Text("in".to_owned())),
            ("xtick.major.width", Float(1.5)),
            ("ytick.major.width", Float(1.5)),
            ("xtick.minor.width", Float(1.5)),
            ("ytick.minor.width", Float(1.5)),
            ("xtick.major.size", Integer(8)),
            ("ytick.major.size", Integer(8)),
            ("xtick.minor.size", Integer(5)),
            ("ytick.minor.size", Integer(5)),
            ("xtick.major.pad", Float(7.5)),
            ("ytick.major.pad", Float(7.5)),
            ("xtick.minor.pad", Float(7.5)),
            ("ytick.minor.pad", Float(7.5)),
            ("xtick.labelsize", Integer(16)),
            ("ytick.labelsize", Integer(16)),
            ("lines.linewidth", Integer(2)),
        ];

        Self {
            params: defaults
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
        }
    }
}

impl PlotStyle {
    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.params.get(key)
    }

    /// Set a parameter, adding it if it is not one of the defaults. Returns the previous value.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<StyleValue>,
    ) -> Option<StyleValue> {
        self.params.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn with_overrides<K, V, I>(mut self, overrides: I) -> Self
    where
        K: Into<String>,
        V: Into<StyleValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in overrides {
            self.set(key, value);
        }
        self
    }

    /// All parameters in key order, ready to hand to a backend
    pub fn params(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Layer a toml document over the default style
    ///
    /// Nested tables are flattened into dotted keys, so these are equivalent:
    ///
    /// ```toml
    /// "font.size" = 18
    ///
    /// [font]
    /// size = 18
    /// ```
    ///
    /// # Errors
    /// Returns an error if the document is not valid toml or holds arrays or datetimes.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        let mut overrides = vec![];
        flatten("", table, &mut overrides)?;
        Ok(Self::default().with_overrides(overrides))
    }

    /// # Errors
    /// Returns an error if the file is missing or holds an invalid style.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let style = Self::from_toml_str(&fs::read_to_string(path)?)?;
        debug!(?path, params = style.params.len(), "loaded plot style");
        Ok(style)
    }

    /// Dotted keys are written quoted, which [`PlotStyle::from_toml_str`] reads back unchanged
    ///
    /// # Errors
    /// Returns an error if serialisation fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(&self.params)?)
    }
}

fn flatten(prefix: &str, table: toml::Table, out: &mut Vec<(String, StyleValue)>) -> Result<()> {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        let value = match value {
            toml::Value::Table(nested) => {
                flatten(&key, nested, out)?;
                continue;
            }
            toml::Value::Boolean(value) => StyleValue::Bool(value),
            toml::Value::Integer(value) => StyleValue::Integer(value),
            toml::Value::Float(value) => StyleValue::Float(value),
            toml::Value::String(value) => StyleValue::Text(value),
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                return Err(Error::InvalidStyle(format!(
                    "{key} must be a boolean, number or string"
                )))
            }
        };
        out.push((key, value));
    }
    Ok(())
}
