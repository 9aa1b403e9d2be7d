//! Reader for `key = value` case configuration files.
//!
//! # File Format
//!
//! ```text
//! # Mobile Bay, trapezoid
//! shape = trapezoid
//! w_b   = 30e3        ; base width (m)
//! R_br  = 10
//!
//! [GEOCLAW]
//! cell_size 2000
//! bounds = (0, 90e3)
//! ```
//!
//! - One entry per line, `key = value` or `key value`
//! - `#` starts a full-line comment, `;` an inline comment
//! - Optional `[SECTION]` headers; entries before the first header belong
//!   to the root section
//! - Values that parse as numbers become [`ConfigValue::Number`], anything
//!   else stays text
//!
//! Keys are only looked up when used; a missing key is reported at that
//! point, naming the key and section.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed line
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Required key absent
    #[error("missing key '{key}' in section [{section}]")]
    MissingKey { section: String, key: String },

    /// Key present but not numeric
    #[error("key '{key}' must be a number, got '{value}'")]
    NotANumber { key: String, value: String },
}

/// A parsed configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    Number(f64),
    Text(String),
}

impl ConfigValue {
    fn parse(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(v) => ConfigValue::Number(v),
            Err(_) => ConfigValue::Text(raw.to_string()),
        }
    }

    /// Numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(v) => Some(*v),
            ConfigValue::Text(_) => None,
        }
    }

    /// Text value, if the entry was not numeric.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            ConfigValue::Number(_) => None,
        }
    }

    /// Parse a `(a, b)` pair.
    pub fn as_pair(&self) -> Option<(f64, f64)> {
        let text = self.as_str()?.trim();
        let inner = text.strip_prefix('(')?.strip_suffix(')')?;
        let (a, b) = inner.split_once(',')?;
        Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(v) => write!(f, "{}", v),
            ConfigValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Entries of one section.
pub type Section = BTreeMap<String, ConfigValue>;

/// Parsed configuration file.
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    /// Entries before the first section header
    pub root: Section,
    /// Named sections
    pub sections: BTreeMap<String, Section>,
    /// Source file path
    pub source_file: Option<String>,
}

const ROOT: &str = "root";

impl ConfigFile {
    /// Entries of a section (`None` for the root section).
    pub fn section(&self, name: Option<&str>) -> Option<&Section> {
        match name {
            None => Some(&self.root),
            Some(n) => self.sections.get(n),
        }
    }

    /// Names of all sections, in sorted order.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(|s| s.as_str()).collect()
    }

    /// Look up a value.
    pub fn get(&self, section: Option<&str>, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.section(section)
            .and_then(|s| s.get(key))
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.unwrap_or(ROOT).to_string(),
                key: key.to_string(),
            })
    }

    /// Check whether a key is present.
    pub fn contains(&self, section: Option<&str>, key: &str) -> bool {
        self.get(section, key).is_ok()
    }

    /// Look up a numeric value.
    pub fn number(&self, section: Option<&str>, key: &str) -> Result<f64, ConfigError> {
        let value = self.get(section, key)?;
        value.as_f64().ok_or_else(|| ConfigError::NotANumber {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Look up a numeric value, falling back to `default` when the key is absent.
    pub fn number_or(
        &self,
        section: Option<&str>,
        key: &str,
        default: f64,
    ) -> Result<f64, ConfigError> {
        if self.contains(section, key) {
            self.number(section, key)
        } else {
            Ok(default)
        }
    }

    /// Look up a value as text (numbers are rendered).
    pub fn text(&self, section: Option<&str>, key: &str) -> Result<String, ConfigError> {
        self.get(section, key).map(|v| v.to_string())
    }
}

/// Read a configuration file.
///
/// # Errors
/// - `NotFound` if the file does not exist
/// - `ParseError` for a line that has a key but no value
pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.source_file = Some(path.display().to_string());
    Ok(config)
}

/// Parse configuration content from a string.
pub fn parse_config(content: &str) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();
    let mut current: Option<String> = None;

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = match line.split_once(';') {
            Some((before, _)) => before.trim(),
            None => line,
        };
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            config.sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (line, ""),
            },
        };

        if key.is_empty() || value.is_empty() {
            return Err(ConfigError::ParseError {
                line: line_num,
                message: format!("expected 'key = value', got '{}'", line),
            });
        }

        let target = match &current {
            Some(name) => config.sections.entry(name.clone()).or_default(),
            None => &mut config.root,
        };
        target.insert(key.to_string(), ConfigValue::parse(value));
    }

    Ok(config)
}
