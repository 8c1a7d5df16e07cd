//! Catalog records: macroprocesses, processes and indicators.
//!
//! # Responsibility
//! - Define the reference data that measurements hang from.
//! - Resolve an indicator together with its ancestry as one value.
//!
//! # Invariants
//! - `code` is unique per table.
//! - `IndicatorCategory` is a closed set.
//! - `Indicator::target` is stored as free text and parsed on demand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static LEADING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("valid leading number regex")
});

pub type MacroprocessId = i64;
pub type ProcessId = i64;
pub type IndicatorId = i64;

/// Indicator classification used for dashboard breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Efficacy,
    Efficiency,
    Quality,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 3] = [Self::Efficacy, Self::Efficiency, Self::Quality];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Efficacy => "efficacy",
            Self::Efficiency => "efficiency",
            Self::Quality => "quality",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "efficacy" => Some(Self::Efficacy),
            "efficiency" => Some(Self::Efficiency),
            "quality" => Some(Self::Quality),
            _ => None,
        }
    }
}

impl Display for IndicatorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level organizational grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macroprocess {
    pub id: MacroprocessId,
    pub code: String,
    pub name: String,
    /// Display color, usually a `#RRGGBB` value.
    pub color: Option<String>,
    pub icon: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
}

/// Unit of work owned by one macroprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub code: String,
    pub name: String,
    pub macroprocess_id: Option<MacroprocessId>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
}

/// KPI definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub code: String,
    pub process_id: Option<ProcessId>,
    pub name: String,
    /// Human-readable formula, never evaluated.
    pub formula: String,
    pub unit: String,
    pub frequency: String,
    pub category: IndicatorCategory,
    /// Overall target as entered, e.g. `"95"` or `"95%"`.
    pub target: Option<String>,
    pub owner: String,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
}

impl Indicator {
    /// Parses the overall target using leading-number semantics.
    ///
    /// `"95%"` yields `95.0`; text without a leading number yields `None`.
    pub fn numeric_target(&self) -> Option<f64> {
        self.target.as_deref().and_then(parse_leading_number)
    }
}

/// Indicator resolved together with its process and macroprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorWithAncestry {
    pub indicator: Indicator,
    pub process: Option<Process>,
    pub macroprocess: Option<Macroprocess>,
}

impl IndicatorWithAncestry {
    pub fn process_name(&self) -> Option<&str> {
        self.process.as_ref().map(|process| process.name.as_str())
    }

    pub fn macroprocess_name(&self) -> Option<&str> {
        self.macroprocess
            .as_ref()
            .map(|macroprocess| macroprocess.name.as_str())
    }
}

/// Write shape for a new macroprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMacroprocess {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewMacroprocess {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            color: None,
            icon: None,
            display_order: 0,
            is_active: true,
        }
    }
}

/// Write shape for a new process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProcess {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub macroprocess_id: Option<MacroprocessId>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewProcess {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        macroprocess_id: Option<MacroprocessId>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            macroprocess_id,
            owner: None,
            description: None,
            display_order: 0,
            is_active: true,
        }
    }
}

/// Write shape for a new indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIndicator {
    pub code: String,
    #[serde(default)]
    pub process_id: Option<ProcessId>,
    pub name: String,
    pub formula: String,
    pub unit: String,
    pub frequency: String,
    pub category: IndicatorCategory,
    #[serde(default)]
    pub target: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewIndicator {
    /// Builds a monthly indicator with placeholder formula/unit/owner text.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        process_id: Option<ProcessId>,
        category: IndicatorCategory,
    ) -> Self {
        Self {
            code: code.into(),
            process_id,
            name: name.into(),
            formula: String::new(),
            unit: "%".to_string(),
            frequency: "monthly".to_string(),
            category,
            target: None,
            owner: String::new(),
            description: None,
            display_order: 0,
            is_active: true,
        }
    }
}

/// Parses the numeric prefix of `value`, ignoring leading whitespace.
pub fn parse_leading_number(value: &str) -> Option<f64> {
    LEADING_NUMBER_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|number| number.as_str().parse::<f64>().ok())
        .filter(|number| number.is_finite())
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::{parse_leading_number, IndicatorCategory};

    #[test]
    fn leading_number_accepts_suffixes() {
        assert_eq!(parse_leading_number("95%"), Some(95.0));
        assert_eq!(parse_leading_number("  12.5 days"), Some(12.5));
        assert_eq!(parse_leading_number("-3"), Some(-3.0));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("1e2"), Some(100.0));
    }

    #[test]
    fn leading_number_rejects_non_numeric_prefix() {
        assert_eq!(parse_leading_number(">= 90"), None);
        assert_eq!(parse_leading_number("n/a"), None);
        assert_eq!(parse_leading_number(""), None);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(
            IndicatorCategory::parse(" Quality "),
            Some(IndicatorCategory::Quality)
        );
        assert_eq!(IndicatorCategory::parse("speed"), None);
    }
}
