//! Methods extracted from source files.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Methods up to this many lines of code are low risk for unit size.
pub const UNIT_SIZE_LOW_RISK_THRESHOLD: usize = 15;
/// Methods up to this cyclomatic complexity are low risk.
pub const UNIT_COMPLEXITY_LOW_RISK_THRESHOLD: usize = 5;
/// Methods with up to this many parameters are low risk for unit interfacing.
pub const UNIT_INTERFACING_LOW_RISK_THRESHOLD: usize = 2;

/// Risk dimension of the Delta Maintainability Model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmmProperty {
    UnitSize,
    UnitComplexity,
    UnitInterfacing,
}

impl DmmProperty {
    pub const ALL: [DmmProperty; 3] = [
        DmmProperty::UnitSize,
        DmmProperty::UnitComplexity,
        DmmProperty::UnitInterfacing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DmmProperty::UnitSize => "unit_size",
            DmmProperty::UnitComplexity => "unit_complexity",
            DmmProperty::UnitInterfacing => "unit_interfacing",
        }
    }
}

/// A function or method found in a source file.
///
/// Two methods are equal when their name and parameter list match, so a
/// method keeps its identity across snapshots even after moving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Method {
    /// Name, qualified by the enclosing type when there is one.
    pub name: String,
    /// Name followed by the parameter list.
    pub long_name: String,
    pub filename: String,
    /// Lines of code, blanks and comment-only lines excluded.
    pub nloc: usize,
    /// Cyclomatic complexity.
    pub complexity: usize,
    pub token_count: usize,
    pub parameters: Vec<String>,
    /// First line (1-indexed).
    pub start_line: usize,
    /// Last line (1-indexed, inclusive).
    pub end_line: usize,
    pub fan_in: usize,
    pub fan_out: usize,
    pub general_fan_out: usize,
    /// Lines spanned, blanks included.
    pub length: usize,
    pub top_nesting_level: usize,
}

impl Method {
    /// Create a method with a name and parameters; metrics start at zero.
    pub fn new(name: impl Into<String>, parameters: Vec<String>) -> Self {
        let name = name.into();
        let long_name = format!("{}({})", name, parameters.join(", "));
        Self {
            name,
            long_name,
            parameters,
            ..Default::default()
        }
    }

    /// Set the line range; `length` follows from it.
    pub fn with_line_range(mut self, start: usize, end: usize) -> Self {
        self.start_line = start;
        self.end_line = end;
        self.length = end.saturating_sub(start) + 1;
        self
    }

    /// Set lines of code and cyclomatic complexity.
    pub fn with_metrics(mut self, nloc: usize, complexity: usize) -> Self {
        self.nloc = nloc;
        self.complexity = complexity;
        self
    }

    /// True when `line` falls inside the method.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// True when the method is at or below the threshold of `property`.
    pub fn is_low_risk(&self, property: DmmProperty) -> bool {
        match property {
            DmmProperty::UnitSize => self.nloc <= UNIT_SIZE_LOW_RISK_THRESHOLD,
            DmmProperty::UnitComplexity => self.complexity <= UNIT_COMPLEXITY_LOW_RISK_THRESHOLD,
            DmmProperty::UnitInterfacing => {
                self.parameters.len() <= UNIT_INTERFACING_LOW_RISK_THRESHOLD
            }
        }
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }
}

impl Eq for Method {}

impl Hash for Method {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.parameters.hash(state);
    }
}
