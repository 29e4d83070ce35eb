//! Per-file source analysis.

use crate::error::Result;
use crate::method::Method;
use serde::{Deserialize, Serialize};

/// Metrics of one source file snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub nloc: usize,
    /// Sum of the methods' cyclomatic complexity.
    pub complexity: usize,
    pub token_count: usize,
    pub methods: Vec<Method>,
}

/// Extracts methods and size/complexity metrics from source text.
pub trait SourceAnalyzer: Send + Sync {
    /// True when the analyzer understands the file's language.
    fn supports(&self, filename: &str) -> bool;

    /// Analyze one snapshot of a supported file.
    fn analyze(&self, filename: &str, source: &str) -> Result<FileAnalysis>;
}
