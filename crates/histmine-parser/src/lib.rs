//! Histmine Parser Library
//!
//! Tree-sitter based method analysis: extracts functions and methods with
//! their size, complexity and call metrics.

pub mod analyzer;
mod grammar;

pub use analyzer::MethodAnalyzer;
