//! One path's change inside a commit.

use crate::analysis::FileAnalysis;
use crate::backend::{ChangeEntry, ModificationType, ObjectId};
use crate::context::RepoContext;
use crate::diff::{parse_diff, ParsedDiff};
use crate::dmm;
use crate::error::Result;
use crate::method::{DmmProperty, Method};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A file modified by a commit.
///
/// Contents, parsed diff and analysis results are fetched on first use and
/// memoised for the lifetime of the record.
pub struct ModifiedFile {
    entry: ChangeEntry,
    commit: ObjectId,
    parent: Option<ObjectId>,
    context: Arc<RepoContext>,
    parsed: OnceCell<ParsedDiff>,
    content: OnceCell<Option<Vec<u8>>>,
    content_before: OnceCell<Option<Vec<u8>>>,
    analysis: OnceCell<Option<FileAnalysis>>,
    analysis_before: OnceCell<Option<FileAnalysis>>,
}

impl ModifiedFile {
    pub fn new(
        entry: ChangeEntry,
        commit: ObjectId,
        parent: Option<ObjectId>,
        context: Arc<RepoContext>,
    ) -> Self {
        Self {
            entry,
            commit,
            parent,
            context,
            parsed: OnceCell::new(),
            content: OnceCell::new(),
            content_before: OnceCell::new(),
            analysis: OnceCell::new(),
            analysis_before: OnceCell::new(),
        }
    }

    pub fn change_type(&self) -> ModificationType {
        self.entry.kind
    }

    /// Path before the change, `None` for additions.
    pub fn old_path(&self) -> Option<&str> {
        self.entry.old_path.as_deref()
    }

    /// Path after the change, `None` for deletions.
    pub fn new_path(&self) -> Option<&str> {
        self.entry.new_path.as_deref()
    }

    /// New path if the file still exists, old path otherwise.
    pub fn path(&self) -> &str {
        self.new_path().or_else(|| self.old_path()).unwrap_or_default()
    }

    /// File name without directories.
    pub fn filename(&self) -> &str {
        let path = self.path();
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
    }

    /// Raw unified diff text.
    pub fn diff(&self) -> &str {
        &self.entry.diff
    }

    pub fn diff_parsed(&self) -> &ParsedDiff {
        self.parsed.get_or_init(|| parse_diff(&self.entry.diff))
    }

    pub fn added_lines(&self) -> usize {
        self.diff_parsed().added.len()
    }

    pub fn deleted_lines(&self) -> usize {
        self.diff_parsed().deleted.len()
    }

    /// Bytes after the change, `None` for deletions.
    pub fn content(&self) -> Result<Option<&[u8]>> {
        let content = self.content.get_or_try_init(|| match self.new_path() {
            Some(path) => self.context.backend.file_bytes(&self.commit, path),
            None => Ok(None),
        })?;
        Ok(content.as_deref())
    }

    /// Bytes before the change, `None` for additions.
    pub fn content_before(&self) -> Result<Option<&[u8]>> {
        let content = self
            .content_before
            .get_or_try_init(|| match (self.old_path(), self.parent.as_deref()) {
                (Some(path), Some(parent)) => self.context.backend.file_bytes(parent, path),
                _ => Ok(None),
            })?;
        Ok(content.as_deref())
    }

    /// Content after the change decoded as UTF-8, invalid sequences replaced.
    pub fn source_code(&self) -> Result<Option<String>> {
        Ok(self
            .content()?
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
    }

    pub fn source_code_before(&self) -> Result<Option<String>> {
        Ok(self
            .content_before()?
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
    }

    /// True when the source analyzer understands this file.
    pub fn language_supported(&self) -> bool {
        self.context.analyzer.supports(self.filename())
    }

    fn analysis(&self) -> Result<Option<&FileAnalysis>> {
        let analysis = self.analysis.get_or_try_init(|| {
            if !self.language_supported() {
                return Ok(None);
            }
            match self.source_code()? {
                Some(source) => self
                    .context
                    .analyzer
                    .analyze(self.filename(), &source)
                    .map(Some),
                None => Ok(None),
            }
        })?;
        Ok(analysis.as_ref())
    }

    fn analysis_before(&self) -> Result<Option<&FileAnalysis>> {
        let analysis = self.analysis_before.get_or_try_init(|| {
            if !self.language_supported() {
                return Ok(None);
            }
            match self.source_code_before()? {
                Some(source) => self
                    .context
                    .analyzer
                    .analyze(self.filename(), &source)
                    .map(Some),
                None => Ok(None),
            }
        })?;
        Ok(analysis.as_ref())
    }

    /// Lines of code after the change, `None` when unsupported or deleted.
    pub fn nloc(&self) -> Result<Option<usize>> {
        Ok(self.analysis()?.map(|a| a.nloc))
    }

    pub fn complexity(&self) -> Result<Option<usize>> {
        Ok(self.analysis()?.map(|a| a.complexity))
    }

    pub fn token_count(&self) -> Result<Option<usize>> {
        Ok(self.analysis()?.map(|a| a.token_count))
    }

    /// Methods after the change; empty when unsupported.
    pub fn methods(&self) -> Result<&[Method]> {
        Ok(self
            .analysis()?
            .map(|a| a.methods.as_slice())
            .unwrap_or_default())
    }

    /// Methods before the change; empty when unsupported.
    pub fn methods_before(&self) -> Result<&[Method]> {
        Ok(self
            .analysis_before()?
            .map(|a| a.methods.as_slice())
            .unwrap_or_default())
    }

    /// Methods touched by the change.
    ///
    /// A new method counts when an added line falls in its range, an old one
    /// when a deleted line does. Each identity is reported once, after-side first.
    pub fn changed_methods(&self) -> Result<Vec<Method>> {
        let parsed = self.diff_parsed();
        let mut changed: Vec<Method> = Vec::new();

        for method in self.methods()? {
            if parsed.added_line_numbers().any(|n| method.contains_line(n))
                && !changed.contains(method)
            {
                changed.push(method.clone());
            }
        }
        for method in self.methods_before()? {
            if parsed.deleted_line_numbers().any(|n| method.contains_line(n))
                && !changed.contains(method)
            {
                changed.push(method.clone());
            }
        }

        Ok(changed)
    }

    /// `(delta_low, delta_high)` for `property`, `None` when unsupported.
    pub fn delta_risk_profile(&self, property: DmmProperty) -> Result<Option<(i64, i64)>> {
        if !self.language_supported() {
            return Ok(None);
        }
        Ok(Some(dmm::delta_risk_profile(
            self.methods_before()?,
            self.methods()?,
            property,
        )))
    }
}

impl fmt::Debug for ModifiedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifiedFile")
            .field("change_type", &self.entry.kind)
            .field("old_path", &self.entry.old_path)
            .field("new_path", &self.entry.new_path)
            .field("commit", &self.commit)
            .finish_non_exhaustive()
    }
}
