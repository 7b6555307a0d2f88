//! Positioned diagnostics shared by the document parser, the generator and
//! the linter.
//!
//! Lines and columns are 1-based; offsets are 0-based character offsets into
//! the whole source text. The serialised shape (camelCase offsets) is what
//! the editor front end consumes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.severity, self.message
        )
    }
}

/// Character offsets of every line start, used to turn (line, column) pairs
/// into absolute offsets.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    lengths: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = Vec::new();
        let mut lengths = Vec::new();
        let mut offset = 0usize;
        for raw in source.split('\n') {
            let len = raw.chars().count();
            starts.push(offset);
            lengths.push(len);
            offset += len + 1;
        }
        LineIndex { starts, lengths }
    }

    /// Offset of `column` (0-based, in characters) on 0-based line `idx`.
    pub fn offset(&self, idx: usize, column: usize) -> usize {
        self.starts.get(idx).copied().unwrap_or(0) + column
    }

    pub fn line_len(&self, idx: usize) -> usize {
        self.lengths.get(idx).copied().unwrap_or(0)
    }

    /// Diagnostic spanning `len` characters from 0-based `column` on 0-based
    /// line `idx`.
    pub fn span(
        &self,
        idx: usize,
        column: usize,
        len: usize,
        severity: Severity,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic {
            line: idx as u32 + 1,
            column: column as u32 + 1,
            message: message.into(),
            severity,
            start_offset: self.offset(idx, column),
            end_offset: self.offset(idx, column + len),
        }
    }

    /// Diagnostic covering the whole of 0-based line `idx`.
    pub fn whole_line(
        &self,
        idx: usize,
        severity: Severity,
        message: impl Into<String>,
    ) -> Diagnostic {
        self.span(idx, 0, self.line_len(idx), severity, message)
    }
}
