// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic records.
//!
//! Everything the frontend reports — lexer warnings, parse errors, resolve
//! and type errors, import failures — flows through [`Diagnostic`] values.
//! This crate never formats or prints them itself; each record carries its
//! owning [`Source`] and a [`Span`] (convertible to `miette::SourceSpan`)
//! so any reporter can render it.

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use crate::source_analysis::{Source, Span};

/// Result type used throughout lexing and parsing.
///
/// A parse failure is itself a [`Diagnostic`]; callers either commit an
/// alternative (dropping the error) or propagate it upward to be reported.
pub type ParseResult<T = ()> = Result<T, Diagnostic>;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational output, e.g. from a debug probe.
    Note,
    /// Something suspicious that does not prevent compilation.
    Warning,
    /// An error that prevents compilation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Note => "note",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A single diagnostic message tied to a source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// The message text.
    pub message: EcoString,
    /// Location the message points at.
    pub span: Span,
    /// The source the span belongs to.
    pub source: Arc<Source>,
    /// Optional hint for how to fix the issue.
    pub hint: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(source: Arc<Source>, message: impl Into<EcoString>, span: Span) -> Self {
        Self::new(Severity::Error, source, message, span)
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(source: Arc<Source>, message: impl Into<EcoString>, span: Span) -> Self {
        Self::new(Severity::Warning, source, message, span)
    }

    /// Creates a new note diagnostic.
    #[must_use]
    pub fn note(source: Arc<Source>, message: impl Into<EcoString>, span: Span) -> Self {
        Self::new(Severity::Note, source, message, span)
    }

    fn new(
        severity: Severity,
        source: Arc<Source>,
        message: impl Into<EcoString>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            span,
            source,
            hint: None,
        }
    }

    /// Attaches a fix-it hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Returns true if this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.severity == other.severity
            && self.message == other.message
            && self.span == other.span
            && self.hint == other.hint
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = self.source.location_at(self.span.start());
        write!(
            f,
            "{}:{loc}: {}: {}",
            self.source.name(),
            self.severity,
            self.message
        )
    }
}
