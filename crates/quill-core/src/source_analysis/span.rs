// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Byte ranges into source text.
//!
//! A [`Span`] is the half-open byte range `[start, end)` that every token,
//! AST node, and diagnostic carries. A span is meaningless without the
//! [`Source`](super::Source) it indexes into; line/column conversion and
//! text slicing live there, keyed by these offsets.

use std::ops::Range;

/// A half-open byte range into one source file.
///
/// Two `u32`s and `Copy`, so nodes can carry spans freely. The end offset
/// is exclusive; a zero-width span marks a position between bytes, which
/// is how end-of-file diagnostics are addressed.
///
/// # Examples
///
/// ```
/// use quill_core::source_analysis::Span;
///
/// let decl = Span::new(0, 10);
/// let name = Span::new(4, 5);
/// assert!(decl.contains(name));
/// assert_eq!(name.merge(Span::new(8, 10)), Span::new(4, 10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    /// Creates a span from start and end byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Creates a zero-width span at the given offset.
    #[must_use]
    pub const fn point(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// The start byte offset.
    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    /// The end byte offset (exclusive).
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    /// Length of the span in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns true if `inner` lies entirely within this span.
    #[must_use]
    pub fn contains(self, inner: Self) -> bool {
        inner.start >= self.start && inner.end <= self.end
    }

    /// The smallest span covering both this span and `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The equivalent `Range<usize>` for slicing source text.
    #[must_use]
    pub const fn as_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        span.as_range().into()
    }
}
