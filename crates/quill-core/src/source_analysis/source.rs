// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source file representation.
//!
//! A [`Source`] is an immutable UTF-8 text buffer together with a display
//! name and a search directory used to resolve relative `import` paths.
//! Sources are shared by reference (`Arc<Source>`) between the stream, the
//! AST, diagnostics, and the project-wide unit cache.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ecow::EcoString;
use thiserror::Error;

use super::Span;

/// Error produced when a source file cannot be loaded.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be read from disk.
    #[error("cannot read \"{path}\": {source}")]
    Read {
        /// Path that was attempted.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A line/column position inside a source file.
///
/// Both fields are zero-based; `Display` renders them one-based the way
/// editors expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Zero-based line index.
    pub line: u32,
    /// Zero-based byte column within the line.
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// An immutable source file.
#[derive(Debug)]
pub struct Source {
    name: EcoString,
    text: String,
    search_dir: Utf8PathBuf,
    /// Byte offset of the start of each line, always beginning with 0.
    line_starts: Vec<u32>,
}

impl Source {
    /// Creates an in-memory source with the given display name.
    ///
    /// `search_dir` is the directory relative `import` paths resolve
    /// against.
    #[must_use]
    pub fn new(
        name: impl Into<EcoString>,
        text: impl Into<String>,
        search_dir: impl Into<Utf8PathBuf>,
    ) -> Arc<Self> {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Arc::new(Self {
            name: name.into(),
            text,
            search_dir: search_dir.into(),
            line_starts,
        })
    }

    /// Loads a source file from disk.
    ///
    /// The display name becomes the file name and the search directory its
    /// parent directory.
    pub fn from_file(path: &Utf8Path) -> Result<Arc<Self>, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_owned(),
            source,
        })?;
        let name = path.file_name().unwrap_or("<anonymous file>");
        let search_dir = path.parent().unwrap_or(Utf8Path::new(".")).to_owned();
        Ok(Self::new(name, text, search_dir))
    }

    /// The display name of this source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full text of this source.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the source text in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.text.len()).unwrap_or(u32::MAX)
    }

    /// Returns true if the source is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The directory relative imports are resolved against.
    #[must_use]
    pub fn search_dir(&self) -> &Utf8Path {
        &self.search_dir
    }

    /// The text covered by a span.
    ///
    /// # Panics
    ///
    /// Panics if the span does not lie inside this source.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.as_range()]
    }

    /// Converts a byte offset into a line/column location.
    ///
    /// Offsets past the end of the text clamp to the final location.
    #[must_use]
    pub fn location_at(&self, offset: u32) -> Location {
        let offset = offset.min(self.len());
        // partition_point: index of the first line starting after `offset`
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let column = offset - self.line_starts[line];
        Location {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column,
        }
    }

    /// A zero-width span at the end of the text.
    #[must_use]
    pub fn end_span(&self) -> Span {
        Span::point(self.len())
    }
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
        }
    }
    starts
}
