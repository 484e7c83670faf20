//! Decoding of collected output into an indexed set of display lines.
//!
//! The index is rebuilt wholesale for every cycle and never mutated afterwards.
//! Widths count one column per character.

#![allow(missing_docs)]

use std::borrow::Cow;

use crate::core::config::DecodeMode;
use crate::core::errors::{FollowError, Result};

/// Substituted for control characters that would move the terminal cursor.
const REPLACEMENT: char = '\u{FFFD}';

/// One display line inside [`LineIndex::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// Byte offset of the first character.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
    /// Length in display columns.
    pub width: usize,
}

/// Immutable display text plus line spans and content bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    text: String,
    spans: Vec<LineSpan>,
    max_width: usize,
}

impl LineIndex {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of lines.
    #[must_use]
    pub fn max_height(&self) -> usize {
        self.spans.len()
    }

    /// Width of the widest line.
    #[must_use]
    pub const fn max_width(&self) -> usize {
        self.max_width
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    #[must_use]
    pub fn spans(&self) -> &[LineSpan] {
        &self.spans
    }

    #[must_use]
    pub fn line(&self, row: usize) -> Option<&str> {
        self.spans
            .get(row)
            .map(|span| &self.text[span.start..span.start + span.len])
    }

    #[must_use]
    pub fn line_width(&self, row: usize) -> Option<usize> {
        self.spans.get(row).map(|span| span.width)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans
            .iter()
            .map(|span| &self.text[span.start..span.start + span.len])
    }

    /// The whole sanitized text, lines separated by `\n`.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Turns raw command output into a [`LineIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextIndexer {
    mode: DecodeMode,
    tab_width: usize,
}

impl Default for TextIndexer {
    fn default() -> Self {
        Self::new(DecodeMode::Strict, 8)
    }
}

impl TextIndexer {
    #[must_use]
    pub fn new(mode: DecodeMode, tab_width: usize) -> Self {
        Self {
            mode,
            tab_width: tab_width.max(1),
        }
    }

    /// Decode and split `raw` into lines.
    ///
    /// A trailing segment counts as a line only when it is non-empty; the empty
    /// tail after a final `\n` is not an extra line.
    pub fn index(&self, raw: &[u8]) -> Result<LineIndex> {
        let decoded: Cow<'_, str> = match self.mode {
            DecodeMode::Strict => Cow::Borrowed(
                std::str::from_utf8(raw).map_err(|e| FollowError::Decode {
                    offset: e.valid_up_to(),
                })?,
            ),
            DecodeMode::Lossy => String::from_utf8_lossy(raw),
        };

        let mut index = LineIndex {
            text: String::with_capacity(decoded.len()),
            spans: Vec::new(),
            max_width: 0,
        };

        let bytes = decoded.as_bytes();
        let mut line_start = 0;
        for newline in memchr::memchr_iter(b'\n', bytes) {
            self.push_line(&mut index, &decoded[line_start..newline]);
            line_start = newline + 1;
        }
        if line_start < bytes.len() {
            self.push_line(&mut index, &decoded[line_start..]);
        }

        Ok(index)
    }

    fn push_line(&self, index: &mut LineIndex, raw_line: &str) {
        let raw_line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if !index.text.is_empty() || !index.spans.is_empty() {
            index.text.push('\n');
        }
        let start = index.text.len();
        let mut width = 0;
        for c in raw_line.chars() {
            match c {
                '\t' => {
                    let pad = self.tab_width - width % self.tab_width;
                    index.text.extend(std::iter::repeat_n(' ', pad));
                    width += pad;
                }
                c if c.is_control() => {
                    index.text.push(REPLACEMENT);
                    width += 1;
                }
                c => {
                    index.text.push(c);
                    width += 1;
                }
            }
        }
        index.spans.push(LineSpan {
            start,
            len: index.text.len() - start,
            width,
        });
        index.max_width = index.max_width.max(width);
    }
}
