//! Span-based text editing over an immutable original source.
//!
//! All offsets refer to the original text, so planners can compute their
//! edits independently and in any order. Overlapping overwrites are
//! rejected rather than merged.

use std::collections::BTreeMap;
use std::fmt;

use cjs_core::Span;

use crate::error::EditError;
use crate::sourcemap::{LineIndex, MappingsBuilder, SourceMap};

/// Collects overwrites, prepends and appends against one source text.
///
/// Prepends behave like a stack: the most recent one is rendered first.
/// They go at the start of the text unless
/// [`set_prepend_offset`](Self::set_prepend_offset) moves them.
///
/// # Examples
///
/// ```
/// use cjs_transform::TextEditor;
///
/// let mut editor = TextEditor::new("const a = require('a');");
/// editor.overwrite(0, 23, "import * as a from 'a';")?;
/// editor.prepend("/* second */ ");
/// editor.prepend("/* first */ ");
/// assert_eq!(
///     editor.to_string(),
///     "/* first */ /* second */ import * as a from 'a';"
/// );
/// # Ok::<(), cjs_transform::EditError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TextEditor<'s> {
    original: &'s str,
    edits: BTreeMap<(usize, usize), String>,
    prepends: Vec<String>,
    prepend_offset: usize,
    appends: Vec<String>,
}

impl<'s> TextEditor<'s> {
    /// Creates an editor with no pending edits.
    #[must_use]
    pub fn new(original: &'s str) -> Self {
        Self {
            original,
            edits: BTreeMap::new(),
            prepends: Vec::new(),
            prepend_offset: 0,
            appends: Vec::new(),
        }
    }

    /// The unedited source.
    #[inline]
    #[must_use]
    pub fn original(&self) -> &'s str {
        self.original
    }

    /// Replaces `start..end` of the original with `text`.
    ///
    /// An empty range inserts `text` at `start`.
    ///
    /// # Errors
    ///
    /// Fails if the range is inverted, out of bounds, splits a character,
    /// or overlaps a range already overwritten.
    pub fn overwrite(&mut self, start: usize, end: usize, text: &str) -> Result<(), EditError> {
        if start > end {
            return Err(EditError::InvalidRange { start, end });
        }
        let len = self.original.len();
        if end > len {
            return Err(EditError::OutOfBounds { start, end, len });
        }
        for offset in [start, end] {
            if !self.original.is_char_boundary(offset) {
                return Err(EditError::CharBoundary { offset });
            }
        }

        let span = Span::new(start, end);
        let collision = self
            .edits
            .keys()
            .map(|&(s, e)| Span::new(s, e))
            .find(|existing| existing.overlaps(span));
        if let Some(existing) = collision {
            return Err(EditError::Overlap { span, existing });
        }

        self.edits.insert((start, end), text.to_owned());
        Ok(())
    }

    /// Overwrites `span`; see [`overwrite`](Self::overwrite).
    ///
    /// # Errors
    ///
    /// Same as [`overwrite`](Self::overwrite).
    #[inline]
    pub fn overwrite_span(&mut self, span: Span, text: &str) -> Result<(), EditError> {
        self.overwrite(span.start, span.end, text)
    }

    /// Inserts `text` before everything, including earlier prepends.
    pub fn prepend(&mut self, text: impl Into<String>) {
        self.prepends.push(text.into());
    }

    /// Renders prepends at `offset` of the original instead of at 0.
    ///
    /// A `#!` line must stay first, so prepends go right after it.
    ///
    /// # Errors
    ///
    /// Fails if `offset` is out of bounds or splits a character.
    pub fn set_prepend_offset(&mut self, offset: usize) -> Result<(), EditError> {
        let len = self.original.len();
        if offset > len {
            return Err(EditError::OutOfBounds {
                start: offset,
                end: offset,
                len,
            });
        }
        if !self.original.is_char_boundary(offset) {
            return Err(EditError::CharBoundary { offset });
        }
        self.prepend_offset = offset;
        Ok(())
    }

    /// Inserts `text` after everything, including earlier appends.
    pub fn append(&mut self, text: impl Into<String>) {
        self.appends.push(text.into());
    }

    /// Returns `true` if rendering would produce something other than the
    /// original text.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.prepends.iter().any(|t| !t.is_empty())
            || self.appends.iter().any(|t| !t.is_empty())
            || self
                .edits
                .iter()
                .any(|(&(start, end), text)| self.original.get(start..end) != Some(text.as_str()))
    }

    /// Builds a source map from the rendered output back to the original.
    #[must_use]
    pub fn generate_map(&self, source: &str) -> SourceMap {
        let index = LineIndex::new(self.original);
        let mut mappings = MappingsBuilder::new();
        self.render(|piece| match piece {
            Piece::Generated(text) => mappings.advance(text),
            Piece::Replacement(text, offset) => {
                if !text.is_empty() {
                    mappings.mark(index.position(offset));
                }
                mappings.advance(text);
            }
            Piece::Original(text, offset) => mappings.copy(text, offset, &index),
        });

        SourceMap {
            version: 3,
            file: None,
            sources: vec![source.to_owned()],
            sources_content: vec![Some(self.original.to_owned())],
            names: Vec::new(),
            mappings: mappings.finish(),
        }
    }

    fn render<'a>(&'a self, mut emit: impl FnMut(Piece<'a>)) {
        let mut pending = true;
        let mut cursor = 0;
        for (&(start, end), text) in &self.edits {
            self.emit_original(cursor, start, &mut pending, &mut emit);
            emit(Piece::Replacement(text, start));
            cursor = end;
        }
        self.emit_original(cursor, self.original.len(), &mut pending, &mut emit);

        for text in &self.appends {
            emit(Piece::Generated(text));
        }
    }

    /// Emits `from..to` of the original, with the prepends spliced in the
    /// first time the prepend offset is reached.
    fn emit_original<'a>(
        &'a self,
        from: usize,
        to: usize,
        pending: &mut bool,
        emit: &mut impl FnMut(Piece<'a>),
    ) {
        if !*pending || self.prepend_offset > to {
            if let Some(chunk) = self.original.get(from..to) {
                emit(Piece::Original(chunk, from));
            }
            return;
        }

        *pending = false;
        let split = self.prepend_offset.max(from);
        if let Some(head) = self.original.get(from..split) {
            emit(Piece::Original(head, from));
        }
        for text in self.prepends.iter().rev() {
            emit(Piece::Generated(text));
        }
        if let Some(rest) = self.original.get(split..to) {
            emit(Piece::Original(rest, split));
        }
    }
}

enum Piece<'a> {
    Generated(&'a str),
    Replacement(&'a str, usize),
    Original(&'a str, usize),
}

impl fmt::Display for TextEditor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = Ok(());
        self.render(|piece| {
            if result.is_err() {
                return;
            }
            result = match piece {
                Piece::Generated(text) | Piece::Replacement(text, _) | Piece::Original(text, _) => {
                    f.write_str(text)
                }
            };
        });
        result
    }
}
