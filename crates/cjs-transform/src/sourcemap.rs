//! Version 3 source maps.
//!
//! Columns are counted in UTF-16 code units, as the format requires.
//! [`MappingsBuilder`] collects segments while the editor renders and
//! encodes them as base64 VLQ.

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A source map for one transformed file.
///
/// # Examples
///
/// ```
/// use cjs_transform::TextEditor;
///
/// let mut editor = TextEditor::new("abc");
/// editor.overwrite(0, 1, "X")?;
/// let map = editor.generate_map("a.js");
/// assert_eq!(map.mappings, "AAAA,CAAC");
/// assert!(map.to_json()?.contains(r#""version":3"#));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Always `3`.
    pub version: u8,

    /// Name of the generated file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Original source names.
    pub sources: Vec<String>,

    /// Original source contents, parallel to `sources`.
    #[serde(default)]
    pub sources_content: Vec<Option<String>>,

    /// Symbol names; unused.
    #[serde(default)]
    pub names: Vec<String>,

    /// Encoded mappings.
    pub mappings: String,
}

impl SourceMap {
    /// Serializes the map as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Line start offsets of a text, for offset to line/column conversion.
#[derive(Debug)]
pub(crate) struct LineIndex<'s> {
    text: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub(crate) fn new(text: &'s str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    /// 0-based line and UTF-16 column of byte `offset`.
    pub(crate) fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let start = self.starts.get(line).copied().unwrap_or(0);
        let column = utf16_len(self.text.get(start..offset).unwrap_or_default());
        (to_u32(line), column)
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    generated_column: u32,
    original_line: u32,
    original_column: u32,
}

/// Accumulates mapping segments while output is produced.
#[derive(Debug)]
pub(crate) struct MappingsBuilder {
    lines: Vec<Vec<Segment>>,
    column: u32,
}

impl MappingsBuilder {
    pub(crate) fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
            column: 0,
        }
    }

    /// Maps the current output position to an original position.
    pub(crate) fn mark(&mut self, original: (u32, u32)) {
        if let Some(line) = self.lines.last_mut() {
            line.push(Segment {
                generated_column: self.column,
                original_line: original.0,
                original_column: original.1,
            });
        }
    }

    /// Advances over generated text with no original counterpart.
    pub(crate) fn advance(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.column += utf16_len(first);
        }
        for part in parts {
            self.lines.push(Vec::new());
            self.column = utf16_len(part);
        }
    }

    /// Advances over text copied from the original starting at `offset`,
    /// marking the chunk start and each line start inside it. Empty lines
    /// get no segment.
    pub(crate) fn copy(&mut self, text: &str, offset: usize, index: &LineIndex<'_>) {
        let mut consumed = 0;
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.lines.push(Vec::new());
                self.column = 0;
            }
            if !part.is_empty() {
                self.mark(index.position(offset + consumed));
            }
            self.column += utf16_len(part);
            consumed += part.len() + 1;
        }
    }

    /// Encodes the collected segments.
    pub(crate) fn finish(self) -> String {
        let mut out = String::new();
        let mut previous_line = 0i64;
        let mut previous_column = 0i64;

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let mut previous_generated = 0i64;
            for (j, segment) in line.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                let generated = i64::from(segment.generated_column);
                let line = i64::from(segment.original_line);
                let column = i64::from(segment.original_column);

                encode_vlq(&mut out, generated - previous_generated);
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, line - previous_line);
                encode_vlq(&mut out, column - previous_column);

                previous_generated = generated;
                previous_line = line;
                previous_column = column;
            }
        }
        out
    }
}

/// Appends `value` as a base64 VLQ.
pub(crate) fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = vlq & 0b1_1111;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        // digit < 64 always.
        out.push(char::from(BASE64[usize::try_from(digit).unwrap_or(0)]));
        if vlq == 0 {
            break;
        }
    }
}

fn utf16_len(text: &str) -> u32 {
    to_u32(text.encode_utf16().count())
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
