//! Concatenates ordered shader source fragments into the single buffer a
//! GL compiler sees, while recording which assembled lines came from which
//! file. The offset table is what lets `diagnostics` point at
//! `playground.glsl:14` instead of a line number inside an anonymous blob.
//!
//! Types:
//!
//! - `SourceFragment` is one input file's name and text, immutable once read.
//! - `FragmentSpan` is one offset-table entry: the run of assembled lines
//!   that start inside a fragment.
//! - `AssembledSource` is the concatenated text plus the span table.
//!
//! Functions:
//!
//! - `assemble` reads an ordered path list from disk and builds an
//!   `AssembledSource`, failing on the first unreadable file.

use std::fs;
use std::path::PathBuf;

use crate::error::AssembleError;

/// One input file contributing to an assembled shader source.
#[derive(Debug, Clone)]
pub struct SourceFragment {
    name: String,
    text: String,
}

impl SourceFragment {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}

/// Offset-table entry: the assembled-source lines that start inside one
/// fragment. `start_line` is 1-based; a fragment in which no line starts
/// (for example an empty file) carries `line_count == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSpan {
    pub name: String,
    pub start_line: u32,
    pub line_count: u32,
}

impl FragmentSpan {
    pub fn contains(&self, line: u32) -> bool {
        line >= self.start_line && line < self.start_line + self.line_count
    }
}

/// The concatenated source for one shader stage, as handed to the compiler,
/// plus the offset table mapping its lines back to fragments.
///
/// Invariant: spans are contiguous, non-overlapping, and cover every line of
/// the buffer exactly once; the sum of their `line_count`s equals
/// [`AssembledSource::total_lines`].
#[derive(Debug, Clone)]
pub struct AssembledSource {
    text: String,
    spans: Vec<FragmentSpan>,
}

impl AssembledSource {
    /// Concatenates fragments in the given order, byte for byte. No trimming
    /// and no line-ending normalization: diagnostics mapping has to operate
    /// on exactly the text the compiler sees.
    pub fn from_fragments(fragments: Vec<SourceFragment>) -> Result<Self, AssembleError> {
        let total: usize = fragments.iter().map(SourceFragment::byte_len).sum();
        if total == 0 {
            return Err(AssembleError::EmptySource);
        }

        let mut text = String::with_capacity(total);
        let mut spans = Vec::with_capacity(fragments.len());
        // A line is attributed to the fragment that contains its first byte:
        // line k starts at offset 0 or right after the (k-1)th newline.
        let mut next_line = 1u32;
        for fragment in fragments {
            let starts_here = lines_starting_in(&text, &fragment.text);
            spans.push(FragmentSpan {
                name: fragment.name,
                start_line: next_line,
                line_count: starts_here,
            });
            next_line += starts_here;
            text.push_str(&fragment.text);
        }

        Ok(Self { text, spans })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[FragmentSpan] {
        &self.spans
    }

    /// Number of lines the compiler will count in this buffer. A trailing
    /// newline terminates the last line rather than opening a new one.
    pub fn total_lines(&self) -> u32 {
        self.text.lines().count() as u32
    }

    /// Literal text of the 1-based `line`, without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.text.lines().nth(line as usize - 1)
    }

    /// The offset-table entry covering the 1-based `line`, if any.
    pub fn span_for_line(&self, line: u32) -> Option<&FragmentSpan> {
        self.spans.iter().find(|span| span.contains(line))
    }
}

/// Counts how many lines of the final buffer will start inside `part`, given
/// everything concatenated before it. A part whose first byte continues an
/// unterminated line from its predecessor does not start that line.
fn lines_starting_in(before: &str, part: &str) -> u32 {
    if part.is_empty() {
        return 0;
    }
    let continues_previous = !before.is_empty() && !before.ends_with('\n');
    let mut count = if continues_previous { 0 } else { 1 };
    // A newline at the very end of the part opens a line only if a later
    // part contributes its first byte, and is attributed to that part.
    for (pos, _) in part.match_indices('\n') {
        if pos + 1 < part.len() {
            count += 1;
        }
    }
    count
}

/// Reads the ordered fragment files and concatenates them into an
/// [`AssembledSource`]. The first missing or unreadable path aborts the
/// assembly; an all-empty input set is rejected as well.
pub fn assemble(paths: &[PathBuf]) -> Result<AssembledSource, AssembleError> {
    let mut fragments = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(path).map_err(|source| AssembleError::MissingFragment {
            path: path.clone(),
            source,
        })?;
        fragments.push(SourceFragment::new(path.display().to_string(), text));
    }
    AssembledSource::from_fragments(fragments)
}
