//! Source location tracking.
//!
//! Every token and AST node carries a [`Span`]: the byte range of its lexeme
//! plus the 1-based line and column of its first byte and the [`FileId`] of
//! the file it was read from. Spans flow from the lexer through the parser
//! into the evaluator so that every runtime failure can be pinned to the
//! exact source position it came from.

use std::sync::Arc;

/// A unique identifier for a source file.
///
/// Ids are assigned sequentially as files are registered in a
/// [`SourceMap`]: the main script first, then each imported file in the
/// order it is reached.
///
/// # Examples
///
/// ```
/// use rune_util::FileId;
///
/// let id = FileId(0);
/// assert_eq!(id.index(), 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

impl FileId {
    /// Create a new file id.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw index value.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Source location span.
///
/// Byte offsets identify the lexeme; `line` and `column` locate its first
/// byte for human-readable output. Both are 1-based, and columns count
/// bytes (a tab is one column).
///
/// # Examples
///
/// ```
/// use rune_util::Span;
///
/// let span = Span::new(4, 9, 1, 5);
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset in source.
    pub start: usize,
    /// End byte offset in source (exclusive).
    pub end: usize,
    /// Line number (1-based).
    pub line: u32,
    /// Column number of the first byte (1-based, in bytes).
    pub column: u32,
    /// File the span belongs to.
    pub file_id: FileId,
}

impl Span {
    /// A placeholder span for values that have no source position, such as
    /// callables invoked directly by the host.
    pub const DUMMY: Span = Span {
        start: 0,
        end: 0,
        line: 0,
        column: 0,
        file_id: FileId(0),
    };

    /// Create a new span in the default file.
    #[inline]
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
            file_id: FileId(0),
        }
    }

    /// Create a new span associated with a specific file.
    #[inline]
    pub fn with_file(start: usize, end: usize, file_id: FileId, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
            file_id,
        }
    }

    /// Length of the span in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the span covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A source file with its content and metadata.
///
/// Line start offsets are precomputed so the renderer can pull out a single
/// line without rescanning the file.
#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    /// The file identifier.
    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// The file name or path label.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full file content.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// A shared handle to the file content.
    #[inline]
    pub fn content_arc(&self) -> Arc<str> {
        Arc::clone(&self.content)
    }

    /// The text of the given 1-based line, without the trailing newline.
    /// Returns `None` for out-of-range line numbers.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        let idx = (line - 1) as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches('\r'))
    }
}

/// Registry of every source file loaded during a run.
///
/// # Examples
///
/// ```
/// use rune_util::SourceMap;
///
/// let mut map = SourceMap::new();
/// let id = map.add_file("main.rune", "x = 1");
/// assert_eq!(map.file(id).unwrap().name(), "main.rune");
/// ```
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        self.files.push(SourceFile::new(id, name, content));
        FileId(id)
    }

    /// Look up a file by id.
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    /// Render a diagnostic as the positioned error banner:
    ///
    /// ```text
    /// error (<file>:<line>:<col>): <message>
    /// <source line>
    ///     ^~~~
    /// ```
    ///
    /// One caret under the first byte of the span, tildes under the rest of
    /// the lexeme. Falls back to a bare `error: <message>` line when the
    /// span does not name a registered file.
    pub fn render(&self, diag: &crate::Diagnostic) -> String {
        let span = diag.span;
        let Some(file) = self.file(span.file_id).filter(|_| span.line > 0) else {
            return format!("error: {}", diag.message);
        };

        let mut out = format!(
            "error ({}:{}:{}): {}",
            file.name(),
            span.line,
            span.column,
            diag.message
        );
        if let Some(line) = file.line_text(span.line) {
            let col = (span.column as usize).saturating_sub(1).min(line.len());
            // The underline never extends past the end of the line.
            let width = span.len().min(line.len() - col).max(1);
            out.push('\n');
            out.push_str(line);
            out.push('\n');
            out.push_str(&" ".repeat(col));
            out.push('^');
            out.push_str(&"~".repeat(width - 1));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Diagnostic;

    #[test]
    fn test_span_len() {
        let span = Span::new(4, 9, 1, 5);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::DUMMY.is_empty());
    }

    #[test]
    fn test_line_text() {
        let file = SourceFile::new(0, "t.rune", "one\ntwo\nthree");
        assert_eq!(file.line_text(1), Some("one"));
        assert_eq!(file.line_text(2), Some("two"));
        assert_eq!(file.line_text(3), Some("three"));
        assert_eq!(file.line_text(4), None);
        assert_eq!(file.line_text(0), None);
    }

    #[test]
    fn test_line_text_strips_carriage_return() {
        let file = SourceFile::new(0, "t.rune", "one\r\ntwo\r\n");
        assert_eq!(file.line_text(1), Some("one"));
        assert_eq!(file.line_text(2), Some("two"));
    }

    #[test]
    fn test_add_file_assigns_sequential_ids() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.rune", "1");
        let b = map.add_file("b.rune", "2");
        assert_eq!(a, FileId(0));
        assert_eq!(b, FileId(1));
        assert_eq!(map.file(b).unwrap().content(), "2");
    }

    #[test]
    fn test_render_banner() {
        let mut map = SourceMap::new();
        let id = map.add_file("main.rune", "x = nope + 1");
        let span = Span::with_file(4, 8, id, 1, 5);
        let diag = Diagnostic::new("Undefined variable 'nope'", span);
        assert_eq!(
            map.render(&diag),
            "error (main.rune:1:5): Undefined variable 'nope'\nx = nope + 1\n    ^~~~"
        );
    }

    #[test]
    fn test_render_second_line() {
        let mut map = SourceMap::new();
        let id = map.add_file("main.rune", "a = 1\nb = a[9]\n");
        let span = Span::with_file(10, 11, id, 2, 5);
        let diag = Diagnostic::new("oops", span);
        assert_eq!(map.render(&diag), "error (main.rune:2:5): oops\nb = a[9]\n    ^");
    }

    #[test]
    fn test_render_without_file() {
        let map = SourceMap::new();
        let diag = Diagnostic::new("boom", Span::DUMMY);
        assert_eq!(map.render(&diag), "error: boom");
    }
}
