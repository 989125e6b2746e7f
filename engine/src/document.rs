//! Minimal editor-buffer model.
//!
//! [`Document`] is what the lint and fix handlers need from an editor;
//! [`TextBuffer`] is an in-memory implementation used by the CLI and tests.
//! Rows, columns and offsets are 0-based byte positions.

use std::path::{Path, PathBuf};
use std::{fs, io};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lintbridge_types::{Position, Range};

/// The editor state a lint or fix request reads.
pub trait Document: Send + Sync {
    /// Current full text.
    fn text(&self) -> String;
    /// Backing file, if the buffer has been saved somewhere.
    fn path(&self) -> Option<PathBuf>;
    /// True when the buffer has unsaved changes.
    fn is_modified(&self) -> bool;
    /// Grammar scope name, e.g. `source.js`.
    fn scope_name(&self) -> String;
}

/// Line starts of a text, for offset/line ↔ position mapping.
#[derive(Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, starts }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Text of `row` without its terminator.
    #[must_use]
    pub fn line(&self, row: usize) -> Option<&'a str> {
        let start = *self.starts.get(row)?;
        let end = self
            .starts
            .get(row + 1)
            .map_or(self.text.len(), |next| next - 1);
        let line = &self.text.as_bytes()[start..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        // Start and end sit next to ASCII bytes, so both are char boundaries.
        self.text.get(start..start + line.len())
    }

    /// Position of a byte offset. Offsets past the end clamp to the end;
    /// an offset inside a `\r\n` terminator maps to the end of its line.
    #[must_use]
    pub fn position_for_offset(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let row = self.starts.partition_point(|&start| start <= offset) - 1;
        let line_len = self.line(row).map_or(0, str::len);
        Position::new(row, (offset - self.starts[row]).min(line_len))
    }

    /// Range covering a 1-based `line` from a 1-based `column` to the end of
    /// the line. Without a column the range starts at the first
    /// non-whitespace character.
    ///
    /// Returns `None` when the line does not exist or the column lies past
    /// the end of the line.
    #[must_use]
    pub fn range_for_line(&self, line: usize, column: Option<usize>) -> Option<Range> {
        let row = line.checked_sub(1)?;
        let text = self.line(row)?;
        let start_column = match column {
            Some(column) => column.saturating_sub(1),
            None => text.len() - text.trim_start().len(),
        };
        if start_column > text.len() {
            return None;
        }
        Some(Range::new(
            Position::new(row, start_column),
            Position::new(row, text.len()),
        ))
    }
}

#[derive(Debug)]
struct BufferState {
    text: String,
    path: Option<PathBuf>,
    scope_name: String,
    modified: bool,
}

/// Shared in-memory buffer. Clones refer to the same buffer.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    state: Arc<RwLock<BufferState>>,
}

impl TextBuffer {
    /// A buffer in its saved state.
    #[must_use]
    pub fn new(path: Option<PathBuf>, scope_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(BufferState {
                text: text.into(),
                path,
                scope_name: scope_name.into(),
                modified: false,
            })),
        }
    }

    /// Open a file from disk, picking the scope from its extension.
    pub fn open(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::new(Some(path.to_path_buf()), scope_for_path(path), text))
    }

    fn read(&self) -> RwLockReadGuard<'_, BufferState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BufferState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the contents, as typing would. Marks the buffer modified.
    pub fn set_text(&self, text: impl Into<String>) {
        let mut state = self.write();
        state.text = text.into();
        state.modified = true;
    }

    /// Mark the current contents as saved.
    pub fn save(&self) {
        self.write().modified = false;
    }

    pub fn set_path(&self, path: PathBuf) {
        self.write().path = Some(path);
    }
}

impl Document for TextBuffer {
    fn text(&self) -> String {
        self.read().text.clone()
    }

    fn path(&self) -> Option<PathBuf> {
        self.read().path.clone()
    }

    fn is_modified(&self) -> bool {
        self.read().modified
    }

    fn scope_name(&self) -> String {
        self.read().scope_name.clone()
    }
}

/// Grammar scope for a file name.
#[must_use]
pub fn scope_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("jsx") => "source.js.jsx",
        Some("html" | "htm") => "text.html.basic",
        Some("ts") => "source.ts",
        Some("tsx") => "source.tsx",
        _ => "source.js",
    }
}
