//! A single text buffer and the flags that govern it.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use chrono::{DateTime, Local};
use ropey::Rope;

use crate::syntax::Syntax;

/// Handle to a buffer owned by the buffer manager.
///
/// The generation changes every time a slot is reused, so a handle kept
/// across `remove_buffer` resolves to nothing instead of a newer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId {
    index: u32,
    generation: u32,
}

impl BufferId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({}v{})", self.index, self.generation)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        const READ_ONLY = 1 << 0;
        const LOCKED = 1 << 1;
        /// Placeholder buffer created so a window has something to show.
        const DEFAULT_BUFFER = 1 << 2;
        const DISABLE_SYNTAX = 1 << 3;
        /// The backing file exists but could not be read.
        const FILE_ERROR = 1 << 4;
        /// The file changed on disk while the buffer had unsaved edits.
        const EXTERNALLY_MODIFIED = 1 << 5;
        /// Loaded text had CRLF line endings; they are restored on save.
        const STRIPPED_CR = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferType {
    #[default]
    Normal,
    Repl,
    Search,
    DataGrid,
    Listing,
}

pub struct Buffer {
    id: BufferId,
    name: String,
    path: Option<PathBuf>,
    buffer_type: BufferType,
    flags: BufferFlags,
    text: Rope,
    dirty: bool,
    version: u64,
    syntax_tag: Option<String>,
    syntax: Option<Box<dyn Syntax>>,
    syntax_generation: u64,
    focus_stamp: u64,
    last_saved: Option<DateTime<Local>>,
}

impl Buffer {
    pub fn new(id: BufferId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: None,
            buffer_type: BufferType::Normal,
            flags: BufferFlags::empty(),
            text: Rope::new(),
            dirty: false,
            version: 0,
            syntax_tag: None,
            syntax: None,
            syntax_generation: 0,
            focus_stamp: 0,
            last_saved: None,
        }
    }

    pub fn for_path(id: BufferId, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        let mut buffer = Self::new(id, name);
        buffer.path = Some(path);
        buffer
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.name = name.to_string();
        }
        self.path = Some(path);
    }

    /// Key used to look up a syntax provider: the explicit tag for in-memory
    /// buffers, otherwise the file name.
    pub fn file_type_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(tag) = &self.syntax_tag {
            keys.push(tag.to_lowercase());
        }
        let file_name = self
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
            .to_lowercase();
        if let Some((_, ext)) = file_name.rsplit_once('.') {
            keys.push(file_name.clone());
            keys.push(ext.to_string());
        } else {
            keys.push(file_name);
        }
        keys
    }

    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    pub fn set_buffer_type(&mut self, buffer_type: BufferType) {
        self.buffer_type = buffer_type;
    }

    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: BufferFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flags(&mut self, flags: BufferFlags, on: bool) {
        self.flags.set(flags, on);
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn contents(&self) -> String {
        self.text.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bumped on every content change; background results carry the version
    /// they were computed from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_editable(&self) -> bool {
        !self.flags.intersects(BufferFlags::READ_ONLY | BufferFlags::LOCKED)
    }

    pub fn syntax_tag(&self) -> Option<&str> {
        self.syntax_tag.as_deref()
    }

    pub fn set_syntax_tag(&mut self, tag: Option<String>) {
        self.syntax_tag = tag;
    }

    pub fn syntax(&self) -> Option<&dyn Syntax> {
        self.syntax.as_deref()
    }

    pub fn syntax_mut(&mut self) -> Option<&mut (dyn Syntax + 'static)> {
        self.syntax.as_deref_mut()
    }

    pub fn set_syntax(&mut self, syntax: Option<Box<dyn Syntax>>) {
        self.syntax = syntax;
        self.syntax_generation += 1;
    }

    /// Bumped whenever the highlighter is replaced.
    pub fn syntax_generation(&self) -> u64 {
        self.syntax_generation
    }

    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    pub(crate) fn focus_stamp(&self) -> u64 {
        self.focus_stamp
    }

    pub(crate) fn set_focus_stamp(&mut self, stamp: u64) {
        self.focus_stamp = stamp;
    }

    /// Replaces the content with text read from storage. Leaves the buffer clean.
    pub fn load_text(&mut self, text: &str) {
        let stripped = text.contains("\r\n");
        if stripped {
            self.text = Rope::from_str(&text.replace("\r\n", "\n"));
        } else {
            self.text = Rope::from_str(text);
        }
        self.flags.set(BufferFlags::STRIPPED_CR, stripped);
        self.dirty = false;
        self.version += 1;
    }

    /// Text as it should be written back to storage.
    pub fn serialized_text(&self) -> String {
        let text = self.text.to_string();
        if self.has_flag(BufferFlags::STRIPPED_CR) {
            text.replace('\n', "\r\n")
        } else {
            text
        }
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
        self.flags.remove(BufferFlags::EXTERNALLY_MODIFIED);
        self.last_saved = Some(Local::now());
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.version += 1;
    }

    /// Inserts at `char_idx` (clamped to the end). Returns false when the
    /// buffer refuses edits or `text` is empty.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> bool {
        if !self.is_editable() || text.is_empty() {
            return false;
        }
        let at = char_idx.min(self.text.len_chars());
        self.text.insert(at, text);
        self.touch();
        true
    }

    /// Removes a char range (clamped). Returns the removed text.
    pub fn remove(&mut self, range: Range<usize>) -> Option<String> {
        let len = self.text.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len);
        if !self.is_editable() || start >= end {
            return None;
        }
        let removed = self.text.slice(start..end).to_string();
        self.text.remove(start..end);
        self.touch();
        Some(removed)
    }

    /// Replaces the whole content as an edit (marks the buffer dirty).
    pub fn set_text(&mut self, text: &str) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.text = Rope::from_str(text);
        self.touch();
        true
    }

    /// Char range of the line holding `char_idx`, including its line break.
    pub fn line_range(&self, char_idx: usize) -> Range<usize> {
        let len = self.text.len_chars();
        let line = self.text.char_to_line(char_idx.min(len));
        let start = self.text.line_to_char(line);
        let end = start + self.text.line(line).len_chars();
        start..end
    }
}
