//! The editor kernel: owns every buffer, tab, mode, and service, and keeps
//! them consistent across opening, editing, and closing.
//!
//! Embedders drive it from one thread: feed input through `handle_key` and
//! the mouse handlers, call `display()` at the top of each frame, and paint
//! when `refresh_required()` says so.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use bitflags::bitflags;
use crossterm::event::KeyEvent;
use serde_json::Value;

use crate::buffer::{Buffer, BufferFlags, BufferId, BufferType};
use crate::buffer_manager::BufferManager;
use crate::clipboard::Clipboard;
use crate::config::{self, EditorConfig};
use crate::display::{Display, FixedDisplay};
use crate::file_system::{DiskFileSystem, FileSystem};
use crate::layout::{Rect, SplitDirection, Vec2};
use crate::message::{BufferEvent, ComponentId, ComponentRef, Message, MessageBus, MouseButton, Msg};
use crate::mode::{Mode, ModeContext, ModeRegistry};
use crate::refresh::{blink_phase, RefreshCause, RefreshGate, Timer};
use crate::registers::{Register, RegisterName, Registers, DEFAULT_REGISTER};
use crate::search_mode::{SearchMode, SEARCH_MODE};
use crate::standard_mode::{StandardMode, STANDARD_MODE};
use crate::syntax::{Highlights, SyntaxProvider, SyntaxRegistry};
use crate::task_pool::{Completed, Stamp, TaskPool, DEFAULT_WORKERS};
use crate::vim_mode::VimMode;
use crate::window_manager::{TabId, TabRemoval, TabWindow, Window, WindowId, WindowManager};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EditorFlags: u32 {
        /// Run background jobs inline on the calling thread.
        const DISABLE_THREADS = 1 << 0;
    }
}

pub const DEFAULT_BUFFER_NAME: &str = "[Default]";
pub const REPL_SPLIT_RATIO: f32 = 0.7;
pub const SEARCH_SPLIT_RATIO: f32 = 0.6;
pub const ORCA_WIDTH: usize = 60;
pub const ORCA_HEIGHT: usize = 20;

/// Registers that mirror the system clipboard.
const CLIPBOARD_REGISTERS: [char; 3] = [DEFAULT_REGISTER, '*', '+'];

pub struct EditorBuilder {
    root: PathBuf,
    flags: EditorFlags,
    file_system: Option<Box<dyn FileSystem>>,
    display: Option<Box<dyn Display>>,
    clipboard: Option<Box<dyn Clipboard>>,
    workers: usize,
    config_path: Option<PathBuf>,
}

impl EditorBuilder {
    /// `root` is where the config file is looked for last and where relative
    /// listings start.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            flags: EditorFlags::empty(),
            file_system: None,
            display: None,
            clipboard: None,
            workers: DEFAULT_WORKERS,
            config_path: None,
        }
    }

    pub fn flags(mut self, flags: EditorFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn file_system(mut self, file_system: impl FileSystem + 'static) -> Self {
        self.file_system = Some(Box::new(file_system));
        self
    }

    pub fn display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Some(Box::new(clipboard));
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn build(self) -> Editor {
        let file_system = self
            .file_system
            .unwrap_or_else(|| Box::new(DiskFileSystem::new()));
        let config_path = self
            .config_path
            .unwrap_or_else(|| config::config_path(&self.root));
        let config = EditorConfig::load(file_system.as_ref(), &config_path);

        let threaded = !self.flags.contains(EditorFlags::DISABLE_THREADS);
        let tasks = TaskPool::new(threaded, self.workers);

        let mut modes = ModeRegistry::new(Box::new(VimMode::new()));
        modes.register(Box::new(StandardMode::new()), None);
        modes.register(Box::new(SearchMode::new()), None);

        let syntax = SyntaxRegistry::with_defaults(&config.syntax_theme);
        log::info!(
            "Editor initialised (threads: {}, syntax keys: {})",
            tasks.is_threaded(),
            syntax.len()
        );

        let mut editor = Editor {
            root: self.root,
            flags: self.flags,
            bus: MessageBus::new(),
            buffers: BufferManager::new(),
            windows: WindowManager::new(),
            modes,
            syntax,
            registers: Registers::new(),
            tasks,
            refresh: RefreshGate::new(),
            cursor_timer: Timer::new(),
            last_edit_timer: Timer::new(),
            config,
            config_path,
            file_system,
            display: self
                .display
                .unwrap_or_else(|| Box::new(FixedDisplay::default())),
            clipboard: self.clipboard,
            command_text: String::new(),
            display_region: Rect::default(),
            tab_region: Rect::default(),
            tab_content_region: Rect::default(),
            command_region: Rect::default(),
            tab_rects: Vec::new(),
            mouse_pos: Vec2::default(),
            pixel_scale: None,
            quit: false,
        };
        editor.update_size();
        editor
    }
}

pub struct Editor {
    root: PathBuf,
    flags: EditorFlags,
    bus: MessageBus,
    buffers: BufferManager,
    windows: WindowManager,
    modes: ModeRegistry,
    syntax: SyntaxRegistry,
    registers: Registers,
    tasks: TaskPool<Highlights>,
    refresh: RefreshGate,
    cursor_timer: Timer,
    last_edit_timer: Timer,
    config: EditorConfig,
    config_path: PathBuf,
    file_system: Box<dyn FileSystem>,
    display: Box<dyn Display>,
    clipboard: Option<Box<dyn Clipboard>>,
    command_text: String,
    display_region: Rect,
    tab_region: Rect,
    tab_content_region: Rect,
    command_region: Rect,
    tab_rects: Vec<(TabId, Rect)>,
    mouse_pos: Vec2,
    pixel_scale: Option<f32>,
    quit: bool,
}

impl Editor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        EditorBuilder::new(root).build()
    }

    pub fn builder(root: impl Into<PathBuf>) -> EditorBuilder {
        EditorBuilder::new(root)
    }

    pub fn flags(&self) -> EditorFlags {
        self.flags
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.file_system.as_ref()
    }

    // ---- Buffers ----

    fn create_buffer(
        &mut self,
        name: &str,
        path: Option<PathBuf>,
        flags: BufferFlags,
        buffer_type: BufferType,
        text: Option<&str>,
    ) -> BufferId {
        let id = self.buffers.insert(|id| {
            let mut buffer = match path {
                Some(path) => Buffer::for_path(id, path),
                None => Buffer::new(id, name),
            };
            buffer.set_buffer_type(buffer_type);
            buffer.set_flags(flags, true);
            if let Some(text) = text {
                buffer.load_text(text);
            }
            buffer
        });

        if let Some(buffer) = self.buffers.get_mut(id) {
            self.syntax.assign(buffer);
            log::info!(
                "Created buffer {} '{}' (syntax: {})",
                id,
                buffer.name(),
                buffer.syntax().map(|s| s.syntax_id()).unwrap_or("none")
            );
        }
        self.broadcast(&mut Message::buffer(id, BufferEvent::Loaded));
        self.schedule_syntax(id);
        self.request_refresh();
        id
    }

    fn open_file_buffer(&mut self, path: PathBuf, flags: BufferFlags) -> BufferId {
        let mut flags = flags;
        let mut text = None;
        if self.file_system.exists(&path) {
            match self.file_system.read(&path) {
                Ok(content) => text = Some(content),
                Err(e) => {
                    log::error!("Failed to load {}: {}", path.display(), e);
                    flags |= BufferFlags::FILE_ERROR;
                }
            }
        }
        self.create_buffer("", Some(path), flags, BufferType::Normal, text.as_deref())
    }

    /// Returns the buffer for `path`, loading it on first request. An existing
    /// buffer is returned as is; `flags` only apply to a new one.
    pub fn get_file_buffer(&mut self, path: impl AsRef<Path>, flags: BufferFlags, create: bool) -> Option<BufferId> {
        let path = self.file_system.canonicalize(path.as_ref());
        if let Some(id) = self.buffers.find_by_path(&path) {
            return Some(id);
        }
        if !create {
            return None;
        }
        Some(self.open_file_buffer(path, flags))
    }

    /// Always creates a new in-memory buffer.
    pub fn get_empty_buffer(&mut self, name: &str, flags: BufferFlags) -> BufferId {
        self.create_buffer(name, None, flags, BufferType::Normal, None)
    }

    /// Removes the buffer, closing every window that shows it. Tabs left
    /// without windows are removed too.
    pub fn remove_buffer(&mut self, id: BufferId) -> bool {
        if !self.buffers.contains(id) {
            return false;
        }
        for window in self.windows.find_buffer_windows(id) {
            self.close_window(window);
        }
        let Some(buffer) = self.buffers.remove(id) else {
            return false;
        };
        log::info!("Removed buffer {} '{}'", id, buffer.name());
        self.broadcast(&mut Message::buffer(id, BufferEvent::Removed));
        self.request_refresh();
        true
    }

    pub fn get_mru_buffer(&self) -> Option<BufferId> {
        self.buffers.mru()
    }

    pub fn find_buffer_windows(&self, id: BufferId) -> Vec<WindowId> {
        self.windows.find_buffer_windows(id)
    }

    /// Buffers in creation order.
    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> + '_ {
        self.buffers.iter()
    }

    pub fn buffer_ids(&self) -> Vec<BufferId> {
        self.buffers.ids()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    /// Direct access for flags and metadata. Content edits should go through
    /// `edit_buffer` so highlighting follows.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(id)
    }

    /// Runs `edit` against the buffer; a content change restarts the
    /// last-edit timer and reschedules highlighting.
    pub fn edit_buffer<R>(&mut self, id: BufferId, edit: impl FnOnce(&mut Buffer) -> R) -> Option<R> {
        let buffer = self.buffers.get_mut(id)?;
        let before = buffer.version();
        let out = edit(buffer);
        if buffer.version() != before {
            self.reset_last_edit_timer();
            self.schedule_syntax(id);
            self.request_refresh();
        }
        Some(out)
    }

    /// Writes the buffer to its path. A buffer flagged `FILE_ERROR` is only
    /// written once its content has been edited.
    pub fn save_buffer(&mut self, id: BufferId) -> Result<()> {
        let buffer = self
            .buffers
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown buffer: {}", id))?;
        if buffer.has_flag(BufferFlags::READ_ONLY) {
            return Err(anyhow::anyhow!("Buffer is read-only: {}", buffer.name()));
        }
        // The empty text of a failed load must never replace the file.
        if buffer.has_flag(BufferFlags::FILE_ERROR) && !buffer.is_dirty() {
            return Err(anyhow::anyhow!("Buffer was not loaded from disk: {}", buffer.name()));
        }
        let path = buffer
            .path()
            .ok_or_else(|| anyhow::anyhow!("No file path set for buffer: {}", buffer.name()))?
            .to_path_buf();
        let text = buffer.serialized_text();

        if let Err(e) = self.file_system.write(&path, &text) {
            log::error!("Failed to save {}: {}", path.display(), e);
            return Err(e);
        }

        if let Some(buffer) = self.buffers.get_mut(id) {
            buffer.mark_saved();
            buffer.set_flags(BufferFlags::FILE_ERROR, false);
        }
        log::info!("Successfully saved file: {}", path.display());
        self.broadcast(&mut Message::buffer(id, BufferEvent::Saved));
        self.request_refresh();
        Ok(())
    }

    /// Hook for file watchers: reloads a clean buffer, flags a dirty one.
    pub fn on_file_changed(&mut self, path: impl AsRef<Path>) {
        let path = self.file_system.canonicalize(path.as_ref());
        let Some(id) = self.buffers.find_by_path(&path) else {
            return;
        };
        let dirty = self.buffers.get(id).is_some_and(Buffer::is_dirty);
        if dirty {
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.set_flags(BufferFlags::EXTERNALLY_MODIFIED, true);
            }
            log::warn!("{} changed on disk while modified", path.display());
            self.broadcast(&mut Message::buffer(id, BufferEvent::ExternallyModified));
        } else {
            let content = match self.file_system.read(&path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Failed to reload {}: {}", path.display(), e);
                    return;
                }
            };
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.load_text(&content);
                buffer.set_flags(BufferFlags::FILE_ERROR | BufferFlags::EXTERNALLY_MODIFIED, false);
            }
            log::info!("Reloaded {}", path.display());
            self.schedule_syntax(id);
            self.broadcast(&mut Message::buffer(id, BufferEvent::Reloaded));
        }
        self.request_refresh();
    }

    /// Moves a buffer to another path. Fails if another buffer owns it.
    pub fn set_buffer_path(&mut self, id: BufferId, path: impl AsRef<Path>) -> bool {
        let path = self.file_system.canonicalize(path.as_ref());
        if !self.buffers.rekey_path(id, path) {
            return false;
        }
        self.set_buffer_syntax(id)
    }

    // ---- Syntax ----

    pub fn register_syntax_factory<I, S>(&mut self, keys: I, provider: SyntaxProvider)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.syntax.register(keys, provider);
    }

    pub fn syntax_registry(&self) -> &SyntaxRegistry {
        &self.syntax
    }

    /// Re-resolves the highlighter of `id`. Returns false for unknown ids.
    pub fn set_buffer_syntax(&mut self, id: BufferId) -> bool {
        let Some(buffer) = self.buffers.get_mut(id) else {
            return false;
        };
        self.syntax.assign(buffer);
        self.schedule_syntax(id);
        self.request_refresh();
        true
    }

    fn schedule_syntax(&mut self, id: BufferId) {
        let Some(buffer) = self.buffers.get(id) else {
            return;
        };
        let Some(syntax) = buffer.syntax() else {
            return;
        };
        let analyzer = syntax.analyzer();
        let text = buffer.text().clone();
        let stamp = Stamp {
            target: id,
            version: buffer.version(),
            generation: buffer.syntax_generation(),
        };
        if let Some(done) = self.tasks.submit(stamp, move || analyzer.analyze(&text)) {
            self.apply_syntax_result(done);
        }
    }

    /// Merges one analysis result; results for removed buffers, older
    /// content, or a replaced highlighter are dropped.
    fn apply_syntax_result(&mut self, done: Completed<Highlights>) -> bool {
        let stamp = done.stamp;
        let Some(buffer) = self.buffers.get_mut(stamp.target) else {
            log::debug!("Discarding highlights for removed {}", stamp.target);
            return false;
        };
        if buffer.version() != stamp.version {
            log::debug!(
                "Discarding stale highlights for {} (v{} != v{})",
                stamp.target,
                stamp.version,
                buffer.version()
            );
            return false;
        }
        if buffer.syntax_generation() != stamp.generation {
            log::debug!("Discarding highlights from a replaced highlighter for {}", stamp.target);
            return false;
        }
        match buffer.syntax_mut() {
            Some(syntax) => {
                syntax.apply(done.output, stamp.version);
                true
            }
            None => false,
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }

    /// Per-frame entry point: merges finished background work and lays the
    /// regions out again.
    pub fn display(&mut self) {
        let mut merged = false;
        for done in self.tasks.drain() {
            merged |= self.apply_syntax_result(done);
        }
        if merged {
            self.request_refresh();
        }
        self.update_size();
    }

    // ---- Modes ----

    /// Adds or replaces a mode by name.
    pub fn register_global_mode(&mut self, mode: Box<dyn Mode>) {
        let window = self.windows.active_window_id();
        self.modes.register(mode, window);
    }

    /// Unknown names leave the current mode active and return false.
    pub fn set_global_mode(&mut self, name: &str) -> bool {
        let window = self.windows.active_window_id();
        let switched = self.modes.set_global(name, window);
        if switched {
            self.request_refresh();
        }
        switched
    }

    pub fn global_mode(&self) -> &dyn Mode {
        self.modes.global()
    }

    pub fn set_secondary_mode(&mut self, name: &str) -> bool {
        let window = self.windows.active_window_id();
        self.modes.set_secondary(name, window)
    }

    pub fn clear_secondary_mode(&mut self) {
        self.modes.clear_secondary();
    }

    pub fn secondary_mode(&self) -> Option<&dyn Mode> {
        self.modes.secondary()
    }

    pub fn modes(&self) -> &ModeRegistry {
        &self.modes
    }

    /// Name of the mode that would receive the next key.
    pub fn current_mode_name(&self) -> String {
        let fixed = self.windows.active_window().and_then(Window::fixed_mode);
        self.modes.route(fixed)
    }

    /// Routes a key to the secondary mode, else the active window's fixed
    /// mode, else the global mode. Returns whether it was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.reset_cursor_timer();
        self.ensure_tab();

        let Some(window_id) = self.windows.active_window_id() else {
            return false;
        };
        let Some(window) = self.windows.window(window_id) else {
            return false;
        };
        let buffer_id = window.buffer();
        let mut cursor = window.cursor();
        let mode_name = self.modes.route(window.fixed_mode());

        let Some(buffer) = self.buffers.get_mut(buffer_id) else {
            return false;
        };
        let Some(mode) = self.modes.get_mut(&mode_name) else {
            return false;
        };
        let (handled, edited, command) = {
            let mut ctx = ModeContext::new(
                Some(window_id),
                buffer,
                &mut cursor,
                &mut self.registers,
                &mut self.command_text,
            );
            let handled = mode.handle_key(&mut ctx, key);
            (handled, ctx.edited(), ctx.take_command())
        };
        log::debug!("{:?} -> '{}' (handled: {})", key.code, mode_name, handled);

        if let Some(window) = self.windows.window_mut(window_id) {
            window.set_cursor(cursor);
        }
        if edited {
            self.reset_last_edit_timer();
            self.schedule_syntax(buffer_id);
        }
        if handled || edited {
            self.request_refresh();
        }
        if let Some(command) = command {
            self.execute_command(&command);
        }
        handled
    }

    /// Broadcasts `command`; if no component handles it, runs the built-in
    /// command of that name.
    pub fn execute_command(&mut self, command: &str) -> bool {
        let mut message = Message::with_text(Msg::HandleCommand, command);
        if self.broadcast(&mut message) {
            return true;
        }
        self.run_builtin_command(command)
    }

    fn run_builtin_command(&mut self, command: &str) -> bool {
        let command = command.trim();
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "w" => self.write_active_buffer(),
            "q" | "q!" => {
                self.quit_window();
                true
            }
            "wq" | "x" => {
                if self.write_active_buffer() {
                    self.quit_window();
                }
                true
            }
            "e" | "edit" if !arg.is_empty() => {
                self.init_with_file_or_dir(arg);
                true
            }
            "tabnew" => {
                self.add_tab_window();
                true
            }
            "tabnext" | "tabn" => self.next_tab_window().is_some(),
            "tabprevious" | "tabp" => self.previous_tab_window().is_some(),
            "tabclose" => match self.windows.active_tab_id() {
                Some(tab) => self.remove_tab_window(tab),
                None => false,
            },
            "split" | "sp" => self.split_active_buffer(SplitDirection::Horizontal),
            "vsplit" | "vs" => self.split_active_buffer(SplitDirection::Vertical),
            "close" => match self.windows.active_window_id() {
                Some(window) => self.close_window(window),
                None => false,
            },
            "search" => self.search(arg),
            "repl" => self.add_repl().is_some(),
            "orca" => {
                self.add_orca();
                true
            }
            _ => {
                log::debug!("Unhandled command: {}", command);
                self.set_command_text(format!("Not an editor command: {}", name));
                false
            }
        }
    }

    fn write_active_buffer(&mut self) -> bool {
        let Some(id) = self.windows.active_window().map(Window::buffer) else {
            return false;
        };
        match self.save_buffer(id) {
            Ok(()) => {
                let name = self.buffers.get(id).map(|b| b.name().to_string()).unwrap_or_default();
                self.set_command_text(format!("\"{}\" written", name));
                true
            }
            Err(e) => {
                self.set_command_text(e.to_string());
                false
            }
        }
    }

    /// Closes the active window, or asks to quit when it is the last one.
    fn quit_window(&mut self) {
        let last = self.windows.len() <= 1
            && self.windows.active_tab().map_or(true, |t| t.windows().len() <= 1);
        match self.windows.active_window_id() {
            Some(window) if !last => {
                self.close_window(window);
            }
            _ => self.request_quit(),
        }
    }

    fn split_active_buffer(&mut self, direction: SplitDirection) -> bool {
        match self.windows.active_window().map(Window::buffer) {
            Some(buffer) => self.split_window(direction, buffer).is_some(),
            None => false,
        }
    }

    /// Moves the cursor of the first other window in the active tab to the
    /// next occurrence of `query`, wrapping at the end of its buffer.
    pub fn search(&mut self, query: &str) -> bool {
        if query.is_empty() {
            return false;
        }
        let Some(tab) = self.windows.active_tab() else {
            return false;
        };
        let active = tab.active_window();
        let target = tab.windows().into_iter().find(|w| {
            w.id() != active
                && self
                    .buffers
                    .get(w.buffer())
                    .is_some_and(|b| b.buffer_type() != BufferType::Search)
        });
        let Some((window_id, buffer_id, cursor)) = target.map(|w| (w.id(), w.buffer(), w.cursor())) else {
            return false;
        };
        let Some(buffer) = self.buffers.get(buffer_id) else {
            return false;
        };

        let text = buffer.text();
        let haystack = text.to_string();
        let start = text.char_to_byte((cursor + 1).min(text.len_chars()));
        let found = haystack[start..]
            .find(query)
            .map(|at| at + start)
            .or_else(|| haystack[..start].find(query));

        match found {
            Some(byte) => {
                let char_idx = text.byte_to_char(byte);
                if let Some(window) = self.windows.window_mut(window_id) {
                    window.set_cursor(char_idx);
                }
                self.request_refresh();
                true
            }
            None => {
                self.set_command_text(format!("Pattern not found: {}", query));
                false
            }
        }
    }

    // ---- Tabs and windows ----

    /// Returns the active tab, creating one when there is none.
    pub fn ensure_tab(&mut self) -> TabId {
        match self.windows.active_tab_id() {
            Some(tab) => tab,
            None => self.add_tab_window(),
        }
    }

    /// Opens a tab on the MRU buffer (or a fresh default buffer) and makes
    /// it active.
    pub fn add_tab_window(&mut self) -> TabId {
        let buffer = match self.buffers.mru() {
            Some(id) => id,
            None => self.get_empty_buffer(DEFAULT_BUFFER_NAME, BufferFlags::DEFAULT_BUFFER),
        };
        let tab = self.windows.add_tab(buffer);
        self.buffers.touch(buffer);
        self.layout_changed();
        tab
    }

    /// Removes `tab`; the previous tab (else the next) becomes active.
    pub fn remove_tab_window(&mut self, tab: TabId) -> bool {
        if !self.windows.remove_tab(tab) {
            return false;
        }
        self.focus_active_window();
        self.layout_changed();
        true
    }

    pub fn next_tab_window(&mut self) -> Option<TabId> {
        let tab = self.windows.next_tab()?;
        self.focus_active_window();
        self.request_refresh();
        Some(tab)
    }

    pub fn previous_tab_window(&mut self) -> Option<TabId> {
        let tab = self.windows.previous_tab()?;
        self.focus_active_window();
        self.request_refresh();
        Some(tab)
    }

    pub fn set_current_tab_window(&mut self, tab: TabId) -> bool {
        if !self.windows.set_active_tab(tab) {
            return false;
        }
        self.focus_active_window();
        self.request_refresh();
        true
    }

    pub fn active_tab_window(&self) -> Option<&TabWindow> {
        self.windows.active_tab()
    }

    pub fn tab_windows(&self) -> &[TabWindow] {
        self.windows.tabs()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.window(id)
    }

    pub fn active_window(&self) -> Option<&Window> {
        self.windows.active_window()
    }

    /// Splits the active window and shows `buffer` in the new one, which
    /// takes focus.
    pub fn split_window(&mut self, direction: SplitDirection, buffer: BufferId) -> Option<WindowId> {
        if !self.buffers.contains(buffer) {
            return None;
        }
        self.ensure_tab();
        let window = Window::new(self.windows.new_window_id(), buffer);
        self.split_active(window, direction, 0.5)
    }

    fn split_active(&mut self, window: Window, direction: SplitDirection, ratio: f32) -> Option<WindowId> {
        let id = window.id();
        let buffer = window.buffer();
        let tab = self.windows.active_tab_mut()?;
        let target = tab.active_window();
        if !tab.split(target, window, direction, ratio) {
            return None;
        }
        tab.set_active_window(id);
        self.buffers.touch(buffer);
        self.layout_changed();
        Some(id)
    }

    /// Closes one window. Closing the last window of a tab removes the tab.
    pub fn close_window(&mut self, window: WindowId) -> bool {
        let Some(tab_id) = self.windows.tab_of_window(window) else {
            return false;
        };
        let Some(tab) = self.windows.tab_mut(tab_id) else {
            return false;
        };
        match tab.remove_window(window) {
            TabRemoval::Removed => {
                if self.windows.active_tab_id() == Some(tab_id) {
                    self.focus_active_window();
                }
                self.layout_changed();
                true
            }
            TabRemoval::LastWindow => self.remove_tab_window(tab_id),
            TabRemoval::NotFound => false,
        }
    }

    /// Focuses `window` and the tab that holds it.
    pub fn set_current_window(&mut self, window: WindowId) -> bool {
        let Some(tab_id) = self.windows.tab_of_window(window) else {
            return false;
        };
        self.windows.set_active_tab(tab_id);
        if let Some(tab) = self.windows.tab_mut(tab_id) {
            tab.set_active_window(window);
        }
        self.focus_active_window();
        self.request_refresh();
        true
    }

    fn focus_active_window(&mut self) {
        if let Some(buffer) = self.windows.active_window().map(Window::buffer) {
            self.buffers.touch(buffer);
        }
    }

    /// Shows `buffer` in the active window. A placeholder buffer that is no
    /// longer visible anywhere is dropped.
    fn show_in_active_window(&mut self, buffer: BufferId) {
        self.ensure_tab();
        let Some(window) = self.windows.active_window_mut() else {
            return;
        };
        let previous = window.buffer();
        if previous != buffer {
            window.set_buffer(buffer);
        }
        self.buffers.touch(buffer);

        let unused_placeholder = previous != buffer
            && self.windows.find_buffer_windows(previous).is_empty()
            && self.buffers.get(previous).is_some_and(|b| {
                b.has_flag(BufferFlags::DEFAULT_BUFFER) && !b.is_dirty() && b.len_chars() == 0
            });
        if unused_placeholder {
            self.remove_buffer(previous);
        }
        self.request_refresh();
    }

    fn special_buffer(&mut self, name: &str, buffer_type: BufferType, text: Option<&str>) -> BufferId {
        self.create_buffer(name, None, BufferFlags::empty(), buffer_type, text)
    }

    /// Opens a REPL buffer in a split below the active window.
    pub fn add_repl(&mut self) -> Option<WindowId> {
        let buffer = self.special_buffer("[Repl]", BufferType::Repl, None);
        self.ensure_tab();
        let window = Window::new(self.windows.new_window_id(), buffer).with_fixed_mode(STANDARD_MODE);
        self.split_active(window, SplitDirection::Horizontal, REPL_SPLIT_RATIO)
    }

    /// Opens a search query buffer in a split below the active window.
    pub fn add_search(&mut self) -> Option<WindowId> {
        let buffer = self.special_buffer("[Search]", BufferType::Search, None);
        self.ensure_tab();
        let window = Window::new(self.windows.new_window_id(), buffer).with_fixed_mode(SEARCH_MODE);
        self.split_active(window, SplitDirection::Horizontal, SEARCH_SPLIT_RATIO)
    }

    /// Opens a grid buffer in a new tab.
    pub fn add_orca(&mut self) -> TabId {
        let row = ".".repeat(ORCA_WIDTH);
        let grid = vec![row; ORCA_HEIGHT].join("\n");
        let buffer = self.special_buffer("[Orca]", BufferType::DataGrid, Some(&grid));
        let window = Window::new(self.windows.new_window_id(), buffer).with_fixed_mode(STANDARD_MODE);
        let tab = self.windows.add_tab_with(window);
        self.buffers.touch(buffer);
        self.layout_changed();
        tab
    }

    // ---- Startup entry points ----

    /// Opens a file, or a read-only listing when `path` is a directory, in
    /// the active window.
    pub fn init_with_file_or_dir(&mut self, path: impl AsRef<Path>) -> BufferId {
        let path = self.file_system.canonicalize(path.as_ref());
        let id = if self.file_system.is_dir(&path) {
            self.root = path.clone();
            self.directory_listing(&path)
        } else {
            self.get_file_buffer(&path, BufferFlags::empty(), true)
                .unwrap_or_else(|| self.open_file_buffer(path.clone(), BufferFlags::empty()))
        };
        self.show_in_active_window(id);
        id
    }

    fn directory_listing(&mut self, dir: &Path) -> BufferId {
        let (listing, flags) = match self.file_system.list_dir(dir) {
            Ok(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| {
                        let name = entry.file_name()?.to_str()?;
                        Some(if self.file_system.is_dir(entry) {
                            format!("{}/", name)
                        } else {
                            name.to_string()
                        })
                    })
                    .collect();
                (lines.join("\n"), BufferFlags::READ_ONLY)
            }
            Err(e) => {
                log::error!("{}", e);
                (String::new(), BufferFlags::READ_ONLY | BufferFlags::FILE_ERROR)
            }
        };
        let name = format!("{}/", dir.display());
        self.create_buffer(&name, None, flags, BufferType::Listing, Some(&listing))
    }

    /// Opens an in-memory buffer holding `text` in the active window.
    pub fn init_with_text(&mut self, name: &str, text: &str) -> BufferId {
        let id = self.create_buffer(name, None, BufferFlags::empty(), BufferType::Normal, Some(text));
        self.show_in_active_window(id);
        id
    }

    // ---- Layout ----

    /// Converts logical units to display units.
    pub fn dpi(&self, value: f32) -> f32 {
        value * self.pixel_scale()
    }

    pub fn pixel_scale(&self) -> f32 {
        self.pixel_scale.unwrap_or_else(|| self.display.pixel_scale())
    }

    pub fn set_pixel_scale(&mut self, scale: f32) {
        self.pixel_scale = (scale.is_finite() && scale > 0.0).then_some(scale);
        self.layout_changed();
    }

    pub fn set_display_region(&mut self, top_left: Vec2, bottom_right: Vec2) {
        self.display_region = Rect::new(top_left, bottom_right);
        self.layout_changed();
    }

    /// Recomputes the tab bar, the command region, and every window rect
    /// from the display region.
    pub fn update_size(&mut self) {
        let area = self.display_region;
        let border = self.dpi(self.display.text_border());
        let line_height = self.display.line_height();

        let (tab_bar, rest) = area.split_top(line_height + border * 2.0);
        let hidden = self.config.auto_hide_command_region && self.command_text.is_empty();
        let command_height = if hidden {
            0.0
        } else {
            self.command_lines().len() as f32 * line_height + border * 2.0
        };
        let (content, command) = rest.split_bottom(command_height);

        self.tab_region = tab_bar;
        self.tab_content_region = content;
        self.command_region = command;
        for tab in self.windows.tabs_mut() {
            tab.layout(content);
        }
        let ids: Vec<TabId> = self.windows.tabs().iter().map(TabWindow::id).collect();
        self.tab_rects = ids.into_iter().zip(tab_bar.columns(self.windows.len())).collect();
    }

    fn layout_changed(&mut self) {
        self.update_size();
        self.request_refresh();
    }

    pub fn editor_region(&self) -> Rect {
        self.display_region
    }

    pub fn tab_region(&self) -> Rect {
        self.tab_region
    }

    pub fn tab_content_region(&self) -> Rect {
        self.tab_content_region
    }

    pub fn command_region(&self) -> Rect {
        self.command_region
    }

    /// Header rectangle of every tab, in tab order.
    pub fn tab_rects(&self) -> &[(TabId, Rect)] {
        &self.tab_rects
    }

    // ---- Messages ----

    pub fn register_callback(&self, component: ComponentRef) -> ComponentId {
        self.bus.register_callback(component)
    }

    pub fn unregister_callback(&self, id: ComponentId) -> bool {
        self.bus.unregister_callback(id)
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Delivers `message` to every component, then to every mode.
    pub fn broadcast(&mut self, message: &mut Message) -> bool {
        let handled = self.bus.broadcast(message);
        self.modes.notify_all(message);
        handled
    }

    // ---- Registers and clipboard ----

    pub fn set_register(&mut self, name: impl Into<RegisterName>, register: Register) {
        self.registers.set(name, register);
    }

    pub fn set_register_text(&mut self, name: impl Into<RegisterName>, text: impl Into<String>) {
        self.registers.set_text(name, text);
    }

    pub fn get_register(&mut self, name: impl Into<RegisterName>) -> &mut Register {
        self.registers.get(name)
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Copies the clipboard into the `"`, `*`, and `+` registers. Without a
    /// clipboard, a component may answer `Msg::GetClipBoard` instead.
    pub fn read_clipboard(&mut self) -> bool {
        let text = if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.read() {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!("Failed to read clipboard: {}", e);
                    None
                }
            }
        } else {
            let mut message = Message::new(Msg::GetClipBoard);
            self.broadcast(&mut message).then_some(message.text)
        };

        let Some(text) = text else {
            return false;
        };
        for name in CLIPBOARD_REGISTERS {
            self.registers.set_text(name, text.clone());
        }
        true
    }

    /// Sends the `"` register to the clipboard and mirrors it into `*`/`+`.
    pub fn write_clipboard(&mut self) -> bool {
        let text = self.registers.get(DEFAULT_REGISTER).text.clone();
        for name in &CLIPBOARD_REGISTERS[1..] {
            self.registers.set_text(*name, text.clone());
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.write(&text) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to write clipboard: {}", e);
                    false
                }
            }
        } else {
            self.broadcast(&mut Message::with_text(Msg::SetClipBoard, text))
        }
    }

    // ---- Refresh and timers ----

    pub fn request_refresh(&mut self) {
        self.refresh.request();
    }

    /// Consumes the pending refresh. A cursor blink change also counts, and
    /// is announced with `Msg::Tick`.
    pub fn refresh_required(&mut self) -> bool {
        let blink = self.cursor_blink_state();
        match self.refresh.consume(blink) {
            Some(RefreshCause::Requested) => true,
            Some(RefreshCause::CursorBlink) => {
                self.broadcast(&mut Message::new(Msg::Tick));
                true
            }
            None => false,
        }
    }

    pub fn cursor_blink_state(&self) -> bool {
        self.config.cursor_line_solid || blink_phase(self.cursor_timer.elapsed())
    }

    pub fn reset_cursor_timer(&mut self) {
        self.cursor_timer.restart();
    }

    pub fn reset_last_edit_timer(&mut self) {
        self.last_edit_timer.restart();
    }

    pub fn last_edit_elapsed(&self) -> Duration {
        self.last_edit_timer.elapsed()
    }

    // ---- Config ----

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn apply_config(&mut self, config: EditorConfig) {
        let rethemed = self.syntax.set_theme(&config.syntax_theme);
        self.config = config;
        if rethemed {
            for id in self.buffers.ids() {
                self.set_buffer_syntax(id);
            }
        }
        self.broadcast(&mut Message::new(Msg::ConfigChanged));
        self.layout_changed();
    }

    pub fn load_config(&mut self, path: impl AsRef<Path>) {
        let config = EditorConfig::load(self.file_system.as_ref(), path.as_ref());
        self.apply_config(config);
    }

    pub fn load_config_table(&mut self, table: &Value) {
        self.apply_config(EditorConfig::from_table(table));
    }

    pub fn save_config_table(&self) -> Value {
        self.config.to_table()
    }

    pub fn save_config(&self, path: impl AsRef<Path>) -> Result<()> {
        self.config.save(self.file_system.as_ref(), path.as_ref())
    }

    // ---- Mouse ----

    pub fn mouse_pos(&self) -> Vec2 {
        self.mouse_pos
    }

    pub fn on_mouse_move(&mut self, pos: Vec2) -> bool {
        self.mouse_pos = pos;
        self.broadcast(&mut Message::mouse(Msg::MouseMove, pos, MouseButton::Unknown))
    }

    /// A press in the tab bar activates that tab; a press in a window
    /// focuses it.
    pub fn on_mouse_down(&mut self, pos: Vec2, button: MouseButton) -> bool {
        self.mouse_pos = pos;
        if self.broadcast(&mut Message::mouse(Msg::MouseDown, pos, button)) {
            return true;
        }
        if self.tab_region.contains(pos) {
            let clicked = self
                .tab_rects
                .iter()
                .find(|(_, rect)| rect.contains(pos))
                .map(|(tab, _)| *tab);
            return clicked.is_some_and(|tab| self.set_current_tab_window(tab));
        }
        if self.tab_content_region.contains(pos) {
            let clicked = self.windows.active_tab().and_then(|t| t.window_at(pos));
            return clicked.is_some_and(|window| self.set_current_window(window));
        }
        false
    }

    pub fn on_mouse_up(&mut self, pos: Vec2, button: MouseButton) -> bool {
        self.mouse_pos = pos;
        self.broadcast(&mut Message::mouse(Msg::MouseUp, pos, button))
    }

    // ---- Command line and lifecycle ----

    pub fn set_command_text(&mut self, text: impl Into<String>) {
        self.command_text = text.into();
        self.layout_changed();
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn command_lines(&self) -> Vec<&str> {
        self.command_text.split('\n').collect()
    }

    /// Asks components whether quitting is fine; unhandled means quit.
    pub fn request_quit(&mut self) {
        if !self.broadcast(&mut Message::new(Msg::RequestQuit)) {
            self.quit = true;
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Drops every tab, buffer, and the command line.
    pub fn reset(&mut self) {
        self.windows.clear();
        for id in self.buffers.ids() {
            if self.buffers.remove(id).is_some() {
                self.broadcast(&mut Message::buffer(id, BufferEvent::Removed));
            }
        }
        self.modes.clear_secondary();
        self.command_text.clear();
        self.layout_changed();
        log::info!("Editor reset");
    }
}
