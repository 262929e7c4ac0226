//! Input modes and the registry that decides which one sees a key.

use std::collections::BTreeMap;
use std::ops::Range;

use crossterm::event::KeyEvent;

use crate::buffer::Buffer;
use crate::message::Message;
use crate::registers::{Register, Registers, DEFAULT_REGISTER};
use crate::window_manager::WindowId;

/// A named input-handling strategy.
pub trait Mode {
    fn name(&self) -> &str;

    fn activate(&mut self, _window: Option<WindowId>) {}

    fn deactivate(&mut self) {}

    /// Returns whether the key was consumed.
    fn handle_key(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool;

    fn notify(&mut self, _message: &Message) {}

    /// Short text for the status line.
    fn status(&self) -> String {
        String::new()
    }
}

/// What a mode may touch while handling one key.
pub struct ModeContext<'a> {
    pub window: Option<WindowId>,
    pub buffer: &'a mut Buffer,
    pub registers: &'a mut Registers,
    pub command_line: &'a mut String,
    cursor: &'a mut usize,
    edited: bool,
    command: Option<String>,
}

impl<'a> ModeContext<'a> {
    pub fn new(
        window: Option<WindowId>,
        buffer: &'a mut Buffer,
        cursor: &'a mut usize,
        registers: &'a mut Registers,
        command_line: &'a mut String,
    ) -> Self {
        *cursor = (*cursor).min(buffer.len_chars());
        Self {
            window,
            buffer,
            registers,
            command_line,
            cursor,
            edited: false,
            command: None,
        }
    }

    pub fn cursor(&self) -> usize {
        *self.cursor
    }

    pub fn set_cursor(&mut self, pos: usize) {
        *self.cursor = pos.min(self.buffer.len_chars());
    }

    pub fn edited(&self) -> bool {
        self.edited
    }

    /// Queues `command` to be broadcast once the key has been handled.
    pub fn emit_command(&mut self, command: impl Into<String>) {
        self.command = Some(command.into());
    }

    pub(crate) fn take_command(&mut self) -> Option<String> {
        self.command.take()
    }

    /// Inserts at the cursor and moves past the inserted text.
    pub fn insert(&mut self, text: &str) -> bool {
        let at = *self.cursor;
        if !self.buffer.insert(at, text) {
            return false;
        }
        *self.cursor = at + text.chars().count();
        self.edited = true;
        true
    }

    pub fn remove(&mut self, range: Range<usize>) -> Option<String> {
        let start = range.start;
        let removed = self.buffer.remove(range)?;
        self.edited = true;
        if *self.cursor > start {
            let shift = removed.chars().count().min(*self.cursor - start);
            *self.cursor -= shift;
        }
        self.set_cursor(*self.cursor);
        Some(removed)
    }

    pub fn delete_back(&mut self) -> Option<String> {
        let at = *self.cursor;
        if at == 0 {
            return None;
        }
        self.remove(at - 1..at)
    }

    pub fn delete_forward(&mut self) -> Option<String> {
        let at = *self.cursor;
        self.remove(at..at + 1)
    }

    pub fn move_left(&mut self) {
        *self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.set_cursor(*self.cursor + 1);
    }

    fn line_and_column(&self) -> (usize, usize) {
        let text = self.buffer.text();
        let line = text.char_to_line(*self.cursor);
        (line, *self.cursor - text.line_to_char(line))
    }

    /// Char offset of `column` on `line`, clamped before the line break.
    fn offset_in_line(&self, line: usize, column: usize) -> usize {
        let text = self.buffer.text();
        let start = text.line_to_char(line);
        let line_text = text.line(line);
        let mut len = line_text.len_chars();
        while len > 0 && matches!(line_text.char(len - 1), '\n' | '\r') {
            len -= 1;
        }
        start + column.min(len)
    }

    pub fn move_up(&mut self) {
        let (line, column) = self.line_and_column();
        if line > 0 {
            *self.cursor = self.offset_in_line(line - 1, column);
        }
    }

    pub fn move_down(&mut self) {
        let (line, column) = self.line_and_column();
        if line + 1 < self.buffer.line_count() {
            *self.cursor = self.offset_in_line(line + 1, column);
        }
    }

    pub fn line_start(&mut self) {
        let (line, _) = self.line_and_column();
        *self.cursor = self.buffer.text().line_to_char(line);
    }

    pub fn line_end(&mut self) {
        let (line, _) = self.line_and_column();
        *self.cursor = self.offset_in_line(line, usize::MAX);
    }

    /// Removes the cursor's line into the default register.
    pub fn cut_line(&mut self) -> bool {
        let range = self.buffer.line_range(*self.cursor);
        if range.is_empty() || !self.buffer.is_editable() {
            return false;
        }
        let start = range.start;
        match self.remove(range) {
            Some(text) => {
                self.registers.set(DEFAULT_REGISTER, Register::line_wise(text));
                self.set_cursor(start);
                true
            }
            None => false,
        }
    }

    pub fn yank_line(&mut self) {
        let range = self.buffer.line_range(*self.cursor);
        let text = self.buffer.text().slice(range).to_string();
        self.registers.set(DEFAULT_REGISTER, Register::line_wise(text));
    }

    /// Puts the default register after the cursor (below the line when line-wise).
    pub fn paste(&mut self) -> bool {
        let register = self.registers.get(DEFAULT_REGISTER).clone();
        if register.is_empty() {
            return false;
        }
        if register.line_wise {
            let end = self.buffer.line_range(*self.cursor).end;
            let mut text = register.text;
            let at_eof_without_break = end == self.buffer.len_chars()
                && end > 0
                && self.buffer.text().char(end - 1) != '\n';
            if at_eof_without_break {
                text.insert(0, '\n');
                if text.ends_with('\n') {
                    text.pop();
                }
            }
            self.set_cursor(end);
            let start = *self.cursor + usize::from(at_eof_without_break);
            let ok = self.insert(&text);
            self.set_cursor(start);
            ok
        } else {
            if self.buffer.len_chars() > 0 {
                self.move_right();
            }
            self.insert(&register.text)
        }
    }
}

/// One global mode, any number of registered alternatives, and an optional
/// secondary mode that overlays the global one.
pub struct ModeRegistry {
    global: Box<dyn Mode>,
    others: BTreeMap<String, Box<dyn Mode>>,
    secondary: Option<String>,
}

impl ModeRegistry {
    pub fn new(global: Box<dyn Mode>) -> Self {
        Self {
            global,
            others: BTreeMap::new(),
            secondary: None,
        }
    }

    /// Adds `mode`, replacing any mode of the same name. Replacing the
    /// active global mode activates the new instance.
    pub fn register(&mut self, mut mode: Box<dyn Mode>, window: Option<WindowId>) {
        let name = mode.name().to_string();
        if name == self.global.name() {
            self.global.deactivate();
            mode.activate(window);
            self.global = mode;
            log::debug!("Replaced active mode '{}'", name);
        } else {
            self.others.insert(name, mode);
        }
    }

    /// Switches the global mode. Unknown names change nothing.
    pub fn set_global(&mut self, name: &str, window: Option<WindowId>) -> bool {
        if name == self.global.name() {
            return true;
        }
        let Some(mut next) = self.others.remove(name) else {
            log::debug!("Unknown mode '{}', keeping '{}'", name, self.global.name());
            return false;
        };
        next.activate(window);
        let mut previous = std::mem::replace(&mut self.global, next);
        previous.deactivate();
        self.others.insert(previous.name().to_string(), previous);
        if self.secondary.as_deref() == Some(name) {
            self.secondary = None;
        }
        log::debug!("Global mode is now '{}'", name);
        true
    }

    pub fn global(&self) -> &dyn Mode {
        self.global.as_ref()
    }

    pub fn global_name(&self) -> &str {
        self.global.name()
    }

    pub fn set_secondary(&mut self, name: &str, window: Option<WindowId>) -> bool {
        let Some(mode) = self.get_mut(name) else {
            return false;
        };
        mode.activate(window);
        self.secondary = Some(name.to_string());
        true
    }

    pub fn clear_secondary(&mut self) {
        if let Some(name) = self.secondary.take() {
            if let Some(mode) = self.get_mut(&name) {
                mode.deactivate();
            }
        }
    }

    pub fn secondary(&self) -> Option<&dyn Mode> {
        let name = self.secondary.as_deref()?;
        self.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.global.name() == name || self.others.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.others.keys().cloned().collect();
        names.push(self.global.name().to_string());
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<&dyn Mode> {
        if self.global.name() == name {
            Some(self.global.as_ref())
        } else {
            self.others.get(name).map(|m| m.as_ref())
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Mode + 'static)> {
        if self.global.name() == name {
            Some(self.global.as_mut())
        } else {
            self.others.get_mut(name).map(|m| m.as_mut())
        }
    }

    /// Name of the mode that receives input for a window whose fixed mode is
    /// `fixed`: the secondary mode, else the fixed mode, else the global one.
    pub fn route(&self, fixed: Option<&str>) -> String {
        if let Some(name) = self.secondary.as_deref().filter(|n| self.contains(n)) {
            return name.to_string();
        }
        if let Some(name) = fixed.filter(|n| self.contains(n)) {
            return name.to_string();
        }
        self.global.name().to_string()
    }

    pub fn notify_all(&mut self, message: &Message) {
        self.global.notify(message);
        for mode in self.others.values_mut() {
            mode.notify(message);
        }
    }
}
