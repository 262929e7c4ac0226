//! Vim-style modal editing: normal, insert, and command-line states.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::mode::{Mode, ModeContext};
use crate::registers::{Register, DEFAULT_REGISTER};
use crate::window_manager::WindowId;

pub const VIM_MODE: &str = "vim";

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    Insert,
    Command(String),
}

/// Modal editing with a small Vim command set.
#[derive(Debug)]
pub struct VimMode {
    state: State,
    pending: Option<char>,
}

impl VimMode {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            pending: None,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.state == State::Insert
    }

    fn handle_normal(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
        // Two-key commands (dd, yy)
        if let Some(first) = self.pending.take() {
            match (first, key.code) {
                ('d', KeyCode::Char('d')) => {
                    ctx.cut_line();
                    return true;
                }
                ('y', KeyCode::Char('y')) => {
                    ctx.yank_line();
                    return true;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('h') | KeyCode::Left => ctx.move_left(),
            KeyCode::Char('j') | KeyCode::Down => ctx.move_down(),
            KeyCode::Char('k') | KeyCode::Up => ctx.move_up(),
            KeyCode::Char('l') | KeyCode::Right => ctx.move_right(),
            KeyCode::Char('0') | KeyCode::Home => ctx.line_start(),
            KeyCode::Char('$') | KeyCode::End => ctx.line_end(),
            KeyCode::Char('i') => self.state = State::Insert,
            KeyCode::Char('a') => {
                ctx.move_right();
                self.state = State::Insert;
            }
            KeyCode::Char('A') => {
                ctx.line_end();
                self.state = State::Insert;
            }
            KeyCode::Char('o') => {
                ctx.line_end();
                if ctx.insert("\n") {
                    self.state = State::Insert;
                }
            }
            KeyCode::Char('x') => {
                if let Some(removed) = ctx.delete_forward() {
                    ctx.registers.set(DEFAULT_REGISTER, Register::new(removed));
                }
            }
            KeyCode::Char('p') => {
                ctx.paste();
            }
            KeyCode::Char(c @ ('d' | 'y')) => self.pending = Some(c),
            KeyCode::Char(':') => {
                self.state = State::Command(String::new());
                *ctx.command_line = ":".to_string();
            }
            _ => return false,
        }
        true
    }

    fn handle_insert(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.state = State::Normal;
                ctx.move_left();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let mut buf = [0u8; 4];
                ctx.insert(c.encode_utf8(&mut buf));
            }
            KeyCode::Enter => {
                ctx.insert("\n");
            }
            KeyCode::Tab => {
                ctx.insert("\t");
            }
            KeyCode::Backspace => {
                ctx.delete_back();
            }
            KeyCode::Delete => {
                ctx.delete_forward();
            }
            KeyCode::Left => ctx.move_left(),
            KeyCode::Right => ctx.move_right(),
            KeyCode::Up => ctx.move_up(),
            KeyCode::Down => ctx.move_down(),
            KeyCode::Home => ctx.line_start(),
            KeyCode::End => ctx.line_end(),
            _ => return false,
        }
        true
    }

    fn handle_command(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, mut text: String) -> bool {
        match key.code {
            KeyCode::Esc => {
                ctx.command_line.clear();
                return true;
            }
            KeyCode::Enter => {
                ctx.command_line.clear();
                let command = text.trim();
                if !command.is_empty() {
                    ctx.emit_command(command);
                }
                return true;
            }
            KeyCode::Backspace => {
                if text.pop().is_none() {
                    ctx.command_line.clear();
                    return true;
                }
            }
            KeyCode::Char(c) => text.push(c),
            _ => {}
        }
        *ctx.command_line = format!(":{}", text);
        self.state = State::Command(text);
        true
    }
}

impl Default for VimMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for VimMode {
    fn name(&self) -> &str {
        VIM_MODE
    }

    fn activate(&mut self, _window: Option<WindowId>) {
        self.state = State::Normal;
        self.pending = None;
    }

    fn handle_key(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
        match std::mem::replace(&mut self.state, State::Normal) {
            State::Normal => self.handle_normal(ctx, key),
            State::Insert => {
                self.state = State::Insert;
                self.handle_insert(ctx, key)
            }
            State::Command(text) => self.handle_command(ctx, key, text),
        }
    }

    fn status(&self) -> String {
        match &self.state {
            State::Normal => String::new(),
            State::Insert => "-- INSERT --".to_string(),
            State::Command(text) => format!(":{}", text),
        }
    }
}
