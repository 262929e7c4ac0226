//! Conventional editing where typed characters are always inserted.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::mode::{Mode, ModeContext};
use crate::registers::{Register, DEFAULT_REGISTER};

pub const STANDARD_MODE: &str = "standard";

/// Conventional always-inserting editing. Shared by every key path that is
/// not modal, so `SearchMode` reuses it for the query line.
pub(crate) fn edit_key(ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('v') if ctrl => {
            let text = ctx.registers.get(DEFAULT_REGISTER).text.clone();
            if !text.is_empty() {
                ctx.insert(&text);
            }
        }
        KeyCode::Char(c) if !ctrl => {
            let mut buf = [0u8; 4];
            ctx.insert(c.encode_utf8(&mut buf));
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

#[derive(Debug, Default)]
pub struct StandardMode;

impl StandardMode {
    pub fn new() -> Self {
        Self
    }
}

impl Mode for StandardMode {
    fn name(&self) -> &str {
        STANDARD_MODE
    }

    fn handle_key(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => ctx.insert("\n"),
            KeyCode::Char('c') if ctrl => {
                let range = ctx.buffer.line_range(ctx.cursor());
                let line = ctx.buffer.text().slice(range).to_string();
                ctx.registers.set(DEFAULT_REGISTER, Register::line_wise(line));
                true
            }
            KeyCode::Char('s') if ctrl => {
                ctx.emit_command("w");
                true
            }
            KeyCode::Char('q') if ctrl => {
                ctx.emit_command("q");
                true
            }
            _ => edit_key(ctx, key),
        }
    }
}
