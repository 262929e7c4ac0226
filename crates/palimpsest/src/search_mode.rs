//! Query entry for the search window.

use crossterm::event::{KeyCode, KeyEvent};

use crate::mode::{Mode, ModeContext};
use crate::standard_mode::edit_key;

pub const SEARCH_MODE: &str = "search";

/// Edits a one-line query. Enter emits `search <query>`, Esc closes the
/// window.
#[derive(Debug, Default)]
pub struct SearchMode {
    last_query: String,
}

impl SearchMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_query(&self) -> &str {
        &self.last_query
    }
}

impl Mode for SearchMode {
    fn name(&self) -> &str {
        SEARCH_MODE
    }

    fn handle_key(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter => {
                let query = ctx.buffer.contents().trim().to_string();
                if !query.is_empty() {
                    ctx.emit_command(format!("search {}", query));
                    self.last_query = query;
                }
                true
            }
            KeyCode::Esc => {
                ctx.emit_command("close");
                true
            }
            KeyCode::Up | KeyCode::Down => false,
            _ => edit_key(ctx, key),
        }
    }

    fn status(&self) -> String {
        if self.last_query.is_empty() {
            "SEARCH".to_string()
        } else {
            format!("SEARCH /{}", self.last_query)
        }
    }
}
