//! ratatui rendering of the editor state.

use palimpsest::buffer::Buffer;
use palimpsest::layout;
use palimpsest::window_manager::Window;
use palimpsest::Editor;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Paints the editor into the frame. Every region comes from the editor's own
/// layout, computed in character cells.
pub fn draw(f: &mut Frame, editor: &Editor) {
    draw_tab_bar(f, editor);

    if let Some(tab) = editor.active_tab_window() {
        let active = tab.active_window();
        for window in tab.windows() {
            if let Some(buffer) = editor.buffer(window.buffer()) {
                draw_window(f, editor, window, buffer, window.id() == active);
            }
        }
    }

    draw_command_region(f, editor);
}

fn to_cells(rect: layout::Rect, bounds: Rect) -> Rect {
    let x = rect.top_left.x.max(0.0) as u16;
    let y = rect.top_left.y.max(0.0) as u16;
    let cells = Rect::new(x, y, rect.width() as u16, rect.height() as u16);
    cells.intersection(bounds)
}

fn tab_title(editor: &Editor, buffer: &Buffer) -> String {
    let name = buffer.name();
    if editor.config().short_tab_names {
        name.rsplit(['/', '\\']).find(|s| !s.is_empty()).unwrap_or(name).to_string()
    } else {
        name.to_string()
    }
}

fn draw_tab_bar(f: &mut Frame, editor: &Editor) {
    let active = editor.active_tab_window().map(|t| t.id());
    for (tab_id, rect) in editor.tab_rects() {
        let area = to_cells(*rect, f.size());
        if area.width == 0 || area.height == 0 {
            continue;
        }
        let title = editor
            .tab_windows()
            .iter()
            .find(|t| t.id() == *tab_id)
            .and_then(|t| t.window(t.active_window()))
            .and_then(|w| editor.buffer(w.buffer()))
            .map(|b| tab_title(editor, b))
            .unwrap_or_default();

        let style = if Some(*tab_id) == active {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray).bg(Color::DarkGray)
        };
        f.render_widget(Paragraph::new(format!(" {} ", title)).style(style), area);
    }
}

fn styled_line<'a>(text: &'a str, runs: Option<&[hlcore::StyledRun]>) -> Vec<Span<'a>> {
    let Some(runs) = runs.filter(|r| !r.is_empty()) else {
        return vec![Span::raw(text)];
    };
    let mut spans = Vec::with_capacity(runs.len() + 1);
    let mut offset = 0;
    for run in runs {
        // Runs from an older version may not line up with the current text.
        let Some(piece) = text.get(run.start..run.end.min(text.len())) else {
            break;
        };
        if run.start < offset {
            break;
        }
        if let Some(gap) = text.get(offset..run.start) {
            if !gap.is_empty() {
                spans.push(Span::raw(gap));
            }
        }
        let mut style = Style::default().fg(Color::Rgb(run.foreground.r, run.foreground.g, run.foreground.b));
        if run.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if run.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if run.underline {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        spans.push(Span::styled(piece, style));
        offset = run.start + piece.len();
    }
    if let Some(rest) = text.get(offset..) {
        if !rest.is_empty() {
            spans.push(Span::raw(rest));
        }
    }
    spans
}

fn draw_window(f: &mut Frame, editor: &Editor, window: &Window, buffer: &Buffer, is_current: bool) {
    let area = to_cells(window.rect(), f.size());
    if area.height < 2 || area.width == 0 {
        return;
    }
    let text_area = Rect::new(area.x, area.y, area.width, area.height - 1);
    let status_area = Rect::new(area.x, area.y + area.height - 1, area.width, 1);

    let rope = buffer.text();
    let cursor = window.cursor().min(rope.len_chars());
    let cursor_line = rope.char_to_line(cursor);
    let cursor_col = cursor - rope.line_to_char(cursor_line);
    let visible = text_area.height as usize;
    let first_line = (cursor_line + 1).saturating_sub(visible);

    let gutter: u16 = if editor.config().show_line_numbers { 5 } else { 0 };
    let highlights = buffer.syntax().map(|s| s.highlights());

    let lines: Vec<String> = rope
        .lines()
        .skip(first_line)
        .take(visible)
        .map(|l| l.to_string().trim_end_matches(['\n', '\r']).to_string())
        .collect();

    let rendered: Vec<Line> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let line_no = first_line + i;
            let mut spans = Vec::new();
            if gutter > 0 {
                spans.push(Span::styled(
                    format!("{:4} ", line_no + 1),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            let runs = highlights.and_then(|h| h.get(line_no)).map(|r| r.as_slice());
            spans.extend(styled_line(text, runs));
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(rendered), text_area);

    let mode = if is_current {
        let name = editor.current_mode_name();
        let status = editor.modes().get(&name).map(|m| m.status()).unwrap_or_default();
        if status.is_empty() {
            name
        } else {
            status
        }
    } else {
        String::new()
    };
    let dirty = if buffer.is_dirty() { " [+]" } else { "" };
    let status = format!(" {}{}  {}:{}  {}", buffer.name(), dirty, cursor_line + 1, cursor_col + 1, mode);
    let style = if is_current {
        Style::default().fg(Color::Black).bg(Color::Gray)
    } else {
        Style::default().fg(Color::Gray).bg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(status).style(style), status_area);

    if is_current && editor.cursor_blink_state() && cursor_line >= first_line {
        let prefix: String = lines
            .get(cursor_line - first_line)
            .map(|l| l.chars().take(cursor_col).collect())
            .unwrap_or_default();
        let x = text_area.x + gutter + prefix.width() as u16;
        let y = text_area.y + (cursor_line - first_line) as u16;
        if x < text_area.right() && y < text_area.bottom() {
            f.set_cursor(x, y);
        }
    }
}

fn draw_command_region(f: &mut Frame, editor: &Editor) {
    let area = to_cells(editor.command_region(), f.size());
    if area.width == 0 || area.height == 0 {
        return;
    }
    let lines: Vec<Line> = editor.command_lines().into_iter().map(Line::raw).collect();
    f.render_widget(Paragraph::new(lines), area);
}
