//! Terminal front end for the Palimpsest editor kernel.

mod ui;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton as TermButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::LevelFilter;
use palimpsest::message::MouseButton;
use palimpsest::{Editor, EditorBuilder, FixedDisplay, LocalClipboard, Vec2};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{env, io, time::Duration};

fn main() -> Result<()> {
    // Log lines would land on the alternate screen, so stay quiet unless asked.
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Off);
    }
    logger.init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let root = env::current_dir()?;
    let mut editor = EditorBuilder::new(&root)
        .display(FixedDisplay::terminal())
        .clipboard(LocalClipboard::new())
        .build();

    match env::args().nth(1) {
        Some(path) => {
            let id = editor.init_with_file_or_dir(&path);
            log::info!("Opened {} from command line as {}", path, id);
        }
        None => {
            editor.ensure_tab();
            log::info!("No file specified, starting with empty buffer");
        }
    }

    if let Err(e) = enable_raw_mode() {
        eprintln!("Failed to initialise terminal: {}", e);
        return Err(e.into());
    }
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        let _ = disable_raw_mode();
        eprintln!("Failed to configure terminal: {}", e);
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut editor);

    restore_terminal()?;

    if let Err(err) = res {
        eprintln!("Editor stopped with an error: {}", err);
        if let Some(source) = err.source() {
            eprintln!("Cause: {}", source);
        }
        log::error!("Application error: {}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, editor: &mut Editor) -> Result<()> {
    let mut last_size = None;
    loop {
        let size = terminal.size()?;
        if last_size != Some(size) {
            editor.set_display_region(
                Vec2::new(0.0, 0.0),
                Vec2::new(size.width as f32, size.height as f32),
            );
            last_size = Some(size);
        }

        editor.display();
        if editor.refresh_required() {
            if let Err(e) = terminal.draw(|f| ui::draw(f, editor)) {
                log::error!("Terminal draw error: {}", e);
            }
        }

        if editor.should_quit() {
            log::info!("Editor shutdown requested");
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    editor.handle_key(key);
                }
                Event::Mouse(mouse) => {
                    let pos = Vec2::new(mouse.column as f32, mouse.row as f32);
                    match mouse.kind {
                        MouseEventKind::Down(button) => {
                            editor.on_mouse_down(pos, map_button(button));
                        }
                        MouseEventKind::Up(button) => {
                            editor.on_mouse_up(pos, map_button(button));
                        }
                        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                            editor.on_mouse_move(pos);
                        }
                        _ => {}
                    }
                }
                Event::Resize(_, _) => editor.request_refresh(),
                _ => {}
            }
        }
    }

    log::info!("Editor loop ended");
    Ok(())
}

fn map_button(button: TermButton) -> MouseButton {
    match button {
        TermButton::Left => MouseButton::Left,
        TermButton::Middle => MouseButton::Middle,
        TermButton::Right => MouseButton::Right,
    }
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    let _ = execute!(stdout, crossterm::cursor::Show);
    Ok(())
}
