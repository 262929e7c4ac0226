use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use palimpsest::buffer::{BufferFlags, BufferType};
use palimpsest::message::{BufferEvent, ComponentId, ComponentRef, MouseButton};
use palimpsest::syntax::{Analyze, HighlightSyntax, Highlights, Syntax, SyntaxProvider};
use palimpsest::{
    Component, Editor, EditorBuilder, EditorFlags, FileSystem, MemoryFileSystem, Message, MessageBus, Msg,
    SplitDirection, Vec2,
};
use ropey::Rope;
use serde_json::json;

const CONFIG: &str = "/cfg/palimpsest.json";

fn inline_editor() -> (Editor, MemoryFileSystem) {
    let fs = MemoryFileSystem::new();
    let editor = EditorBuilder::new("/work")
        .flags(EditorFlags::DISABLE_THREADS)
        .file_system(fs.clone())
        .config_path(CONFIG)
        .build();
    (editor, fs)
}

fn threaded_editor() -> (Editor, MemoryFileSystem) {
    let fs = MemoryFileSystem::new();
    let editor = EditorBuilder::new("/work")
        .file_system(fs.clone())
        .config_path(CONFIG)
        .workers(2)
        .build();
    (editor, fs)
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn type_text(editor: &mut Editor, text: &str) {
    for c in text.chars() {
        editor.handle_key(key(KeyCode::Char(c)));
    }
}

#[derive(Default)]
struct Recorder {
    seen: Vec<Msg>,
    buffer_events: Vec<BufferEvent>,
    answer: Option<String>,
}

impl Component for Recorder {
    fn notify(&mut self, message: &mut Message, _bus: &MessageBus) {
        self.seen.push(message.kind);
        if let Some(event) = message.buffer_event {
            self.buffer_events.push(event);
        }
        if message.kind == Msg::GetClipBoard {
            if let Some(answer) = &self.answer {
                message.text = answer.clone();
                message.handled = true;
            }
        }
    }
}

fn recorder(editor: &Editor) -> (Rc<RefCell<Recorder>>, ComponentId) {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let component: ComponentRef = rec.clone();
    let id = editor.register_callback(component);
    (rec, id)
}

/// Analyzer that blocks until the test lets it go.
struct Gated {
    gate: Mutex<Receiver<()>>,
    runs: AtomicUsize,
}

impl Analyze for Gated {
    fn analyze(&self, text: &Rope) -> Highlights {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        (0..text.len_lines()).map(|_| Vec::new()).collect()
    }
}

fn gated_provider() -> (SyntaxProvider, Sender<()>, Arc<Gated>) {
    let (tx, rx) = mpsc::channel();
    let gated = Arc::new(Gated {
        gate: Mutex::new(rx),
        runs: AtomicUsize::new(0),
    });
    let analyzer: Arc<dyn Analyze> = gated.clone();
    let provider = SyntaxProvider::new("gated", move |_| {
        Box::new(HighlightSyntax::new("gated", Arc::clone(&analyzer))) as Box<dyn Syntax>
    });
    (provider, tx, gated)
}

fn wait_idle(editor: &Editor) {
    let start = Instant::now();
    while editor.pending_tasks() > 0 {
        assert!(start.elapsed() < Duration::from_secs(10), "background work never finished");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_same_path_yields_same_buffer() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/work/a.txt", "hello");
    let first = editor.get_file_buffer("/work/a.txt", BufferFlags::empty(), true);
    let second = editor.get_file_buffer("/work/./sub/../a.txt", BufferFlags::READ_ONLY, true);
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(editor.buffers().count(), 1);
    assert!(!editor.buffer(first.unwrap()).unwrap().has_flag(BufferFlags::READ_ONLY));

    assert_eq!(editor.get_file_buffer("/work/other.txt", BufferFlags::empty(), false), None);
}

#[test]
fn test_missing_file_opens_empty_and_unreadable_is_flagged() {
    let (mut editor, fs) = inline_editor();
    let id = editor.get_file_buffer("/work/new.txt", BufferFlags::empty(), true).unwrap();
    let buffer = editor.buffer(id).unwrap();
    assert_eq!(buffer.len_chars(), 0);
    assert!(!buffer.has_flag(BufferFlags::FILE_ERROR));

    // A directory exists but cannot be read as a file.
    fs.insert("/work/dir/inner.txt", "x");
    let id = editor.get_file_buffer("/work/dir", BufferFlags::empty(), true).unwrap();
    assert!(editor.buffer(id).unwrap().has_flag(BufferFlags::FILE_ERROR));
}

fn disk_editor(dir: &Path) -> Editor {
    EditorBuilder::new(dir)
        .flags(EditorFlags::DISABLE_THREADS)
        .config_path(dir.join("palimpsest.json"))
        .build()
}

#[test]
fn test_unreadable_file_is_never_overwritten_by_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, b"important\0binary").unwrap();

    let mut editor = disk_editor(dir.path());
    let id = editor.init_with_file_or_dir(&path);
    assert!(editor.buffer(id).unwrap().has_flag(BufferFlags::FILE_ERROR));

    assert!(editor.save_buffer(id).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), b"important\0binary");
    assert!(editor.buffer(id).unwrap().has_flag(BufferFlags::FILE_ERROR));

    type_text(&mut editor, ":w");
    editor.handle_key(key(KeyCode::Enter));
    assert!(editor.command_text().starts_with("Buffer was not loaded from disk"));
    assert_eq!(std::fs::read(&path).unwrap(), b"important\0binary");

    // Replacing the content is an explicit choice to overwrite.
    editor.edit_buffer(id, |b| b.insert(0, "replacement"));
    editor.save_buffer(id).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "replacement");
    assert!(!editor.buffer(id).unwrap().has_flag(BufferFlags::FILE_ERROR));
}

#[test]
fn test_unreadable_file_recovers_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later.txt");
    std::fs::write(&path, b"still\0binary").unwrap();

    let mut editor = disk_editor(dir.path());
    let id = editor.get_file_buffer(&path, BufferFlags::empty(), true).unwrap();
    assert!(editor.buffer(id).unwrap().has_flag(BufferFlags::FILE_ERROR));

    editor.on_file_changed(&path);
    let buffer = editor.buffer(id).unwrap();
    assert!(buffer.has_flag(BufferFlags::FILE_ERROR));
    assert_eq!(buffer.len_chars(), 0);

    std::fs::write(&path, "now text").unwrap();
    editor.on_file_changed(&path);
    let buffer = editor.buffer(id).unwrap();
    assert!(!buffer.has_flag(BufferFlags::FILE_ERROR));
    assert_eq!(buffer.contents(), "now text");

    editor.save_buffer(id).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "now text");
}

#[test]
fn test_removed_buffer_is_gone_everywhere() {
    let (mut editor, _) = inline_editor();
    let (rec, _) = recorder(&editor);
    let keep = editor.init_with_text("keep.txt", "k");
    let gone = editor.get_empty_buffer("gone", BufferFlags::empty());
    editor.split_window(SplitDirection::Vertical, gone).unwrap();
    assert_eq!(editor.find_buffer_windows(gone).len(), 1);

    assert!(editor.remove_buffer(gone));
    assert!(editor.buffer(gone).is_none());
    assert!(!editor.buffer_ids().contains(&gone));
    assert!(editor.find_buffer_windows(gone).is_empty());
    assert_eq!(editor.active_window().map(|w| w.buffer()), Some(keep));
    assert!(rec.borrow().buffer_events.contains(&BufferEvent::Removed));

    assert!(!editor.remove_buffer(gone));
}

#[test]
fn test_component_sees_broadcast_once() {
    let (mut editor, _) = inline_editor();
    let (rec, id) = recorder(&editor);
    let component: ComponentRef = rec.clone();
    assert_eq!(editor.register_callback(component), id);

    editor.broadcast(&mut Message::new(Msg::ToolTip));
    assert_eq!(rec.borrow().seen, vec![Msg::ToolTip]);

    assert!(editor.unregister_callback(id));
    editor.broadcast(&mut Message::new(Msg::ToolTip));
    assert_eq!(rec.borrow().seen.len(), 1);
    assert!(!editor.unregister_callback(id));
}

struct SelfRemover {
    id: Rc<Cell<Option<ComponentId>>>,
    count: usize,
}

impl Component for SelfRemover {
    fn notify(&mut self, _message: &mut Message, bus: &MessageBus) {
        self.count += 1;
        if let Some(id) = self.id.get() {
            bus.unregister_callback(id);
        }
    }
}

#[test]
fn test_self_unregistration_during_broadcast() {
    let (mut editor, _) = inline_editor();
    let (before, _) = recorder(&editor);
    let slot = Rc::new(Cell::new(None));
    let remover = Rc::new(RefCell::new(SelfRemover {
        id: Rc::clone(&slot),
        count: 0,
    }));
    let component: ComponentRef = remover.clone();
    slot.set(Some(editor.register_callback(component)));
    let (after, _) = recorder(&editor);

    editor.broadcast(&mut Message::new(Msg::Tick));
    editor.broadcast(&mut Message::new(Msg::Tick));

    assert_eq!(remover.borrow().count, 1);
    assert_eq!(before.borrow().seen, vec![Msg::Tick, Msg::Tick]);
    assert_eq!(after.borrow().seen, vec![Msg::Tick, Msg::Tick]);
    assert_eq!(editor.bus().len(), 2);
}

#[test]
fn test_registers() {
    let (mut editor, _) = inline_editor();
    editor.set_register_text('a', "hello");
    let a = editor.get_register("a").clone();
    assert_eq!(a.text, "hello");
    assert!(!a.line_wise);

    let z = editor.get_register('z');
    assert!(z.is_empty());
    assert!(!z.line_wise);
}

#[test]
fn test_refresh_requests_coalesce() {
    let (mut editor, _) = inline_editor();
    editor.load_config_table(&json!({ "cursor_line_solid": true }));
    while editor.refresh_required() {}

    for _ in 0..5 {
        editor.request_refresh();
    }
    assert!(editor.refresh_required());
    assert!(!editor.refresh_required());
}

#[test]
fn test_global_mode_switching() {
    let (mut editor, _) = inline_editor();
    assert!(editor.set_global_mode("standard"));
    assert_eq!(editor.global_mode().name(), "standard");
    assert!(editor.set_global_mode("vim"));
    assert_eq!(editor.global_mode().name(), "vim");

    assert!(!editor.set_global_mode("no-such-mode"));
    assert_eq!(editor.global_mode().name(), "vim");
}

#[test]
fn test_secondary_mode_overrides_routing() {
    let (mut editor, _) = inline_editor();
    let id = editor.init_with_text("t.txt", "");
    assert!(editor.set_secondary_mode("standard"));
    type_text(&mut editor, "ab");
    assert_eq!(editor.buffer(id).unwrap().contents(), "ab");

    editor.clear_secondary_mode();
    assert!(editor.secondary_mode().is_none());
    type_text(&mut editor, "0x");
    assert_eq!(editor.buffer(id).unwrap().contents(), "b");
}

#[test]
fn test_two_tabs_then_remove_active() {
    let (mut editor, _) = inline_editor();
    let first = editor.add_tab_window();
    let second = editor.add_tab_window();
    assert_eq!(editor.tab_windows().len(), 2);
    assert_eq!(editor.active_tab_window().map(|t| t.id()), Some(second));

    assert!(editor.remove_tab_window(second));
    assert_eq!(editor.active_tab_window().map(|t| t.id()), Some(first));

    assert!(editor.remove_tab_window(first));
    assert!(editor.active_tab_window().is_none());
}

#[test]
fn test_tab_navigation_is_cyclic() {
    let (mut editor, _) = inline_editor();
    let a = editor.add_tab_window();
    let b = editor.add_tab_window();
    assert_eq!(editor.next_tab_window(), Some(a));
    assert_eq!(editor.previous_tab_window(), Some(b));
    assert!(editor.set_current_tab_window(a));
}

#[test]
fn test_registered_factory_builds_highlighter() {
    let (mut editor, fs) = inline_editor();
    let built = Rc::new(Cell::new(0));
    let counter = Rc::clone(&built);
    let (provider, tx, _) = gated_provider();
    let factory = provider.factory.clone();
    editor.register_syntax_factory(
        ["cpp"],
        SyntaxProvider::new("counting", move |buffer| {
            counter.set(counter.get() + 1);
            factory(buffer)
        }),
    );
    drop(tx);

    fs.insert("/work/a.cpp", "int main() {}\n");
    let cpp = editor.get_file_buffer("/work/a.cpp", BufferFlags::empty(), true).unwrap();
    assert_eq!(built.get(), 1);
    assert_eq!(editor.buffer(cpp).unwrap().syntax().map(|s| s.syntax_id()), Some("gated"));

    let unknown = editor.get_file_buffer("/work/a.unknown", BufferFlags::empty(), true).unwrap();
    assert!(editor.buffer(unknown).unwrap().syntax().is_none());
    assert_eq!(built.get(), 1);
}

#[test]
fn test_disable_syntax_flag() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/work/lib.rs", "fn f() {}\n");
    let id = editor
        .get_file_buffer("/work/lib.rs", BufferFlags::DISABLE_SYNTAX, true)
        .unwrap();
    assert!(editor.buffer(id).unwrap().syntax().is_none());

    editor.buffer_mut(id).unwrap().set_flags(BufferFlags::DISABLE_SYNTAX, false);
    assert!(editor.set_buffer_syntax(id));
    assert!(editor.buffer(id).unwrap().syntax().is_some());
}

#[test]
fn test_inline_analysis_visible_on_return() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/work/main.rs", "fn main() {}\n");
    let id = editor.get_file_buffer("/work/main.rs", BufferFlags::empty(), true).unwrap();
    assert_eq!(editor.pending_tasks(), 0);

    editor.edit_buffer(id, |b| b.insert(0, "// hi\n"));
    let buffer = editor.buffer(id).unwrap();
    let syntax = buffer.syntax().unwrap();
    assert_eq!(syntax.analyzed_version(), Some(buffer.version()));
    assert_eq!(syntax.highlights().len(), 2);
}

#[test]
fn test_task_for_removed_buffer_is_discarded() {
    let (mut editor, fs) = threaded_editor();
    let (provider, tx, gated) = gated_provider();
    editor.register_syntax_factory(["gate"], provider);

    fs.insert("/work/a.gate", "one\ntwo\n");
    let id = editor.get_file_buffer("/work/a.gate", BufferFlags::empty(), true).unwrap();
    assert_eq!(editor.pending_tasks(), 1);

    assert!(editor.remove_buffer(id));
    tx.send(()).unwrap();
    wait_idle(&editor);
    assert_eq!(gated.runs.load(Ordering::SeqCst), 1);

    editor.display();
    assert!(editor.buffer(id).is_none());
    assert_eq!(editor.buffers().count(), 0);

    let reused = editor.get_empty_buffer("fresh", BufferFlags::empty());
    assert_eq!(reused.index(), id.index());
    assert_ne!(reused, id);
    assert!(editor.buffer(id).is_none());
}

#[test]
fn test_stale_version_results_are_dropped() {
    let (mut editor, fs) = threaded_editor();
    let (provider, tx, _) = gated_provider();
    editor.register_syntax_factory(["gate"], provider);

    fs.insert("/work/b.gate", "x\n");
    let id = editor.get_file_buffer("/work/b.gate", BufferFlags::empty(), true).unwrap();
    editor.edit_buffer(id, |b| b.insert(0, "y\n"));
    assert_eq!(editor.pending_tasks(), 2);

    tx.send(()).unwrap();
    tx.send(()).unwrap();
    wait_idle(&editor);
    editor.display();

    let buffer = editor.buffer(id).unwrap();
    let syntax = buffer.syntax().unwrap();
    assert_eq!(syntax.analyzed_version(), Some(buffer.version()));
    assert_eq!(syntax.highlights().len(), 3);
}

struct Marker;

impl Analyze for Marker {
    fn analyze(&self, _text: &Rope) -> Highlights {
        vec![Vec::new(); 7]
    }
}

#[test]
fn test_results_from_replaced_highlighter_are_dropped() {
    let (mut editor, fs) = threaded_editor();
    let (provider, tx, gated) = gated_provider();
    editor.register_syntax_factory(["gate"], provider);
    editor.register_syntax_factory(
        ["mark"],
        SyntaxProvider::new("marker", |_| {
            Box::new(HighlightSyntax::new("marker", Arc::new(Marker))) as Box<dyn Syntax>
        }),
    );

    fs.insert("/work/a.gate", "one\ntwo");
    let id = editor.get_file_buffer("/work/a.gate", BufferFlags::empty(), true).unwrap();
    assert!(editor.set_buffer_path(id, "/work/a.mark"));

    let start = Instant::now();
    while editor.pending_tasks() > 1 {
        assert!(start.elapsed() < Duration::from_secs(10), "new highlighter never ran");
        std::thread::sleep(Duration::from_millis(5));
    }
    tx.send(()).unwrap();
    wait_idle(&editor);
    assert_eq!(gated.runs.load(Ordering::SeqCst), 1);
    editor.display();

    let syntax = editor.buffer(id).unwrap().syntax().unwrap();
    assert_eq!(syntax.syntax_id(), "marker");
    assert_eq!(syntax.highlights().len(), 7);
}

#[test]
fn test_removing_buffer_shown_in_two_tabs() {
    let (mut editor, _) = inline_editor();
    let other = editor.init_with_text("other.txt", "o");
    let first_tab = editor.active_tab_window().unwrap().id();

    let shared = editor.get_empty_buffer("shared", BufferFlags::empty());
    let second_tab = editor.add_tab_window();
    editor.split_window(SplitDirection::Vertical, shared).unwrap();
    let third_tab = editor.add_tab_window();
    assert_eq!(editor.active_window().map(|w| w.buffer()), Some(shared));
    assert_eq!(editor.find_buffer_windows(shared).len(), 2);

    assert!(editor.remove_buffer(shared));
    let tabs: Vec<_> = editor.tab_windows().iter().map(|t| t.id()).collect();
    assert_eq!(tabs, vec![first_tab, second_tab]);
    assert!(!tabs.contains(&third_tab));
    assert_eq!(editor.active_tab_window().map(|t| t.id()), Some(second_tab));
    assert_eq!(editor.active_tab_window().unwrap().windows().len(), 1);
    assert_eq!(editor.active_window().map(|w| w.buffer()), Some(other));
}

#[test]
fn test_mru_follows_focus() {
    let (mut editor, _) = inline_editor();
    let a = editor.init_with_text("a", "");
    let b = editor.get_empty_buffer("b", BufferFlags::empty());
    assert_eq!(editor.get_mru_buffer(), Some(a));

    let window = editor.active_window().unwrap().id();
    editor.split_window(SplitDirection::Horizontal, b).unwrap();
    assert_eq!(editor.get_mru_buffer(), Some(b));
    assert!(editor.set_current_window(window));
    assert_eq!(editor.get_mru_buffer(), Some(a));
}

fn assert_sane(rect: palimpsest::Rect) {
    for v in [rect.top_left.x, rect.top_left.y, rect.bottom_right.x, rect.bottom_right.y] {
        assert!(v.is_finite());
    }
    assert!(rect.width() >= 0.0);
    assert!(rect.height() >= 0.0);
}

fn all_rects(editor: &Editor) -> Vec<palimpsest::Rect> {
    let mut rects = vec![
        editor.tab_region(),
        editor.tab_content_region(),
        editor.command_region(),
    ];
    rects.extend(editor.tab_rects().iter().map(|(_, r)| *r));
    for tab in editor.tab_windows() {
        rects.extend(tab.windows().iter().map(|w| w.rect()));
    }
    rects
}

#[test]
fn test_layout_on_degenerate_areas() {
    let (mut editor, _) = inline_editor();
    let id = editor.init_with_text("a", "");
    editor.split_window(SplitDirection::Vertical, id).unwrap();
    editor.split_window(SplitDirection::Horizontal, id).unwrap();
    editor.add_tab_window();

    for (tl, br) in [
        (Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0)),
        (Vec2::new(100.0, 100.0), Vec2::new(0.0, 0.0)),
        (Vec2::new(f32::NAN, 0.0), Vec2::new(f32::INFINITY, 50.0)),
    ] {
        editor.set_display_region(tl, br);
        let first = all_rects(&editor);
        first.iter().copied().for_each(assert_sane);
        editor.update_size();
        assert_eq!(first, all_rects(&editor));
    }
}

#[test]
fn test_layout_fills_display() {
    let (mut editor, _) = inline_editor();
    let id = editor.init_with_text("a", "");
    editor.set_display_region(Vec2::new(0.0, 0.0), Vec2::new(400.0, 300.0));
    editor.split_window(SplitDirection::Vertical, id).unwrap();

    let content = editor.tab_content_region();
    let tab = editor.active_tab_window().unwrap();
    let widths: f32 = tab.windows().iter().map(|w| w.rect().width()).sum();
    assert_eq!(widths, content.width());
    assert!(tab.windows().iter().all(|w| w.rect().height() == content.height()));
}

#[test]
fn test_malformed_config_yields_defaults() {
    let (mut editor, fs) = inline_editor();
    let (rec, _) = recorder(&editor);
    fs.insert("/cfg/other.json", "{ broken");
    editor.load_config("/cfg/other.json");
    assert_eq!(editor.config(), &palimpsest::EditorConfig::default());
    assert!(fs.contents("/cfg/other.bak").is_some());
    assert!(rec.borrow().seen.contains(&Msg::ConfigChanged));

    editor.load_config_table(&json!({ "show_scroll_bar": 7, "background_fade_time": -1.0 }));
    assert_eq!(editor.config().show_scroll_bar, 1);
    assert_eq!(editor.config().background_fade_time, 60.0);
}

#[test]
fn test_config_round_trip_through_editor() {
    let (mut editor, fs) = inline_editor();
    editor.load_config_table(&json!({ "show_line_numbers": false }));
    editor.save_config("/cfg/saved.json").unwrap();
    assert!(fs.exists(Path::new("/cfg/saved.json")));

    let (mut other, _) = inline_editor();
    let table = editor.save_config_table();
    other.load_config_table(&table);
    assert!(!other.config().show_line_numbers);
}

#[test]
fn test_theme_change_rebuilds_highlighters() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/work/lib.rs", "fn main() {}\n");
    let id = editor.get_file_buffer("/work/lib.rs", BufferFlags::empty(), true).unwrap();
    let generation = editor.buffer(id).unwrap().syntax_generation();

    editor.load_config_table(&json!({ "syntax_theme": "InspiredGitHub" }));
    assert_eq!(editor.syntax_registry().theme(), "InspiredGitHub");
    let buffer = editor.buffer(id).unwrap();
    assert!(buffer.syntax_generation() > generation);
    let syntax = buffer.syntax().unwrap();
    assert_eq!(syntax.analyzed_version(), Some(buffer.version()));
    assert!(!syntax.highlights().is_empty());

    let generation = buffer.syntax_generation();
    editor.load_config_table(&json!({ "syntax_theme": "InspiredGitHub" }));
    assert_eq!(editor.buffer(id).unwrap().syntax_generation(), generation);
}

#[test]
fn test_config_loaded_at_startup() {
    let fs = MemoryFileSystem::new();
    fs.insert(CONFIG, r#"{ "style": "Minimal" }"#);
    let editor = EditorBuilder::new("/work")
        .flags(EditorFlags::DISABLE_THREADS)
        .file_system(fs)
        .config_path(CONFIG)
        .build();
    assert_eq!(editor.config().style, palimpsest::config::EditorStyle::Minimal);
}

#[test]
fn test_file_change_reloads_or_flags() {
    let (mut editor, fs) = inline_editor();
    let (rec, _) = recorder(&editor);
    fs.insert("/work/a.txt", "v1");
    let id = editor.get_file_buffer("/work/a.txt", BufferFlags::empty(), true).unwrap();
    let version = editor.buffer(id).unwrap().version();

    fs.insert("/work/a.txt", "v2");
    editor.on_file_changed("/work/a.txt");
    let buffer = editor.buffer(id).unwrap();
    assert_eq!(buffer.contents(), "v2");
    assert!(buffer.version() > version);
    assert!(!buffer.is_dirty());

    editor.edit_buffer(id, |b| b.insert(0, "local "));
    fs.insert("/work/a.txt", "v3");
    editor.on_file_changed("/work/a.txt");
    let buffer = editor.buffer(id).unwrap();
    assert_eq!(buffer.contents(), "local v2");
    assert!(buffer.has_flag(BufferFlags::EXTERNALLY_MODIFIED));

    editor.on_file_changed("/work/unknown.txt");
    let events = rec.borrow().buffer_events.clone();
    assert!(events.contains(&BufferEvent::Reloaded));
    assert!(events.contains(&BufferEvent::ExternallyModified));
}

#[test]
fn test_save_buffer_paths() {
    let (mut editor, fs) = inline_editor();
    let id = editor.get_file_buffer("/work/out.txt", BufferFlags::empty(), true).unwrap();
    editor.edit_buffer(id, |b| b.insert(0, "data"));
    editor.save_buffer(id).unwrap();
    assert_eq!(fs.contents("/work/out.txt").as_deref(), Some("data"));
    let buffer = editor.buffer(id).unwrap();
    assert!(!buffer.is_dirty());
    assert!(buffer.last_saved().is_some());

    fs.set_fail_writes(true);
    editor.edit_buffer(id, |b| b.insert(4, "!"));
    assert!(editor.save_buffer(id).is_err());
    assert!(editor.buffer(id).unwrap().is_dirty());

    let scratch = editor.get_empty_buffer("scratch", BufferFlags::empty());
    assert!(editor.save_buffer(scratch).is_err());
    let locked = editor.get_file_buffer("/work/ro.txt", BufferFlags::READ_ONLY, true).unwrap();
    assert!(editor.save_buffer(locked).is_err());
}

#[test]
fn test_set_buffer_path_keeps_paths_unique() {
    let (mut editor, _) = inline_editor();
    let a = editor.get_file_buffer("/work/a.txt", BufferFlags::empty(), true).unwrap();
    let b = editor.get_file_buffer("/work/b.txt", BufferFlags::empty(), true).unwrap();
    assert!(!editor.set_buffer_path(b, "/work/a.txt"));
    assert!(editor.set_buffer_path(b, "/work/c.rs"));
    assert_eq!(editor.get_file_buffer("/work/c.rs", BufferFlags::empty(), false), Some(b));
    assert!(editor.buffer(b).unwrap().syntax().is_some());
    assert_eq!(editor.get_file_buffer("/work/a.txt", BufferFlags::empty(), false), Some(a));
}

#[test]
fn test_directory_opens_listing() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/proj/src/main.rs", "");
    fs.insert("/proj/Cargo.toml", "");
    let id = editor.init_with_file_or_dir("/proj");
    let buffer = editor.buffer(id).unwrap();
    assert_eq!(buffer.buffer_type(), BufferType::Listing);
    assert!(buffer.has_flag(BufferFlags::READ_ONLY));
    assert_eq!(buffer.contents(), "Cargo.toml\nsrc/");
    assert_eq!(editor.root(), Path::new("/proj"));
    assert_eq!(editor.active_window().map(|w| w.buffer()), Some(id));
}

#[test]
fn test_vim_command_line_writes_file() {
    let (mut editor, fs) = inline_editor();
    fs.insert("/work/notes.txt", "body");
    editor.init_with_file_or_dir("/work/notes.txt");
    type_text(&mut editor, "iX");
    editor.handle_key(key(KeyCode::Esc));
    type_text(&mut editor, ":w");
    assert_eq!(editor.command_text(), ":w");
    editor.handle_key(key(KeyCode::Enter));
    assert_eq!(fs.contents("/work/notes.txt").as_deref(), Some("Xbody"));
    assert_eq!(editor.command_text(), "\"notes.txt\" written");
}

#[test]
fn test_component_can_claim_commands() {
    struct Claim;
    impl Component for Claim {
        fn notify(&mut self, message: &mut Message, _bus: &MessageBus) {
            if message.kind == Msg::HandleCommand && message.text == "tabnew" {
                message.handled = true;
            }
        }
    }
    let (mut editor, _) = inline_editor();
    let claim: ComponentRef = Rc::new(RefCell::new(Claim));
    editor.register_callback(claim);
    assert!(editor.execute_command("tabnew"));
    assert!(editor.tab_windows().is_empty());
}

#[test]
fn test_special_windows() {
    let (mut editor, _) = inline_editor();
    editor.init_with_text("main.txt", "");

    let repl = editor.add_repl().unwrap();
    let repl_buffer = editor.window(repl).unwrap().buffer();
    assert_eq!(editor.buffer(repl_buffer).unwrap().buffer_type(), BufferType::Repl);
    assert_eq!(editor.window(repl).unwrap().fixed_mode(), Some("standard"));
    assert_eq!(editor.current_mode_name(), "standard");

    let search = editor.add_search().unwrap();
    assert_eq!(editor.window(search).unwrap().fixed_mode(), Some("search"));
    assert_eq!(editor.active_tab_window().unwrap().windows().len(), 3);

    let tabs_before = editor.tab_windows().len();
    editor.add_orca();
    assert_eq!(editor.tab_windows().len(), tabs_before + 1);
    let grid = editor.active_window().unwrap().buffer();
    let buffer = editor.buffer(grid).unwrap();
    assert_eq!(buffer.buffer_type(), BufferType::DataGrid);
    assert_eq!(buffer.line_count(), 20);
    assert!(buffer.contents().lines().all(|l| l.len() == 60 && l.chars().all(|c| c == '.')));

    let second = editor.add_repl().unwrap();
    assert_ne!(editor.window(second).unwrap().buffer(), repl_buffer);
}

#[test]
fn test_mouse_selects_tab_and_window() {
    let (mut editor, _) = inline_editor();
    editor.set_display_region(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0));
    let id = editor.init_with_text("a", "");
    let first_tab = editor.active_tab_window().unwrap().id();
    let left = editor.active_window().unwrap().id();
    editor.split_window(SplitDirection::Vertical, id).unwrap();
    editor.add_tab_window();

    // Left half of the tab bar is the first tab.
    assert!(editor.on_mouse_down(Vec2::new(10.0, 5.0), MouseButton::Left));
    assert_eq!(editor.active_tab_window().map(|t| t.id()), Some(first_tab));
    assert_eq!(editor.mouse_pos(), Vec2::new(10.0, 5.0));

    let y = editor.tab_content_region().top_left.y + 10.0;
    assert!(editor.on_mouse_down(Vec2::new(10.0, y), MouseButton::Left));
    assert_eq!(editor.active_window().map(|w| w.id()), Some(left));
    assert!(!editor.on_mouse_up(Vec2::new(10.0, y), MouseButton::Left));
}

#[test]
fn test_clipboard_through_component() {
    let (mut editor, _) = inline_editor();
    let (rec, _) = recorder(&editor);
    assert!(!editor.read_clipboard());

    rec.borrow_mut().answer = Some("pasted".into());
    assert!(editor.read_clipboard());
    for name in ['"', '*', '+'] {
        assert_eq!(editor.get_register(name).text, "pasted");
    }

    editor.set_register_text('"', "out");
    editor.write_clipboard();
    assert!(rec.borrow().seen.contains(&Msg::SetClipBoard));
    assert_eq!(editor.get_register('+').text, "out");
}

#[test]
fn test_clipboard_installed() {
    let fs = MemoryFileSystem::new();
    let mut editor = EditorBuilder::new("/work")
        .flags(EditorFlags::DISABLE_THREADS)
        .file_system(fs)
        .config_path(CONFIG)
        .clipboard(palimpsest::LocalClipboard::new())
        .build();
    editor.set_register_text('"', "copied");
    assert!(editor.write_clipboard());
    editor.set_register_text('"', "");
    assert!(editor.read_clipboard());
    assert_eq!(editor.get_register('"').text, "copied");
}

#[test]
fn test_quit_can_be_vetoed() {
    struct Veto;
    impl Component for Veto {
        fn notify(&mut self, message: &mut Message, _bus: &MessageBus) {
            if message.kind == Msg::RequestQuit {
                message.handled = true;
            }
        }
    }
    let (mut editor, _) = inline_editor();
    let veto: ComponentRef = Rc::new(RefCell::new(Veto));
    let id = editor.register_callback(veto);
    editor.request_quit();
    assert!(!editor.should_quit());

    editor.unregister_callback(id);
    editor.request_quit();
    assert!(editor.should_quit());
}

#[test]
fn test_key_without_windows_creates_tab() {
    let (mut editor, _) = inline_editor();
    assert!(editor.handle_key(key(KeyCode::Char('i'))));
    type_text(&mut editor, "hi");
    assert_eq!(editor.tab_windows().len(), 1);
    let buffer = editor.active_window().unwrap().buffer();
    assert_eq!(editor.buffer(buffer).unwrap().contents(), "hi");
    assert!(editor.last_edit_elapsed() < Duration::from_secs(5));
}
