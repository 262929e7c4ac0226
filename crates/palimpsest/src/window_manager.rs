//! Windows, the tabs that hold them, and tab navigation.

use std::collections::BTreeMap;
use std::fmt;

use crate::buffer::BufferId;
use crate::layout::{Rect, Split, SplitDirection, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Window({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tab({})", self.0)
    }
}

/// A view onto one buffer.
#[derive(Debug, Clone)]
pub struct Window {
    id: WindowId,
    buffer: BufferId,
    cursor: usize,
    fixed_mode: Option<String>,
    rect: Rect,
}

impl Window {
    pub fn new(id: WindowId, buffer: BufferId) -> Self {
        Self {
            id,
            buffer,
            cursor: 0,
            fixed_mode: None,
            rect: Rect::default(),
        }
    }

    pub fn with_fixed_mode(mut self, mode: impl Into<String>) -> Self {
        self.fixed_mode = Some(mode.into());
        self
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub(crate) fn set_buffer(&mut self, buffer: BufferId) {
        self.buffer = buffer;
        self.cursor = 0;
    }

    /// Cursor as a char offset into the buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Mode that handles input for this window regardless of the global mode.
    pub fn fixed_mode(&self) -> Option<&str> {
        self.fixed_mode.as_deref()
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRemoval {
    Removed,
    /// The window is the tab's only one; the caller removes the tab instead.
    LastWindow,
    NotFound,
}

/// One tab: a split tree of windows and the window that has focus.
#[derive(Debug, Clone)]
pub struct TabWindow {
    id: TabId,
    root: Split,
    windows: BTreeMap<WindowId, Window>,
    active_window: WindowId,
    rect: Rect,
}

impl TabWindow {
    fn new(id: TabId, window: Window) -> Self {
        let window_id = window.id;
        let mut windows = BTreeMap::new();
        windows.insert(window_id, window);
        Self {
            id,
            root: Split::leaf(window_id),
            windows,
            active_window: window_id,
            rect: Rect::default(),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn root(&self) -> &Split {
        &self.root
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Windows in reading order.
    pub fn windows(&self) -> Vec<&Window> {
        self.root
            .window_ids()
            .into_iter()
            .filter_map(|id| self.windows.get(&id))
            .collect()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn active_window(&self) -> WindowId {
        self.active_window
    }

    pub fn set_active_window(&mut self, id: WindowId) -> bool {
        if self.windows.contains_key(&id) {
            self.active_window = id;
            true
        } else {
            false
        }
    }

    /// Splits `target`, placing `window` below or to the right of it.
    pub fn split(&mut self, target: WindowId, window: Window, direction: SplitDirection, ratio: f32) -> bool {
        let id = window.id;
        if !self.root.split_window(target, id, direction, ratio) {
            return false;
        }
        self.windows.insert(id, window);
        self.layout(self.rect);
        true
    }

    pub fn remove_window(&mut self, id: WindowId) -> TabRemoval {
        if !self.windows.contains_key(&id) {
            return TabRemoval::NotFound;
        }
        if self.windows.len() == 1 {
            return TabRemoval::LastWindow;
        }
        let before = self.root.window_ids();
        if !self.root.remove_window(id) {
            return TabRemoval::NotFound;
        }
        self.windows.remove(&id);
        if self.active_window == id {
            let pos = before.iter().position(|w| *w == id).unwrap_or(0);
            let after = self.root.window_ids();
            self.active_window = if pos > 0 { before[pos - 1] } else { after[0] };
        }
        self.layout(self.rect);
        TabRemoval::Removed
    }

    /// Places every window inside `area`.
    pub fn layout(&mut self, area: Rect) {
        self.rect = area;
        for (id, rect) in self.root.layout(area) {
            if let Some(window) = self.windows.get_mut(&id) {
                window.rect = rect;
            }
        }
    }

    pub fn window_at(&self, pos: Vec2) -> Option<WindowId> {
        self.windows
            .values()
            .find(|w| w.rect.contains(pos))
            .map(|w| w.id)
    }

    pub fn windows_for_buffer(&self, buffer: BufferId) -> Vec<WindowId> {
        self.root
            .window_ids()
            .into_iter()
            .filter(|id| self.windows.get(id).is_some_and(|w| w.buffer == buffer))
            .collect()
    }
}

/// Every tab in creation order plus the active one.
#[derive(Debug, Default)]
pub struct WindowManager {
    tabs: Vec<TabWindow>,
    active: Option<TabId>,
    next_tab: u64,
    next_window: u64,
}

impl WindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        id
    }

    /// Opens a tab with one window on `buffer` and makes it active.
    pub fn add_tab(&mut self, buffer: BufferId) -> TabId {
        let window = Window::new(self.new_window_id(), buffer);
        self.add_tab_with(window)
    }

    pub fn add_tab_with(&mut self, window: Window) -> TabId {
        let id = TabId(self.next_tab);
        self.next_tab += 1;
        self.tabs.push(TabWindow::new(id, window));
        self.active = Some(id);
        log::debug!("Opened {}", id);
        id
    }

    /// Removes `tab`. If it was active, the previous tab becomes active,
    /// else the next one.
    pub fn remove_tab(&mut self, tab: TabId) -> bool {
        let Some(pos) = self.tabs.iter().position(|t| t.id == tab) else {
            return false;
        };
        self.tabs.remove(pos);
        if self.active == Some(tab) {
            let fallback = if pos > 0 { pos - 1 } else { 0 };
            self.active = self.tabs.get(fallback).map(|t| t.id);
        }
        log::debug!("Closed {}", tab);
        true
    }

    pub fn tabs(&self) -> &[TabWindow] {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut [TabWindow] {
        &mut self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tab(&self, id: TabId) -> Option<&TabWindow> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tab_mut(&mut self, id: TabId) -> Option<&mut TabWindow> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active_tab(&self) -> Option<&TabWindow> {
        self.active.and_then(|id| self.tab(id))
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut TabWindow> {
        let id = self.active?;
        self.tab_mut(id)
    }

    pub fn set_active_tab(&mut self, id: TabId) -> bool {
        if self.tab(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    fn step(&mut self, forward: bool) -> Option<TabId> {
        let count = self.tabs.len();
        let current = self.active?;
        let pos = self.tabs.iter().position(|t| t.id == current)?;
        let next = if forward {
            (pos + 1) % count
        } else {
            (pos + count - 1) % count
        };
        self.active = Some(self.tabs[next].id);
        self.active
    }

    pub fn next_tab(&mut self) -> Option<TabId> {
        self.step(true)
    }

    pub fn previous_tab(&mut self) -> Option<TabId> {
        self.step(false)
    }

    pub fn tab_of_window(&self, window: WindowId) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|t| t.windows.contains_key(&window))
            .map(|t| t.id)
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.tabs.iter().find_map(|t| t.window(id))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.tabs.iter_mut().find_map(|t| t.window_mut(id))
    }

    pub fn active_window_id(&self) -> Option<WindowId> {
        self.active_tab().map(|t| t.active_window)
    }

    pub fn active_window(&self) -> Option<&Window> {
        self.active_tab().and_then(|t| t.window(t.active_window))
    }

    pub fn active_window_mut(&mut self) -> Option<&mut Window> {
        let tab = self.active_tab_mut()?;
        let id = tab.active_window;
        tab.window_mut(id)
    }

    /// Every window showing `buffer`, tab by tab.
    pub fn find_buffer_windows(&self, buffer: BufferId) -> Vec<WindowId> {
        self.tabs
            .iter()
            .flat_map(|t| t.windows_for_buffer(buffer))
            .collect()
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.active = None;
    }
}
