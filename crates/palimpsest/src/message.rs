//! Notification bus shared by every component of the editor.
//!
//! Components register once and receive each broadcast exactly once. Delivery
//! walks a snapshot of the registrations, so a component may unregister itself
//! (or another component) from inside its own callback. A broadcast nested in
//! a callback skips the component that started it (see `Component::notify`).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::buffer::BufferId;
use crate::layout::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Msg {
    HandleCommand,
    RequestQuit,
    GetClipBoard,
    SetClipBoard,
    MouseMove,
    MouseDown,
    MouseUp,
    Buffer,
    ComponentChanged,
    Tick,
    ConfigChanged,
    ToolTip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    #[default]
    Unknown,
}

/// What happened to the buffer named in a `Msg::Buffer` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    Loaded,
    Removed,
    Saved,
    Reloaded,
    ExternallyModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

#[derive(Debug, Clone)]
pub struct Message {
    pub kind: Msg,
    pub text: String,
    pub pos: Vec2,
    pub button: MouseButton,
    pub component: Option<ComponentId>,
    pub buffer: Option<BufferId>,
    pub buffer_event: Option<BufferEvent>,
    /// Set by a receiver; informational only, delivery never stops early.
    pub handled: bool,
}

impl Message {
    pub fn new(kind: Msg) -> Self {
        Self {
            kind,
            text: String::new(),
            pos: Vec2::default(),
            button: MouseButton::Unknown,
            component: None,
            buffer: None,
            buffer_event: None,
            handled: false,
        }
    }

    pub fn with_text(kind: Msg, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(kind)
        }
    }

    pub fn mouse(kind: Msg, pos: Vec2, button: MouseButton) -> Self {
        Self {
            pos,
            button,
            ..Self::new(kind)
        }
    }

    pub fn component(kind: Msg, component: ComponentId) -> Self {
        Self {
            component: Some(component),
            ..Self::new(kind)
        }
    }

    pub fn buffer(buffer: BufferId, event: BufferEvent) -> Self {
        Self {
            buffer: Some(buffer),
            buffer_event: Some(event),
            ..Self::new(Msg::Buffer)
        }
    }
}

/// A receiver of broadcasts. The bus is passed in so a component can
/// unregister during delivery.
pub trait Component {
    /// Called once per broadcast. A broadcast started from inside this call
    /// reaches every other component but not this one, since it is already
    /// borrowed; the nested message is not queued for it later.
    fn notify(&mut self, message: &mut Message, bus: &MessageBus);
}

pub type ComponentRef = Rc<RefCell<dyn Component>>;

#[derive(Default)]
pub struct MessageBus {
    clients: RefCell<BTreeMap<ComponentId, ComponentRef>>,
    next_id: Cell<u64>,
}

fn same_component(a: &ComponentRef, b: &ComponentRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `component`; registering the same instance again returns its
    /// existing id.
    pub fn register_callback(&self, component: ComponentRef) -> ComponentId {
        let mut clients = self.clients.borrow_mut();
        if let Some((id, _)) = clients.iter().find(|(_, c)| same_component(c, &component)) {
            return *id;
        }
        let id = ComponentId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        clients.insert(id, component);
        log::debug!("Registered component {:?}", id);
        id
    }

    /// Returns false when `id` was not registered.
    pub fn unregister_callback(&self, id: ComponentId) -> bool {
        self.clients.borrow_mut().remove(&id).is_some()
    }

    pub fn is_registered(&self, id: ComponentId) -> bool {
        self.clients.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.borrow().is_empty()
    }

    /// Delivers `message` to every component registered when the call started,
    /// in registration order. Returns whether any receiver marked it handled.
    pub fn broadcast(&self, message: &mut Message) -> bool {
        let snapshot: Vec<(ComponentId, ComponentRef)> = self
            .clients
            .borrow()
            .iter()
            .map(|(id, c)| (*id, Rc::clone(c)))
            .collect();

        for (id, client) in snapshot {
            match client.try_borrow_mut() {
                Ok(mut component) => component.notify(message, self),
                // Nested broadcast from inside this component's own callback.
                Err(_) => log::debug!("Skipping re-entrant delivery of {:?} to {:?}", message.kind, id),
            }
        }
        message.handled
    }
}
