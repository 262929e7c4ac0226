// Palimpsest library exports

pub mod buffer;
pub mod buffer_manager;
pub mod clipboard;
pub mod config;
pub mod display;
pub mod editor;
pub mod file_system;
pub mod layout;
pub mod message;
pub mod mode;
pub mod refresh;
pub mod registers;
pub mod search_mode;
pub mod standard_mode;
pub mod syntax;
pub mod task_pool;
pub mod vim_mode;
pub mod window_manager;

pub use buffer::{Buffer, BufferFlags, BufferId, BufferType};
pub use clipboard::{Clipboard, LocalClipboard};
pub use config::EditorConfig;
pub use display::{Display, FixedDisplay};
pub use editor::{Editor, EditorBuilder, EditorFlags};
pub use file_system::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use layout::{Rect, SplitDirection, Vec2};
pub use message::{Component, Message, MessageBus, Msg};
pub use mode::{Mode, ModeContext};
pub use registers::{Register, Registers};
pub use window_manager::{TabId, Window, WindowId};
