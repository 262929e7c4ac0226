//! System clipboard access.

use anyhow::Result;

/// Bridge between the default register and an OS clipboard.
pub trait Clipboard {
    fn read(&mut self) -> Result<String>;
    fn write(&mut self, text: &str) -> Result<()>;
}

/// In-process clipboard for embedders without OS access.
#[derive(Debug, Default, Clone)]
pub struct LocalClipboard {
    contents: String,
}

impl LocalClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for LocalClipboard {
    fn read(&mut self) -> Result<String> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.contents = text.to_string();
        Ok(())
    }
}
