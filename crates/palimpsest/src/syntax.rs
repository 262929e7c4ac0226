//! Syntax highlighters and the registry that picks one per buffer.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use hlcore::{Highlighter, LineRuns};
use ropey::Rope;

use crate::buffer::{Buffer, BufferFlags};

/// Per-line styled runs for a whole buffer.
pub type Highlights = Vec<LineRuns>;

/// Extensions that get a syntect-backed provider out of the box.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "md", "markdown", "c", "cpp", "h", "hpp", "py", "js", "json", "sh", "html", "css",
    "yaml", "yml", "go", "java", "lua",
];

/// The part of a highlighter that can run off the main thread. It only ever
/// sees an owned snapshot of the text.
pub trait Analyze: Send + Sync {
    fn analyze(&self, text: &Rope) -> Highlights;
}

/// Highlighter attached to one buffer.
pub trait Syntax {
    fn syntax_id(&self) -> &str;
    fn analyzer(&self) -> Arc<dyn Analyze>;
    /// Stores the result of an analysis of content at `version`.
    fn apply(&mut self, highlights: Highlights, version: u64);
    fn highlights(&self) -> &[LineRuns];
    /// Content version the current highlights were computed from.
    fn analyzed_version(&self) -> Option<u64>;
}

pub struct SyntectAnalyzer {
    highlighter: Highlighter,
}

impl SyntectAnalyzer {
    pub fn new(highlighter: Highlighter) -> Self {
        Self { highlighter }
    }
}

impl Analyze for SyntectAnalyzer {
    fn analyze(&self, text: &Rope) -> Highlights {
        self.highlighter.highlight(&text.to_string())
    }
}

/// Generic `Syntax` that stores whatever its analyzer produces.
pub struct HighlightSyntax {
    id: String,
    analyzer: Arc<dyn Analyze>,
    highlights: Highlights,
    version: Option<u64>,
}

impl HighlightSyntax {
    pub fn new(id: impl Into<String>, analyzer: Arc<dyn Analyze>) -> Self {
        Self {
            id: id.into(),
            analyzer,
            highlights: Vec::new(),
            version: None,
        }
    }
}

impl Syntax for HighlightSyntax {
    fn syntax_id(&self) -> &str {
        &self.id
    }

    fn analyzer(&self) -> Arc<dyn Analyze> {
        Arc::clone(&self.analyzer)
    }

    fn apply(&mut self, highlights: Highlights, version: u64) {
        self.highlights = highlights;
        self.version = Some(version);
    }

    fn highlights(&self) -> &[LineRuns] {
        &self.highlights
    }

    fn analyzed_version(&self) -> Option<u64> {
        self.version
    }
}

pub type SyntaxFactory = Rc<dyn Fn(&Buffer) -> Box<dyn Syntax>>;

#[derive(Clone)]
pub struct SyntaxProvider {
    pub syntax_id: String,
    pub factory: SyntaxFactory,
}

impl SyntaxProvider {
    pub fn new<F>(syntax_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Buffer) -> Box<dyn Syntax> + 'static,
    {
        Self {
            syntax_id: syntax_id.into(),
            factory: Rc::new(factory),
        }
    }

    /// Provider whose highlighters run `highlighter` through syntect.
    pub fn syntect(highlighter: Highlighter) -> Self {
        let id = highlighter.syntax_name().to_string();
        let analyzer: Arc<dyn Analyze> = Arc::new(SyntectAnalyzer::new(highlighter));
        let syntax_id = id.clone();
        Self::new(id, move |_buffer: &Buffer| {
            Box::new(HighlightSyntax::new(syntax_id.clone(), Arc::clone(&analyzer))) as Box<dyn Syntax>
        })
    }
}

impl fmt::Debug for SyntaxProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxProvider")
            .field("syntax_id", &self.syntax_id)
            .finish_non_exhaustive()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('.').to_lowercase()
}

/// File-type key (extension or whole file name) to provider.
#[derive(Default)]
pub struct SyntaxRegistry {
    providers: HashMap<String, SyntaxProvider>,
    /// Keys still served by the bundled syntect providers.
    bundled: HashSet<String>,
    theme: String,
}

impl SyntaxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with syntect providers for `DEFAULT_EXTENSIONS`.
    pub fn with_defaults(theme: &str) -> Self {
        let mut registry = Self::new();
        registry.theme = theme.to_string();
        for ext in DEFAULT_EXTENSIONS {
            match Highlighter::for_extension(ext, theme) {
                Some(highlighter) => {
                    registry.register([*ext], SyntaxProvider::syntect(highlighter));
                    registry.bundled.insert(normalize_key(ext));
                }
                None => log::debug!("No bundled syntax for .{}", ext),
            }
        }
        registry
    }

    /// Theme of the bundled providers; empty for a registry built with `new`.
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Rebuilds the bundled providers with `theme`. Keys taken over by a
    /// registered factory keep it. Returns whether anything changed.
    pub fn set_theme(&mut self, theme: &str) -> bool {
        if self.theme == theme || self.bundled.is_empty() {
            return false;
        }
        self.theme = theme.to_string();
        for key in &self.bundled {
            if let Some(highlighter) = Highlighter::for_extension(key, theme) {
                self.providers.insert(key.clone(), SyntaxProvider::syntect(highlighter));
            }
        }
        log::info!("Syntax theme set to {}", theme);
        true
    }

    /// Later registrations of the same key replace earlier ones.
    pub fn register<I, S>(&mut self, keys: I, provider: SyntaxProvider)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            let key = normalize_key(key.as_ref());
            if key.is_empty() {
                continue;
            }
            self.bundled.remove(&key);
            self.providers.insert(key, provider.clone());
        }
    }

    pub fn provider(&self, key: &str) -> Option<&SyntaxProvider> {
        self.providers.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Tag first, then whole file name, then extension.
    pub fn lookup(&self, buffer: &Buffer) -> Option<&SyntaxProvider> {
        buffer
            .file_type_keys()
            .iter()
            .find_map(|key| self.providers.get(key))
    }

    /// Attaches a fresh highlighter to `buffer`, or clears it when no provider
    /// matches. Returns whether the buffer now has one.
    pub fn assign(&self, buffer: &mut Buffer) -> bool {
        if buffer.has_flag(BufferFlags::DISABLE_SYNTAX) {
            buffer.set_syntax(None);
            return false;
        }
        let syntax = self.lookup(buffer).map(|provider| (provider.factory)(buffer));
        let found = syntax.is_some();
        buffer.set_syntax(syntax);
        found
    }
}
