//! syntect-backed highlighting of whole texts into per-line styled runs.

use lazy_static::lazy_static;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SynStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
}

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A styled byte range within a single line (line terminator excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub start: usize,
    pub end: usize,
    pub foreground: Rgb,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

pub type LineRuns = Vec<StyledRun>;

/// Highlights whole texts for one syntax/theme pair.
///
/// Holds only names so it can be shared across worker threads; the syntax and
/// theme sets are loaded once per process.
#[derive(Debug, Clone)]
pub struct Highlighter {
    syntax_name: String,
    theme_name: String,
}

impl Highlighter {
    /// Resolves a syntax by file extension (without the dot).
    pub fn for_extension(extension: &str, theme_name: &str) -> Option<Self> {
        let lower = extension.to_lowercase();
        let syntax = if lower == "md" || lower == "markdown" {
            SYNTAX_SET.find_syntax_by_name("Markdown")
        } else {
            SYNTAX_SET
                .find_syntax_by_extension(&lower)
                .or_else(|| SYNTAX_SET.find_syntax_by_token(&lower))
        }?;
        Some(Self::with_syntax(syntax, theme_name))
    }

    /// Resolves a syntax from a file name, falling back to plain text.
    pub fn for_file_name(file_name: &str, theme_name: &str) -> Self {
        let ext = file_name.rsplit('.').next().unwrap_or("");
        Self::for_extension(ext, theme_name)
            .unwrap_or_else(|| Self::with_syntax(SYNTAX_SET.find_syntax_plain_text(), theme_name))
    }

    fn with_syntax(syntax: &SyntaxReference, theme_name: &str) -> Self {
        let theme_name = if THEME_SET.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            log::warn!("Unknown highlight theme '{}', using {}", theme_name, DEFAULT_THEME);
            DEFAULT_THEME.to_string()
        };
        Self {
            syntax_name: syntax.name.clone(),
            theme_name,
        }
    }

    pub fn syntax_name(&self) -> &str {
        &self.syntax_name
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    fn theme(&self) -> Option<&'static Theme> {
        THEME_SET
            .themes
            .get(&self.theme_name)
            .or_else(|| THEME_SET.themes.get(DEFAULT_THEME))
            .or_else(|| THEME_SET.themes.values().next())
    }

    /// Highlights `text` line by line. One entry per line of input.
    pub fn highlight(&self, text: &str) -> Vec<LineRuns> {
        let Some(theme) = self.theme() else {
            return LinesWithEndings::from(text).map(|_| Vec::new()).collect();
        };
        let syntax = SYNTAX_SET
            .find_syntax_by_name(&self.syntax_name)
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, theme);
        LinesWithEndings::from(text)
            .map(|line| {
                let regions = highlighter
                    .highlight_line(line, &SYNTAX_SET)
                    .unwrap_or_else(|_| vec![(SynStyle::default(), line)]);
                to_runs(regions)
            })
            .collect()
    }
}

fn to_runs(regions: Vec<(SynStyle, &str)>) -> LineRuns {
    let mut runs = Vec::with_capacity(regions.len());
    let mut offset = 0;
    for (style, piece) in regions {
        let start = offset;
        offset += piece.len();
        let end = start + piece.trim_end_matches(['\n', '\r']).len();
        if end == start {
            continue;
        }
        let fg = style.foreground;
        runs.push(StyledRun {
            start,
            end,
            foreground: Rgb {
                r: fg.r,
                g: fg.g,
                b: fg.b,
            },
            bold: style.font_style.contains(FontStyle::BOLD),
            italic: style.font_style.contains(FontStyle::ITALIC),
            underline: style.font_style.contains(FontStyle::UNDERLINE),
        });
    }
    runs
}
