pub mod highlight;

pub use highlight::{Highlighter, LineRuns, Rgb, StyledRun, DEFAULT_THEME};
