//! The embedding surface's unified error type (spec.md §7).
//!
//! `weft-core`/`weft-sdk` only carry a `SourceLoc { source, offset }` — byte
//! offsets, not line/column — since deriving a human excerpt needs the
//! original source text, which the core never retains. `weft-runtime` is
//! the first layer that has both the error and the source text in hand, so
//! it's where that derivation happens.

use weft_sdk::error::{CompileError, DieError, RuntimeError, SourceLoc};

/// Every error an embedder can see out of `Engine::run`/`run_sync`
/// (spec.md §7), with line/column/excerpt resolved against the source text
/// that produced it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbedError {
    #[error("compile error at {loc}: {message}")]
    Compile { message: String, loc: ResolvedLoc },

    #[error("{kind}: {message} (at {loc})")]
    Runtime {
        kind: weft_sdk::error::ErrorKind,
        message: String,
        loc: ResolvedLoc,
    },

    #[error("die: {message} (at {loc})")]
    Die { message: String, loc: ResolvedLoc },

    /// A suspension reached a point `run_sync` cannot drive synchronously
    /// (a non-blocking task registered mid-script). Use `Engine::run`
    /// instead.
    #[error("script suspended on a non-blocking task; run_sync cannot drive this — use run() instead")]
    RequiresAsyncDriver,
}

impl EmbedError {
    pub fn from_compile(err: CompileError, source_text: &str) -> Self {
        EmbedError::Compile {
            loc: ResolvedLoc::resolve(&err.loc, source_text),
            message: err.message,
        }
    }

    pub fn from_runtime(err: RuntimeError, source_text: &str) -> Self {
        EmbedError::Runtime {
            kind: err.kind,
            loc: ResolvedLoc::resolve(&err.loc, source_text),
            message: err.message,
        }
    }

    pub fn from_die(err: DieError, source_text: &str) -> Self {
        EmbedError::Die {
            loc: ResolvedLoc::resolve(&err.loc, source_text),
            message: err.message,
        }
    }
}

/// A `SourceLoc` resolved against its source text: 1-based line/column plus
/// a one-line excerpt with a caret under the offending column.
#[derive(Debug, Clone)]
pub struct ResolvedLoc {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub excerpt: String,
}

impl ResolvedLoc {
    pub fn resolve(loc: &SourceLoc, source_text: &str) -> Self {
        let offset = loc.offset as usize;
        let mut line = 1u32;
        let mut column = 1u32;
        let mut line_start = 0usize;
        for (i, ch) in source_text.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
                line_start = i + 1;
            } else {
                column += 1;
            }
        }
        let excerpt = source_text[line_start..]
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        ResolvedLoc {
            source: loc.source.clone(),
            line,
            column,
            excerpt,
        }
    }
}

impl std::fmt::Display for ResolvedLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_line_and_column_across_newlines() {
        let source = "let x = 1\nlet y = bad\n";
        let loc = SourceLoc::new("main.weft", 12);
        let resolved = ResolvedLoc::resolve(&loc, source);
        assert_eq!(resolved.line, 2);
        assert_eq!(resolved.column, 3);
        assert_eq!(resolved.excerpt, "let y = bad");
    }

    #[test]
    fn resolves_first_line() {
        let source = "oops";
        let loc = SourceLoc::new("main.weft", 0);
        let resolved = ResolvedLoc::resolve(&loc, source);
        assert_eq!(resolved.line, 1);
        assert_eq!(resolved.column, 1);
    }
}
