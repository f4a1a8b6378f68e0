//! Regex compilation cache and `=~` last-match state (spec.md §4.5).
//!
//! Grounded on the teacher workspace's `regex` + `once_cell` pairing (used
//! throughout `raya-core` for literal/pattern caches).

use std::cell::RefCell;
use std::rc::Rc;

use regex::Regex;
use rustc_hash::FxHashMap;
use weft_sdk::error::{RuntimeError, SourceLoc};

const DEFAULT_CAPACITY: usize = 256;

/// An LRU-ish cache of compiled patterns keyed by their literal text.
/// Thread-local rather than shared, since compiled `Regex` values aren't
/// meaningfully reused across the single-threaded-per-script execution
/// model (spec.md §5) anyway.
pub struct PatternCache {
    capacity: usize,
    entries: RefCell<FxHashMap<Rc<str>, Regex>>,
    order: RefCell<Vec<Rc<str>>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PatternCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RefCell::new(FxHashMap::default()),
            order: RefCell::new(Vec::new()),
        }
    }

    /// Compiles (or reuses) the pattern `text`, reporting a malformed regex
    /// as a `pattern-error` (spec.md §6 `ErrorKind::PatternError`).
    pub fn get(&self, text: &str, loc: SourceLoc) -> Result<Regex, RuntimeError> {
        if let Some(re) = self.entries.borrow().get(text) {
            return Ok(re.clone());
        }
        let re = Regex::new(text).map_err(|e| RuntimeError::pattern_error(e.to_string(), loc))?;
        self.insert(text, re.clone());
        Ok(re)
    }

    fn insert(&self, text: &str, re: Regex) {
        let key: Rc<str> = Rc::from(text);
        let mut entries = self.entries.borrow_mut();
        let mut order = self.order.borrow_mut();
        if entries.len() >= self.capacity {
            if let Some(oldest) = order.first().cloned() {
                entries.remove(&oldest);
                order.remove(0);
            }
        }
        entries.insert(key.clone(), re);
        order.push(key);
    }
}

/// The state `=~` needs across repeated invocations against the same
/// subject (spec.md §4.5): which match index to resume a "find next" scan
/// from, reset whenever the subject or pattern changes.
#[derive(Default)]
pub struct LastMatchState {
    subject: RefCell<Option<Rc<str>>>,
    pattern: RefCell<Option<Rc<str>>>,
    next_start: RefCell<usize>,
}

impl LastMatchState {
    /// Returns the byte offset to resume scanning `subject` for `pattern`
    /// from, resetting to zero if either changed since the last call.
    pub fn resume_offset(&self, subject: &str, pattern: &str) -> usize {
        let same = self
            .subject
            .borrow()
            .as_deref()
            .map(|s| s == subject)
            .unwrap_or(false)
            && self
                .pattern
                .borrow()
                .as_deref()
                .map(|p| p == pattern)
                .unwrap_or(false);
        if !same {
            *self.subject.borrow_mut() = Some(Rc::from(subject));
            *self.pattern.borrow_mut() = Some(Rc::from(pattern));
            *self.next_start.borrow_mut() = 0;
        }
        *self.next_start.borrow()
    }

    pub fn advance_to(&self, offset: usize) {
        *self.next_start.borrow_mut() = offset;
    }

    pub fn reset(&self) {
        *self.subject.borrow_mut() = None;
        *self.pattern.borrow_mut() = None;
        *self.next_start.borrow_mut() = 0;
    }
}
