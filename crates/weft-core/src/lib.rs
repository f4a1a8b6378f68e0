//! The algorithms that operate on `weft-sdk`'s types: the continuation
//! driver, function/method dispatch, value operations, the lazy iterator
//! adapter chain, the regex pattern cache, and thread-local runtime state.
//!
//! See SPEC_FULL.md and DESIGN.md for how this splits from `weft-sdk`
//! (vocabulary only) and `weft-runtime` (the embedding surface).

pub mod continuation;
#[cfg(feature = "checkpoint")]
pub mod checkpoint;
pub mod iter;
pub mod pattern;
pub mod registry;
pub mod state;
pub mod value_ops;

#[cfg(feature = "checkpoint")]
pub use checkpoint::CheckpointImage;
pub use iter::{
    collect, collect_entries, each, join, make_iterator, reduce, sum, FilterAdapter, FlatMapAdapter, GeneratorIterator,
    GroupedAdapter, LimitAdapter, ListIterator, MapAdapter, ScriptFn, SkipAdapter, SortAdapter, UniqueAdapter,
};
pub use pattern::{LastMatchState, PatternCache};
pub use registry::{CallArgs, FunctionRegistry, WrapperFn};
pub use state::RuntimeState;
pub use value_ops::{compare, contains, ArithmeticOptions};
