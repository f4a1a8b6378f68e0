//! Lazy iterator adapter chain (spec.md §4.3): `filter`, `map`,
//! `mapWithIndex`, `flatMap`, `limit`, `skip`, `unique`, `grouped`, `sort`,
//! plus the `support` plumbing and terminal consumers they all funnel into.

mod filter;
mod flat_map;
mod grouped;
mod limit;
mod map;
mod skip;
mod sort;
pub mod support;
mod terminal;
mod unique;

pub use filter::FilterAdapter;
pub use flat_map::FlatMapAdapter;
pub use grouped::GroupedAdapter;
pub use limit::LimitAdapter;
pub use map::MapAdapter;
pub use skip::SkipAdapter;
pub use sort::SortAdapter;
pub use support::{make_iterator, chain_self, GeneratorIterator, ListIterator, ScriptFn};
pub use terminal::{collect, collect_entries, each, join, reduce, sum};
pub use unique::UniqueAdapter;
