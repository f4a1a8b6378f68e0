//! The embedding surface (spec.md §6): binds `weft-core`'s algorithms and
//! `weft-sdk`'s vocabulary to a host event loop and an externally supplied
//! `Compiler`. An embedder links against this crate, not `weft-core`
//! directly.
//!
//! See SPEC_FULL.md and DESIGN.md for how this splits from `weft-sdk`
//! (vocabulary only) and `weft-core` (the algorithms).

pub mod class_builder;
pub mod compiler;
pub mod engine;
pub mod error;

pub use class_builder::{mandatory_field, optional_field, ClassBuilder};
pub use compiler::{CompiledScript, Compiler};
pub use engine::Engine;
pub use error::{EmbedError, ResolvedLoc};
