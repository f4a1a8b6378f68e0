//! The seam between source text and a runnable script (spec.md §1:
//! lexing/parsing/codegen are out of scope for this crate). `weft-runtime`
//! only needs *something* that turns source text into a callable entry
//! point — how that happens is the embedder's concern.

use std::rc::Rc;

use weft_sdk::continuation::Outcome;
use weft_sdk::error::CompileError;
use weft_sdk::value::Value;

use crate::engine::Engine;

/// A script's entry point, already closed over whatever the compiler needed
/// (constant pool, captured globals, generated function bodies registered
/// against the engine). Opaque by design — `weft-runtime` never inspects
/// what's inside, only calls it.
#[derive(Clone)]
pub struct CompiledScript {
    entry: Rc<dyn Fn(&Engine) -> Outcome<Value>>,
}

impl CompiledScript {
    pub fn new(entry: impl Fn(&Engine) -> Outcome<Value> + 'static) -> Self {
        CompiledScript { entry: Rc::new(entry) }
    }

    pub(crate) fn run(&self, engine: &Engine) -> Outcome<Value> {
        (self.entry)(engine)
    }
}

/// Implemented by whatever external lexer/parser/codegen pipeline an
/// embedder plugs in. `weft-runtime` drives the `CompiledScript` it
/// produces but never constructs one itself.
pub trait Compiler {
    fn compile(&self, source_name: &str, source_text: &str) -> Result<CompiledScript, CompileError>;
}
