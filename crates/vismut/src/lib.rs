//! Compiler front-end and middle-end for the Vismut language.
//!
//! The pipeline is strictly linear: lexical analysis, recursive-descent
//! Pratt parsing with lexical scope construction, type inference and
//! checking with implicit coercion insertion, and AST rewriting
//! optimizations (constant folding, algebraic identities, dead-cast
//! elimination, branch folding). All four stages share a single
//! arena-allocated AST and scope tree; each stage consumes the fully
//! finished output of the previous one and the first error short-circuits
//! the run.
//!
//! [`compile`] runs the whole pipeline. The individual stages
//! ([`parse::parse`], [`analyze::analyze`], [`optimize::optimize`]) and the
//! back-end surface ([`emit::Emitter`], [`dump::dump`]) are public for
//! tools and tests.

pub mod analyze;
pub mod arena;
pub mod ast;
pub mod dump;
pub mod emit;
pub mod error;
pub mod intern;
pub mod optimize;
pub mod parse;
pub mod position;
pub mod report;
pub mod scope;
pub mod token;
pub mod tokenizer;
pub mod typing;
pub mod value;

pub use crate::{
    ast::{Ast, NodeId},
    emit::{CEmitter, Emitter},
    error::{CompileError, ErrorDetail, ErrorKind},
    parse::ParsedModule,
    token::Span,
    value::{Value, ValueType},
};

/// A fully compiled module: parsed, analyzed, and optimized.
#[derive(Debug)]
pub struct Compilation {
    pub ast: Ast,
    pub module: NodeId,
}

impl Compilation {
    /// The human-readable AST dump.
    #[must_use]
    pub fn dump(&self) -> String {
        dump::dump(&self.ast, self.module)
    }

    /// Emits the module through the given backend.
    pub fn emit(&self, emitter: &mut dyn Emitter) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        emitter.emit(&self.ast, self.module, &mut out)?;
        Ok(out)
    }

    /// Emits the module as standard C.
    pub fn emit_c(&self) -> Result<String, std::fmt::Error> {
        self.emit(&mut CEmitter::new())
    }
}

/// Runs tokenize, parse, analyze, and optimize over `source`.
pub fn compile(source: &[u8], module_name: &str) -> Result<Compilation, CompileError> {
    let parsed = parse::parse(source, module_name)?;
    let mut ast = parsed.ast;
    analyze::analyze(&mut ast, parsed.module)?;
    optimize::optimize(&mut ast, parsed.module)?;
    Ok(Compilation {
        ast,
        module: parsed.module,
    })
}
