//! C code generation
//!
//! Emits portable C (C99 plus GCC statement-expressions) from the AST as
//! plain text, indented four spaces per level. Emission is a
//! synchronous depth-first walk over the tree; the only mutable state is
//! the `Codegen` struct itself.
//!
//! # Key invariants
//!
//! - Expression emitters always produce a complete C expression; anything
//!   containing an operator is fully parenthesised, so source evaluation
//!   order is independent of C precedence.
//! - Primitive operators applied at the arity the table declares are always
//!   lowered through their fixed template; they never fall through to a
//!   generic call. A wrong arity falls through with a gated warning.
//! - Failures short-circuit to the caller via `?`; diagnostics explain the
//!   failure, and the partially filled buffer is discarded, never written.
//! - Emitting the same tree twice produces byte-identical output.
//!
//! # Module structure
//!
//! - `state.rs`: the `Codegen` struct, indentation, escaping helpers
//! - `expr.rs`: expression dispatch, literals, calls
//! - `special.rs`: begin/let/do/lambda/define/set lowering
//! - `primitives.rs`: the static primitive table and its templates
//! - `program.rs`: whole-file assembly and the generated `main`
//! - `runtime.rs`: prologue text and the runtime symbol contract
//! - `error.rs`: error types

mod error;
mod expr;
pub(crate) mod primitives;
mod program;
mod runtime;
mod special;
mod state;

pub use error::CodegenError;
pub use state::Codegen;
