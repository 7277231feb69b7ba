//! Codegen state and shared helpers
//!
//! `Codegen` is the mutable emission state carried through the whole walk:
//! the output buffer, the indent level, the statement-vs-expression flag,
//! the lambda-hoisting side buffers, and read-only handles to the arena,
//! the intern table, the diagnostics sink, and the type facts.

use std::fmt::Write as _;

use super::CodegenError;
use crate::arena::Arena;
use crate::ast::AstNode;
use crate::diagnostics::DiagnosticContext;
use crate::intern::{StringTable, Symbol};
use crate::types::{CType, TypeContext};

/// Spaces emitted per indent level.
const INDENT: &str = "    ";

pub struct Codegen<'a> {
    pub(super) arena: &'a Arena,
    pub(super) strings: &'a StringTable,
    pub(super) diagnostics: &'a DiagnosticContext,
    pub(super) types: Option<&'a TypeContext>,
    /// Main output buffer. Written to disk only after the whole program
    /// emitted successfully.
    pub(super) output: String,
    /// File-scope value definitions, assembled ahead of all functions.
    pub(super) globals: String,
    /// Prototypes for named functions and hoisted lambdas.
    pub(super) protos: String,
    /// Hoisted lambda definitions, assembled ahead of named functions.
    pub(super) lambda_defs: String,
    pub(super) lambda_counter: usize,
    indent_level: usize,
    pub(super) in_function: bool,
}

impl<'a> Codegen<'a> {
    /// The arena and diagnostics handles are required; type facts are
    /// optional and everything falls back to the uniform value type without
    /// them.
    pub fn new(
        arena: &'a Arena,
        strings: &'a StringTable,
        diagnostics: &'a DiagnosticContext,
        types: Option<&'a TypeContext>,
    ) -> Self {
        Codegen {
            arena,
            strings,
            diagnostics,
            types,
            output: String::new(),
            globals: String::new(),
            protos: String::new(),
            lambda_defs: String::new(),
            lambda_counter: 0,
            indent_level: 0,
            in_function: false,
        }
    }

    // =========================================================================
    // Indentation
    // =========================================================================

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Saturating: dedent at level zero is a no-op.
    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Absolute indent reset, used when switching between emission buffers.
    pub fn set_indent_level(&mut self, level: usize) {
        self.indent_level = level;
    }

    /// Emit four spaces per indent level.
    pub fn write_indent(&mut self) -> Result<(), CodegenError> {
        for _ in 0..self.indent_level {
            self.output.push_str(INDENT);
        }
        Ok(())
    }

    /// Emitted text so far (tests and assembly).
    pub fn output(&self) -> &str {
        &self.output
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(super) fn name(&self, sym: Symbol) -> &'a str {
        self.strings.resolve(sym)
    }

    /// Generated identifier for a hoisted lambda. Allocated in the arena so
    /// the name outlives the emission call that minted it.
    pub(super) fn fresh_lambda_name(&mut self) -> &'a str {
        let name = self.arena.alloc_str(&format!("__lambda_{}", self.lambda_counter));
        self.lambda_counter += 1;
        name
    }

    /// Inferred C type of an expression, `float` when unknown.
    pub(super) fn ctype(&self, node: &AstNode<'a>) -> CType {
        self.types
            .map(|t| t.infer(self.strings, node))
            .unwrap_or(CType::Float)
    }

    /// Run `f` with a fresh output buffer and hand back what it wrote.
    /// Used to route function bodies into the hoisting side buffers.
    pub(super) fn capture<F>(&mut self, f: F) -> Result<String, CodegenError>
    where
        F: FnOnce(&mut Self) -> Result<(), CodegenError>,
    {
        let saved = std::mem::take(&mut self.output);
        let result = f(self);
        let captured = std::mem::replace(&mut self.output, saved);
        result.map(|_| captured)
    }

    // =========================================================================
    // C literal escaping
    // =========================================================================

    pub(super) fn write_c_string(&mut self, s: &str) -> Result<(), CodegenError> {
        self.output.push('"');
        for c in s.chars() {
            self.push_escaped(c, '"');
        }
        self.output.push('"');
        Ok(())
    }

    pub(super) fn write_c_char(&mut self, c: char) -> Result<(), CodegenError> {
        self.output.push('\'');
        self.push_escaped(c, '\'');
        self.output.push('\'');
        Ok(())
    }

    fn push_escaped(&mut self, c: char, quote: char) {
        match c {
            '\n' => self.output.push_str("\\n"),
            '\t' => self.output.push_str("\\t"),
            '\r' => self.output.push_str("\\r"),
            '\\' => self.output.push_str("\\\\"),
            '\0' => self.output.push_str("\\0"),
            _ if c == quote => {
                self.output.push('\\');
                self.output.push(c);
            }
            _ => self.output.push(c),
        }
    }

    /// Function-pointer declarator for a lambda-valued binding:
    /// `ret (*name)(float, float)`.
    pub(super) fn write_fn_ptr_decl(
        &mut self,
        ret: CType,
        name: &str,
        param_count: usize,
    ) -> Result<(), CodegenError> {
        let params = if param_count == 0 {
            "void".to_string()
        } else {
            vec!["float"; param_count].join(", ")
        };
        write!(self.output, "{} (*{})({})", ret.c_name(), name, params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticContext;

    fn fixture() -> (Arena, StringTable, DiagnosticContext) {
        (Arena::new(), StringTable::new(), DiagnosticContext::new())
    }

    #[test]
    fn test_write_indent_tracks_level() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.indent();
        cg.indent();
        cg.indent();
        cg.dedent();
        cg.write_indent().unwrap();
        // 3 increments, 1 decrement: exactly 4 * 2 spaces.
        assert_eq!(cg.output(), "        ");
    }

    #[test]
    fn test_dedent_saturates_at_zero() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.dedent();
        cg.dedent();
        assert_eq!(cg.indent_level(), 0);
        cg.write_indent().unwrap();
        assert_eq!(cg.output(), "");
    }

    #[test]
    fn test_c_string_escaping() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.write_c_string("a\n\"b\"\\").unwrap();
        assert_eq!(cg.output(), r#""a\n\"b\"\\""#);
    }

    #[test]
    fn test_c_char_escaping() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.write_c_char('\n').unwrap();
        cg.write_c_char('\'').unwrap();
        cg.write_c_char('a').unwrap();
        assert_eq!(cg.output(), r"'\n''\'''a'");
    }

    #[test]
    fn test_fresh_lambda_names_are_sequential() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        assert_eq!(cg.fresh_lambda_name(), "__lambda_0");
        assert_eq!(cg.fresh_lambda_name(), "__lambda_1");
    }

    #[test]
    fn test_fn_ptr_decl() {
        let (arena, strings, diagnostics) = fixture();
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.write_fn_ptr_decl(CType::Float, "f", 2).unwrap();
        assert_eq!(cg.output(), "float (*f)(float, float)");
        let mut cg = Codegen::new(&arena, &strings, &diagnostics, None);
        cg.write_fn_ptr_decl(CType::Float, "thunk", 0).unwrap();
        assert_eq!(cg.output(), "float (*thunk)(void)");
    }
}
