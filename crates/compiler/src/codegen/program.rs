//! Program emission
//!
//! Assembles the whole C file: fixed prologue, file-scope globals, function
//! prototypes, hoisted function definitions, and a generated `main` that
//! initialises the shared arena, runs deferred global initialisers and
//! top-level expressions in source order, and invokes the explicit entry
//! point when the program defines one.

use std::fmt::Write as _;

use super::runtime::PROLOGUE;
use super::{Codegen, CodegenError};
use crate::ast::{AstKind, AstNode};
use crate::diagnostics::Category;
use crate::intern::Symbol;

/// Arena size handed to `arena_create` in the generated `main`.
const EMITTED_ARENA_BYTES: usize = 1024 * 1024;

impl<'a> Codegen<'a> {
    /// Emit the complete translation unit for a parsed program.
    ///
    /// Consumes the emitter; the returned buffer is the whole file. On
    /// failure nothing is handed back, so callers never see partial output.
    pub fn generate_program(
        mut self,
        items: &'a [&'a AstNode<'a>],
    ) -> Result<String, CodegenError> {
        let mut top_exprs: Vec<&'a AstNode<'a>> = Vec::new();
        let mut deferred: Vec<(Symbol, &'a AstNode<'a>)> = Vec::new();
        let mut has_entry = false;

        for item in items {
            let emitted = self.emit_top_level(item, &mut top_exprs, &mut deferred, &mut has_entry);
            if let Err(e) = emitted {
                self.diagnostics.error(
                    Category::ChildEmissionFailed,
                    item.loc,
                    "failed to emit top-level form",
                );
                return Err(e);
            }
        }

        if let Err(e) = self.emit_main(&top_exprs, &deferred, has_entry) {
            self.diagnostics.error(
                Category::ChildEmissionFailed,
                crate::ast::Loc::dummy(),
                "failed to emit program entry point",
            );
            return Err(e);
        }

        // Assembly order keeps the file valid C: globals before the lambda
        // definitions that may read them, prototypes before all bodies.
        let mut c = String::new();
        c.push_str(PROLOGUE);
        c.push('\n');
        if !self.globals.is_empty() {
            c.push_str(&self.globals);
            c.push('\n');
        }
        if !self.protos.is_empty() {
            c.push_str(&self.protos);
            c.push('\n');
        }
        c.push_str(&self.lambda_defs);
        c.push_str(&self.output);
        Ok(c)
    }

    fn emit_top_level(
        &mut self,
        item: &'a AstNode<'a>,
        top_exprs: &mut Vec<&'a AstNode<'a>>,
        deferred: &mut Vec<(Symbol, &'a AstNode<'a>)>,
        has_entry: &mut bool,
    ) -> Result<(), CodegenError> {
        let AstKind::Define { name, value } = &item.kind else {
            // Non-define forms run inside the generated main, in order.
            top_exprs.push(item);
            return Ok(());
        };

        if let AstKind::Lambda { params, body } = &value.kind {
            // A Skema `main` cannot share a name with the C entry point.
            let fn_name = if self.name(*name) == "main" {
                *has_entry = true;
                "skm_main"
            } else {
                self.name(*name)
            };
            return self.emit_hoisted_function(fn_name, params, body, false);
        }

        let ty = self.ctype(value);
        let global = self.name(*name);
        if matches!(
            value.kind,
            AstKind::Number(_) | AstKind::Boolean(_) | AstKind::Character(_) | AstKind::String(_)
        ) {
            // Constant initialiser: emit in place.
            let init = self.capture(|cg| cg.emit_expression(value))?;
            writeln!(self.globals, "{} {} = {};", ty.c_name(), global, init)?;
        } else {
            // C globals need constant initialisers; declare here, assign at
            // the top of main.
            writeln!(self.globals, "{} {};", ty.c_name(), global)?;
            deferred.push((*name, *value));
        }
        Ok(())
    }

    fn emit_main(
        &mut self,
        top_exprs: &[&'a AstNode<'a>],
        deferred: &[(Symbol, &'a AstNode<'a>)],
        has_entry: bool,
    ) -> Result<(), CodegenError> {
        self.in_function = true;
        self.set_indent_level(0);
        self.output.push_str("int main(int argc, char** argv) {\n");
        self.indent();
        self.write_indent()?;
        self.output.push_str("(void)argc;\n");
        self.write_indent()?;
        self.output.push_str("(void)argv;\n");
        self.write_indent()?;
        writeln!(self.output, "arena = arena_create({});", EMITTED_ARENA_BYTES)?;
        self.write_indent()?;
        self.output.push_str("if (!arena) {\n");
        self.indent();
        self.write_indent()?;
        self.output
            .push_str("fprintf(stderr, \"error: failed to create arena\\n\");\n");
        self.write_indent()?;
        self.output.push_str("return 1;\n");
        self.dedent();
        self.write_indent()?;
        self.output.push_str("}\n");

        for (name, value) in deferred {
            self.write_indent()?;
            let global = self.name(*name);
            write!(self.output, "{} = ", global)?;
            self.emit_expression(value)?;
            self.output.push_str(";\n");
        }
        for expr in top_exprs {
            self.write_indent()?;
            self.emit_sequence_item(expr)?;
            self.output.push_str(";\n");
        }
        if has_entry {
            self.write_indent()?;
            self.output.push_str("skm_main();\n");
        }

        self.write_indent()?;
        self.output.push_str("arena_destroy(arena);\n");
        self.write_indent()?;
        self.output.push_str("return 0;\n");
        self.dedent();
        self.output.push_str("}\n");
        self.in_function = false;
        Ok(())
    }
}
