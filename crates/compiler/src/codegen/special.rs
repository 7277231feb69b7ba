//! Special-form lowering
//!
//! `begin`, the `let` family, `do`, `lambda`, `define`, and `set!` lower to
//! C constructs. Expression-position forms become GCC statement-expressions
//! `({ ...; })`; lambdas hoist to file scope under generated names, with the
//! expression position emitting only the generated identifier.

use std::fmt::Write as _;

use super::{Codegen, CodegenError};
use crate::ast::{AstKind, AstNode, Binding, DoBinding, LetKind, Loc};
use crate::diagnostics::Category;
use crate::intern::Symbol;
use crate::types::CType;

impl<'a> Codegen<'a> {
    /// `({ e1; e2; ...; eN; })` - the last statement's value is the block
    /// value.
    pub(super) fn emit_begin(
        &mut self,
        node: &'a AstNode<'a>,
        body: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        if body.is_empty() {
            self.diagnostics.error(
                Category::MalformedNode,
                node.loc,
                "begin needs at least one expression",
            );
            return Err(CodegenError::Logic("empty begin".to_string()));
        }
        self.output.push_str("({ ");
        for item in body {
            self.emit_sequence_item(item)?;
            self.output.push_str("; ");
        }
        self.output.push_str("})");
        Ok(())
    }

    /// One element of a statement sequence. A `define` in statement context
    /// becomes a plain local declaration; everything else is an expression.
    pub(super) fn emit_sequence_item(&mut self, node: &'a AstNode<'a>) -> Result<(), CodegenError> {
        match &node.kind {
            AstKind::Define { name, value } if self.in_function => {
                self.emit_local_define(*name, value)
            }
            _ => self.emit_expression(node),
        }
    }

    /// `TYPE name = init` (no trailing semicolon; the caller owns statement
    /// punctuation). Lambda initialisers declare a function pointer bound to
    /// the hoisted name.
    fn emit_local_define(
        &mut self,
        name: Symbol,
        value: &'a AstNode<'a>,
    ) -> Result<(), CodegenError> {
        let text = self.name(name);
        if let AstKind::Lambda { params, .. } = &value.kind {
            let ret = self.lambda_return_type(value);
            let count = params.len();
            self.write_fn_ptr_decl(ret, text, count)?;
            self.output.push_str(" = ");
            self.emit_expression(value)?;
        } else {
            let ty = self.ctype(value);
            write!(self.output, "{} {} = ", ty.c_name(), text)?;
            self.emit_expression(value)?;
        }
        Ok(())
    }

    /// `define` in true expression position: bind inside a
    /// statement-expression and yield the bound value.
    pub(super) fn emit_define_expression(
        &mut self,
        name: Symbol,
        value: &'a AstNode<'a>,
    ) -> Result<(), CodegenError> {
        self.output.push_str("({ ");
        self.emit_local_define(name, value)?;
        let text = self.name(name);
        write!(self.output, "; {}; }})", text)?;
        Ok(())
    }

    /// The `let` family. `let` evaluates every initialiser in the
    /// surrounding scope (hidden temporaries), `let*` binds sequentially,
    /// `letrec` declares all names before any initialiser runs.
    pub(super) fn emit_let(
        &mut self,
        kind: LetKind,
        bindings: &'a [Binding<'a>],
        body: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        self.output.push_str("({ ");
        match kind {
            LetKind::Plain => {
                let mut temps: Vec<Option<String>> = Vec::with_capacity(bindings.len());
                for (i, binding) in bindings.iter().enumerate() {
                    // Hoisted lambdas have no evaluation-order hazard.
                    if matches!(binding.init.kind, AstKind::Lambda { .. }) {
                        temps.push(None);
                        continue;
                    }
                    let tmp = format!("__let_tmp{}", i);
                    let ty = self.ctype(binding.init);
                    write!(self.output, "{} {} = ", ty.c_name(), tmp)?;
                    self.emit_expression(binding.init)?;
                    self.output.push_str("; ");
                    temps.push(Some(tmp));
                }
                for (binding, tmp) in bindings.iter().zip(&temps) {
                    match tmp {
                        Some(tmp) => {
                            let ty = self.ctype(binding.init);
                            let name = self.name(binding.name);
                            write!(self.output, "{} {} = {}; ", ty.c_name(), name, tmp)?;
                        }
                        None => {
                            self.emit_local_define(binding.name, binding.init)?;
                            self.output.push_str("; ");
                        }
                    }
                }
            }
            LetKind::Star => {
                for binding in bindings {
                    self.emit_local_define(binding.name, binding.init)?;
                    self.output.push_str("; ");
                }
            }
            LetKind::Rec => {
                for binding in bindings {
                    let name = self.name(binding.name);
                    if let AstKind::Lambda { params, .. } = &binding.init.kind {
                        let ret = self.lambda_return_type(binding.init);
                        let count = params.len();
                        self.write_fn_ptr_decl(ret, name, count)?;
                        self.output.push_str("; ");
                    } else {
                        let ty = self.ctype(binding.init);
                        write!(self.output, "{} {}; ", ty.c_name(), name)?;
                    }
                }
                for binding in bindings {
                    let name = self.name(binding.name);
                    write!(self.output, "{} = ", name)?;
                    self.emit_expression(binding.init)?;
                    self.output.push_str("; ");
                }
            }
        }
        for item in body {
            self.emit_sequence_item(item)?;
            self.output.push_str("; ");
        }
        self.output.push_str("})");
        Ok(())
    }

    /// Iterative `do` form: declare-and-init loop variables, loop while the
    /// test is false, step through temporaries so every step expression sees
    /// the previous iteration's values, then yield the result sequence.
    pub(super) fn emit_do(
        &mut self,
        bindings: &'a [DoBinding<'a>],
        test: &'a AstNode<'a>,
        result: &'a [&'a AstNode<'a>],
        body: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        self.output.push_str("({ ");
        for binding in bindings {
            let ty = self.ctype(binding.init);
            let name = self.name(binding.name);
            write!(self.output, "{} {} = ", ty.c_name(), name)?;
            self.emit_expression(binding.init)?;
            self.output.push_str("; ");
        }
        self.output.push_str("while (!(");
        self.emit_expression(test)?;
        self.output.push_str(")) { ");
        for item in body {
            self.emit_sequence_item(item)?;
            self.output.push_str("; ");
        }
        let mut updates = Vec::new();
        for (i, binding) in bindings.iter().enumerate() {
            let Some(step) = binding.step else { continue };
            let tmp = format!("__do_step{}", i);
            let ty = self.ctype(binding.init);
            write!(self.output, "{} {} = ", ty.c_name(), tmp)?;
            self.emit_expression(step)?;
            self.output.push_str("; ");
            updates.push((binding.name, tmp));
        }
        for (name, tmp) in updates {
            let name = self.name(name);
            write!(self.output, "{} = {}; ", name, tmp)?;
        }
        self.output.push_str("} ");
        if result.is_empty() {
            self.output.push_str("0; ");
        } else {
            for item in result {
                self.emit_sequence_item(item)?;
                self.output.push_str("; ");
            }
        }
        self.output.push_str("})");
        Ok(())
    }

    /// A lambda in expression position: hoist the function, emit its
    /// generated name.
    pub(super) fn emit_lambda_expression(
        &mut self,
        params: &'a [Symbol],
        body: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        let name = self.fresh_lambda_name();
        self.emit_hoisted_function(name, params, body, true)?;
        self.output.push_str(name);
        Ok(())
    }

    /// Return type of a lambda node, from the type facts on its final body
    /// expression.
    pub(super) fn lambda_return_type(&self, node: &'a AstNode<'a>) -> CType {
        match &node.kind {
            AstKind::Lambda { body, .. } => body
                .last()
                .map(|last| self.ctype(last))
                .unwrap_or(CType::Float),
            _ => CType::Float,
        }
    }

    /// Emit a function at file scope: prototype into the prototype buffer,
    /// definition into the hoisted-definition buffer. Used for anonymous
    /// lambdas (`static`, generated name) and named top-level defines.
    pub(super) fn emit_hoisted_function(
        &mut self,
        name: &str,
        params: &'a [Symbol],
        body: &'a [&'a AstNode<'a>],
        is_static: bool,
    ) -> Result<(), CodegenError> {
        if body.is_empty() {
            self.diagnostics.error(
                Category::MalformedNode,
                Loc::dummy(),
                format!("function '{}' has an empty body", name),
            );
            return Err(CodegenError::Logic("empty function body".to_string()));
        }
        let ret = body
            .last()
            .map(|last| self.ctype(last))
            .unwrap_or(CType::Float);

        let mut sig = String::new();
        if is_static {
            sig.push_str("static ");
        }
        sig.push_str(ret.c_name());
        sig.push(' ');
        sig.push_str(name);
        sig.push('(');
        if params.is_empty() {
            sig.push_str("void");
        } else {
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    sig.push_str(", ");
                }
                sig.push_str("float ");
                sig.push_str(self.name(*param));
            }
        }
        sig.push(')');

        self.protos.push_str(&sig);
        self.protos.push_str(";\n");

        let was_in_function = self.in_function;
        self.in_function = true;
        let emitted = self.capture(|cg| {
            let saved_indent = cg.indent_level();
            cg.set_indent_level(0);
            writeln!(cg.output, "{} {{", sig)?;
            cg.indent();
            let (stmts, last) = body.split_at(body.len() - 1);
            for stmt in stmts {
                cg.write_indent()?;
                cg.emit_sequence_item(stmt)?;
                cg.output.push_str(";\n");
            }
            let last = last[0];
            cg.write_indent()?;
            if ret == CType::Void {
                cg.emit_sequence_item(last)?;
                cg.output.push_str(";\n");
            } else if let AstKind::Define { name, .. } = &last.kind {
                // A trailing define returns the freshly bound value.
                cg.emit_sequence_item(last)?;
                cg.output.push_str(";\n");
                cg.write_indent()?;
                let bound = cg.name(*name);
                writeln!(cg.output, "return {};", bound)?;
            } else {
                cg.output.push_str("return ");
                cg.emit_expression(last)?;
                cg.output.push_str(";\n");
            }
            cg.dedent();
            cg.output.push_str("}\n\n");
            cg.set_indent_level(saved_indent);
            Ok(())
        });
        self.in_function = was_in_function;
        self.lambda_defs.push_str(&emitted?);
        Ok(())
    }
}
