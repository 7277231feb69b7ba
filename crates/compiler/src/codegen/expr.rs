//! Expression emission
//!
//! Every entry point here emits a syntactically valid C *expression* into
//! the output buffer. Anything containing an operator is fully
//! parenthesised, so source evaluation order survives C precedence
//! untouched. A failing child short-circuits the parent; error text goes to
//! the diagnostics sink, never into the C output.

use std::fmt::Write as _;

use super::{Codegen, CodegenError, primitives};
use crate::ast::{AstKind, AstNode, NumberValue};
use crate::diagnostics::Category;

impl<'a> Codegen<'a> {
    /// Dispatch on the node variant and emit one C expression.
    pub fn emit_expression(&mut self, node: &'a AstNode<'a>) -> Result<(), CodegenError> {
        match &node.kind {
            AstKind::Number(n) => self.emit_number(*n),
            AstKind::Boolean(b) => {
                self.output.push_str(if *b { "true" } else { "false" });
                Ok(())
            }
            AstKind::Character(c) => self.write_c_char(*c),
            AstKind::String(sym) => {
                let text = self.name(*sym);
                self.write_c_string(text)
            }
            // Interned name verbatim; no mangling.
            AstKind::Identifier(sym) => {
                let text = self.name(*sym);
                self.output.push_str(text);
                Ok(())
            }
            AstKind::Call { callee, args } => self.emit_call(node, callee, args),
            AstKind::If { cond, then, alt } => self.emit_if_expression(cond, then, *alt),
            AstKind::Lambda { params, body } => self.emit_lambda_expression(params, body),
            AstKind::Define { name, value } => self.emit_define_expression(*name, value),
            AstKind::Set { name, value } => {
                let text = self.name(*name);
                write!(self.output, "({} = ", text)?;
                self.emit_expression(value)?;
                self.output.push(')');
                Ok(())
            }
            AstKind::Let {
                kind,
                bindings,
                body,
            } => self.emit_let(*kind, bindings, body),
            AstKind::Begin(body) => self.emit_begin(node, body),
            AstKind::Do {
                bindings,
                test,
                result,
                body,
            } => self.emit_do(bindings, test, result, body),
            AstKind::Quote(datum) => self.emit_quoted(datum),
            AstKind::Vector(elements) => self.emit_vector_ctor(elements),
        }
    }

    fn emit_number(&mut self, n: NumberValue) -> Result<(), CodegenError> {
        match n {
            NumberValue::Integer(i) => write!(self.output, "{}", i)?,
            // Shortest round-trip formatting; prints integral floats bare,
            // matching the runtime's %g convention.
            NumberValue::Float(f) => write!(self.output, "{}", f)?,
        }
        Ok(())
    }

    /// Conditional expression. An absent alternate yields the typed unit
    /// value and is never evaluated.
    fn emit_if_expression(
        &mut self,
        cond: &'a AstNode<'a>,
        then: &'a AstNode<'a>,
        alt: Option<&'a AstNode<'a>>,
    ) -> Result<(), CodegenError> {
        self.output.push('(');
        self.emit_expression(cond)?;
        self.output.push_str(" ? ");
        self.emit_expression(then)?;
        self.output.push_str(" : ");
        match alt {
            Some(alt) => self.emit_expression(alt)?,
            None => {
                let unit = self.ctype(then).unit_value();
                self.output.push_str(unit);
            }
        }
        self.output.push(')');
        Ok(())
    }

    /// Application: primitive dispatch first, generic call as the fallback.
    fn emit_call(
        &mut self,
        node: &'a AstNode<'a>,
        callee: &'a AstNode<'a>,
        args: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        if let Some(sym) = callee.as_identifier() {
            let name = self.name(sym);
            if let Some(prim) = primitives::lookup(name) {
                if prim.arity.matches(args.len()) {
                    return self.emit_primitive(prim, args);
                }
                // Wrong arity: fall through to a generic call; the C
                // compiler surfaces the error later.
                self.diagnostics.warning(
                    Category::PrimitiveArityMismatch,
                    node.loc,
                    format!(
                        "'{}' expects {} argument(s), got {}; emitting a generic call",
                        name,
                        prim.arity.describe(),
                        args.len()
                    ),
                );
            }
        }
        self.emit_generic_call(callee, args)
    }

    /// Callee, then arguments in source order. C leaves argument evaluation
    /// order unspecified; side-effecting arguments belong in a `begin`.
    fn emit_generic_call(
        &mut self,
        callee: &'a AstNode<'a>,
        args: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        self.emit_expression(callee)?;
        self.output.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.emit_expression(arg)?;
        }
        self.output.push(')');
        Ok(())
    }

    /// Array-literal vector construction, shared by `(vector ...)` and
    /// `#(...)`. An empty vector emits an empty array initialiser.
    pub(super) fn emit_vector_ctor(
        &mut self,
        elements: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        self.output
            .push_str("vector_f_create_from_array(arena, (float[]){");
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.emit_expression(element)?;
        }
        write!(self.output, "}}, {})", elements.len())?;
        Ok(())
    }

    /// Literal encoding of a quoted datum. Atoms and vectors of atoms only;
    /// symbols encode as their name string.
    fn emit_quoted(&mut self, datum: &'a AstNode<'a>) -> Result<(), CodegenError> {
        match &datum.kind {
            AstKind::Number(_) | AstKind::Boolean(_) | AstKind::Character(_)
            | AstKind::String(_) => self.emit_expression(datum),
            AstKind::Identifier(sym) => {
                let text = self.name(*sym);
                self.write_c_string(text)
            }
            AstKind::Vector(elements) => {
                self.output
                    .push_str("vector_f_create_from_array(arena, (float[]){");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.emit_quoted(element)?;
                }
                write!(self.output, "}}, {})", elements.len())?;
                Ok(())
            }
            _ => {
                self.diagnostics.error(
                    Category::UnsupportedNodeVariant,
                    datum.loc,
                    "quoted datum has no C literal encoding",
                );
                Err(CodegenError::Logic(
                    "unsupported quoted datum".to_string(),
                ))
            }
        }
    }
}
