//! Best-effort type inference
//!
//! Skema is dynamically flavoured; C is not. This pass classifies every
//! expression into the handful of C types the emitted code uses, so that
//! declarations, lambda signatures, and missing-else unit values come out
//! typed. Anything it cannot see through falls back to the uniform value
//! type `float`. Code generation consumes the result read-only.

use std::collections::HashMap;

use crate::ast::{AstKind, AstNode, NumberValue};
use crate::codegen::primitives::{self, ResultType};
use crate::intern::{StringTable, Symbol};

/// The C-side type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CType {
    Int,
    Float,
    Bool,
    Char,
    Str,
    Vector,
    Matrix,
    Void,
}

impl CType {
    /// Spelling used in declarations.
    pub fn c_name(self) -> &'static str {
        match self {
            CType::Int => "int",
            CType::Float => "float",
            CType::Bool => "bool",
            CType::Char => "char",
            CType::Str => "char*",
            CType::Vector => "VectorF*",
            CType::Matrix => "VectorF**",
            CType::Void => "void",
        }
    }

    /// Unit value for an absent else branch: `0` or `NULL`, matching the
    /// inferred type; `0` when nothing better is known.
    pub fn unit_value(self) -> &'static str {
        match self {
            CType::Str | CType::Vector | CType::Matrix => "NULL",
            CType::Bool => "false",
            _ => "0",
        }
    }
}

/// Read-only type facts handed to the code generator.
#[derive(Debug, Default)]
pub struct TypeContext {
    globals: HashMap<Symbol, CType>,
}

impl TypeContext {
    /// Prepass over the top-level defines: later references to a global pick
    /// up the type of its initialiser.
    pub fn infer_program(strings: &StringTable, items: &[&AstNode<'_>]) -> Self {
        let mut ctx = TypeContext::default();
        for item in items {
            if let AstKind::Define { name, value } = &item.kind {
                // Lambda defines become C functions, not value globals.
                if !matches!(value.kind, AstKind::Lambda { .. }) {
                    let ty = ctx.infer(strings, value);
                    ctx.globals.insert(*name, ty);
                }
            }
        }
        ctx
    }

    pub fn lookup(&self, name: Symbol) -> Option<CType> {
        self.globals.get(&name).copied()
    }

    /// Structural classification of one expression.
    pub fn infer(&self, strings: &StringTable, node: &AstNode<'_>) -> CType {
        match &node.kind {
            AstKind::Number(NumberValue::Integer(_)) => CType::Int,
            AstKind::Number(NumberValue::Float(_)) => CType::Float,
            AstKind::Boolean(_) => CType::Bool,
            AstKind::Character(_) => CType::Char,
            AstKind::String(_) => CType::Str,
            AstKind::Identifier(sym) => self.lookup(*sym).unwrap_or(CType::Float),
            AstKind::Call { callee, args } => self.infer_call(strings, callee, args),
            AstKind::If { then, .. } => self.infer(strings, then),
            AstKind::Lambda { .. } => CType::Float,
            AstKind::Define { value, .. } => self.infer(strings, value),
            AstKind::Set { value, .. } => self.infer(strings, value),
            AstKind::Let { body, .. } | AstKind::Begin(body) => self.infer_last(strings, body),
            AstKind::Do { result, .. } => self.infer_last(strings, result),
            AstKind::Quote(datum) => self.infer(strings, datum),
            AstKind::Vector(_) => CType::Vector,
        }
    }

    fn infer_last(&self, strings: &StringTable, body: &[&AstNode<'_>]) -> CType {
        body.last()
            .map(|last| self.infer(strings, last))
            .unwrap_or(CType::Float)
    }

    fn infer_call(
        &self,
        strings: &StringTable,
        callee: &AstNode<'_>,
        args: &[&AstNode<'_>],
    ) -> CType {
        let Some(sym) = callee.as_identifier() else {
            return CType::Float;
        };
        let Some(prim) = primitives::lookup(strings.resolve(sym)) else {
            return CType::Float;
        };
        if !prim.arity.matches(args.len()) {
            return CType::Float;
        }
        match prim.result {
            ResultType::Fixed(ty) => ty,
            // Numeric operators stay integral only when every operand does.
            ResultType::Numeric => {
                if args.iter().all(|a| self.infer(strings, a) == CType::Int) {
                    CType::Int
                } else {
                    CType::Float
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::diagnostics::DiagnosticContext;
    use crate::parser::Parser;

    fn infer_source(source: &str) -> CType {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let diagnostics = DiagnosticContext::new();
        let mut parser = Parser::new(&arena, &mut strings, &diagnostics, source).unwrap();
        let items = parser.parse_program().unwrap();
        let ctx = TypeContext::infer_program(&strings, items);
        ctx.infer(&strings, items.last().unwrap())
    }

    #[test]
    fn test_literals() {
        assert_eq!(infer_source("1"), CType::Int);
        assert_eq!(infer_source("1.5"), CType::Float);
        assert_eq!(infer_source("#t"), CType::Bool);
        assert_eq!(infer_source("\"s\""), CType::Str);
        assert_eq!(infer_source("#(1.0 2.0)"), CType::Vector);
    }

    #[test]
    fn test_arithmetic_stays_integral_only_for_integers() {
        assert_eq!(infer_source("(+ 1 2)"), CType::Int);
        assert_eq!(infer_source("(+ 1 2.0)"), CType::Float);
        assert_eq!(infer_source("(* (+ 1 2) 3)"), CType::Int);
    }

    #[test]
    fn test_comparisons_are_bool() {
        assert_eq!(infer_source("(< x 0)"), CType::Bool);
        assert_eq!(infer_source("(= a b)"), CType::Bool);
    }

    #[test]
    fn test_vector_primitives() {
        assert_eq!(infer_source("(v+ a b)"), CType::Vector);
        assert_eq!(infer_source("(dot a b)"), CType::Float);
        assert_eq!(infer_source("(norm v)"), CType::Float);
        assert_eq!(infer_source("(autodiff-jacobian f v)"), CType::Matrix);
    }

    #[test]
    fn test_unknown_identifier_defaults_to_float() {
        assert_eq!(infer_source("x"), CType::Float);
        assert_eq!(infer_source("(f 1 2)"), CType::Float);
    }

    #[test]
    fn test_global_define_types_later_references() {
        assert_eq!(infer_source("(define v (vector 1.0 2.0)) v"), CType::Vector);
        assert_eq!(infer_source("(define s \"hi\") s"), CType::Str);
    }

    #[test]
    fn test_sequences_take_last_expression_type() {
        assert_eq!(infer_source("(begin 1 2.0)"), CType::Float);
        assert_eq!(infer_source("(let ((x 1)) \"s\")"), CType::Str);
    }

    #[test]
    fn test_unit_values() {
        assert_eq!(CType::Float.unit_value(), "0");
        assert_eq!(CType::Vector.unit_value(), "NULL");
        assert_eq!(CType::Str.unit_value(), "NULL");
        assert_eq!(CType::Bool.unit_value(), "false");
    }
}
