//! Primitive dispatch
//!
//! A static table maps recognised operator names to a lowering strategy
//! (arity plus emission template), so dispatch is one hash lookup and the
//! recognised set is enumerable for tests. A recognised name applied with
//! the right arity always wins over generic call emission; a wrong arity
//! falls through to a plain call with a gated warning.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use super::{Codegen, CodegenError};
use crate::ast::AstNode;
use crate::types::CType;

/// How many arguments a primitive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Unary or binary minus.
    OneOrTwo,
}

impl Arity {
    pub(crate) fn matches(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::OneOrTwo => n == 1 || n == 2,
        }
    }

    pub(crate) fn describe(self) -> String {
        match self {
            Arity::Exact(k) => format!("exactly {}", k),
            Arity::AtLeast(k) => format!("at least {}", k),
            Arity::OneOrTwo => "1 or 2".to_string(),
        }
    }
}

/// Emission template for a recognised operator.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Lowering {
    /// Binary infix operator; unary prefix for a single argument.
    Infix(&'static str),
    /// `(vector ...)` array-literal constructor.
    VectorNew,
    /// Fixed runtime helper call, optionally with the leading arena handle.
    Helper {
        name: &'static str,
        with_arena: bool,
    },
    /// `(v->data[i])`
    VectorRef,
    /// `(m[i]->data[j])`
    MatrixRef,
    /// Scalar-in/scalar-out autodiff: wrap the input in a one-element
    /// vector, call the helper, read element zero back out.
    AutodiffScalar { helper: &'static str },
    /// Vector-in autodiff: cast the user function and call the helper.
    AutodiffVector { helper: &'static str },
    /// `compute_jacobian` takes a vector-valued function.
    Jacobian,
    /// First-order `compute_nth_derivative` on a float function.
    Derivative,
    /// `(display x)` Scheme compatibility.
    Display,
    /// `strcat` chain into a stack buffer, returned via `strdup`.
    StringAppend,
    /// `snprintf %g` into a stack buffer, returned via `strdup`.
    NumberToString,
    /// Forwarded verbatim.
    Printf,
}

/// Result classification consumed by type inference.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResultType {
    Fixed(CType),
    /// Integral only when every operand is integral.
    Numeric,
}

pub(crate) struct Primitive {
    pub arity: Arity,
    pub lowering: Lowering,
    pub result: ResultType,
}

impl Primitive {
    const fn new(arity: Arity, lowering: Lowering, result: ResultType) -> Self {
        Primitive {
            arity,
            lowering,
            result,
        }
    }
}

static PRIMITIVES: LazyLock<HashMap<&'static str, Primitive>> = LazyLock::new(|| {
    use Arity::*;
    use Lowering::*;
    use ResultType::*;
    HashMap::from([
        // Arithmetic
        ("+", Primitive::new(Exact(2), Infix("+"), Numeric)),
        ("-", Primitive::new(OneOrTwo, Infix("-"), Numeric)),
        ("*", Primitive::new(Exact(2), Infix("*"), Numeric)),
        ("/", Primitive::new(Exact(2), Infix("/"), Numeric)),
        // Comparison
        ("<", Primitive::new(Exact(2), Infix("<"), Fixed(CType::Bool))),
        (">", Primitive::new(Exact(2), Infix(">"), Fixed(CType::Bool))),
        ("<=", Primitive::new(Exact(2), Infix("<="), Fixed(CType::Bool))),
        (">=", Primitive::new(Exact(2), Infix(">="), Fixed(CType::Bool))),
        ("=", Primitive::new(Exact(2), Infix("=="), Fixed(CType::Bool))),
        // Vectors
        ("vector", Primitive::new(AtLeast(0), VectorNew, Fixed(CType::Vector))),
        (
            "v+",
            Primitive::new(
                Exact(2),
                Helper { name: "vector_f_add", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "v-",
            Primitive::new(
                Exact(2),
                Helper { name: "vector_f_sub", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "v*",
            Primitive::new(
                Exact(2),
                Helper { name: "vector_f_mul_scalar", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "dot",
            Primitive::new(
                Exact(2),
                Helper { name: "vector_f_dot", with_arena: false },
                Fixed(CType::Float),
            ),
        ),
        (
            "cross",
            Primitive::new(
                Exact(2),
                Helper { name: "vector_f_cross", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "norm",
            Primitive::new(
                Exact(1),
                Helper { name: "vector_f_magnitude", with_arena: false },
                Fixed(CType::Float),
            ),
        ),
        ("vector-ref", Primitive::new(Exact(2), VectorRef, Fixed(CType::Float))),
        ("matrix-ref", Primitive::new(Exact(3), MatrixRef, Fixed(CType::Float))),
        // Vector calculus
        (
            "gradient",
            Primitive::new(
                Exact(2),
                Helper { name: "compute_gradient", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "divergence",
            Primitive::new(
                Exact(2),
                Helper { name: "compute_divergence", with_arena: true },
                Fixed(CType::Float),
            ),
        ),
        (
            "curl",
            Primitive::new(
                Exact(2),
                Helper { name: "compute_curl", with_arena: true },
                Fixed(CType::Vector),
            ),
        ),
        (
            "laplacian",
            Primitive::new(
                Exact(2),
                Helper { name: "compute_laplacian", with_arena: true },
                Fixed(CType::Float),
            ),
        ),
        // Autodiff
        (
            "autodiff-forward",
            Primitive::new(
                Exact(2),
                AutodiffScalar { helper: "compute_gradient_autodiff" },
                Fixed(CType::Float),
            ),
        ),
        (
            "autodiff-reverse",
            Primitive::new(
                Exact(2),
                AutodiffScalar { helper: "compute_gradient_reverse_mode" },
                Fixed(CType::Float),
            ),
        ),
        (
            "autodiff-forward-gradient",
            Primitive::new(
                Exact(2),
                AutodiffVector { helper: "compute_gradient_autodiff" },
                Fixed(CType::Vector),
            ),
        ),
        (
            "autodiff-reverse-gradient",
            Primitive::new(
                Exact(2),
                AutodiffVector { helper: "compute_gradient_reverse_mode" },
                Fixed(CType::Vector),
            ),
        ),
        ("autodiff-jacobian", Primitive::new(Exact(2), Jacobian, Fixed(CType::Matrix))),
        (
            "autodiff-hessian",
            Primitive::new(
                Exact(2),
                AutodiffVector { helper: "compute_hessian" },
                Fixed(CType::Matrix),
            ),
        ),
        ("derivative", Primitive::new(Exact(2), Derivative, Fixed(CType::Float))),
        // Scheme compatibility
        ("display", Primitive::new(Exact(1), Display, Fixed(CType::Void))),
        ("string-append", Primitive::new(AtLeast(1), StringAppend, Fixed(CType::Str))),
        ("number->string", Primitive::new(Exact(1), NumberToString, Fixed(CType::Str))),
        ("printf", Primitive::new(AtLeast(1), Printf, Fixed(CType::Int))),
    ])
});

pub(crate) fn lookup(name: &str) -> Option<&'static Primitive> {
    PRIMITIVES.get(name)
}

/// Every recognised operator name (for tests).
pub(crate) fn names() -> impl Iterator<Item = &'static str> {
    PRIMITIVES.keys().copied()
}

impl<'a> Codegen<'a> {
    /// Emit the fixed template for a recognised primitive. The caller has
    /// already checked the arity against the table.
    pub(super) fn emit_primitive(
        &mut self,
        prim: &Primitive,
        args: &'a [&'a AstNode<'a>],
    ) -> Result<(), CodegenError> {
        match prim.lowering {
            Lowering::Infix(op) => {
                if args.len() == 1 {
                    self.output.push('(');
                    self.output.push_str(op);
                    self.emit_expression(args[0])?;
                    self.output.push(')');
                } else {
                    self.output.push('(');
                    self.emit_expression(args[0])?;
                    write!(self.output, " {} ", op)?;
                    self.emit_expression(args[1])?;
                    self.output.push(')');
                }
            }
            Lowering::VectorNew => self.emit_vector_ctor(args)?,
            Lowering::Helper { name, with_arena } => {
                write!(self.output, "{}(", name)?;
                if with_arena {
                    self.output.push_str("arena, ");
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.emit_expression(arg)?;
                }
                self.output.push(')');
            }
            Lowering::VectorRef => {
                self.output.push('(');
                self.emit_expression(args[0])?;
                self.output.push_str("->data[");
                self.emit_expression(args[1])?;
                self.output.push_str("])");
            }
            Lowering::MatrixRef => {
                self.output.push('(');
                self.emit_expression(args[0])?;
                self.output.push('[');
                self.emit_expression(args[1])?;
                self.output.push_str("]->data[");
                self.emit_expression(args[2])?;
                self.output.push_str("])");
            }
            Lowering::AutodiffScalar { helper } => {
                self.output
                    .push_str("({ float (*wrapper_func)(VectorF*) = (float (*)(VectorF*))");
                self.emit_expression(args[0])?;
                self.output.push_str(
                    "; VectorF* vec_input = vector_f_create_from_array(arena, (float[]){",
                );
                self.emit_expression(args[1])?;
                write!(
                    self.output,
                    "}}, 1); vector_f_get({}(arena, wrapper_func, vec_input), 0); }})",
                    helper
                )?;
            }
            Lowering::AutodiffVector { helper } => {
                self.output
                    .push_str("({ float (*wrapper_func)(VectorF*) = (float (*)(VectorF*))");
                self.emit_expression(args[0])?;
                write!(self.output, "; {}(arena, wrapper_func, ", helper)?;
                self.emit_expression(args[1])?;
                self.output.push_str("); })");
            }
            Lowering::Jacobian => {
                self.output.push_str(
                    "({ VectorF* (*wrapper_func)(Arena*, VectorF*) = (VectorF* (*)(Arena*, VectorF*))",
                );
                self.emit_expression(args[0])?;
                self.output.push_str("; compute_jacobian(arena, wrapper_func, ");
                self.emit_expression(args[1])?;
                self.output.push_str("); })");
            }
            Lowering::Derivative => {
                self.output
                    .push_str("({ float (*wrapper_func)(float) = (float (*)(float))");
                self.emit_expression(args[0])?;
                self.output
                    .push_str("; compute_nth_derivative(arena, wrapper_func, ");
                self.emit_expression(args[1])?;
                self.output.push_str(", 1); })");
            }
            Lowering::Display => {
                self.output.push_str("printf(\"%s\\n\", ");
                self.emit_expression(args[0])?;
                self.output.push(')');
            }
            Lowering::StringAppend => {
                self.output.push_str("({ char buffer[1024] = \"\"; ");
                for arg in args {
                    self.output.push_str("strcat(buffer, ");
                    self.emit_expression(arg)?;
                    self.output.push_str("); ");
                }
                self.output.push_str("strdup(buffer); })");
            }
            Lowering::NumberToString => {
                self.output.push_str(
                    "({ char buffer[64]; snprintf(buffer, sizeof(buffer), \"%g\", ",
                );
                self.emit_expression(args[0])?;
                self.output.push_str("); strdup(buffer); })");
            }
            Lowering::Printf => {
                self.output.push_str("printf(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.emit_expression(arg)?;
                }
                self.output.push(')');
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_enumerable() {
        let names: Vec<_> = names().collect();
        assert_eq!(names.len(), 33);
        assert!(names.contains(&"+"));
        assert!(names.contains(&"autodiff-hessian"));
        assert!(names.contains(&"number->string"));
    }

    #[test]
    fn test_lookup_hits_and_misses() {
        assert!(lookup("dot").is_some());
        assert!(lookup("cross").is_some());
        assert!(lookup("not-a-primitive").is_none());
        // User function names must not shadow into the table.
        assert!(lookup("my-func").is_none());
    }

    #[test]
    fn test_arity_matching() {
        assert!(Arity::Exact(2).matches(2));
        assert!(!Arity::Exact(2).matches(3));
        assert!(Arity::OneOrTwo.matches(1));
        assert!(Arity::OneOrTwo.matches(2));
        assert!(!Arity::OneOrTwo.matches(3));
        assert!(Arity::AtLeast(1).matches(1));
        assert!(Arity::AtLeast(1).matches(5));
        assert!(!Arity::AtLeast(1).matches(0));
    }

    #[test]
    fn test_minus_is_unary_or_binary() {
        let minus = lookup("-").unwrap();
        assert_eq!(minus.arity, Arity::OneOrTwo);
    }

    #[test]
    fn test_helpers_reference_known_runtime_symbols() {
        use super::super::runtime::RUNTIME_HELPERS;
        for name in names() {
            let prim = lookup(name).unwrap();
            let helper = match prim.lowering {
                Lowering::Helper { name, .. } => Some(name),
                Lowering::AutodiffScalar { helper } | Lowering::AutodiffVector { helper } => {
                    Some(helper)
                }
                Lowering::Jacobian => Some("compute_jacobian"),
                Lowering::Derivative => Some("compute_nth_derivative"),
                _ => None,
            };
            if let Some(helper) = helper {
                assert!(
                    RUNTIME_HELPERS.contains(&helper),
                    "primitive '{}' references unknown helper '{}'",
                    name,
                    helper
                );
            }
        }
    }
}
