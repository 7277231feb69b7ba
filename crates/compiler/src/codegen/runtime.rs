//! Runtime contract of the emitted C
//!
//! The generated file links against a fixed C runtime: the `Arena` type with
//! `arena_create`/`arena_destroy`, the `VectorF` helpers, and the vector
//! calculus / autodiff entry points. The emitter references these symbols by
//! name and otherwise assumes only the standard C library. The shared
//! `arena` handle is an implicit global, matching the runtime's prototypes.

/// Fixed file header: standard includes, the runtime header, and the shared
/// arena handle definition. `main` initialises the handle.
pub(crate) const PROLOGUE: &str = "\
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <stdbool.h>
#include \"skema_runtime.h\"

Arena* arena = NULL;
";

/// Runtime helpers the primitive templates are allowed to reference.
pub(crate) const RUNTIME_HELPERS: &[&str] = &[
    "vector_f_create_from_array",
    "vector_f_add",
    "vector_f_sub",
    "vector_f_mul_scalar",
    "vector_f_dot",
    "vector_f_cross",
    "vector_f_magnitude",
    "vector_f_get",
    "compute_gradient",
    "compute_divergence",
    "compute_curl",
    "compute_laplacian",
    "compute_gradient_autodiff",
    "compute_gradient_reverse_mode",
    "compute_jacobian",
    "compute_hessian",
    "compute_nth_derivative",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prologue_shape() {
        assert!(PROLOGUE.starts_with("#include <stdio.h>\n"));
        assert!(PROLOGUE.contains("#include \"skema_runtime.h\""));
        assert!(PROLOGUE.ends_with("Arena* arena = NULL;\n"));
        // ASCII, \n line endings, no trailing whitespace
        assert!(PROLOGUE.is_ascii());
        for line in PROLOGUE.lines() {
            assert_eq!(line, line.trim_end());
        }
    }
}
