//! Code generation error types.

/// Error type for code generation.
///
/// Allows `?` propagation for both logical failures (unsupported or
/// malformed nodes) and formatting failures while writing into the output
/// buffer. A failing child short-circuits its parent; details land in the
/// diagnostics sink, not in the C output.
#[derive(Debug)]
pub enum CodegenError {
    /// A logical error (unsupported node, malformed tree).
    Logic(String),
    /// A formatting error while writing C text.
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::Logic(s) => write!(f, "{}", s),
            CodegenError::Format(e) => write!(f, "C generation error: {}", e),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<String> for CodegenError {
    fn from(s: String) -> Self {
        CodegenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Format(e)
    }
}
