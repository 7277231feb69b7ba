//! Compiler configuration
//!
//! Settings the CLI does not expose directly but embedders can adjust: which
//! host C compiler to invoke in compile-and-run mode, its optimisation
//! level, and what to link the produced binary against.

use std::path::PathBuf;

use crate::diagnostics::Verbosity;

/// Optimisation level forwarded to the host C compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    O0,
    O1,
    O2,
    O3,
}

impl OptimizationLevel {
    pub fn flag(self) -> &'static str {
        match self {
            OptimizationLevel::O0 => "-O0",
            OptimizationLevel::O1 => "-O1",
            OptimizationLevel::O2 => "-O2",
            OptimizationLevel::O3 => "-O3",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Diagnostics gate: `Debug` > `Verbose` > default.
    pub verbosity: Verbosity,
    /// Host C compiler command for compile-and-run mode.
    pub cc: String,
    pub optimization_level: OptimizationLevel,
    /// Extra `-L` search paths (where the runtime library lives).
    pub library_paths: Vec<PathBuf>,
    /// Libraries to link; the runtime and libm by default.
    pub libraries: Vec<String>,
    /// Keep the generated `<input>.c` after a compile-and-run.
    pub keep_intermediate: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            verbosity: Verbosity::Normal,
            cc: "cc".to_string(),
            optimization_level: OptimizationLevel::O0,
            library_paths: Vec::new(),
            libraries: vec!["skema_runtime".to_string(), "m".to_string()],
            keep_intermediate: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = cc.into();
        self
    }

    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    pub fn with_library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    pub fn with_keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.cc, "cc");
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.optimization_level, OptimizationLevel::O0);
        assert!(config.libraries.contains(&"skema_runtime".to_string()));
        assert!(config.libraries.contains(&"m".to_string()));
    }

    #[test]
    fn test_builder_chain() {
        let config = CompilerConfig::new()
            .with_verbosity(Verbosity::Debug)
            .with_cc("clang")
            .with_optimization_level(OptimizationLevel::O2)
            .with_library_path("/opt/skema/lib")
            .with_library("blas")
            .with_keep_intermediate(false);
        assert_eq!(config.cc, "clang");
        assert_eq!(config.optimization_level.flag(), "-O2");
        assert_eq!(config.library_paths.len(), 1);
        assert!(config.libraries.contains(&"blas".to_string()));
        assert!(!config.keep_intermediate);
    }
}
