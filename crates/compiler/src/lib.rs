//! Skema Compiler Library
//!
//! Compiles Skema (a Scheme-flavoured numerics language) to portable C, and
//! optionally drives a host C compiler over the result and runs it. The
//! pipeline: lex, parse into an arena-allocated AST, best-effort type
//! inference, C emission into a buffer, then file or toolchain handling.
//!
//! The emitted C links against the fixed `skema_runtime` library (`VectorF`
//! helpers, vector calculus and autodiff entry points, the shared `Arena`).
//!
//! # Embedding
//!
//! ```rust,ignore
//! use skmc::{CompilerConfig, compile_to_c};
//!
//! let c = compile_to_c("(display \"hi\")", "repl", &CompilerConfig::new())?;
//! ```

pub mod arena;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod types;

pub use arena::Arena;
pub use codegen::{Codegen, CodegenError};
pub use config::{CompilerConfig, OptimizationLevel};
pub use diagnostics::{Category, Diagnostic, DiagnosticContext, Severity, Verbosity};
pub use intern::{StringTable, Symbol};
pub use parser::Parser;
pub use types::{CType, TypeContext};

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tracing::{debug, info};

/// Cache for the host-compiler availability probe; one check per process.
static CC_CHECKED: OnceLock<Result<(), String>> = OnceLock::new();

/// Verify the host C compiler answers `--version`. Compile-and-run needs a
/// working toolchain; plain compile-to-C does not.
fn check_cc(cc: &str) -> Result<(), String> {
    CC_CHECKED
        .get_or_init(|| {
            let output = Command::new(cc).arg("--version").output().map_err(|e| {
                format!(
                    "failed to run {}: {}. A host C compiler is required for compile-and-run mode.",
                    cc, e
                )
            })?;
            if !output.status.success() {
                return Err(format!(
                    "{} --version failed with exit code {:?}",
                    cc,
                    output.status.code()
                ));
            }
            Ok(())
        })
        .clone()
}

/// One compile: source text in, C text out. Diagnostics accumulate in the
/// shared sink; the arena lives exactly as long as this call.
fn compile_source(source: &str, diagnostics: &DiagnosticContext) -> Result<String, String> {
    let arena = Arena::new();
    let mut strings = StringTable::new();

    let mut parser = Parser::new(&arena, &mut strings, diagnostics, source)?;
    let items = parser.parse_program()?;
    debug!(forms = items.len(), "parsed program");

    let types = TypeContext::infer_program(&strings, items);
    let codegen = Codegen::new(&arena, &strings, diagnostics, Some(&types));
    let c = codegen.generate_program(items).map_err(|e| e.to_string())?;
    debug!(
        bytes = c.len(),
        arena_bytes = arena.allocated_bytes(),
        "generated C"
    );
    Ok(c)
}

/// Compile source text to C text. Renders accumulated diagnostics to stderr
/// (errors always; warnings and notes per the configured verbosity).
pub fn compile_to_c(
    source: &str,
    filename: &str,
    config: &CompilerConfig,
) -> Result<String, String> {
    let diagnostics = DiagnosticContext::with_verbosity(config.verbosity);
    let result = compile_source(source, &diagnostics);

    let rendered = diagnostics.render(filename);
    if !rendered.is_empty() {
        eprint!("{}", rendered);
    }
    match result {
        Ok(c) if !diagnostics.has_errors() => Ok(c),
        Ok(_) => Err(format!("compilation of {} failed", filename)),
        Err(e) => Err(format!("compilation of {} failed: {}", filename, e)),
    }
}

/// Compile a `.skm` file to a C file, or to stdout when `output` is absent.
///
/// The output path is touched only after the whole program emitted
/// successfully, so a failed compile never leaves a partial file behind.
pub fn compile_file(
    input: &Path,
    output: Option<&Path>,
    config: &CompilerConfig,
) -> Result<(), String> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("failed to read {}: {}", input.display(), e))?;
    let filename = input.display().to_string();
    let c = compile_to_c(&source, &filename, config)?;

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &c) {
                let diagnostics = DiagnosticContext::with_verbosity(config.verbosity);
                diagnostics.error(
                    Category::OutputOpenFailed,
                    ast::Loc::dummy(),
                    format!("cannot write '{}': {}", path.display(), e),
                );
                eprint!("{}", diagnostics.render(&filename));
                return Err(format!("cannot write '{}': {}", path.display(), e));
            }
            info!(output = %path.display(), "wrote C output");
            Ok(())
        }
        None => std::io::stdout()
            .write_all(c.as_bytes())
            .map_err(|e| format!("cannot write to stdout: {}", e)),
    }
}

/// Compile-and-run mode: write `<input>.c`, build it with the host C
/// compiler, execute the binary, and hand back its exit code.
pub fn compile_and_run(input: &Path, config: &CompilerConfig) -> Result<i32, String> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("failed to read {}: {}", input.display(), e))?;
    let filename = input.display().to_string();
    let c = compile_to_c(&source, &filename, config)?;

    let c_path = PathBuf::from(format!("{}.c", input.display()));
    fs::write(&c_path, &c).map_err(|e| format!("cannot write '{}': {}", c_path.display(), e))?;

    check_cc(&config.cc)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("skm_out");
    let exe_path = std::env::temp_dir().join(format!("skmc-{}-{}", stem, std::process::id()));

    let mut cc = Command::new(&config.cc);
    cc.arg(config.optimization_level.flag())
        .arg(&c_path)
        .arg("-o")
        .arg(&exe_path);
    for lib_path in &config.library_paths {
        cc.arg("-L").arg(lib_path);
    }
    for lib in &config.libraries {
        cc.arg("-l").arg(lib);
    }

    info!(cc = %config.cc, input = %c_path.display(), "invoking host C compiler");
    let output = cc
        .output()
        .map_err(|e| format!("failed to run {}: {}", config.cc, e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("C compilation failed:\n{}", stderr));
    }

    if !config.keep_intermediate {
        fs::remove_file(&c_path).ok();
    }

    info!(exe = %exe_path.display(), "running compiled program");
    let status = Command::new(&exe_path)
        .status()
        .map_err(|e| format!("failed to run {}: {}", exe_path.display(), e))?;
    fs::remove_file(&exe_path).ok();

    // Forward the subprocess exit code to the caller.
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_to_c_end_to_end() {
        let c = compile_to_c(
            "(define (square x) (* x x)) (display (number->string (square 3.0)))",
            "test.skm",
            &CompilerConfig::new(),
        )
        .unwrap();
        assert!(c.contains("float square(float x)"));
        assert!(c.contains("return (x * x);"));
        assert!(c.contains("int main(int argc, char** argv)"));
        assert!(c.contains("square(3)"));
    }

    #[test]
    fn test_compile_to_c_reports_parse_errors() {
        let err = compile_to_c("(+ 1", "broken.skm", &CompilerConfig::new()).unwrap_err();
        assert!(err.contains("broken.skm"));
        assert!(err.contains("unexpected end of input"));
    }

    #[test]
    fn test_compile_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.skm");
        let output = dir.path().join("prog.c");
        fs::write(&input, "(display \"hello\")").unwrap();

        compile_file(&input, Some(&output), &CompilerConfig::new()).unwrap();

        let c = fs::read_to_string(&output).unwrap();
        assert!(c.contains("printf(\"%s\\n\", \"hello\")"));
        assert!(c.contains("#include \"skema_runtime.h\""));
    }

    #[test]
    fn test_compile_file_missing_input() {
        let err = compile_file(
            Path::new("/nonexistent/prog.skm"),
            None,
            &CompilerConfig::new(),
        )
        .unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn test_failed_compile_leaves_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.skm");
        let output = dir.path().join("broken.c");
        fs::write(&input, "(define (f x)").unwrap();

        assert!(compile_file(&input, Some(&output), &CompilerConfig::new()).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_compile_is_deterministic_across_calls() {
        let source = "(define v (vector 1.0 2.0)) (display (number->string (norm v)))";
        let a = compile_to_c(source, "a.skm", &CompilerConfig::new()).unwrap();
        let b = compile_to_c(source, "b.skm", &CompilerConfig::new()).unwrap();
        assert_eq!(a, b);
    }
}
