//! Diagnostics - severity-tagged message sink with a verbosity gate
//!
//! Every phase reports through a shared `DiagnosticContext`. The sink is
//! append-only; ordering across one compile is the call order of the
//! reporting code. Errors are always rendered; warnings and notes are gated
//! by the verbosity level chosen on the command line.

use std::cell::RefCell;
use std::fmt;

use crate::ast::Loc;

/// Output verbosity, from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// What went wrong, as a stable machine-readable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ArenaExhausted,
    OutputOpenFailed,
    UnsupportedNodeVariant,
    MalformedNode,
    PrimitiveArityMismatch,
    ChildEmissionFailed,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Category::ArenaExhausted => "arena-exhausted",
            Category::OutputOpenFailed => "output-open-failed",
            Category::UnsupportedNodeVariant => "unsupported-node",
            Category::MalformedNode => "malformed-node",
            Category::PrimitiveArityMismatch => "primitive-arity-mismatch",
            Category::ChildEmissionFailed => "child-emission-failed",
        };
        write!(f, "{}", tag)
    }
}

/// One reported problem.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub loc: Loc,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {} [{}]",
            self.loc.line, self.loc.column, self.severity, self.message, self.category
        )
    }
}

/// Append-only diagnostic sink shared by parser and code generator.
///
/// Interior mutability because the emitters hold a shared handle while the
/// codegen context itself is mutably borrowed.
#[derive(Debug)]
pub struct DiagnosticContext {
    verbosity: Verbosity,
    entries: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::with_verbosity(Verbosity::Normal)
    }

    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        DiagnosticContext {
            verbosity,
            entries: RefCell::new(Vec::new()),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn error(&self, category: Category, loc: Loc, message: impl Into<String>) {
        self.push(Severity::Error, category, loc, message.into());
    }

    pub fn warning(&self, category: Category, loc: Loc, message: impl Into<String>) {
        self.push(Severity::Warning, category, loc, message.into());
    }

    pub fn note(&self, category: Category, loc: Loc, message: impl Into<String>) {
        self.push(Severity::Note, category, loc, message.into());
    }

    fn push(&self, severity: Severity, category: Category, loc: Loc, message: String) {
        self.entries.borrow_mut().push(Diagnostic {
            severity,
            category,
            loc,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Copy of the recorded entries, in report order.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Render the sink for the user, one line per entry, filtered by the
    /// verbosity gate: errors always, warnings at `Verbose`, notes at `Debug`.
    pub fn render(&self, filename: &str) -> String {
        let mut out = String::new();
        for diag in self.entries.borrow().iter() {
            let visible = match diag.severity {
                Severity::Error => true,
                Severity::Warning => self.verbosity >= Verbosity::Verbose,
                Severity::Note => self.verbosity >= Verbosity::Debug,
            };
            if visible {
                out.push_str(&format!("{}:{}\n", filename, diag));
            }
        }
        out
    }
}

impl Default for DiagnosticContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_report_order() {
        let diag = DiagnosticContext::new();
        diag.error(Category::MalformedNode, Loc::new(1, 1), "first");
        diag.warning(Category::PrimitiveArityMismatch, Loc::new(2, 3), "second");
        diag.error(Category::ChildEmissionFailed, Loc::new(4, 5), "third");

        let entries = diag.snapshot();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].message, "second");
        assert_eq!(entries[2].message, "third");
    }

    #[test]
    fn test_has_errors() {
        let diag = DiagnosticContext::new();
        assert!(!diag.has_errors());
        diag.warning(Category::PrimitiveArityMismatch, Loc::new(1, 1), "w");
        assert!(!diag.has_errors());
        diag.error(Category::UnsupportedNodeVariant, Loc::new(1, 1), "e");
        assert!(diag.has_errors());
    }

    #[test]
    fn test_render_gates_warnings_by_verbosity() {
        let quiet = DiagnosticContext::new();
        quiet.warning(Category::PrimitiveArityMismatch, Loc::new(1, 2), "arity");
        assert_eq!(quiet.render("in.skm"), "");

        let verbose = DiagnosticContext::with_verbosity(Verbosity::Verbose);
        verbose.warning(Category::PrimitiveArityMismatch, Loc::new(1, 2), "arity");
        let rendered = verbose.render("in.skm");
        assert!(rendered.contains("in.skm:1:2: warning: arity"));
        assert!(rendered.contains("[primitive-arity-mismatch]"));
    }

    #[test]
    fn test_render_gates_notes_behind_debug() {
        let verbose = DiagnosticContext::with_verbosity(Verbosity::Verbose);
        verbose.note(Category::ChildEmissionFailed, Loc::new(1, 1), "n");
        assert_eq!(verbose.render("x"), "");

        let debug = DiagnosticContext::with_verbosity(Verbosity::Debug);
        debug.note(Category::ChildEmissionFailed, Loc::new(1, 1), "n");
        assert!(debug.render("x").contains("note: n"));
    }

    #[test]
    fn test_errors_always_render() {
        let quiet = DiagnosticContext::new();
        quiet.error(Category::OutputOpenFailed, Loc::new(7, 9), "cannot open out.c");
        let rendered = quiet.render("prog.skm");
        assert_eq!(
            rendered,
            "prog.skm:7:9: error: cannot open out.c [output-open-failed]\n"
        );
    }
}
