//! Verifier diagnostics for programs.
//!
//! The verifier never stops at the first problem it finds. Every violated invariant is
//! recorded as a [`Diagnostic`] and collected in a [`Diagnostics`] container, which the
//! caller inspects afterwards. Error-level entries make a program invalid; warning-level
//! entries (currently only broken debug metadata) are reported but do not reject the
//! program.
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Ordered container for diagnostic entries
//! - [`Diagnostic`] - Individual entry with severity, category and location context
//! - [`DiagnosticSeverity`] - Severity level (Warning, Error)
//! - [`DiagnosticCategory`] - Which class of invariant was violated
//!
//! # Usage Examples
//!
//! ```rust
//! use callswap::ir::{Diagnostics, DiagnosticCategory};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.warning(DiagnosticCategory::DebugInfo, "!dbg !7 refers to undefined metadata");
//! diagnostics.error(DiagnosticCategory::Call, "call to @_Z3bari passes 0 arguments, expected 1");
//!
//! assert!(diagnostics.has_errors());
//! assert_eq!(diagnostics.warning_count(), 1);
//!
//! for entry in diagnostics.iter() {
//!     println!("{entry}");
//! }
//! ```

use std::fmt::{self, Write};

use strum::{Display, EnumIter};

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// The program is still valid, but some attached data is unusable.
    ///
    /// Broken debug metadata falls into this class: the instructions are fine,
    /// only their source locations cannot be resolved.
    Warning,

    /// The program violates a structural invariant and must be rejected.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Class of invariant a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticCategory {
    /// Block and function layout.
    ///
    /// Examples: duplicate labels, missing or misplaced terminators, branches to
    /// unknown blocks, redefined or undefined values.
    Structure,

    /// Operand and result typing.
    ///
    /// Examples: a `ptr` passed where `i32` is expected, an out-of-range literal,
    /// a `ret` that disagrees with the function's return type.
    Type,

    /// Call instructions.
    ///
    /// Examples: calls to unknown functions, wrong argument counts, a call whose
    /// return type does not match the callee.
    Call,

    /// Debug metadata attachments.
    ///
    /// Examples: a `!dbg` reference to a metadata node that does not exist.
    DebugInfo,
}

/// A single diagnostic entry with context information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Class of invariant this diagnostic is about.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Name of the function the issue was found in, if any.
    pub function: Option<String>,

    /// Label of the basic block the issue was found in, if any.
    pub block: Option<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry.
    ///
    /// # Arguments
    ///
    /// * `severity` - Severity level of the diagnostic
    /// * `category` - Class of the violated invariant
    /// * `message` - Human-readable description
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            function: None,
            block: None,
        }
    }

    /// Adds the enclosing function to the diagnostic.
    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Adds the enclosing basic block to the diagnostic.
    #[must_use]
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Returns true if this entry makes the program invalid.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        match (&self.function, &self.block) {
            (Some(function), Some(block)) => write!(f, " (in @{function}, block {block})"),
            (Some(function), None) => write!(f, " (in @{function})"),
            (None, Some(block)) => write!(f, " (block {block})"),
            (None, None) => Ok(()),
        }
    }
}

/// Ordered container for collecting diagnostic entries.
///
/// Entries keep the order in which the verifier discovered them, which follows
/// the program layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates a new empty diagnostics container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning diagnostic.
    ///
    /// # Arguments
    ///
    /// * `category` - Category of the diagnostic
    /// * `message` - Description of the issue
    pub fn warning(&mut self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Adds an error diagnostic.
    ///
    /// # Arguments
    ///
    /// * `category` - Category of the diagnostic
    /// * `message` - Description of the error
    pub fn error(&mut self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Error,
            category,
            message,
        ));
    }

    /// Adds a diagnostic entry directly.
    ///
    /// Use this for diagnostics that carry function or block context.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns true if no diagnostics have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any error-level diagnostics have been collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    /// Returns the total number of diagnostics.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of error-level diagnostics.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    /// Returns the number of warning-level diagnostics.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count() - self.error_count()
    }

    /// Returns an iterator over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Returns all errors as a vector.
    #[must_use]
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| d.is_error()).collect()
    }

    /// Returns all warnings as a vector.
    #[must_use]
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error()).collect()
    }

    /// Returns diagnostics filtered by category.
    #[must_use]
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Consumes the container, keeping only the error-level entries.
    #[must_use]
    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.entries.into_iter().filter(Diagnostic::is_error).collect()
    }

    /// Formats a summary of all diagnostics for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let error_count = self.error_count();
        let warning_count = self.warning_count();

        let _ = writeln!(
            output,
            "Diagnostics: {error_count} error(s), {warning_count} warning(s)"
        );

        if error_count > 0 {
            output.push_str("\nErrors:\n");
            for diag in self.errors() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        if warning_count > 0 {
            output.push_str("\nWarnings:\n");
            for diag in self.warnings() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
