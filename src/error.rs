use thiserror::Error;

use crate::ir::{Diagnostic, InstructionLocation};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The point in the pipeline at which a program was verified.
///
/// A failure at [`VerificationStage::Input`] means the loaded program was invalid to
/// begin with. A failure at [`VerificationStage::Output`] means a transformation
/// produced an invalid program, which always indicates a bug in that transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStage {
    /// Verification of the program as loaded, before any transformation ran.
    Input,
    /// Re-verification after the transformation pipeline completed.
    Output,
}

impl std::fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStage::Input => write!(f, "input"),
            VerificationStage::Output => write!(f, "transformed"),
        }
    }
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant is fatal for a pipeline run: nothing is recovered locally and all
/// errors propagate to the caller. Broken debug metadata is deliberately not an error;
/// it is reported as a warning-level [`Diagnostic`] by the verifier.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::FileError`] - The program file could not be read
/// - [`Error::Parse`] - The program text is not valid IR text
///
/// ## Verification Errors
/// - [`Error::Verification`] - Structural invariants of the program are violated
///
/// ## Transformation Errors
/// - [`Error::MissingSymbol`] - The replacement function does not exist
/// - [`Error::SignatureMismatch`] - An in-place rewrite would not match the callee signature
/// - [`Error::CounterOverflow`] - The replacement counter left the `i32` range
///
/// ## Analysis Errors
/// - [`Error::StaleAnalysis`] - An analysis result was used after the program changed
/// - [`Error::AnalysisNotRegistered`] - An analysis was requested but never registered
///
/// # Examples
///
/// ```rust,no_run
/// use callswap::{Error, Program};
/// use std::path::Path;
///
/// match Program::from_path(Path::new("demos/target_program.ll")) {
///     Ok(program) => println!("loaded {} functions", program.function_count()),
///     Err(Error::Parse { line, column, message }) => {
///         eprintln!("{line}:{column}: {message}");
///     }
///     Err(e) => eprintln!("error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while reading the program file,
    /// such as a missing file or insufficient permissions. The I/O error is
    /// the [`source`](std::error::Error::source) of this one.
    #[error("failed to read program file")]
    FileError(#[from] std::io::Error),

    /// The program text could not be parsed.
    ///
    /// # Fields
    ///
    /// * `line` - 1-based line of the offending token
    /// * `column` - 1-based column of the offending token
    /// * `message` - Description of what was expected
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        /// Line of the offending token
        line: usize,
        /// Column of the offending token
        column: usize,
        /// Description of the problem
        message: String,
    },

    /// The program violates structural invariants.
    ///
    /// Contains every error-level diagnostic the verifier produced. At
    /// [`VerificationStage::Output`] this signals a bug in a transformation.
    #[error("{stage} program failed verification: {}", summarize(.diagnostics))]
    Verification {
        /// Which verification run rejected the program
        stage: VerificationStage,
        /// The error-level diagnostics
        diagnostics: Vec<Diagnostic>,
    },

    /// The replacement function is not present in the program.
    ///
    /// Rewriting a call to a function that does not exist would produce an
    /// invalid program, so this aborts the transformation before any change.
    #[error("replacement function '{0}' does not exist in the program")]
    MissingSymbol(String),

    /// An in-place call rewrite does not agree with the replacement's signature.
    ///
    /// Raised before any call site is mutated.
    #[error("signature mismatch at {site}: expected {expected}, found {found}")]
    SignatureMismatch {
        /// Location of the offending call site
        site: InstructionLocation,
        /// The replacement's signature
        expected: String,
        /// The signature the mutated call would have
        found: String,
    },

    /// An analysis result was consumed against a different program state.
    ///
    /// Analysis results reference instructions by position and are tagged with
    /// the program generation they were computed from.
    #[error("stale analysis result: computed for {expected}, program is at {found}")]
    StaleAnalysis {
        /// The program identity and generation the result was computed for
        expected: String,
        /// The current program identity and generation
        found: String,
    },

    /// The requested analysis was never registered with the analysis manager.
    #[error("analysis '{0}' is not registered")]
    AnalysisNotRegistered(&'static str),

    /// The replacement counter can no longer be represented as an `i32` constant.
    #[error("replacement counter overflowed after {0}")]
    CounterOverflow(i32),

    /// An internal invariant was violated.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
