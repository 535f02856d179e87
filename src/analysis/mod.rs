//! Program analyses.
//!
//! Analyses read a [`Program`] and compute a result without changing it. They are
//! registered with an [`AnalysisManager`], which computes each result lazily and
//! reuses it for as long as the program is not mutated.
//!
//! # Key Components
//!
//! - [`Analysis`] - The trait every analysis implements
//! - [`AnalysisManager`] - Typed registry with memoized, invalidatable results
//! - [`PreservedAnalyses`] - What a transformation reports as still valid
//! - [`CallSiteFinder`] - Locates direct calls to one configured function
//! - [`CallSiteSet`] / [`CallSite`] - Its position-based result
//! - [`NameMatch`] / [`SymbolMatcher`] - Raw or demangled symbol comparison

mod callsite;
mod manager;
mod naming;

pub use callsite::{CallSite, CallSiteFinder, CallSiteSet};
pub use manager::{AnalysisManager, PreservedAnalyses};
pub use naming::{resolve_function, NameMatch, SymbolMatcher};

use crate::ir::Program;

/// A read-only computation over a whole program.
///
/// Implementations are registered by value with an [`AnalysisManager`] and
/// looked up by type, so each analysis type has at most one configured instance
/// per manager.
pub trait Analysis: 'static {
    /// The computed result.
    type Result: 'static;

    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Computes the result for the current state of `program`.
    ///
    /// Must not have side effects beyond logging.
    fn run(&self, program: &Program) -> Self::Result;
}
