//! Program transformations.
//!
//! A transformation mutates a [`Program`] and reports which analysis results
//! survived the mutation. The driver hands that report to
//! [`AnalysisManager::invalidate`] so that no stale result is served afterwards.
//!
//! # Key Components
//!
//! - [`TransformPass`] - The trait every transformation implements
//! - [`CallSiteReplacer`] - Rewrites calls to one function into calls to another
//! - [`ReplacementCounter`] - Source of the injected argument under the counter policy
//! - [`ArgumentPolicy`] / [`RewriteStrategy`] - How arguments are chosen and calls rewritten

mod policy;
mod replacer;

pub use policy::{ArgumentPolicy, ReplacementCounter, RewriteStrategy};
pub use replacer::{CallSiteReplacer, Replacement, DEFAULT_FIXED_VALUE};

use crate::{
    analysis::{AnalysisManager, PreservedAnalyses},
    ir::Program,
    Result,
};

/// A mutation of a whole program.
pub trait TransformPass {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Runs the transformation.
    ///
    /// Analysis results needed by the pass are requested from `analyses`; the
    /// returned set names the results the pass left valid.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the program cannot be transformed. The
    /// program should be left unchanged in that case.
    fn run(
        &mut self,
        program: &mut Program,
        analyses: &mut AnalysisManager,
    ) -> Result<PreservedAnalyses>;
}
