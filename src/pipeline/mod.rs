//! The call-site rewriting pipeline.
//!
//! A [`Pipeline`] owns one loaded [`Program`] and an [`AnalysisManager`] with the
//! [`CallSiteFinder`] registered, and drives them through a fixed sequence of
//! stages:
//!
//! ```text
//! Loaded → Verified → Analyzed → Transformed → ReVerified → Printed
//!              └────────────── Rejected ─────────────┘
//! ```
//!
//! Every stage runs at most once per pipeline. A verification failure on either
//! side of the transformation moves the pipeline to [`PipelineStage::Rejected`]
//! and returns [`crate::Error::Verification`]. Broken debug metadata only
//! produces a warning.
//!
//! # Key Components
//!
//! - [`Pipeline`] - The stage machine
//! - [`RewriteConfig`] - Target, replacement and argument settings
//! - [`PipelineOutput`] - Result of a full run
//! - [`AnalysisOutput`] - Result of an analysis-only run
//!
//! # Examples
//!
//! ```rust
//! use callswap::pipeline::{Pipeline, PipelineStage, RewriteConfig};
//!
//! let source = "declare void @_Z3foov()\n\
//!               declare void @_Z3bari(i32)\n\
//!               define i32 @main() {\n\
//!               entry:\n\
//!                 call void @_Z3foov()\n\
//!                 ret i32 0\n\
//!               }\n";
//!
//! let mut pipeline = Pipeline::from_source(source, RewriteConfig::default())?;
//! let output = pipeline.run()?;
//!
//! assert_eq!(output.replacements.len(), 1);
//! assert_eq!(pipeline.stages().last(), Some(&PipelineStage::Printed));
//! assert!(output.rendered.unwrap().starts_with("the transformed program:\n"));
//! # Ok::<(), callswap::Error>(())
//! ```

mod config;

pub use config::RewriteConfig;

use std::path::Path;

use log::{debug, info, warn};
use strum::{Display, IntoStaticStr};

use crate::{
    analysis::{AnalysisManager, CallSite, CallSiteFinder},
    error::VerificationStage,
    ir::{Diagnostic, Program, VerifierReport},
    transform::{CallSiteReplacer, Replacement, ReplacementCounter, TransformPass},
    Result,
};

/// Heading printed above the transformed program.
pub const BANNER: &str = "the transformed program:";

/// Rule printed between [`BANNER`] and the program.
pub const RULE: &str = "------------------------";

/// The stages a pipeline moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum PipelineStage {
    /// The program was parsed.
    Loaded,
    /// The loaded program passed verification.
    Verified,
    /// Call sites were located.
    Analyzed,
    /// Call sites were rewritten.
    Transformed,
    /// The transformed program passed verification.
    ReVerified,
    /// The transformed program was rendered.
    Printed,
    /// Verification failed; the run was aborted.
    Rejected,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Stages reached, in order.
    pub stages: Vec<PipelineStage>,
    /// Sites located before the rewrite, in traversal order.
    pub sites: Vec<CallSite>,
    /// One entry per rewritten site, in traversal order.
    pub replacements: Vec<Replacement>,
    /// Warning-level diagnostics of both verification runs.
    pub warnings: Vec<Diagnostic>,
    /// Banner plus printed program, if printing was enabled.
    pub rendered: Option<String>,
}

impl PipelineOutput {
    /// Returns true if either verification run flagged broken debug info.
    #[must_use]
    pub fn broken_debug_info(&self) -> bool {
        self.warnings
            .iter()
            .any(|d| d.category == crate::ir::DiagnosticCategory::DebugInfo)
    }
}

/// Result of [`Pipeline::analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Stages reached, in order.
    pub stages: Vec<PipelineStage>,
    /// Located sites, in traversal order.
    pub sites: Vec<CallSite>,
    /// Warning-level diagnostics of the verification run.
    pub warnings: Vec<Diagnostic>,
}

/// Drives one program through verification, analysis, rewriting and
/// re-verification.
#[derive(Debug)]
pub struct Pipeline {
    config: RewriteConfig,
    program: Program,
    analyses: AnalysisManager,
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// Creates a pipeline for an already loaded program.
    ///
    /// The [`CallSiteFinder`] is registered with the configured target and
    /// match mode.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to transform
    /// * `config` - Rewrite settings
    #[must_use]
    pub fn new(program: Program, config: RewriteConfig) -> Self {
        let mut analyses = AnalysisManager::new();
        analyses.register(CallSiteFinder::new(
            config.target.clone(),
            config.match_mode,
        ));
        info!(
            "loaded program with {} function(s)",
            program.function_count()
        );
        Pipeline {
            config,
            program,
            analyses,
            stages: vec![PipelineStage::Loaded],
        }
    }

    /// Parses `source` and creates a pipeline for it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if `source` is not valid program text.
    pub fn from_source(source: &str, config: RewriteConfig) -> Result<Self> {
        Ok(Self::new(Program::from_source(source)?, config))
    }

    /// Reads and parses the file at `path` and creates a pipeline for it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::Parse`] if it is not valid program text.
    pub fn from_path(path: &Path, config: RewriteConfig) -> Result<Self> {
        Ok(Self::new(Program::from_path(path)?, config))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Returns the program in its current state.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the analysis manager, for registering further analyses or
    /// querying memoized results.
    pub fn analyses(&mut self) -> &mut AnalysisManager {
        &mut self.analyses
    }

    /// Returns the stages reached so far.
    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Returns the most recent stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Loaded)
    }

    /// Verifies and analyzes the program without transforming it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Verification`] if the program is invalid, or
    /// [`crate::Error::Malformed`] if the pipeline already ran.
    pub fn analyze(&mut self) -> Result<AnalysisOutput> {
        self.ensure_fresh()?;
        let report = self.verify(VerificationStage::Input)?;
        let sites = self.locate()?;
        Ok(AnalysisOutput {
            stages: self.stages.clone(),
            sites,
            warnings: report.diagnostics().warnings().into_iter().cloned().collect(),
        })
    }

    /// Runs every stage with a counter starting at the configured seed.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with_counter`].
    pub fn run(&mut self) -> Result<PipelineOutput> {
        let mut counter = self.config.counter();
        self.run_with_counter(&mut counter)
    }

    /// Runs every stage, drawing counter values from `counter`.
    ///
    /// On success `counter` holds the value after the last replacement, so
    /// numbering can continue across several pipelines.
    ///
    /// # Arguments
    ///
    /// * `counter` - Counter threaded through the replacer
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Verification`] if the program is invalid before or after
    ///   the rewrite
    /// - any error of [`CallSiteReplacer::replace`]
    /// - [`crate::Error::Malformed`] if the pipeline already ran
    pub fn run_with_counter(&mut self, counter: &mut ReplacementCounter) -> Result<PipelineOutput> {
        self.ensure_fresh()?;
        let input = self.verify(VerificationStage::Input)?;
        let sites = self.locate()?;

        let mut replacer = CallSiteReplacer::new(self.config.replacement.clone())
            .with_policy(self.config.policy)
            .with_fixed_value(self.config.fixed_value)
            .with_strategy(self.config.strategy)
            .with_counter(*counter);
        info!("running transformation '{}'", replacer.name());
        let preserved = replacer.run(&mut self.program, &mut self.analyses)?;
        self.analyses.invalidate(&self.program, &preserved);
        *counter = replacer.counter();
        self.stages.push(PipelineStage::Transformed);

        let output = self.verify(VerificationStage::Output)?;

        let rendered = if self.config.print {
            self.stages.push(PipelineStage::Printed);
            Some(format!("{BANNER}\n{RULE}\n{}", self.program))
        } else {
            None
        };

        let mut warnings: Vec<Diagnostic> =
            input.diagnostics().warnings().into_iter().cloned().collect();
        for warning in output.diagnostics().warnings() {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }

        Ok(PipelineOutput {
            stages: self.stages.clone(),
            sites,
            replacements: replacer.take_replacements(),
            warnings,
            rendered,
        })
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.stages.len() > 1 {
            return Err(malformed_error!(
                "pipeline already ran up to stage '{}'",
                self.stage()
            ));
        }
        Ok(())
    }

    fn verify(&mut self, stage: VerificationStage) -> Result<VerifierReport> {
        let report = self.program.verify();
        if stage == VerificationStage::Input && report.broken_debug_info() {
            warn!("caution: debug info is broken");
        }
        match report.into_result(stage) {
            Ok(report) => {
                self.stages.push(match stage {
                    VerificationStage::Input => PipelineStage::Verified,
                    VerificationStage::Output => PipelineStage::ReVerified,
                });
                Ok(report)
            }
            Err(e) => {
                debug!("{e}");
                self.stages.push(PipelineStage::Rejected);
                Err(e)
            }
        }
    }

    fn locate(&mut self) -> Result<Vec<CallSite>> {
        let sites = self
            .analyses
            .get_result::<CallSiteFinder>(&self.program)?
            .iter()
            .cloned()
            .collect();
        self.stages.push(PipelineStage::Analyzed);
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::factories::{missing_bar, two_foo_calls, TWO_FOO_CALLS},
        Error,
    };

    #[test]
    fn test_full_run() {
        let mut pipeline = Pipeline::new(two_foo_calls(), RewriteConfig::default());
        let output = pipeline.run().unwrap();

        assert_eq!(
            output.stages,
            [
                PipelineStage::Loaded,
                PipelineStage::Verified,
                PipelineStage::Analyzed,
                PipelineStage::Transformed,
                PipelineStage::ReVerified,
                PipelineStage::Printed,
            ]
        );
        assert_eq!(output.sites.len(), 2);
        let arguments: Vec<_> = output.replacements.iter().map(|r| r.argument).collect();
        assert_eq!(arguments, [1, 2]);

        let rendered = output.rendered.unwrap();
        assert!(rendered.starts_with("the transformed program:\n------------------------\n"));
        assert!(rendered.contains("call void @_Z3bari(i32 1)"));
        assert!(!rendered.contains("call void @_Z3foov()"));
    }

    #[test]
    fn test_rendered_program_parses_back() {
        let mut pipeline = Pipeline::new(two_foo_calls(), RewriteConfig::default());
        let rendered = pipeline.run().unwrap().rendered.unwrap();
        let text = rendered
            .strip_prefix(&format!("{BANNER}\n{RULE}\n"))
            .unwrap();
        assert_eq!(&Program::from_source(text).unwrap(), pipeline.program());
    }

    #[test]
    fn test_each_run_restarts_the_counter() {
        let config = RewriteConfig::default().with_print(false);
        for _ in 0..2 {
            let mut pipeline = Pipeline::new(two_foo_calls(), config.clone());
            let output = pipeline.run().unwrap();
            assert_eq!(output.replacements[0].argument, 1);
            assert!(output.rendered.is_none());
            assert_eq!(pipeline.stage(), PipelineStage::ReVerified);
        }
    }

    #[test]
    fn test_threaded_counter() {
        let mut counter = ReplacementCounter::default();
        for expected in [[1, 2], [3, 4]] {
            let mut pipeline = Pipeline::new(two_foo_calls(), RewriteConfig::default());
            let output = pipeline.run_with_counter(&mut counter).unwrap();
            let arguments: Vec<_> = output.replacements.iter().map(|r| r.argument).collect();
            assert_eq!(arguments, expected);
        }
        assert_eq!(counter.peek(), Some(5));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let source = "define i32 @main() {\nentry:\n  ret void\n}\n";
        let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
        let err = pipeline.run().unwrap_err();
        assert!(matches!(
            err,
            Error::Verification {
                stage: VerificationStage::Input,
                ..
            }
        ));
        assert_eq!(
            pipeline.stages(),
            [PipelineStage::Loaded, PipelineStage::Rejected]
        );
    }

    #[test]
    fn test_missing_replacement_aborts() {
        let mut pipeline = Pipeline::new(missing_bar(), RewriteConfig::default());
        let before = pipeline.program().clone();
        assert!(matches!(pipeline.run(), Err(Error::MissingSymbol(_))));
        assert_eq!(pipeline.program(), &before);
        assert_eq!(pipeline.stage(), PipelineStage::Analyzed);
    }

    #[test]
    fn test_stages_run_once() {
        let mut pipeline = Pipeline::new(two_foo_calls(), RewriteConfig::default());
        pipeline.run().unwrap();
        assert!(matches!(pipeline.run(), Err(Error::Malformed { .. })));
        assert!(matches!(pipeline.analyze(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_analyze_only() {
        let mut pipeline = Pipeline::from_source(TWO_FOO_CALLS, RewriteConfig::default()).unwrap();
        let before = pipeline.program().clone();
        let output = pipeline.analyze().unwrap();

        assert_eq!(output.sites.len(), 2);
        assert_eq!(
            output.stages,
            [
                PipelineStage::Loaded,
                PipelineStage::Verified,
                PipelineStage::Analyzed
            ]
        );
        assert_eq!(pipeline.program(), &before);

        // served from the cache
        let computations = pipeline.analyses().computation_count();
        let Pipeline {
            program, analyses, ..
        } = &mut pipeline;
        analyses.get_result::<CallSiteFinder>(program).unwrap();
        assert_eq!(analyses.computation_count(), computations);
    }

    #[test]
    fn test_broken_debug_info_is_a_warning() {
        let source = "declare void @_Z3foov()\ndeclare void @_Z3bari(i32)\n\
                      define void @main() {\nentry:\n  call void @_Z3foov(), !dbg !9\n  ret void\n}\n";
        let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
        let output = pipeline.run().unwrap();
        assert!(output.broken_debug_info());
        assert_eq!(output.replacements.len(), 1);
    }
}
