//! # callswap Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the callswap library. Import this module to get quick access to the essential
//! types for loading, analyzing and rewriting programs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all callswap operations
pub use crate::Error;

/// The result type used throughout callswap
pub use crate::Result;

/// Which verification run rejected a program
pub use crate::VerificationStage;

// ================================================================================================
// Program Model
// ================================================================================================

/// The in-memory program and its building blocks
pub use crate::ir::{
    BasicBlock, Function, Instruction, InstructionCategory, InstructionLocation, IrType, Op,
    Operand, Param, Program, Signature, Value,
};

/// Verification
pub use crate::ir::{
    Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics, Verifier, VerifierReport,
};

// ================================================================================================
// Analyses and Transformations
// ================================================================================================

/// Analysis trait, registry and the call-site analysis
pub use crate::analysis::{
    Analysis, AnalysisManager, CallSite, CallSiteFinder, CallSiteSet, NameMatch,
    PreservedAnalyses,
};

/// Transformation trait and the call-site rewriter
pub use crate::transform::{
    ArgumentPolicy, CallSiteReplacer, Replacement, ReplacementCounter, RewriteStrategy,
    TransformPass,
};

// ================================================================================================
// Pipeline
// ================================================================================================

/// The stage machine driving a full run
pub use crate::pipeline::{AnalysisOutput, Pipeline, PipelineOutput, PipelineStage, RewriteConfig};
