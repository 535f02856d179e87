//! Typed analysis registry with memoized results.
//!
//! The [`AnalysisManager`] owns one instance of every registered [`Analysis`] and
//! caches the most recent result of each. Results are keyed by analysis type and
//! tagged with the [`ProgramId`] and generation they were computed for, so asking
//! again for an unmodified program returns the cached value, while asking after a
//! mutation recomputes it.
//!
//! Transformations report which results they keep intact through
//! [`PreservedAnalyses`]; [`AnalysisManager::invalidate`] evicts everything else.
//!
//! # Examples
//!
//! ```rust
//! use callswap::analysis::{AnalysisManager, CallSiteFinder, NameMatch};
//! use callswap::Program;
//!
//! let program = Program::from_source("declare void @_Z3foov()\n")?;
//!
//! let mut manager = AnalysisManager::new();
//! manager.register(CallSiteFinder::new("foo()", NameMatch::Demangled));
//!
//! let sites = manager.get_result::<CallSiteFinder>(&program)?;
//! assert!(sites.is_empty());
//!
//! // A second request for the same program state is served from the cache.
//! manager.get_result::<CallSiteFinder>(&program)?;
//! assert_eq!(manager.computation_count(), 1);
//! # Ok::<(), callswap::Error>(())
//! ```

use std::{
    any::{type_name, TypeId},
    collections::HashSet,
};

use log::debug;
use type_map::TypeMap;

use crate::{
    analysis::Analysis,
    ir::{Program, ProgramId},
    Error, Result,
};

/// The set of analyses a transformation leaves valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedAnalyses {
    all: bool,
    preserved: HashSet<TypeId>,
}

impl PreservedAnalyses {
    /// Nothing was changed; every analysis stays valid.
    #[must_use]
    pub fn all() -> Self {
        PreservedAnalyses {
            all: true,
            preserved: HashSet::new(),
        }
    }

    /// No analysis survives the transformation.
    #[must_use]
    pub fn none() -> Self {
        PreservedAnalyses::default()
    }

    /// Marks the analysis `A` as still valid.
    #[must_use]
    pub fn preserve<A: Analysis>(mut self) -> Self {
        self.preserved.insert(TypeId::of::<A>());
        self
    }

    /// Returns true if the results of `A` are still valid.
    #[must_use]
    pub fn is_preserved<A: Analysis>(&self) -> bool {
        self.all || self.preserved.contains(&TypeId::of::<A>())
    }

    /// Returns true if every analysis is still valid.
    #[must_use]
    pub const fn preserves_all(&self) -> bool {
        self.all
    }

    /// Returns true if no analysis is still valid.
    #[must_use]
    pub fn preserves_none(&self) -> bool {
        !self.all && self.preserved.is_empty()
    }
}

struct Registered<A: Analysis>(A);

struct Cached<A: Analysis> {
    program: ProgramId,
    generation: u64,
    result: A::Result,
}

/// Type-erased handles to the cache entry of one registered analysis.
struct Registration {
    analysis: TypeId,
    name: &'static str,
    evict: fn(&mut TypeMap) -> bool,
    retag: fn(&mut TypeMap, ProgramId, u64),
}

fn evict<A: Analysis>(results: &mut TypeMap) -> bool {
    results.remove::<Cached<A>>().is_some()
}

fn retag<A: Analysis>(results: &mut TypeMap, program: ProgramId, generation: u64) {
    if let Some(cached) = results.get_mut::<Cached<A>>() {
        if cached.program == program {
            cached.generation = generation;
        }
    }
}

/// Registry of analyses and their cached results.
///
/// A manager is not tied to one program: results carry the identity of the
/// program they describe, and a request for a different program (or a later
/// generation of the same one) recomputes.
pub struct AnalysisManager {
    analyses: TypeMap,
    results: TypeMap,
    registrations: Vec<Registration>,
    computations: usize,
}

impl AnalysisManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        AnalysisManager {
            analyses: TypeMap::new(),
            results: TypeMap::new(),
            registrations: Vec::new(),
            computations: 0,
        }
    }

    /// Registers an analysis, replacing any earlier instance of the same type.
    ///
    /// Replacing an analysis drops its cached result, since the new instance may
    /// be configured differently.
    ///
    /// # Arguments
    ///
    /// * `analysis` - The configured analysis instance
    pub fn register<A: Analysis>(&mut self, analysis: A) {
        debug!("registering analysis '{}'", analysis.name());
        if self.analyses.insert(Registered(analysis)).is_some() {
            evict::<A>(&mut self.results);
            return;
        }
        self.registrations.push(Registration {
            analysis: TypeId::of::<A>(),
            name: type_name::<A>(),
            evict: evict::<A>,
            retag: retag::<A>,
        });
    }

    /// Returns the result of `A` for the current state of `program`.
    ///
    /// The result is computed on the first request and reused for as long as the
    /// program keeps its identity and generation.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to analyze
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalysisNotRegistered`] if `A` was never registered.
    pub fn get_result<A: Analysis>(&mut self, program: &Program) -> Result<&A::Result> {
        let fresh = self
            .results
            .get::<Cached<A>>()
            .is_some_and(|cached| {
                cached.program == program.id() && cached.generation == program.generation()
            });

        if !fresh {
            let Registered(analysis) = self
                .analyses
                .get::<Registered<A>>()
                .ok_or(Error::AnalysisNotRegistered(type_name::<A>()))?;

            debug!(
                "computing '{}' for {} at generation {}",
                analysis.name(),
                program.id(),
                program.generation()
            );
            let result = analysis.run(program);
            self.computations += 1;
            self.results.insert(Cached::<A> {
                program: program.id(),
                generation: program.generation(),
                result,
            });
        }

        self.results
            .get::<Cached<A>>()
            .map(|cached| &cached.result)
            .ok_or_else(|| {
                malformed_error!("result of '{}' vanished from the cache", type_name::<A>())
            })
    }

    /// Returns the cached result of `A` if it is current for `program`, without
    /// computing anything.
    #[must_use]
    pub fn cached_result<A: Analysis>(&self, program: &Program) -> Option<&A::Result> {
        self.results
            .get::<Cached<A>>()
            .filter(|cached| {
                cached.program == program.id() && cached.generation == program.generation()
            })
            .map(|cached| &cached.result)
    }

    /// Drops every cached result that `preserved` does not cover.
    ///
    /// Preserved results are re-tagged with the current generation of `program`,
    /// so they keep being served after the mutation that preceded this call.
    ///
    /// # Arguments
    ///
    /// * `program` - The program the transformation ran on
    /// * `preserved` - What the transformation reported as still valid
    ///
    /// # Returns
    ///
    /// The number of evicted results.
    pub fn invalidate(&mut self, program: &Program, preserved: &PreservedAnalyses) -> usize {
        let mut evicted = 0;
        for registration in &self.registrations {
            if preserved.all || preserved.preserved.contains(&registration.analysis) {
                (registration.retag)(&mut self.results, program.id(), program.generation());
            } else if (registration.evict)(&mut self.results) {
                debug!("invalidated analysis '{}'", registration.name);
                evicted += 1;
            }
        }
        evicted
    }

    /// Returns how many times any analysis was actually computed.
    #[must_use]
    pub const fn computation_count(&self) -> usize {
        self.computations
    }
}

impl Default for AnalysisManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalysisManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.registrations.iter().map(|r| r.name).collect();
        f.debug_struct("AnalysisManager")
            .field("analyses", &names)
            .field("computations", &self.computations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Instruction, InstructionLocation, Op},
        test::factories::two_foo_calls,
    };

    struct InstructionCount;

    impl Analysis for InstructionCount {
        type Result = usize;

        fn name(&self) -> &'static str {
            "instruction-count"
        }

        fn run(&self, program: &Program) -> usize {
            program.instruction_count()
        }
    }

    struct FunctionCount;

    impl Analysis for FunctionCount {
        type Result = usize;

        fn name(&self) -> &'static str {
            "function-count"
        }

        fn run(&self, program: &Program) -> usize {
            program.function_count()
        }
    }

    #[test]
    fn test_unregistered_analysis() {
        let program = two_foo_calls();
        let mut manager = AnalysisManager::new();
        assert!(matches!(
            manager.get_result::<InstructionCount>(&program),
            Err(Error::AnalysisNotRegistered(_))
        ));
    }

    #[test]
    fn test_memoized_until_mutation() {
        let mut program = two_foo_calls();
        let mut manager = AnalysisManager::new();
        manager.register(InstructionCount);

        let first = *manager.get_result::<InstructionCount>(&program).unwrap();
        let second = *manager.get_result::<InstructionCount>(&program).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.computation_count(), 1);
        assert!(manager.cached_result::<InstructionCount>(&program).is_some());

        program
            .replace_instruction(
                InstructionLocation::new(2, 0, 0),
                Instruction::new(Op::Unreachable),
            )
            .unwrap();
        assert!(manager.cached_result::<InstructionCount>(&program).is_none());
        manager.get_result::<InstructionCount>(&program).unwrap();
        assert_eq!(manager.computation_count(), 2);
    }

    #[test]
    fn test_results_are_scoped_to_one_program() {
        let program = two_foo_calls();
        let copy = program.clone();
        let mut manager = AnalysisManager::new();
        manager.register(InstructionCount);

        manager.get_result::<InstructionCount>(&program).unwrap();
        manager.get_result::<InstructionCount>(&copy).unwrap();
        assert_eq!(manager.computation_count(), 2);
    }

    #[test]
    fn test_invalidate_respects_preserved_set() {
        let mut program = two_foo_calls();
        let mut manager = AnalysisManager::new();
        manager.register(InstructionCount);
        manager.register(FunctionCount);

        manager.get_result::<InstructionCount>(&program).unwrap();
        manager.get_result::<FunctionCount>(&program).unwrap();

        let _ = program.functions_mut();
        let preserved = PreservedAnalyses::none().preserve::<FunctionCount>();
        assert_eq!(manager.invalidate(&program, &preserved), 1);

        assert!(manager.cached_result::<FunctionCount>(&program).is_some());
        assert!(manager.cached_result::<InstructionCount>(&program).is_none());

        assert_eq!(manager.invalidate(&program, &PreservedAnalyses::none()), 1);
        assert!(manager.cached_result::<FunctionCount>(&program).is_none());
    }

    #[test]
    fn test_preserved_analyses_flags() {
        assert!(PreservedAnalyses::all().preserves_all());
        assert!(PreservedAnalyses::all().is_preserved::<InstructionCount>());
        assert!(PreservedAnalyses::none().preserves_none());
        let some = PreservedAnalyses::none().preserve::<InstructionCount>();
        assert!(some.is_preserved::<InstructionCount>());
        assert!(!some.is_preserved::<FunctionCount>());
        assert!(!some.preserves_none());
    }

    #[test]
    fn test_reregistering_drops_cached_result() {
        let program = two_foo_calls();
        let mut manager = AnalysisManager::new();
        manager.register(InstructionCount);
        manager.get_result::<InstructionCount>(&program).unwrap();

        manager.register(InstructionCount);
        assert!(manager.cached_result::<InstructionCount>(&program).is_none());
    }
}
