//! Call-site discovery.
//!
//! The [`CallSiteFinder`] locates every direct call to one configured function and
//! returns them as a [`CallSiteSet`]. The set refers to instructions by position
//! ([`InstructionLocation`]) and remembers which program state it describes, so a
//! consumer can detect that the program changed underneath it.
//!
//! # Matching Rules
//!
//! A call instruction is a member of the set iff:
//!
//! - its callee is a function symbol (`call void @f()`), not a pointer value;
//! - that symbol names a function of the program (definition or declaration);
//! - the symbol, normalized per [`NameMatch`], equals the configured target.
//!
//! Calls through pointers are never reported, even when the pointer provably holds
//! the target's address.
//!
//! # Ordering
//!
//! Functions are visited in declaration order, blocks in layout order and
//! instructions in layout order. This is the iteration order of the set, and it is
//! stable across runs on an unmodified program.

use std::{collections::HashSet, fmt};

use log::{debug, info};

use crate::{
    analysis::{naming::SymbolMatcher, Analysis, NameMatch},
    ir::{Callee, InstructionLocation, Program, ProgramId},
    Error, Result,
};

/// One direct call to the target function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Position of the call instruction.
    pub location: InstructionLocation,
    /// Raw symbol of the function containing the call.
    pub caller: String,
    /// Label of the block containing the call.
    pub block: String,
    /// Raw symbol of the called function.
    pub callee: String,
}

impl CallSite {
    /// Creates a new call site.
    ///
    /// # Arguments
    ///
    /// * `location` - Position of the call instruction
    /// * `caller` - Symbol of the enclosing function
    /// * `block` - Label of the enclosing block
    /// * `callee` - Symbol of the called function
    pub fn new(
        location: InstructionLocation,
        caller: impl Into<String>,
        block: impl Into<String>,
        callee: impl Into<String>,
    ) -> Self {
        CallSite {
            location,
            caller: caller.into(),
            block: block.into(),
            callee: callee.into(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{} %{} #{}: call @{}",
            self.caller, self.block, self.location.index, self.callee
        )
    }
}

/// Insertion-ordered, duplicate-free set of call sites for one program state.
///
/// The set does not own or borrow instructions. It is tagged with the
/// [`ProgramId`] and generation of the program it was computed from and is only
/// meaningful for exactly that state; see [`CallSiteSet::ensure_current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteSet {
    program: ProgramId,
    generation: u64,
    target: String,
    sites: Vec<CallSite>,
    seen: HashSet<InstructionLocation>,
}

impl CallSiteSet {
    /// Creates an empty set describing the current state of `program`.
    pub fn new(program: &Program, target: impl Into<String>) -> Self {
        CallSiteSet {
            program: program.id(),
            generation: program.generation(),
            target: target.into(),
            sites: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Adds a site unless one with the same location is already present.
    ///
    /// # Returns
    ///
    /// `true` if the site was added.
    pub fn insert(&mut self, site: CallSite) -> bool {
        if !self.seen.insert(site.location) {
            return false;
        }
        self.sites.push(site);
        true
    }

    /// Returns the name the sites were matched against.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the identity of the program this set describes.
    #[must_use]
    pub const fn program_id(&self) -> ProgramId {
        self.program
    }

    /// Returns the program generation this set describes.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true if no site was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Returns the sites in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, CallSite> {
        self.sites.iter()
    }

    /// Returns the site at `index` in traversal order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CallSite> {
        self.sites.get(index)
    }

    /// Returns true if a site exists at `location`.
    #[must_use]
    pub fn contains(&self, location: InstructionLocation) -> bool {
        self.seen.contains(&location)
    }

    /// Returns true if this set was computed from the current state of `program`.
    #[must_use]
    pub fn is_current_for(&self, program: &Program) -> bool {
        self.program == program.id() && self.generation == program.generation()
    }

    /// Checks that this set still describes `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleAnalysis`] if the set was computed for another
    /// program or for an earlier generation of this one.
    pub fn ensure_current(&self, program: &Program) -> Result<()> {
        if self.is_current_for(program) {
            return Ok(());
        }
        Err(Error::StaleAnalysis {
            expected: format!("{} generation {}", self.program, self.generation),
            found: format!("{} generation {}", program.id(), program.generation()),
        })
    }
}

impl<'a> IntoIterator for &'a CallSiteSet {
    type Item = &'a CallSite;
    type IntoIter = std::slice::Iter<'a, CallSite>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

impl IntoIterator for CallSiteSet {
    type Item = CallSite;
    type IntoIter = std::vec::IntoIter<CallSite>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.into_iter()
    }
}

/// Finds all direct calls to one function.
///
/// # Examples
///
/// ```rust
/// use callswap::analysis::{CallSiteFinder, NameMatch};
/// use callswap::Program;
///
/// let program = Program::from_source(
///     "declare void @_Z3foov()\n\
///      define i32 @main() {\n\
///      entry:\n\
///        call void @_Z3foov()\n\
///        call void @_Z3foov()\n\
///        ret i32 0\n\
///      }\n",
/// )?;
///
/// let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);
/// assert_eq!(sites.len(), 2);
/// assert!(sites.iter().all(|site| site.caller == "main"));
/// # Ok::<(), callswap::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteFinder {
    matcher: SymbolMatcher,
}

impl CallSiteFinder {
    /// Creates a finder for calls to `target`.
    ///
    /// # Arguments
    ///
    /// * `target` - Demangled name (`foo()`) or raw symbol (`_Z3foov`), per `mode`
    /// * `mode` - How `target` is compared against function symbols
    pub fn new(target: impl Into<String>, mode: NameMatch) -> Self {
        CallSiteFinder {
            matcher: SymbolMatcher::new(target, mode),
        }
    }

    /// Returns the configured target name.
    #[must_use]
    pub fn target(&self) -> &str {
        self.matcher.target()
    }

    /// Returns the name comparison mode.
    #[must_use]
    pub fn mode(&self) -> NameMatch {
        self.matcher.mode()
    }

    /// Scans `program` and returns every direct call to the target.
    #[must_use]
    pub fn find(&self, program: &Program) -> CallSiteSet {
        info!("running code analysis...");

        // normalize every function name once
        let targets: HashSet<&str> = program
            .functions()
            .iter()
            .map(|function| function.name())
            .filter(|name| self.matcher.matches(name))
            .collect();

        let mut sites = CallSiteSet::new(program, self.matcher.target());
        if targets.is_empty() {
            debug!("no function matches '{}'", self.matcher.target());
            return sites;
        }

        for (f, function) in program.functions().iter().enumerate() {
            for (b, block) in function.blocks().iter().enumerate() {
                for (i, instruction) in block.instructions().iter().enumerate() {
                    let Some(call) = instruction.op().as_call() else {
                        continue;
                    };
                    let Callee::Direct(symbol) = &call.callee else {
                        continue;
                    };
                    if !targets.contains(symbol.as_str()) {
                        continue;
                    }

                    let site = CallSite::new(
                        InstructionLocation::new(f, b, i),
                        function.name(),
                        block.label(),
                        symbol.as_str(),
                    );
                    debug!("found call to '{}' in {}", self.matcher.target(), site);
                    sites.insert(site);
                }
            }
        }

        info!(
            "found {} call site(s) to '{}'",
            sites.len(),
            self.matcher.target()
        );
        sites
    }
}

impl Analysis for CallSiteFinder {
    type Result = CallSiteSet;

    fn name(&self) -> &'static str {
        "call-site-finder"
    }

    fn run(&self, program: &Program) -> CallSiteSet {
        self.find(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::{
        indirect_foo_call, no_foo_calls, overloaded_foo, two_foo_calls, TWO_FOO_CALLS,
    };

    #[test]
    fn test_finds_both_calls_in_order() {
        let program = two_foo_calls();
        let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);

        assert_eq!(sites.len(), 2);
        assert_eq!(sites.target(), "foo()");
        let locations: Vec<_> = sites.iter().map(|s| s.location).collect();
        assert!(locations.windows(2).all(|w| w[0] < w[1]));
        for site in &sites {
            assert_eq!(site.caller, "main");
            assert_eq!(site.callee, "_Z3foov");
            let call = program
                .instruction(site.location)
                .and_then(|i| i.op().as_call())
                .unwrap();
            assert_eq!(call.callee, Callee::Direct("_Z3foov".into()));
        }
    }

    #[test]
    fn test_exact_mode_uses_raw_symbols() {
        let program = two_foo_calls();
        assert_eq!(
            CallSiteFinder::new("_Z3foov", NameMatch::Exact).find(&program).len(),
            2
        );
        assert!(CallSiteFinder::new("foo()", NameMatch::Exact)
            .find(&program)
            .is_empty());
    }

    #[test]
    fn test_no_calls() {
        let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&no_foo_calls());
        assert!(sites.is_empty());
    }

    #[test]
    fn test_indirect_call_is_not_found() {
        let program = indirect_foo_call();
        let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);
        assert_eq!(sites.len(), 1);
        let call = program
            .instruction(sites.get(0).unwrap().location)
            .and_then(|i| i.op().as_call())
            .unwrap();
        assert!(!call.callee.is_indirect());
    }

    #[test]
    fn test_overloads_are_distinct() {
        let program = overloaded_foo();
        assert_eq!(
            CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program).len(),
            1
        );
        assert_eq!(
            CallSiteFinder::new("foo(int)", NameMatch::Demangled).find(&program).len(),
            2
        );
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let program = Program::from_source(TWO_FOO_CALLS).unwrap();
        let finder = CallSiteFinder::new("foo()", NameMatch::Demangled);
        assert_eq!(finder.find(&program), finder.find(&program));
    }

    #[test]
    fn test_staleness() {
        let mut program = two_foo_calls();
        let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);
        assert!(sites.ensure_current(&program).is_ok());

        let copy = program.clone();
        assert!(matches!(
            sites.ensure_current(&copy),
            Err(Error::StaleAnalysis { .. })
        ));

        let _ = program.functions_mut();
        assert!(!sites.is_current_for(&program));
    }

    #[test]
    fn test_set_rejects_duplicates() {
        let program = two_foo_calls();
        let mut set = CallSiteSet::new(&program, "foo()");
        let site = CallSite::new(InstructionLocation::new(2, 0, 0), "main", "entry", "_Z3foov");
        assert!(set.insert(site.clone()));
        assert!(!set.insert(site));
        assert_eq!(set.len(), 1);
        assert!(set.contains(InstructionLocation::new(2, 0, 0)));
    }
}
