//! Call-site rewriting.
//!
//! The [`CallSiteReplacer`] takes the [`CallSiteSet`] computed for a program and
//! rewrites every listed call to call a replacement function with a single
//! synthesized `i32` argument.
//!
//! # Procedure
//!
//! 1. The set is checked against the program's identity and generation
//!    ([`Error::StaleAnalysis`]).
//! 2. If the set is empty nothing else happens; the replacement is not looked up.
//! 3. The replacement is resolved by exact symbol, then by demangled name
//!    ([`Error::MissingSymbol`]).
//! 4. Every site is checked before the first rewrite: it must still be a direct
//!    call, and the rewritten call must agree with the replacement's signature
//!    ([`Error::SignatureMismatch`]).
//! 5. Arguments are synthesized in set order and the sites are rewritten.
//!
//! Any error in steps 1-4 leaves the program untouched.
//!
//! # Strategies
//!
//! - [`RewriteStrategy::Replace`] builds a new call with the replacement's return
//!   type, carries over the debug location and swaps it in. A call whose result
//!   is bound keeps its result name, so the replacement must return the same
//!   type there.
//! - [`RewriteStrategy::Mutate`] edits callee and arguments of the existing call,
//!   keeping its return type, result name and debug location. The replacement's
//!   return type therefore has to match the old call's.

use log::{debug, info};

use crate::{
    analysis::{resolve_function, AnalysisManager, CallSiteFinder, CallSiteSet, PreservedAnalyses},
    ir::{CallOp, Callee, Instruction, InstructionLocation, IrType, Op, Operand, Program, Signature},
    transform::{ArgumentPolicy, ReplacementCounter, RewriteStrategy, TransformPass},
    Error, Result,
};

/// The constant injected at every site under [`ArgumentPolicy::Fixed`] unless
/// configured otherwise.
pub const DEFAULT_FIXED_VALUE: i32 = 42;

/// Record of one rewritten call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Replacement {
    /// Position of the rewritten instruction.
    pub location: InstructionLocation,
    /// Raw symbol of the function containing the call.
    pub caller: String,
    /// Label of the block containing the call.
    pub block: String,
    /// Raw symbol of the function called before the rewrite.
    pub original: String,
    /// Raw symbol of the function called after the rewrite.
    pub replacement: String,
    /// The injected argument.
    pub argument: i32,
}

/// Rewrites calls to one function into calls to another.
///
/// # Examples
///
/// ```rust
/// use callswap::analysis::{CallSiteFinder, NameMatch};
/// use callswap::transform::CallSiteReplacer;
/// use callswap::Program;
///
/// let mut program = Program::from_source(
///     "declare void @_Z3foov()\n\
///      declare void @_Z3bari(i32)\n\
///      define i32 @main() {\n\
///      entry:\n\
///        call void @_Z3foov()\n\
///        call void @_Z3foov()\n\
///        ret i32 0\n\
///      }\n",
/// )?;
///
/// let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);
/// let mut replacer = CallSiteReplacer::new("_Z3bari");
/// let replacements = replacer.replace(&mut program, sites)?;
///
/// let arguments: Vec<i32> = replacements.iter().map(|r| r.argument).collect();
/// assert_eq!(arguments, [1, 2]);
/// assert!(program.to_string().contains("call void @_Z3bari(i32 2)"));
/// # Ok::<(), callswap::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct CallSiteReplacer {
    replacement: String,
    policy: ArgumentPolicy,
    fixed_value: i32,
    strategy: RewriteStrategy,
    counter: ReplacementCounter,
    replacements: Vec<Replacement>,
}

impl CallSiteReplacer {
    /// Creates a replacer targeting `replacement` with the counter policy, the
    /// replace strategy and a counter starting at 1.
    ///
    /// # Arguments
    ///
    /// * `replacement` - Raw symbol (`_Z3bari`) or demangled name (`bar(int)`)
    pub fn new(replacement: impl Into<String>) -> Self {
        CallSiteReplacer {
            replacement: replacement.into(),
            policy: ArgumentPolicy::default(),
            fixed_value: DEFAULT_FIXED_VALUE,
            strategy: RewriteStrategy::default(),
            counter: ReplacementCounter::default(),
            replacements: Vec::new(),
        }
    }

    /// Sets the argument policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the constant used by [`ArgumentPolicy::Fixed`].
    #[must_use]
    pub fn with_fixed_value(mut self, value: i32) -> Self {
        self.fixed_value = value;
        self
    }

    /// Sets the rewrite strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: RewriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Threads an existing counter through this replacer.
    #[must_use]
    pub fn with_counter(mut self, counter: ReplacementCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Returns the counter in its current state.
    #[must_use]
    pub const fn counter(&self) -> ReplacementCounter {
        self.counter
    }

    /// Returns the replacements made by the last pass run.
    #[must_use]
    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// Takes the replacements made by the last pass run.
    pub fn take_replacements(&mut self) -> Vec<Replacement> {
        std::mem::take(&mut self.replacements)
    }

    /// Rewrites every site of `sites` in `program`.
    ///
    /// The set is consumed; after this call it no longer describes the program.
    ///
    /// # Arguments
    ///
    /// * `program` - The program the set was computed from
    /// * `sites` - Result of a [`CallSiteFinder`] run on the current program state
    ///
    /// # Returns
    ///
    /// One [`Replacement`] per rewritten site, in set order.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleAnalysis`] if the set describes another program state
    /// - [`Error::MissingSymbol`] if the replacement function does not exist
    /// - [`Error::SignatureMismatch`] if a rewritten call would not match the
    ///   replacement's signature
    /// - [`Error::CounterOverflow`] if the counter leaves the `i32` range
    ///
    /// In all of these cases the program is left unchanged.
    pub fn replace(&mut self, program: &mut Program, sites: CallSiteSet) -> Result<Vec<Replacement>> {
        sites.ensure_current(program)?;

        if sites.is_empty() {
            info!("no call sites to rewrite");
            return Ok(Vec::new());
        }

        let index = resolve_function(program, &self.replacement)
            .ok_or_else(|| Error::MissingSymbol(self.replacement.clone()))?;
        let (symbol, signature) = program
            .function(index)
            .map(|f| (f.name().to_string(), f.signature()))
            .ok_or_else(|| malformed_error!("resolved function index {} is out of range", index))?;
        debug!("resolved replacement '{}' to @{}", self.replacement, symbol);

        let mut planned = Vec::with_capacity(sites.len());
        for site in &sites {
            let instruction = program
                .instruction(site.location)
                .ok_or_else(|| malformed_error!("no instruction at {}", site.location))?;
            let call = instruction
                .op()
                .as_call()
                .filter(|call| !call.callee.is_indirect())
                .ok_or_else(|| malformed_error!("no direct call at {}", site.location))?;
            self.check_signature(site.location, call, instruction.result().is_some(), &signature)?;
        }

        let mut counter = self.counter;
        for _ in 0..sites.len() {
            let argument = match self.policy {
                ArgumentPolicy::Counter => counter.take()?,
                ArgumentPolicy::Fixed => self.fixed_value,
            };
            planned.push(argument);
        }
        self.counter = counter;

        let mut replacements = Vec::with_capacity(sites.len());
        for (site, argument) in sites.into_iter().zip(planned) {
            match self.strategy {
                RewriteStrategy::Replace => {
                    self.splice(program, site.location, &symbol, signature.ret, argument)?;
                }
                RewriteStrategy::Mutate => {
                    self.mutate(program, site.location, &symbol, argument)?;
                }
            }
            debug!(
                "rewrote call to @{} in @{} %{} with {}(i32 {})",
                site.callee, site.caller, site.block, symbol, argument
            );
            replacements.push(Replacement {
                location: site.location,
                caller: site.caller,
                block: site.block,
                original: site.callee,
                replacement: symbol.clone(),
                argument,
            });
        }

        info!(
            "replaced {} call site(s) with calls to '{}'",
            replacements.len(),
            self.replacement
        );
        Ok(replacements)
    }

    fn check_signature(
        &self,
        location: InstructionLocation,
        call: &CallOp,
        binds_result: bool,
        signature: &Signature,
    ) -> Result<()> {
        // A bound result has uses, so the fresh call must produce the same type.
        let ret = match self.strategy {
            RewriteStrategy::Replace if !binds_result => signature.ret,
            RewriteStrategy::Replace | RewriteStrategy::Mutate => call.ret,
        };
        if signature.accepts(ret, &[IrType::I32]) {
            return Ok(());
        }
        Err(Error::SignatureMismatch {
            site: location,
            expected: signature.to_string(),
            found: format!("{ret} (i32)"),
        })
    }

    fn splice(
        &self,
        program: &mut Program,
        location: InstructionLocation,
        symbol: &str,
        ret: IrType,
        argument: i32,
    ) -> Result<()> {
        let old = program
            .instruction(location)
            .ok_or_else(|| malformed_error!("no instruction at {}", location))?;

        let op = Op::Call(CallOp::direct(ret, symbol, vec![Operand::i32(argument)]));
        let keeps_result = old.op().result_type().is_some_and(|ty| ty == ret);
        let mut call = match old.result() {
            Some(name) if keeps_result => Instruction::with_result(name, op),
            _ => Instruction::new(op),
        };
        call.set_debug_loc(old.debug_loc());

        program.replace_instruction(location, call)?;
        Ok(())
    }

    fn mutate(
        &self,
        program: &mut Program,
        location: InstructionLocation,
        symbol: &str,
        argument: i32,
    ) -> Result<()> {
        let call = program
            .instruction_mut(location)
            .and_then(|instruction| instruction.op_mut().as_call_mut())
            .ok_or_else(|| malformed_error!("no call at {}", location))?;
        call.callee = Callee::Direct(symbol.to_string());
        call.args = vec![Operand::i32(argument)];
        Ok(())
    }
}

impl TransformPass for CallSiteReplacer {
    fn name(&self) -> &'static str {
        "call-site-replacer"
    }

    fn run(
        &mut self,
        program: &mut Program,
        analyses: &mut AnalysisManager,
    ) -> Result<PreservedAnalyses> {
        let sites = analyses.get_result::<CallSiteFinder>(program)?.clone();
        self.replacements = self.replace(program, sites)?;
        Ok(PreservedAnalyses::none())
    }
}
