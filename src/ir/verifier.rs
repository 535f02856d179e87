//! Structural verifier for programs.
//!
//! The [`Verifier`] walks a [`Program`] and records every violated invariant as a
//! [`Diagnostic`]. It never mutates the program and never stops early, so a single
//! run reports all problems at once.
//!
//! # Checks
//!
//! | Category     | Severity | Invariant                                                    |
//! |--------------|----------|--------------------------------------------------------------|
//! | `Structure`  | error    | unique function names, block labels and value names          |
//! | `Structure`  | error    | every block ends in its only terminator                      |
//! | `Structure`  | error    | branch targets and used locals exist                         |
//! | `Type`       | error    | operands, literals and `ret` agree with the expected type    |
//! | `Call`       | error    | direct callees exist and the call matches their signature    |
//! | `DebugInfo`  | warning  | `!dbg` attachments resolve; metadata ids are unique          |
//!
//! Broken debug metadata never makes a program invalid; the instructions are still
//! well-formed, only their source positions are lost.
//!
//! # Examples
//!
//! ```rust
//! use callswap::{ir::Verifier, Program};
//!
//! let program = Program::from_source(
//!     "define void @f() {\nentry:\n  ret void, !dbg !4\n}\n",
//! )?;
//! let report = Verifier::new().verify(&program);
//!
//! assert!(report.is_valid());
//! assert!(report.broken_debug_info());
//! # Ok::<(), callswap::Error>(())
//! ```

use std::collections::{HashMap, HashSet};

use crate::{
    error::VerificationStage,
    ir::{
        Callee, Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics, Function,
        Instruction, IrType, Op, Program, Value,
    },
    Error, Result,
};

/// The outcome of a verifier run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifierReport {
    diagnostics: Diagnostics,
}

impl VerifierReport {
    /// Returns true if no error-level diagnostic was produced.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Returns true if any debug-info warning was produced.
    #[must_use]
    pub fn broken_debug_info(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == DiagnosticCategory::DebugInfo && !d.is_error())
    }

    /// Returns every diagnostic.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Turns an invalid report into a [`Error::Verification`].
    ///
    /// # Arguments
    ///
    /// * `stage` - Which verification run produced this report
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] carrying the error-level diagnostics if
    /// the program is invalid. Valid reports, warnings included, are returned
    /// unchanged.
    pub fn into_result(self, stage: VerificationStage) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::Verification {
                stage,
                diagnostics: self.diagnostics.into_errors(),
            })
        }
    }
}

/// Checks the structural invariants of a program.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new() -> Self {
        Verifier
    }

    /// Verifies `program` and returns every diagnostic found.
    #[must_use]
    pub fn verify(&self, program: &Program) -> VerifierReport {
        let mut diagnostics = Diagnostics::new();

        let mut functions: HashMap<&str, &Function> = HashMap::new();
        for function in program.functions() {
            if functions.insert(function.name(), function).is_some() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticSeverity::Error,
                        DiagnosticCategory::Structure,
                        "function is defined more than once",
                    )
                    .with_function(function.name()),
                );
            }
        }

        let mut metadata_ids = HashSet::new();
        for location in program.debug_locations() {
            if !metadata_ids.insert(location.id) {
                diagnostics.warning(
                    DiagnosticCategory::DebugInfo,
                    format!("metadata node !{} is defined more than once", location.id),
                );
            }
        }

        for function in program.functions() {
            if !function.is_declaration() {
                FunctionVerifier::new(function, &functions, &metadata_ids, &mut diagnostics)
                    .run();
            }
        }

        VerifierReport { diagnostics }
    }
}

/// Per-function verification state.
struct FunctionVerifier<'a> {
    function: &'a Function,
    functions: &'a HashMap<&'a str, &'a Function>,
    metadata_ids: &'a HashSet<u32>,
    diagnostics: &'a mut Diagnostics,
    labels: HashSet<&'a str>,
    values: HashMap<&'a str, IrType>,
}

impl<'a> FunctionVerifier<'a> {
    fn new(
        function: &'a Function,
        functions: &'a HashMap<&'a str, &'a Function>,
        metadata_ids: &'a HashSet<u32>,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        FunctionVerifier {
            function,
            functions,
            metadata_ids,
            diagnostics,
            labels: HashSet::new(),
            values: HashMap::new(),
        }
    }

    fn report(
        &mut self,
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        block: Option<&str>,
        message: String,
    ) {
        let mut diagnostic =
            Diagnostic::new(severity, category, message).with_function(self.function.name());
        if let Some(block) = block {
            diagnostic = diagnostic.with_block(block);
        }
        self.diagnostics.push(diagnostic);
    }

    fn error(&mut self, category: DiagnosticCategory, block: &str, message: String) {
        self.report(DiagnosticSeverity::Error, category, Some(block), message);
    }

    fn run(mut self) {
        self.collect_definitions();

        let function = self.function;
        for block in function.blocks() {
            let label = block.label();

            match block.instructions().last() {
                None => self.error(
                    DiagnosticCategory::Structure,
                    label,
                    "block is empty".to_string(),
                ),
                Some(last) if !last.is_terminator() => self.error(
                    DiagnosticCategory::Structure,
                    label,
                    "block does not end in a terminator".to_string(),
                ),
                Some(_) => {}
            }

            let count = block.instruction_count();
            for (index, instruction) in block.instructions().iter().enumerate() {
                if instruction.is_terminator() && index + 1 != count {
                    self.error(
                        DiagnosticCategory::Structure,
                        label,
                        format!(
                            "terminator '{}' at position {index} is not the last instruction",
                            instruction.op().mnemonic()
                        ),
                    );
                }
                self.check_instruction(label, instruction);
            }
        }
    }

    fn collect_definitions(&mut self) {
        let function = self.function;

        for param in function.params() {
            if let Some(name) = &param.name {
                if self.values.insert(name, param.ty).is_some() {
                    self.report(
                        DiagnosticSeverity::Error,
                        DiagnosticCategory::Structure,
                        None,
                        format!("parameter %{name} is defined more than once"),
                    );
                }
            }
        }

        for block in function.blocks() {
            if !self.labels.insert(block.label()) {
                self.error(
                    DiagnosticCategory::Structure,
                    block.label(),
                    format!("block label %{} is used more than once", block.label()),
                );
            }

            for instruction in block.instructions() {
                let Some(name) = instruction.result() else {
                    continue;
                };
                match instruction.op().result_type() {
                    Some(ty) => {
                        if self.values.insert(name, ty).is_some() {
                            self.error(
                                DiagnosticCategory::Structure,
                                block.label(),
                                format!("value %{name} is defined more than once"),
                            );
                        }
                    }
                    None => self.error(
                        DiagnosticCategory::Structure,
                        block.label(),
                        format!(
                            "'{}' produces no value but is bound to %{name}",
                            instruction.op().mnemonic()
                        ),
                    ),
                }
            }
        }
    }

    fn check_instruction(&mut self, label: &str, instruction: &Instruction) {
        let op = instruction.op();

        match op {
            Op::Binary { ty, .. } | Op::ICmp { ty, .. } if !ty.is_integer() => self.error(
                DiagnosticCategory::Type,
                label,
                format!("'{}' requires an integer type, found {ty}", op.mnemonic()),
            ),
            Op::Alloca { ty } | Op::Load { ty, .. } | Op::Store { ty, .. } if ty.is_void() => {
                self.error(
                    DiagnosticCategory::Type,
                    label,
                    format!("'{}' cannot operate on void", op.mnemonic()),
                );
            }
            Op::Call(call) => {
                if let Callee::Direct(symbol) = &call.callee {
                    let functions = self.functions;
                    match functions.get(symbol.as_str()) {
                        None => self.error(
                            DiagnosticCategory::Call,
                            label,
                            format!("call to undefined function @{symbol}"),
                        ),
                        Some(callee) => {
                            let signature = callee.signature();
                            if !signature.accepts(call.ret, &call.arg_types()) {
                                let found: Vec<String> =
                                    call.arg_types().iter().map(ToString::to_string).collect();
                                self.error(
                                    DiagnosticCategory::Call,
                                    label,
                                    format!(
                                        "call to @{symbol} as {} ({}) does not match its signature {signature}",
                                        call.ret,
                                        found.join(", ")
                                    ),
                                );
                            }
                        }
                    }
                }
            }
            Op::Ret { value } => {
                let expected = self.function.return_type();
                match value {
                    None if !expected.is_void() => self.error(
                        DiagnosticCategory::Type,
                        label,
                        format!("'ret void' in a function returning {expected}"),
                    ),
                    Some(operand) if operand.ty != expected => self.error(
                        DiagnosticCategory::Type,
                        label,
                        format!(
                            "'ret {}' in a function returning {expected}",
                            operand.ty
                        ),
                    ),
                    _ => {}
                }
            }
            _ => {}
        }

        for target in op.successors() {
            if !self.labels.contains(target) {
                self.error(
                    DiagnosticCategory::Structure,
                    label,
                    format!("branch to undefined block %{target}"),
                );
            }
        }

        for (expected, value) in op.typed_uses() {
            self.check_use(label, expected, value);
        }

        if let Some(id) = instruction.debug_loc() {
            if !self.metadata_ids.contains(&id) {
                self.report(
                    DiagnosticSeverity::Warning,
                    DiagnosticCategory::DebugInfo,
                    Some(label),
                    format!("!dbg !{id} refers to undefined metadata"),
                );
            }
        }
    }

    fn check_use(&mut self, label: &str, expected: IrType, value: &Value) {
        match value {
            Value::Local(name) => match self.values.get(name.as_str()).copied() {
                None => self.error(
                    DiagnosticCategory::Structure,
                    label,
                    format!("use of undefined value %{name}"),
                ),
                Some(actual) if actual != expected => self.error(
                    DiagnosticCategory::Type,
                    label,
                    format!("%{name} has type {actual}, expected {expected}"),
                ),
                Some(_) => {}
            },
            Value::Global(name) => {
                if !self.functions.contains_key(name.as_str()) {
                    self.error(
                        DiagnosticCategory::Structure,
                        label,
                        format!("use of undefined symbol @{name}"),
                    );
                } else if expected != IrType::Ptr {
                    self.error(
                        DiagnosticCategory::Type,
                        label,
                        format!("@{name} has type ptr, expected {expected}"),
                    );
                }
            }
            Value::Int(literal) => {
                if !expected.fits(*literal) {
                    self.error(
                        DiagnosticCategory::Type,
                        label,
                        format!("literal {literal} is not a valid {expected}"),
                    );
                }
            }
            Value::Null => {
                if expected != IrType::Ptr {
                    self.error(
                        DiagnosticCategory::Type,
                        label,
                        format!("null is not a valid {expected}"),
                    );
                }
            }
        }
    }
}
