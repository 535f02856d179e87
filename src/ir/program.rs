//! The top-level program container.
//!
//! A [`Program`] owns every function and the debug-location metadata table. It also
//! carries an identity ([`ProgramId`]) and a generation counter, which together let
//! position-based analysis results detect that they no longer describe the program
//! they are applied to.
//!
//! # Identity and Generations
//!
//! - Every `Program` gets a process-unique [`ProgramId`] when it is created or cloned.
//! - Every mutable access (`functions_mut`, `instruction_mut`, `replace_instruction`,
//!   ...) advances the generation, whether or not the caller ends up changing
//!   anything.
//!
//! Equality ([`PartialEq`]) is structural and ignores both: two programs that print
//! the same are equal.

use std::{
    fmt,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    ir::{parser, verifier::VerifierReport, Function, Instruction, InstructionLocation, Verifier},
    Result,
};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Program`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// A `!DILocation` metadata node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugLocation {
    /// Metadata id, the `N` in `!N`
    pub id: u32,
    /// Source line
    pub line: u32,
    /// Source column
    pub column: u32,
}

impl fmt::Display for DebugLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "!{} = !DILocation(line: {}, column: {})",
            self.id, self.line, self.column
        )
    }
}

/// A whole program: functions in declaration order plus debug metadata.
///
/// # Examples
///
/// ```rust
/// use callswap::Program;
///
/// let program = Program::from_source(
///     "declare void @_Z3foov()\n\
///      define i32 @main() {\n\
///      entry:\n\
///        call void @_Z3foov()\n\
///        ret i32 0\n\
///      }\n",
/// )?;
///
/// assert_eq!(program.function_count(), 2);
/// assert!(program.verify().is_valid());
/// # Ok::<(), callswap::Error>(())
/// ```
#[derive(Debug)]
pub struct Program {
    id: ProgramId,
    generation: u64,
    functions: Vec<Function>,
    debug_locations: Vec<DebugLocation>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Program {
            id: ProgramId::next(),
            generation: 0,
            functions: Vec::new(),
            debug_locations: Vec::new(),
        }
    }

    /// Parses a program from its text form.
    ///
    /// # Arguments
    ///
    /// * `source` - The program text
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] with the line and column of the first
    /// offending token.
    pub fn from_source(source: &str) -> Result<Self> {
        parser::parse(source)
    }

    /// Reads and parses a program file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the program text file
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::Parse`] if its content is not a valid program.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_source(&source)
    }

    /// Returns the identity of this instance.
    #[must_use]
    pub const fn id(&self) -> ProgramId {
        self.id
    }

    /// Returns the current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the functions in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Returns the functions mutably, advancing the generation.
    pub fn functions_mut(&mut self) -> &mut Vec<Function> {
        self.bump();
        &mut self.functions
    }

    /// Returns the function at `index`.
    #[must_use]
    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    /// Looks up a function by its raw symbol name.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Returns the index of the function with the given raw symbol name.
    #[must_use]
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name() == name)
    }

    /// Returns the number of functions, declarations included.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Appends a function, advancing the generation.
    pub fn add_function(&mut self, function: Function) {
        self.bump();
        self.functions.push(function);
    }

    /// Builder form of [`Program::add_function`].
    #[must_use]
    pub fn with_function(mut self, function: Function) -> Self {
        self.add_function(function);
        self
    }

    /// Returns the debug-location table.
    #[must_use]
    pub fn debug_locations(&self) -> &[DebugLocation] {
        &self.debug_locations
    }

    /// Appends a debug location, advancing the generation.
    pub fn add_debug_location(&mut self, location: DebugLocation) {
        self.bump();
        self.debug_locations.push(location);
    }

    /// Returns the instruction at `location`.
    #[must_use]
    pub fn instruction(&self, location: InstructionLocation) -> Option<&Instruction> {
        self.functions
            .get(location.function)?
            .block(location.block)?
            .instruction(location.index)
    }

    /// Returns the instruction at `location` mutably, advancing the generation.
    pub fn instruction_mut(&mut self, location: InstructionLocation) -> Option<&mut Instruction> {
        self.bump();
        self.functions
            .get_mut(location.function)?
            .block_mut(location.block)?
            .instruction_mut(location.index)
    }

    /// Replaces the instruction at `location`, returning the old one.
    ///
    /// # Arguments
    ///
    /// * `location` - Position of the instruction to replace
    /// * `instruction` - The instruction to splice in
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `location` does not name an
    /// instruction of this program.
    pub fn replace_instruction(
        &mut self,
        location: InstructionLocation,
        instruction: Instruction,
    ) -> Result<Instruction> {
        let slot = self
            .instruction_mut(location)
            .ok_or_else(|| malformed_error!("no instruction at {}", location))?;
        Ok(std::mem::replace(slot, instruction))
    }

    /// Returns the total number of instructions in all function bodies.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(Function::instruction_count).sum()
    }

    /// Runs the structural verifier over this program.
    #[must_use]
    pub fn verify(&self) -> VerifierReport {
        Verifier::new().verify(self)
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Program {
    /// Clones the content into a new instance with a fresh [`ProgramId`].
    fn clone(&self) -> Self {
        Program {
            id: ProgramId::next(),
            generation: 0,
            functions: self.functions.clone(),
            debug_locations: self.debug_locations.clone(),
        }
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.functions == other.functions && self.debug_locations == other.debug_locations
    }
}

impl Eq for Program {}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            // consecutive declarations are kept together
            let previous_declaration = i > 0 && self.functions[i - 1].is_declaration();
            if i > 0 && !(previous_declaration && function.is_declaration()) {
                writeln!(f)?;
            }
            write!(f, "{function}")?;
        }

        if !self.debug_locations.is_empty() {
            if !self.functions.is_empty() {
                writeln!(f)?;
            }
            for location in &self.debug_locations {
                writeln!(f, "{location}")?;
            }
        }
        Ok(())
    }
}
