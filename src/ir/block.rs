//! Basic blocks.

use std::fmt;

use crate::ir::{quote_name, Instruction};

/// A labelled, straight-line sequence of instructions.
///
/// A well-formed block ends in exactly one terminator and contains no other
/// terminator; the verifier enforces this, the block itself does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicBlock {
    label: String,
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Creates an empty block.
    pub fn new(label: impl Into<String>) -> Self {
        BasicBlock {
            label: label.into(),
            instructions: Vec::new(),
        }
    }

    /// Returns the block label, without the `%` sigil.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the instructions in layout order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the instructions mutably.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Returns the instruction at `index`.
    #[must_use]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Returns the instruction at `index` mutably.
    pub fn instruction_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    /// Appends an instruction.
    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Builder form of [`BasicBlock::add_instruction`].
    #[must_use]
    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Returns the last instruction if it is a terminator.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the block has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", quote_name(&self.label))?;
        for instruction in &self.instructions {
            writeln!(f, "  {instruction}")?;
        }
        Ok(())
    }
}
