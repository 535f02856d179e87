//! Instructions and instruction locations.

use std::fmt;

use crate::ir::{quote_name, InstructionCategory, Op};

/// An instruction: an optional result name, an operation and an optional
/// debug-location attachment.
///
/// # Examples
///
/// ```rust
/// use callswap::ir::{CallOp, Instruction, IrType, Op, Operand};
///
/// let call = Instruction::new(Op::Call(CallOp::direct(
///     IrType::Void,
///     "_Z3bari",
///     vec![Operand::i32(1)],
/// )))
/// .with_debug_loc(0);
///
/// assert_eq!(call.to_string(), "call void @_Z3bari(i32 1), !dbg !0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Name of the produced value, without the `%` sigil.
    result: Option<String>,

    /// The operation.
    op: Op,

    /// Id of the `!DILocation` metadata node attached with `!dbg`.
    debug_loc: Option<u32>,
}

impl Instruction {
    /// Creates an instruction that produces no named value.
    #[must_use]
    pub fn new(op: Op) -> Self {
        Instruction {
            result: None,
            op,
            debug_loc: None,
        }
    }

    /// Creates an instruction whose value is bound to `%result`.
    pub fn with_result(result: impl Into<String>, op: Op) -> Self {
        Instruction {
            result: Some(result.into()),
            op,
            debug_loc: None,
        }
    }

    /// Attaches a debug location.
    #[must_use]
    pub fn with_debug_loc(mut self, id: u32) -> Self {
        self.debug_loc = Some(id);
        self
    }

    /// Returns the result name, if any.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Returns the operation.
    #[must_use]
    pub const fn op(&self) -> &Op {
        &self.op
    }

    /// Returns the operation mutably.
    pub fn op_mut(&mut self) -> &mut Op {
        &mut self.op
    }

    /// Returns the attached debug location id.
    #[must_use]
    pub const fn debug_loc(&self) -> Option<u32> {
        self.debug_loc
    }

    /// Replaces the attached debug location.
    pub fn set_debug_loc(&mut self, id: Option<u32>) {
        self.debug_loc = id;
    }

    /// Returns the category of the operation.
    #[must_use]
    pub const fn category(&self) -> InstructionCategory {
        self.op.category()
    }

    /// Returns true if the instruction ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        self.op.is_terminator()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "%{} = ", quote_name(result))?;
        }
        write!(f, "{}", self.op)?;
        if let Some(id) = self.debug_loc {
            write!(f, ", !dbg !{id}")?;
        }
        Ok(())
    }
}

/// The position of an instruction inside a [`crate::Program`].
///
/// Locations are indices, not references: they stay cheap to copy and store, but
/// they are only meaningful for the program state they were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionLocation {
    /// Index of the function in declaration order
    pub function: usize,
    /// Index of the block in layout order
    pub block: usize,
    /// Index of the instruction inside the block
    pub index: usize,
}

impl InstructionLocation {
    /// Creates a new location.
    #[must_use]
    pub const fn new(function: usize, block: usize, index: usize) -> Self {
        InstructionLocation {
            function,
            block,
            index,
        }
    }
}

impl fmt::Display for InstructionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}:b{}:i{}", self.function, self.block, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, IrType, Value};

    #[test]
    fn test_display_with_result() {
        let instr = Instruction::with_result(
            "sum",
            Op::Binary {
                op: BinaryOp::Add,
                ty: IrType::I32,
                lhs: Value::local("a"),
                rhs: Value::local("b"),
            },
        );
        assert_eq!(instr.to_string(), "%sum = add i32 %a, %b");
        assert_eq!(instr.result(), Some("sum"));
        assert!(!instr.is_terminator());
    }

    #[test]
    fn test_location_ordering() {
        let a = InstructionLocation::new(0, 1, 5);
        let b = InstructionLocation::new(1, 0, 0);
        assert!(a < b);
        assert_eq!(a.to_string(), "f0:b1:i5");
    }
}
