//! IR operations.
//!
//! An [`Op`] is the operation part of an instruction, everything to the right of
//! the optional `%result =`. Operations are grouped into [`InstructionCategory`]
//! classes so analyses can filter cheaply before looking at the operands.
//!
//! Each operation exposes its typed uses through [`Op::typed_uses`], which is what
//! the verifier checks operand types against, and its control-flow successors
//! through [`Op::successors`].

#![allow(missing_docs)]

use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::ir::{IrType, Operand, Value};

/// Coarse classification of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InstructionCategory {
    /// Direct and indirect calls.
    Call,
    /// Integer arithmetic, bitwise operations and comparisons.
    Arithmetic,
    /// Branches, returns and `unreachable`.
    ControlFlow,
    /// Memory operations.
    Other,
}

/// Two-operand integer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// Wrapping addition
    Add,
    /// Wrapping subtraction
    Sub,
    /// Wrapping multiplication
    Mul,
    /// Signed division
    SDiv,
    /// Signed remainder
    SRem,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise exclusive or
    Xor,
    /// Shift left
    Shl,
    /// Logical shift right
    LShr,
    /// Arithmetic shift right
    AShr,
}

/// Integer comparison predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum IcmpPredicate {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Signed less than
    Slt,
    /// Signed less or equal
    Sle,
    /// Signed greater than
    Sgt,
    /// Signed greater or equal
    Sge,
    /// Unsigned less than
    Ult,
    /// Unsigned less or equal
    Ule,
    /// Unsigned greater than
    Ugt,
    /// Unsigned greater or equal
    Uge,
}

/// The called value of a call instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    /// A call naming a function symbol directly: `call void @f()`.
    Direct(String),
    /// A call through a pointer value: `call void %fp()`.
    Indirect(Value),
}

impl Callee {
    /// Returns the symbol of a direct call.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Callee::Direct(name) => Some(name),
            Callee::Indirect(_) => None,
        }
    }

    /// Returns true for calls through a pointer.
    #[must_use]
    pub fn is_indirect(&self) -> bool {
        matches!(self, Callee::Indirect(_))
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Direct(name) => write!(f, "{}", Value::Global(name.clone())),
            Callee::Indirect(value) => write!(f, "{value}"),
        }
    }
}

/// A call: `call <ret> <callee>(<args>)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallOp {
    /// Declared return type of the call
    pub ret: IrType,
    /// Called function or pointer
    pub callee: Callee,
    /// Typed arguments in order
    pub args: Vec<Operand>,
}

impl CallOp {
    /// Creates a direct call to `symbol`.
    pub fn direct(ret: IrType, symbol: impl Into<String>, args: Vec<Operand>) -> Self {
        CallOp {
            ret,
            callee: Callee::Direct(symbol.into()),
            args,
        }
    }

    /// Creates a call through the pointer `target`.
    #[must_use]
    pub fn indirect(ret: IrType, target: Value, args: Vec<Operand>) -> Self {
        CallOp {
            ret,
            callee: Callee::Indirect(target),
            args,
        }
    }

    /// Returns the argument types in order.
    #[must_use]
    pub fn arg_types(&self) -> Vec<IrType> {
        self.args.iter().map(|arg| arg.ty).collect()
    }
}

impl fmt::Display for CallOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call {} {}(", self.ret, self.callee)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// An IR operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    // ========================================================================
    // Arithmetic
    // ========================================================================
    /// `binop ty lhs, rhs`
    Binary {
        op: BinaryOp,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },

    /// `icmp pred ty lhs, rhs`, producing an `i1`.
    ICmp {
        pred: IcmpPredicate,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },

    // ========================================================================
    // Memory
    // ========================================================================
    /// `alloca ty`, producing a `ptr`.
    Alloca { ty: IrType },

    /// `load ty, ptr p`
    Load { ty: IrType, ptr: Value },

    /// `store ty v, ptr p`
    Store { ty: IrType, value: Value, ptr: Value },

    // ========================================================================
    // Calls
    // ========================================================================
    /// Direct or indirect call.
    Call(CallOp),

    // ========================================================================
    // Terminators
    // ========================================================================
    /// `br label %target`
    Br { target: String },

    /// `br i1 cond, label %then, label %else`
    CondBr {
        cond: Value,
        then_target: String,
        else_target: String,
    },

    /// `ret void` or `ret ty v`
    Ret { value: Option<Operand> },

    /// `unreachable`
    Unreachable,
}

impl Op {
    /// Returns the category of this operation.
    #[must_use]
    pub const fn category(&self) -> InstructionCategory {
        match self {
            Op::Binary { .. } | Op::ICmp { .. } => InstructionCategory::Arithmetic,
            Op::Alloca { .. } | Op::Load { .. } | Op::Store { .. } => InstructionCategory::Other,
            Op::Call(_) => InstructionCategory::Call,
            Op::Br { .. } | Op::CondBr { .. } | Op::Ret { .. } | Op::Unreachable => {
                InstructionCategory::ControlFlow
            }
        }
    }

    /// Returns true if this operation ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Op::Br { .. } | Op::CondBr { .. } | Op::Ret { .. } | Op::Unreachable
        )
    }

    /// Returns the text mnemonic of this operation.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Binary { op, .. } => op.into(),
            Op::ICmp { .. } => "icmp",
            Op::Alloca { .. } => "alloca",
            Op::Load { .. } => "load",
            Op::Store { .. } => "store",
            Op::Call(_) => "call",
            Op::Br { .. } | Op::CondBr { .. } => "br",
            Op::Ret { .. } => "ret",
            Op::Unreachable => "unreachable",
        }
    }

    /// Returns the type of the value this operation produces, if any.
    ///
    /// A call returning `void` produces nothing.
    #[must_use]
    pub fn result_type(&self) -> Option<IrType> {
        match self {
            Op::Binary { ty, .. } | Op::Load { ty, .. } => Some(*ty),
            Op::ICmp { .. } => Some(IrType::I1),
            Op::Alloca { .. } => Some(IrType::Ptr),
            Op::Call(call) if !call.ret.is_void() => Some(call.ret),
            _ => None,
        }
    }

    /// Returns every value this operation reads, paired with the type it is read as.
    #[must_use]
    pub fn typed_uses(&self) -> Vec<(IrType, &Value)> {
        match self {
            Op::Binary { ty, lhs, rhs, .. } | Op::ICmp { ty, lhs, rhs, .. } => {
                vec![(*ty, lhs), (*ty, rhs)]
            }
            Op::Alloca { .. } | Op::Br { .. } | Op::Unreachable => Vec::new(),
            Op::Load { ptr, .. } => vec![(IrType::Ptr, ptr)],
            Op::Store { ty, value, ptr } => vec![(*ty, value), (IrType::Ptr, ptr)],
            Op::Call(call) => {
                let mut uses = Vec::with_capacity(call.args.len() + 1);
                if let Callee::Indirect(target) = &call.callee {
                    uses.push((IrType::Ptr, target));
                }
                uses.extend(call.args.iter().map(|arg| (arg.ty, &arg.value)));
                uses
            }
            Op::CondBr { cond, .. } => vec![(IrType::I1, cond)],
            Op::Ret { value } => value.iter().map(|op| (op.ty, &op.value)).collect(),
        }
    }

    /// Returns the labels of the blocks control may transfer to.
    #[must_use]
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Op::Br { target } => vec![target.as_str()],
            Op::CondBr {
                then_target,
                else_target,
                ..
            } => vec![then_target.as_str(), else_target.as_str()],
            _ => Vec::new(),
        }
    }

    /// Returns the call if this is a call operation.
    #[must_use]
    pub fn as_call(&self) -> Option<&CallOp> {
        match self {
            Op::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the call mutably if this is a call operation.
    pub fn as_call_mut(&mut self) -> Option<&mut CallOp> {
        match self {
            Op::Call(call) => Some(call),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Binary { op, ty, lhs, rhs } => {
                write!(f, "{op} {ty} ")?;
                lhs.fmt_typed(*ty, f)?;
                write!(f, ", ")?;
                rhs.fmt_typed(*ty, f)
            }
            Op::ICmp { pred, ty, lhs, rhs } => {
                write!(f, "icmp {pred} {ty} ")?;
                lhs.fmt_typed(*ty, f)?;
                write!(f, ", ")?;
                rhs.fmt_typed(*ty, f)
            }
            Op::Alloca { ty } => write!(f, "alloca {ty}"),
            Op::Load { ty, ptr } => write!(f, "load {ty}, ptr {ptr}"),
            Op::Store { ty, value, ptr } => {
                write!(f, "store {ty} ")?;
                value.fmt_typed(*ty, f)?;
                write!(f, ", ptr {ptr}")
            }
            Op::Call(call) => write!(f, "{call}"),
            Op::Br { target } => write!(f, "br label {}", Value::local(target.as_str())),
            Op::CondBr {
                cond,
                then_target,
                else_target,
            } => {
                write!(f, "br i1 ")?;
                cond.fmt_typed(IrType::I1, f)?;
                write!(
                    f,
                    ", label {}, label {}",
                    Value::local(then_target.as_str()),
                    Value::local(else_target.as_str())
                )
            }
            Op::Ret { value: None } => write!(f, "ret void"),
            Op::Ret { value: Some(value) } => write!(f, "ret {value}"),
            Op::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let add = Op::Binary {
            op: BinaryOp::Add,
            ty: IrType::I32,
            lhs: Value::local("a"),
            rhs: Value::Int(1),
        };
        assert_eq!(add.category(), InstructionCategory::Arithmetic);
        assert_eq!(
            Op::Call(CallOp::direct(IrType::Void, "f", vec![])).category(),
            InstructionCategory::Call
        );
        assert_eq!(Op::Unreachable.category(), InstructionCategory::ControlFlow);
        assert_eq!(Op::Alloca { ty: IrType::I32 }.category(), InstructionCategory::Other);
    }

    #[test]
    fn test_result_types() {
        assert_eq!(
            Op::Call(CallOp::direct(IrType::Void, "f", vec![])).result_type(),
            None
        );
        assert_eq!(
            Op::Call(CallOp::direct(IrType::I64, "f", vec![])).result_type(),
            Some(IrType::I64)
        );
        assert_eq!(Op::Alloca { ty: IrType::I8 }.result_type(), Some(IrType::Ptr));
        let cmp = Op::ICmp {
            pred: IcmpPredicate::Slt,
            ty: IrType::I32,
            lhs: Value::local("a"),
            rhs: Value::Int(0),
        };
        assert_eq!(cmp.result_type(), Some(IrType::I1));
    }

    #[test]
    fn test_indirect_call_uses_include_target() {
        let call = Op::Call(CallOp::indirect(
            IrType::Void,
            Value::local("fp"),
            vec![Operand::i32(3)],
        ));
        let uses = call.typed_uses();
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0], (IrType::Ptr, &Value::local("fp")));
        assert_eq!(uses[1].0, IrType::I32);
    }

    #[test]
    fn test_display() {
        let call = Op::Call(CallOp::direct(IrType::Void, "_Z3bari", vec![Operand::i32(1)]));
        assert_eq!(call.to_string(), "call void @_Z3bari(i32 1)");

        let branch = Op::CondBr {
            cond: Value::local("c"),
            then_target: "then".into(),
            else_target: "else".into(),
        };
        assert_eq!(branch.to_string(), "br i1 %c, label %then, label %else");
        assert_eq!(branch.successors(), ["then", "else"]);

        let srem = Op::Binary {
            op: BinaryOp::SRem,
            ty: IrType::I32,
            lhs: Value::local("x"),
            rhs: Value::Int(3),
        };
        assert_eq!(srem.to_string(), "srem i32 %x, 3");
        assert_eq!(srem.mnemonic(), "srem");
    }
}
