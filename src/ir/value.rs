//! Operand values.

use std::fmt;

use crate::ir::IrType;

/// A value used as an instruction operand.
///
/// Values carry no type of their own; the type comes from the instruction
/// that uses them (`add i32 %a, 1`) or from an [`Operand`] pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// A local SSA value or parameter, written `%name`.
    Local(String),
    /// The address of a function, written `@name`. Always of type `ptr`.
    Global(String),
    /// An integer literal. `true` and `false` are `1` and `0`.
    Int(i64),
    /// The null pointer.
    Null,
}

impl Value {
    /// Creates a local value reference.
    pub fn local(name: impl Into<String>) -> Self {
        Value::Local(name.into())
    }

    /// Creates a global symbol reference.
    pub fn global(name: impl Into<String>) -> Self {
        Value::Global(name.into())
    }

    /// Returns the local name if this is a local reference.
    #[must_use]
    pub fn as_local(&self) -> Option<&str> {
        match self {
            Value::Local(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the symbol name if this is a global reference.
    #[must_use]
    pub fn as_global(&self) -> Option<&str> {
        match self {
            Value::Global(name) => Some(name),
            _ => None,
        }
    }

    /// Writes the value the way it appears after a type of `ty`.
    ///
    /// `i1` literals print as `true`/`false`.
    pub(crate) fn fmt_typed(&self, ty: IrType, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (ty, self) {
            (IrType::I1, Value::Int(0)) => write!(f, "false"),
            (IrType::I1, Value::Int(1)) => write!(f, "true"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(name) => write!(f, "%{}", quote_name(name)),
            Value::Global(name) => write!(f, "@{}", quote_name(name)),
            Value::Int(value) => write!(f, "{value}"),
            Value::Null => write!(f, "null"),
        }
    }
}

/// A typed value, as passed to calls and returned by `ret`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    /// Type of the value
    pub ty: IrType,
    /// The value itself
    pub value: Value,
}

impl Operand {
    /// Pairs a value with its type.
    #[must_use]
    pub fn new(ty: IrType, value: Value) -> Self {
        Operand { ty, value }
    }

    /// Creates an `i32` integer constant.
    #[must_use]
    pub fn i32(value: i32) -> Self {
        Operand::new(IrType::I32, Value::Int(i64::from(value)))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.ty)?;
        self.value.fmt_typed(self.ty, f)
    }
}

/// Returns true if `c` may appear in an unquoted identifier.
pub(crate) fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$' | b'-')
}

/// Quotes a symbol or local name when it contains characters the lexer would
/// not accept unquoted.
pub(crate) fn quote_name(name: &str) -> std::borrow::Cow<'_, str> {
    if !name.is_empty() && name.bytes().all(is_name_char) {
        std::borrow::Cow::Borrowed(name)
    } else {
        std::borrow::Cow::Owned(format!("\"{name}\""))
    }
}
