//! Functions, parameters and signatures.

use std::fmt;

use crate::{
    ir::{quote_name, BasicBlock, IrType},
    utils::demangle,
};

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// Parameter type
    pub ty: IrType,
    /// Parameter name without the `%` sigil. Declarations may leave it out.
    pub name: Option<String>,
}

impl Param {
    /// Creates a named parameter.
    pub fn named(ty: IrType, name: impl Into<String>) -> Self {
        Param {
            ty,
            name: Some(name.into()),
        }
    }

    /// Creates an unnamed parameter.
    #[must_use]
    pub fn unnamed(ty: IrType) -> Self {
        Param { ty, name: None }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if let Some(name) = &self.name {
            write!(f, " %{}", quote_name(name))?;
        }
        Ok(())
    }
}

/// The type-level shape of a function: return type, parameter types and
/// whether extra arguments are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Return type
    pub ret: IrType,
    /// Fixed parameter types
    pub params: Vec<IrType>,
    /// Whether the function accepts arguments beyond `params`
    pub variadic: bool,
}

impl Signature {
    /// Checks whether a call with the given return and argument types is valid
    /// against this signature.
    #[must_use]
    pub fn accepts(&self, ret: IrType, args: &[IrType]) -> bool {
        if ret != self.ret {
            return false;
        }
        let fixed_ok = args.len() >= self.params.len()
            && args.iter().zip(&self.params).all(|(a, p)| a == p);
        fixed_ok && (self.variadic || args.len() == self.params.len())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

/// A function definition or declaration.
///
/// The name is the raw linker symbol and may be Itanium-mangled (`_Z3foov`).
/// A function with no blocks is a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Function {
    name: String,
    ret: IrType,
    params: Vec<Param>,
    variadic: bool,
    blocks: Vec<BasicBlock>,
}

impl Function {
    /// Creates a function without blocks.
    pub fn new(name: impl Into<String>, ret: IrType, params: Vec<Param>) -> Self {
        Function {
            name: name.into(),
            ret,
            params,
            variadic: false,
            blocks: Vec::new(),
        }
    }

    /// Marks the function as accepting extra arguments.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Appends a block, turning a declaration into a definition.
    #[must_use]
    pub fn with_block(mut self, block: BasicBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Returns the raw symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the demangled name, or the raw name for symbols that are not
    /// Itanium-mangled.
    #[must_use]
    pub fn demangled_name(&self) -> String {
        demangle(&self.name).into_owned()
    }

    /// Returns the return type.
    #[must_use]
    pub const fn return_type(&self) -> IrType {
        self.ret
    }

    /// Returns the parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns true if the function accepts extra arguments.
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Returns true if the function has no body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the signature of this function.
    #[must_use]
    pub fn signature(&self) -> Signature {
        Signature {
            ret: self.ret,
            params: self.params.iter().map(|p| p.ty).collect(),
            variadic: self.variadic,
        }
    }

    /// Returns the blocks in layout order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the blocks mutably.
    pub fn blocks_mut(&mut self) -> &mut Vec<BasicBlock> {
        &mut self.blocks
    }

    /// Returns the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> Option<&BasicBlock> {
        self.blocks.get(index)
    }

    /// Returns the block at `index` mutably.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(index)
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the total number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::instruction_count).sum()
    }

    fn fmt_header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{}(", self.ret, quote_name(&self.name))?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            write!(f, "declare ")?;
            self.fmt_header(f)?;
            return writeln!(f);
        }

        write!(f, "define ")?;
        self.fmt_header(f)?;
        writeln!(f, " {{")?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_accepts() {
        let bar = Function::new("_Z3bari", IrType::Void, vec![Param::named(IrType::I32, "I")]);
        let sig = bar.signature();
        assert!(sig.accepts(IrType::Void, &[IrType::I32]));
        assert!(!sig.accepts(IrType::Void, &[]));
        assert!(!sig.accepts(IrType::I32, &[IrType::I32]));
        assert!(!sig.accepts(IrType::Void, &[IrType::I32, IrType::I32]));

        let printf =
            Function::new("printf", IrType::I32, vec![Param::unnamed(IrType::Ptr)]).variadic();
        let sig = printf.signature();
        assert!(sig.accepts(IrType::I32, &[IrType::Ptr, IrType::I32, IrType::I64]));
        assert!(!sig.accepts(IrType::I32, &[]));
        assert_eq!(sig.to_string(), "i32 (ptr, ...)");
    }

    #[test]
    fn test_declaration_display() {
        let printf =
            Function::new("printf", IrType::I32, vec![Param::unnamed(IrType::Ptr)]).variadic();
        assert!(printf.is_declaration());
        assert_eq!(printf.to_string(), "declare i32 @printf(ptr, ...)\n");
    }

    #[test]
    fn test_demangled_name() {
        let foo = Function::new("_Z3foov", IrType::Void, vec![]);
        assert_eq!(foo.demangled_name(), "foo()");
        let main = Function::new("main", IrType::I32, vec![]);
        assert_eq!(main.demangled_name(), "main");
    }
}
