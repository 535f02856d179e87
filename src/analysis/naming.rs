//! Symbol name matching.
//!
//! Function names in a program are raw linker symbols. A configured name is compared
//! against them either verbatim ([`NameMatch::Exact`]) or after Itanium demangling
//! ([`NameMatch::Demangled`]). In demangled mode the target has to be the full
//! demangled signature, so `foo()` and `foo(int)` are different functions, and a bare
//! `foo` only matches an unmangled C symbol.

use std::borrow::Cow;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{ir::Program, utils::demangle};

/// How configured names are compared against function symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum NameMatch {
    /// Compare against the raw linker symbol, e.g. `_Z3foov`.
    Exact,
    /// Compare against the demangled name, e.g. `foo()`. Unmangled symbols
    /// compare raw.
    #[default]
    Demangled,
}

/// Compares function symbols against one configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatcher {
    target: String,
    mode: NameMatch,
}

impl SymbolMatcher {
    /// Creates a matcher for `target` under `mode`.
    pub fn new(target: impl Into<String>, mode: NameMatch) -> Self {
        SymbolMatcher {
            target: target.into(),
            mode,
        }
    }

    /// Returns the configured name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the comparison mode.
    #[must_use]
    pub const fn mode(&self) -> NameMatch {
        self.mode
    }

    /// Returns `symbol` in the form it is compared in.
    #[must_use]
    pub fn normalize<'a>(&self, symbol: &'a str) -> Cow<'a, str> {
        match self.mode {
            NameMatch::Exact => Cow::Borrowed(symbol),
            NameMatch::Demangled => demangle(symbol),
        }
    }

    /// Returns true if `symbol` names the configured function.
    #[must_use]
    pub fn matches(&self, symbol: &str) -> bool {
        self.normalize(symbol) == self.target.as_str()
    }
}

/// Finds the function a configured name refers to.
///
/// The raw symbol is tried first; if no function has that exact symbol, the first
/// function whose demangled name equals `name` is returned. Declarations count.
///
/// # Arguments
///
/// * `program` - The program to search
/// * `name` - A raw symbol (`_Z3bari`) or a demangled name (`bar(int)`)
///
/// # Returns
///
/// The index of the function in declaration order, or `None`.
#[must_use]
pub fn resolve_function(program: &Program, name: &str) -> Option<usize> {
    program.function_index(name).or_else(|| {
        program
            .functions()
            .iter()
            .position(|function| demangle(function.name()) == name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, IrType, Param};

    #[test]
    fn test_demangled_matching() {
        let matcher = SymbolMatcher::new("foo()", NameMatch::Demangled);
        assert!(matcher.matches("_Z3foov"));
        assert!(!matcher.matches("_Z3fooi"));
        assert!(!matcher.matches("foo"));

        let plain = SymbolMatcher::new("foo", NameMatch::Demangled);
        assert!(plain.matches("foo"));
        assert!(!plain.matches("_Z3foov"));
    }

    #[test]
    fn test_exact_matching() {
        let matcher = SymbolMatcher::new("_Z3foov", NameMatch::Exact);
        assert!(matcher.matches("_Z3foov"));
        assert!(!matcher.matches("foo()"));
        assert_eq!(matcher.normalize("_Z3foov"), "_Z3foov");
    }

    #[test]
    fn test_mode_text_form() {
        assert_eq!(NameMatch::default(), NameMatch::Demangled);
        assert_eq!("exact".parse::<NameMatch>().unwrap(), NameMatch::Exact);
        assert_eq!(NameMatch::Demangled.to_string(), "demangled");
    }

    #[test]
    fn test_resolve_function() {
        let program = Program::new()
            .with_function(Function::new("bar", IrType::Void, vec![]))
            .with_function(Function::new(
                "_Z3bari",
                IrType::Void,
                vec![Param::unnamed(IrType::I32)],
            ));

        assert_eq!(resolve_function(&program, "_Z3bari"), Some(1));
        assert_eq!(resolve_function(&program, "bar(int)"), Some(1));
        assert_eq!(resolve_function(&program, "bar"), Some(0));
        assert_eq!(resolve_function(&program, "baz(int)"), None);
    }
}
