//! Linker symbol helpers.

use std::borrow::Cow;

use cpp_demangle::{DemangleOptions, Symbol};

/// Returns true if `symbol` uses the Itanium C++ mangling scheme.
#[must_use]
pub fn is_mangled(symbol: &str) -> bool {
    symbol.starts_with("_Z")
}

/// Demangles an Itanium C++ symbol.
///
/// Symbols that are not mangled, or that fail to demangle, are returned as-is,
/// so `main` stays `main` and `_Z3foov` becomes `foo()`.
///
/// # Examples
///
/// ```rust
/// use callswap::utils::demangle;
///
/// assert_eq!(demangle("_Z3bari"), "bar(int)");
/// assert_eq!(demangle("printf"), "printf");
/// ```
#[must_use]
pub fn demangle(symbol: &str) -> Cow<'_, str> {
    if !is_mangled(symbol) {
        return Cow::Borrowed(symbol);
    }

    match Symbol::new(symbol) {
        Ok(parsed) => match parsed.demangle(&DemangleOptions::default()) {
            Ok(demangled) => Cow::Owned(demangled),
            Err(_) => Cow::Borrowed(symbol),
        },
        Err(_) => Cow::Borrowed(symbol),
    }
}
