//! Shared helpers that do not belong to a single module.

mod symbols;

pub use symbols::{demangle, is_mangled};
