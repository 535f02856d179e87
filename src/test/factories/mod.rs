//! Program factories.
//!
//! Each factory returns a freshly parsed, valid program. In every program with a
//! `main`, `main` is the third function, so call sites in its entry block sit at
//! `InstructionLocation::new(2, 0, i)`.

mod programs;

pub use programs::*;
