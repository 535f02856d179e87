//! A compact, LLVM-flavoured SSA intermediate representation.
//!
//! This module is the IR toolkit the analyses and transformations of this crate
//! operate on. It provides the in-memory program model, a loader for the text
//! format, a structural verifier and a printer.
//!
//! # Architecture
//!
//! ```text
//! text ──► lexer ──► parser ──► Program ──► Verifier ──► VerifierReport
//!                                  │
//!                                  └──► Display (printer) ──► text
//! ```
//!
//! The printer is the [`std::fmt::Display`] implementation of [`Program`] and its
//! parts. Printing a program and parsing the result yields a structurally equal
//! program.
//!
//! # Key Components
//!
//! - [`Program`] - Functions plus debug metadata, with identity and generation
//! - [`Function`] / [`BasicBlock`] / [`Instruction`] - The body hierarchy
//! - [`Op`] - Operations, grouped into [`InstructionCategory`] classes
//! - [`IrType`] / [`Value`] / [`Operand`] - Types and operand values
//! - [`Verifier`] - Structural checks producing [`Diagnostics`]
//! - [`InstructionLocation`] - Position of an instruction inside a program
//!
//! # Text Format
//!
//! ```text
//! declare i32 @printf(ptr, ...)
//! define void @_Z3bari(i32 %I) {
//! entry:
//!   %r = add i32 %I, 1, !dbg !0
//!   ret void
//! }
//! !0 = !DILocation(line: 3, column: 5)
//! ```
//!
//! `;` starts a comment that runs to the end of the line.

mod block;
mod diagnostics;
mod function;
mod instruction;
mod lexer;
mod ops;
mod parser;
mod program;
mod types;
mod value;
mod verifier;

pub use block::BasicBlock;
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
pub use function::{Function, Param, Signature};
pub use instruction::{Instruction, InstructionLocation};
pub use ops::{BinaryOp, CallOp, Callee, IcmpPredicate, InstructionCategory, Op};
pub use program::{DebugLocation, Program, ProgramId};
pub use types::IrType;
pub use value::{Operand, Value};
pub use verifier::{Verifier, VerifierReport};

pub(crate) use value::quote_name;
