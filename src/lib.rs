// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # callswap
//!
//! Call-site analysis and rewriting over a compact, LLVM-flavoured SSA intermediate
//! representation.
//!
//! `callswap` locates every direct call to one designated function, rewrites those
//! calls to target a replacement function while injecting a synthesized `i32`
//! argument, and re-verifies the program afterwards. With the default
//! configuration every call to `foo()` becomes a call to `bar(int)`, numbered from
//! one in program order.
//!
//! ## Features
//!
//! - **Text loader and printer** - Parse the IR text format with precise error
//!   positions; printing and re-parsing yields a structurally identical program
//! - **Structural verifier** - Errors for broken programs, warnings for broken
//!   debug metadata
//! - **Call-site analysis** - Exact or demangled (Itanium) symbol matching, stable
//!   traversal order, staleness detection
//! - **Memoized analyses** - A typed registry that computes each analysis once per
//!   program state
//! - **Two rewrite strategies** - Splice in a fresh call, or mutate the existing
//!   one after a signature check
//!
//! ## Quick Start
//!
//! ```rust
//! use callswap::prelude::*;
//!
//! let source = r#"
//! declare void @_Z3foov()
//! declare void @_Z3bari(i32)
//!
//! define i32 @main() {
//! entry:
//!   call void @_Z3foov()
//!   call void @_Z3foov()
//!   ret i32 0
//! }
//! "#;
//!
//! let mut pipeline = Pipeline::from_source(source, RewriteConfig::default())?;
//! let output = pipeline.run()?;
//!
//! assert_eq!(output.replacements.len(), 2);
//! println!("{}", output.rendered.unwrap_or_default());
//! # Ok::<(), callswap::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - Program model, text loader, printer and verifier
//! - [`analysis`] - The call-site analysis and the analysis manager
//! - [`transform`] - The call-site rewriting transformation
//! - [`pipeline`] - Load, verify, analyze, transform, re-verify, print
//! - [`utils`] - Symbol demangling
//! - [`prelude`] - Re-exports of the commonly used types
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust
//! use callswap::{Error, Program};
//!
//! match Program::from_source("define void @f() {\n}\n") {
//!     Ok(_) => unreachable!(),
//!     Err(Error::Parse { line, column, .. }) => println!("bad input at {line}:{column}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//!
//! # Fuzz the text loader
//! cargo +nightly fuzz run loader --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use callswap::prelude::*;
///
/// let program = Program::from_source("declare void @_Z3foov()\n")?;
/// let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);
/// assert!(sites.is_empty());
/// # Ok::<(), callswap::Error>(())
/// ```
pub mod prelude;

pub mod analysis;
pub mod ir;
pub mod pipeline;
pub mod transform;
pub mod utils;

/// `callswap` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use callswap::{Program, Result};
///
/// fn count_functions(source: &str) -> Result<usize> {
///     Ok(Program::from_source(source)?.function_count())
/// }
/// # assert_eq!(count_functions("declare void @f()\n").unwrap(), 1);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `callswap` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the
/// individual variants.
pub use error::{Error, VerificationStage};

/// The in-memory program, the main entry point of the IR toolkit
pub use ir::Program;
