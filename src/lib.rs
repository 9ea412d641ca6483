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
#![allow(clippy::too_many_arguments)]

//! # dotdex
//!
//! The back end of a CIL to Dalvik cross-compiler. `dotdex` takes a program described by
//! .NET metadata and JVM class files, decides which parts of it are needed, and lays out and
//! encodes the Dalvik bytecode of the methods that remain.
//!
//! ## Features
//!
//! - **Unified type model** - One graph of types, methods and fields over CIL and JVM inputs,
//!   with lazy loading through pluggable source providers
//! - **Tree shaking** - Whole-program reachability with roots from configuration and marker
//!   attributes, propagated through overrides, interfaces, bridges and conditional includes
//! - **Bytecode layout** - Offset computation in code units, payload sizing, branch
//!   re-routing and a full Dalvik instruction encoder
//! - **Parallel** - Reachability passes and method compilation fan out with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dotdex::prelude::*;
//!
//! let module = Arc::new(Module::new());
//! let void = TypeReference::primitive(PrimitiveKind::Void);
//! let helper = TypeBuilder::native("App", "App", "Helper")
//!     .with_method(MethodBuilder::new("Run").with_flags(MethodFlags::STATIC))
//!     .register(&module)?;
//! TypeBuilder::native("App", "App", "Unused")
//!     .with_method(MethodBuilder::new("Dead"))
//!     .register(&module)?;
//! TypeBuilder::native("App", "App", "Program")
//!     .with_method(
//!         MethodBuilder::new("Main")
//!             .with_flags(MethodFlags::STATIC)
//!             .with_reference(MethodReference::new(helper.reference(), "Run", vec![], void).into_static()),
//!     )
//!     .register(&module)?;
//!
//! let config = ReachableConfig::application()
//!     .with_root("App.Program")
//!     .with_target(TargetInclude::new("App.Program::Main"));
//! let context = ReachableContext::run(module, config);
//! let names: Vec<String> = context.reachable_types().iter().map(|ty| ty.full_name()).collect();
//! assert_eq!(names, vec!["App.Helper", "App.Program"]);
//!
//! let compiler = |_: &Module, _: &MethodDefinition| -> Result<Option<MethodBody>> {
//!     let mut body = MethodBody::new(0);
//!     body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
//!     Ok(Some(body))
//! };
//! let output = CompilationDriver::new(&context).run(&compiler);
//! assert_eq!(output.summary.compiled, 2);
//! # Ok::<(), dotdex::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`model`] - Unified type model: [`model::Module`], references, definitions, providers
//! - [`reachable`] - Reachability engine: roots, includes, fixpoint propagation
//! - [`dex`] - Method bodies, offset layout, re-routing and encoding
//! - [`driver`] - Per-method compilation over the reachable set
//! - [`config`] - Reachability configuration
//! - [`diagnostics`] - Thread-safe collection of non-fatal issues
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Looking up something that does not exist is not an error: resolution misses are `None`
//! and the walk continues. Errors are reserved for malformed input to the layout engine
//! ([`Error::Structural`]), lifecycle misuse ([`Error::InvalidState`]) and constructs the
//! target cannot express ([`Error::Unsupported`]). The driver contains all of them per method
//! and records them as [`diagnostics::Diagnostic`]s.
//!
//! ## Logging
//!
//! `dotdex` emits [`tracing`] events and never installs a subscriber. Resolution misses and
//! per-pass progress are reported at `debug` and `trace`, unsupported constructs at `warn`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared fixtures for the unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotdex::prelude::*;
///
/// let module = Module::new();
/// let config = ReachableConfig::class_library();
/// assert_eq!(config.mode, CompilationMode::ClassLibrary);
/// assert!(module.types().is_empty());
/// ```
pub mod prelude;

/// Reachability configuration.
///
/// Root names, pattern and target includes, compilation mode and walk limits. See
/// [`config::ReachableConfig`].
pub mod config;

/// Diagnostics collected while shaking and compiling.
///
/// Entries carry a severity, a category, the token of the definition concerned and, for
/// encoding problems, the code-unit offset of the offending instruction.
pub mod diagnostics;

/// Dalvik bytecode layout and encoding.
pub mod dex;

/// Per-method compilation over the reachable set.
pub mod driver;

/// Unified Type Model over CIL and JVM inputs.
pub mod model;

/// Whole-program reachability (tree shaking).
pub mod reachable;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use dotdex::{dex::MethodBody, Result};
///
/// fn layout(body: &mut MethodBody) -> Result<u32> {
///     Ok(body.update_instruction_offsets()?.total())
/// }
/// assert_eq!(layout(&mut MethodBody::new(0)).unwrap(), 0);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotdex` Error type
///
/// The main error type for all operations in this crate. See the variants of [`Error`] for the
/// individual variants.
pub use error::Error;
