//! Dalvik bytecode layout and encoding.
//!
//! This module holds the back end's view of a compiled method: a [`MethodBody`] with its
//! [`Instruction`]s, registers and [`ExceptionHandler`]s. It lays out offsets in 16-bit code
//! units, re-routes branches when instructions are replaced, and encodes the result.
//!
//! # Architecture
//!
//! Instructions reference each other through [`InstrId`] handles rather than offsets, so
//! optimization stages can insert, remove and re-route freely. Offsets are only assigned by
//! [`MethodBody::update_instruction_offsets`], using the fixed code-unit length of each
//! [`InstructionFormat`]. Switch tables and array data live in payload blocks after the last
//! instruction; each block is rounded up to an even length.
//!
//! # Key Components
//!
//! - [`OpCode`] / [`InstructionFormat`] - Opcode table with per-format lengths
//! - [`MethodBody`] - Instruction list and lifecycle state machine
//! - [`BranchReRouter`] - Atomic retargeting of branches, switch entries and handlers
//! - [`InstructionWriter`] - Code-unit encoder driven by an [`IndexResolver`]
//! - [`Register`] / [`RegisterFlags`] - Register operands and their encoding limits
//!
//! # Examples
//!
//! ```rust
//! use dotdex::dex::{BranchReRouter, ExceptionHandler, MethodBody, OpCode, Operand, Register};
//!
//! let mut body = MethodBody::new(1);
//! let a = body.push(OpCode::Nop, vec![], Operand::None)?;
//! let b = body.push(OpCode::Nop, vec![], Operand::None)?;
//! let c = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
//! body.add_handler(ExceptionHandler::new(a, c))?;
//!
//! let replacement = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
//! BranchReRouter::new(&mut body).reroute(c, replacement)?;
//! assert_eq!(body.handlers()[0].try_end, b);
//!
//! let stats = body.update_instruction_offsets()?;
//! assert_eq!(stats.total(), 4);
//! # Ok::<(), dotdex::Error>(())
//! ```

mod body;
mod handler;
mod instruction;
mod opcodes;
mod payload;
mod register;
mod reroute;
mod writer;

pub use body::{BodyState, MethodBody, OffsetStatistics};
pub use handler::{Catch, ExceptionHandler};
pub use instruction::{InstrId, Instruction, Operand};
pub use opcodes::{InstructionFormat, OpCode};
pub use payload::{
    align_even, payload_units, ArrayData, PackedSwitchData, SparseSwitchData, ARRAY_DATA_IDENT,
    PACKED_SWITCH_IDENT, SPARSE_SWITCH_IDENT,
};
pub use register::{
    argument_words, fits_standard_invoke, is_consecutive, Register, RegisterFlags,
};
pub use reroute::BranchReRouter;
pub use writer::{IndexPool, IndexResolver, InstructionWriter};
