use thiserror::Error;

use crate::{
    dex::{InstrId, Instruction},
    model::Token,
};

macro_rules! structural_error {
    // Single string version
    ($ins:expr, $msg:expr) => {
        crate::Error::Structural {
            instruction: Box::new($ins.clone()),
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($ins:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::Structural {
            instruction: Box::new($ins.clone()),
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Resolution misses are deliberately absent: looking up a type or member that is not
/// available is an ordinary outcome and is reported through `Option`, never through this enum.
///
/// # Error Categories
///
/// ## Encoding Errors
/// - [`Error::Structural`] - Malformed instruction shape or dangling branch target
/// - [`Error::InstructionNotFound`] - Handle or handler boundary outside the method body
/// - [`Error::UnknownOpcode`] - Opcode byte without a known format
/// - [`Error::InvalidState`] - Method body used out of lifecycle order
/// - [`Error::IndexMissing`] - Constant pool index not available during encoding
///
/// ## Type Model Errors
/// - [`Error::DuplicateScopeId`] - Two definitions registered with the same scope id
/// - [`Error::TypeNotFound`] - Token does not refer to a registered type
/// - [`Error::NotSupported`] - Raw type shape without a unified counterpart
///
/// ## Compilation Errors
/// - [`Error::Unsupported`] - Source construct without a Dalvik equivalent
/// - [`Error::RecursionLimit`] - Maximum walk depth exceeded
///
/// # Examples
///
/// ```rust
/// use dotdex::{dex::{MethodBody, OpCode}, Error};
///
/// let mut body = MethodBody::new(1);
/// body.push(OpCode::ReturnVoid, vec![], dotdex::dex::Operand::None).unwrap();
/// match body.offset_of(body.instructions()[0].id()) {
///     Err(Error::InvalidState { .. }) => println!("offsets not computed yet"),
///     Err(e) => eprintln!("Other error: {}", e),
///     Ok(offset) => println!("offset {offset}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An instruction has a malformed operand shape, or references a branch or switch target
    /// that is not part of its method body.
    ///
    /// This indicates a defect in the stage that produced the instruction stream. It is fatal
    /// for the enclosing method only.
    ///
    /// # Fields
    ///
    /// * `instruction` - Copy of the offending instruction
    /// * `message` - What was wrong with it
    #[error("Structural inconsistency at {instruction}: {message}")]
    Structural {
        /// The instruction that triggered the error
        instruction: Box<Instruction>,
        /// Description of the inconsistency
        message: String,
    },

    /// An opcode value has no entry in the format table.
    #[error("Unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A method body operation was requested in the wrong lifecycle state.
    ///
    /// Offsets can only be read from a finalized body, and a serialized body is read-only.
    #[error("Method body is {actual}, expected {expected}")]
    InvalidState {
        /// The state the operation requires
        expected: &'static str,
        /// The state the body was in
        actual: &'static str,
    },

    /// An instruction handle is not part of the method body it was used with.
    #[error("Instruction {0} is not part of the method body")]
    InstructionNotFound(InstrId),

    /// The index resolver had no entry for an operand referenced by an instruction.
    #[error("No {kind} index for operand of {instruction}")]
    IndexMissing {
        /// The instruction whose operand could not be indexed
        instruction: Box<Instruction>,
        /// Which pool was consulted (string, type, field, method)
        kind: &'static str,
    },

    /// A second definition tried to claim an already registered scope id.
    #[error("Scope id already registered - {0}")]
    DuplicateScopeId(String),

    /// A token did not refer to a registered type definition.
    #[error("Failed to find type in module - {0}")]
    TypeNotFound(Token),

    /// The requested conversion or feature is not supported.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// A source-language construct has no equivalent in the target bytecode.
    ///
    /// Reported per member; compilation of other members continues.
    #[error("Unsupported construct in {member}: {message}")]
    Unsupported {
        /// Full name of the member being compiled
        member: String,
        /// Description of the construct
        message: String,
    },

    /// Recursion limit reached.
    ///
    /// Guards base-type and interface walks over malformed or cyclic input. The associated
    /// value shows the configured limit.
    #[error("Maximum walk depth of {0} reached")]
    RecursionLimit(usize),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
