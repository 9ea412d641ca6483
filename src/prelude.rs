//! # dotdex Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotdex library. Import this module to get quick access to the type model, the
//! reachability engine and the bytecode layer.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotdex operations
pub use crate::Error;

/// The result type used throughout dotdex
pub use crate::Result;

// ================================================================================================
// Configuration and Diagnostics
// ================================================================================================

/// Reachability configuration
pub use crate::config::{CompilationMode, ReachableConfig};

/// Collected non-fatal issues
pub use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};

// ================================================================================================
// Unified Type Model
// ================================================================================================

/// The registry and its source providers
pub use crate::model::{InMemorySource, Module, SourceProvider};

/// Tokens identifying definitions
pub use crate::model::{MemberKind, Token};

/// Type references and their classification
pub use crate::model::{PrimitiveKind, TypeOrigin, TypeRefKind, TypeReference, TypeUsage};

/// Definitions
pub use crate::model::{
    FieldDefinition, FieldDefinitionRc, MethodDefinition, MethodDefinitionRc, TypeDefinition,
    TypeDefinitionRc,
};

/// Member references and flags
pub use crate::model::{
    FieldFlags, FieldReference, MemberReference, MethodFlags, MethodReference, TypeFlags,
    Visibility,
};

/// Builders for registering definitions
pub use crate::model::{FieldBuilder, MethodBuilder, TypeBuilder};

/// Attributes and generics
pub use crate::model::{AttributeValue, CustomAttribute, GenericOwner, GenericParameter};

/// Raw signature conversion
pub use crate::model::{ForeignType, NativeType, RawType};

// ================================================================================================
// Reachability
// ================================================================================================

/// The reachability engine
pub use crate::reachable::{ReachableContext, ReachableSet, ReachableStats};

/// Include rules and testers
pub use crate::reachable::{IncludeTester, Pattern, PatternInclude, TargetInclude};

// ================================================================================================
// Dalvik Bytecode
// ================================================================================================

/// Method bodies and their layout
pub use crate::dex::{BodyState, MethodBody, OffsetStatistics};

/// Instructions and operands
pub use crate::dex::{InstrId, Instruction, InstructionFormat, OpCode, Operand, Register};

/// Payload tables
pub use crate::dex::{ArrayData, PackedSwitchData, SparseSwitchData};

/// Exception handlers
pub use crate::dex::{Catch, ExceptionHandler};

/// Re-routing and encoding
pub use crate::dex::{BranchReRouter, IndexPool, IndexResolver, InstructionWriter};

// ================================================================================================
// Compilation Driver
// ================================================================================================

/// Per-method compilation
pub use crate::driver::{
    CompilationDriver, CompilationOutput, CompilationSummary, CompiledMethod, CompiledType,
    MethodCompiler,
};
