//! Compilation driver.
//!
//! Walks the reachable types of a completed [`ReachableContext`] in sorted order and hands every
//! reachable method to a caller-supplied [`MethodCompiler`]. The resulting bodies are laid out
//! and encoded with an [`InstructionWriter`] backed by a shared [`IndexPool`].
//!
//! Failures are contained per method. A structural or encoding error aborts only the method
//! it occurred in and is recorded as an error diagnostic; an unsupported construct is recorded
//! as a warning. Everything else keeps compiling.
//!
//! # Thread Safety
//!
//! Types are compiled in parallel with rayon when the reachability configuration enables it.
//! Output order does not depend on scheduling; constant pool indices do.

use rayon::prelude::*;

use crate::{
    dex::{IndexPool, InstructionWriter, MethodBody, OffsetStatistics},
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
    model::{MethodDefinition, Module, Token, TypeDefinition},
    reachable::ReachableContext,
    Error, Result,
};

/// Translates one method into a Dalvik body.
pub trait MethodCompiler: Send + Sync {
    /// Compiles a method.
    ///
    /// Returns `Ok(None)` for methods without code, such as abstract or native methods.
    ///
    /// # Errors
    /// [`Error::Unsupported`] marks a construct without a Dalvik equivalent; any other error
    /// counts as a failure of this method.
    fn compile(&self, module: &Module, method: &MethodDefinition) -> Result<Option<MethodBody>>;
}

impl<F> MethodCompiler for F
where
    F: Fn(&Module, &MethodDefinition) -> Result<Option<MethodBody>> + Send + Sync,
{
    fn compile(&self, module: &Module, method: &MethodDefinition) -> Result<Option<MethodBody>> {
        self(module, method)
    }
}

/// An encoded method.
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    /// Token of the method definition
    pub token: Token,
    /// Full name of the method
    pub name: String,
    /// The serialized body
    pub body: MethodBody,
    /// Layout of the body
    pub statistics: OffsetStatistics,
    /// Encoded code units, payloads included
    pub code: Vec<u16>,
}

/// The encoded methods of one reachable type.
#[derive(Debug, Clone)]
pub struct CompiledType {
    /// Token of the type definition
    pub token: Token,
    /// Full name of the type
    pub name: String,
    /// Methods that compiled, in declaration order
    pub methods: Vec<CompiledMethod>,
}

/// Aggregate counters of a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompilationSummary {
    /// Methods encoded successfully
    pub compiled: usize,
    /// Methods without code
    pub skipped: usize,
    /// Methods aborted by a structural or encoding error
    pub failed: usize,
    /// Methods containing an unsupported construct
    pub unsupported: usize,
    /// Code units emitted over all methods
    pub code_units: usize,
}

impl CompilationSummary {
    /// Number of methods offered to the compiler.
    #[must_use]
    pub fn total(&self) -> usize {
        self.compiled + self.skipped + self.failed + self.unsupported
    }
}

/// Result of a driver run.
#[derive(Debug)]
pub struct CompilationOutput {
    /// Compiled types, sorted by full name
    pub types: Vec<CompiledType>,
    /// Counters
    pub summary: CompilationSummary,
}

enum Outcome {
    Compiled(CompiledMethod),
    Skipped,
    Failed,
    Unsupported,
}

/// Drives method compilation over the reachable set.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotdex::config::ReachableConfig;
/// use dotdex::dex::{MethodBody, OpCode, Operand};
/// use dotdex::driver::CompilationDriver;
/// use dotdex::model::{MethodBuilder, MethodDefinition, Module, TypeBuilder};
/// use dotdex::reachable::ReachableContext;
///
/// let module = Arc::new(Module::new());
/// TypeBuilder::native("App", "App", "Program")
///     .with_method(MethodBuilder::new("Main"))
///     .register(&module)?;
/// let context = ReachableContext::run(module, ReachableConfig::class_library());
///
/// let compiler = |_: &Module, _: &MethodDefinition| -> dotdex::Result<Option<MethodBody>> {
///     let mut body = MethodBody::new(0);
///     body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
///     Ok(Some(body))
/// };
/// let output = CompilationDriver::new(&context).run(&compiler);
/// assert_eq!(output.summary.compiled, 1);
/// assert_eq!(output.summary.code_units, 1);
/// # Ok::<(), dotdex::Error>(())
/// ```
pub struct CompilationDriver<'a> {
    context: &'a ReachableContext,
    pool: IndexPool,
}

impl<'a> CompilationDriver<'a> {
    /// Creates a driver over a completed reachability context.
    #[must_use]
    pub fn new(context: &'a ReachableContext) -> Self {
        CompilationDriver {
            context,
            pool: IndexPool::new(),
        }
    }

    /// The constant pool shared by all encoded methods.
    #[must_use]
    pub fn pool(&self) -> &IndexPool {
        &self.pool
    }

    /// Diagnostics sink; the same one the reachability context reports to.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        self.context.diagnostics()
    }

    /// Compiles every reachable method.
    pub fn run(&self, compiler: &dyn MethodCompiler) -> CompilationOutput {
        let types = self.context.reachable_types();
        let compile = |ty: &crate::model::TypeDefinitionRc| self.compile_type(ty, compiler);

        let results: Vec<(CompiledType, Vec<Outcome>)> = if self.context.config().parallel {
            types.par_iter().map(compile).collect()
        } else {
            types.iter().map(compile).collect()
        };

        let mut summary = CompilationSummary::default();
        let mut compiled = Vec::with_capacity(results.len());
        for (mut ty, outcomes) in results {
            for outcome in outcomes {
                match outcome {
                    Outcome::Compiled(method) => {
                        summary.compiled += 1;
                        summary.code_units += method.code.len();
                        ty.methods.push(method);
                    }
                    Outcome::Skipped => summary.skipped += 1,
                    Outcome::Failed => summary.failed += 1,
                    Outcome::Unsupported => summary.unsupported += 1,
                }
            }
            compiled.push(ty);
        }

        tracing::debug!(
            "compiled {} methods ({} failed, {} unsupported, {} without code), {} code units",
            summary.compiled,
            summary.failed,
            summary.unsupported,
            summary.skipped,
            summary.code_units
        );
        CompilationOutput {
            types: compiled,
            summary,
        }
    }

    fn compile_type(
        &self,
        ty: &TypeDefinition,
        compiler: &dyn MethodCompiler,
    ) -> (CompiledType, Vec<Outcome>) {
        let outcomes = self
            .context
            .reachable_methods(ty)
            .iter()
            .map(|method| self.compile_method(method, compiler))
            .collect();
        let compiled = CompiledType {
            token: ty.token(),
            name: ty.full_name(),
            methods: Vec::new(),
        };
        (compiled, outcomes)
    }

    fn compile_method(&self, method: &MethodDefinition, compiler: &dyn MethodCompiler) -> Outcome {
        let module = self.context.module();
        let mut body = match compiler.compile(module, method) {
            Ok(Some(body)) => body,
            Ok(None) => return Outcome::Skipped,
            Err(error) => return self.report(method, None, error),
        };

        self.pool.collect(&body);
        let code = match InstructionWriter::new(&self.pool).write(&mut body) {
            Ok(code) => code,
            Err(error) => return self.report(method, Some(&body), error),
        };
        let statistics = match body.statistics() {
            Ok(statistics) => statistics,
            Err(error) => return self.report(method, Some(&body), error),
        };

        Outcome::Compiled(CompiledMethod {
            token: method.token,
            name: method.full_name(),
            body,
            statistics,
            code,
        })
    }

    fn report(&self, method: &MethodDefinition, body: Option<&MethodBody>, error: Error) -> Outcome {
        let (severity, category) = classify(&error);
        let outcome = if severity == DiagnosticSeverity::Warning {
            tracing::warn!("{error}");
            Outcome::Unsupported
        } else {
            Outcome::Failed
        };

        let mut diagnostic = Diagnostic::new(
            severity,
            category,
            format!("{}: {error}", method.full_name()),
        )
        .with_token(method.token);
        let instruction = match &error {
            Error::Structural { instruction, .. } | Error::IndexMissing { instruction, .. } => {
                Some(instruction.id())
            }
            _ => None,
        };
        if let (Some(id), Some(body)) = (instruction, body) {
            if let Ok(offset) = body.offset_of(id) {
                diagnostic = diagnostic.with_offset(offset);
            }
        }
        self.diagnostics().push(diagnostic);
        outcome
    }
}

/// Severity and category a per-method error is recorded under.
///
/// Constructs the target cannot express only skip the method; everything else fails it.
fn classify(error: &Error) -> (DiagnosticSeverity, DiagnosticCategory) {
    match error {
        Error::Unsupported { .. } | Error::NotSupported(_) => {
            (DiagnosticSeverity::Warning, DiagnosticCategory::Unsupported)
        }
        Error::IndexMissing { .. } | Error::TypeNotFound(_) => {
            (DiagnosticSeverity::Error, DiagnosticCategory::Resolution)
        }
        Error::InvalidState { .. } => (DiagnosticSeverity::Error, DiagnosticCategory::Lifecycle),
        _ => (DiagnosticSeverity::Error, DiagnosticCategory::Structural),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::ReachableConfig,
        dex::{OpCode, Operand, Register},
        model::{MethodBuilder, MethodFlags, TypeBuilder},
    };

    fn compile(_: &Module, method: &MethodDefinition) -> Result<Option<MethodBody>> {
        let mut body = MethodBody::new(17);
        match method.name.as_str() {
            "Abstract" => return Ok(None),
            "Unsafe" => {
                return Err(Error::Unsupported {
                    member: method.full_name(),
                    message: "pointer arithmetic".to_string(),
                })
            }
            "Broken" => {
                body.push(OpCode::Nop, vec![], Operand::None)?;
                // 4-bit slot cannot hold v16
                body.push(OpCode::Move, vec![Register::new(16), Register::new(0)], Operand::None)?;
            }
            "Strings" => {
                body.push(OpCode::ConstString, vec![Register::new(0)], Operand::String("a".into()))?;
                body.push(OpCode::ConstString, vec![Register::new(1)], Operand::String("b".into()))?;
            }
            _ => {}
        }
        body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
        Ok(Some(body))
    }

    fn context(parallel: bool) -> ReachableContext {
        let module = Arc::new(Module::new());
        TypeBuilder::native("App", "App", "Zeta")
            .with_method(MethodBuilder::new("Run"))
            .register(&module)
            .unwrap();
        TypeBuilder::native("App", "App", "Alpha")
            .with_method(MethodBuilder::new("Strings"))
            .with_method(MethodBuilder::new("Broken"))
            .with_method(MethodBuilder::new("Unsafe"))
            .with_method(
                MethodBuilder::new("Abstract").with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT),
            )
            .register(&module)
            .unwrap();
        ReachableContext::run(
            module,
            ReachableConfig::class_library().with_parallel(parallel),
        )
    }

    #[test]
    fn test_summary_and_diagnostics() {
        for parallel in [false, true] {
            let context = context(parallel);
            let driver = CompilationDriver::new(&context);
            let output = driver.run(&compile);

            assert_eq!(
                output.summary,
                CompilationSummary {
                    compiled: 2,
                    skipped: 1,
                    failed: 1,
                    unsupported: 1,
                    code_units: 6,
                }
            );
            assert_eq!(output.summary.total(), 5);

            let names: Vec<_> = output.types.iter().map(|ty| ty.name.as_str()).collect();
            assert_eq!(names, vec!["App.Alpha", "App.Zeta"]);
            assert_eq!(output.types[0].methods.len(), 1);
            assert_eq!(output.types[0].methods[0].code, vec![0x001a, 0, 0x011a, 1, 0x000e]);

            let diagnostics = driver.diagnostics();
            assert_eq!(diagnostics.error_count(), 1);
            assert_eq!(diagnostics.warning_count(), 1);
            let errors = diagnostics.by_category(DiagnosticCategory::Structural);
            let error = errors[0];
            assert_eq!(error.offset, Some(1));
            assert!(error.message.contains("Broken"));
            assert_eq!(driver.pool().string_count(), 2);
        }
    }

    #[test]
    fn test_error_classification() {
        let unsupported = Error::Unsupported {
            member: "App.Foo::Bar".to_string(),
            message: "fixed statement".to_string(),
        };
        assert_eq!(
            classify(&unsupported),
            (DiagnosticSeverity::Warning, DiagnosticCategory::Unsupported)
        );

        let mut body = MethodBody::new(1);
        let id = body
            .push(OpCode::ConstString, vec![Register::new(0)], Operand::String("a".into()))
            .unwrap();
        let missing = Error::IndexMissing {
            instruction: Box::new(body.instruction(id).unwrap().clone()),
            kind: "string",
        };
        assert_eq!(
            classify(&missing),
            (DiagnosticSeverity::Error, DiagnosticCategory::Resolution)
        );

        let state = Error::InvalidState {
            expected: "Finalized",
            actual: "Serialized",
        };
        assert_eq!(
            classify(&state),
            (DiagnosticSeverity::Error, DiagnosticCategory::Lifecycle)
        );

        assert_eq!(
            classify(&Error::Error("reversed try range".to_string())),
            (DiagnosticSeverity::Error, DiagnosticCategory::Structural)
        );
    }

    #[test]
    fn test_serialized_body_fails_as_lifecycle() {
        let module = Arc::new(Module::new());
        TypeBuilder::native("App", "App", "Program")
            .with_method(MethodBuilder::new("Run"))
            .register(&module)
            .unwrap();
        let context = ReachableContext::run(module, ReachableConfig::class_library());

        // Hands back a body that was already encoded once
        let reused = |_: &Module, _: &MethodDefinition| -> Result<Option<MethodBody>> {
            let mut body = MethodBody::new(1);
            body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
            InstructionWriter::new(&IndexPool::new()).write(&mut body)?;
            Ok(Some(body))
        };
        let driver = CompilationDriver::new(&context);
        let output = driver.run(&reused);

        assert_eq!(output.summary.failed, 1);
        assert_eq!(output.summary.compiled, 0);
        let diagnostics = driver.diagnostics();
        assert_eq!(diagnostics.count_category(DiagnosticCategory::Lifecycle), 1);
        assert_eq!(diagnostics.count_category(DiagnosticCategory::Structural), 0);
        assert!(diagnostics.has_errors());
    }
}
