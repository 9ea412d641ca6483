//! Non-fatal issues found while shaking and compiling.
//!
//! Most problems the back end runs into are local: a root name that matches nothing, an
//! include condition that does not resolve, a method using a construct the target cannot
//! express. None of them should stop the run. They are recorded here and compilation goes on
//! with the next member.
//!
//! Entries live in an append-only `boxcar::Vec`, so rayon workers report without taking a
//! lock. Reading is consistent with every push that happened before the read started.
//!
//! # Examples
//!
//! ```rust
//! use dotdex::diagnostics::{DiagnosticCategory, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.info(DiagnosticCategory::Configuration, "root 'App.Missing' matched nothing");
//! diagnostics.warning(DiagnosticCategory::Unsupported, "App.Foo::Bar uses a function pointer");
//!
//! assert_eq!(diagnostics.count(), 2);
//! assert!(!diagnostics.has_errors());
//! print!("{diagnostics}");
//! ```

use std::fmt;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::model::Token;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum DiagnosticSeverity {
    /// Nothing is wrong with the output
    #[strum(serialize = "info")]
    Info,
    /// A member was skipped; the output is valid but may lack it
    #[strum(serialize = "warning")]
    Warning,
    /// A member failed to compile and is missing from the output
    #[strum(serialize = "error")]
    Error,
}

/// The concern a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticCategory {
    /// A reference could not be bound to a definition
    Resolution,
    /// An instruction stream or handler table was inconsistent
    Structural,
    /// A source construct has no target equivalent
    Unsupported,
    /// Root selection and propagation
    Reachability,
    /// Root names, include rules and other caller input
    Configuration,
    /// A method body handed over in a state the operation does not accept
    Lifecycle,
}

/// One recorded issue.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// How bad it is
    pub severity: DiagnosticSeverity,
    /// Which concern reported it
    pub category: DiagnosticCategory,
    /// Description
    pub message: String,
    /// Definition the issue belongs to
    pub token: Option<Token>,
    /// Code-unit offset of the offending instruction
    pub offset: Option<u32>,
}

impl Diagnostic {
    /// Creates an entry without location.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity,
            category,
            message: message.into(),
            token: None,
            offset: None,
        }
    }

    /// Ties the entry to a definition.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Points the entry at an instruction.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.category)?;
        match (self.token, self.offset) {
            (Some(token), Some(offset)) => write!(f, " {token}+0x{offset:04x}")?,
            (Some(token), None) => write!(f, " {token}")?,
            (None, Some(offset)) => write!(f, " +0x{offset:04x}")?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Shared sink for [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an informational entry.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Records a warning.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Warning, category, message));
    }

    /// Records an error.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Error, category, message));
    }

    /// Records a prepared entry.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// True if anything was recorded.
    pub fn has_any(&self) -> bool {
        self.count() > 0
    }

    /// True if at least one error was recorded.
    pub fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Number of entries of one severity.
    pub fn count_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.iter().filter(|d| d.severity == severity).count()
    }

    /// Number of entries of one category.
    pub fn count_category(&self, category: DiagnosticCategory) -> usize {
        self.iter().filter(|d| d.category == category).count()
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Error)
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Warning)
    }

    /// Number of informational entries.
    pub fn info_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Info)
    }

    /// Entries in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Entries of one category, in recording order.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Entries tied to one definition, in recording order.
    pub fn for_token(&self, token: Token) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.token == Some(token)).collect()
    }

    /// One line of counts per category with entries, most severe first.
    ///
    /// ```text
    /// 3 diagnostics: 1 error, 1 warning, 1 info
    ///   Structural: 1 error
    ///   Unsupported: 1 warning
    ///   Configuration: 1 info
    /// ```
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} diagnostics: {} error, {} warning, {} info",
            self.count(),
            self.error_count(),
            self.warning_count(),
            self.info_count()
        )];

        let mut rows: Vec<(DiagnosticSeverity, DiagnosticCategory, usize)> = Vec::new();
        for category in DiagnosticCategory::iter() {
            for severity in DiagnosticSeverity::iter() {
                let count = self
                    .iter()
                    .filter(|d| d.category == category && d.severity == severity)
                    .count();
                if count > 0 {
                    rows.push((severity, category, count));
                }
            }
        }
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        lines.extend(
            rows.into_iter()
                .map(|(severity, category, count)| format!("  {category}: {count} {severity}")),
        );
        lines.join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for entry in self.iter().filter(|d| d.severity > DiagnosticSeverity::Info) {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
