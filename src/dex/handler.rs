//! Exception handler ranges.

use crate::{dex::InstrId, model::TypeReference};

/// A typed catch clause.
#[derive(Debug, Clone)]
pub struct Catch {
    /// Exception type caught by this clause
    pub exception_type: TypeReference,
    /// First instruction of the handler code
    pub instruction: InstrId,
}

impl Catch {
    /// Creates a catch clause.
    #[must_use]
    pub fn new(exception_type: TypeReference, instruction: InstrId) -> Self {
        Catch {
            exception_type,
            instruction,
        }
    }
}

/// A protected range with its handlers.
///
/// The range covers `try_start..=try_end`; both boundaries are inclusive.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// First protected instruction
    pub try_start: InstrId,
    /// Last protected instruction
    pub try_end: InstrId,
    /// Typed catch clauses, in match order
    pub catches: Vec<Catch>,
    /// Handler for any exception not caught by a typed clause
    pub catch_all: Option<InstrId>,
}

impl ExceptionHandler {
    /// Creates a handler for the range `try_start..=try_end` without clauses.
    #[must_use]
    pub fn new(try_start: InstrId, try_end: InstrId) -> Self {
        ExceptionHandler {
            try_start,
            try_end,
            catches: Vec::new(),
            catch_all: None,
        }
    }

    /// Adds a typed catch clause.
    #[must_use]
    pub fn with_catch(mut self, exception_type: TypeReference, instruction: InstrId) -> Self {
        self.catches.push(Catch::new(exception_type, instruction));
        self
    }

    /// Sets the catch-all handler.
    #[must_use]
    pub fn with_catch_all(mut self, instruction: InstrId) -> Self {
        self.catch_all = Some(instruction);
        self
    }

    /// Every instruction this handler refers to: range boundaries, catch targets and the
    /// catch-all.
    pub fn references(&self) -> impl Iterator<Item = InstrId> + '_ {
        [self.try_start, self.try_end]
            .into_iter()
            .chain(self.catches.iter().map(|c| c.instruction))
            .chain(self.catch_all)
    }
}
