//! Branch re-routing.
//!
//! Optimizations that replace or remove an instruction first move every reference to it onto
//! another instruction. [`BranchReRouter`] does that in one step for branches, switch tables
//! and exception handler boundaries.

use crate::{
    dex::{InstrId, MethodBody},
    Error, Result,
};

/// Redirects references from one instruction to another.
///
/// # Examples
///
/// ```rust
/// use dotdex::dex::{BranchReRouter, MethodBody, OpCode, Operand, Register};
///
/// let mut body = MethodBody::new(1);
/// let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
/// let branch = body.insert_before(ret, OpCode::IfNez, vec![Register::new(0)], Operand::Target(ret))?;
/// let other = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
///
/// BranchReRouter::new(&mut body).reroute(ret, other)?;
/// assert_eq!(body.instruction(branch).unwrap().operand().targets(), vec![other]);
/// # Ok::<(), dotdex::Error>(())
/// ```
pub struct BranchReRouter<'a> {
    body: &'a mut MethodBody,
}

impl<'a> BranchReRouter<'a> {
    /// Creates a re-router for a body.
    pub fn new(body: &'a mut MethodBody) -> Self {
        BranchReRouter { body }
    }

    /// Moves every reference to `old` onto `new` and returns how many were changed.
    ///
    /// Branch operands, packed and sparse switch entries, catch targets, catch-all targets
    /// and `try_start` boundaries move to `new`. A `try_end` boundary moves to the instruction
    /// preceding `old` instead, so the protected range does not grow over the new target. If
    /// `old` is the first instruction, `try_end` moves to `new` as well.
    ///
    /// # Errors
    /// Returns [`Error::InstructionNotFound`] if either instruction is not in the body and
    /// [`Error::InvalidState`] for a serialized body. Nothing is changed on error.
    pub fn reroute(&mut self, old: InstrId, new: InstrId) -> Result<usize> {
        let position = self
            .body
            .position(old)
            .ok_or(Error::InstructionNotFound(old))?;
        if self.body.position(new).is_none() {
            return Err(Error::InstructionNotFound(new));
        }
        let before_old = match position {
            0 => new,
            _ => self.body.instructions()[position - 1].id(),
        };

        let (instructions, handlers) = self.body.parts_mut()?;
        let mut changed = 0;
        for ins in instructions.iter_mut() {
            changed += ins.operand_mut().retarget(old, new);
        }

        for handler in handlers.iter_mut() {
            if handler.try_start == old {
                handler.try_start = new;
                changed += 1;
            }
            if handler.try_end == old {
                handler.try_end = before_old;
                changed += 1;
            }
            if handler.catch_all == Some(old) {
                handler.catch_all = Some(new);
                changed += 1;
            }
            for catch in &mut handler.catches {
                if catch.instruction == old {
                    catch.instruction = new;
                    changed += 1;
                }
            }
        }

        tracing::trace!("re-routed {changed} references from {old} to {new}");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dex::{ExceptionHandler, OpCode, Operand, PackedSwitchData, Register, SparseSwitchData},
        model::{TypeOrigin, TypeReference},
    };

    #[test]
    fn test_reroute_branch_and_try_end() {
        // [A, B, C] with A branching to C and a handler covering A..=C
        let mut body = MethodBody::new(1);
        let a = body
            .push(OpCode::IfEqz, vec![Register::new(0)], Operand::None)
            .unwrap();
        let b = body.push(OpCode::Nop, vec![], Operand::None).unwrap();
        let c = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
        body.replace(a, OpCode::IfEqz, vec![Register::new(0)], Operand::Target(c))
            .unwrap();
        body.add_handler(ExceptionHandler::new(a, c)).unwrap();
        let c_prime = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();

        let changed = BranchReRouter::new(&mut body).reroute(c, c_prime).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(body.instruction(a).unwrap().operand().targets(), vec![c_prime]);
        assert_eq!(body.handlers()[0].try_start, a);
        assert_eq!(body.handlers()[0].try_end, b);
        body.validate().unwrap();
    }

    #[test]
    fn test_reroute_tables_and_handlers() {
        let exception = TypeReference::named("System", "Exception", TypeOrigin::Native);
        let mut body = MethodBody::new(1);
        let first = body.push(OpCode::Nop, vec![], Operand::None).unwrap();
        let target = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
        let new = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
        body.insert_before(
            target,
            OpCode::PackedSwitch,
            vec![Register::new(0)],
            Operand::PackedSwitch(PackedSwitchData::new(0, vec![target, first, target])),
        )
        .unwrap();
        body.insert_before(
            target,
            OpCode::SparseSwitch,
            vec![Register::new(0)],
            Operand::SparseSwitch(SparseSwitchData::new([(9, target)])),
        )
        .unwrap();
        body.add_handler(
            ExceptionHandler::new(first, first)
                .with_catch(exception, target)
                .with_catch_all(target),
        )
        .unwrap();

        let changed = BranchReRouter::new(&mut body).reroute(target, new).unwrap();
        assert_eq!(changed, 5);
        let handler = &body.handlers()[0];
        assert_eq!(handler.catches[0].instruction, new);
        assert_eq!(handler.catch_all, Some(new));
        assert!(body
            .instructions()
            .iter()
            .flat_map(|ins| ins.operand().targets())
            .all(|t| t != target));
    }

    #[test]
    fn test_reroute_first_instruction() {
        let mut body = MethodBody::new(1);
        let first = body.push(OpCode::Nop, vec![], Operand::None).unwrap();
        let last = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
        body.add_handler(ExceptionHandler::new(first, first)).unwrap();

        BranchReRouter::new(&mut body).reroute(first, last).unwrap();
        assert_eq!(body.handlers()[0].try_start, last);
        assert_eq!(body.handlers()[0].try_end, last);
    }

    #[test]
    fn test_reroute_unknown() {
        let mut body = MethodBody::new(1);
        let only = body.push(OpCode::ReturnVoid, vec![], Operand::None).unwrap();
        body.update_instruction_offsets().unwrap();

        let missing = InstrId::from_raw(42);
        assert!(matches!(
            BranchReRouter::new(&mut body).reroute(only, missing),
            Err(Error::InstructionNotFound(id)) if id == missing
        ));
        // Failed calls leave the body finalized
        assert!(body.offset_of(only).is_ok());
    }
}
