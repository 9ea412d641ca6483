//! Instruction representation for the layout engine.
//!
//! An [`Instruction`] is an opcode, its register operands and at most one typed [`Operand`].
//! Branches, switch tables and exception handlers refer to other instructions by [`InstrId`],
//! a handle that stays valid while instructions are inserted, removed or re-routed. Byte
//! offsets only exist after the owning [`crate::dex::MethodBody`] has been finalized.
//!
//! # Thread Safety
//!
//! All types here are plain data and are [`Send`] and [`Sync`]. Mutation goes through the
//! owning method body, which requires exclusive access.

use std::fmt;

use crate::{
    dex::{ArrayData, OpCode, PackedSwitchData, Register, SparseSwitchData},
    model::{FieldReference, MethodReference, TypeReference},
};

/// Stable handle of an instruction within its method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(u32);

impl InstrId {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        InstrId(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The typed operand of an instruction.
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand
    None,
    /// Literal value; floating point constants are passed as raw bits
    Literal(i64),
    /// Branch target
    Target(InstrId),
    /// String constant
    String(String),
    /// Type constant
    Type(TypeReference),
    /// Field reference
    Field(FieldReference),
    /// Method reference
    Method(MethodReference),
    /// Packed switch table
    PackedSwitch(PackedSwitchData),
    /// Sparse switch table
    SparseSwitch(SparseSwitchData),
    /// Constant array
    ArrayData(ArrayData),
}

impl Operand {
    /// Every instruction this operand refers to, in table order.
    #[must_use]
    pub fn targets(&self) -> Vec<InstrId> {
        match self {
            Operand::Target(target) => vec![*target],
            Operand::PackedSwitch(data) => data.targets.clone(),
            Operand::SparseSwitch(data) => data.targets.values().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Replaces every reference to `old` with `new`. Returns the number of replaced entries.
    pub(crate) fn retarget(&mut self, old: InstrId, new: InstrId) -> usize {
        let mut replaced = 0;
        let mut swap = |target: &mut InstrId| {
            if *target == old {
                *target = new;
                replaced += 1;
            }
        };
        match self {
            Operand::Target(target) => swap(target),
            Operand::PackedSwitch(data) => data.targets.iter_mut().for_each(&mut swap),
            Operand::SparseSwitch(data) => data.targets.values_mut().for_each(&mut swap),
            _ => {}
        }
        replaced
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Literal(value) => write!(f, "#{value}"),
            Operand::Target(target) => write!(f, "{target}"),
            Operand::String(value) => write!(f, "{value:?}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Field(field) => write!(f, "{}", field.full_name()),
            Operand::Method(method) => write!(f, "{method}"),
            Operand::PackedSwitch(data) => {
                write!(f, "packed[{}..{}]", data.first_key, data.targets.len())
            }
            Operand::SparseSwitch(data) => write!(f, "sparse[{}]", data.targets.len()),
            Operand::ArrayData(data) => {
                write!(f, "array[{} x {}]", data.values.len(), data.element_size)
            }
        }
    }
}

/// A Dalvik instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    id: InstrId,
    opcode: OpCode,
    registers: Vec<Register>,
    operand: Operand,
    offset: u32,
}

impl Instruction {
    pub(crate) fn new(
        id: InstrId,
        opcode: OpCode,
        registers: Vec<Register>,
        operand: Operand,
    ) -> Self {
        Instruction {
            id,
            opcode,
            registers,
            operand,
            offset: 0,
        }
    }

    /// Stable handle of this instruction.
    #[must_use]
    pub fn id(&self) -> InstrId {
        self.id
    }

    /// The opcode.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Register operands, in encoding order.
    #[must_use]
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// The typed operand.
    #[must_use]
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Length in code units, excluding any payload.
    #[must_use]
    pub fn code_units(&self) -> u32 {
        self.opcode.code_units()
    }

    /// Offset in code units as of the last finalization. Read it through
    /// [`crate::dex::MethodBody::offset_of`], which checks that the body is finalized.
    pub(crate) fn offset(&self) -> u32 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub(crate) fn set_opcode(&mut self, opcode: OpCode) {
        self.opcode = opcode;
    }

    pub(crate) fn set_registers(&mut self, registers: Vec<Register>) {
        self.registers = registers;
    }

    pub(crate) fn set_operand(&mut self, operand: Operand) {
        self.operand = operand;
    }

    pub(crate) fn operand_mut(&mut self) -> &mut Operand {
        &mut self.operand
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.opcode)?;
        let mut first = true;
        for register in &self.registers {
            write!(f, "{}{register}", if first { " " } else { ", " })?;
            first = false;
        }
        if !matches!(self.operand, Operand::None) {
            write!(f, "{}{}", if first { " " } else { ", " }, self.operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ins = Instruction::new(
            InstrId::from_raw(3),
            OpCode::IfEqz,
            vec![Register::new(0)],
            Operand::Target(InstrId::from_raw(7)),
        );
        assert_eq!(ins.to_string(), "#3 if-eqz v0, #7");

        let ret = Instruction::new(InstrId::from_raw(0), OpCode::ReturnVoid, vec![], Operand::None);
        assert_eq!(ret.to_string(), "#0 return-void");

        let lit = Instruction::new(
            InstrId::from_raw(1),
            OpCode::Const4,
            vec![Register::new(1)],
            Operand::Literal(-1),
        );
        assert_eq!(lit.to_string(), "#1 const/4 v1, #-1");
    }

    #[test]
    fn test_retarget() {
        let a = InstrId::from_raw(1);
        let b = InstrId::from_raw(2);
        let mut packed = Operand::PackedSwitch(PackedSwitchData::new(0, vec![a, b, a]));
        assert_eq!(packed.retarget(a, b), 2);
        assert_eq!(packed.targets(), vec![b, b, b]);

        let mut sparse = Operand::SparseSwitch(SparseSwitchData::new([(5, a)]));
        assert_eq!(sparse.retarget(a, b), 1);
        assert_eq!(sparse.targets(), vec![b]);

        let mut literal = Operand::Literal(1);
        assert_eq!(literal.retarget(a, b), 0);
    }
}
