//! Method bodies and offset layout.
//!
//! A [`MethodBody`] owns the instruction list, the register frame size and the exception
//! handlers of one method. It moves through four states:
//!
//! 1. [`BodyState::Created`] - registers sized, nothing appended yet
//! 2. [`BodyState::Populated`] - instructions and handlers appended or edited
//! 3. [`BodyState::Finalized`] - offsets computed by [`MethodBody::update_instruction_offsets`]
//! 4. [`BodyState::Serialized`] - encoded; no further edits
//!
//! Any edit of a finalized body drops it back to `Populated`, which invalidates the offsets
//! until the next finalization.

use strum::{Display, IntoStaticStr};

use crate::{
    dex::{
        align_even, payload_units, ExceptionHandler, InstrId, Instruction, OpCode, Operand,
        Register,
    },
    Error, Result,
};

/// Lifecycle state of a [`MethodBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum BodyState {
    /// Registers sized, no instructions yet
    Created,
    /// Instructions or handlers changed since the last finalization
    Populated,
    /// Offsets are valid
    Finalized,
    /// Encoded; the body is read-only
    Serialized,
}

/// Result of an offset computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OffsetStatistics {
    /// Code units taken by the instructions themselves
    pub code_units: u32,
    /// Code units taken by the trailing payload blocks
    pub extra_code_units: u32,
}

impl OffsetStatistics {
    /// Instruction units plus payload units.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.code_units + self.extra_code_units
    }

    /// Offset of the first payload block.
    ///
    /// Payload blocks must start 4-byte aligned, so when there is any payload the origin is
    /// the instruction length rounded up to an even unit count.
    #[must_use]
    pub fn payload_start(&self) -> u32 {
        if self.extra_code_units > 0 {
            align_even(self.code_units)
        } else {
            self.code_units
        }
    }

    /// Length of the encoded code-unit stream including the alignment pad.
    #[must_use]
    pub fn encoded_units(&self) -> u32 {
        self.payload_start() + self.extra_code_units
    }
}

/// Instruction list, register frame and exception handlers of one method.
///
/// # Examples
///
/// ```rust
/// use dotdex::dex::{MethodBody, OpCode, Operand, PackedSwitchData, Register};
///
/// let mut body = MethodBody::new(2);
/// let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
/// body.insert_before(
///     ret,
///     OpCode::PackedSwitch,
///     vec![Register::new(0)],
///     Operand::PackedSwitch(PackedSwitchData::new(0, vec![ret, ret])),
/// )?;
///
/// let stats = body.update_instruction_offsets()?;
/// assert_eq!(stats.code_units, 4);
/// assert_eq!(stats.extra_code_units, 8);
/// assert_eq!(body.offset_of(ret)?, 3);
/// # Ok::<(), dotdex::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MethodBody {
    registers: u16,
    incoming: u16,
    outgoing: u16,
    instructions: Vec<Instruction>,
    handlers: Vec<ExceptionHandler>,
    next_id: u32,
    state: BodyState,
    statistics: Option<OffsetStatistics>,
}

impl MethodBody {
    /// Creates an empty body with a frame of `registers` registers.
    #[must_use]
    pub fn new(registers: u16) -> Self {
        MethodBody {
            registers,
            incoming: 0,
            outgoing: 0,
            instructions: Vec::new(),
            handlers: Vec::new(),
            next_id: 0,
            state: BodyState::Created,
            statistics: None,
        }
    }

    /// Sets the number of incoming argument registers and the largest outgoing argument
    /// count of any call in the body.
    #[must_use]
    pub fn with_arguments(mut self, incoming: u16, outgoing: u16) -> Self {
        self.incoming = incoming;
        self.outgoing = outgoing;
        self
    }

    /// Size of the register frame.
    #[must_use]
    pub fn registers_size(&self) -> u16 {
        self.registers
    }

    /// Number of registers holding incoming arguments. They are the last ones of the frame.
    #[must_use]
    pub fn incoming_arguments(&self) -> u16 {
        self.incoming
    }

    /// Largest number of argument words passed by any call in the body.
    #[must_use]
    pub fn outgoing_arguments(&self) -> u16 {
        self.outgoing
    }

    /// True if the register holds an incoming argument.
    #[must_use]
    pub fn is_incoming(&self, register: Register) -> bool {
        u32::from(register.index()) + u32::from(self.incoming) >= u32::from(self.registers)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BodyState {
        self.state
    }

    /// The instructions in layout order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the body has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Exception handlers in declaration order.
    #[must_use]
    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.handlers
    }

    /// Looks up an instruction by handle.
    #[must_use]
    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.iter().find(|ins| ins.id() == id)
    }

    /// Index of an instruction in the list.
    #[must_use]
    pub fn position(&self, id: InstrId) -> Option<usize> {
        self.instructions.iter().position(|ins| ins.id() == id)
    }

    /// Appends an instruction and returns its handle.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] if the body is serialized.
    pub fn push(
        &mut self,
        opcode: OpCode,
        registers: Vec<Register>,
        operand: Operand,
    ) -> Result<InstrId> {
        self.touch()?;
        let id = self.allocate();
        self.instructions
            .push(Instruction::new(id, opcode, registers, operand));
        Ok(id)
    }

    /// Inserts an instruction in front of `anchor` and returns its handle.
    ///
    /// Nothing that targets `anchor` is redirected; use [`crate::dex::BranchReRouter`] for that.
    ///
    /// # Errors
    /// Returns [`Error::InstructionNotFound`] if `anchor` is not in the body, or
    /// [`Error::InvalidState`] if the body is serialized.
    pub fn insert_before(
        &mut self,
        anchor: InstrId,
        opcode: OpCode,
        registers: Vec<Register>,
        operand: Operand,
    ) -> Result<InstrId> {
        let index = self
            .position(anchor)
            .ok_or(Error::InstructionNotFound(anchor))?;
        self.touch()?;
        let id = self.allocate();
        self.instructions
            .insert(index, Instruction::new(id, opcode, registers, operand));
        Ok(id)
    }

    /// Replaces opcode, registers and operand of an instruction, keeping its handle.
    ///
    /// # Errors
    /// Returns [`Error::InstructionNotFound`] or [`Error::InvalidState`].
    pub fn replace(
        &mut self,
        id: InstrId,
        opcode: OpCode,
        registers: Vec<Register>,
        operand: Operand,
    ) -> Result<()> {
        let index = self.position(id).ok_or(Error::InstructionNotFound(id))?;
        self.touch()?;
        let ins = &mut self.instructions[index];
        ins.set_opcode(opcode);
        ins.set_registers(registers);
        ins.set_operand(operand);
        Ok(())
    }

    /// Removes an instruction and returns it.
    ///
    /// References to the removed instruction are left dangling and reported by
    /// [`MethodBody::validate`]; re-route them first.
    ///
    /// # Errors
    /// Returns [`Error::InstructionNotFound`] or [`Error::InvalidState`].
    pub fn remove(&mut self, id: InstrId) -> Result<Instruction> {
        let index = self.position(id).ok_or(Error::InstructionNotFound(id))?;
        self.touch()?;
        Ok(self.instructions.remove(index))
    }

    /// Adds an exception handler.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] if the body is serialized.
    pub fn add_handler(&mut self, handler: ExceptionHandler) -> Result<()> {
        self.touch()?;
        self.handlers.push(handler);
        Ok(())
    }

    /// Checks that every branch, switch and handler reference points into the body and that
    /// every register lies inside the frame.
    ///
    /// # Errors
    /// Returns [`Error::Structural`] for a bad instruction, [`Error::InstructionNotFound`] for a
    /// dangling handler reference.
    pub fn validate(&self) -> Result<()> {
        for ins in &self.instructions {
            for target in ins.operand().targets() {
                if self.position(target).is_none() {
                    return Err(structural_error!(ins, "target {} is not part of the body", target));
                }
            }
            for register in ins.registers() {
                let last = u32::from(register.index()) + register.slots() - 1;
                if last >= u32::from(self.registers) {
                    return Err(structural_error!(
                        ins,
                        "register {} outside of frame of {} registers",
                        register,
                        self.registers
                    ));
                }
            }
        }

        for handler in &self.handlers {
            if let Some(missing) = handler.references().find(|id| self.position(*id).is_none()) {
                return Err(Error::InstructionNotFound(missing));
            }
            if self.position(handler.try_start) > self.position(handler.try_end) {
                return Err(Error::Error(format!(
                    "handler range {}..{} is reversed",
                    handler.try_start, handler.try_end
                )));
            }
        }
        Ok(())
    }

    /// Assigns every instruction its offset in code units and sizes the payload area.
    ///
    /// Each instruction is laid out with the fixed length of its format. `packed-switch`,
    /// `sparse-switch` and `fill-array-data` additionally reserve a payload block after the
    /// last instruction; blocks follow in instruction order, each rounded to an even length.
    ///
    /// A serialized body is not laid out again; its stored statistics are returned.
    ///
    /// # Errors
    /// Returns [`Error::Structural`] if a payload instruction carries the wrong operand or
    /// unusable array data. The body then stays unfinalized.
    pub fn update_instruction_offsets(&mut self) -> Result<OffsetStatistics> {
        if self.state == BodyState::Serialized {
            return self.statistics();
        }

        let mut ip = 0u32;
        let mut extra = 0u32;
        for ins in &mut self.instructions {
            ins.set_offset(ip);
            ip += ins.code_units();
            if let Some(units) = payload_units(ins)? {
                extra += units;
            }
        }

        let stats = OffsetStatistics {
            code_units: ip,
            extra_code_units: extra,
        };
        tracing::trace!(
            "laid out {} instructions: {} code units, {} payload units",
            self.instructions.len(),
            stats.code_units,
            stats.extra_code_units
        );
        self.statistics = Some(stats);
        self.state = BodyState::Finalized;
        Ok(stats)
    }

    /// Statistics of the last finalization.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] unless the body is finalized or serialized.
    pub fn statistics(&self) -> Result<OffsetStatistics> {
        self.require_offsets()?;
        self.statistics.ok_or(Error::InvalidState {
            expected: BodyState::Finalized.into(),
            actual: self.state.into(),
        })
    }

    /// Offset of an instruction in code units.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] unless the body is finalized or serialized, and
    /// [`Error::InstructionNotFound`] for an unknown handle.
    pub fn offset_of(&self, id: InstrId) -> Result<u32> {
        self.require_offsets()?;
        self.instruction(id)
            .map(Instruction::offset)
            .ok_or(Error::InstructionNotFound(id))
    }

    /// Gives the re-router access to instructions and handlers. Counts as an edit.
    pub(crate) fn parts_mut(&mut self) -> Result<(&mut [Instruction], &mut [ExceptionHandler])> {
        self.touch()?;
        Ok((&mut self.instructions, &mut self.handlers))
    }

    pub(crate) fn mark_serialized(&mut self) -> Result<()> {
        self.require_offsets()?;
        self.state = BodyState::Serialized;
        Ok(())
    }

    fn require_offsets(&self) -> Result<()> {
        match self.state {
            BodyState::Finalized | BodyState::Serialized => Ok(()),
            actual => Err(Error::InvalidState {
                expected: BodyState::Finalized.into(),
                actual: actual.into(),
            }),
        }
    }

    fn touch(&mut self) -> Result<()> {
        if self.state == BodyState::Serialized {
            return Err(Error::InvalidState {
                expected: BodyState::Populated.into(),
                actual: self.state.into(),
            });
        }
        self.state = BodyState::Populated;
        self.statistics = None;
        Ok(())
    }

    fn allocate(&mut self) -> InstrId {
        let id = InstrId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }
}
