//! Code-unit encoding.
//!
//! [`InstructionWriter`] turns a [`MethodBody`] into the `insns` array of a Dalvik code item:
//! the instructions in layout order, an optional `nop` pad, then the payload blocks. Constant
//! pool indices come from an [`IndexResolver`]; [`IndexPool`] is a ready-made resolver that
//! hands out indices in first-seen order.
//!
//! # Encoding
//!
//! Every instruction is written in the shape of its [`InstructionFormat`]. Register indices
//! are checked against the width of their slot (4, 8 or 16 bits), literals against the width
//! of their field. Branch and payload offsets are relative to the referencing instruction.
//!
//! # Thread Safety
//!
//! [`IndexPool`] is [`Send`] and [`Sync`] and can be shared by writers running in parallel.
//! Indices stay unique under concurrent interning, but their order then depends on scheduling.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::{
    dex::{
        argument_words, is_consecutive, payload_units, ArrayData, BodyState, InstrId, Instruction, InstructionFormat,
        MethodBody, OpCode, Operand, PackedSwitchData, RegisterFlags, SparseSwitchData,
        ARRAY_DATA_IDENT, PACKED_SWITCH_IDENT, SPARSE_SWITCH_IDENT,
    },
    model::{FieldReference, MethodReference, TypeReference},
    Error, Result,
};

/// Supplies constant pool indices for instruction operands.
pub trait IndexResolver {
    /// Index of a string constant.
    fn string_index(&self, value: &str) -> Option<u32>;
    /// Index of a type.
    fn type_index(&self, ty: &TypeReference) -> Option<u32>;
    /// Index of a field.
    fn field_index(&self, field: &FieldReference) -> Option<u32>;
    /// Index of a method.
    fn method_index(&self, method: &MethodReference) -> Option<u32>;
}

#[derive(Debug, Default)]
struct Pool {
    entries: DashMap<String, u32>,
    next: AtomicU32,
}

impl Pool {
    fn intern(&self, key: String) -> u32 {
        *self
            .entries
            .entry(key)
            .or_insert_with(|| self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(|entry| *entry)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Constant pool that assigns indices in first-seen order.
///
/// Types are keyed by full name, fields and methods by their full signature. Lookups through
/// [`IndexResolver`] never intern; an operand that was not collected has no index.
#[derive(Debug, Default)]
pub struct IndexPool {
    strings: Pool,
    types: Pool,
    fields: Pool,
    methods: Pool,
}

impl IndexPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string.
    pub fn intern_string(&self, value: &str) -> u32 {
        self.strings.intern(value.to_string())
    }

    /// Interns a type.
    pub fn intern_type(&self, ty: &TypeReference) -> u32 {
        self.types.intern(ty.full_name())
    }

    /// Interns a field.
    pub fn intern_field(&self, field: &FieldReference) -> u32 {
        self.fields.intern(field.full_name())
    }

    /// Interns a method.
    pub fn intern_method(&self, method: &MethodReference) -> u32 {
        self.methods.intern(method.full_name())
    }

    /// Interns every constant the instructions of a body refer to, in instruction order.
    pub fn collect(&self, body: &MethodBody) {
        for ins in body.instructions() {
            match ins.operand() {
                Operand::String(value) => {
                    self.intern_string(value);
                }
                Operand::Type(ty) => {
                    self.intern_type(ty);
                }
                Operand::Field(field) => {
                    self.intern_field(field);
                }
                Operand::Method(method) => {
                    self.intern_method(method);
                }
                _ => {}
            }
        }
    }

    /// Number of interned strings.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Number of interned types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of interned fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of interned methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

impl IndexResolver for IndexPool {
    fn string_index(&self, value: &str) -> Option<u32> {
        self.strings.get(value)
    }

    fn type_index(&self, ty: &TypeReference) -> Option<u32> {
        self.types.get(&ty.full_name())
    }

    fn field_index(&self, field: &FieldReference) -> Option<u32> {
        self.fields.get(&field.full_name())
    }

    fn method_index(&self, method: &MethodReference) -> Option<u32> {
        self.methods.get(&method.full_name())
    }
}

/// Constant pool an opcode indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolKind {
    String,
    Type,
    Field,
    Method,
}

impl PoolKind {
    fn of(opcode: OpCode) -> Option<Self> {
        match opcode {
            OpCode::ConstString | OpCode::ConstStringJumbo => Some(PoolKind::String),
            OpCode::ConstClass
            | OpCode::CheckCast
            | OpCode::InstanceOf
            | OpCode::NewInstance
            | OpCode::NewArray
            | OpCode::FilledNewArray
            | OpCode::FilledNewArrayRange => Some(PoolKind::Type),
            op if (0x52..=0x6d).contains(&op.value()) => Some(PoolKind::Field),
            op if op.is_invoke() => Some(PoolKind::Method),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PoolKind::String => "string",
            PoolKind::Type => "type",
            PoolKind::Field => "field",
            PoolKind::Method => "method",
        }
    }
}

/// Number of register operands a format takes; `None` for the variable invoke forms.
fn register_count(format: InstructionFormat) -> Option<usize> {
    match format {
        InstructionFormat::F10x
        | InstructionFormat::F10t
        | InstructionFormat::F20t
        | InstructionFormat::F30t => Some(0),
        InstructionFormat::F11n
        | InstructionFormat::F11x
        | InstructionFormat::F21t
        | InstructionFormat::F21s
        | InstructionFormat::F21h
        | InstructionFormat::F21c
        | InstructionFormat::F31t
        | InstructionFormat::F31i
        | InstructionFormat::F31c
        | InstructionFormat::F51l => Some(1),
        InstructionFormat::F12x
        | InstructionFormat::F22x
        | InstructionFormat::F22b
        | InstructionFormat::F22t
        | InstructionFormat::F22s
        | InstructionFormat::F22c
        | InstructionFormat::F32x => Some(2),
        InstructionFormat::F23x => Some(3),
        InstructionFormat::F35c | InstructionFormat::F3rc => None,
    }
}

fn lo(value: u32) -> u16 {
    (value & 0xFFFF) as u16
}

fn hi(value: u32) -> u16 {
    (value >> 16) as u16
}

/// Encodes method bodies into code units.
///
/// # Examples
///
/// ```rust
/// use dotdex::dex::{IndexPool, InstructionWriter, MethodBody, OpCode, Operand, Register};
///
/// let mut body = MethodBody::new(1);
/// body.push(OpCode::ConstString, vec![Register::new(0)], Operand::String("hi".into()))?;
/// body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
///
/// let pool = IndexPool::new();
/// pool.collect(&body);
/// let codes = InstructionWriter::new(&pool).write(&mut body)?;
/// assert_eq!(codes, vec![0x001a, 0x0000, 0x000e]);
/// # Ok::<(), dotdex::Error>(())
/// ```
pub struct InstructionWriter<'r, R: IndexResolver + ?Sized> {
    resolver: &'r R,
}

impl<'r, R: IndexResolver + ?Sized> InstructionWriter<'r, R> {
    /// Creates a writer resolving indices through `resolver`.
    pub fn new(resolver: &'r R) -> Self {
        InstructionWriter { resolver }
    }

    /// Lays out and encodes a body, then marks it serialized.
    ///
    /// The result holds the instructions, a `nop` pad if the payload area needs alignment,
    /// and the payload blocks in instruction order.
    ///
    /// # Errors
    /// Returns [`Error::Structural`] for malformed instructions (bad operand, register or
    /// literal out of range, dangling target), [`Error::IndexMissing`] if the resolver has no
    /// index for an operand, and [`Error::InvalidState`] for an already serialized body.
    pub fn write(&self, body: &mut MethodBody) -> Result<Vec<u16>> {
        if body.state() == BodyState::Serialized {
            return Err(Error::InvalidState {
                expected: BodyState::Finalized.into(),
                actual: body.state().into(),
            });
        }
        body.validate()?;
        let stats = body.update_instruction_offsets()?;

        let mut codes = vec![u16::from(OpCode::Nop.value()); stats.encoded_units() as usize];
        let mut payload_at = stats.payload_start();
        {
            let body: &MethodBody = body;
            for ins in body.instructions() {
                let payload = match payload_units(ins)? {
                    Some(units) => {
                        let at = payload_at;
                        payload_at += units;
                        Some(at)
                    }
                    None => None,
                };

                let units = self.encode(body, ins, payload)?;
                debug_assert_eq!(units.len() as u32, ins.code_units());
                let ip = ins.offset() as usize;
                codes[ip..ip + units.len()].copy_from_slice(&units);

                if let Some(at) = payload {
                    let block = encode_payload(body, ins)?;
                    let at = at as usize;
                    codes[at..at + block.len()].copy_from_slice(&block);
                }
            }
        }

        body.mark_serialized()?;
        tracing::trace!("encoded {} code units", codes.len());
        Ok(codes)
    }

    fn encode(&self, body: &MethodBody, ins: &Instruction, payload: Option<u32>) -> Result<Vec<u16>> {
        let op = u16::from(ins.opcode().value());
        let format = ins.opcode().format();

        if let Some(expected) = register_count(format) {
            if ins.registers().len() != expected {
                return Err(structural_error!(
                    ins,
                    "format {} takes {} registers, got {}",
                    format,
                    expected,
                    ins.registers().len()
                ));
            }
        }

        let units = match format {
            InstructionFormat::F10x => vec![op],
            InstructionFormat::F12x => {
                let a = reg(ins, 0, RegisterFlags::BITS4)?;
                let b = reg(ins, 1, RegisterFlags::BITS4)?;
                vec![op | a << 8 | b << 12]
            }
            InstructionFormat::F11n => {
                let a = reg(ins, 0, RegisterFlags::BITS4)?;
                let literal = signed(ins, literal(ins)?, 4)?;
                vec![op | a << 8 | ((literal as u16) & 0xF) << 12]
            }
            InstructionFormat::F11x => vec![op | reg(ins, 0, RegisterFlags::BITS8)? << 8],
            InstructionFormat::F10t => {
                let offset = signed(ins, branch(body, ins)?, 8)?;
                vec![op | ((offset as u16) & 0xFF) << 8]
            }
            InstructionFormat::F20t => {
                let offset = signed(ins, branch(body, ins)?, 16)?;
                vec![op, offset as u16]
            }
            InstructionFormat::F22x => vec![
                op | reg(ins, 0, RegisterFlags::BITS8)? << 8,
                reg(ins, 1, RegisterFlags::BITS16)?,
            ],
            InstructionFormat::F21t => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let offset = signed(ins, branch(body, ins)?, 16)?;
                vec![op | a << 8, offset as u16]
            }
            InstructionFormat::F21s => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let literal = signed(ins, literal(ins)?, 16)?;
                vec![op | a << 8, literal as u16]
            }
            InstructionFormat::F21h => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                vec![op | a << 8, high16(ins)?]
            }
            InstructionFormat::F21c => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                vec![op | a << 8, self.index16(ins)?]
            }
            InstructionFormat::F23x => vec![
                op | reg(ins, 0, RegisterFlags::BITS8)? << 8,
                reg(ins, 1, RegisterFlags::BITS8)? | reg(ins, 2, RegisterFlags::BITS8)? << 8,
            ],
            InstructionFormat::F22b => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let b = reg(ins, 1, RegisterFlags::BITS8)?;
                let literal = signed(ins, literal(ins)?, 8)?;
                vec![op | a << 8, b | ((literal as u16) & 0xFF) << 8]
            }
            InstructionFormat::F22t => {
                let a = reg(ins, 0, RegisterFlags::BITS4)?;
                let b = reg(ins, 1, RegisterFlags::BITS4)?;
                let offset = signed(ins, branch(body, ins)?, 16)?;
                vec![op | a << 8 | b << 12, offset as u16]
            }
            InstructionFormat::F22s => {
                let a = reg(ins, 0, RegisterFlags::BITS4)?;
                let b = reg(ins, 1, RegisterFlags::BITS4)?;
                let literal = signed(ins, literal(ins)?, 16)?;
                vec![op | a << 8 | b << 12, literal as u16]
            }
            InstructionFormat::F22c => {
                let a = reg(ins, 0, RegisterFlags::BITS4)?;
                let b = reg(ins, 1, RegisterFlags::BITS4)?;
                vec![op | a << 8 | b << 12, self.index16(ins)?]
            }
            InstructionFormat::F32x => vec![
                op,
                reg(ins, 0, RegisterFlags::BITS16)?,
                reg(ins, 1, RegisterFlags::BITS16)?,
            ],
            InstructionFormat::F30t => {
                let offset = signed(ins, branch(body, ins)?, 32)? as u32;
                vec![op, lo(offset), hi(offset)]
            }
            InstructionFormat::F31t => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let at = payload
                    .ok_or_else(|| structural_error!(ins, "expecting payload data"))?;
                let offset = (i64::from(at) - i64::from(ins.offset())) as u32;
                vec![op | a << 8, lo(offset), hi(offset)]
            }
            InstructionFormat::F31i => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let literal = signed(ins, literal(ins)?, 32)? as u32;
                vec![op | a << 8, lo(literal), hi(literal)]
            }
            InstructionFormat::F31c => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let index = self.index(ins)?;
                vec![op | a << 8, lo(index), hi(index)]
            }
            InstructionFormat::F35c => {
                let words = argument_words(ins.registers());
                let count = words.len();
                if count > 5 {
                    return Err(structural_error!(
                        ins,
                        "at most 5 register words, got {}; use the range form",
                        count
                    ));
                }
                let mut nibbles = [0u16; 5];
                for (slot, &word) in nibbles.iter_mut().zip(&words) {
                    if word > 0xF {
                        return Err(structural_error!(
                            ins,
                            "register v{} out of range [0..{}]",
                            word,
                            0xF
                        ));
                    }
                    *slot = word as u16;
                }
                let index = self.index16(ins)?;
                vec![
                    op | nibbles[4] << 8 | (count as u16) << 12,
                    index,
                    nibbles[0] | nibbles[1] << 4 | nibbles[2] << 8 | nibbles[3] << 12,
                ]
            }
            InstructionFormat::F3rc => {
                let words = argument_words(ins.registers());
                let count = words.len();
                if count > 0xFF {
                    return Err(structural_error!(ins, "at most 255 register words, got {}", count));
                }
                if !is_consecutive(ins.registers()) {
                    return Err(structural_error!(ins, "range registers must be consecutive"));
                }
                if words.last().is_some_and(|&last| last > 0xFFFF) {
                    return Err(structural_error!(ins, "range ends past v65535"));
                }
                let first = match count {
                    0 => 0,
                    _ => reg(ins, 0, RegisterFlags::BITS16)?,
                };
                vec![op | (count as u16) << 8, self.index16(ins)?, first]
            }
            InstructionFormat::F51l => {
                let a = reg(ins, 0, RegisterFlags::BITS8)?;
                let literal = literal(ins)? as u64;
                vec![
                    op | a << 8,
                    (literal & 0xFFFF) as u16,
                    ((literal >> 16) & 0xFFFF) as u16,
                    ((literal >> 32) & 0xFFFF) as u16,
                    (literal >> 48) as u16,
                ]
            }
        };
        Ok(units)
    }

    fn index16(&self, ins: &Instruction) -> Result<u16> {
        let index = self.index(ins)?;
        u16::try_from(index).map_err(|_| {
            structural_error!(ins, "index {} does not fit 16 bits", index)
        })
    }

    fn index(&self, ins: &Instruction) -> Result<u32> {
        let Some(kind) = PoolKind::of(ins.opcode()) else {
            return Err(structural_error!(ins, "opcode takes no constant pool index"));
        };
        let index = match (kind, ins.operand()) {
            (PoolKind::String, Operand::String(value)) => self.resolver.string_index(value),
            (PoolKind::Type, Operand::Type(ty)) => self.resolver.type_index(ty),
            (PoolKind::Field, Operand::Field(field)) => self.resolver.field_index(field),
            (PoolKind::Method, Operand::Method(method)) => self.resolver.method_index(method),
            _ => {
                return Err(structural_error!(ins, "expecting {} operand", kind.name()));
            }
        };
        index.ok_or_else(|| Error::IndexMissing {
            instruction: Box::new(ins.clone()),
            kind: kind.name(),
        })
    }
}

fn reg(ins: &Instruction, position: usize, width: RegisterFlags) -> Result<u16> {
    let Some(register) = ins.registers().get(position) else {
        return Err(structural_error!(ins, "expecting register at position {}", position));
    };
    if !register.fits(width) {
        return Err(structural_error!(
            ins,
            "register {} out of range [0..{}]",
            register,
            width.max_index()
        ));
    }
    Ok(register.index())
}

fn literal(ins: &Instruction) -> Result<i64> {
    match ins.operand() {
        Operand::Literal(value) => Ok(*value),
        _ => Err(structural_error!(ins, "expecting literal")),
    }
}

fn branch(body: &MethodBody, ins: &Instruction) -> Result<i64> {
    match ins.operand() {
        Operand::Target(target) => {
            let target = body.offset_of(*target)?;
            Ok(i64::from(target) - i64::from(ins.offset()))
        }
        _ => Err(structural_error!(ins, "expecting branch target")),
    }
}

fn high16(ins: &Instruction) -> Result<u16> {
    let value = literal(ins)?;
    if ins.opcode() == OpCode::ConstWideHigh16 {
        if value & 0x0000_FFFF_FFFF_FFFF != 0 {
            return Err(structural_error!(ins, "literal {:#x} has low 48 bits set", value));
        }
        Ok(((value as u64) >> 48) as u16)
    } else {
        let value = signed(ins, value, 32)?;
        if value & 0xFFFF != 0 {
            return Err(structural_error!(ins, "literal {:#x} has low 16 bits set", value));
        }
        Ok(((value as u32) >> 16) as u16)
    }
}

/// Checks that `value` fits a signed field of `bits` bits.
fn signed(ins: &Instruction, value: i64, bits: u32) -> Result<i64> {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(structural_error!(
            ins,
            "value {} does not fit {} bits",
            value,
            bits
        ));
    }
    Ok(value)
}

fn encode_payload(body: &MethodBody, ins: &Instruction) -> Result<Vec<u16>> {
    match ins.operand() {
        Operand::PackedSwitch(data) => packed_switch(body, ins, data),
        Operand::SparseSwitch(data) => sparse_switch(body, ins, data),
        Operand::ArrayData(data) => array_data(ins, data),
        _ => Err(structural_error!(ins, "expecting payload data")),
    }
}

fn relative(body: &MethodBody, ins: &Instruction, target: InstrId) -> Result<u32> {
    let target = body.offset_of(target)?;
    Ok((i64::from(target) - i64::from(ins.offset())) as u32)
}

fn table_size(ins: &Instruction, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| structural_error!(ins, "{} entries exceed the table limit", len))
}

fn packed_switch(body: &MethodBody, ins: &Instruction, data: &PackedSwitchData) -> Result<Vec<u16>> {
    let mut block = Vec::with_capacity(data.code_units() as usize);
    let first_key = data.first_key as u32;
    block.extend([
        PACKED_SWITCH_IDENT,
        table_size(ins, data.targets.len())?,
        lo(first_key),
        hi(first_key),
    ]);
    for target in &data.targets {
        let offset = relative(body, ins, *target)?;
        block.extend([lo(offset), hi(offset)]);
    }
    Ok(block)
}

fn sparse_switch(body: &MethodBody, ins: &Instruction, data: &SparseSwitchData) -> Result<Vec<u16>> {
    let mut block = Vec::with_capacity(data.code_units() as usize);
    block.extend([SPARSE_SWITCH_IDENT, table_size(ins, data.targets.len())?]);
    for key in data.targets.keys() {
        let key = *key as u32;
        block.extend([lo(key), hi(key)]);
    }
    for target in data.targets.values() {
        let offset = relative(body, ins, *target)?;
        block.extend([lo(offset), hi(offset)]);
    }
    Ok(block)
}

fn array_data(ins: &Instruction, data: &ArrayData) -> Result<Vec<u16>> {
    let size = usize::from(data.element_size);
    let bits = u32::from(data.element_size) * 8;
    let mut bytes = Vec::with_capacity(data.values.len() * size);
    for value in &data.values {
        // Accept both signed and unsigned element ranges
        if bits < 64 && (*value < -(1i64 << (bits - 1)) || *value >= (1i64 << bits)) {
            return Err(structural_error!(
                ins,
                "element {} does not fit {} bytes",
                value,
                size
            ));
        }
        bytes.extend_from_slice(&value.to_le_bytes()[..size]);
    }

    let count = u32::try_from(data.values.len())
        .map_err(|_| structural_error!(ins, "array too large"))?;
    let mut block = vec![ARRAY_DATA_IDENT, data.element_size, lo(count), hi(count)];
    block.extend(
        bytes
            .chunks(2)
            .map(|pair| u16::from(pair[0]) | u16::from(pair.get(1).copied().unwrap_or(0)) << 8),
    );
    if block.len() % 2 != 0 {
        block.push(0);
    }
    Ok(block)
}
