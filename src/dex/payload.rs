//! Out-of-line payload blocks.
//!
//! `packed-switch`, `sparse-switch` and `fill-array-data` reference a data block that is
//! placed after the last real instruction of the method. Each block is rounded up to an even
//! number of code units on its own, so every block starts 4-byte aligned.

use std::collections::BTreeMap;

use crate::{
    dex::{InstrId, Instruction, OpCode, Operand},
    Result,
};

/// Payload identifier of a `packed-switch` block.
pub const PACKED_SWITCH_IDENT: u16 = 0x0100;
/// Payload identifier of a `sparse-switch` block.
pub const SPARSE_SWITCH_IDENT: u16 = 0x0200;
/// Payload identifier of a `fill-array-data` block.
pub const ARRAY_DATA_IDENT: u16 = 0x0300;

/// Rounds a code-unit count up to the next even value.
#[must_use]
pub const fn align_even(units: u32) -> u32 {
    (units + 1) & !1
}

/// Jump table for consecutive keys starting at `first_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSwitchData {
    /// Key of the first target
    pub first_key: i32,
    /// One target per key, in key order
    pub targets: Vec<InstrId>,
}

impl PackedSwitchData {
    /// Creates a table with keys `first_key..first_key + targets.len()`.
    #[must_use]
    pub fn new(first_key: i32, targets: Vec<InstrId>) -> Self {
        PackedSwitchData { first_key, targets }
    }

    /// Size of the block in code units: `align_even(4 + 2N)`.
    #[must_use]
    pub fn code_units(&self) -> u32 {
        align_even(4 + 2 * self.targets.len() as u32)
    }
}

/// Jump table for arbitrary keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SparseSwitchData {
    /// Targets by key; iteration order is the sorted key order the format requires
    pub targets: BTreeMap<i32, InstrId>,
}

impl SparseSwitchData {
    /// Creates a table from key/target pairs.
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = (i32, InstrId)>) -> Self {
        SparseSwitchData {
            targets: targets.into_iter().collect(),
        }
    }

    /// Size of the block in code units: `align_even(2 + 4N)`.
    #[must_use]
    pub fn code_units(&self) -> u32 {
        align_even(2 + 4 * self.targets.len() as u32)
    }
}

/// Constant array for `fill-array-data`.
///
/// Values are stored widened to `i64`; `element_size` says how many bytes each occupies in
/// the payload. Only the integral sizes 1, 2, 4 and 8 can be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayData {
    /// Width of one element in bytes
    pub element_size: u16,
    /// Element values
    pub values: Vec<i64>,
}

impl ArrayData {
    /// Creates array data with an explicit element width.
    #[must_use]
    pub fn new(element_size: u16, values: Vec<i64>) -> Self {
        ArrayData {
            element_size,
            values,
        }
    }

    /// Byte array.
    #[must_use]
    pub fn bytes(values: &[i8]) -> Self {
        Self::new(1, values.iter().map(|&v| i64::from(v)).collect())
    }

    /// Short array.
    #[must_use]
    pub fn shorts(values: &[i16]) -> Self {
        Self::new(2, values.iter().map(|&v| i64::from(v)).collect())
    }

    /// Int array.
    #[must_use]
    pub fn ints(values: &[i32]) -> Self {
        Self::new(4, values.iter().map(|&v| i64::from(v)).collect())
    }

    /// Long array.
    #[must_use]
    pub fn longs(values: &[i64]) -> Self {
        Self::new(8, values.to_vec())
    }

    /// True if the element width is one the payload format supports.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self.element_size, 1 | 2 | 4 | 8)
    }

    /// Size of the block in code units: `align_even(4 + (count * size + 1) / 2)`.
    #[must_use]
    pub fn code_units(&self) -> u32 {
        let bytes = self.values.len() as u32 * u32::from(self.element_size);
        align_even(4 + (bytes + 1) / 2)
    }
}

/// Payload size of an instruction, or `None` for instructions without a payload.
///
/// # Errors
/// Returns [`crate::Error::Structural`] if a payload instruction carries the wrong operand, or
/// if array data is empty or not integral.
pub fn payload_units(instruction: &Instruction) -> Result<Option<u32>> {
    match (instruction.opcode(), instruction.operand()) {
        (OpCode::PackedSwitch, Operand::PackedSwitch(data)) => Ok(Some(data.code_units())),
        (OpCode::PackedSwitch, _) => Err(structural_error!(
            instruction,
            "expecting packed-switch data"
        )),
        (OpCode::SparseSwitch, Operand::SparseSwitch(data)) => Ok(Some(data.code_units())),
        (OpCode::SparseSwitch, _) => Err(structural_error!(
            instruction,
            "expecting sparse-switch data"
        )),
        (OpCode::FillArrayData, Operand::ArrayData(data)) => {
            if data.values.is_empty() {
                return Err(structural_error!(instruction, "expecting non empty array"));
            }
            if !data.is_integral() {
                return Err(structural_error!(
                    instruction,
                    "expecting byte/short/int/long elements, got {} byte elements",
                    data.element_size
                ));
            }
            Ok(Some(data.code_units()))
        }
        (OpCode::FillArrayData, _) => Err(structural_error!(instruction, "expecting array data")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_align_even() {
        assert_eq!(align_even(0), 0);
        assert_eq!(align_even(5), 6);
        assert_eq!(align_even(10), 10);
    }

    #[test]
    fn test_payload_sizes() {
        let ids: Vec<InstrId> = (0..3).map(InstrId::from_raw).collect();
        assert_eq!(PackedSwitchData::new(0, ids.clone()).code_units(), 10);

        let sparse = SparseSwitchData::new([(10, ids[0]), (-4, ids[1])]);
        assert_eq!(sparse.code_units(), 10);
        assert_eq!(sparse.targets.keys().copied().collect::<Vec<_>>(), vec![-4, 10]);

        // 3 bytes: 4 + (3 + 1) / 2 = 6
        assert_eq!(ArrayData::bytes(&[1, 2, 3]).code_units(), 6);
        // 3 ints: 4 + 12 / 2 = 10
        assert_eq!(ArrayData::ints(&[1, 2, 3]).code_units(), 10);
        // 1 short: 4 + 2 / 2 = 5, aligned to 6
        assert_eq!(ArrayData::shorts(&[7]).code_units(), 6);
        assert_eq!(ArrayData::longs(&[1]).code_units(), 8);
    }

    #[test]
    fn test_payload_operand_checks() {
        let switch = Instruction::new(InstrId::from_raw(0), OpCode::PackedSwitch, vec![], Operand::None);
        assert!(matches!(payload_units(&switch), Err(Error::Structural { .. })));

        let empty = Instruction::new(
            InstrId::from_raw(1),
            OpCode::FillArrayData,
            vec![],
            Operand::ArrayData(ArrayData::ints(&[])),
        );
        assert!(matches!(payload_units(&empty), Err(Error::Structural { .. })));

        let odd = Instruction::new(
            InstrId::from_raw(2),
            OpCode::FillArrayData,
            vec![],
            Operand::ArrayData(ArrayData::new(3, vec![1])),
        );
        assert!(matches!(payload_units(&odd), Err(Error::Structural { .. })));

        let nop = Instruction::new(InstrId::from_raw(3), OpCode::Nop, vec![], Operand::None);
        assert_eq!(payload_units(&nop).unwrap(), None);
    }
}
