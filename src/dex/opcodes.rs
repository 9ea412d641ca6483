//! Dalvik opcode table.
//!
//! Every opcode carries its byte value, its mnemonic and its [`InstructionFormat`]. The format
//! fixes the code-unit length of the instruction and the shape of its operands, which is all
//! the layout engine needs to compute offsets.
//!
//! The odex-only and unused byte values (`0x3e..=0x43`, `0x73`, `0x79`, `0x7a`, `0xe3..`)
//! have no entry; decoding them yields [`crate::Error::UnknownOpcode`].

use std::{collections::HashMap, fmt, sync::OnceLock};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{Error, Result};

/// Instruction formats, named after the Dalvik format identifiers.
///
/// The first digit is the length in code units, the second the number of registers, the
/// letter the kind of additional data (`x` none, `n` nibble literal, `b`/`s`/`i`/`l` 8/16/32/64
/// bit literal, `h` high-order literal, `t` branch target, `c` constant pool index, `r` range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
#[allow(missing_docs)]
pub enum InstructionFormat {
    #[strum(serialize = "10x")]
    F10x,
    #[strum(serialize = "12x")]
    F12x,
    #[strum(serialize = "11n")]
    F11n,
    #[strum(serialize = "11x")]
    F11x,
    #[strum(serialize = "10t")]
    F10t,
    #[strum(serialize = "20t")]
    F20t,
    #[strum(serialize = "22x")]
    F22x,
    #[strum(serialize = "21t")]
    F21t,
    #[strum(serialize = "21s")]
    F21s,
    #[strum(serialize = "21h")]
    F21h,
    #[strum(serialize = "21c")]
    F21c,
    #[strum(serialize = "23x")]
    F23x,
    #[strum(serialize = "22b")]
    F22b,
    #[strum(serialize = "22t")]
    F22t,
    #[strum(serialize = "22s")]
    F22s,
    #[strum(serialize = "22c")]
    F22c,
    #[strum(serialize = "32x")]
    F32x,
    #[strum(serialize = "30t")]
    F30t,
    #[strum(serialize = "31t")]
    F31t,
    #[strum(serialize = "31i")]
    F31i,
    #[strum(serialize = "31c")]
    F31c,
    #[strum(serialize = "35c")]
    F35c,
    #[strum(serialize = "3rc")]
    F3rc,
    #[strum(serialize = "51l")]
    F51l,
}

impl InstructionFormat {
    /// Length of an instruction in this format, in 16-bit code units.
    #[must_use]
    pub const fn code_units(self) -> u32 {
        match self {
            InstructionFormat::F10x
            | InstructionFormat::F12x
            | InstructionFormat::F11n
            | InstructionFormat::F11x
            | InstructionFormat::F10t => 1,
            InstructionFormat::F20t
            | InstructionFormat::F22x
            | InstructionFormat::F21t
            | InstructionFormat::F21s
            | InstructionFormat::F21h
            | InstructionFormat::F21c
            | InstructionFormat::F23x
            | InstructionFormat::F22b
            | InstructionFormat::F22t
            | InstructionFormat::F22s
            | InstructionFormat::F22c => 2,
            InstructionFormat::F32x
            | InstructionFormat::F30t
            | InstructionFormat::F31t
            | InstructionFormat::F31i
            | InstructionFormat::F31c
            | InstructionFormat::F35c
            | InstructionFormat::F3rc => 3,
            InstructionFormat::F51l => 5,
        }
    }

    /// True for formats whose operand is a branch target.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            InstructionFormat::F10t
                | InstructionFormat::F20t
                | InstructionFormat::F30t
                | InstructionFormat::F21t
                | InstructionFormat::F22t
        )
    }
}

macro_rules! opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal, $format:ident;)*) => {
        /// A Dalvik opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
        #[repr(u8)]
        #[allow(missing_docs)]
        pub enum OpCode {
            $($name = $value,)*
        }

        impl OpCode {
            /// Decodes an opcode byte.
            ///
            /// # Errors
            /// Returns [`Error::UnknownOpcode`] for byte values without a format.
            pub fn from_u8(value: u8) -> Result<Self> {
                match value {
                    $($value => Ok(OpCode::$name),)*
                    _ => Err(Error::UnknownOpcode(value)),
                }
            }

            /// The mnemonic as printed by disassemblers, e.g. `invoke-virtual/range`.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(OpCode::$name => $mnemonic,)*
                }
            }

            /// The encoding format of this opcode.
            #[must_use]
            pub const fn format(self) -> InstructionFormat {
                match self {
                    $(OpCode::$name => InstructionFormat::$format,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", F10x;
    Move = 0x01, "move", F12x;
    MoveFrom16 = 0x02, "move/from16", F22x;
    Move16 = 0x03, "move/16", F32x;
    MoveWide = 0x04, "move-wide", F12x;
    MoveWideFrom16 = 0x05, "move-wide/from16", F22x;
    MoveWide16 = 0x06, "move-wide/16", F32x;
    MoveObject = 0x07, "move-object", F12x;
    MoveObjectFrom16 = 0x08, "move-object/from16", F22x;
    MoveObject16 = 0x09, "move-object/16", F32x;
    MoveResult = 0x0a, "move-result", F11x;
    MoveResultWide = 0x0b, "move-result-wide", F11x;
    MoveResultObject = 0x0c, "move-result-object", F11x;
    MoveException = 0x0d, "move-exception", F11x;
    ReturnVoid = 0x0e, "return-void", F10x;
    Return = 0x0f, "return", F11x;
    ReturnWide = 0x10, "return-wide", F11x;
    ReturnObject = 0x11, "return-object", F11x;
    Const4 = 0x12, "const/4", F11n;
    Const16 = 0x13, "const/16", F21s;
    Const = 0x14, "const", F31i;
    ConstHigh16 = 0x15, "const/high16", F21h;
    ConstWide16 = 0x16, "const-wide/16", F21s;
    ConstWide32 = 0x17, "const-wide/32", F31i;
    ConstWide = 0x18, "const-wide", F51l;
    ConstWideHigh16 = 0x19, "const-wide/high16", F21h;
    ConstString = 0x1a, "const-string", F21c;
    ConstStringJumbo = 0x1b, "const-string/jumbo", F31c;
    ConstClass = 0x1c, "const-class", F21c;
    MonitorEnter = 0x1d, "monitor-enter", F11x;
    MonitorExit = 0x1e, "monitor-exit", F11x;
    CheckCast = 0x1f, "check-cast", F21c;
    InstanceOf = 0x20, "instance-of", F22c;
    ArrayLength = 0x21, "array-length", F12x;
    NewInstance = 0x22, "new-instance", F21c;
    NewArray = 0x23, "new-array", F22c;
    FilledNewArray = 0x24, "filled-new-array", F35c;
    FilledNewArrayRange = 0x25, "filled-new-array/range", F3rc;
    FillArrayData = 0x26, "fill-array-data", F31t;
    Throw = 0x27, "throw", F11x;
    Goto = 0x28, "goto", F10t;
    Goto16 = 0x29, "goto/16", F20t;
    Goto32 = 0x2a, "goto/32", F30t;
    PackedSwitch = 0x2b, "packed-switch", F31t;
    SparseSwitch = 0x2c, "sparse-switch", F31t;
    CmplFloat = 0x2d, "cmpl-float", F23x;
    CmpgFloat = 0x2e, "cmpg-float", F23x;
    CmplDouble = 0x2f, "cmpl-double", F23x;
    CmpgDouble = 0x30, "cmpg-double", F23x;
    CmpLong = 0x31, "cmp-long", F23x;
    IfEq = 0x32, "if-eq", F22t;
    IfNe = 0x33, "if-ne", F22t;
    IfLt = 0x34, "if-lt", F22t;
    IfGe = 0x35, "if-ge", F22t;
    IfGt = 0x36, "if-gt", F22t;
    IfLe = 0x37, "if-le", F22t;
    IfEqz = 0x38, "if-eqz", F21t;
    IfNez = 0x39, "if-nez", F21t;
    IfLtz = 0x3a, "if-ltz", F21t;
    IfGez = 0x3b, "if-gez", F21t;
    IfGtz = 0x3c, "if-gtz", F21t;
    IfLez = 0x3d, "if-lez", F21t;
    Aget = 0x44, "aget", F23x;
    AgetWide = 0x45, "aget-wide", F23x;
    AgetObject = 0x46, "aget-object", F23x;
    AgetBoolean = 0x47, "aget-boolean", F23x;
    AgetByte = 0x48, "aget-byte", F23x;
    AgetChar = 0x49, "aget-char", F23x;
    AgetShort = 0x4a, "aget-short", F23x;
    Aput = 0x4b, "aput", F23x;
    AputWide = 0x4c, "aput-wide", F23x;
    AputObject = 0x4d, "aput-object", F23x;
    AputBoolean = 0x4e, "aput-boolean", F23x;
    AputByte = 0x4f, "aput-byte", F23x;
    AputChar = 0x50, "aput-char", F23x;
    AputShort = 0x51, "aput-short", F23x;
    Iget = 0x52, "iget", F22c;
    IgetWide = 0x53, "iget-wide", F22c;
    IgetObject = 0x54, "iget-object", F22c;
    IgetBoolean = 0x55, "iget-boolean", F22c;
    IgetByte = 0x56, "iget-byte", F22c;
    IgetChar = 0x57, "iget-char", F22c;
    IgetShort = 0x58, "iget-short", F22c;
    Iput = 0x59, "iput", F22c;
    IputWide = 0x5a, "iput-wide", F22c;
    IputObject = 0x5b, "iput-object", F22c;
    IputBoolean = 0x5c, "iput-boolean", F22c;
    IputByte = 0x5d, "iput-byte", F22c;
    IputChar = 0x5e, "iput-char", F22c;
    IputShort = 0x5f, "iput-short", F22c;
    Sget = 0x60, "sget", F21c;
    SgetWide = 0x61, "sget-wide", F21c;
    SgetObject = 0x62, "sget-object", F21c;
    SgetBoolean = 0x63, "sget-boolean", F21c;
    SgetByte = 0x64, "sget-byte", F21c;
    SgetChar = 0x65, "sget-char", F21c;
    SgetShort = 0x66, "sget-short", F21c;
    Sput = 0x67, "sput", F21c;
    SputWide = 0x68, "sput-wide", F21c;
    SputObject = 0x69, "sput-object", F21c;
    SputBoolean = 0x6a, "sput-boolean", F21c;
    SputByte = 0x6b, "sput-byte", F21c;
    SputChar = 0x6c, "sput-char", F21c;
    SputShort = 0x6d, "sput-short", F21c;
    InvokeVirtual = 0x6e, "invoke-virtual", F35c;
    InvokeSuper = 0x6f, "invoke-super", F35c;
    InvokeDirect = 0x70, "invoke-direct", F35c;
    InvokeStatic = 0x71, "invoke-static", F35c;
    InvokeInterface = 0x72, "invoke-interface", F35c;
    InvokeVirtualRange = 0x74, "invoke-virtual/range", F3rc;
    InvokeSuperRange = 0x75, "invoke-super/range", F3rc;
    InvokeDirectRange = 0x76, "invoke-direct/range", F3rc;
    InvokeStaticRange = 0x77, "invoke-static/range", F3rc;
    InvokeInterfaceRange = 0x78, "invoke-interface/range", F3rc;
    NegInt = 0x7b, "neg-int", F12x;
    NotInt = 0x7c, "not-int", F12x;
    NegLong = 0x7d, "neg-long", F12x;
    NotLong = 0x7e, "not-long", F12x;
    NegFloat = 0x7f, "neg-float", F12x;
    NegDouble = 0x80, "neg-double", F12x;
    IntToLong = 0x81, "int-to-long", F12x;
    IntToFloat = 0x82, "int-to-float", F12x;
    IntToDouble = 0x83, "int-to-double", F12x;
    LongToInt = 0x84, "long-to-int", F12x;
    LongToFloat = 0x85, "long-to-float", F12x;
    LongToDouble = 0x86, "long-to-double", F12x;
    FloatToInt = 0x87, "float-to-int", F12x;
    FloatToLong = 0x88, "float-to-long", F12x;
    FloatToDouble = 0x89, "float-to-double", F12x;
    DoubleToInt = 0x8a, "double-to-int", F12x;
    DoubleToLong = 0x8b, "double-to-long", F12x;
    DoubleToFloat = 0x8c, "double-to-float", F12x;
    IntToByte = 0x8d, "int-to-byte", F12x;
    IntToChar = 0x8e, "int-to-char", F12x;
    IntToShort = 0x8f, "int-to-short", F12x;
    AddInt = 0x90, "add-int", F23x;
    SubInt = 0x91, "sub-int", F23x;
    MulInt = 0x92, "mul-int", F23x;
    DivInt = 0x93, "div-int", F23x;
    RemInt = 0x94, "rem-int", F23x;
    AndInt = 0x95, "and-int", F23x;
    OrInt = 0x96, "or-int", F23x;
    XorInt = 0x97, "xor-int", F23x;
    ShlInt = 0x98, "shl-int", F23x;
    ShrInt = 0x99, "shr-int", F23x;
    UshrInt = 0x9a, "ushr-int", F23x;
    AddLong = 0x9b, "add-long", F23x;
    SubLong = 0x9c, "sub-long", F23x;
    MulLong = 0x9d, "mul-long", F23x;
    DivLong = 0x9e, "div-long", F23x;
    RemLong = 0x9f, "rem-long", F23x;
    AndLong = 0xa0, "and-long", F23x;
    OrLong = 0xa1, "or-long", F23x;
    XorLong = 0xa2, "xor-long", F23x;
    ShlLong = 0xa3, "shl-long", F23x;
    ShrLong = 0xa4, "shr-long", F23x;
    UshrLong = 0xa5, "ushr-long", F23x;
    AddFloat = 0xa6, "add-float", F23x;
    SubFloat = 0xa7, "sub-float", F23x;
    MulFloat = 0xa8, "mul-float", F23x;
    DivFloat = 0xa9, "div-float", F23x;
    RemFloat = 0xaa, "rem-float", F23x;
    AddDouble = 0xab, "add-double", F23x;
    SubDouble = 0xac, "sub-double", F23x;
    MulDouble = 0xad, "mul-double", F23x;
    DivDouble = 0xae, "div-double", F23x;
    RemDouble = 0xaf, "rem-double", F23x;
    AddInt2Addr = 0xb0, "add-int/2addr", F12x;
    SubInt2Addr = 0xb1, "sub-int/2addr", F12x;
    MulInt2Addr = 0xb2, "mul-int/2addr", F12x;
    DivInt2Addr = 0xb3, "div-int/2addr", F12x;
    RemInt2Addr = 0xb4, "rem-int/2addr", F12x;
    AndInt2Addr = 0xb5, "and-int/2addr", F12x;
    OrInt2Addr = 0xb6, "or-int/2addr", F12x;
    XorInt2Addr = 0xb7, "xor-int/2addr", F12x;
    ShlInt2Addr = 0xb8, "shl-int/2addr", F12x;
    ShrInt2Addr = 0xb9, "shr-int/2addr", F12x;
    UshrInt2Addr = 0xba, "ushr-int/2addr", F12x;
    AddLong2Addr = 0xbb, "add-long/2addr", F12x;
    SubLong2Addr = 0xbc, "sub-long/2addr", F12x;
    MulLong2Addr = 0xbd, "mul-long/2addr", F12x;
    DivLong2Addr = 0xbe, "div-long/2addr", F12x;
    RemLong2Addr = 0xbf, "rem-long/2addr", F12x;
    AndLong2Addr = 0xc0, "and-long/2addr", F12x;
    OrLong2Addr = 0xc1, "or-long/2addr", F12x;
    XorLong2Addr = 0xc2, "xor-long/2addr", F12x;
    ShlLong2Addr = 0xc3, "shl-long/2addr", F12x;
    ShrLong2Addr = 0xc4, "shr-long/2addr", F12x;
    UshrLong2Addr = 0xc5, "ushr-long/2addr", F12x;
    AddFloat2Addr = 0xc6, "add-float/2addr", F12x;
    SubFloat2Addr = 0xc7, "sub-float/2addr", F12x;
    MulFloat2Addr = 0xc8, "mul-float/2addr", F12x;
    DivFloat2Addr = 0xc9, "div-float/2addr", F12x;
    RemFloat2Addr = 0xca, "rem-float/2addr", F12x;
    AddDouble2Addr = 0xcb, "add-double/2addr", F12x;
    SubDouble2Addr = 0xcc, "sub-double/2addr", F12x;
    MulDouble2Addr = 0xcd, "mul-double/2addr", F12x;
    DivDouble2Addr = 0xce, "div-double/2addr", F12x;
    RemDouble2Addr = 0xcf, "rem-double/2addr", F12x;
    AddIntLit16 = 0xd0, "add-int/lit16", F22s;
    RsubInt = 0xd1, "rsub-int", F22s;
    MulIntLit16 = 0xd2, "mul-int/lit16", F22s;
    DivIntLit16 = 0xd3, "div-int/lit16", F22s;
    RemIntLit16 = 0xd4, "rem-int/lit16", F22s;
    AndIntLit16 = 0xd5, "and-int/lit16", F22s;
    OrIntLit16 = 0xd6, "or-int/lit16", F22s;
    XorIntLit16 = 0xd7, "xor-int/lit16", F22s;
    AddIntLit8 = 0xd8, "add-int/lit8", F22b;
    RsubIntLit8 = 0xd9, "rsub-int/lit8", F22b;
    MulIntLit8 = 0xda, "mul-int/lit8", F22b;
    DivIntLit8 = 0xdb, "div-int/lit8", F22b;
    RemIntLit8 = 0xdc, "rem-int/lit8", F22b;
    AndIntLit8 = 0xdd, "and-int/lit8", F22b;
    OrIntLit8 = 0xde, "or-int/lit8", F22b;
    XorIntLit8 = 0xdf, "xor-int/lit8", F22b;
    ShlIntLit8 = 0xe0, "shl-int/lit8", F22b;
    ShrIntLit8 = 0xe1, "shr-int/lit8", F22b;
    UshrIntLit8 = 0xe2, "ushr-int/lit8", F22b;
}

/// Reverse lookup from mnemonic to opcode, built once from the opcode table.
static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, OpCode>> = OnceLock::new();

fn mnemonic_lookup() -> &'static HashMap<&'static str, OpCode> {
    MNEMONIC_TO_OPCODE.get_or_init(|| OpCode::iter().map(|op| (op.mnemonic(), op)).collect())
}

impl OpCode {
    /// Number of known opcodes.
    pub const KNOWN: usize = OpCode::COUNT;

    /// Looks up an opcode by mnemonic.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        mnemonic_lookup().get(mnemonic).copied()
    }

    /// The byte value of this opcode.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Length of this instruction in code units, excluding any trailing payload.
    #[must_use]
    pub const fn code_units(self) -> u32 {
        self.format().code_units()
    }

    /// True for the invoke family, both standard and range forms.
    #[must_use]
    pub const fn is_invoke(self) -> bool {
        matches!(self.value(), 0x6e..=0x72 | 0x74..=0x78)
    }

    /// The `/range` counterpart of a standard invoke or `filled-new-array`.
    ///
    /// Callers switch to the range form when an argument register does not fit into four bits
    /// or there are more than five arguments.
    #[must_use]
    pub const fn range_form(self) -> Option<OpCode> {
        match self {
            OpCode::InvokeVirtual => Some(OpCode::InvokeVirtualRange),
            OpCode::InvokeSuper => Some(OpCode::InvokeSuperRange),
            OpCode::InvokeDirect => Some(OpCode::InvokeDirectRange),
            OpCode::InvokeStatic => Some(OpCode::InvokeStaticRange),
            OpCode::InvokeInterface => Some(OpCode::InvokeInterfaceRange),
            OpCode::FilledNewArray => Some(OpCode::FilledNewArrayRange),
            _ => None,
        }
    }

    /// True if the instruction is followed by an out-of-line payload block.
    #[must_use]
    pub const fn has_payload(self) -> bool {
        matches!(
            self,
            OpCode::PackedSwitch | OpCode::SparseSwitch | OpCode::FillArrayData
        )
    }

    /// True for instructions whose operand is a branch target.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        self.format().is_branch()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        OpCode::from_u8(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trip() {
        for op in OpCode::iter() {
            assert_eq!(OpCode::from_u8(op.value()).unwrap(), op);
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(OpCode::KNOWN, 218);
    }

    #[test]
    fn test_unknown_opcodes() {
        for value in [0x3e, 0x43, 0x73, 0x79, 0x7a, 0xe3, 0xff] {
            assert!(matches!(OpCode::from_u8(value), Err(Error::UnknownOpcode(v)) if v == value));
        }
        assert!(OpCode::from_mnemonic("invoke-polymorphic").is_none());
    }

    #[test]
    fn test_code_units() {
        assert_eq!(OpCode::Nop.code_units(), 1);
        assert_eq!(OpCode::Goto.code_units(), 1);
        assert_eq!(OpCode::Goto16.code_units(), 2);
        assert_eq!(OpCode::Goto32.code_units(), 3);
        assert_eq!(OpCode::Const4.code_units(), 1);
        assert_eq!(OpCode::Const16.code_units(), 2);
        assert_eq!(OpCode::Const.code_units(), 3);
        assert_eq!(OpCode::ConstWide.code_units(), 5);
        assert_eq!(OpCode::InvokeVirtual.code_units(), 3);
        assert_eq!(OpCode::InvokeVirtualRange.code_units(), 3);
        assert_eq!(OpCode::FilledNewArrayRange.code_units(), 3);
        assert_eq!(OpCode::PackedSwitch.code_units(), 3);
        assert_eq!(OpCode::AddIntLit8.code_units(), 2);
    }

    #[test]
    fn test_classification() {
        assert!(OpCode::InvokeStatic.is_invoke());
        assert!(OpCode::InvokeInterfaceRange.is_invoke());
        assert!(!OpCode::FilledNewArray.is_invoke());
        assert_eq!(OpCode::InvokeStatic.range_form(), Some(OpCode::InvokeStaticRange));
        assert_eq!(OpCode::InvokeStaticRange.range_form(), None);
        assert!(OpCode::IfEqz.is_branch());
        assert!(!OpCode::PackedSwitch.is_branch());
        assert!(OpCode::SparseSwitch.has_payload());
        assert_eq!(OpCode::MoveObjectFrom16.to_string(), "move-object/from16");
        assert_eq!(InstructionFormat::F3rc.to_string(), "3rc");
    }
}
