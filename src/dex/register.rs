//! Registers and register encoding constraints.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Encoding constraints of a register operand.
    ///
    /// The width bits say how many bits the encoding slot offers. Direction and `WIDE` describe
    /// how the instruction uses the register; a wide register names the low half of a pair
    /// `vN, vN+1` holding a 64-bit value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct RegisterFlags: u8 {
        /// Slot holds a 4-bit index
        const BITS4 = 0x01;
        /// Slot holds an 8-bit index
        const BITS8 = 0x02;
        /// Slot holds a 16-bit index
        const BITS16 = 0x04;
        /// Register is read
        const SOURCE = 0x10;
        /// Register is written
        const DESTINATION = 0x20;
        /// Register is the low half of a 64-bit pair
        const WIDE = 0x40;
    }
}

impl RegisterFlags {
    /// Largest index the width bits allow, or `u16::MAX` if no width is set.
    #[must_use]
    pub fn max_index(self) -> u16 {
        if self.contains(RegisterFlags::BITS4) {
            0xF
        } else if self.contains(RegisterFlags::BITS8) {
            0xFF
        } else {
            0xFFFF
        }
    }

    /// The narrowest width able to hold `index`.
    #[must_use]
    pub fn width_for(index: u16) -> Self {
        match index {
            0..=0xF => RegisterFlags::BITS4,
            0x10..=0xFF => RegisterFlags::BITS8,
            _ => RegisterFlags::BITS16,
        }
    }
}

/// A virtual register, identified by its 0-based index in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register {
    index: u16,
    flags: RegisterFlags,
}

impl Register {
    /// A plain register.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Register {
            index,
            flags: RegisterFlags::empty(),
        }
    }

    /// The low half of a 64-bit register pair.
    #[must_use]
    pub const fn wide(index: u16) -> Self {
        Register {
            index,
            flags: RegisterFlags::WIDE,
        }
    }

    /// Adds usage flags.
    #[must_use]
    pub fn with_flags(mut self, flags: RegisterFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// The register index.
    #[must_use]
    pub const fn index(self) -> u16 {
        self.index
    }

    /// Usage flags.
    #[must_use]
    pub const fn flags(self) -> RegisterFlags {
        self.flags
    }

    /// True for the low half of a 64-bit pair.
    #[must_use]
    pub fn is_wide(self) -> bool {
        self.flags.contains(RegisterFlags::WIDE)
    }

    /// Number of frame slots the register occupies.
    #[must_use]
    pub fn slots(self) -> u32 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// True if the register fits a slot of the given width.
    #[must_use]
    pub fn fits(self, width: RegisterFlags) -> bool {
        self.index <= width.max_index()
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

impl From<u16> for Register {
    fn from(index: u16) -> Self {
        Register::new(index)
    }
}

/// Register words an argument list occupies, with each wide pair expanded to `vN, vN+1`.
#[must_use]
pub fn argument_words(registers: &[Register]) -> Vec<u32> {
    registers
        .iter()
        .flat_map(|r| (0..r.slots()).map(move |half| u32::from(r.index) + half))
        .collect()
}

/// True if the argument list can be encoded by a standard (non-range) invoke.
///
/// Standard invokes hold at most five 4-bit register words; a wide argument takes two.
/// Otherwise the caller must switch to the `/range` opcode and place the arguments in
/// consecutive registers.
#[must_use]
pub fn fits_standard_invoke(registers: &[Register]) -> bool {
    let words = argument_words(registers);
    words.len() <= 5 && words.iter().all(|&word| word <= 0xF)
}

/// True if the registers are consecutive, as the `/range` forms require.
///
/// A wide register covers two words, so the next argument starts two indices later.
#[must_use]
pub fn is_consecutive(registers: &[Register]) -> bool {
    registers
        .windows(2)
        .all(|pair| u32::from(pair[0].index) + pair[0].slots() == u32::from(pair[1].index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness() {
        assert!(Register::new(15).fits(RegisterFlags::BITS4));
        assert!(!Register::new(16).fits(RegisterFlags::BITS4));
        assert!(Register::new(255).fits(RegisterFlags::BITS8));
        assert!(!Register::new(256).fits(RegisterFlags::BITS8));
        assert!(Register::new(u16::MAX).fits(RegisterFlags::BITS16));
        assert_eq!(RegisterFlags::width_for(300), RegisterFlags::BITS16);
    }

    #[test]
    fn test_invoke_fitness() {
        let small: Vec<Register> = (0..5).map(Register::new).collect();
        assert!(fits_standard_invoke(&small));

        let six: Vec<Register> = (0..6).map(Register::new).collect();
        assert!(!fits_standard_invoke(&six));
        assert!(!fits_standard_invoke(&[Register::new(1), Register::new(16)]));

        assert!(is_consecutive(&[Register::new(4), Register::new(5), Register::new(6)]));
        assert!(!is_consecutive(&[Register::new(4), Register::new(6)]));
    }

    #[test]
    fn test_wide_arguments() {
        let args = [Register::new(1), Register::wide(2), Register::new(4)];
        assert_eq!(argument_words(&args), vec![1, 2, 3, 4]);
        assert!(fits_standard_invoke(&args));

        // Three longs need six words
        let longs = [Register::wide(0), Register::wide(2), Register::wide(4)];
        assert!(!fits_standard_invoke(&longs));
        // The high half of v15 would be v16
        assert!(!fits_standard_invoke(&[Register::wide(15)]));

        assert!(is_consecutive(&[Register::wide(0), Register::new(2)]));
        assert!(!is_consecutive(&[Register::wide(0), Register::new(1)]));
        assert!(is_consecutive(&longs));
    }

    #[test]
    fn test_wide() {
        let pair = Register::wide(2).with_flags(RegisterFlags::DESTINATION);
        assert!(pair.is_wide());
        assert_eq!(pair.slots(), 2);
        assert_eq!(pair.to_string(), "v2");
    }
}
