//! Primitive types shared by both source representations.
//!
//! CIL and JVM inputs disagree on signedness (`byte` is unsigned in CIL and signed on the JVM)
//! and on naming. [`PrimitiveKind`] is the unified set; [`crate::model::Module`] owns one
//! singleton reference per kind.

use std::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Namespace every primitive lives in.
pub const SYSTEM_NAMESPACE: &str = "System";

/// The primitive and special value types of the unified model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum PrimitiveKind {
    /// `System.Void`
    Void,
    /// `System.Boolean`
    Boolean,
    /// `System.Char`, UTF-16 code unit
    Char,
    /// `System.SByte`
    SByte,
    /// `System.Byte`
    Byte,
    /// `System.Int16`
    Int16,
    /// `System.UInt16`
    UInt16,
    /// `System.Int32`
    Int32,
    /// `System.UInt32`
    UInt32,
    /// `System.Int64`
    Int64,
    /// `System.UInt64`
    UInt64,
    /// `System.Single`
    Single,
    /// `System.Double`
    Double,
    /// `System.IntPtr`
    IntPtr,
    /// `System.UIntPtr`
    UIntPtr,
}

impl PrimitiveKind {
    /// Simple type name inside [`SYSTEM_NAMESPACE`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "Void",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::SByte => "SByte",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Int16 => "Int16",
            PrimitiveKind::UInt16 => "UInt16",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::UInt32 => "UInt32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::UInt64 => "UInt64",
            PrimitiveKind::Single => "Single",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::IntPtr => "IntPtr",
            PrimitiveKind::UIntPtr => "UIntPtr",
        }
    }

    /// Namespace-qualified name, e.g. `System.Int32`.
    #[must_use]
    pub fn full_name(self) -> String {
        format!("{SYSTEM_NAMESPACE}.{}", self.name())
    }

    /// Looks up a primitive by its namespace-qualified name.
    #[must_use]
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let name = full_name.strip_prefix("System.")?;
        PrimitiveKind::iter().find(|kind| kind.name() == name)
    }

    /// Maps a JVM base-type descriptor character.
    ///
    /// The JVM `byte` is signed, so `B` maps to [`PrimitiveKind::SByte`].
    #[must_use]
    pub fn from_descriptor(descriptor: char) -> Option<Self> {
        match descriptor {
            'V' => Some(PrimitiveKind::Void),
            'Z' => Some(PrimitiveKind::Boolean),
            'B' => Some(PrimitiveKind::SByte),
            'C' => Some(PrimitiveKind::Char),
            'S' => Some(PrimitiveKind::Int16),
            'I' => Some(PrimitiveKind::Int32),
            'J' => Some(PrimitiveKind::Int64),
            'F' => Some(PrimitiveKind::Single),
            'D' => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// The JVM class that boxes this primitive on the foreign side, if any.
    #[must_use]
    pub fn boxed_class(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Boolean => Some("java/lang/Boolean"),
            PrimitiveKind::Byte => Some("java/lang/Byte"),
            PrimitiveKind::Char => Some("java/lang/Character"),
            PrimitiveKind::Int16 => Some("java/lang/Short"),
            PrimitiveKind::Int32 => Some("java/lang/Integer"),
            PrimitiveKind::Int64 => Some("java/lang/Long"),
            PrimitiveKind::Single => Some("java/lang/Float"),
            PrimitiveKind::Double => Some("java/lang/Double"),
            _ => None,
        }
    }

    /// Inverse of [`PrimitiveKind::boxed_class`].
    #[must_use]
    pub fn from_boxed_class(class_name: &str) -> Option<Self> {
        PrimitiveKind::iter().find(|kind| kind.boxed_class() == Some(class_name))
    }

    /// Folds unsigned kinds onto their signed counterpart.
    ///
    /// The target runtime has no unsigned integer types, so signatures that only differ in
    /// signedness describe the same slot.
    #[must_use]
    pub fn signed(self) -> Self {
        match self {
            PrimitiveKind::Byte => PrimitiveKind::SByte,
            PrimitiveKind::UInt16 => PrimitiveKind::Int16,
            PrimitiveKind::UInt32 => PrimitiveKind::Int32,
            PrimitiveKind::UInt64 => PrimitiveKind::Int64,
            PrimitiveKind::UIntPtr => PrimitiveKind::IntPtr,
            other => other,
        }
    }

    /// True for kinds that occupy a register pair.
    #[must_use]
    pub fn is_wide(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 | PrimitiveKind::Double
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SYSTEM_NAMESPACE}.{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_round_trip() {
        for kind in PrimitiveKind::iter() {
            assert_eq!(PrimitiveKind::from_full_name(&kind.full_name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_full_name("System.Object"), None);
        assert_eq!(PrimitiveKind::from_full_name("Int32"), None);
    }

    #[test]
    fn test_descriptor_mapping() {
        assert_eq!(PrimitiveKind::from_descriptor('I'), Some(PrimitiveKind::Int32));
        assert_eq!(PrimitiveKind::from_descriptor('B'), Some(PrimitiveKind::SByte));
        assert_eq!(PrimitiveKind::from_descriptor('V'), Some(PrimitiveKind::Void));
        assert_eq!(PrimitiveKind::from_descriptor('L'), None);
    }

    #[test]
    fn test_boxed_classes() {
        assert_eq!(
            PrimitiveKind::from_boxed_class("java/lang/Integer"),
            Some(PrimitiveKind::Int32)
        );
        assert_eq!(
            PrimitiveKind::from_boxed_class("java/lang/Byte"),
            Some(PrimitiveKind::Byte)
        );
        assert_eq!(PrimitiveKind::from_boxed_class("java/lang/String"), None);
        assert_eq!(PrimitiveKind::Void.boxed_class(), None);
        assert_eq!(PrimitiveKind::COUNT, 15);
    }

    #[test]
    fn test_signed_folding() {
        assert_eq!(PrimitiveKind::Byte.signed(), PrimitiveKind::SByte);
        assert_eq!(PrimitiveKind::UInt32.signed(), PrimitiveKind::Int32);
        assert_eq!(PrimitiveKind::Char.signed(), PrimitiveKind::Char);
        assert!(PrimitiveKind::Double.is_wide());
        assert!(!PrimitiveKind::Single.is_wide());
    }
}
