//! Stable identities for definitions registered in a [`crate::model::Module`].
//!
//! Every type, method and field definition receives a token when it is registered. The high
//! byte names the kind of definition, the low 24 bits a per-kind row that is handed out in
//! registration order. Tokens never change for the lifetime of a module, which makes them the
//! key of the reachable set and of every cache in the reachability engine.

use std::fmt;

/// Table id for type definitions.
pub const TYPE_TABLE: u8 = 0x02;
/// Table id for field definitions.
pub const FIELD_TABLE: u8 = 0x04;
/// Table id for method definitions.
pub const METHOD_TABLE: u8 = 0x06;

/// The kind of definition a [`Token`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A type definition
    Type,
    /// A method definition
    Method,
    /// A field definition
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Type => write!(f, "type"),
            MemberKind::Method => write!(f, "method"),
            MemberKind::Field => write!(f, "field"),
        }
    }
}

/// Identity of a registered definition.
///
/// The high byte (bits 24-31) holds the table id, the low 24 bits (bits 0-23) the row within
/// that table. Row 0 is never handed out, so a zero token is the null token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Builds a token from a table id and row.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table id from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the kind of definition this token refers to, `None` for foreign table ids.
    #[must_use]
    pub fn kind(&self) -> Option<MemberKind> {
        match self.table() {
            TYPE_TABLE => Some(MemberKind::Type),
            METHOD_TABLE => Some(MemberKind::Method),
            FIELD_TABLE => Some(MemberKind::Field),
            _ => None,
        }
    }

    /// True for type definition tokens
    #[must_use]
    pub fn is_type(&self) -> bool {
        self.table() == TYPE_TABLE
    }

    /// True for method definition tokens
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.table() == METHOD_TABLE
    }

    /// True for field definition tokens
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.table() == FIELD_TABLE
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(METHOD_TABLE, 7);
        assert_eq!(token.value(), 0x0600_0007);
        assert_eq!(token.table(), METHOD_TABLE);
        assert_eq!(token.row(), 7);
    }

    #[test]
    fn test_token_row_is_masked() {
        let token = Token::from_parts(TYPE_TABLE, 0x0100_0001);
        assert_eq!(token.table(), TYPE_TABLE);
        assert_eq!(token.row(), 1);
    }

    #[test]
    fn test_token_kind() {
        assert_eq!(Token::from_parts(TYPE_TABLE, 1).kind(), Some(MemberKind::Type));
        assert_eq!(
            Token::from_parts(METHOD_TABLE, 1).kind(),
            Some(MemberKind::Method)
        );
        assert_eq!(Token::from_parts(FIELD_TABLE, 1).kind(), Some(MemberKind::Field));
        assert_eq!(Token::new(0x0A00_0001).kind(), None);

        assert!(Token::from_parts(TYPE_TABLE, 1).is_type());
        assert!(Token::from_parts(METHOD_TABLE, 1).is_method());
        assert!(Token::from_parts(FIELD_TABLE, 1).is_field());
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token::new(0).is_null());
        assert!(!Token::from_parts(TYPE_TABLE, 1).is_null());
    }

    #[test]
    fn test_token_display_and_debug() {
        let token = Token::from_parts(METHOD_TABLE, 1);
        assert_eq!(format!("{}", token), "0x06000001");

        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_ordering_groups_tables() {
        let ty = Token::from_parts(TYPE_TABLE, 500);
        let field = Token::from_parts(FIELD_TABLE, 1);
        let method = Token::from_parts(METHOD_TABLE, 1);

        assert!(ty < field);
        assert!(field < method);
    }

    #[test]
    fn test_token_hash_distinguishes_tables() {
        let mut set = HashSet::new();
        set.insert(Token::from_parts(TYPE_TABLE, 1));
        set.insert(Token::from_parts(METHOD_TABLE, 1));
        set.insert(Token::from_parts(FIELD_TABLE, 1));
        set.insert(Token::from_parts(TYPE_TABLE, 1));
        assert_eq!(set.len(), 3);
    }
}
