//! Builtin and ideal type tables.
//!
//! Untyped constants live in `ideal-*` universes that promote when
//! combined with concrete numeric types. The ladder is materialized as
//! an ordered enum so mixed-type constant expressions compare without
//! string gymnastics.

use crate::syntax::ast::LitKind;

/// Literal type in constant context.
pub fn const_lit_type(kind: LitKind) -> &'static str {
    match kind {
        LitKind::Int => "ideal-int",
        LitKind::Float => "ideal-float",
        LitKind::Str => "ideal-string",
        LitKind::Char => "ideal-char",
        LitKind::Imag => "ideal-imag",
    }
}

/// Literal type in variable context.
pub fn var_lit_type(kind: LitKind) -> &'static str {
    match kind {
        LitKind::Int => "int",
        LitKind::Float => "float64",
        LitKind::Str => "string",
        LitKind::Char => "rune",
        LitKind::Imag => "complex128",
    }
}

pub const BUILTIN_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr",
];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// Promotion rank of a constant's type, higher wins. Types outside the
/// ladder rank above everything (they only meet when the operands
/// disagree in a foreign way, and then either answer is as good).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConstRank {
    IdealChar = 90,
    SmallInt = 91,
    IdealInt = 92,
    NativeInt = 93,
    Int64 = 94,
    Float32 = 95,
    IdealFloat = 96,
    Float64 = 97,
    Complex64 = 98,
    IdealImag = 99,
    Complex128 = 100,
    Foreign = 101,
}

pub fn const_rank(typ: &str) -> ConstRank {
    match typ {
        "complex128" => ConstRank::Complex128,
        "ideal-imag" => ConstRank::IdealImag,
        "complex64" => ConstRank::Complex64,
        "float64" => ConstRank::Float64,
        "ideal-float" => ConstRank::IdealFloat,
        "float32" => ConstRank::Float32,
        "int64" => ConstRank::Int64,
        "int" | "uint" | "uintptr" => ConstRank::NativeInt,
        "ideal-int" => ConstRank::IdealInt,
        "int16" | "uint16" | "int8" | "uint8" | "byte" => ConstRank::SmallInt,
        "ideal-char" => ConstRank::IdealChar,
        _ => ConstRank::Foreign,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering_matches_promotion_table() {
        assert!(const_rank("complex128") > const_rank("ideal-imag"));
        assert!(const_rank("ideal-float") > const_rank("float32"));
        assert!(const_rank("int") > const_rank("ideal-int"));
        assert!(const_rank("ideal-int") > const_rank("byte"));
        assert!(const_rank("byte") > const_rank("ideal-char"));
        assert_eq!(const_rank("uint"), const_rank("uintptr"));
    }

    #[test]
    fn test_foreign_types_outrank_everything() {
        assert!(const_rank("time.Duration") > const_rank("complex128"));
    }

    #[test]
    fn test_literal_tables() {
        assert_eq!(const_lit_type(LitKind::Int), "ideal-int");
        assert_eq!(var_lit_type(LitKind::Int), "int");
        assert_eq!(var_lit_type(LitKind::Char), "rune");
        assert_eq!(var_lit_type(LitKind::Imag), "complex128");
    }
}
