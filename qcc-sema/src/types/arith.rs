//! Arithmetic type kinds and conversions
//!
//! This module canonicalizes type-specifier bitsets into arithmetic
//! kinds, assigns LP64 widths, and implements integer promotion and the
//! usual arithmetic conversions.

use super::TypeError;
use qcc_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-specifier bits as accumulated by the parser while reading a
/// declaration-specifier list.
pub mod spec {
    pub const SIGNED: u32 = 1 << 0;
    pub const UNSIGNED: u32 = 1 << 1;
    pub const BOOL: u32 = 1 << 2;
    pub const CHAR: u32 = 1 << 3;
    pub const SHORT: u32 = 1 << 4;
    pub const INT: u32 = 1 << 5;
    pub const LONG: u32 = 1 << 6;
    pub const LONG_LONG: u32 = 1 << 7;
    pub const FLOAT: u32 = 1 << 8;
    pub const DOUBLE: u32 = 1 << 9;
    pub const COMPLEX: u32 = 1 << 10;
}

/// Describe a specifier bitset for diagnostics, e.g. "unsigned float"
pub fn spec_to_string(bits: u32) -> String {
    const NAMES: &[(u32, &str)] = &[
        (spec::SIGNED, "signed"),
        (spec::UNSIGNED, "unsigned"),
        (spec::BOOL, "_Bool"),
        (spec::CHAR, "char"),
        (spec::SHORT, "short"),
        (spec::INT, "int"),
        (spec::LONG, "long"),
        (spec::LONG_LONG, "long long"),
        (spec::FLOAT, "float"),
        (spec::DOUBLE, "double"),
        (spec::COMPLEX, "_Complex"),
    ];

    let mut out = String::new();
    for (bit, name) in NAMES {
        if bits & bit != 0 {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
        }
    }
    if out.is_empty() {
        out.push_str("<empty>");
    }
    out
}

/// Fold one more specifier token into an accumulated bitset.
///
/// A second `long` upgrades to `long long`; any other repeated specifier
/// is rejected.
pub fn combine_spec(bits: u32, tok: u32, location: &SourceLocation) -> Result<u32, TypeError> {
    if tok == spec::LONG && bits & spec::LONG != 0 {
        if bits & spec::LONG_LONG != 0 {
            return Err(TypeError::InvalidTypeSpec {
                spec: spec_to_string(bits | tok),
                location: location.clone(),
            });
        }
        return Ok((bits & !spec::LONG) | spec::LONG_LONG);
    }
    if bits & tok != 0 {
        return Err(TypeError::InvalidTypeSpec {
            spec: spec_to_string(bits),
            location: location.clone(),
        });
    }
    Ok(bits | tok)
}

/// Canonical arithmetic type kinds (LP64 target)
///
/// Plain `char` is a distinct type from `signed char`; it behaves signed
/// on this target. `long double` is folded into `Double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithKind {
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
}

impl ArithKind {
    /// Canonicalize a specifier bitset into an arithmetic kind.
    ///
    /// Resolves default sign (`short` alone is `signed short int`),
    /// defaults a lone `signed`/`unsigned` to `int`, and rejects
    /// incompatible combinations.
    pub fn from_spec(bits: u32, location: &SourceLocation) -> Result<ArithKind, TypeError> {
        use spec::*;

        let invalid = || TypeError::InvalidTypeSpec {
            spec: spec_to_string(bits),
            location: location.clone(),
        };

        let sign = bits & (SIGNED | UNSIGNED);
        if sign == SIGNED | UNSIGNED {
            return Err(invalid());
        }
        let is_unsigned = sign == UNSIGNED;
        let base = bits & !(SIGNED | UNSIGNED);

        let kind = match base {
            BOOL => {
                if sign != 0 {
                    return Err(invalid());
                }
                ArithKind::Bool
            }
            CHAR => match sign {
                0 => ArithKind::Char,
                SIGNED => ArithKind::SChar,
                _ => ArithKind::UChar,
            },
            _ if base == SHORT || base == SHORT | INT => {
                if is_unsigned {
                    ArithKind::UShort
                } else {
                    ArithKind::Short
                }
            }
            0 | INT => {
                if sign == 0 && base == 0 {
                    return Err(invalid());
                }
                if is_unsigned {
                    ArithKind::UInt
                } else {
                    ArithKind::Int
                }
            }
            _ if base == LONG || base == LONG | INT => {
                if is_unsigned {
                    ArithKind::ULong
                } else {
                    ArithKind::Long
                }
            }
            _ if base == LONG_LONG || base == LONG_LONG | INT => {
                if is_unsigned {
                    ArithKind::ULongLong
                } else {
                    ArithKind::LongLong
                }
            }
            FLOAT => {
                if sign != 0 {
                    return Err(invalid());
                }
                ArithKind::Float
            }
            // `long double` keeps double width on this target
            _ if base == DOUBLE || base == LONG | DOUBLE => {
                if sign != 0 {
                    return Err(invalid());
                }
                ArithKind::Double
            }
            _ if base == FLOAT | COMPLEX => {
                if sign != 0 {
                    return Err(invalid());
                }
                ArithKind::FloatComplex
            }
            _ if base == COMPLEX
                || base == DOUBLE | COMPLEX
                || base == LONG | DOUBLE | COMPLEX =>
            {
                if sign != 0 {
                    return Err(invalid());
                }
                ArithKind::DoubleComplex
            }
            _ => return Err(invalid()),
        };

        Ok(kind)
    }

    /// Storage size in bytes on the LP64 target
    pub fn width(self) -> u64 {
        match self {
            ArithKind::Bool | ArithKind::Char | ArithKind::SChar | ArithKind::UChar => 1,
            ArithKind::Short | ArithKind::UShort => 2,
            ArithKind::Int | ArithKind::UInt | ArithKind::Float => 4,
            ArithKind::Long
            | ArithKind::ULong
            | ArithKind::LongLong
            | ArithKind::ULongLong
            | ArithKind::Double
            | ArithKind::FloatComplex => 8,
            ArithKind::DoubleComplex => 16,
        }
    }

    /// Alignment in bytes (complex types align to their component)
    pub fn align(self) -> u64 {
        match self {
            ArithKind::FloatComplex => 4,
            ArithKind::DoubleComplex => 8,
            _ => self.width(),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ArithKind::Bool
                | ArithKind::Char
                | ArithKind::SChar
                | ArithKind::UChar
                | ArithKind::Short
                | ArithKind::UShort
                | ArithKind::Int
                | ArithKind::UInt
                | ArithKind::Long
                | ArithKind::ULong
                | ArithKind::LongLong
                | ArithKind::ULongLong
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ArithKind::Float | ArithKind::Double)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ArithKind::FloatComplex | ArithKind::DoubleComplex)
    }

    /// Plain `char` behaves signed on this target
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ArithKind::Char
                | ArithKind::SChar
                | ArithKind::Short
                | ArithKind::Int
                | ArithKind::Long
                | ArithKind::LongLong
        )
    }

    /// Integer conversion rank (integers only)
    fn rank(self) -> u32 {
        match self {
            ArithKind::Bool => 0,
            ArithKind::Char | ArithKind::SChar | ArithKind::UChar => 1,
            ArithKind::Short | ArithKind::UShort => 2,
            ArithKind::Int | ArithKind::UInt => 3,
            ArithKind::Long | ArithKind::ULong => 4,
            ArithKind::LongLong | ArithKind::ULongLong => 5,
            _ => unreachable!("rank of non-integer kind"),
        }
    }

    fn to_unsigned(self) -> ArithKind {
        match self {
            ArithKind::Char | ArithKind::SChar => ArithKind::UChar,
            ArithKind::Short => ArithKind::UShort,
            ArithKind::Int => ArithKind::UInt,
            ArithKind::Long => ArithKind::ULong,
            ArithKind::LongLong => ArithKind::ULongLong,
            other => other,
        }
    }

    /// Integer promotion: every kind of rank below `int` promotes to
    /// `int` (all their values fit on this target)
    pub fn promoted(self) -> ArithKind {
        if self.is_integer() && self.rank() < ArithKind::Int.rank() {
            ArithKind::Int
        } else {
            self
        }
    }
}

impl fmt::Display for ArithKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArithKind::Bool => "_Bool",
            ArithKind::Char => "char",
            ArithKind::SChar => "signed char",
            ArithKind::UChar => "unsigned char",
            ArithKind::Short => "short",
            ArithKind::UShort => "unsigned short",
            ArithKind::Int => "int",
            ArithKind::UInt => "unsigned int",
            ArithKind::Long => "long",
            ArithKind::ULong => "unsigned long",
            ArithKind::LongLong => "long long",
            ArithKind::ULongLong => "unsigned long long",
            ArithKind::Float => "float",
            ArithKind::Double => "double",
            ArithKind::FloatComplex => "float _Complex",
            ArithKind::DoubleComplex => "double _Complex",
        };
        write!(f, "{}", name)
    }
}

/// The usual arithmetic conversions: compute the common kind of a binary
/// operand pair. Symmetric and associative.
pub fn usual_arithmetic(a: ArithKind, b: ArithKind) -> ArithKind {
    if a.is_complex() || b.is_complex() {
        // The result is the complex version of the common real type
        let component = |k: ArithKind| match k {
            ArithKind::FloatComplex => ArithKind::Float,
            ArithKind::DoubleComplex => ArithKind::Double,
            other => other,
        };
        return match usual_arithmetic(component(a), component(b)) {
            ArithKind::Double => ArithKind::DoubleComplex,
            _ => ArithKind::FloatComplex,
        };
    }
    if a == ArithKind::Double || b == ArithKind::Double {
        return ArithKind::Double;
    }
    if a == ArithKind::Float || b == ArithKind::Float {
        return ArithKind::Float;
    }

    let a = a.promoted();
    let b = b.promoted();
    if a == b {
        return a;
    }

    let (lo, hi) = if a.rank() <= b.rank() { (a, b) } else { (b, a) };
    if lo.is_signed() == hi.is_signed() {
        return hi;
    }
    if hi.is_signed() {
        // Signed kind of higher rank: wins outright if it can represent
        // every value of the unsigned kind, otherwise both go unsigned
        if hi.width() > lo.width() {
            hi
        } else {
            hi.to_unsigned()
        }
    } else {
        hi
    }
}
