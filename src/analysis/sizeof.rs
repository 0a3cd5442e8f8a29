//! # Numeric Table
//!
//! @title Primitive Type Widths
//! @author Ramprasad
//!
//! Byte widths used to evaluate `sizeof` and element multipliers. `long` is
//! 4 bytes, matching the 32-bit targets the findings are calibrated against.

use crate::parser::TypeName;

/// Width of any pointer type.
pub const POINTER_WIDTH: i64 = 8;

/// Width of `wchar_t`, the unit of the wide-character copy functions.
pub const WCHAR_WIDTH: i64 = 4;

const WIDTHS: &[(&str, i64)] = &[
    ("char", 1),
    ("signed char", 1),
    ("unsigned char", 1),
    ("void", 1),
    ("short", 2),
    ("short int", 2),
    ("signed short", 2),
    ("unsigned short", 2),
    ("unsigned short int", 2),
    ("int", 4),
    ("signed", 4),
    ("signed int", 4),
    ("unsigned", 4),
    ("unsigned int", 4),
    ("long", 4),
    ("long int", 4),
    ("signed long", 4),
    ("unsigned long", 4),
    ("unsigned long int", 4),
    ("long long", 8),
    ("long long int", 8),
    ("signed long long", 8),
    ("unsigned long long", 8),
    ("unsigned long long int", 8),
    ("float", 4),
    ("double", 8),
    ("wchar_t", WCHAR_WIDTH),
    ("size_t", POINTER_WIDTH),
];

/// Width of a base type name, or `None` when it is not a known primitive.
pub fn width_of(base: &str) -> Option<i64> {
    WIDTHS
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, width)| *width)
}

/// Width of a complete type, treating every pointer as [`POINTER_WIDTH`].
pub fn type_width(ty: &TypeName) -> Option<i64> {
    if ty.pointer > 0 {
        Some(POINTER_WIDTH)
    } else {
        width_of(&ty.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_widths() {
        assert_eq!(width_of("char"), Some(1));
        assert_eq!(width_of("unsigned short"), Some(2));
        assert_eq!(width_of("long"), Some(4));
        assert_eq!(width_of("unsigned long long"), Some(8));
        assert_eq!(width_of("struct record"), None);
    }

    #[test]
    fn test_pointer_width_overrides_base() {
        let mut ty = TypeName::named("char");
        assert_eq!(type_width(&ty), Some(1));
        ty.pointer = 1;
        assert_eq!(type_width(&ty), Some(POINTER_WIDTH));
    }
}
