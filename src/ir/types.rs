//! First-class types of the IR.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A first-class IR type.
///
/// The IR knows a closed set of types: `void` for functions and calls that
/// produce nothing, fixed-width integers, and an opaque `ptr`. Function
/// addresses (`@name`) are values of type `ptr`.
///
/// Types print and parse in their lowercase text form:
///
/// ```rust
/// use callswap::ir::IrType;
///
/// assert_eq!(IrType::I32.to_string(), "i32");
/// assert_eq!("ptr".parse::<IrType>().unwrap(), IrType::Ptr);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum IrType {
    /// No value.
    Void,
    /// 1-bit integer, the type of comparisons and branch conditions.
    I1,
    /// 8-bit integer.
    I8,
    /// 16-bit integer.
    I16,
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// Opaque pointer.
    Ptr,
}

impl IrType {
    /// Returns the bit width of integer types, `None` otherwise.
    #[must_use]
    pub const fn bit_width(self) -> Option<u32> {
        match self {
            IrType::I1 => Some(1),
            IrType::I8 => Some(8),
            IrType::I16 => Some(16),
            IrType::I32 => Some(32),
            IrType::I64 => Some(64),
            IrType::Void | IrType::Ptr => None,
        }
    }

    /// Returns true for `i1` through `i64`.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        self.bit_width().is_some()
    }

    /// Returns true for `void`.
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self, IrType::Void)
    }

    /// Checks whether an integer literal is representable in this type.
    ///
    /// Literals may be written in either signed or unsigned form, so an `i8`
    /// accepts `-128..=255`. Non-integer types accept no literal.
    #[must_use]
    pub fn fits(self, literal: i64) -> bool {
        match self.bit_width() {
            None => false,
            Some(64) => true,
            Some(bits) => {
                let min = -(1i64 << (bits - 1));
                let max = (1i64 << bits) - 1;
                (min..=max).contains(&literal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_text_form_round_trips() {
        for ty in IrType::iter() {
            let text = ty.to_string();
            assert_eq!(text.parse::<IrType>().unwrap(), ty);
        }
        assert!("i128".parse::<IrType>().is_err());
    }

    #[test]
    fn test_literal_ranges() {
        assert!(IrType::I1.fits(0));
        assert!(IrType::I1.fits(1));
        assert!(!IrType::I1.fits(2));
        assert!(IrType::I8.fits(-128));
        assert!(IrType::I8.fits(255));
        assert!(!IrType::I8.fits(256));
        assert!(IrType::I32.fits(i64::from(i32::MIN)));
        assert!(IrType::I32.fits(i64::from(u32::MAX)));
        assert!(!IrType::I32.fits(i64::from(u32::MAX) + 1));
        assert!(IrType::I64.fits(i64::MIN));
        assert!(!IrType::Ptr.fits(0));
        assert!(!IrType::Void.fits(0));
    }
}
