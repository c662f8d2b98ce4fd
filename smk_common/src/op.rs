//! Operator-derivation helpers for single-field tuple structs.
//!
//! The wrappers in this crate (e.g. [`crate::Kes`]) are thin newtypes over `i64`. Rather than hand-writing the
//! arithmetic trait impls for each of them, `op!` forwards the operation to the inner value.

/// Derive a `std::ops` trait for a newtype over a single numeric field.
///
/// * `op!(binary T, Add, add)` implements `Add for T`
/// * `op!(inplace T, SubAssign, sub_assign)` implements `SubAssign for T`
/// * `op!(unary T, Neg, neg)` implements `Neg for T`
#[macro_export]
macro_rules! op {
    (binary $t:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $t:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0);
            }
        }
    };
    (unary $t:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
