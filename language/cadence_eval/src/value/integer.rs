//! The numeric value engine.
//!
//! All members of the numeric family share one representation: the
//! declared kind plus an exact big integer (fixed-point kinds store the
//! value scaled by 10^8). Every operation on a bounded kind checks its
//! range and signals overflow or underflow; `Word*` kinds wrap modulo
//! 2ⁿ without error; `Int` and `UInt` never overflow.

use std::cmp::Ordering;
use std::fmt;

use cadence_types::NumericType;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::errors::{EvalResult, RuntimeError};

/// Fixed-point scale: 8 fractional decimal digits.
pub const FIXED_POINT_SCALE: i64 = 100_000_000;

/// A numeric value of any kind in the family.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IntegerValue {
    kind: NumericType,
    value: BigInt,
}

impl IntegerValue {
    /// Construct, checking the kind's range (or wrapping for words).
    pub fn new(kind: NumericType, value: BigInt) -> EvalResult<Self> {
        let value = normalize(kind, value)?;
        Ok(IntegerValue { kind, value })
    }

    /// An unchecked constructor for values already known in range.
    pub(crate) fn raw(kind: NumericType, value: BigInt) -> Self {
        IntegerValue { kind, value }
    }

    pub fn kind(&self) -> NumericType {
        self.kind
    }

    /// The exact inner value; scaled by 10^8 for fixed-point kinds.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn to_usize(&self) -> Option<usize> {
        self.value.to_usize()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    pub fn checked_add(&self, other: &IntegerValue) -> EvalResult<IntegerValue> {
        self.binary_op(other, |a, b| Ok(a + b))
    }

    pub fn checked_sub(&self, other: &IntegerValue) -> EvalResult<IntegerValue> {
        self.binary_op(other, |a, b| Ok(a - b))
    }

    pub fn checked_mul(&self, other: &IntegerValue) -> EvalResult<IntegerValue> {
        let scale = self.kind.is_fixed_point();
        self.binary_op(other, move |a, b| {
            let product = a * b;
            Ok(if scale {
                // Reduce through the doubled scale; exact arithmetic, then
                // truncate toward zero.
                product / FIXED_POINT_SCALE
            } else {
                product
            })
        })
    }

    pub fn checked_div(&self, other: &IntegerValue) -> EvalResult<IntegerValue> {
        let scale = self.kind.is_fixed_point();
        self.binary_op(other, move |a, b| {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(if scale {
                (a * FIXED_POINT_SCALE) / b
            } else {
                a / b
            })
        })
    }

    pub fn checked_rem(&self, other: &IntegerValue) -> EvalResult<IntegerValue> {
        self.binary_op(other, |a, b| {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(a % b)
        })
    }

    pub fn checked_neg(&self) -> EvalResult<IntegerValue> {
        if !self.kind.is_signed() {
            return Err(RuntimeError::Underflow {
                type_name: self.kind.name(),
            });
        }
        IntegerValue::new(self.kind, -&self.value)
    }

    pub fn compare(&self, other: &IntegerValue) -> Option<Ordering> {
        if self.kind != other.kind {
            return None;
        }
        Some(self.value.cmp(&other.value))
    }

    fn binary_op(
        &self,
        other: &IntegerValue,
        op: impl FnOnce(&BigInt, &BigInt) -> EvalResult<BigInt>,
    ) -> EvalResult<IntegerValue> {
        if self.kind != other.kind {
            return Err(RuntimeError::Internal(format!(
                "mixed numeric kinds {} and {}",
                self.kind, other.kind
            )));
        }
        let result = op(&self.value, &other.value)?;
        IntegerValue::new(self.kind, result)
    }
}

/// Check a raw result against the kind's range; wrap for word kinds.
fn normalize(kind: NumericType, value: BigInt) -> EvalResult<BigInt> {
    if kind.is_word() {
        let width = kind.bit_width().expect("word kinds are bounded");
        let modulus = BigInt::from(1) << width;
        let wrapped = ((value % &modulus) + &modulus) % &modulus;
        return Ok(wrapped);
    }
    if kind.is_fixed_point() {
        let (min, max) = fixed_point_range(kind);
        if value > max {
            return Err(RuntimeError::Overflow {
                type_name: kind.name(),
            });
        }
        if value < min {
            return Err(RuntimeError::Underflow {
                type_name: kind.name(),
            });
        }
        return Ok(value);
    }
    match kind.integer_range() {
        Some((min, max)) => {
            if value > max {
                Err(RuntimeError::Overflow {
                    type_name: kind.name(),
                })
            } else if value < min {
                Err(RuntimeError::Underflow {
                    type_name: kind.name(),
                })
            } else {
                Ok(value)
            }
        }
        None => {
            // Int is unbounded; UInt may not go below zero.
            if kind == NumericType::UInt && value.is_negative() {
                Err(RuntimeError::Underflow { type_name: "UInt" })
            } else {
                Ok(value)
            }
        }
    }
}

/// Scaled bounds of the fixed-point kinds.
fn fixed_point_range(kind: NumericType) -> (BigInt, BigInt) {
    match kind {
        NumericType::Fix64 => (BigInt::from(i64::MIN), BigInt::from(i64::MAX)),
        NumericType::UFix64 => (BigInt::from(0u8), BigInt::from(u64::MAX)),
        _ => unreachable!("not a fixed-point kind"),
    }
}

impl fmt::Debug for IntegerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.value)
    }
}

impl fmt::Display for IntegerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_fixed_point() {
            let scale = BigInt::from(FIXED_POINT_SCALE);
            let integer = &self.value / &scale;
            let fraction = (&self.value % &scale).abs();
            let sign = if self.value.is_negative() && integer.is_zero() {
                "-"
            } else {
                ""
            };
            write!(f, "{sign}{integer}.{:08}", fraction)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn int(kind: NumericType, v: i64) -> IntegerValue {
        IntegerValue::new(kind, BigInt::from(v)).unwrap()
    }

    #[test_case(NumericType::UInt8, 255, 1; "uint8 at max")]
    #[test_case(NumericType::UInt16, 65_535, 1; "uint16 at max")]
    #[test_case(NumericType::Int8, 127, 1; "int8 at max")]
    fn test_bounded_addition_overflows(kind: NumericType, a: i64, b: i64) {
        let err = int(kind, a).checked_add(&int(kind, b)).unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { .. }), "got {err:?}");
    }

    #[test]
    fn test_unsigned_subtraction_underflows() {
        let err = int(NumericType::UInt8, 0)
            .checked_sub(&int(NumericType::UInt8, 1))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Underflow { .. }));
    }

    #[test_case(NumericType::Word8, 255, 1, 0; "word8 wraps at width")]
    #[test_case(NumericType::Word16, 65_535, 2, 1; "word16 wraps at width")]
    #[test_case(NumericType::Word8, 200, 100, 44; "word8 wraps mid range")]
    fn test_word_addition_wraps(kind: NumericType, a: i64, b: i64, expected: i64) {
        let result = int(kind, a).checked_add(&int(kind, b)).unwrap();
        assert_eq!(result.value(), &BigInt::from(expected));
    }

    #[test]
    fn test_word_subtraction_wraps() {
        let result = int(NumericType::Word8, 0)
            .checked_sub(&int(NumericType::Word8, 1))
            .unwrap();
        assert_eq!(result.value(), &BigInt::from(255));
    }

    #[test]
    fn test_division_by_zero() {
        let err = int(NumericType::Int, 1)
            .checked_div(&int(NumericType::Int, 0))
            .unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn test_unbounded_int_grows() {
        let big = int(NumericType::Int, i64::MAX);
        let result = big.checked_mul(&big).unwrap();
        assert_eq!(
            result.value(),
            &(BigInt::from(i64::MAX) * BigInt::from(i64::MAX))
        );
    }

    #[test]
    fn test_uint_floor_is_zero() {
        let err = int(NumericType::UInt, 0)
            .checked_sub(&int(NumericType::UInt, 1))
            .unwrap_err();
        assert_eq!(err, RuntimeError::Underflow { type_name: "UInt" });
    }

    #[test]
    fn test_fixed_point_multiplication_reduces_scale() {
        // 1.5 * 2.0 == 3.0
        let a = IntegerValue::new(NumericType::Fix64, BigInt::from(150_000_000i64)).unwrap();
        let b = IntegerValue::new(NumericType::Fix64, BigInt::from(200_000_000i64)).unwrap();
        let product = a.checked_mul(&b).unwrap();
        assert_eq!(product.value(), &BigInt::from(300_000_000i64));

        // 3.0 / 2.0 == 1.5
        let quotient = product.checked_div(&b).unwrap();
        assert_eq!(quotient.value(), &BigInt::from(150_000_000i64));
    }

    #[test]
    fn test_fixed_point_display() {
        let v = IntegerValue::new(NumericType::Fix64, BigInt::from(150_000_000i64)).unwrap();
        assert_eq!(v.to_string(), "1.50000000");
        let v = IntegerValue::new(NumericType::Fix64, BigInt::from(-50_000_000i64)).unwrap();
        assert_eq!(v.to_string(), "-0.50000000");
    }

    #[test]
    fn test_int256_range() {
        let max: BigInt = (BigInt::from(1i32) << 255) - 1;
        assert!(IntegerValue::new(NumericType::Int256, max.clone()).is_ok());
        assert!(matches!(
            IntegerValue::new(NumericType::Int256, max + 1),
            Err(RuntimeError::Overflow { .. })
        ));
    }
}
