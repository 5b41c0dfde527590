use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A signed amount in Korean won. Sub-won precision is kept to two places so
/// that values read back from a spreadsheet float compare exactly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn from_won(won: i64) -> Self {
        Money(Decimal::from(won))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    /// Spreadsheet cells hold `f64`; rounding to two places recovers the
    /// decimal that was written.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Money::from_decimal)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// `self / denominator`, or zero when the denominator is zero.
    pub fn ratio_of(self, denominator: Money) -> Decimal {
        if !denominator.is_zero() {
            self.0 / denominator.0
        } else {
            Decimal::ZERO
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round();
        let digits = rounded.abs().trunc().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-₩{grouped}")
        } else {
            write!(f, "₩{grouped}")
        }
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::from_won(1_234_567).to_string(), "₩1,234,567");
        assert_eq!(Money::from_won(100).to_string(), "₩100");
        assert_eq!(Money::from_won(-5000).to_string(), "-₩5,000");
        assert_eq!(Money::zero().to_string(), "₩0");
    }

    #[test]
    fn ratio_of_zero_denominator_is_zero() {
        assert_eq!(Money::from_won(500).ratio_of(Money::zero()), Decimal::ZERO);
    }

    #[test]
    fn ratio_of_negative_denominator_divides() {
        let r = Money::from_won(500).ratio_of(Money::from_won(-1000));
        assert_eq!(r, Decimal::new(-5, 1));
    }

    #[test]
    fn ratio_of_divides() {
        let r = Money::from_won(250).ratio_of(Money::from_won(1000));
        assert_eq!(r, Decimal::new(25, 2));
    }

    #[test]
    fn from_f64_recovers_written_value() {
        let m = Money::from_decimal(Decimal::new(1234567, 2));
        assert_eq!(Money::from_f64(m.to_f64()), Some(m));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [100, 200, -50].iter().map(|w| Money::from_won(*w)).sum();
        assert_eq!(total, Money::from_won(250));
    }
}
