use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in integer paisa (1/100 of a rupee).
///
/// All order totals and payment amounts in the system are `Money`. Amount comparisons are exact integer equality;
/// there is no tolerance and no floating point anywhere in the settlement path.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paisa: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rs {}", self.to_rupee_string())
    }
}

impl Money {
    pub fn from_paisa(paisa: i64) -> Self {
        Self(paisa)
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// The amount in paisa.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Renders the amount in rupees the way the redirect-form gateways expect it: no decimal point for whole-rupee
    /// amounts, two decimal places otherwise. The signature is computed over this exact string, so initiation and
    /// verification must both use this method.
    pub fn to_rupee_string(&self) -> String {
        if self.0 % 100 == 0 {
            format!("{}", self.0 / 100)
        } else {
            format!("{}.{:02}", self.0 / 100, (self.0 % 100).abs())
        }
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a rupee-denominated decimal string ("850", "850.5", "850.50") into paisa.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let rupees = whole.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        let paisa = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))? * 10,
            2 => frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?,
            _ => return Err(MoneyConversionError(format!("{s}: too many decimal places"))),
        };
        if !(0..100).contains(&paisa) {
            return Err(MoneyConversionError(format!("{s}: invalid fractional part")));
        }
        let sign = if rupees < 0 { -1 } else { 1 };
        Ok(Self(rupees * 100 + sign * paisa))
    }
}
