use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const NAIRA_CURRENCY_CODE: &str = "NGN";
pub const NAIRA_CURRENCY_CODE_LOWER: &str = "ngn";

//--------------------------------------       Naira         ---------------------------------------------------------

/// A currency amount in naira, the major unit. Conversions to and from kobo are the exclusive
/// business of the gateway client crate; nothing in here knows that kobo exist.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Naira(i64);

op!(binary Naira, Add, add);
op!(binary Naira, Sub, sub);
op!(inplace Naira, SubAssign, sub_assign);
op!(unary Naira, Neg, neg);

impl Mul<i64> for Naira {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Naira {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in naira: {0}")]
pub struct NairaConversionError(String);

impl From<i64> for Naira {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Naira {
    type Error = NairaConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(NairaConversionError(format!("Value {value} is too large to convert to Naira")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Naira {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}₦{}", group_thousands(self.0.unsigned_abs()))
    }
}

impl Naira {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
