use lps_common::Naira;

use crate::PaystackApiError;

pub const KOBO_PER_NAIRA: i64 = 100;

/// The provider's wire format carries amounts in kobo. The rest of the system works in naira,
/// so this pair of functions is the only place the ×100 conversion happens.
pub fn naira_to_kobo(amount: Naira) -> Result<i64, PaystackApiError> {
    amount
        .value()
        .checked_mul(KOBO_PER_NAIRA)
        .ok_or_else(|| PaystackApiError::InvalidCurrencyAmount(format!("{amount} cannot be expressed in kobo")))
}

/// Whole-naira charges come back as exact multiples of 100; anything else truncates toward zero.
pub fn kobo_to_naira(kobo: i64) -> Naira {
    Naira::from(kobo / KOBO_PER_NAIRA)
}
