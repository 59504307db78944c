use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount represented as **integer cents**.
///
/// Every amount the engine stores (expense totals, owed shares, account
/// balances) goes through this type, so splitting never drifts the way
/// floating point would.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Splits the amount evenly into `parts` shares.
    ///
    /// When the amount is not divisible, the leftover cents go one each to the
    /// first shares, so shares differ by at most one cent and always sum back
    /// to the original amount.
    ///
    /// Returns `None` for `parts == 0` or a non-positive amount.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    ///
    /// let shares = MoneyCents::new(100).split_even(3).unwrap();
    /// let cents: Vec<i64> = shares.iter().map(|s| s.cents()).collect();
    /// assert_eq!(cents, vec![34, 33, 33]);
    /// ```
    #[must_use]
    pub fn split_even(self, parts: usize) -> Option<Vec<MoneyCents>> {
        if parts == 0 || !self.is_positive() {
            return None;
        }
        let parts_i64 = i64::try_from(parts).ok()?;
        let base = self.0 / parts_i64;
        let remainder = usize::try_from(self.0 % parts_i64).ok()?;

        Some(
            (0..parts)
                .map(|idx| {
                    if idx < remainder {
                        MoneyCents(base + 1)
                    } else {
                        MoneyCents(base)
                    }
                })
                .collect(),
        )
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `-`.
    /// At most two fractional digits are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidInput(format!("invalid amount: {s}"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let digits = digits.replace(',', ".");
        let (units, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        if units.is_empty()
            || !units.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => fraction.parse::<i64>().map_err(|_| invalid())?,
            _ => {
                return Err(EngineError::InvalidInput(
                    "too many decimals".to_string(),
                ));
            }
        };

        let cents = units
            .parse::<i64>()
            .ok()
            .and_then(|v| v.checked_mul(100))
            .and_then(|v| v.checked_add(fraction_cents))
            .ok_or_else(|| EngineError::InvalidInput("amount too large".to_string()))?;

        Ok(MoneyCents(if negative { -cents } else { cents }))
    }
}
