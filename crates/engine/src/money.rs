use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::ValidationError;

/// Signed money amount represented as **integer cents** (minor units).
///
/// Use this type for **all** monetary values in the engine (expense totals,
/// shares, balances) to avoid floating-point drift across many splits. The
/// type does not carry a currency.
///
/// The value is signed:
/// - positive = is owed money / amount paid
/// - negative = owes money
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Largest magnitude accepted from input or a stored document.
    ///
    /// Documents hold amounts as JSON numbers in major units. Below this bound
    /// the cents -> `f64` -> cents trip is exact.
    pub const MAX: MoneyCents = MoneyCents(99_999_999_999_999);

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

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Parses user input and requires a strictly positive result.
    ///
    /// This is the rule applied to an expense total: non-numeric text and
    /// values `<= 0` are both rejected with `InvalidAmount`.
    pub fn parse_positive(text: &str) -> Result<Self, ValidationError> {
        let amount: MoneyCents = text.parse()?;
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount(
                "amount must be greater than 0".to_string(),
            ));
        }
        Ok(amount)
    }

    /// Converts an amount in major units (as found in JSON documents) into
    /// cents, rounding half away from zero.
    pub fn from_major_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidAmount(
                "amount is not a finite number".to_string(),
            ));
        }
        let scaled = (value * 100.0).round();
        if scaled.abs() > Self::MAX.0 as f64 {
            return Err(too_large());
        }
        Ok(MoneyCents(scaled as i64))
    }

    /// Accepts `cents` only within [`MoneyCents::MAX`].
    pub fn checked_new(cents: i64) -> Result<Self, ValidationError> {
        if cents.checked_abs().is_none_or(|abs| abs > Self::MAX.0) {
            return Err(too_large());
        }
        Ok(MoneyCents(cents))
    }

    /// Amount in major units, for display or JSON output only.
    #[must_use]
    pub fn to_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Divides the amount into `parts` shares rounded half away from zero to
    /// the cent.
    ///
    /// This is the per-person figure shown to users; it is not guaranteed to
    /// multiply back to the total. Use [`MoneyCents::allocate`] when the
    /// shares must add up.
    pub fn div_rounded(self, parts: usize) -> Result<MoneyCents, ValidationError> {
        let parts = parts_as_i64(parts)?;
        let quotient = self.0 / parts;
        let remainder = self.0 % parts;
        let rounded = if 2 * i128::from(remainder).abs() >= i128::from(parts) {
            quotient + self.0.signum()
        } else {
            quotient
        };
        Ok(MoneyCents(rounded))
    }

    /// Splits the amount into `parts` shares that add up to exactly the
    /// amount.
    ///
    /// Every share gets `floor(amount / parts)`; the remaining cents
    /// (`amount mod parts`) go one each to the first shares.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    ///
    /// let shares = MoneyCents::new(100_00).allocate(3).unwrap();
    /// assert_eq!(shares, vec![
    ///     MoneyCents::new(33_34),
    ///     MoneyCents::new(33_33),
    ///     MoneyCents::new(33_33),
    /// ]);
    /// ```
    pub fn allocate(self, parts: usize) -> Result<Vec<MoneyCents>, ValidationError> {
        let divisor = parts_as_i64(parts)?;
        let base = self.0.div_euclid(divisor);
        let remainder = self.0.rem_euclid(divisor) as usize;
        Ok((0..parts)
            .map(|index| {
                if index < remainder {
                    MoneyCents(base + 1)
                } else {
                    MoneyCents(base)
                }
            })
            .collect())
    }
}

fn too_large() -> ValidationError {
    ValidationError::InvalidAmount("amount too large".to_string())
}

fn parts_as_i64(parts: usize) -> Result<i64, ValidationError> {
    if parts == 0 {
        return Err(ValidationError::InsufficientParticipants);
    }
    i64::try_from(parts).map_err(|_| ValidationError::InvalidAmount("too many parts".to_string()))
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, Add::add)
    }
}

impl FromStr for MoneyCents {
    type Err = ValidationError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings (including `NaN` and `inf`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || ValidationError::InvalidAmount("empty amount".to_string());
        let invalid = || ValidationError::InvalidAmount("invalid amount".to_string());
        let overflow = || ValidationError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let cents: i64 = match cents_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => {
                        return Err(ValidationError::InvalidAmount(
                            "too many decimals".to_string(),
                        ));
                    }
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        MoneyCents::checked_new(signed)
    }
}

impl Serialize for MoneyCents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major_f64())
    }
}

impl<'de> Deserialize<'de> for MoneyCents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

/// Accepts JSON numbers in major units (`12.5`) and decimal strings (`"12,50"`).
struct MoneyVisitor;

impl de::Visitor<'_> for MoneyVisitor {
    type Value = MoneyCents;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount as a number or a decimal string")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        MoneyCents::from_major_f64(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        let cents = value.checked_mul(100).ok_or_else(|| E::custom(too_large()))?;
        MoneyCents::checked_new(cents).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        let cents = i64::try_from(value)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .ok_or_else(|| E::custom(too_large()))?;
        MoneyCents::checked_new(cents).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        value.parse().map_err(E::custom)
    }
}
