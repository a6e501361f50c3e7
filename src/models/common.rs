use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use entity::sea_orm_active_enums::{ContractStatus, GasPriceKind};

/// Nano-units per whole unit (9 decimal places, one MIST per nano-unit)
pub const NANOS_PER_UNIT: i64 = 1_000_000_000;
const SCALE_DIGITS: usize = 9;

/// Success envelope shared by every API response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFixedError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal string: {0}")]
    Invalid(String),
    #[error("more than 9 fractional digits: {0}")]
    TooPrecise(String),
    #[error("decimal out of range: {0}")]
    Overflow(String),
    #[error("price cannot be negative: {0}")]
    Negative(String),
}

fn parse_fixed(raw: &str) -> Result<i64, ParseFixedError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ParseFixedError::Empty);
    }

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (digits, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(ParseFixedError::Invalid(raw.to_string()));
    }
    if frac_part.len() > SCALE_DIGITS {
        return Err(ParseFixedError::TooPrecise(raw.to_string()));
    }

    let overflow = || ParseFixedError::Overflow(raw.to_string());
    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };
    let frac: i64 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac_part, width = SCALE_DIGITS);
        padded.parse().map_err(|_| overflow())?
    };

    let nanos = whole
        .checked_mul(NANOS_PER_UNIT)
        .and_then(|n| n.checked_add(frac))
        .ok_or_else(overflow)?;

    Ok(if negative { -nanos } else { nanos })
}

fn fmt_fixed(nanos: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();
    let scale = NANOS_PER_UNIT as u64;
    let whole = abs / scale;
    let frac = abs % scale;

    if frac == 0 {
        return write!(f, "{sign}{whole}");
    }

    let frac = format!("{:0width$}", frac, width = SCALE_DIGITS);
    write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
}

/// Fixed-point per-credit gas price, never negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_nanos(nanos: i64) -> Option<Self> {
        (nanos >= 0).then_some(Self(nanos))
    }

    pub fn nanos(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let nanos = parse_fixed(s)?;
        Price::from_nanos(nanos).ok_or_else(|| ParseFixedError::Negative(s.to_string()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, f)
    }
}

/// Signed fixed-point amount (savings, liability, exposure cap)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn nanos(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Sum of `amounts`, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |total, amount| total.checked_add(amount))
    }

    /// `credits * (market - locked)`; negative when the market is below the lock
    pub fn savings(credits: i64, market: Price, locked: Price) -> Option<Amount> {
        let spread = market.0 - locked.0;
        spread.checked_mul(credits).map(Amount)
    }

    /// Cost of `credits` at `price`
    pub fn cost(credits: i64, price: Price) -> Option<Amount> {
        price.0.checked_mul(credits).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, f)
    }
}


// Fixed-point values travel as decimal strings so no precision is lost in JSON.
macro_rules! decimal_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct DecimalVisitor;

                impl<'de> de::Visitor<'de> for DecimalVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("a decimal string")
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                        self.visit_str(&v.to_string())
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                        self.visit_str(&v.to_string())
                    }

                    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                        self.visit_str(&v.to_string())
                    }
                }

                deserializer.deserialize_any(DecimalVisitor)
            }
        }
    };
}

decimal_serde!(Price);
decimal_serde!(Amount);

/// Contract duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Term {
    ThirtyDays,
    SixtyDays,
    NinetyDays,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::ThirtyDays, Term::SixtyDays, Term::NinetyDays];

    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            30 => Some(Self::ThirtyDays),
            60 => Some(Self::SixtyDays),
            90 => Some(Self::NinetyDays),
            _ => None,
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Self::ThirtyDays => 30,
            Self::SixtyDays => 60,
            Self::NinetyDays => 90,
        }
    }

    pub fn duration(self) -> time::Duration {
        time::Duration::days(self.days())
    }
}

impl From<Term> for i64 {
    fn from(term: Term) -> Self {
        term.days()
    }
}

impl TryFrom<i64> for Term {
    type Error = String;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        Term::from_days(days).ok_or_else(|| format!("unsupported term: {days} days"))
    }
}
