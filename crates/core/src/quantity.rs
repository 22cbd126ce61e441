//! Resource quantities (`2Gi`, `100M`, `1.5k`, `1e3`) with exact comparison.
//!
//! Follows the Kubernetes quantity grammar. The unit family is derived from the
//! suffix and is part of validation: volume sizes must be binary (`Ki`..`Ei`),
//! proxy body sizes must be decimal (no suffix or `m`/`k`..`E`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity as WireQuantity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity must not be empty")]
    Empty,
    #[error("quantity {0:?} has an invalid number")]
    InvalidNumber(String),
    #[error("quantity {raw:?} has an unknown suffix {suffix:?}")]
    UnknownSuffix { raw: String, suffix: String },
    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitFamily {
    /// `Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`
    BinarySi,
    /// no suffix, `n`, `u`, `m`, `k`, `M`, `G`, `T`, `P`, `E`
    DecimalSi,
    /// `e<N>` / `E<N>`
    DecimalExponent,
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinarySi => f.write_str("binary"),
            Self::DecimalSi => f.write_str("decimal"),
            Self::DecimalExponent => f.write_str("decimal exponent"),
        }
    }
}

/// Parsed quantity. Internally held in nano-units, rounded up like the API server does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    raw: String,
    nanos: i128,
    family: UnitFamily,
}

const NANOS: i128 = 1_000_000_000;

enum Scale {
    Binary(u32),
    Decimal(i32),
}

fn scale_for(suffix: &str) -> Option<(Scale, UnitFamily)> {
    let s = match suffix {
        "Ki" => Scale::Binary(10),
        "Mi" => Scale::Binary(20),
        "Gi" => Scale::Binary(30),
        "Ti" => Scale::Binary(40),
        "Pi" => Scale::Binary(50),
        "Ei" => Scale::Binary(60),
        "n" => Scale::Decimal(-9),
        "u" => Scale::Decimal(-6),
        "m" => Scale::Decimal(-3),
        "" => Scale::Decimal(0),
        "k" => Scale::Decimal(3),
        "M" => Scale::Decimal(6),
        "G" => Scale::Decimal(9),
        "T" => Scale::Decimal(12),
        "P" => Scale::Decimal(15),
        "E" => Scale::Decimal(18),
        _ => {
            let exp = suffix.strip_prefix('e').or_else(|| suffix.strip_prefix('E'))?;
            let exp: i32 = exp.parse().ok()?;
            return Some((Scale::Decimal(exp), UnitFamily::DecimalExponent));
        }
    };
    let family = if matches!(s, Scale::Binary(_)) { UnitFamily::BinarySi } else { UnitFamily::DecimalSi };
    Some((s, family))
}

fn pow10(exp: u32) -> Option<i128> { 10i128.checked_pow(exp) }

fn div_ceil(n: i128, d: i128) -> i128 {
    let q = n / d;
    if n % d != 0 && (n > 0) == (d > 0) { q + 1 } else { q }
}

impl Quantity {
    pub fn raw(&self) -> &str { &self.raw }
    pub fn family(&self) -> UnitFamily { self.family }

    /// Value in nano-units (`1` == `1_000_000_000`).
    pub fn nanos(&self) -> i128 { self.nanos }

    pub fn is_binary(&self) -> bool { self.family == UnitFamily::BinarySi }
    pub fn is_decimal(&self) -> bool { self.family == UnitFamily::DecimalSi }

    pub fn to_wire(&self) -> WireQuantity { WireQuantity(self.raw.clone()) }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() { return Err(QuantityError::Empty); }
        let split = raw
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
            .map(|(i, _)| i)
            .unwrap_or(raw.len());
        let (number, suffix) = raw.split_at(split);
        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number.strip_prefix('+').unwrap_or(number)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if (int_part.is_empty() && frac_part.is_empty())
            || !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(QuantityError::InvalidNumber(raw.to_string()));
        }
        let (scale, family) = scale_for(suffix)
            .ok_or_else(|| QuantityError::UnknownSuffix { raw: raw.to_string(), suffix: suffix.to_string() })?;

        let out_of_range = || QuantityError::OutOfRange(raw.to_string());
        let mantissa: i128 = format!("{}{}", int_part, frac_part).parse().map_err(|_| out_of_range())?;
        let frac_digits = frac_part.len() as u32;
        let denom = pow10(frac_digits).ok_or_else(out_of_range)?;

        let nanos = match scale {
            Scale::Binary(shift) => {
                let mult = (1i128 << shift).checked_mul(NANOS).ok_or_else(out_of_range)?;
                div_ceil(mantissa.checked_mul(mult).ok_or_else(out_of_range)?, denom)
            }
            Scale::Decimal(exp) => {
                // value * 10^(exp + 9) / 10^frac
                let shift = exp + 9 - frac_digits as i32;
                if shift >= 0 {
                    mantissa.checked_mul(pow10(shift as u32).ok_or_else(out_of_range)?).ok_or_else(out_of_range)?
                } else {
                    match pow10(shift.unsigned_abs()) {
                        Some(d) => div_ceil(mantissa, d),
                        // far below one nano-unit
                        None => if mantissa == 0 { 0 } else { 1 },
                    }
                }
            }
        };
        let nanos = if negative { -nanos } else { nanos };
        Ok(Self { raw: raw.to_string(), nanos, family })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self { q.raw }
}

impl TryFrom<&WireQuantity> for Quantity {
    type Error = QuantityError;
    fn try_from(q: &WireQuantity) -> Result<Self, Self::Error> { q.0.parse() }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool { self.nanos == other.nanos }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) { self.nanos.hash(state) }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering { self.nanos.cmp(&other.nanos) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity { s.parse().unwrap() }

    #[test]
    fn binary_and_decimal_families() {
        assert_eq!(q("2Gi").family(), UnitFamily::BinarySi);
        assert_eq!(q("100M").family(), UnitFamily::DecimalSi);
        assert_eq!(q("100").family(), UnitFamily::DecimalSi);
        assert_eq!(q("1e3").family(), UnitFamily::DecimalExponent);
    }

    #[test]
    fn compares_numerically_across_notations() {
        assert_eq!(q("1Ki"), q("1024"));
        assert_eq!(q("1k"), q("1e3"));
        assert_eq!(q("1.5Gi"), q("1536Mi"));
        assert_eq!(q("500m").nanos(), 500_000_000);
        assert!(q("2Gi") > q("1Gi"));
        assert!(q("1G") < q("1Gi"));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Quantity>().unwrap_err(), QuantityError::Empty);
        assert!(matches!("1Xi".parse::<Quantity>(), Err(QuantityError::UnknownSuffix { .. })));
        assert!(matches!("Gi".parse::<Quantity>(), Err(QuantityError::InvalidNumber(_))));
        assert!(matches!("1.2.3".parse::<Quantity>(), Err(QuantityError::InvalidNumber(_))));
    }

    #[test]
    fn wire_roundtrip_keeps_raw_text() {
        let w = WireQuantity("10Gi".to_string());
        let parsed = Quantity::try_from(&w).unwrap();
        assert_eq!(parsed.to_wire(), w);
    }
}
