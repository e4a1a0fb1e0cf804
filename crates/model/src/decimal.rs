use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DECIMALS: u8 = 2;

/// Fixed-point money amount with two decimal places.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i64);

impl Decimal {
    pub fn int(value: i64) -> Decimal {
        Decimal(value * 10i64.pow(DECIMALS as u32))
    }

    /// Whole minor units, e.g. kopecks. Telegram invoices price in
    /// these.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn from_minor_units(value: i64) -> Decimal {
        Decimal(value)
    }
}

impl Debug for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.0 as f64 / 10i64.pow(DECIMALS as u32) as f64;
        write!(f, "{:.2}", value)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.0 as f64 / 10i64.pow(DECIMALS as u32) as f64;
        write!(f, "{:.2}", value)
    }
}

impl From<f64> for Decimal {
    fn from(value: f64) -> Self {
        Decimal((value * 10f64.powi(DECIMALS as i32)) as i64)
    }
}

impl TryFrom<&str> for Decimal {
    type Error = ParseDecimalError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let val = value.parse::<f64>().map_err(|_| ParseDecimalError)?;
        Ok(Decimal((val * 10f64.powi(DECIMALS as i32)) as i64))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::try_from(s)
    }
}

#[derive(Debug)]
pub struct ParseDecimalError;

impl std::fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse decimal value")
    }
}

impl std::error::Error for ParseDecimalError {}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Decimal(value))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!("1500.00", format!("{}", Decimal::int(1500)));
        assert_eq!("-42.00", format!("{}", Decimal::int(-42)));
        assert_eq!("199.99", format!("{}", Decimal::from(199.99)));
        assert_eq!("0.10", format!("{}", Decimal::from(0.1)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Decimal::int(1500), Decimal::try_from("1500").unwrap());
        assert_eq!(Decimal::from(199.99), Decimal::try_from("199.99").unwrap());
        assert_eq!(Decimal::from(-0.5), Decimal::try_from("-0.5").unwrap());
        assert!(Decimal::try_from("money").is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(150000, Decimal::int(1500).minor_units());
        assert_eq!(19999, Decimal::from(199.99).minor_units());
        assert_eq!(Decimal::from(199.99), Decimal::from_minor_units(19999));
    }
}
