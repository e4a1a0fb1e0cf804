use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Subscription period in the compact `unit.count` notation, e.g.
/// `mon.1` or `day.30`. The notation is stored in payment payloads and
/// payment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub unit: PeriodUnit,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum PeriodUnit {
    #[strum(serialize = "min")]
    Minute,
    #[strum(serialize = "day")]
    Day,
    #[strum(serialize = "mon")]
    Month,
    #[strum(serialize = "year")]
    Year,
}

impl Period {
    pub fn new(unit: PeriodUnit, count: u32) -> Period {
        Period { unit, count }
    }

    pub fn days(count: u32) -> Period {
        Period::new(PeriodUnit::Day, count)
    }

    pub fn months(count: u32) -> Period {
        Period::new(PeriodUnit::Month, count)
    }

    pub fn duration(&self) -> Duration {
        let count = self.count as i64;
        match self.unit {
            PeriodUnit::Minute => Duration::minutes(count),
            PeriodUnit::Day => Duration::days(count),
            PeriodUnit::Month => Duration::days(31 * count),
            PeriodUnit::Year => Duration::days(365 * count),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.unit, self.count)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid period notation: {0}")]
pub struct ParsePeriodError(String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (unit, count) = s
            .split_once('.')
            .ok_or_else(|| ParsePeriodError(s.to_owned()))?;
        let unit = unit
            .parse::<PeriodUnit>()
            .map_err(|_| ParsePeriodError(s.to_owned()))?;
        let count = count
            .parse::<u32>()
            .map_err(|_| ParsePeriodError(s.to_owned()))?;
        if count == 0 {
            return Err(ParsePeriodError(s.to_owned()));
        }
        Ok(Period { unit, count })
    }
}

impl Serialize for Period {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> Result<Period, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("mon.1".parse::<Period>().unwrap(), Period::months(1));
        assert_eq!("day.30".parse::<Period>().unwrap(), Period::days(30));
        assert_eq!(
            "min.15".parse::<Period>().unwrap(),
            Period::new(PeriodUnit::Minute, 15)
        );
        assert_eq!(
            "year.2".parse::<Period>().unwrap(),
            Period::new(PeriodUnit::Year, 2)
        );

        assert_eq!(Period::months(3).to_string(), "mon.3");
        assert_eq!(Period::days(7).to_string(), "day.7");
    }

    #[test]
    fn rejects_malformed_notation() {
        assert!("mon".parse::<Period>().is_err());
        assert!("mon.".parse::<Period>().is_err());
        assert!("week.1".parse::<Period>().is_err());
        assert!("mon.-1".parse::<Period>().is_err());
        assert!("mon.0".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(Period::days(30).duration(), Duration::days(30));
        assert_eq!(Period::months(1).duration(), Duration::days(31));
        assert_eq!(
            Period::new(PeriodUnit::Year, 1).duration(),
            Duration::days(365)
        );
        assert_eq!(
            Period::new(PeriodUnit::Minute, 5).duration(),
            Duration::minutes(5)
        );
    }
}
