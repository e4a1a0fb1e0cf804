use eyre::{bail, eyre, Context as _, Result};
use model::decimal::Decimal;
use model::period::{Period, PeriodUnit};

/// One purchasable subscription length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub period: Period,
    pub price: Decimal,
}

impl Tariff {
    pub fn title(&self) -> String {
        let count = self.period.count;
        let unit = match self.period.unit {
            PeriodUnit::Minute => plural(count, "минута", "минуты", "минут"),
            PeriodUnit::Day => plural(count, "день", "дня", "дней"),
            PeriodUnit::Month => plural(count, "месяц", "месяца", "месяцев"),
            PeriodUnit::Year => plural(count, "год", "года", "лет"),
        };
        format!("{} {}", count, unit)
    }
}

/// Parses the `period:price` list from configuration, e.g.
/// `mon.1:500, mon.3:1350`.
pub fn parse_tariffs(raw: &str) -> Result<Vec<Tariff>> {
    let mut tariffs = vec![];
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let (period, price) = part
            .split_once(':')
            .ok_or_else(|| eyre!("Bad tariff notation: {}", part))?;
        tariffs.push(Tariff {
            period: period
                .trim()
                .parse()
                .context(format!("Bad tariff period: {}", period))?,
            price: price
                .trim()
                .parse()
                .context(format!("Bad tariff price: {}", price))?,
        });
    }
    if tariffs.is_empty() {
        bail!("No tariffs configured");
    }
    Ok(tariffs)
}

fn plural(count: u32, one: &str, few: &str, many: &str) -> String {
    let rem10 = count % 10;
    let rem100 = count % 100;
    if rem10 == 1 && rem100 != 11 {
        one.to_owned()
    } else if (2..=4).contains(&rem10) && !(12..=14).contains(&rem100) {
        few.to_owned()
    } else {
        many.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tariff_list() {
        let tariffs = parse_tariffs("mon.1:500, mon.3:1350").unwrap();
        assert_eq!(tariffs.len(), 2);
        assert_eq!(tariffs[0].period, Period::months(1));
        assert_eq!(tariffs[0].price, Decimal::int(500));
        assert_eq!(tariffs[1].period, Period::months(3));
        assert_eq!(tariffs[1].price, Decimal::int(1350));
    }

    #[test]
    fn rejects_malformed_tariffs() {
        assert!(parse_tariffs("").is_err());
        assert!(parse_tariffs("mon.1").is_err());
        assert!(parse_tariffs("mon.1:").is_err());
        assert!(parse_tariffs("week.1:500").is_err());
    }

    #[test]
    fn titles_are_declined() {
        let tariff = |notation: &str| parse_tariffs(notation).unwrap()[0].title();
        assert_eq!(tariff("mon.1:1"), "1 месяц");
        assert_eq!(tariff("mon.3:1"), "3 месяца");
        assert_eq!(tariff("mon.11:1"), "11 месяцев");
        assert_eq!(tariff("day.7:1"), "7 дней");
        assert_eq!(tariff("year.1:1"), "1 год");
    }
}
