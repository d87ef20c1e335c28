use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::locale::CalendarLocale;
use crate::error::ParseError;

static AUCTION_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<weekday>\p{L}+),\s*(?P<day>[0-9]{1,2})\.\s*(?P<month>\p{L}+)\s+(?P<year>-?[0-9]{1,6}),\s*(?P<hour>[0-9]{1,2}):(?P<minute>[0-9]{2})\s*Uhr\s*$",
    )
    .unwrap()
});

/// Parses auction dates such as `Montag, 23. Januar 2023, 09:30 Uhr`.
///
/// The weekday must be a known name but is not checked against the date.
/// Non-positive years are accepted as proleptic Gregorian dates.
pub struct DateNormalizer<'a> {
    locale: &'a CalendarLocale,
}

impl<'a> DateNormalizer<'a> {
    pub fn new(locale: &'a CalendarLocale) -> Self {
        DateNormalizer { locale }
    }

    pub fn parse(&self, text: &str) -> Result<NaiveDateTime, ParseError> {
        let caps = AUCTION_DATE_RE
            .captures(text)
            .ok_or_else(|| ParseError::DateShape(text.to_string()))?;

        if !self.locale.is_weekday(&caps["weekday"]) {
            return Err(ParseError::UnknownName {
                kind: "weekday",
                name: caps["weekday"].to_string(),
            });
        }
        let month = self.locale.month(&caps["month"]).ok_or_else(|| ParseError::UnknownName {
            kind: "month",
            name: caps["month"].to_string(),
        })?;

        let out_of_range = || ParseError::DateOutOfRange(text.to_string());
        let number = |name: &str| caps[name].parse::<u32>().map_err(|_| out_of_range());
        let year = caps["year"].parse::<i32>().map_err(|_| out_of_range())?;

        NaiveDate::from_ymd_opt(year, month, number("day")?)
            .and_then(|d| d.and_hms_opt(number("hour").ok()?, number("minute").ok()?, 0))
            .ok_or_else(out_of_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::locale::GERMAN;

    fn parse(s: &str) -> Result<NaiveDateTime, ParseError> {
        DateNormalizer::new(&GERMAN).parse(s)
    }

    #[test]
    fn long_form_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 23)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse("Montag, 23. Januar 2023, 09:30 Uhr"), Ok(expected));
    }

    #[test]
    fn umlaut_month() {
        let dt = parse("Mittwoch, 1. März 2023, 14:00 Uhr").unwrap();
        assert_eq!(dt.to_string(), "2023-03-01 14:00:00");
    }

    #[test]
    fn weekday_not_cross_checked() {
        // 23 January 2023 was a Monday
        assert!(parse("Freitag, 23. Januar 2023, 09:30 Uhr").is_ok());
    }

    #[test]
    fn negative_year_does_not_panic() {
        let result = parse("Montag, 30. November -1, 00:00 Uhr");
        if let Ok(dt) = result {
            assert_eq!(dt.to_string(), "-0001-11-30 00:00:00");
        }
        let _ = parse("Montag, 30. November 0, 00:00 Uhr");
        let _ = parse("Montag, 30. November -999999, 00:00 Uhr");
    }

    #[test]
    fn impossible_dates() {
        assert!(matches!(
            parse("Montag, 31. Februar 2023, 09:30 Uhr"),
            Err(ParseError::DateOutOfRange(_))
        ));
        assert!(matches!(
            parse("Montag, 1. Januar 2023, 25:00 Uhr"),
            Err(ParseError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn wrong_shape() {
        assert!(matches!(parse("23.01.2023"), Err(ParseError::DateShape(_))));
        assert!(matches!(
            parse("Monday, 23. January 2023, 09:30 Uhr"),
            Err(ParseError::UnknownName { kind: "weekday", .. })
        ));
        assert!(matches!(
            parse("Montag, 23. January 2023, 09:30 Uhr"),
            Err(ParseError::UnknownName { kind: "month", .. })
        ));
    }
}
