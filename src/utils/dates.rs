//! Date enumeration and weekly grouping for the requested months.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{PipelineError, Result};

/// All days of the given months of a year, in calendar order.
pub fn days_in_months(year: i32, months: &[u32]) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for &month in months {
        let mut date = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => continue,
        };
        while date.month() == month {
            dates.push(date);
            date += Duration::days(1);
        }
    }
    dates
}

/// Split an ordered date list into consecutive groups of at most 7 days.
///
/// A group only closes when the next date would fall 7 or more days after the
/// group's first date, so a gap between requested months starts a new group
/// early.
pub fn group_into_weeks(dates: &[NaiveDate]) -> Vec<Vec<NaiveDate>> {
    let mut weeks: Vec<Vec<NaiveDate>> = Vec::new();
    for &date in dates {
        match weeks.last_mut() {
            Some(week) if (date - week[0]).num_days() < 7 => week.push(date),
            _ => weeks.push(vec![date]),
        }
    }
    weeks
}

/// Parse a month given as an English name, short name, or number.
pub fn parse_month(input: &str) -> Result<u32> {
    let normalized = input.trim().to_lowercase();
    if let Ok(n) = normalized.parse::<u32>() {
        if (1..=12).contains(&n) {
            return Ok(n);
        }
        return Err(PipelineError::InvalidMonth(input.to_string()));
    }
    let months = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    months
        .iter()
        .position(|m| *m == normalized || (normalized.len() >= 3 && m.starts_with(&normalized)))
        .map(|i| i as u32 + 1)
        .ok_or_else(|| PipelineError::InvalidMonth(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_months() {
        let days = days_in_months(2017, &[1]);
        assert_eq!(days.len(), 31);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(days[30], NaiveDate::from_ymd_opt(2017, 1, 31).unwrap());

        // leap year February
        assert_eq!(days_in_months(2020, &[2]).len(), 29);
        assert_eq!(days_in_months(2017, &[2]).len(), 28);
    }

    #[test]
    fn test_weekly_grouping_january_2017() {
        let days = days_in_months(2017, &[1]);
        let weeks = group_into_weeks(&days);

        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0], NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(weeks[4].len(), 3);
        for week in &weeks {
            let span = (*week.last().unwrap() - week[0]).num_days();
            assert!(span < 7, "week spans {} days from its start", span);
        }
    }

    #[test]
    fn test_weekly_grouping_restarts_on_month_gap() {
        // January and March: the gap must close the last January group
        let mut days = days_in_months(2017, &[1]);
        days.extend(days_in_months(2017, &[3]));
        let weeks = group_into_weeks(&days);

        let first_march = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let march_week = weeks.iter().find(|w| w.contains(&first_march)).unwrap();
        assert_eq!(march_week[0], first_march);
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("January").unwrap(), 1);
        assert_eq!(parse_month("september").unwrap(), 9);
        assert_eq!(parse_month("mar").unwrap(), 3);
        assert_eq!(parse_month("7").unwrap(), 7);
        assert!(parse_month("13").is_err());
        assert!(parse_month("smarch").is_err());
    }
}
