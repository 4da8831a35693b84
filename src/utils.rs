use crate::error::{MaturityAnalysisError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Time window a scheduled payment falls into, measured in months after the report date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodBucket {
    /// On or before the report month; excluded from every total.
    Skip,
    Year1,
    Year2,
    Year3,
    Year4,
    Year5,
    Year6,
    Thereafter,
}

impl PeriodBucket {
    /// The seven buckets that carry amounts, in report column order.
    pub const MATURITY: [PeriodBucket; 7] = [
        PeriodBucket::Year1,
        PeriodBucket::Year2,
        PeriodBucket::Year3,
        PeriodBucket::Year4,
        PeriodBucket::Year5,
        PeriodBucket::Year6,
        PeriodBucket::Thereafter,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PeriodBucket::Skip => "skip",
            PeriodBucket::Year1 => "year1",
            PeriodBucket::Year2 => "year2",
            PeriodBucket::Year3 => "year3",
            PeriodBucket::Year4 => "year4",
            PeriodBucket::Year5 => "year5",
            PeriodBucket::Year6 => "year6",
            PeriodBucket::Thereafter => "thereafter",
        }
    }

    /// Position in the seven-slot sum array. `None` for `Skip`.
    pub fn slot(&self) -> Option<usize> {
        match self {
            PeriodBucket::Skip => None,
            PeriodBucket::Year1 => Some(0),
            PeriodBucket::Year2 => Some(1),
            PeriodBucket::Year3 => Some(2),
            PeriodBucket::Year4 => Some(3),
            PeriodBucket::Year5 => Some(4),
            PeriodBucket::Year6 => Some(5),
            PeriodBucket::Thereafter => Some(6),
        }
    }
}

/// Whole calendar months from the report month to the month of `date`.
/// Day-of-month is ignored on both sides. Computed in `i64` so any year pair is defined.
pub fn months_between(report_year: i32, report_month: u32, date: NaiveDate) -> i64 {
    (i64::from(date.year()) - i64::from(report_year)) * 12
        + (i64::from(date.month()) - i64::from(report_month))
}

/// Year 1 starts the month AFTER the report date; each bucket is a closed range of
/// twelve months (1..=12, 13..=24, ...), anything past month 72 is `Thereafter`.
pub fn calculate_period_bucket(
    payment_date: NaiveDate,
    report_year: i32,
    report_month: u32,
) -> PeriodBucket {
    let months_diff = months_between(report_year, report_month, payment_date);

    match months_diff {
        i64::MIN..=0 => PeriodBucket::Skip,
        1..=12 => PeriodBucket::Year1,
        13..=24 => PeriodBucket::Year2,
        25..=36 => PeriodBucket::Year3,
        37..=48 => PeriodBucket::Year4,
        49..=60 => PeriodBucket::Year5,
        61..=72 => PeriodBucket::Year6,
        _ => PeriodBucket::Thereafter,
    }
}

pub fn is_report_period(date: NaiveDate, report_year: i32, report_month: u32) -> bool {
    date.year() == report_year && date.month() == report_month
}

pub fn is_after_report_period(date: NaiveDate, report_year: i32, report_month: u32) -> bool {
    months_between(report_year, report_month, date) > 0
}

/// Lease term as (whole months, remaining days), counting the end date itself.
///
/// Either bound missing yields `(0, 0)`. The span is measured from `start` to the day after
/// `end`; month steps clamp to the last day of shorter months, so 2024-01-31 plus one month
/// is 2024-02-29. Spans that run backwards produce non-positive parts.
pub fn calculate_term(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (i32, i64) {
    let (Some(start), Some(end)) = (start, end) else {
        return (0, 0);
    };

    let Some(end) = end.checked_add_days(Days::new(1)) else {
        return (0, 0);
    };

    term_parts(start, end).unwrap_or((0, 0))
}

fn term_parts(start: NaiveDate, end: NaiveDate) -> Option<(i32, i64)> {
    let mut months = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);

    let mut anchor = shift_months(start, months)?;
    if end >= start && anchor > end {
        months -= 1;
        anchor = shift_months(start, months)?;
    } else if end < start && anchor < end {
        months += 1;
        anchor = shift_months(start, months)?;
    }

    Some((months, (end - anchor).num_days()))
}

fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Report years must be representable as calendar dates.
pub fn validate_report_year(year: i32) -> Result<()> {
    if !(NaiveDate::MIN.year()..=NaiveDate::MAX.year()).contains(&year) {
        return Err(MaturityAnalysisError::InvalidReportYear(year));
    }
    Ok(())
}

pub fn validate_report_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(MaturityAnalysisError::InvalidReportMonth(month));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bucket_boundaries() {
        // Report date 2024-01.
        assert_eq!(calculate_period_bucket(date(2024, 1, 31), 2024, 1), PeriodBucket::Skip);
        assert_eq!(calculate_period_bucket(date(2023, 6, 30), 2024, 1), PeriodBucket::Skip);
        assert_eq!(calculate_period_bucket(date(2024, 2, 1), 2024, 1), PeriodBucket::Year1);
        assert_eq!(calculate_period_bucket(date(2025, 1, 31), 2024, 1), PeriodBucket::Year1);
        assert_eq!(calculate_period_bucket(date(2025, 2, 28), 2024, 1), PeriodBucket::Year2);
        assert_eq!(calculate_period_bucket(date(2030, 1, 31), 2024, 1), PeriodBucket::Year6);
        assert_eq!(calculate_period_bucket(date(2030, 2, 28), 2024, 1), PeriodBucket::Thereafter);
    }

    #[test]
    fn test_every_month_offset_maps_to_one_bucket() {
        let expected = |diff: i32| match diff {
            d if d <= 0 => PeriodBucket::Skip,
            d if d > 72 => PeriodBucket::Thereafter,
            d => PeriodBucket::MATURITY[((d - 1) / 12) as usize],
        };

        let report = date(2023, 12, 1);
        for offset in -30i32..=100 {
            let payment = if offset >= 0 {
                report.checked_add_months(Months::new(offset as u32)).unwrap()
            } else {
                report.checked_sub_months(Months::new(offset.unsigned_abs())).unwrap()
            };
            assert_eq!(
                calculate_period_bucket(payment, 2023, 12),
                expected(offset),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_bucket_slots_follow_column_order() {
        for (idx, bucket) in PeriodBucket::MATURITY.iter().enumerate() {
            assert_eq!(bucket.slot(), Some(idx));
        }
        assert_eq!(PeriodBucket::Skip.slot(), None);
        assert_eq!(PeriodBucket::Thereafter.label(), "thereafter");
    }

    #[test]
    fn test_term_is_end_inclusive() {
        assert_eq!(
            calculate_term(Some(date(2024, 1, 1)), Some(date(2024, 1, 31))),
            (1, 0)
        );
        assert_eq!(
            calculate_term(Some(date(2020, 1, 1)), Some(date(2024, 12, 31))),
            (60, 0)
        );
        assert_eq!(
            calculate_term(Some(date(2024, 1, 15)), Some(date(2024, 3, 20))),
            (2, 6)
        );
    }

    #[test]
    fn test_term_clamps_month_ends() {
        // 2024-01-31 + 1 month = 2024-02-29, end (exclusive) = 2024-03-01.
        assert_eq!(
            calculate_term(Some(date(2024, 1, 31)), Some(date(2024, 2, 29))),
            (1, 1)
        );
    }

    #[test]
    fn test_term_missing_bounds() {
        assert_eq!(calculate_term(None, Some(date(2024, 1, 31))), (0, 0));
        assert_eq!(calculate_term(Some(date(2024, 1, 1)), None), (0, 0));
        assert_eq!(calculate_term(None, None), (0, 0));
    }

    #[test]
    fn test_term_backwards_span() {
        // end + 1 day = 2023-12-01, a month before the start.
        assert_eq!(
            calculate_term(Some(date(2024, 1, 1)), Some(date(2023, 11, 30))),
            (-1, 0)
        );
        assert_eq!(
            calculate_term(Some(date(2024, 1, 15)), Some(date(2024, 1, 9))),
            (0, -5)
        );
    }

    #[test]
    fn test_report_period_predicates() {
        assert!(is_report_period(date(2024, 6, 30), 2024, 6));
        assert!(!is_report_period(date(2023, 6, 30), 2024, 6));
        assert!(is_after_report_period(date(2024, 7, 1), 2024, 6));
        assert!(is_after_report_period(date(2025, 1, 1), 2024, 6));
        assert!(!is_after_report_period(date(2024, 6, 30), 2024, 6));
    }

    #[test]
    fn test_extreme_report_years_do_not_overflow() {
        let payment = date(2024, 3, 31);
        assert_eq!(
            calculate_period_bucket(payment, i32::MIN + 5, 1),
            PeriodBucket::Thereafter
        );
        assert_eq!(calculate_period_bucket(payment, i32::MAX, 12), PeriodBucket::Skip);
        assert!(is_after_report_period(payment, i32::MIN, 1));
        assert!(!is_after_report_period(payment, i32::MAX, 12));
    }

    #[test]
    fn test_validate_report_year() {
        assert!(validate_report_year(2024).is_ok());
        assert!(validate_report_year(NaiveDate::MIN.year()).is_ok());
        assert!(validate_report_year(NaiveDate::MAX.year()).is_ok());
        assert!(matches!(
            validate_report_year(i32::MIN + 5),
            Err(MaturityAnalysisError::InvalidReportYear(_))
        ));
        assert!(validate_report_year(i32::MAX).is_err());
    }

    #[test]
    fn test_validate_report_month() {
        assert!(validate_report_month(1).is_ok());
        assert!(validate_report_month(12).is_ok());
        assert!(validate_report_month(0).is_err());
        assert!(validate_report_month(13).is_err());
    }
}
