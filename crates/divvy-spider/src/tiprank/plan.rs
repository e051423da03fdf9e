use chrono::{Days, NaiveDate};
use std::fmt;

/// A named fetch-date-range strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobMode {
    /// Today only.
    SingleDay,
    /// Today and the 7 days before it.
    PreviousWeek,
    /// Today and the 7 days after it.
    NextWeek,
    /// Today and the 365 days before it.
    PreviousYear,
    /// One week ahead of today.
    Daily,
}

impl JobMode {
    pub const ALL: [JobMode; 5] = [
        JobMode::SingleDay,
        JobMode::PreviousWeek,
        JobMode::NextWeek,
        JobMode::PreviousYear,
        JobMode::Daily,
    ];

    /// Day offsets from today, in request order.
    fn offsets(&self) -> Vec<i64> {
        match self {
            JobMode::SingleDay => vec![0],
            JobMode::PreviousWeek => (0..=7).map(|i| -i).collect(),
            JobMode::NextWeek => (0..=7).collect(),
            JobMode::PreviousYear => (0..=365).map(|i| -i).collect(),
            JobMode::Daily => vec![7],
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobMode::SingleDay => "single-day",
            JobMode::PreviousWeek => "previous-week",
            JobMode::NextWeek => "next-week",
            JobMode::PreviousYear => "previous-year",
            JobMode::Daily => "daily",
        })
    }
}

/// One (country, date) request to make.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchTarget {
    pub country: String,
    pub date: NaiveDate,
}

/// Every target of `mode`, country-major, dates in the mode's direction.
pub fn plan<S: AsRef<str>>(mode: JobMode, countries: &[S], today: NaiveDate) -> Vec<FetchTarget> {
    let offsets = mode.offsets();
    let mut targets = Vec::with_capacity(countries.len() * offsets.len());

    for country in countries {
        for offset in &offsets {
            let date = if *offset < 0 {
                today.checked_sub_days(Days::new(offset.unsigned_abs()))
            } else {
                today.checked_add_days(Days::new(*offset as u64))
            };

            // only out of range near chrono's date limits
            if let Some(date) = date {
                targets.push(FetchTarget {
                    country: country.as_ref().to_string(),
                    date,
                });
            }
        }
    }

    targets
}
