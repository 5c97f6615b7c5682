//! Energy series windows and aggregation

use chrono::{Datelike, NaiveDate};

use super::types::{EnergyAggregate, EnergyEntry};

/// Vendor values are kWh, host meters count Wh
pub const WH_PER_KWH: f64 = 1000.0;

/// Local hours (0-based) during which the energy endpoints are not polled
pub const QUIET_HOURS: std::ops::RangeInclusive<u32> = 0..=2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyPeriod {
    Yearly,
    Monthly,
    Daily,
}

impl EnergyPeriod {
    pub fn path_segment(self) -> &'static str {
        match self {
            EnergyPeriod::Yearly => "yearly",
            EnergyPeriod::Monthly => "monthly",
            EnergyPeriod::Daily => "daily",
        }
    }
}

/// `startDate`/`endDate` pair for one energy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyWindow {
    pub period: EnergyPeriod,
    pub start: String,
    pub end: String,
}

pub fn in_quiet_hours(local_hour: u32) -> bool {
    QUIET_HOURS.contains(&local_hour)
}

/// Yearly series up to last year, monthly series of this year, today
pub fn windows(today: NaiveDate) -> [EnergyWindow; 3] {
    let year = today.year();
    let month_end = last_day_of_month(today);
    [
        EnergyWindow {
            period: EnergyPeriod::Yearly,
            start: "1900-01-01T00:00:00.000Z".to_string(),
            end: format!("{:04}-12-31T23:59:59.999Z", year - 1),
        },
        EnergyWindow {
            period: EnergyPeriod::Monthly,
            start: format!("{:04}-01-01T00:00:00.000Z", year),
            end: end_of_day(month_end),
        },
        EnergyWindow {
            period: EnergyPeriod::Daily,
            start: start_of_day(today),
            end: end_of_day(today),
        },
    ]
}

fn start_of_day(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

fn end_of_day(date: NaiveDate) -> String {
    format!("{}T23:59:59.999Z", date.format("%Y-%m-%d"))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Year-to-date is the yearly history plus this year's months
pub fn aggregate(
    yearly: &[EnergyEntry],
    monthly: &[EnergyEntry],
    daily: &[EnergyEntry],
) -> EnergyAggregate {
    let (year_consumed, year_delivered) = sum(yearly.iter().chain(monthly));
    let (today_consumed, today_delivered) = sum(daily.iter());
    EnergyAggregate {
        today_consumed: today_consumed * WH_PER_KWH,
        today_delivered: today_delivered * WH_PER_KWH,
        year_to_date_consumed: year_consumed * WH_PER_KWH,
        year_to_date_delivered: year_delivered * WH_PER_KWH,
    }
}

fn sum<'a>(entries: impl Iterator<Item = &'a EnergyEntry>) -> (f64, f64) {
    entries.fold((0.0, 0.0), |(consumed, delivered), e| {
        (
            consumed + e.heating_energy_consumed.unwrap_or(0.0),
            delivered + e.heating_energy_delivered.unwrap_or(0.0),
        )
    })
}
