use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const BILLION: u64 = 1_000_000_000;
pub const HUNDRED_MILLION: u64 = 100_000_000;
pub const UNKNOWN_ETA: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneProjection {
    pub milestone: u64,
    pub remaining: u64,
    /// Raw day count, `f64::INFINITY` when the rate is not positive.
    pub days: f64,
    pub eta_date: Option<NaiveDate>,
}

impl MilestoneProjection {
    pub fn eta_label(&self) -> String {
        self.eta_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_ETA.to_string())
    }

    /// Display policy: only day counts under `horizon_days` are worth
    /// showing as a date.
    pub fn within_horizon(&self, horizon_days: f64) -> bool {
        self.days.is_finite() && self.days < horizon_days
    }
}

/// Smallest multiple of `granularity` strictly greater than `total`.
pub fn next_milestone(total: u64, granularity: u64) -> u64 {
    let granularity = granularity.max(1);
    (total / granularity).saturating_add(1).saturating_mul(granularity)
}

/// Linear ETA to the next milestone. `None` for an empty counter.
pub fn project(
    total: u64,
    rate: f64,
    granularity: u64,
    now: NaiveDateTime,
) -> Option<MilestoneProjection> {
    if total == 0 {
        return None;
    }

    let milestone = next_milestone(total, granularity);
    let remaining = milestone.saturating_sub(total);

    if rate.is_nan() || rate <= 0.0 {
        return Some(MilestoneProjection {
            milestone,
            remaining,
            days: f64::INFINITY,
            eta_date: None,
        });
    }

    let days = remaining as f64 / rate;
    Some(MilestoneProjection {
        milestone,
        remaining,
        days,
        eta_date: eta_after(now, days),
    })
}

fn eta_after(now: NaiveDateTime, days: f64) -> Option<NaiveDate> {
    let millis = days * 86_400_000.0;
    if !millis.is_finite() || millis >= i64::MAX as f64 {
        return None;
    }
    let offset = Duration::try_milliseconds(millis as i64)?;
    now.checked_add_signed(offset).map(|at| at.date())
}

/// Prefer the trailing average; fall back to the latest single day when
/// history has no positive average.
pub fn effective_rate(average: Option<f64>, same_day: u64) -> f64 {
    match average {
        Some(avg) if avg > 0.0 => avg,
        _ => same_day as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn next_milestone_is_the_next_multiple() {
        for (total, granularity) in [
            (1, BILLION),
            (999_999_999, BILLION),
            (1_000_000_000, BILLION),
            (1_234_567_890, HUNDRED_MILLION),
            (42, 7),
        ] {
            let m = next_milestone(total, granularity);
            assert!(m > total);
            assert_eq!(m % granularity, 0);
            assert!(m - granularity <= total);
        }
        assert_eq!(next_milestone(1_000_000_000, BILLION), 2_000_000_000);
        assert_eq!(next_milestone(1_234_567_890, HUNDRED_MILLION), 1_300_000_000);
    }

    #[test]
    fn empty_total_has_no_projection() {
        assert!(project(0, 10.0, BILLION, noon(2025, 1, 1)).is_none());
    }

    #[test]
    fn zero_rate_projects_unknown_eta() {
        let p = project(500_000_000, 0.0, BILLION, noon(2025, 1, 1)).expect("projection");
        assert_eq!(p.milestone, BILLION);
        assert_eq!(p.remaining, 500_000_000);
        assert!(p.days.is_infinite());
        assert_eq!(p.eta_date, None);
        assert_eq!(p.eta_label(), "Unknown");
        assert!(!p.within_horizon(7300.0));
    }

    #[test]
    fn positive_rate_projects_linear_eta() {
        let now = noon(2025, 1, 1);
        let p = project(700_000_000, 10_000_000.0, BILLION, now).expect("projection");
        assert_eq!(p.remaining, 300_000_000);
        assert_eq!(p.days, 30.0);
        assert_eq!(p.eta_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(p.eta_label(), "2025-01-31");
        assert!(p.within_horizon(3650.0));
    }

    #[test]
    fn far_future_eta_stays_raw_but_outside_horizon() {
        let p = project(1, 1e-9, BILLION, noon(2025, 1, 1)).expect("projection");
        assert!(p.days.is_finite());
        assert_eq!(p.eta_date, None);
        assert!(!p.within_horizon(7300.0));
    }

    #[test]
    fn effective_rate_falls_back_to_same_day() {
        assert_eq!(effective_rate(None, 1234), 1234.0);
        assert_eq!(effective_rate(Some(0.0), 1234), 1234.0);
        assert_eq!(effective_rate(Some(50.5), 1234), 50.5);
    }
}
