use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Wall clock seen by caches and projections.
pub trait Clock {
    fn epoch_secs(&self) -> u64;
    fn local_now(&self, tz: Tz) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        now_epoch_secs().unwrap_or(0)
    }

    fn local_now(&self, tz: Tz) -> NaiveDateTime {
        Utc::now().with_timezone(&tz).naive_local()
    }
}

/// Settable clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: Cell<u64>,
}

impl ManualClock {
    pub fn new(epoch_secs: u64) -> Self {
        Self {
            epoch_secs: Cell::new(epoch_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.epoch_secs.set(self.epoch_secs.get().saturating_add(secs));
    }
}

impl Clock for ManualClock {
    fn epoch_secs(&self) -> u64 {
        self.epoch_secs.get()
    }

    fn local_now(&self, tz: Tz) -> NaiveDateTime {
        let utc = chrono::DateTime::from_timestamp(self.epoch_secs.get() as i64, 0)
            .unwrap_or_default();
        utc.with_timezone(&tz).naive_local()
    }
}

/// Truncate `input` to at most `max_chars` Unicode characters, stripping
/// control characters and appending `…` when truncated.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    let clean: String = input.chars().filter(|c| !c.is_control()).collect();
    if clean.chars().count() > max_chars {
        let mut s: String = clean.chars().take(max_chars).collect();
        s.push('…');
        s
    } else {
        clean
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
