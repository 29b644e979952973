// Rust guideline compliant 2026-10-16

//! Business-timezone time service.
//!
//! [`BusinessTime`] resolves the current instant, business-day boundaries and
//! rescheduled due dates in one configured IANA zone. The wall clock is an
//! injected [`Clock`] so a run can be replayed against a [`FixedClock`].
//!
//! All calendar arithmetic happens on local dates, never in 24-hour
//! multiples, so the transfer hour survives DST transitions.

use chrono::{
    DateTime, Days, FixedOffset, LocalResult, NaiveDateTime, NaiveTime, Offset as _, TimeDelta,
    TimeZone, Timelike as _, Utc,
};
use chrono_tz::Tz;
use domain::{Clock, DISPLAY_FORMAT, DayRange};

/// Default business zone: UTC+4 all year round.
pub const DEFAULT_ZONE: Tz = chrono_tz::Asia::Dubai;

/// Default hour of day at which rescheduled invoices fall due.
pub const DEFAULT_TRANSFER_HOUR: u32 = 12;

/// Upper bound when walking forward out of a DST gap (one full day).
const GAP_SEARCH_MINUTES: i64 = 24 * 60;

// ---------------------------------------------------------------------------
// TimeError
// ---------------------------------------------------------------------------

/// Errors from time configuration and date arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// Transfer hour outside `0..=23`.
    #[error("transfer hour must be in 0..=23, got {hour}")]
    InvalidTransferHour { hour: u32 },
    /// Zone name not found in the IANA database.
    #[error("unknown timezone {name:?}: {reason}")]
    UnknownTimezone { name: String, reason: String },
    /// The computed date lies outside the supported calendar range.
    #[error("date {days_offset} day(s) after {from} is out of range")]
    OutOfRange { days_offset: u32, from: String },
}

/// Parse an IANA zone name such as `"Asia/Dubai"`.
///
/// # Errors
///
/// Returns [`TimeError::UnknownTimezone`] for names absent from the database.
pub fn parse_zone(name: &str) -> Result<Tz, TimeError> {
    name.trim().parse::<Tz>().map_err(|e| TimeError::UnknownTimezone {
        name: name.to_owned(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// `Clock` adapter reading the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// `Clock` adapter frozen at one instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// BusinessTime
// ---------------------------------------------------------------------------

/// Time computations in the business timezone.
///
/// Holds configuration only (zone, transfer hour) plus the injected clock.
#[derive(Debug, Clone)]
pub struct BusinessTime<C: Clock> {
    zone: Tz,
    transfer_time: NaiveTime,
    clock: C,
}

impl<C: Clock> BusinessTime<C> {
    /// Create a time service for `zone` with due dates at `transfer_hour:00:00`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidTransferHour`] when `transfer_hour > 23`.
    pub fn new(zone: Tz, transfer_hour: u32, clock: C) -> Result<Self, TimeError> {
        let transfer_time = NaiveTime::from_hms_opt(transfer_hour, 0, 0)
            .ok_or(TimeError::InvalidTransferHour { hour: transfer_hour })?;
        Ok(Self { zone, transfer_time, clock })
    }

    /// The configured zone.
    #[must_use]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// IANA name of the configured zone.
    #[must_use]
    pub fn zone_name(&self) -> &'static str {
        self.zone.name()
    }

    /// Hour of day for rescheduled due dates.
    #[must_use]
    pub fn transfer_hour(&self) -> u32 {
        self.transfer_time.hour()
    }

    /// Current instant in the business zone.
    ///
    /// Reads the clock on every call; a run captures this once and passes it on.
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now_utc().with_timezone(&self.zone)
    }

    /// Boundaries of the business-local calendar day containing `instant`.
    ///
    /// `end` is the last second of the day (inclusive), so a 23- or 25-hour
    /// DST day yields a correspondingly shorter or longer range.
    #[must_use]
    pub fn day_range(&self, instant: &DateTime<Tz>) -> DayRange {
        let date = instant.with_timezone(&self.zone).date_naive();
        let start = resolve_local(&self.zone, date.and_time(NaiveTime::MIN));
        let end = date.succ_opt().map_or(start.timestamp() + 86_399, |next| {
            resolve_local(&self.zone, next.and_time(NaiveTime::MIN)).timestamp() - 1
        });
        let label = date.format("%Y-%m-%d").to_string();
        DayRange { start: start.timestamp(), end, start_date: label.clone(), end_date: label }
    }

    /// `from` plus `days_offset` calendar days, at the transfer hour sharp.
    ///
    /// Ambiguous local times (DST fall-back) resolve to the earlier instant;
    /// times inside a DST gap move to the first minute after the gap.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the target date overflows the
    /// calendar.
    pub fn due_date_for(
        &self,
        days_offset: u32,
        from: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, TimeError> {
        let target = from
            .with_timezone(&self.zone)
            .date_naive()
            .checked_add_days(Days::new(u64::from(days_offset)))
            .ok_or_else(|| TimeError::OutOfRange { days_offset, from: self.format(from) })?;
        Ok(resolve_local(&self.zone, target.and_time(self.transfer_time)))
    }

    /// Whether `instant` is strictly after today's transfer hour.
    #[must_use]
    pub fn is_past_transfer_time(&self, instant: &DateTime<Tz>) -> bool {
        let local = instant.with_timezone(&self.zone);
        local.time() > self.transfer_time
    }

    /// `YYYY-MM-DD HH:mm:ss` in the business zone.
    #[must_use]
    pub fn format<T: TimeZone>(&self, instant: &DateTime<T>) -> String {
        instant.with_timezone(&self.zone).format(DISPLAY_FORMAT).to_string()
    }

    /// Convert any instant to a fixed-offset value in the business zone.
    ///
    /// Audit records store this form: the offset travels with the value.
    #[must_use]
    pub fn to_fixed<T: TimeZone>(&self, instant: &DateTime<T>) -> DateTime<FixedOffset> {
        let local = instant.with_timezone(&self.zone);
        local.with_timezone(&local.offset().fix())
    }
}

/// Map a local wall-clock time to an instant in `zone`.
fn resolve_local(zone: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => (1..=GAP_SEARCH_MINUTES)
            .find_map(|m| zone.from_local_datetime(&(local + TimeDelta::minutes(m))).earliest())
            .unwrap_or_else(|| zone.from_utc_datetime(&local)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
