//! Tick scheduling

use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike};

use crate::settings::ScheduleSettings;

/// Delay until the next tick
///
/// Normally ticks land on the start of each minute. In fast mode they are
/// a fixed interval apart.
pub fn next_tick_delay<Tz: TimeZone>(now: &DateTime<Tz>, schedule: &ScheduleSettings) -> Duration {
    if schedule.fast_refresh {
        return Duration::from_secs(schedule.fast_interval_s);
    }

    let into_minute = Duration::new(u64::from(now.second()), now.nanosecond().min(999_999_999));
    Duration::from_secs(60).saturating_sub(into_minute)
}
