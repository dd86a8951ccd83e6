//! Daily run times in a fixed-offset local zone.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use crate::error::{ReportError, ReportResult};

/// First instant strictly after `now` whose local time is `hour:minute`.
pub fn next_run(
    now: DateTime<Utc>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
) -> ReportResult<DateTime<Utc>> {
    let at = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ReportError::InvalidConfig(format!("bad run time {hour:02}:{minute:02}")))?;

    let local_today = now.with_timezone(&offset).date_naive().and_time(at);
    // A fixed offset has no gaps or folds
    let candidate = offset
        .from_local_datetime(&local_today)
        .single()
        .ok_or_else(|| ReportError::InvalidConfig("ambiguous local run time".into()))?
        .with_timezone(&Utc);

    if candidate > now {
        Ok(candidate)
    } else {
        Ok(candidate + Duration::days(1))
    }
}
