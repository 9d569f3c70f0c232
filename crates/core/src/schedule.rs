use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Weekday};

/// Returns the first instant strictly after `after` that falls on `weekday`
/// at `time` in `after`'s timezone.
pub fn next_run<Tz: TimeZone>(
    after: &DateTime<Tz>,
    weekday: Weekday,
    time: NaiveTime,
) -> Result<DateTime<Tz>> {
    let start = after.date_naive();
    let days_ahead =
        (weekday.num_days_from_monday() + 7 - start.weekday().num_days_from_monday()) % 7;
    let mut date = start + Duration::days(days_ahead as i64);

    // Bounded retry covers DST gaps where the local wall-clock time does not
    // exist on the candidate day.
    for _ in 0..4 {
        let naive = date.and_time(time);
        if let Some(candidate) = after.timezone().from_local_datetime(&naive).earliest() {
            if candidate > *after {
                return Ok(candidate);
            }
        }
        date = date + Duration::days(7);
    }

    anyhow::bail!("no valid run time found for {weekday} {time}");
}
