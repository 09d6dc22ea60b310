use chrono::{Duration, NaiveDateTime, NaiveTime};
use log::{debug, info};

use super::records::{InjectionLog, InjectionRecord};
use super::schedule::is_injection_day;
use super::ProtocolHistory;

/// Calendar days checked for unlogged injections, today included.
pub const BACKFILL_DAYS: i64 = 7;

pub const AUTO_MISS_REASON: &str = "Not logged";

/// Missed records for scheduled days in the last week that have no record.
///
/// Today is only considered once local time has reached `cutoff`, so a dose
/// planned for this evening is not flagged early. Days before the protocol
/// was first started are never flagged.
pub fn backfill_missed(
    now: NaiveDateTime,
    history: &ProtocolHistory,
    log: &InjectionLog,
    cutoff: NaiveTime,
) -> Vec<InjectionRecord> {
    let today = now.date();
    let first_start = history.first_start_date();

    let include_today = now.time() >= cutoff;

    let missed: Vec<InjectionRecord> = (0..BACKFILL_DAYS)
        .rev()
        .filter(|offset| *offset > 0 || include_today)
        .map(|offset| today - Duration::days(offset))
        .filter(|date| *date >= first_start)
        .filter(|date| is_injection_day(*date, history.resolve(*date)))
        .filter(|date| log.get(*date).is_none())
        .map(|date| {
            debug!("No injection logged for scheduled day {}", date);
            InjectionRecord::missed(date, AUTO_MISS_REASON)
        })
        .collect();

    if !missed.is_empty() {
        info!("Backfilled {} missed injection(s)", missed.len());
    }

    missed
}
