use chrono::{Datelike, Duration, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};

use super::{ProtocolHistory, ProtocolVersion};
use crate::dosing::DosePlan;
use crate::models::{find_compound, Compound, Frequency};

fn days_since_start(date: NaiveDate, version: &ProtocolVersion) -> i64 {
    (date - version.start_date).num_days()
}

/// Whether `date` is a scheduled injection day under `version`.
///
/// Every-day and every-other-day protocols count from the start date, as
/// does biweekly. Twice- and three-times-weekly protocols use fixed
/// weekdays, and weekly protocols repeat on the start date's weekday.
pub fn is_injection_day(date: NaiveDate, version: &ProtocolVersion) -> bool {
    let days = days_since_start(date, version);

    match version.frequency {
        Frequency::Ed => true,
        Frequency::Eod => days.abs() % 2 == 0,
        Frequency::ThreePerWeek | Frequency::TwicePerWeek => version
            .frequency
            .fixed_weekdays()
            .map_or(false, |weekdays| weekdays.contains(&date.weekday())),
        Frequency::Weekly => date.weekday() == version.start_date.weekday(),
        Frequency::Biweekly => days.abs() % 14 == 0,
    }
}

/// Position of `date` within the rotation period, or `None` when no
/// injection is scheduled that day.
pub fn injection_index(date: NaiveDate, version: &ProtocolVersion) -> Option<usize> {
    if !is_injection_day(date, version) {
        return None;
    }

    let frequency = version.frequency;
    let per_period = frequency.injections_per_period().max(1) as i64;
    let days = days_since_start(date, version);

    let index = match frequency {
        Frequency::Ed => days.rem_euclid(per_period),
        Frequency::Eod => days.div_euclid(2).rem_euclid(per_period),
        Frequency::ThreePerWeek | Frequency::TwicePerWeek => {
            let slots = frequency.fixed_weekdays().unwrap_or(&[]);
            let slots_per_week = slots.len().max(1) as i64;
            let slot = slots
                .iter()
                .position(|d| *d == date.weekday())
                .unwrap_or(0) as i64;
            let week = days.div_euclid(7);
            (week * slots_per_week + slot).rem_euclid(slots_per_week)
        }
        Frequency::Weekly | Frequency::Biweekly => 0,
    };

    Some(index as usize)
}

/// Device units to inject on `date`, or `None` when it is not an
/// injection day.
pub fn dose_for_date(date: NaiveDate, version: &ProtocolVersion, plan: &DosePlan) -> Option<u32> {
    injection_index(date, version).map(|index| plan.units_at(index))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDose {
    pub date: NaiveDate,
    pub units: u32,
    pub compound_id: String,
    /// Effective-from date of the governing protocol version
    pub version: NaiveDate,
}

/// Scheduled injections for `days` calendar days starting at `from`,
/// each resolved against the version governing its own date.
pub fn upcoming_doses(
    from: NaiveDate,
    days: u32,
    history: &ProtocolHistory,
    catalog: &[Compound],
) -> Vec<ScheduledDose> {
    let mut doses = Vec::new();
    let mut cached: Option<(NaiveDate, DosePlan)> = None;

    for offset in 0..days {
        let date = from + Duration::days(offset as i64);
        let version = history.resolve(date);

        let Some(compound) = find_compound(catalog, &version.compound_id) else {
            warn!("Compound {} is not in the catalog; skipping {}", version.compound_id, date);
            continue;
        };

        let plan = match &cached {
            Some((effective, plan)) if *effective == version.effective_from => plan.clone(),
            _ => {
                let plan = DosePlan::for_version(version, compound);
                cached = Some((version.effective_from, plan.clone()));
                plan
            }
        };

        if let Some(units) = dose_for_date(date, version, &plan) {
            doses.push(ScheduledDose {
                date,
                units,
                compound_id: version.compound_id.clone(),
                version: version.effective_from,
            });
        }
    }

    doses
}
