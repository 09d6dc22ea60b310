//! Where the user stands right now, estimated from the doses they actually
//! logged rather than the theoretical schedule.

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{percent_of, steady_state_peak, Simulator};
use crate::config::SimulationSettings;
use crate::dosing::{days_between, DosingRegimen};
use crate::models::{Compound, ParameterSet, PKModel};
use crate::protocol::{InjectionRecord, ProtocolVersion};

/// Percentages above this are reported as this value.
pub const MAX_LIVE_PERCENT: f64 = 105.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    /// Current level as a percentage of the theoretical steady-state peak
    pub current_percent: u32,
    pub current_concentration: f64,
    pub steady_state_peak: f64,
    pub hours_since_last: f64,
    pub days_on_protocol: i64,
    pub hours_to_next_peak: f64,
    /// Logged doses that contributed to the estimate
    pub doses_counted: usize,
}

/// Estimate the live concentration at `now` from logged injections.
///
/// Only done records with a time of day, not later than `now`, are used.
/// Returns `None` when there are none, or when the steady-state scan step
/// is not a positive number of days.
pub fn estimate_live_status(
    now: NaiveDateTime,
    records: &[InjectionRecord],
    version: &ProtocolVersion,
    compound: &Compound,
    settings: &SimulationSettings,
) -> Option<LiveStatus> {
    let step = settings.live_resolution_days;
    if !(step > 0.0 && step.is_finite()) {
        warn!("Live status needs a positive scan step, got {} days", step);
        return None;
    }

    let mut doses: Vec<(NaiveDateTime, f64)> = records
        .iter()
        .filter_map(|record| {
            let at = record.timestamp()?;
            let amount = record
                .units
                .map(|units| compound.dose_of_units(units))
                .unwrap_or_else(|| version.dose_per_injection());
            Some((at, amount))
        })
        .filter(|(at, _)| *at <= now)
        .collect();
    doses.sort_by_key(|(at, _)| *at);

    let (first, _) = *doses.first()?;
    let (last, _) = *doses.last()?;

    let params = version.pk_parameters(compound);
    let simulator = Simulator::new(&params, settings);
    let model = simulator.model(ParameterSet::Base);

    let counted = match settings.live_recent_doses {
        Some(cap) => &doses[doses.len().saturating_sub(cap)..],
        None => &doses[..],
    };
    let regimen = DosingRegimen::from_timestamps(counted, first);
    let current = model.calculate_concentration(days_between(first, now), &regimen.events);

    let times: Vec<f64> = {
        let steps = ((settings.steady_state_end - settings.steady_state_start) / step).round() as usize;
        (0..=steps).map(|k| settings.steady_state_start + k as f64 * step).collect()
    };
    let series = simulator.simulate_series(
        ParameterSet::Base,
        version.dose_per_injection(),
        version.frequency,
        &times,
    );
    let peak = steady_state_peak(&times, &series, settings.steady_state_start, settings.steady_state_end);

    let hours_since_last = days_between(last, now) * 24.0;
    let current_percent = percent_of(current, peak).round().clamp(0.0, MAX_LIVE_PERCENT) as u32;

    debug!(
        "Live status from {} dose(s): {:.3} of peak {:.3} ({}%)",
        counted.len(),
        current,
        peak,
        current_percent
    );

    Some(LiveStatus {
        current_percent,
        current_concentration: current,
        steady_state_peak: peak,
        hours_since_last,
        days_on_protocol: days_between(first, now).round() as i64,
        hours_to_next_peak: (params.time_to_peak.base * 24.0 - hours_since_last).max(0.0),
        doses_counted: counted.len(),
    })
}
