pub mod rotation;

use chrono::NaiveDateTime;

use crate::models::{DoseEvent, Frequency, PKModel, UNITS_PER_ML};

pub use rotation::{optimize_rotation, DosePlan, RotationPlan};

/// A sequence of doses positioned on a day axis.
pub struct DosingRegimen {
    pub events: Vec<DoseEvent>,
}

impl DosingRegimen {
    /// Perfectly regular schedule: `amount` every nominal interval from day 0
    /// up to and including `until_day`.
    pub fn regular(amount: f64, frequency: Frequency, until_day: f64) -> Self {
        let interval = frequency.interval_days();
        let count = (until_day / interval + 1e-9).floor().max(0.0) as usize;

        let events = (0..=count)
            .map(|n| DoseEvent {
                time: n as f64 * interval,
                amount,
            })
            .collect();

        Self { events }
    }

    /// Logged doses positioned relative to `origin`.
    pub fn from_timestamps(doses: &[(NaiveDateTime, f64)], origin: NaiveDateTime) -> Self {
        let mut events: Vec<DoseEvent> = doses
            .iter()
            .map(|(at, amount)| DoseEvent {
                time: days_between(origin, *at),
                amount: *amount,
            })
            .collect();

        events.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self { events }
    }

    pub fn concentration_at<M: PKModel>(&self, model: &M, time: f64) -> f64 {
        model.calculate_concentration(time, &self.events)
    }
}

/// Fractional days from `from` to `to`.
pub fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 86_400.0
}

/// Continuous device units needed per injection.
pub fn units_raw(weekly_dose: f64, injections_per_week: f64, concentration: f64) -> f64 {
    if injections_per_week <= 0.0 || concentration <= 0.0 {
        return 0.0;
    }
    weekly_dose / injections_per_week / concentration * UNITS_PER_ML
}

/// Round to the nearest multiple of the device graduation.
pub fn round_units(units_raw: f64, graduation: u32) -> u32 {
    let step = graduation.max(1) as f64;
    let rounded = (units_raw / step).round() * step;
    rounded.max(0.0) as u32
}

/// Flat rounding kept inside the measurable range of the device.
pub fn measurable_units(units_raw: f64, graduation: u32) -> u32 {
    let step = graduation.max(1);
    let ceiling = rotation::MAX_DEVICE_UNITS - rotation::MAX_DEVICE_UNITS % step;
    round_units(units_raw, step).clamp(step, ceiling)
}
