pub mod curve;
pub mod live;
pub mod stability;

use crate::config::SimulationSettings;
use crate::dosing::DosingRegimen;
use crate::models::{Frequency, OneCompartmentModel, ParameterSet, PkParameters};
use log::debug;

pub use curve::{simulate_concentration, CurvePoint};
pub use live::{estimate_live_status, LiveStatus};
pub use stability::{analyze_stability, StabilityReport, SteadyStateMetrics};

const WINDOW_EPSILON: f64 = 1e-9;

/// Runs a regular dosing regimen through the one-compartment model for one
/// end of the parameter uncertainty band at a time.
pub struct Simulator<'a> {
    params: &'a PkParameters,
    settings: &'a SimulationSettings,
}

impl<'a> Simulator<'a> {
    pub fn new(params: &'a PkParameters, settings: &'a SimulationSettings) -> Self {
        Self { params, settings }
    }

    pub fn model(&self, set: ParameterSet) -> OneCompartmentModel {
        OneCompartmentModel::from_parameters(self.params, set, self.settings.min_cutoff_days)
    }

    /// Concentration at each of `times` for `dose` given at the nominal
    /// interval of `frequency` from day 0.
    pub fn simulate_series(&self, set: ParameterSet, dose: f64, frequency: Frequency, times: &[f64]) -> Vec<f64> {
        let until = times.iter().copied().fold(0.0, f64::max);
        let regimen = DosingRegimen::regular(dose, frequency, until);
        let model = self.model(set);

        debug!(
            "Simulating {:?} set: {} doses of {:.2} every {:.2} days over {:.1} days",
            set,
            regimen.events.len(),
            dose,
            frequency.interval_days(),
            until
        );

        times
            .iter()
            .map(|&t| regimen.concentration_at(&model, t))
            .collect()
    }

    pub fn settings(&self) -> &SimulationSettings {
        self.settings
    }
}

/// Evenly spaced sample times from `start` to `end` inclusive.
pub fn time_grid(start: f64, end: f64, points_per_day: u32) -> Vec<f64> {
    let per_day = points_per_day.max(1) as f64;
    let steps = ((end - start) * per_day).round().max(0.0) as usize;

    (0..=steps).map(|k| start + k as f64 / per_day).collect()
}

/// Whether `t` falls inside `[start, end]`, tolerating float drift at the edges.
pub fn in_window(t: f64, start: f64, end: f64) -> bool {
    t >= start - WINDOW_EPSILON && t <= end + WINDOW_EPSILON
}

/// Highest concentration inside the steady-state window, falling back to
/// the whole series when no sample lands in the window.
pub fn steady_state_peak(times: &[f64], series: &[f64], start: f64, end: f64) -> f64 {
    let windowed = times
        .iter()
        .zip(series)
        .filter(|(t, _)| in_window(**t, start, end))
        .map(|(_, c)| *c)
        .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |m| m.max(c))));

    windowed.unwrap_or_else(|| series.iter().copied().fold(0.0, f64::max))
}

/// `100 * value / peak`, or zero when the peak is zero.
pub fn percent_of(value: f64, peak: f64) -> f64 {
    if peak > 0.0 {
        100.0 * value / peak
    } else {
        0.0
    }
}
