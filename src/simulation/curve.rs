use serde::{Deserialize, Serialize};

use super::{percent_of, steady_state_peak, time_grid, Simulator};
use crate::config::SimulationSettings;
use crate::models::{Frequency, ParameterSet, PkParameters};

/// One sample of a normalised concentration curve. Each series is a
/// percentage of its own steady-state peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub day: f64,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_max: Option<f64>,
}

fn normalized_series(
    simulator: &Simulator,
    set: ParameterSet,
    dose: f64,
    frequency: Frequency,
    times: &[f64],
) -> Vec<f64> {
    let settings = simulator.settings();
    let series = simulator.simulate_series(set, dose, frequency, times);
    let peak = steady_state_peak(times, &series, settings.steady_state_start, settings.steady_state_end);

    series.iter().map(|c| percent_of(*c, peak)).collect()
}

/// Percent-of-peak concentration curve over `horizon_days`, optionally with
/// the min/max parameter band.
pub fn simulate_concentration(
    params: &PkParameters,
    dose: f64,
    frequency: Frequency,
    horizon_days: f64,
    with_band: bool,
    settings: &SimulationSettings,
) -> Vec<CurvePoint> {
    let simulator = Simulator::new(params, settings);
    let times = time_grid(0.0, horizon_days.max(0.0), settings.curve_points_per_day);

    let base = normalized_series(&simulator, ParameterSet::Base, dose, frequency, &times);
    let band = with_band.then(|| {
        (
            normalized_series(&simulator, ParameterSet::Min, dose, frequency, &times),
            normalized_series(&simulator, ParameterSet::Max, dose, frequency, &times),
        )
    });

    times
        .iter()
        .enumerate()
        .map(|(i, &day)| CurvePoint {
            day,
            percent: base[i],
            percent_min: band.as_ref().map(|(min, _)| min[i]),
            percent_max: band.as_ref().map(|(_, max)| max[i]),
        })
        .collect()
}
