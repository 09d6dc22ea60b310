use serde::{Deserialize, Serialize};

use super::{percent_of, time_grid, Simulator};
use crate::config::SimulationSettings;
use crate::models::{Frequency, ParameterSet, PkParameters, Range};

/// Peak/trough statistics of one simulated steady state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateMetrics {
    pub peak: f64,
    pub trough: f64,
    /// Peak-to-trough swing as a percentage of the peak
    pub fluctuation: f64,
    pub stability: f64,
    pub trough_percent: f64,
}

impl SteadyStateMetrics {
    pub fn from_series(series: &[f64]) -> Self {
        let peak = series.iter().copied().fold(0.0, f64::max);
        let trough = if series.is_empty() {
            0.0
        } else {
            series.iter().copied().fold(f64::INFINITY, f64::min)
        };

        let fluctuation = percent_of(peak - trough, peak).clamp(0.0, 100.0);

        Self {
            peak,
            trough,
            fluctuation,
            stability: 100.0 - fluctuation,
            trough_percent: percent_of(trough, peak),
        }
    }
}

/// Stability metrics with their uncertainty envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub stability: Range,
    pub fluctuation: Range,
    pub trough_percent: Range,
}

/// Scan the steady-state window at fine resolution for one parameter set.
pub fn steady_state_metrics(
    params: &PkParameters,
    set: ParameterSet,
    dose: f64,
    frequency: Frequency,
    settings: &SimulationSettings,
) -> SteadyStateMetrics {
    let simulator = Simulator::new(params, settings);
    let times = time_grid(
        settings.steady_state_start,
        settings.steady_state_end,
        settings.stability_points_per_day,
    );

    let series = simulator.simulate_series(set, dose, frequency, &times);
    SteadyStateMetrics::from_series(&series)
}

fn envelope(base: f64, a: f64, b: f64) -> Range {
    Range::new(a.min(b), base, a.max(b))
}

pub fn analyze_stability(
    params: &PkParameters,
    dose: f64,
    frequency: Frequency,
    settings: &SimulationSettings,
) -> StabilityReport {
    let base = steady_state_metrics(params, ParameterSet::Base, dose, frequency, settings);
    let low = steady_state_metrics(params, ParameterSet::Min, dose, frequency, settings);
    let high = steady_state_metrics(params, ParameterSet::Max, dose, frequency, settings);

    StabilityReport {
        stability: envelope(base.stability, low.stability, high.stability),
        fluctuation: envelope(base.fluctuation, low.fluctuation, high.fluctuation),
        trough_percent: envelope(base.trough_percent, low.trough_percent, high.trough_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{resolve_pk_parameters, InjectionMethod, InjectionSite, OilType};
    use approx::assert_relative_eq;

    fn params(compound: &str) -> PkParameters {
        resolve_pk_parameters(compound, InjectionMethod::Im, OilType::GrapeSeed, InjectionSite::Deltoid, 0.4)
    }

    #[test]
    fn test_metrics_bounds() {
        let settings = SimulationSettings::default();
        for compound in ["testosterone_propionate", "testosterone_enanthate", "testosterone_undecanoate", "hcg"] {
            for frequency in [Frequency::Ed, Frequency::Eod, Frequency::TwicePerWeek, Frequency::Biweekly] {
                let report = analyze_stability(&params(compound), 100.0, frequency, &settings);
                for fluctuation in [report.fluctuation.min, report.fluctuation.base, report.fluctuation.max] {
                    assert!((0.0..=100.0).contains(&fluctuation));
                }
                assert_eq!(report.stability.base, 100.0 - report.fluctuation.base);
                assert!(report.stability.min <= report.stability.max);
            }
        }
    }

    #[test]
    fn test_frequent_dosing_is_more_stable() {
        let settings = SimulationSettings::default();
        let p = params("testosterone_enanthate");

        let daily = analyze_stability(&p, 20.0, Frequency::Ed, &settings);
        let biweekly = analyze_stability(&p, 280.0, Frequency::Biweekly, &settings);
        assert!(daily.stability.base > biweekly.stability.base);
        assert!(daily.trough_percent.base > biweekly.trough_percent.base);
    }

    #[test]
    fn test_zero_dose_is_flat() {
        let settings = SimulationSettings::default();
        let report = analyze_stability(&params("testosterone_cypionate"), 0.0, Frequency::Weekly, &settings);
        assert_eq!(report.fluctuation.base, 0.0);
        assert_eq!(report.stability.base, 100.0);
        assert_eq!(report.trough_percent.base, 0.0);
    }

    #[test]
    fn test_single_run_metrics() {
        let metrics = SteadyStateMetrics::from_series(&[4.0, 10.0, 6.0]);
        assert_eq!(metrics.peak, 10.0);
        assert_eq!(metrics.trough, 4.0);
        assert_relative_eq!(metrics.fluctuation, 60.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.stability, 40.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.trough_percent, 40.0, epsilon = 1e-12);
    }

    #[test]
    fn test_envelope_is_pointwise() {
        let band = envelope(50.0, 70.0, 30.0);
        assert_eq!(band, Range::new(30.0, 50.0, 70.0));
    }
}
