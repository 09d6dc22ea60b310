use super::{DoseEvent, PKModel};
use super::parameters::{ParameterSet, PkParameters};

/// Five half-lives clears roughly 97% of a depot.
const ELIMINATION_HALF_LIVES: f64 = 5.0;

/// One-compartment model with first-order absorption from an oil depot.
///
/// Rates are derived from the resolved parameters: `ka = ln2 / (tmax / 3)`
/// and `ke = ln2 / t½`. Each dose stops contributing once it is older than
/// `cutoff_days`, which keeps long regimens finite.
#[derive(Debug, Clone)]
pub struct OneCompartmentModel {
    ka: f64,
    ke: f64,
    bioavailability: f64,
    cutoff_days: f64,
}

impl OneCompartmentModel {
    pub fn new(half_life: f64, time_to_peak: f64, bioavailability: f64, min_cutoff_days: f64) -> Self {
        let ln2 = std::f64::consts::LN_2;
        Self {
            ka: ln2 / (time_to_peak / 3.0),
            ke: ln2 / half_life,
            bioavailability,
            cutoff_days: (ELIMINATION_HALF_LIVES * half_life).max(min_cutoff_days),
        }
    }

    pub fn from_parameters(params: &PkParameters, set: ParameterSet, min_cutoff_days: f64) -> Self {
        Self::new(
            params.half_life.get(set),
            params.time_to_peak.get(set),
            params.bioavailability,
            min_cutoff_days,
        )
    }
}

impl PKModel for OneCompartmentModel {
    fn single_dose(&self, amount: f64, elapsed: f64) -> f64 {
        if elapsed < 0.0 || !elapsed.is_finite() {
            return 0.0;
        }

        let absorbed = amount * self.bioavailability;
        let concentration = if (self.ka - self.ke).abs() > 1e-10 {
            absorbed * self.ka / (self.ka - self.ke)
                * ((-self.ke * elapsed).exp() - (-self.ka * elapsed).exp())
        } else {
            // ka ≈ ke limit
            absorbed * self.ka * elapsed * (-self.ke * elapsed).exp()
        };

        concentration.max(0.0)
    }

    fn calculate_concentration(&self, time: f64, dose_history: &[DoseEvent]) -> f64 {
        dose_history
            .iter()
            .filter(|dose| {
                let elapsed = time - dose.time;
                elapsed >= 0.0 && elapsed < self.cutoff_days
            })
            .map(|dose| self.single_dose(dose.amount, time - dose.time))
            .sum::<f64>()
            .max(0.0)
    }

    fn cutoff_days(&self) -> f64 {
        self.cutoff_days
    }
}
