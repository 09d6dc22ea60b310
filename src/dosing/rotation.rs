//! Reconciliation of a continuous per-injection dose with the discrete
//! graduation of the measuring device.
//!
//! Flat rounding every injection to the nearest graduation can drift a long
//! way from the weekly target. A rotation alternates the two graduations
//! bracketing the raw amount so the period total tracks the target instead.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{measurable_units, units_raw};
use crate::models::{Compound, UNITS_PER_ML};
use crate::protocol::ProtocolVersion;

/// Largest amount a U-100 device can measure in one draw.
pub const MAX_DEVICE_UNITS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPlan {
    pub lower_units: u32,
    pub higher_units: u32,
    pub lower_count: usize,
    pub higher_count: usize,
    /// Drug delivered across one period
    pub total_dose: f64,
    pub target_dose: f64,
    /// Absolute difference between `total_dose` and `target_dose`
    pub deviation: f64,
}

impl RotationPlan {
    pub fn injections_per_period(&self) -> usize {
        self.lower_count + self.higher_count
    }

    /// Device units for every position of the period, spreading the higher
    /// doses evenly instead of clustering them.
    pub fn schedule(&self) -> Vec<u32> {
        let n = self.injections_per_period();
        let mut used = 0usize;

        (0..n)
            .map(|i| {
                let due = ((i + 1) as f64 * self.higher_count as f64 / n as f64).round() as usize;
                if used < due {
                    used += 1;
                    self.higher_units
                } else {
                    self.lower_units
                }
            })
            .collect()
    }

    /// Units for the `index`-th injection, wrapping around the period. An
    /// empty plan always gives the lower amount.
    pub fn units_at(&self, index: usize) -> u32 {
        let schedule = self.schedule();
        if schedule.is_empty() {
            return self.lower_units;
        }
        schedule[index % schedule.len()]
    }
}

fn dose_of(units: u32, concentration: f64) -> f64 {
    units as f64 / UNITS_PER_ML * concentration
}

/// Search every split of the two graduations bracketing `units_raw` and
/// return the one whose period total is closest to `target_per_period`.
///
/// Returns `None` when no two-level rotation exists: the bracketing amounts
/// fall outside the device range, or the best split uses only one level.
pub fn optimize_rotation(
    units_raw: f64,
    graduation: u32,
    injections_per_period: usize,
    target_per_period: f64,
    concentration: f64,
) -> Option<RotationPlan> {
    if graduation == 0 || injections_per_period == 0 || !units_raw.is_finite() {
        return None;
    }

    let lower_steps = (units_raw / graduation as f64).floor();
    if lower_steps <= 0.0 {
        debug!("No rotation for {:.2} units: lower amount is not measurable", units_raw);
        return None;
    }

    let lower = lower_steps as u32 * graduation;
    let higher = lower + graduation;
    if higher > MAX_DEVICE_UNITS {
        debug!("No rotation for {:.2} units: {} exceeds device capacity", units_raw, higher);
        return None;
    }

    let lower_dose = dose_of(lower, concentration);
    let higher_dose = dose_of(higher, concentration);

    let mut best: Option<(usize, f64, f64)> = None;
    for higher_count in 0..=injections_per_period {
        let lower_count = injections_per_period - higher_count;
        let total = lower_count as f64 * lower_dose + higher_count as f64 * higher_dose;
        let deviation = (total - target_per_period).abs();

        if best.map_or(true, |(_, _, best_deviation)| deviation < best_deviation) {
            best = Some((higher_count, total, deviation));
        }
    }

    let (higher_count, total_dose, deviation) = best?;
    let lower_count = injections_per_period - higher_count;

    if higher_count == 0 || lower_count == 0 {
        debug!(
            "Rotation between {} and {} units degenerates to flat dosing",
            lower, higher
        );
        return None;
    }

    Some(RotationPlan {
        lower_units: lower,
        higher_units: higher,
        lower_count,
        higher_count,
        total_dose,
        target_dose: target_per_period,
        deviation,
    })
}

/// How a protocol version is drawn up, injection by injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DosePlan {
    /// The same rounded amount every injection
    Flat { units: u32 },
    Rotation(RotationPlan),
}

impl DosePlan {
    pub fn for_version(version: &ProtocolVersion, compound: &Compound) -> Self {
        let frequency = version.frequency;
        let raw = units_raw(
            version.weekly_dose,
            frequency.injections_per_week(),
            compound.concentration,
        );
        let target = version.weekly_dose * frequency.period_weeks() as f64;

        match optimize_rotation(
            raw,
            version.graduation,
            frequency.injections_per_period(),
            target,
            compound.concentration,
        ) {
            Some(plan) => DosePlan::Rotation(plan),
            None => DosePlan::Flat {
                units: measurable_units(raw, version.graduation),
            },
        }
    }

    /// Units for the `index`-th injection of the rotation period.
    pub fn units_at(&self, index: usize) -> u32 {
        match self {
            DosePlan::Flat { units } => *units,
            DosePlan::Rotation(plan) => plan.units_at(index),
        }
    }

    pub fn rotation(&self) -> Option<&RotationPlan> {
        match self {
            DosePlan::Rotation(plan) => Some(plan),
            DosePlan::Flat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_rotation_hits_weekly_target() {
        // 200 mg/week, 3x/week at 250 mg/mL is 26.67 units per injection
        let raw = 200.0 / 3.0 / 250.0 * 100.0;
        let plan = optimize_rotation(raw, 2, 3, 200.0, 250.0).unwrap();

        assert_eq!(plan.lower_units, 26);
        assert_eq!(plan.higher_units, 28);
        assert_eq!(plan.lower_count, 2);
        assert_eq!(plan.higher_count, 1);
        assert_relative_eq!(plan.total_dose, 200.0, epsilon = 1e-9);
        assert_relative_eq!(plan.deviation, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_split_reports_no_rotation() {
        // Best split of 52/54 units for a 250 mg target is all 52s
        assert!(optimize_rotation(53.0, 2, 2, 250.0, 250.0).is_none());
    }

    #[test]
    fn test_infeasible_bounds() {
        assert!(optimize_rotation(0.8, 1, 7, 10.0, 250.0).is_none());
        assert!(optimize_rotation(100.5, 1, 2, 502.0, 250.0).is_none());
        assert!(optimize_rotation(50.0, 0, 2, 250.0, 250.0).is_none());
        assert!(optimize_rotation(50.0, 2, 0, 250.0, 250.0).is_none());
    }

    #[test]
    fn test_schedule_spreads_higher_doses() {
        let plan = RotationPlan {
            lower_units: 10,
            higher_units: 12,
            lower_count: 4,
            higher_count: 3,
            total_dose: 0.0,
            target_dose: 0.0,
            deviation: 0.0,
        };

        assert_eq!(plan.schedule(), vec![10, 12, 10, 12, 10, 12, 10]);
        assert_eq!(plan.units_at(8), 12);
    }

    #[test]
    fn test_empty_plan_falls_back_to_lower_units() {
        let plan: RotationPlan = serde_json::from_str(
            r#"{"lower_units": 20, "higher_units": 22, "lower_count": 0, "higher_count": 0,
                "total_dose": 0.0, "target_dose": 0.0, "deviation": 0.0}"#,
        )
        .unwrap();

        assert!(plan.schedule().is_empty());
        assert_eq!(plan.units_at(0), 20);
        assert_eq!(plan.units_at(5), 20);
    }

    #[test]
    fn test_flat_plan_for_exact_amount() {
        let compound = Compound::new("testosterone_enanthate", "Test E", 250.0, crate::models::DoseUnit::Mg);
        let version = ProtocolVersion::builder("testosterone_enanthate", 250.0, crate::models::Frequency::TwicePerWeek)
            .graduation(2)
            .build();

        let plan = DosePlan::for_version(&version, &compound);
        assert_eq!(plan, DosePlan::Flat { units: 50 });
        assert_eq!(plan.units_at(1), 50);
        assert!(plan.rotation().is_none());
    }

    #[test]
    fn test_eod_plan_uses_two_week_period() {
        let compound = Compound::new("testosterone_cypionate", "Test C", 200.0, crate::models::DoseUnit::Mg);
        let version = ProtocolVersion::builder("testosterone_cypionate", 100.0, crate::models::Frequency::Eod)
            .graduation(2)
            .build();

        // 100 mg / 3.5 / 200 mg/mL = 14.29 units; 7 injections over 2 weeks
        let plan = DosePlan::for_version(&version, &compound);
        let rotation = plan.rotation().unwrap();
        assert_eq!(rotation.injections_per_period(), 7);
        assert_eq!((rotation.lower_units, rotation.higher_units), (14, 16));
        assert_relative_eq!(rotation.target_dose, 200.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn proptest_rotation_conserves_and_is_optimal(
            raw in 1.0f64..99.0,
            graduation in 1u32..=2,
            n in 1usize..=14,
            target_scale in 0.8f64..1.2,
            concentration in prop::sample::select(vec![100.0, 200.0, 250.0, 5000.0]),
        ) {
            let target = raw / 100.0 * concentration * n as f64 * target_scale;
            if let Some(plan) = optimize_rotation(raw, graduation, n, target, concentration) {
                prop_assert_eq!(plan.lower_count + plan.higher_count, n);
                prop_assert!(plan.lower_count > 0 && plan.higher_count > 0);
                prop_assert!(plan.lower_units >= 1 && plan.higher_units <= MAX_DEVICE_UNITS);
                prop_assert_eq!(plan.higher_units - plan.lower_units, graduation);

                for higher_count in 0..=n {
                    let total = (n - higher_count) as f64 * dose_of(plan.lower_units, concentration)
                        + higher_count as f64 * dose_of(plan.higher_units, concentration);
                    prop_assert!((total - target).abs() >= plan.deviation - 1e-9);
                }

                let schedule = plan.schedule();
                prop_assert_eq!(schedule.len(), n);
                let highs = schedule.iter().filter(|&&u| u == plan.higher_units).count();
                prop_assert_eq!(highs, plan.higher_count);
            }
        }
    }
}
