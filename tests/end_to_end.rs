use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use dose_tracker::models::{builtin_catalog, find_compound, DoseUnit, InjectionMethod, InjectionSite, OilType};
use dose_tracker::simulation::{in_window, SteadyStateMetrics};
use dose_tracker::{
    dose_for_date, optimize_rotation, resolve_pk_parameters, resolve_protocol_version, simulate_concentration,
    units_raw, Compound, DosePlan, Frequency, ProtocolHistory, ProtocolVersion, SimulationSettings,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn twice_weekly_enanthate_needs_fifty_units() {
    let frequency = Frequency::from_id("2×/week");
    assert_eq!(frequency, Frequency::TwicePerWeek);

    let raw = units_raw(250.0, frequency.injections_per_week(), 250.0);
    assert_relative_eq!(raw, 50.0, epsilon = 1e-12);

    let compound = Compound::new("testosterone_enanthate", "Test E", 250.0, DoseUnit::Mg);
    assert_relative_eq!(compound.volume_ml(125.0), 0.5, epsilon = 1e-12);
}

#[test]
fn rotation_between_fifty_two_and_fifty_four_units() {
    // 2.5 mg per unit: two injections of 52 land closest to 250 but never rotate
    assert!(optimize_rotation(53.0, 2, 2, 250.0, 250.0).is_none());

    let plan = optimize_rotation(53.0, 2, 2, 265.0, 250.0).unwrap();
    assert_eq!((plan.lower_units, plan.higher_units), (52, 54));
    assert_eq!((plan.lower_count, plan.higher_count), (1, 1));
    assert_relative_eq!(plan.total_dose, 265.0, epsilon = 1e-9);
    assert_relative_eq!(plan.deviation, 0.0, epsilon = 1e-9);
}

#[test]
fn enanthate_with_neutral_modifiers() {
    let params = resolve_pk_parameters(
        "testosterone_enanthate",
        InjectionMethod::Im,
        OilType::GrapeSeed,
        InjectionSite::Deltoid,
        0.4,
    );
    assert_relative_eq!(params.half_life.base, 4.5, epsilon = 1e-12);
    assert_relative_eq!(params.bioavailability, 0.70, epsilon = 1e-12);
    assert_relative_eq!(params.total_modifier, 1.0, epsilon = 1e-12);

    // A full millilitre depot absorbs more slowly
    let large = resolve_pk_parameters(
        "testosterone_enanthate",
        InjectionMethod::Im,
        OilType::GrapeSeed,
        InjectionSite::Deltoid,
        1.0,
    );
    assert_relative_eq!(large.half_life.base, 4.5 * 1.08, epsilon = 1e-12);
    assert_relative_eq!(large.bioavailability, 0.70, epsilon = 1e-12);
}

#[test]
fn protocol_change_switches_dose_plan() {
    let catalog = builtin_catalog();
    let cypionate = find_compound(&catalog, "testosterone_cypionate").unwrap();

    let initial = ProtocolVersion::builder("testosterone_cypionate", 100.0, Frequency::Eod)
        .start_date(date(2024, 1, 1))
        .graduation(2)
        .build();
    let increased = ProtocolVersion::builder("testosterone_cypionate", 140.0, Frequency::Eod)
        .start_date(date(2024, 1, 1))
        .effective_from(date(2024, 2, 1))
        .graduation(2)
        .build();

    let history = ProtocolHistory::from_versions(vec![increased, initial]).unwrap();
    assert_eq!(history.resolve(date(2024, 1, 31)).weekly_dose, 100.0);
    assert_eq!(history.resolve(date(2024, 2, 1)).weekly_dose, 140.0);

    // 100 mg/week EOD at 200 mg/mL: 14.29 units, rotated 14/16
    let before = history.resolve(date(2024, 1, 1));
    let plan = DosePlan::for_version(before, cypionate);
    let rotation = plan.rotation().unwrap();
    assert_eq!((rotation.lower_units, rotation.higher_units), (14, 16));

    let period: Vec<u32> = (0..14)
        .filter_map(|offset| dose_for_date(date(2024, 1, 1) + Duration::days(offset), before, &plan))
        .collect();
    assert_eq!(period.len(), 7);
    let total_mg: f64 = period.iter().map(|u| cypionate.dose_of_units(*u as f64)).sum();
    assert_relative_eq!(total_mg, 200.0, epsilon = 1e-9);
}

#[test]
fn curve_window_peaks_at_one_hundred_percent() {
    let settings = SimulationSettings::default();
    for compound in ["testosterone_propionate", "testosterone_cypionate", "testosterone_undecanoate", "hcg"] {
        let params = resolve_pk_parameters(compound, InjectionMethod::SubQ, OilType::Mct, InjectionSite::Abdomen, 0.2);
        let curve = simulate_concentration(&params, 100.0, Frequency::ThreePerWeek, 42.0, true, &settings);

        let peak = curve
            .iter()
            .filter(|p| in_window(p.day, settings.steady_state_start, settings.steady_state_end))
            .map(|p| p.percent)
            .fold(0.0, f64::max);
        assert_relative_eq!(peak, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn metrics_of_a_flat_series() {
    let metrics = SteadyStateMetrics::from_series(&[3.0, 3.0, 3.0]);
    assert_eq!(metrics.fluctuation, 0.0);
    assert_eq!(metrics.stability, 100.0);
    assert_eq!(metrics.trough_percent, 100.0);
}

proptest! {
    #[test]
    fn resolved_version_is_monotonic_in_date(
        offsets in prop::collection::vec(0i64..400, 1..6),
        a in 0i64..500,
        b in 0i64..500,
    ) {
        let start = date(2024, 1, 1);
        let versions: Vec<ProtocolVersion> = offsets
            .iter()
            .map(|offset| {
                ProtocolVersion::builder("testosterone_enanthate", 100.0 + *offset as f64, Frequency::Weekly)
                    .start_date(start)
                    .effective_from(start + Duration::days(*offset))
                    .build()
            })
            .collect();

        let (early, late) = (a.min(b), a.max(b));
        let first = resolve_protocol_version(start + Duration::days(early), &versions).unwrap();
        let second = resolve_protocol_version(start + Duration::days(late), &versions).unwrap();
        prop_assert!(first.effective_from <= second.effective_from);
    }
}
