use chrono::{Duration, NaiveDateTime};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::config::Config;
use crate::dosing::{units_raw, DosePlan};
use crate::error::{PKError, PKResult};
use crate::models::{find_compound, Compound, PkParameters};
use crate::protocol::{
    backfill_missed, upcoming_doses, AdherenceSummary, InjectionRecord, ProtocolVersion, ScheduledDose,
};
use crate::simulation::{analyze_stability, estimate_live_status, simulate_concentration, CurvePoint, LiveStatus, StabilityReport};

/// Scalar results for the protocol in force at `generated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub generated_at: NaiveDateTime,
    pub compound: Compound,
    pub version: ProtocolVersion,
    pub parameters: PkParameters,
    pub units_raw: f64,
    pub dose_plan: DosePlan,
    pub stability: StabilityReport,
    pub live_status: Option<LiveStatus>,
    /// Adherence over the last four weeks, backfilled misses included
    pub adherence: AdherenceSummary,
}

#[derive(Debug, Clone)]
pub struct TrackerReport {
    pub summary: Summary,
    pub curve: Vec<CurvePoint>,
    pub schedule: Vec<ScheduledDose>,
    pub backfill: Vec<InjectionRecord>,
}

impl TrackerReport {
    /// Run every engine query for the configuration as of `now`.
    pub fn build(config: &Config, now: NaiveDateTime, horizon_days: f64) -> PKResult<Self> {
        let settings = &config.simulation;
        let catalog = config.catalog();
        let history = config.history()?;
        let mut log = config.injection_log()?;
        let today = now.date();

        let version = history.resolve(today).clone();
        let compound = find_compound(&catalog, &version.compound_id)
            .cloned()
            .ok_or_else(|| PKError::InvalidProtocol(format!("Unknown compound: {}", version.compound_id)))?;

        let parameters = version.pk_parameters(&compound);
        let dose = version.dose_per_injection();

        let curve = simulate_concentration(&parameters, dose, version.frequency, horizon_days, true, settings);
        let stability = analyze_stability(&parameters, dose, version.frequency, settings);

        let backfill = backfill_missed(now, &history, &log, settings.miss_cutoff());
        log.extend_missing(backfill.clone());

        let live_status = estimate_live_status(now, log.records(), &version, &compound, settings);
        let adherence = log.adherence(today - Duration::days(28), today);

        let schedule_days = 7 * version.frequency.period_weeks() * 2;
        let schedule = upcoming_doses(today, schedule_days, &history, &catalog);

        Ok(Self {
            summary: Summary {
                generated_at: now,
                units_raw: units_raw(version.weekly_dose, version.frequency.injections_per_week(), compound.concentration),
                dose_plan: DosePlan::for_version(&version, &compound),
                compound,
                version,
                parameters,
                stability,
                live_status,
                adherence,
            },
            curve,
            schedule,
            backfill,
        })
    }
}

pub fn save_results<P: AsRef<Path>>(report: &TrackerReport, output_dir: P) -> PKResult<()> {
    let output_path = output_dir.as_ref();

    save_curve(&report.curve, output_path.join("curve.csv"))?;
    save_schedule(&report.schedule, output_path.join("schedule.csv"))?;
    save_backfill(&report.backfill, output_path.join("backfill.csv"))?;
    save_summary(&report.summary, output_path.join("summary.json"))?;
    generate_report(report, output_path)?;

    info!("All results saved to {:?}", output_path);
    Ok(())
}

fn save_curve<P: AsRef<Path>>(curve: &[CurvePoint], path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(["DAY", "PERCENT", "PERCENT_MIN", "PERCENT_MAX"])?;

    for point in curve {
        writer.write_record(&[
            format!("{:.4}", point.day),
            format!("{:.3}", point.percent),
            point.percent_min.map(|v| format!("{:.3}", v)).unwrap_or_default(),
            point.percent_max.map(|v| format!("{:.3}", v)).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_schedule<P: AsRef<Path>>(schedule: &[ScheduledDose], path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(["DATE", "WEEKDAY", "UNITS", "COMPOUND", "VERSION"])?;

    for dose in schedule {
        writer.write_record(&[
            dose.date.to_string(),
            dose.date.format("%a").to_string(),
            dose.units.to_string(),
            dose.compound_id.clone(),
            dose.version.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_backfill<P: AsRef<Path>>(records: &[InjectionRecord], path: P) -> PKResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(["DATE", "STATUS", "REASON"])?;

    for record in records {
        writer.write_record(&[
            record.date.to_string(),
            "missed".to_string(),
            record.miss_reason.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_summary<P: AsRef<Path>>(summary: &Summary, path: P) -> PKResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

fn describe_plan(plan: &DosePlan) -> String {
    match plan {
        DosePlan::Flat { units } => format!("{} units every injection (no rotation)", units),
        DosePlan::Rotation(rotation) => format!(
            "{} x {} units + {} x {} units per period (total {:.2}, target {:.2}, deviation {:.2})",
            rotation.lower_count,
            rotation.lower_units,
            rotation.higher_count,
            rotation.higher_units,
            rotation.total_dose,
            rotation.target_dose,
            rotation.deviation
        ),
    }
}

fn describe_live(live: Option<&LiveStatus>) -> String {
    match live {
        Some(status) => format!(
            "- **Current level**: {}% of steady-state peak\n\
             - **Hours since last dose**: {:.1}\n\
             - **Hours to next peak**: {:.1}\n\
             - **Days on protocol**: {}",
            status.current_percent, status.hours_since_last, status.hours_to_next_peak, status.days_on_protocol
        ),
        None => "No timed injections logged yet.".to_string(),
    }
}

/// Generate a human-readable report
pub fn generate_report<P: AsRef<Path>>(report: &TrackerReport, output_dir: P) -> PKResult<()> {
    let report_path = output_dir.as_ref().join("report.md");
    let summary = &report.summary;
    let unit = summary.compound.unit.as_str();

    let report_content = format!(
        r#"# Dosing Report

Generated for {}.

## Active Protocol
- **Compound**: {} ({} {}/mL)
- **Weekly dose**: {:.2} {}
- **Frequency**: {}
- **Effective from**: {}
- **Administration**: {} / {} / {}

## Pharmacokinetic Parameters
- **Half-life**: {:.2} days (range {:.2}-{:.2})
- **Time to peak**: {:.2} days (range {:.2}-{:.2})
- **Bioavailability**: {:.0}%

## Steady State
- **Stability**: {:.1}% (range {:.1}-{:.1}%)
- **Fluctuation**: {:.1}% (range {:.1}-{:.1}%)
- **Trough**: {:.1}% of peak (range {:.1}-{:.1}%)

## Dosing
- **Raw amount**: {:.2} units per injection
- **Plan**: {}

## Live Status
{}

## Adherence (last 28 days)
- **Done**: {}
- **Missed**: {} ({} newly backfilled)
- **Adherence**: {:.1}%

## Files Generated
- `curve.csv`: Percent-of-peak concentration curve with uncertainty band
- `schedule.csv`: Upcoming injections and their device units
- `backfill.csv`: Scheduled days flagged as missed
- `summary.json`: All computed values
"#,
        summary.generated_at.format("%Y-%m-%d %H:%M"),
        summary.compound.name,
        summary.compound.concentration,
        unit,
        summary.version.weekly_dose,
        unit,
        summary.version.frequency,
        summary.version.effective_from,
        summary.parameters.method.as_str(),
        summary.parameters.oil.as_str(),
        summary.parameters.site.as_str(),
        summary.parameters.half_life.base,
        summary.parameters.half_life.min,
        summary.parameters.half_life.max,
        summary.parameters.time_to_peak.base,
        summary.parameters.time_to_peak.min,
        summary.parameters.time_to_peak.max,
        summary.parameters.bioavailability * 100.0,
        summary.stability.stability.base,
        summary.stability.stability.min,
        summary.stability.stability.max,
        summary.stability.fluctuation.base,
        summary.stability.fluctuation.min,
        summary.stability.fluctuation.max,
        summary.stability.trough_percent.base,
        summary.stability.trough_percent.min,
        summary.stability.trough_percent.max,
        summary.units_raw,
        describe_plan(&summary.dose_plan),
        describe_live(summary.live_status.as_ref()),
        summary.adherence.done,
        summary.adherence.missed,
        report.backfill.len(),
        summary.adherence.percent,
    );

    std::fs::write(report_path, report_content)?;
    Ok(())
}
