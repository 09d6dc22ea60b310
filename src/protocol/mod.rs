//! Protocol history: which version of the dosing protocol governs a date.
//!
//! Versions are never edited in place. Every confirmed change to dose,
//! compound, frequency or graduation appends a new version with its own
//! effective-from date, so past dates keep resolving to the protocol that
//! was in force at the time.

pub mod backfill;
pub mod records;
pub mod schedule;

use chrono::NaiveDate;
use std::cmp::Reverse;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PKError, PKResult};
use crate::models::{
    resolve_pk_parameters, Compound, Frequency, InjectionMethod, InjectionSite, OilType, PkParameters,
};

pub use backfill::backfill_missed;
pub use records::{AdherenceSummary, BodySide, InjectionLog, InjectionRecord, InjectionStatus};
pub use schedule::{dose_for_date, injection_index, is_injection_day, upcoming_doses, ScheduledDose};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub compound_id: String,
    /// Drug amount per week, in the compound's unit
    pub weekly_dose: f64,
    pub frequency: Frequency,
    /// Smallest measurable increment on the device, in device units
    #[serde(default = "default_graduation")]
    pub graduation: u32,
    pub start_date: NaiveDate,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub method: InjectionMethod,
    #[serde(default)]
    pub oil: OilType,
    #[serde(default)]
    pub site: InjectionSite,
    #[serde(default)]
    pub note: String,
}

fn default_graduation() -> u32 {
    1
}

impl ProtocolVersion {
    pub fn builder(compound_id: &str, weekly_dose: f64, frequency: Frequency) -> ProtocolVersionBuilder {
        ProtocolVersionBuilder::new(compound_id, weekly_dose, frequency)
    }

    pub fn dose_per_injection(&self) -> f64 {
        self.weekly_dose / self.frequency.injections_per_week()
    }

    /// Parameters for a nominal injection of this version.
    pub fn pk_parameters(&self, compound: &Compound) -> PkParameters {
        resolve_pk_parameters(
            &self.compound_id,
            self.method,
            self.oil,
            self.site,
            compound.volume_ml(self.dose_per_injection()),
        )
    }
}

pub struct ProtocolVersionBuilder {
    version: ProtocolVersion,
    effective_from: Option<NaiveDate>,
}

impl ProtocolVersionBuilder {
    fn new(compound_id: &str, weekly_dose: f64, frequency: Frequency) -> Self {
        Self {
            version: ProtocolVersion {
                compound_id: compound_id.to_string(),
                weekly_dose,
                frequency,
                graduation: default_graduation(),
                start_date: NaiveDate::default(),
                effective_from: NaiveDate::default(),
                method: InjectionMethod::default(),
                oil: OilType::default(),
                site: InjectionSite::default(),
                note: String::new(),
            },
            effective_from: None,
        }
    }

    pub fn graduation(mut self, graduation: u32) -> Self {
        self.version.graduation = graduation;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.version.start_date = date;
        self
    }

    /// Defaults to the start date when not set.
    pub fn effective_from(mut self, date: NaiveDate) -> Self {
        self.effective_from = Some(date);
        self
    }

    pub fn method(mut self, method: InjectionMethod) -> Self {
        self.version.method = method;
        self
    }

    pub fn oil(mut self, oil: OilType) -> Self {
        self.version.oil = oil;
        self
    }

    pub fn site(mut self, site: InjectionSite) -> Self {
        self.version.site = site;
        self
    }

    pub fn note(mut self, note: &str) -> Self {
        self.version.note = note.to_string();
        self
    }

    pub fn build(mut self) -> ProtocolVersion {
        self.version.effective_from = self.effective_from.unwrap_or(self.version.start_date);
        self.version
    }
}

/// The version in force on `date`: the latest whose effective-from is not
/// after it. Dates before every version resolve to the earliest one.
/// Among versions sharing an effective-from date, the first listed wins.
pub fn resolve_protocol_version(date: NaiveDate, versions: &[ProtocolVersion]) -> Option<&ProtocolVersion> {
    let governing = versions
        .iter()
        .filter(|v| v.effective_from <= date)
        .min_by_key(|v| Reverse(v.effective_from));

    governing.or_else(|| {
        let earliest = versions.iter().min_by_key(|v| v.effective_from);
        if let Some(v) = earliest {
            warn!(
                "{} precedes every protocol version; using the earliest ({})",
                date,
                v.effective_from
            );
        }
        earliest
    })
}

/// Append-only history of protocol versions ordered by effective-from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolHistory {
    versions: Vec<ProtocolVersion>,
}

impl ProtocolHistory {
    /// Start a history from the initial setup.
    pub fn new(initial: ProtocolVersion) -> PKResult<Self> {
        if initial.effective_from < initial.start_date {
            return Err(PKError::InvalidProtocol(format!(
                "first version takes effect on {} before its start date {}",
                initial.effective_from, initial.start_date
            )));
        }

        Ok(Self { versions: vec![initial] })
    }

    pub fn from_versions(mut versions: Vec<ProtocolVersion>) -> PKResult<Self> {
        versions.sort_by_key(|v| v.effective_from);
        let mut rest = versions.into_iter();

        let Some(first) = rest.next() else {
            return Err(PKError::InvalidProtocol(
                "at least one protocol version is required".to_string()
            ));
        };

        let mut history = Self::new(first)?;
        for version in rest {
            history.append(version)?;
        }

        Ok(history)
    }

    /// Record a confirmed protocol change. Each version needs an
    /// effective-from date after the latest one.
    pub fn append(&mut self, version: ProtocolVersion) -> PKResult<()> {
        if let Some(latest) = self.versions.last() {
            if version.effective_from <= latest.effective_from {
                return Err(PKError::InvalidProtocol(format!(
                    "version effective {} does not follow the latest version ({})",
                    version.effective_from, latest.effective_from
                )));
            }
        }

        info!(
            "Protocol change effective {}: {} {} {}",
            version.effective_from,
            version.weekly_dose,
            version.compound_id,
            version.frequency
        );
        self.versions.push(version);
        Ok(())
    }

    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    pub fn resolve(&self, date: NaiveDate) -> &ProtocolVersion {
        // Never empty: both constructors require a version
        resolve_protocol_version(date, &self.versions).unwrap_or(&self.versions[0])
    }

    pub fn latest(&self) -> &ProtocolVersion {
        &self.versions[self.versions.len() - 1]
    }

    /// Earliest date any version of the protocol was started.
    pub fn first_start_date(&self) -> NaiveDate {
        self.versions
            .iter()
            .map(|v| v.start_date)
            .min()
            .unwrap_or_default()
    }
}
