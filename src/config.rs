use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PKError, PKResult};
use crate::models::{builtin_catalog, find_compound, Compound};
use crate::protocol::{InjectionLog, InjectionRecord, ProtocolHistory, ProtocolVersion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compounds: Vec<Compound>,
    pub protocol: Vec<ProtocolVersion>,
    #[serde(default)]
    pub injections: Vec<InjectionRecord>,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Sampling and windowing parameters shared by the simulation routines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Length of generated curves in days
    pub horizon_days: f64,
    pub curve_points_per_day: u32,
    pub stability_points_per_day: u32,
    /// Steady-state window used for normalisation and stability, in days
    pub steady_state_start: f64,
    pub steady_state_end: f64,
    /// Step of the theoretical steady-state scan in live status, in days
    pub live_resolution_days: f64,
    /// Only the most recent logged doses count towards live status
    pub live_recent_doses: Option<usize>,
    /// Lower bound on how long a dose keeps contributing, in days
    pub min_cutoff_days: f64,
    pub miss_cutoff_hour: u32,
    pub miss_cutoff_minute: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            horizon_days: 42.0,
            curve_points_per_day: 12,
            stability_points_per_day: 24,
            steady_state_start: 28.0,
            steady_state_end: 42.0,
            live_resolution_days: 0.1,
            live_recent_doses: Some(10),
            min_cutoff_days: 30.0,
            miss_cutoff_hour: 22,
            miss_cutoff_minute: 0,
        }
    }
}

impl SimulationSettings {
    /// Local time after which today's scheduled dose counts as missed.
    pub fn miss_cutoff(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.miss_cutoff_hour, self.miss_cutoff_minute, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    pub fn validate(&self) -> PKResult<()> {
        if self.horizon_days <= 0.0 {
            return Err(PKError::Validation("Horizon must be positive".to_string()));
        }

        if self.curve_points_per_day == 0 || self.stability_points_per_day == 0 {
            return Err(PKError::Validation(
                "Sampling resolution must be at least one point per day".to_string()
            ));
        }

        if self.steady_state_start < 0.0 || self.steady_state_end <= self.steady_state_start {
            return Err(PKError::Validation(format!(
                "Invalid steady-state window {}-{}",
                self.steady_state_start, self.steady_state_end
            )));
        }

        if self.live_resolution_days <= 0.0 {
            return Err(PKError::Validation(
                "Live status resolution must be positive".to_string()
            ));
        }

        if NaiveTime::from_hms_opt(self.miss_cutoff_hour, self.miss_cutoff_minute, 0).is_none() {
            return Err(PKError::Validation(format!(
                "Invalid miss cutoff {:02}:{:02}",
                self.miss_cutoff_hour, self.miss_cutoff_minute
            )));
        }

        Ok(())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PKResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PKResult<()> {
        if self.protocol.is_empty() {
            return Err(PKError::InvalidProtocol(
                "At least one protocol version must be specified".to_string()
            ));
        }

        for compound in &self.compounds {
            if compound.concentration <= 0.0 {
                return Err(PKError::Validation(format!(
                    "Compound {} must have a positive concentration",
                    compound.id
                )));
            }
        }

        let catalog = self.catalog();
        for version in &self.protocol {
            self.validate_version(version, &catalog)?;
        }

        // Ordering and first-version checks live with the history itself
        self.history()?;
        self.simulation.validate()?;

        Ok(())
    }

    fn validate_version(&self, version: &ProtocolVersion, catalog: &[Compound]) -> PKResult<()> {
        if version.weekly_dose <= 0.0 {
            return Err(PKError::InvalidDosing(format!(
                "Weekly dose must be positive (version effective {})",
                version.effective_from
            )));
        }

        if ![1, 2].contains(&version.graduation) {
            return Err(PKError::InvalidDosing(format!(
                "Device graduation must be 1 or 2 units, got {}",
                version.graduation
            )));
        }

        if find_compound(catalog, &version.compound_id).is_none() {
            return Err(PKError::InvalidProtocol(format!(
                "Unknown compound: {}",
                version.compound_id
            )));
        }

        Ok(())
    }

    /// Declared compounds, or the built-in catalog when none are declared.
    pub fn catalog(&self) -> Vec<Compound> {
        if self.compounds.is_empty() {
            builtin_catalog()
        } else {
            self.compounds.clone()
        }
    }

    pub fn history(&self) -> PKResult<ProtocolHistory> {
        ProtocolHistory::from_versions(self.protocol.clone())
    }

    pub fn injection_log(&self) -> PKResult<InjectionLog> {
        InjectionLog::from_records(self.injections.clone())
    }
}

/// Parse a local evaluation time given as `YYYY-MM-DDTHH:MM:SS` or
/// `YYYY-MM-DD HH:MM`.
pub fn parse_timestamp(text: &str) -> PKResult<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .map_err(PKError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "protocol": [{
            "compound_id": "testosterone_enanthate",
            "weekly_dose": 250.0,
            "frequency": "2xW",
            "graduation": 2,
            "start_date": "2024-01-01",
            "effective_from": "2024-01-01",
            "method": "IM",
            "oil": "grapeseed",
            "site": "glute"
        }]
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.simulation, SimulationSettings::default());
        assert_eq!(config.catalog().len(), builtin_catalog().len());
        assert_eq!(config.simulation.miss_cutoff(), NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert!(config.injection_log().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_graduation() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.protocol[0].graduation = 5;
        assert!(matches!(config.validate(), Err(PKError::InvalidDosing(_))));
    }

    #[test]
    fn test_rejects_unknown_compound() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.protocol[0].compound_id = "nandrolone_decanoate".to_string();
        assert!(matches!(config.validate(), Err(PKError::InvalidProtocol(_))));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.simulation.steady_state_start = 40.0;
        config.simulation.steady_state_end = 30.0;
        assert!(matches!(config.validate(), Err(PKError::Validation(_))));
    }

    #[test]
    fn test_rejects_empty_protocol() {
        let config: Config = serde_json::from_str(r#"{"protocol": []}"#).unwrap();
        assert!(matches!(config.validate(), Err(PKError::InvalidProtocol(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(21, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-04T21:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-03-04 21:30 ").unwrap(), expected);
        assert!(matches!(parse_timestamp("yesterday"), Err(PKError::Timestamp(_))));
    }
}
