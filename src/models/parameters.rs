//! Resolution of pharmacokinetic parameters from a compound and the way it
//! is administered.
//!
//! Every query builds a fresh [`PkParameters`] value from fixed lookup
//! tables: the ester class gives baseline half-life and time-to-peak
//! ranges, and the injection method, carrier oil, site and volume each
//! contribute a multiplier to both.

use serde::{Deserialize, Serialize};
use log::debug;

use super::compound::EsterClass;

/// A `{min, base, max}` triple describing parameter uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub base: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, base: f64, max: f64) -> Self {
        Self { min, base, max }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            base: self.base * factor,
            max: self.max * factor,
        }
    }

    pub fn get(&self, set: ParameterSet) -> f64 {
        match set {
            ParameterSet::Min => self.min,
            ParameterSet::Base => self.base,
            ParameterSet::Max => self.max,
        }
    }
}

/// Which end of the uncertainty band a simulation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSet {
    Min,
    Base,
    Max,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum InjectionMethod {
    #[default]
    Im,
    SubQ,
}

impl InjectionMethod {
    /// Unknown labels are treated as intramuscular.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "subq" | "sub-q" | "sc" | "subcutaneous" => InjectionMethod::SubQ,
            _ => InjectionMethod::Im,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionMethod::Im => "IM",
            InjectionMethod::SubQ => "SubQ",
        }
    }

    /// Absorption multiplier applied to half-life and time-to-peak.
    pub fn absorption_modifier(&self) -> f64 {
        match self {
            InjectionMethod::Im => 1.0,
            InjectionMethod::SubQ => 1.12,
        }
    }

    pub fn bioavailability(&self) -> f64 {
        match self {
            InjectionMethod::Im => 0.70,
            InjectionMethod::SubQ => 0.82,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum OilType {
    Mct,
    GrapeSeed,
    Sesame,
    Castor,
    #[default]
    Other,
}

impl OilType {
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "mct" => OilType::Mct,
            "grapeseed" | "gso" => OilType::GrapeSeed,
            "sesame" => OilType::Sesame,
            "castor" => OilType::Castor,
            _ => OilType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OilType::Mct => "MCT",
            OilType::GrapeSeed => "grapeseed",
            OilType::Sesame => "sesame",
            OilType::Castor => "castor",
            OilType::Other => "other",
        }
    }

    pub fn modifier(&self) -> f64 {
        match self {
            OilType::Mct => 0.95,
            OilType::GrapeSeed => 1.0,
            OilType::Sesame => 1.05,
            OilType::Castor => 1.10,
            OilType::Other => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum InjectionSite {
    Glute,
    #[default]
    Deltoid,
    Quad,
    Abdomen,
}

impl InjectionSite {
    /// Unknown sites resolve to the deltoid, whose modifier is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "glute" | "gluteal" | "ventroglute" => InjectionSite::Glute,
            "quad" | "thigh" | "vastus" => InjectionSite::Quad,
            "abdomen" | "belly" => InjectionSite::Abdomen,
            _ => InjectionSite::Deltoid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionSite::Glute => "glute",
            InjectionSite::Deltoid => "deltoid",
            InjectionSite::Quad => "quad",
            InjectionSite::Abdomen => "abdomen",
        }
    }

    pub fn modifier(&self) -> f64 {
        match self {
            InjectionSite::Glute => 1.08,
            InjectionSite::Deltoid => 1.0,
            InjectionSite::Quad => 1.02,
            InjectionSite::Abdomen => 1.12,
        }
    }
}

macro_rules! label_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<String> for $ty {
                fn from(label: String) -> Self {
                    <$ty>::from_label(&label)
                }
            }

            impl From<$ty> for &'static str {
                fn from(value: $ty) -> Self {
                    value.as_str()
                }
            }
        )*
    };
}

label_conversions!(InjectionMethod, OilType, InjectionSite);

/// Small injections absorb slightly faster, large depots slightly slower.
pub fn volume_modifier(volume_ml: f64) -> f64 {
    if volume_ml < 0.3 {
        0.95
    } else if volume_ml > 0.5 {
        1.08
    } else {
        1.0
    }
}

/// Baseline (half-life, time-to-peak) ranges in days for each ester class.
pub fn ester_ranges(ester: EsterClass) -> (Range, Range) {
    match ester {
        EsterClass::Propionate => (Range::new(0.8, 1.0, 1.2), Range::new(0.5, 0.75, 1.0)),
        EsterClass::Enanthate => (Range::new(4.0, 4.5, 5.0), Range::new(1.0, 1.5, 2.0)),
        EsterClass::Cypionate => (Range::new(5.0, 5.5, 6.0), Range::new(1.5, 2.0, 2.5)),
        EsterClass::Undecanoate => (Range::new(18.0, 21.0, 24.0), Range::new(5.0, 7.0, 9.0)),
        EsterClass::Hcg => (Range::new(1.0, 1.5, 2.0), Range::new(0.5, 1.0, 1.5)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkParameters {
    pub ester: EsterClass,
    /// Elimination half-life in days
    pub half_life: Range,
    /// Time from injection to peak concentration in days
    pub time_to_peak: Range,
    pub bioavailability: f64,
    pub method: InjectionMethod,
    pub oil: OilType,
    pub site: InjectionSite,
    pub total_modifier: f64,
}

pub fn resolve_pk_parameters(
    compound_id: &str,
    method: InjectionMethod,
    oil: OilType,
    site: InjectionSite,
    volume_ml: f64,
) -> PkParameters {
    let ester = EsterClass::from_compound_id(compound_id);
    let (half_life, time_to_peak) = ester_ranges(ester);

    let total_modifier = method.absorption_modifier()
        * oil.modifier()
        * site.modifier()
        * volume_modifier(volume_ml);

    debug!(
        "Resolved {} ({}) via {}/{}/{} at {:.2} mL: modifier {:.4}",
        compound_id,
        ester.as_str(),
        method.as_str(),
        oil.as_str(),
        site.as_str(),
        volume_ml,
        total_modifier
    );

    PkParameters {
        ester,
        half_life: half_life.scale(total_modifier),
        time_to_peak: time_to_peak.scale(total_modifier),
        bioavailability: method.bioavailability(),
        method,
        oil,
        site,
        total_modifier,
    }
}
