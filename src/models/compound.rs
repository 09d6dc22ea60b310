use serde::{Deserialize, Serialize};

/// Pharmacological sub-type of a compound. Drives the baseline
/// absorption/elimination ranges used by the parameter resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsterClass {
    Propionate,
    Enanthate,
    Cypionate,
    Undecanoate,
    Hcg,
}

impl EsterClass {
    /// Derive the ester class from a compound identifier by substring match.
    /// Anything unrecognised is treated as enanthate.
    pub fn from_compound_id(id: &str) -> Self {
        let id = id.to_lowercase();

        if id.contains("propionate") {
            EsterClass::Propionate
        } else if id.contains("cypionate") {
            EsterClass::Cypionate
        } else if id.contains("undecanoate") {
            EsterClass::Undecanoate
        } else if id.contains("hcg") {
            EsterClass::Hcg
        } else {
            EsterClass::Enanthate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EsterClass::Propionate => "propionate",
            EsterClass::Enanthate => "enanthate",
            EsterClass::Cypionate => "cypionate",
            EsterClass::Undecanoate => "undecanoate",
            EsterClass::Hcg => "hcg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseUnit {
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "IU")]
    Iu,
}

impl DoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Mg => "mg",
            DoseUnit::Iu => "IU",
        }
    }
}

/// Device units per millilitre on a standard U-100 syringe.
pub const UNITS_PER_ML: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub id: String,
    pub name: String,
    /// Amount of drug per mL, expressed in `unit`
    pub concentration: f64,
    pub unit: DoseUnit,
}

impl Compound {
    pub fn new(id: &str, name: &str, concentration: f64, unit: DoseUnit) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            concentration,
            unit,
        }
    }

    pub fn ester_class(&self) -> EsterClass {
        EsterClass::from_compound_id(&self.id)
    }

    /// Drug amount delivered by `units` device units.
    pub fn dose_of_units(&self, units: f64) -> f64 {
        units / UNITS_PER_ML * self.concentration
    }

    /// Injected volume in mL for a drug amount.
    pub fn volume_ml(&self, amount: f64) -> f64 {
        if self.concentration <= 0.0 {
            return 0.0;
        }
        amount / self.concentration
    }

    /// Continuous (unrounded) device units needed to deliver `amount`.
    pub fn units_for_dose(&self, amount: f64) -> f64 {
        self.volume_ml(amount) * UNITS_PER_ML
    }
}

/// Commonly stocked preparations, used when a configuration does not
/// declare its own compounds.
pub fn builtin_catalog() -> Vec<Compound> {
    vec![
        Compound::new("testosterone_enanthate", "Testosterone Enanthate", 250.0, DoseUnit::Mg),
        Compound::new("testosterone_cypionate", "Testosterone Cypionate", 200.0, DoseUnit::Mg),
        Compound::new("testosterone_propionate", "Testosterone Propionate", 100.0, DoseUnit::Mg),
        Compound::new("testosterone_undecanoate", "Testosterone Undecanoate", 250.0, DoseUnit::Mg),
        Compound::new("hcg", "hCG", 5000.0, DoseUnit::Iu),
    ]
}

pub fn find_compound<'a>(catalog: &'a [Compound], id: &str) -> Option<&'a Compound> {
    catalog.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ester_class_from_id() {
        assert_eq!(EsterClass::from_compound_id("test_prop"), EsterClass::Enanthate);
        assert_eq!(EsterClass::from_compound_id("Testosterone_Propionate"), EsterClass::Propionate);
        assert_eq!(EsterClass::from_compound_id("testosterone_cypionate"), EsterClass::Cypionate);
        assert_eq!(EsterClass::from_compound_id("nebido_undecanoate"), EsterClass::Undecanoate);
        assert_eq!(EsterClass::from_compound_id("HCG"), EsterClass::Hcg);
        assert_eq!(EsterClass::from_compound_id("something_else"), EsterClass::Enanthate);
    }

    #[test]
    fn test_unit_conversions() {
        let compound = Compound::new("testosterone_enanthate", "Test E", 250.0, DoseUnit::Mg);

        assert_relative_eq!(compound.volume_ml(125.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(compound.units_for_dose(125.0), 50.0, epsilon = 1e-9);
        assert_relative_eq!(compound.dose_of_units(52.0), 130.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_concentration_volume() {
        let compound = Compound::new("broken", "Broken", 0.0, DoseUnit::Mg);
        assert_eq!(compound.volume_ml(100.0), 0.0);
    }

    #[test]
    fn test_builtin_catalog_lookup() {
        let catalog = builtin_catalog();
        let hcg = find_compound(&catalog, "hcg").unwrap();
        assert_eq!(hcg.unit, DoseUnit::Iu);
        assert_eq!(hcg.ester_class(), EsterClass::Hcg);
        assert!(find_compound(&catalog, "missing").is_none());
    }
}
