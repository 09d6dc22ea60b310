pub mod compound;
pub mod frequency;
pub mod one_compartment;
pub mod parameters;

pub use compound::{builtin_catalog, find_compound, Compound, DoseUnit, EsterClass, UNITS_PER_ML};
pub use frequency::Frequency;
pub use one_compartment::OneCompartmentModel;
pub use parameters::{
    resolve_pk_parameters, InjectionMethod, InjectionSite, OilType, ParameterSet, PkParameters, Range,
};

pub trait PKModel {
    /// Concentration contributed by one dose `elapsed` days after injection.
    fn single_dose(&self, amount: f64, elapsed: f64) -> f64;
    /// Superposed concentration at `time` from every dose in the history.
    fn calculate_concentration(&self, time: f64, dose_history: &[DoseEvent]) -> f64;
    /// Age in days after which a dose is treated as fully eliminated.
    fn cutoff_days(&self) -> f64;
}

/// A single administered dose, `time` in days from the regimen origin.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseEvent {
    pub time: f64,
    pub amount: f64,
}
