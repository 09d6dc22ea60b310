//! Pharmacokinetic simulation and dose reconciliation for periodic
//! hormone injections.
//!
//! The engine resolves per-compound PK parameters, simulates normalised
//! concentration curves with an uncertainty band, scores steady-state
//! stability, splits doses across device graduations, and reconciles a
//! versioned protocol against the injection log.

pub mod config;
pub mod dosing;
pub mod error;
pub mod models;
pub mod output;
pub mod protocol;
pub mod simulation;

pub use config::{Config, SimulationSettings};
pub use dosing::{measurable_units, optimize_rotation, units_raw, DosePlan, RotationPlan};
pub use error::{PKError, PKResult};
pub use models::{resolve_pk_parameters, Compound, Frequency, PkParameters};
pub use output::{save_results, TrackerReport};
pub use protocol::{
    backfill_missed, dose_for_date, injection_index, is_injection_day, resolve_protocol_version, upcoming_doses,
    InjectionLog, InjectionRecord, ProtocolHistory, ProtocolVersion,
};
pub use simulation::{analyze_stability, estimate_live_status, simulate_concentration, LiveStatus};
