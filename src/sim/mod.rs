pub mod engine;
pub mod kpi;
/// Setpoint policy and workload profiles.
pub mod schedule;
pub mod types;
