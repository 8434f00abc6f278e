//! Datacenter IT-load, thermal and HVAC simulator.

pub mod carbon;
pub mod config;
/// Facility cooling: chiller, HVAC and cooling tower.
pub mod cooling;
pub mod datacenter;
pub mod equipment;
pub mod io;
/// Simulation engine, scheduling and KPI modules.
pub mod sim;
