//! Household appliance load simulator.
//!
//! Each running appliance unit draws power following an ADSR envelope,
//! modulated by a periodic wave and scaled by the appliance's selected
//! settings. Draw is aggregated per house and system-wide against a
//! scalable, pausable virtual clock.

pub mod appliances;
pub mod cli;
pub mod config;
pub mod error;
/// Clock, envelope math, houses and the aggregation engine.
pub mod sim;
pub mod telemetry;

pub use error::{ConfigError, SimError};
