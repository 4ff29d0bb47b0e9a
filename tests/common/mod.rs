//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use houseload_sim::appliances::{ApplianceCatalog, ApplianceType, SettingOption};
use houseload_sim::sim::clock::{ManualTime, VirtualClock};
use houseload_sim::sim::engine::Simulation;
use houseload_sim::sim::envelope::EnvelopeParams;

/// 100 W heater: attack 1 s, decay 1 s, sustain 0.5, release 1 s, no wave.
pub fn heater() -> ApplianceType {
    ApplianceType::new("Heater", 100.0, 3, EnvelopeParams::new(1.0, 1.0, 0.5, 1.0))
}

/// Single-option appliance with factors `A = 0.5`, `B = 1.0`.
pub fn mixer() -> ApplianceType {
    ApplianceType::new("Mixer", 200.0, 1, EnvelopeParams::new(0.0, 0.0, 1.0, 0.0))
        .with_settings(vec![SettingOption::new("p", &[("A", 0.5), ("B", 1.0)])])
}

/// Simulation over `catalog` driven by a manual time source at scale 1.
pub fn manual_simulation(
    catalog: ApplianceCatalog,
    houses: usize,
) -> (Arc<ManualTime>, Arc<Simulation>) {
    let time = Arc::new(ManualTime::new());
    let clock = Arc::new(VirtualClock::with_source(1.0, time.clone()));
    let sim = Simulation::new(Arc::new(catalog), houses, clock);
    (time, Arc::new(sim))
}

/// Two houses with the heater and the mixer.
pub fn test_simulation() -> (Arc<ManualTime>, Arc<Simulation>) {
    manual_simulation(ApplianceCatalog::new_unchecked(vec![heater(), mixer()]), 2)
}

/// Nine houses with the built-in household catalog.
pub fn household_simulation() -> (Arc<ManualTime>, Arc<Simulation>) {
    manual_simulation(ApplianceCatalog::household(), 9)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
