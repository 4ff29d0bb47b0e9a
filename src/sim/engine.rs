//! Simulation engine: houses, shared clock and the latest readings.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::appliances::{ApplianceCatalog, ApplianceGroup};
use crate::error::SimError;

use super::clock::VirtualClock;
use super::house::House;
use super::types::Snapshot;

/// A fixed set of houses sharing one catalog and one virtual clock.
///
/// This is the surface external collaborators talk to: they change
/// appliance counts and settings, pause or resume time, and read the
/// snapshot left behind by the most recent [`tick`](Self::tick). Every
/// method takes `&self`; share the engine as `Arc<Simulation>`.
pub struct Simulation {
    catalog: Arc<ApplianceCatalog>,
    clock: Arc<VirtualClock>,
    houses: Vec<House>,
    latest: RwLock<Snapshot>,
    /// Held for a whole tick so ticks never interleave.
    tick_guard: Mutex<()>,
}

impl Simulation {
    /// Creates `houses` idle houses over `catalog`.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Appliance types available in every house
    /// * `houses` - Number of houses
    /// * `clock` - Clock all envelope math is evaluated against
    pub fn new(catalog: Arc<ApplianceCatalog>, houses: usize, clock: Arc<VirtualClock>) -> Self {
        info!(
            houses,
            appliances = catalog.len(),
            time_scale = clock.scale(),
            "simulation created"
        );
        Self {
            houses: (0..houses).map(|_| House::new(&catalog)).collect(),
            latest: RwLock::new(Snapshot::idle(houses)),
            tick_guard: Mutex::new(()),
            catalog,
            clock,
        }
    }

    fn house(&self, house: usize) -> Result<&House, SimError> {
        self.houses.get(house).ok_or(SimError::UnknownHouse(house))
    }

    /// Switches units of `appliance` in `house` on or off.
    ///
    /// # Errors
    ///
    /// `UnknownHouse`, `UnknownAppliance`, or `OutOfRange` if `count`
    /// exceeds the appliance's maximum.
    pub fn set_appliance_count(
        &self,
        house: usize,
        appliance: &str,
        count: usize,
    ) -> Result<(), SimError> {
        let group = self.house(house)?.group(appliance)?;
        let now = self.clock.elapsed();
        group.lock().set_count(count, now)
    }

    /// Selects `value` for `option` on `appliance` in `house`.
    ///
    /// # Errors
    ///
    /// `UnknownHouse`, `UnknownAppliance`, `NoSettingsSchema` or
    /// `UnknownOption`.
    pub fn set_appliance_setting(
        &self,
        house: usize,
        appliance: &str,
        option: &str,
        value: &str,
    ) -> Result<(), SimError> {
        self.house(house)?
            .group(appliance)?
            .lock()
            .set_setting(option, value)
    }

    pub fn pause_simulation(&self) {
        self.clock.pause();
    }

    pub fn resume_simulation(&self) {
        self.clock.resume();
    }

    /// Recomputes every group at a single simulation instant.
    ///
    /// Released units that finished ramping down are pruned first. A group
    /// that fails to evaluate counts as 0 W and is reported in
    /// [`Snapshot::faults`]; all other readings stay valid. The result is
    /// also kept as the latest snapshot.
    ///
    /// Concurrent callers are serialized, so each tick prunes and samples
    /// at its own instant and the latest snapshot never moves backwards.
    pub fn tick(&self) -> Snapshot {
        let _guard = self.tick_guard.lock();
        let now = self.clock.elapsed();
        let mut faults = Vec::new();
        let houses: Vec<_> = self
            .houses
            .iter()
            .enumerate()
            .map(|(id, house)| house.sample(id, now, &mut faults))
            .collect();
        let watts = houses.iter().map(|h| h.watts).sum();

        let snapshot = Snapshot {
            sim_secs: now,
            time_of_day: self.clock.time_of_day(),
            paused: self.clock.is_paused(),
            houses,
            watts,
            faults,
        };
        *self.latest.write() = snapshot.clone();
        snapshot
    }

    /// Readings from the most recent tick.
    pub fn snapshot(&self) -> Snapshot {
        self.latest.read().clone()
    }

    /// Units of `appliance` currently switched on in `house`.
    ///
    /// # Errors
    ///
    /// `UnknownHouse` or `UnknownAppliance`.
    pub fn appliance_count(&self, house: usize, appliance: &str) -> Result<usize, SimError> {
        Ok(self.house(house)?.group(appliance)?.lock().count())
    }

    /// Current settings power factor of `appliance` in `house`.
    ///
    /// # Errors
    ///
    /// `UnknownHouse` or `UnknownAppliance`.
    pub fn settings_multiplier(&self, house: usize, appliance: &str) -> Result<f64, SimError> {
        Ok(self
            .house(house)?
            .group(appliance)?
            .lock()
            .settings_multiplier())
    }

    /// Currently selected value of `option`.
    ///
    /// # Errors
    ///
    /// `UnknownHouse`, `UnknownAppliance`, `NoSettingsSchema` or
    /// `UnknownOption`.
    pub fn appliance_setting(
        &self,
        house: usize,
        appliance: &str,
        option: &str,
    ) -> Result<String, SimError> {
        let group = self.house(house)?.group(appliance)?.lock();
        if group.appliance().settings.is_none() {
            return Err(SimError::NoSettingsSchema(appliance.to_string()));
        }
        group
            .setting(option)
            .map(str::to_string)
            .ok_or_else(|| SimError::UnknownOption {
                appliance: appliance.to_string(),
                option: option.to_string(),
            })
    }

    /// Runs `f` on the locked group of `appliance` in `house`.
    ///
    /// # Errors
    ///
    /// `UnknownHouse` or `UnknownAppliance`.
    pub fn inspect<R>(
        &self,
        house: usize,
        appliance: &str,
        f: impl FnOnce(&ApplianceGroup) -> R,
    ) -> Result<R, SimError> {
        let group = self.house(house)?.group(appliance)?.lock();
        Ok(f(&group))
    }

    pub fn house_count(&self) -> usize {
        self.houses.len()
    }

    pub fn catalog(&self) -> &ApplianceCatalog {
        &self.catalog
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }
}
