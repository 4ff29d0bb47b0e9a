//! Live state of one appliance type inside one house.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SimError;
use crate::sim::envelope::{self, EnvelopeRecord};

use super::catalog::ApplianceType;

/// Running units of one appliance type in one house.
///
/// Tracks the requested unit count, one envelope record per unit that is
/// running or still ramping down, and the currently selected settings.
/// Count and records are only ever changed together, so after every call
/// the number of active records equals [`count`](Self::count).
#[derive(Debug, Clone)]
pub struct ApplianceGroup {
    appliance: Arc<ApplianceType>,
    count: usize,
    records: Vec<EnvelopeRecord>,
    /// Selected value per schema option, in schema order.
    selections: Vec<String>,
}

impl ApplianceGroup {
    /// Creates an idle group with every option set to its first value.
    pub fn new(appliance: Arc<ApplianceType>) -> Self {
        let selections = appliance
            .settings
            .as_ref()
            .map(|schema| {
                schema
                    .options
                    .iter()
                    .map(|o| o.default_value().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            appliance,
            count: 0,
            records: Vec::new(),
            selections,
        }
    }

    pub fn appliance(&self) -> &ApplianceType {
        &self.appliance
    }

    pub fn name(&self) -> &str {
        &self.appliance.name
    }

    /// Number of units currently switched on.
    pub fn count(&self) -> usize {
        self.count
    }

    /// All tracked records, active and releasing, oldest first.
    pub fn records(&self) -> &[EnvelopeRecord] {
        &self.records
    }

    pub fn active_records(&self) -> usize {
        self.records.iter().filter(|r| r.is_active).count()
    }

    /// Switches units on or off so that `new_count` are running.
    ///
    /// New units start their attack at `now`. When reducing, the earliest
    /// added active records are released first, with their release starting
    /// at `now`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `new_count` exceeds the appliance's maximum.
    pub fn set_count(&mut self, new_count: usize, now: f64) -> Result<(), SimError> {
        let max = self.appliance.max_count;
        if new_count > max {
            return Err(SimError::OutOfRange {
                appliance: self.appliance.name.clone(),
                requested: new_count,
                max,
            });
        }

        if new_count > self.count {
            let added = new_count - self.count;
            self.records
                .extend(std::iter::repeat_n(EnvelopeRecord::on(now), added));
        } else if new_count < self.count {
            let mut excess = self.count - new_count;
            for record in self.records.iter_mut().filter(|r| r.is_active) {
                if excess == 0 {
                    break;
                }
                *record = EnvelopeRecord::off(now);
                excess -= 1;
            }
        }

        debug!(
            appliance = %self.appliance.name,
            from = self.count,
            to = new_count,
            sim_secs = now,
            "count changed"
        );
        self.count = new_count;
        Ok(())
    }

    /// Selects `value` for the option `name`.
    ///
    /// Values outside the option's list are accepted and contribute a
    /// factor of 1.0.
    ///
    /// # Errors
    ///
    /// Returns `NoSettingsSchema` if the appliance has no settings, or
    /// `UnknownOption` if it has no option called `name`.
    pub fn set_setting(&mut self, name: &str, value: &str) -> Result<(), SimError> {
        let schema = self
            .appliance
            .settings
            .as_ref()
            .ok_or_else(|| SimError::NoSettingsSchema(self.appliance.name.clone()))?;
        let idx = schema
            .options
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| SimError::UnknownOption {
                appliance: self.appliance.name.clone(),
                option: name.to_string(),
            })?;

        if !schema.options[idx].allows(value) {
            warn!(
                appliance = %self.appliance.name,
                option = name,
                value,
                "accepting unlisted setting value"
            );
        }
        debug!(appliance = %self.appliance.name, option = name, value, "setting changed");
        self.selections[idx] = value.to_string();
        Ok(())
    }

    /// Currently selected value of option `name`.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// `(option, value)` pairs in schema order.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.appliance
            .settings
            .iter()
            .flat_map(|schema| schema.options.iter())
            .zip(self.selections.iter())
            .map(|(option, value)| (option.name.as_str(), value.as_str()))
    }

    /// Product of the power factors of the current selections.
    pub fn settings_multiplier(&self) -> f64 {
        let Some(schema) = &self.appliance.settings else {
            return 1.0;
        };
        schema
            .options
            .iter()
            .zip(&self.selections)
            .map(|(option, value)| option.factor(value))
            .product()
    }

    /// Drops released records whose release ramp has finished.
    ///
    /// Returns the number of records removed.
    pub fn prune(&mut self, now: f64) -> usize {
        let release = self.appliance.envelope.release;
        let before = self.records.len();
        self.records.retain(|r| !r.is_expired(release, now));
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(appliance = %self.appliance.name, removed, "pruned released units");
        }
        removed
    }

    /// Instantaneous draw of all tracked units in watts.
    ///
    /// # Errors
    ///
    /// Propagates envelope evaluation errors.
    pub fn total_wattage(&self, now: f64) -> Result<f64, SimError> {
        if self.records.is_empty() {
            return Ok(0.0);
        }
        let envelope = &self.appliance.envelope;
        let mut sum = 0.0;
        for record in &self.records {
            sum += envelope::multiplier(envelope, record, now)?;
        }
        Ok(self.appliance.wattage * self.settings_multiplier() * sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appliances::catalog::SettingOption;
    use crate::sim::envelope::EnvelopeParams;

    const EPS: f64 = 1e-9;

    fn heater() -> ApplianceGroup {
        ApplianceGroup::new(Arc::new(ApplianceType::new(
            "Heater",
            100.0,
            3,
            EnvelopeParams::new(1.0, 1.0, 0.5, 1.0),
        )))
    }

    fn washer() -> ApplianceGroup {
        ApplianceGroup::new(Arc::new(
            ApplianceType::new("Washer", 500.0, 1, EnvelopeParams::new(1.0, 1.0, 0.5, 1.0))
                .with_settings(vec![
                    SettingOption::new("p", &[("A", 0.5), ("B", 1.0)]),
                    SettingOption::new("temp", &[("Cold", 0.6), ("Hot", 1.4)]),
                ]),
        ))
    }

    #[test]
    fn increasing_count_adds_active_records() {
        let mut g = heater();
        g.set_count(2, 0.0).expect("in range");
        assert_eq!(g.count(), 2);
        assert_eq!(g.records().len(), 2);
        assert!(g.records().iter().all(|r| r.is_active && r.start_time == 0.0));
    }

    #[test]
    fn decreasing_count_releases_oldest_first() {
        let mut g = heater();
        g.set_count(1, 0.0).expect("in range");
        g.set_count(2, 5.0).expect("in range");
        g.set_count(1, 7.0).expect("in range");
        assert_eq!(g.records()[0], EnvelopeRecord::off(7.0));
        assert_eq!(g.records()[1], EnvelopeRecord::on(5.0));
        assert_eq!(g.active_records(), 1);
    }

    #[test]
    fn count_above_max_is_rejected() {
        let mut g = heater();
        let err = g.set_count(4, 0.0).err();
        assert_eq!(
            err,
            Some(SimError::OutOfRange {
                appliance: "Heater".to_string(),
                requested: 4,
                max: 3,
            })
        );
        assert_eq!(g.count(), 0);
        assert!(g.records().is_empty());
    }

    #[test]
    fn active_records_track_count_across_changes() {
        let mut g = heater();
        for (i, n) in [3, 1, 2, 0, 3, 3, 1].into_iter().enumerate() {
            g.set_count(n, i as f64 * 0.1).expect("in range");
            assert_eq!(g.active_records(), g.count());
        }
    }

    #[test]
    fn records_never_exceed_peak_when_pruned() {
        let mut g = heater();
        g.set_count(3, 0.0).expect("in range");
        g.set_count(0, 1.0).expect("in range");
        g.prune(2.5);
        g.set_count(2, 3.0).expect("in range");
        assert!(g.records().len() <= 3);
        assert_eq!(g.active_records(), 2);
    }

    #[test]
    fn prune_removes_only_finished_releases() {
        let mut g = heater();
        g.set_count(2, 0.0).expect("in range");
        g.set_count(1, 3.0).expect("in range");
        assert_eq!(g.prune(3.5), 0);
        assert_eq!(g.prune(4.5), 1);
        assert_eq!(g.records().len(), 1);
        assert!(g.records()[0].is_active);
    }

    #[test]
    fn wattage_follows_envelope_scenario() {
        let mut g = heater();
        g.set_count(1, 0.0).expect("in range");
        assert!((g.total_wattage(0.5).expect("ok") - 50.0).abs() < EPS);
        assert!((g.total_wattage(1.5).expect("ok") - 75.0).abs() < EPS);
        assert!((g.total_wattage(3.0).expect("ok") - 50.0).abs() < EPS);

        g.set_count(0, 3.0).expect("in range");
        assert!((g.total_wattage(3.5).expect("ok") - 50.0).abs() < EPS);
        assert!(g.total_wattage(4.0).expect("ok").abs() < EPS);
    }

    #[test]
    fn idle_group_draws_nothing() {
        assert_eq!(heater().total_wattage(10.0), Ok(0.0));
    }

    #[test]
    fn settings_default_to_first_value() {
        let g = washer();
        assert_eq!(g.setting("p"), Some("A"));
        assert_eq!(g.setting("temp"), Some("Cold"));
        let pairs: Vec<_> = g.settings().collect();
        assert_eq!(pairs, vec![("p", "A"), ("temp", "Cold")]);
        assert!((g.settings_multiplier() - 0.3).abs() < EPS);
    }

    #[test]
    fn settings_multiplier_uses_selected_factors() {
        let mut g = washer();
        g.set_setting("temp", "Hot").expect("known option");
        assert!((g.settings_multiplier() - 0.7).abs() < EPS);
        g.set_setting("p", "B").expect("known option");
        assert!((g.settings_multiplier() - 1.4).abs() < EPS);
    }

    #[test]
    fn unlisted_value_counts_as_one() {
        let mut g = washer();
        g.set_setting("p", "Turbo").expect("accepted");
        assert_eq!(g.setting("p"), Some("Turbo"));
        assert!((g.settings_multiplier() - 0.6).abs() < EPS);
    }

    #[test]
    fn setting_errors() {
        let mut g = washer();
        assert_eq!(
            g.set_setting("spin", "High"),
            Err(SimError::UnknownOption {
                appliance: "Washer".to_string(),
                option: "spin".to_string(),
            })
        );
        let mut h = heater();
        assert_eq!(
            h.set_setting("p", "A"),
            Err(SimError::NoSettingsSchema("Heater".to_string()))
        );
        assert_eq!(h.settings_multiplier(), 1.0);
    }

    #[test]
    fn wattage_scales_with_settings() {
        let mut g = washer();
        g.set_count(1, 0.0).expect("in range");
        // sustain 0.5 * 500 W * (0.5 * 0.6)
        assert!((g.total_wattage(10.0).expect("ok") - 75.0).abs() < EPS);
    }
}
