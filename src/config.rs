//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::appliances::{ApplianceCatalog, ApplianceType, catalog::household_appliances};
use crate::error::ConfigError;
use crate::sim::clock::VirtualClock;
use crate::sim::engine::Simulation;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the `default` preset. Load from TOML
/// with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and sizing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Appliance types; the built-in household catalog when empty.
    #[serde(default, rename = "appliance")]
    pub appliances: Vec<ApplianceType>,
}

/// Simulation timing and sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of houses (must be > 0).
    pub houses: usize,
    /// Simulation seconds per real second (must be > 0).
    pub time_scale: f64,
    /// Aggregation cadence in milliseconds (must be > 0).
    pub tick_interval_ms: u64,
    /// Start with the clock paused.
    pub start_paused: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            houses: 9,
            time_scale: 1.0,
            tick_interval_ms: 100,
            start_paused: false,
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl ScenarioConfig {
    /// Nine houses in real time with the household catalog.
    pub fn default_preset() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            appliances: Vec::new(),
        }
    }

    /// Nine houses with one real second worth a simulated minute.
    pub fn accelerated() -> Self {
        Self {
            simulation: SimulationConfig {
                time_scale: 60.0,
                ..SimulationConfig::default()
            },
            appliances: Vec::new(),
        }
    }

    /// A single house in real time.
    pub fn single_house() -> Self {
        Self {
            simulation: SimulationConfig {
                houses: 1,
                ..SimulationConfig::default()
            },
            appliances: Vec::new(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "accelerated", "single_house"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default_preset()),
            "accelerated" => Ok(Self::accelerated()),
            "single_house" => Ok(Self::single_house()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid, contains unknown
    /// fields or an unknown wave kind.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.houses == 0 {
            errors.push(ConfigError::new("simulation.houses", "must be > 0"));
        }
        if !(s.time_scale.is_finite() && s.time_scale > 0.0) {
            errors.push(ConfigError::new(
                "simulation.time_scale",
                format!("must be > 0, got {}", s.time_scale),
            ));
        }
        if s.tick_interval_ms == 0 {
            errors.push(ConfigError::new("simulation.tick_interval_ms", "must be > 0"));
        }

        let mut seen = HashSet::new();
        for (i, appliance) in self.appliances.iter().enumerate() {
            let field = format!("appliance[{i}]");
            if appliance.name.trim().is_empty() {
                errors.push(ConfigError::new(format!("{field}.name"), "must not be empty"));
            } else if !seen.insert(appliance.name.as_str()) {
                errors.push(ConfigError::new(
                    format!("{field}.name"),
                    format!("duplicate appliance \"{}\"", appliance.name),
                ));
            }
            if let Err(e) = appliance.validate() {
                errors.push(ConfigError::new(field, e.to_string()));
            }
        }

        errors
    }

    /// The configured catalog, or the household catalog if none is given.
    pub fn catalog(&self) -> ApplianceCatalog {
        if self.appliances.is_empty() {
            ApplianceCatalog::new_unchecked(household_appliances())
        } else {
            ApplianceCatalog::new_unchecked(self.appliances.clone())
        }
    }

    /// Validates the scenario and builds a simulation on the system clock.
    ///
    /// # Errors
    ///
    /// Returns every validation error found.
    pub fn build(&self) -> Result<Simulation, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        // the clock panics on a bad scale, so it is only created once validated
        Ok(self.assemble(Arc::new(VirtualClock::new(self.simulation.time_scale))))
    }

    /// Like [`build`](Self::build) with a caller-supplied clock.
    ///
    /// The clock's own scale is used; `simulation.time_scale` is only
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns every validation error found.
    pub fn build_with_clock(&self, clock: Arc<VirtualClock>) -> Result<Simulation, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.assemble(clock))
    }

    fn assemble(&self, clock: Arc<VirtualClock>) -> Simulation {
        if self.simulation.start_paused {
            clock.pause();
        }
        Simulation::new(Arc::new(self.catalog()), self.simulation.houses, clock)
    }
}
