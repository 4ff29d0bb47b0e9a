//! Static appliance type definitions.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::sim::envelope::{EnvelopeParams, WaveKind};

/// One user-selectable option, e.g. a washing program or a temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingOption {
    /// Option name, e.g. `"program"`.
    pub name: String,
    /// Allowed values in display order; the first one is the default.
    pub values: Vec<String>,
    /// Power multiplier per value. Values without an entry count as 1.0.
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
}

impl SettingOption {
    pub fn new(name: &str, entries: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            values: entries.iter().map(|(v, _)| (*v).to_string()).collect(),
            factors: entries
                .iter()
                .map(|(v, f)| ((*v).to_string(), *f))
                .collect(),
        }
    }

    /// Default selection: the first listed value.
    pub fn default_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Multiplier for `value`, 1.0 if it has no factor.
    pub fn factor(&self, value: &str) -> f64 {
        self.factors.get(value).copied().unwrap_or(1.0)
    }

    pub fn allows(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Ordered set of options an appliance type exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsSchema {
    pub options: Vec<SettingOption>,
}

impl SettingsSchema {
    pub fn new(options: Vec<SettingOption>) -> Self {
        Self { options }
    }

    pub fn option(&self, name: &str) -> Option<&SettingOption> {
        self.options.iter().find(|o| o.name == name)
    }

    fn validate(&self) -> Result<(), SimError> {
        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.name.as_str()) {
                return Err(SimError::InvalidConfiguration(format!(
                    "duplicate option \"{}\"",
                    option.name
                )));
            }
            if option.values.is_empty() {
                return Err(SimError::InvalidConfiguration(format!(
                    "option \"{}\" has no values",
                    option.name
                )));
            }
            if let Some((value, factor)) = option
                .factors
                .iter()
                .find(|(_, f)| !(f.is_finite() && **f > 0.0))
            {
                return Err(SimError::InvalidConfiguration(format!(
                    "factor {factor} for \"{}\" = \"{value}\" must be > 0",
                    option.name
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of one appliance type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceType {
    pub name: String,
    /// Nominal power draw of one unit in watts.
    pub wattage: f64,
    /// Maximum number of concurrently running units per house.
    pub max_count: usize,
    pub envelope: EnvelopeParams,
    #[serde(default)]
    pub settings: Option<SettingsSchema>,
}

impl ApplianceType {
    pub fn new(name: &str, wattage: f64, max_count: usize, envelope: EnvelopeParams) -> Self {
        Self {
            name: name.to_string(),
            wattage,
            max_count,
            envelope,
            settings: None,
        }
    }

    pub fn with_settings(mut self, options: Vec<SettingOption>) -> Self {
        self.settings = Some(SettingsSchema::new(options));
        self
    }

    /// Checks wattage, envelope and settings schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first violation found.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.wattage.is_finite() && self.wattage > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "wattage must be > 0, got {}",
                self.wattage
            )));
        }
        self.envelope.validate()?;
        if let Some(schema) = &self.settings {
            schema.validate()?;
        }
        Ok(())
    }
}

/// Immutable, ordered set of appliance types shared by every house.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceCatalog {
    types: Vec<Arc<ApplianceType>>,
}

impl ApplianceCatalog {
    /// Builds a catalog, rejecting invalid or duplicate entries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the offending appliance.
    pub fn new(types: Vec<ApplianceType>) -> Result<Self, SimError> {
        let mut seen = HashSet::new();
        for t in &types {
            if !seen.insert(t.name.as_str()) {
                return Err(SimError::InvalidConfiguration(format!(
                    "duplicate appliance \"{}\"",
                    t.name
                )));
            }
            t.validate().map_err(|e| match e {
                SimError::InvalidConfiguration(msg) => {
                    SimError::InvalidConfiguration(format!("{}: {msg}", t.name))
                }
                other => other,
            })?;
        }
        Ok(Self::new_unchecked(types))
    }

    /// Builds a catalog without validating it.
    ///
    /// Invalid envelope parameters then surface as per-group faults when
    /// the simulation evaluates them.
    pub fn new_unchecked(types: Vec<ApplianceType>) -> Self {
        Self {
            types: types.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ApplianceType>, SimError> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SimError::UnknownAppliance(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ApplianceType>> {
        self.types.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The built-in household catalog.
    pub fn household() -> Self {
        Self::new_unchecked(household_appliances())
    }
}

impl Default for ApplianceCatalog {
    fn default() -> Self {
        Self::household()
    }
}

/// Reference appliance definitions, in display order.
pub fn household_appliances() -> Vec<ApplianceType> {
    vec![
        ApplianceType::new("LED Lights", 9.0, 20, EnvelopeParams::new(1.0, 1.0, 1.0, 1.0)),
        ApplianceType::new(
            "TV/Entertainment",
            120.0,
            4,
            EnvelopeParams::new(1.0, 1.0, 0.8, 1.5).with_wave(WaveKind::Sine, 0.5, 0.1),
        ),
        ApplianceType::new(
            "Refrigerator",
            150.0,
            2,
            EnvelopeParams::new(1.0, 1.0, 0.3, 2.0).with_wave(WaveKind::Square, 3.0, 0.06),
        ),
        ApplianceType::new(
            "HVAC",
            3500.0,
            1,
            EnvelopeParams::new(3.0, 2.0, 0.8, 0.5).with_wave(WaveKind::Sine, 2.0, 0.07),
        ),
        ApplianceType::new(
            "Washing Machine",
            500.0,
            1,
            EnvelopeParams::new(2.0, 2.0, 0.7, 0.5).with_wave(WaveKind::Sine, 0.5, 0.04),
        )
        .with_settings(vec![
            SettingOption::new(
                "program",
                &[
                    ("Quick Wash", 0.7),
                    ("Normal", 1.0),
                    ("Heavy Duty", 1.3),
                    ("Delicate", 0.8),
                ],
            ),
            SettingOption::new("temperature", &[("Cold", 0.6), ("Warm", 1.0), ("Hot", 1.4)]),
            SettingOption::new("spin_speed", &[("Low", 0.8), ("Medium", 1.0), ("High", 1.2)]),
        ]),
        ApplianceType::new(
            "Dryer",
            3000.0,
            1,
            EnvelopeParams::new(2.0, 1.0, 0.9, 2.0).with_wave(WaveKind::Sine, 2.0, 0.03),
        )
        .with_settings(vec![
            SettingOption::new(
                "program",
                &[
                    ("Quick Dry", 0.8),
                    ("Normal", 1.0),
                    ("Heavy Duty", 1.2),
                    ("Delicate", 0.7),
                ],
            ),
            SettingOption::new("temperature", &[("Low", 0.7), ("Medium", 1.0), ("High", 1.3)]),
            SettingOption::new(
                "time",
                &[("30 min", 1.0), ("60 min", 1.0), ("90 min", 1.0)],
            ),
        ]),
        ApplianceType::new(
            "Dishwasher",
            1800.0,
            1,
            EnvelopeParams::new(3.0, 1.5, 0.6, 2.0).with_wave(WaveKind::Sine, 1.0, 0.05),
        )
        .with_settings(vec![
            SettingOption::new(
                "program",
                &[
                    ("Quick", 0.8),
                    ("Eco", 0.6),
                    ("Normal", 1.0),
                    ("Intensive", 1.4),
                ],
            ),
            SettingOption::new("temperature", &[("Low", 0.7), ("Medium", 1.0), ("High", 1.3)]),
            SettingOption::new("dry", &[("No Heat", 0.7), ("Heat Dry", 1.2)]),
        ]),
        ApplianceType::new(
            "Water Heater",
            4500.0,
            1,
            EnvelopeParams::new(1.0, 0.5, 0.9, 1.0).with_wave(WaveKind::Square, 5.0, 0.1),
        ),
        ApplianceType::new("Microwave", 1100.0, 1, EnvelopeParams::new(0.5, 0.2, 1.0, 0.5)),
    ]
}
