//! Appliance definitions and their per-house running state.

/// Static appliance types, settings schemas and the built-in catalog.
pub mod catalog;
pub mod group;

pub use catalog::{ApplianceCatalog, ApplianceType, SettingOption, SettingsSchema};
pub use group::ApplianceGroup;
