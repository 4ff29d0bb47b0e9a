//! A house: one locked appliance group per catalog entry.

use parking_lot::Mutex;
use tracing::warn;

use crate::appliances::{ApplianceCatalog, ApplianceGroup};
use crate::error::SimError;

use super::types::{ApplianceReading, GroupFault, HouseReading};

#[derive(Debug)]
struct Slot {
    name: String,
    group: Mutex<ApplianceGroup>,
}

/// Appliance groups of one house, in catalog order.
///
/// Each group sits behind its own lock, so a count or setting change never
/// interleaves with the prune and wattage read of a tick.
#[derive(Debug)]
pub struct House {
    slots: Vec<Slot>,
}

impl House {
    pub fn new(catalog: &ApplianceCatalog) -> Self {
        Self {
            slots: catalog
                .iter()
                .map(|appliance| Slot {
                    name: appliance.name.clone(),
                    group: Mutex::new(ApplianceGroup::new(appliance.clone())),
                })
                .collect(),
        }
    }

    /// The locked group for `appliance`.
    pub fn group(&self, appliance: &str) -> Result<&Mutex<ApplianceGroup>, SimError> {
        self.slots
            .iter()
            .find(|s| s.name == appliance)
            .map(|s| &s.group)
            .ok_or_else(|| SimError::UnknownAppliance(appliance.to_string()))
    }

    pub fn appliance_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Prunes and samples every group at simulation time `now`.
    ///
    /// A group that fails to evaluate contributes 0 W and is appended to
    /// `faults`; the remaining groups are sampled as usual.
    pub fn sample(&self, house: usize, now: f64, faults: &mut Vec<GroupFault>) -> HouseReading {
        let mut appliances = Vec::with_capacity(self.slots.len());
        let mut total = 0.0;

        for slot in &self.slots {
            let mut group = slot.group.lock();
            group.prune(now);
            let reading = group.total_wattage(now).and_then(|w| {
                if w.is_finite() {
                    Ok(w)
                } else {
                    Err(SimError::InvalidConfiguration(format!(
                        "non-finite draw {w} W from \"{}\"",
                        slot.name
                    )))
                }
            });
            let (watts, faulted) = match reading {
                Ok(w) => (w, false),
                Err(error) => {
                    warn!(house = house + 1, appliance = %slot.name, %error, "group fault");
                    faults.push(GroupFault {
                        house,
                        appliance: slot.name.clone(),
                        error,
                    });
                    (0.0, true)
                }
            };
            total += watts;
            appliances.push(ApplianceReading {
                name: slot.name.clone(),
                count: group.count(),
                watts,
                settings_multiplier: group.settings_multiplier(),
                has_settings: group.appliance().settings.is_some(),
                faulted,
            });
        }

        HouseReading {
            house,
            watts: total,
            appliances,
        }
    }
}
