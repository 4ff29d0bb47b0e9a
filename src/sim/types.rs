//! Readings produced by one aggregation tick.

use std::fmt;

use serde::Serialize;

use crate::error::SimError;

/// Draw of one appliance group at the time of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplianceReading {
    pub name: String,
    /// Units switched on.
    pub count: usize,
    /// Instantaneous draw in watts; 0 if the group faulted.
    pub watts: f64,
    /// Power factor from the selected settings (1.0 without settings).
    pub settings_multiplier: f64,
    /// Whether the appliance type exposes settings at all.
    pub has_settings: bool,
    pub faulted: bool,
}

/// Draw of one house at the time of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseReading {
    /// Zero-based house index.
    pub house: usize,
    pub watts: f64,
    pub appliances: Vec<ApplianceReading>,
}

impl HouseReading {
    pub fn appliance(&self, name: &str) -> Option<&ApplianceReading> {
        self.appliances.iter().find(|a| a.name == name)
    }
}

/// A group whose wattage could not be computed during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFault {
    pub house: usize,
    pub appliance: String,
    pub error: SimError,
}

impl fmt::Display for GroupFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "house {} / {}: {}",
            self.house + 1,
            self.appliance,
            self.error
        )
    }
}

/// System-wide readings, all taken at the same simulation instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Elapsed simulation seconds the readings were taken at.
    pub sim_secs: f64,
    /// Simulation time of day, `HH:MM:SS`.
    pub time_of_day: String,
    pub paused: bool,
    pub houses: Vec<HouseReading>,
    /// System total in watts.
    pub watts: f64,
    pub faults: Vec<GroupFault>,
}

impl Snapshot {
    /// A snapshot with every house idle, used before the first tick.
    pub fn idle(houses: usize) -> Self {
        Self {
            sim_secs: 0.0,
            time_of_day: String::new(),
            paused: false,
            houses: (0..houses)
                .map(|house| HouseReading {
                    house,
                    watts: 0.0,
                    appliances: Vec::new(),
                })
                .collect(),
            watts: 0.0,
            faults: Vec::new(),
        }
    }

    /// System total in kilowatts.
    pub fn total_kw(&self) -> f64 {
        self.watts / 1000.0
    }

    pub fn house(&self, house: usize) -> Option<&HouseReading> {
        self.houses.get(house)
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }
}

impl fmt::Display for Snapshot {
    /// Renders the readings the way the house dashboards label them:
    /// whole watts per appliance and house, kilowatts for the system.
    /// Idle appliances are omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paused = if self.paused { " (paused)" } else { "" };
        writeln!(f, "Simulation Time: {}{paused}", self.time_of_day)?;
        for house in &self.houses {
            writeln!(
                f,
                "House {}  Total Load: {} Watts",
                house.house + 1,
                house.watts as i64
            )?;
            for a in house.appliances.iter().filter(|a| a.count > 0 || a.watts > 0.0) {
                write!(f, "  {:<18} x{:<2} {:>6} Watts", a.name, a.count, a.watts as i64)?;
                if a.has_settings {
                    write!(f, "  Current Power Factor: {:.2}x", a.settings_multiplier)?;
                }
                if a.faulted {
                    write!(f, "  FAULT")?;
                }
                writeln!(f)?;
            }
        }
        for fault in &self.faults {
            writeln!(f, "fault: {fault}")?;
        }
        write!(f, "Total Power: {:.2} kW", self.total_kw())
    }
}
