use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_SERVICE_FLOOR: i32 = 1;

/// Fleet parameters. Every field has a default so a config file only needs
/// to name the values it wants to override.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct FleetConfig {
    #[serde(default = "default_elevators")]
    pub elevators: usize,
    #[serde(default = "default_floor")]
    pub min_floor: i32,
    #[serde(default = "default_floor")]
    pub max_floor: i32,
    /// How long the doors stay open at a served floor, in seconds.
    #[serde(default = "default_door_open_duration_s")]
    pub door_open_duration_s: f64,
    /// Time to travel past one floor, in seconds.
    #[serde(default = "default_travel_time_s")]
    pub travel_time_s: f64,
    /// Where a retired elevator is sent for servicing. Floor 1 by convention.
    #[serde(default)]
    pub service_floor: Option<i32>,
}

fn default_elevators() -> usize { 1 }
fn default_floor() -> i32 { 1 }
fn default_door_open_duration_s() -> f64 { 3.0 }
fn default_travel_time_s() -> f64 { 0.5 }

impl Default for FleetConfig {
    fn default() -> Self {
        FleetConfig {
            elevators: default_elevators(),
            min_floor: default_floor(),
            max_floor: default_floor(),
            door_open_duration_s: default_door_open_duration_s(),
            travel_time_s: default_travel_time_s(),
            service_floor: None,
        }
    }
}

impl FleetConfig {
    pub fn new(elevators: usize, min_floor: i32, max_floor: i32) -> Self {
        FleetConfig {
            elevators,
            min_floor,
            max_floor,
            ..FleetConfig::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_floor < self.min_floor {
            return Err(ConfigError::InvalidBounds {
                min: self.min_floor,
                max: self.max_floor,
            });
        }
        let service_floor = self.service_floor();
        if service_floor < self.min_floor || service_floor > self.max_floor {
            return Err(ConfigError::ServiceFloorOutOfBounds {
                floor: service_floor,
                min: self.min_floor,
                max: self.max_floor,
            });
        }
        Ok(())
    }

    pub fn service_floor(&self) -> i32 {
        self.service_floor.unwrap_or(DEFAULT_SERVICE_FLOOR)
    }

    pub fn door_open_duration(&self) -> Duration {
        Duration::from_secs_f64(self.door_open_duration_s)
    }

    pub fn travel_time(&self) -> Duration {
        Duration::from_secs_f64(self.travel_time_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: FleetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.elevators, 1);
        assert_eq!(config.min_floor, 1);
        assert_eq!(config.max_floor, 1);
        assert_eq!(config.service_floor(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = FleetConfig::new(1, 5, 2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBounds { min: 5, max: 2 })
        ));
    }

    #[test]
    fn rejects_service_floor_outside_bounds() {
        let mut config = FleetConfig::new(1, 2, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ServiceFloorOutOfBounds { floor: 1, .. })
        ));
        config.service_floor = Some(2);
        assert!(config.validate().is_ok());
    }
}
