use thiserror::Error;

/// Soft rejections reported by a single elevator. The elevator's state is
/// unchanged whenever one of these is returned.
#[derive(Error, serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorError {
    #[error("already at floor {0}")]
    AlreadyAtDestination(i32),
    #[error("floor {floor} is outside [{min}, {max}]")]
    FloorOutOfBounds { floor: i32, min: i32, max: i32 },
    #[error("elevator is due for maintenance")]
    MaintenanceRequired,
}

/// Failures reported synchronously at the dispatcher call boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    #[error("no elevator with id {0}")]
    UnknownElevator(usize),
    #[error("dispatcher is no longer running")]
    Disconnected,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max floor {max} is below min floor {min}")]
    InvalidBounds { min: i32, max: i32 },
    #[error("service floor {floor} is outside [{min}, {max}]")]
    ServiceFloorOutOfBounds { floor: i32, min: i32, max: i32 },
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Json(#[from] serde_json::Error),
}
