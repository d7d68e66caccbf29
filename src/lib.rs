//! A bank of elevators behind a dispatcher that assigns floor calls by a
//! deterministic priority policy: on-floor elevator first, then an elevator
//! already passing the floor, then the nearest idle one, and otherwise a
//! FIFO backlog drained as elevators free up.

pub mod config;
pub mod debug;
pub mod dispatcher;
pub mod elevator;
pub mod error;
pub mod event;
pub mod timer;

pub use config::FleetConfig;
pub use dispatcher::{Availability, Dispatcher, ElevatorStatus, FleetStatus};
pub use elevator::{Behaviour, Direction, Elevator, TRIPS_TILL_MAINTENANCE};
pub use error::{ConfigError, ElevatorError, FleetError};
pub use event::{ElevatorEvent, ElevatorId, FleetEvent};
