use crate::error::ElevatorError;

/// Stable index of an elevator within the fleet, assigned at creation.
pub type ElevatorId = usize;

/// Lifecycle signals a single elevator emits while serving its queue.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatorEvent {
    ArrivedAtFloor(i32),
    DoorsOpened,
    DoorsClosed,
    BecameOccupied,
    BecameUnoccupied,
    MaintenanceDue,
}

/// Everything the dispatcher broadcasts to its subscribers: per-elevator
/// lifecycle signals plus the dispatch decisions themselves.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    Lifecycle { elevator: ElevatorId, event: ElevatorEvent },
    CallAssigned { elevator: ElevatorId, floor: i32 },
    CallQueued { floor: i32 },
    RequestRejected { elevator: ElevatorId, floor: i32, reason: ElevatorError },
    Reinstated { elevator: ElevatorId },
}
