use crate::error::ElevatorError;
use crate::event::{ElevatorEvent, ElevatorId};

/// Completed travel commands before an elevator is pulled for maintenance.
pub const TRIPS_TILL_MAINTENANCE: u32 = 100;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    fn towards(from: i32, to: i32) -> Self {
        if to < from {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// Motion phase of the cab.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Behaviour {
    Idle,
    Moving,
    DoorOpen,
}

impl Behaviour {
    pub fn as_str(self) -> &'static str {
        match self {
            Behaviour::Idle => "idle",
            Behaviour::Moving => "moving",
            Behaviour::DoorOpen => "doorOpen",
        }
    }
}

/// What the cab does at a floor boundary it just reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The floor was a pending destination; doors are open, start the
    /// load/unload interval.
    OpenDoors,
    /// Passing through; keep stepping toward this next boundary.
    Continue(i32),
    /// Nothing pending; the cab holds position.
    Stopped,
}

/// State machine for one cab. Owns no channels; the dispatcher drives it and
/// forwards the events it returns.
#[derive(Debug, Clone)]
pub struct Elevator {
    id: ElevatorId,
    min_floor: i32,
    max_floor: i32,
    current_floor: i32,
    direction: Direction,
    destinations: Vec<i32>,
    behaviour: Behaviour,
    occupied: bool,
    needs_maintenance: bool,
    trips: u32,
}

impl Elevator {
    pub fn new(id: ElevatorId, min_floor: i32, max_floor: i32) -> Self {
        Elevator {
            id,
            min_floor,
            max_floor,
            current_floor: min_floor,
            direction: Direction::Up,
            destinations: Vec::new(),
            behaviour: Behaviour::Idle,
            occupied: false,
            needs_maintenance: false,
            trips: 0,
        }
    }

    pub fn id(&self) -> ElevatorId {
        self.id
    }

    pub fn min_floor(&self) -> i32 {
        self.min_floor
    }

    pub fn max_floor(&self) -> i32 {
        self.max_floor
    }

    pub fn current_floor(&self) -> i32 {
        self.current_floor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn destinations(&self) -> &[i32] {
        &self.destinations
    }

    pub fn behaviour(&self) -> Behaviour {
        self.behaviour
    }

    pub fn occupied(&self) -> bool {
        self.occupied
    }

    pub fn needs_maintenance(&self) -> bool {
        self.needs_maintenance
    }

    pub fn trips(&self) -> u32 {
        self.trips
    }

    /// A cab counts as moving while it still has floors to serve, even
    /// during a door cycle partway along the route.
    pub fn moving(&self) -> bool {
        !self.destinations.is_empty()
    }

    /// Requests a visit to `floor`. Counts a trip on acceptance, which may
    /// push the cab over the maintenance threshold.
    pub fn travel_to(&mut self, floor: i32) -> Result<Vec<ElevatorEvent>, ElevatorError> {
        self.add_destination(floor)?;
        Ok(self.add_trip())
    }

    /// A request made from inside the cab. Same semantics as `travel_to`,
    /// but the cab becomes occupied.
    pub fn cab_request(&mut self, floor: i32) -> Result<Vec<ElevatorEvent>, ElevatorError> {
        let mut events = self.travel_to(floor)?;
        if !self.occupied {
            self.occupied = true;
            events.push(ElevatorEvent::BecameOccupied);
        }
        Ok(events)
    }

    fn add_destination(&mut self, floor: i32) -> Result<(), ElevatorError> {
        if floor == self.current_floor {
            return Err(ElevatorError::AlreadyAtDestination(floor));
        }
        if floor < self.min_floor || floor > self.max_floor {
            return Err(ElevatorError::FloorOutOfBounds {
                floor,
                min: self.min_floor,
                max: self.max_floor,
            });
        }
        if self.needs_maintenance {
            return Err(ElevatorError::MaintenanceRequired);
        }
        self.push_destination(floor);
        Ok(())
    }

    fn push_destination(&mut self, floor: i32) {
        let was_pending = !self.destinations.is_empty();
        if !self.destinations.contains(&floor) {
            self.destinations.push(floor);
        }
        // Direction is only re-evaluated when no travel was pending;
        // otherwise the sorted consumption order must not be disturbed.
        if !was_pending {
            self.direction = Direction::towards(self.current_floor, floor);
        }
        self.sort_destinations();
    }

    fn sort_destinations(&mut self) {
        match self.direction {
            Direction::Up => self.destinations.sort_unstable(),
            Direction::Down => self.destinations.sort_unstable_by(|a, b| b.cmp(a)),
        }
    }

    fn add_trip(&mut self) -> Vec<ElevatorEvent> {
        self.trips += 1;
        if self.trips >= TRIPS_TILL_MAINTENANCE && !self.needs_maintenance {
            self.needs_maintenance = true;
            return vec![ElevatorEvent::MaintenanceDue];
        }
        Vec::new()
    }

    /// Idle-to-moving edge. Returns the first floor boundary to step to, or
    /// `None` when the cab is already underway or has nowhere to go.
    pub fn begin_motion(&mut self) -> Option<i32> {
        if self.behaviour != Behaviour::Idle || self.destinations.is_empty() {
            return None;
        }
        self.behaviour = Behaviour::Moving;
        self.next_step()
    }

    fn next_step(&self) -> Option<i32> {
        let head = *self.destinations.first()?;
        Some(if head < self.current_floor {
            self.current_floor - 1
        } else {
            self.current_floor + 1
        })
    }

    /// The cab reached a floor boundary.
    pub fn record_arrival(&mut self, floor: i32) -> (Vec<ElevatorEvent>, Arrival) {
        self.current_floor = floor;
        let mut events = vec![ElevatorEvent::ArrivedAtFloor(floor)];
        if let Some(position) = self.destinations.iter().position(|&f| f == floor) {
            self.destinations.remove(position);
            self.behaviour = Behaviour::DoorOpen;
            events.push(ElevatorEvent::DoorsOpened);
            return (events, Arrival::OpenDoors);
        }
        match self.next_step() {
            Some(next) => (events, Arrival::Continue(next)),
            None => {
                self.behaviour = Behaviour::Idle;
                (events, Arrival::Stopped)
            }
        }
    }

    /// The load/unload interval expired. Returns the next floor boundary to
    /// step to when travel remains pending.
    pub fn complete_door_cycle(&mut self) -> (Vec<ElevatorEvent>, Option<i32>) {
        let mut events = vec![ElevatorEvent::DoorsClosed];
        if self.destinations.is_empty() {
            self.behaviour = Behaviour::Idle;
            self.occupied = false;
            events.push(ElevatorEvent::BecameUnoccupied);
            return (events, None);
        }
        self.behaviour = Behaviour::Moving;
        (events, self.next_step())
    }

    /// Serves a call at the cab's current floor without travelling. No-op
    /// when the doors are already open.
    pub fn open_doors(&mut self) -> Vec<ElevatorEvent> {
        if self.behaviour == Behaviour::DoorOpen {
            return Vec::new();
        }
        self.behaviour = Behaviour::DoorOpen;
        vec![ElevatorEvent::DoorsOpened]
    }

    /// The one trip a retired cab still makes, to the service floor. Skips
    /// the maintenance gate and does not count toward the trip total.
    pub fn enqueue_service_trip(&mut self, floor: i32) {
        if floor == self.current_floor || floor < self.min_floor || floor > self.max_floor {
            return;
        }
        self.push_destination(floor);
    }

    /// Maintenance-complete hook. Never invoked automatically; retirement is
    /// permanent unless the embedding caller asks otherwise.
    pub fn reinstate(&mut self) {
        self.needs_maintenance = false;
        self.trips = 0;
    }
}
