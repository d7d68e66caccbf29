use std::collections::VecDeque;
use std::thread::spawn;
use std::time::Duration;

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::config::FleetConfig;
use crate::elevator::{Arrival, Behaviour, Direction, Elevator};
use crate::error::{ConfigError, FleetError};
use crate::event::{ElevatorEvent, ElevatorId, FleetEvent};
use crate::timer::{self, TimerEvent, TimerRequest};

/// Where a fleet member sits in the assignment pools. Derived from the
/// elevator's own flags, so pool membership can never fall out of sync.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Idle,
    Busy,
    Retired,
}

impl Availability {
    fn of(elevator: &Elevator) -> Self {
        if elevator.needs_maintenance() {
            Availability::Retired
        } else if elevator.occupied() {
            Availability::Busy
        } else {
            Availability::Idle
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Idle => "idle",
            Availability::Busy => "busy",
            Availability::Retired => "retired",
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ElevatorStatus {
    pub id: ElevatorId,
    pub floor: i32,
    pub direction: Direction,
    pub behaviour: Behaviour,
    pub destinations: Vec<i32>,
    pub occupied: bool,
    pub trips: u32,
    pub availability: Availability,
}

impl ElevatorStatus {
    fn of(elevator: &Elevator) -> Self {
        ElevatorStatus {
            id: elevator.id(),
            floor: elevator.current_floor(),
            direction: elevator.direction(),
            behaviour: elevator.behaviour(),
            destinations: elevator.destinations().to_vec(),
            occupied: elevator.occupied(),
            trips: elevator.trips(),
            availability: Availability::of(elevator),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct FleetStatus {
    pub elevators: Vec<ElevatorStatus>,
    pub backlog: Vec<i32>,
}

enum Command {
    RequestFloor(i32),
    CabRequest { elevator: ElevatorId, floor: i32 },
    Reinstate(ElevatorId),
    Report(Sender<FleetStatus>),
}

/// Fleet state and assignment policy. Synchronous; only the run loop thread
/// touches it, which serializes every mutation.
struct Fleet {
    elevators: Vec<Elevator>,
    backlog: VecDeque<i32>,
    // True while a cab halted mid-travel has a stale step on the timer.
    halted_steps: Vec<bool>,
    door_open_duration: Duration,
    travel_time: Duration,
    service_floor: i32,
    timer_tx: Sender<TimerRequest>,
    event_tx: Sender<FleetEvent>,
}

impl Fleet {
    fn new(config: &FleetConfig, timer_tx: Sender<TimerRequest>, event_tx: Sender<FleetEvent>) -> Self {
        let elevators = (0..config.elevators)
            .map(|id| Elevator::new(id, config.min_floor, config.max_floor))
            .collect();
        Fleet {
            elevators,
            backlog: VecDeque::new(),
            halted_steps: vec![false; config.elevators],
            door_open_duration: config.door_open_duration(),
            travel_time: config.travel_time(),
            service_floor: config.service_floor(),
            timer_tx,
            event_tx,
        }
    }

    /// The call-button policy: on-floor elevator, then en-route elevator,
    /// then nearest idle elevator, then the backlog. Strict priority order,
    /// first match wins within each rule.
    fn request_floor(&mut self, floor: i32) {
        if let Some(id) = self.elevators.iter().position(|e| {
            !e.needs_maintenance() && e.current_floor() == floor
        }) {
            debug!(elevator = id, floor, "serving call at current floor");
            self.publish(FleetEvent::CallAssigned { elevator: id, floor });
            // A moving cab halts in place; the step already on the timer is
            // stale and gets dropped when it fires. Travel resumes from the
            // door-close transition.
            if self.elevators[id].behaviour() == Behaviour::Moving {
                self.halted_steps[id] = true;
            }
            let events = self.elevators[id].open_doors();
            if !events.is_empty() {
                self.start_door_timer(id);
            }
            self.publish_lifecycle(id, events);
            return;
        }

        if let Some(id) = self.elevators.iter().position(|e| will_pass(e, floor)) {
            debug!(elevator = id, floor, "assigning to elevator passing by");
            self.assign(id, floor);
            return;
        }

        let mut nearest: Option<(ElevatorId, i32)> = None;
        for (id, elevator) in self.elevators.iter().enumerate() {
            if Availability::of(elevator) != Availability::Idle {
                continue;
            }
            let distance = (elevator.current_floor() - floor).abs();
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((id, distance));
            }
        }
        if let Some((id, _)) = nearest {
            debug!(elevator = id, floor, "assigning to nearest idle elevator");
            self.assign(id, floor);
            return;
        }

        if !self.backlog.contains(&floor) {
            debug!(floor, "no elevator assignable, queueing call");
            self.backlog.push_back(floor);
            self.publish(FleetEvent::CallQueued { floor });
        }
    }

    fn cab_request(&mut self, id: ElevatorId, floor: i32) {
        match self.elevators[id].cab_request(floor) {
            Ok(events) => {
                self.start_motion(id);
                self.publish_lifecycle(id, events);
            }
            Err(reason) => {
                debug!(elevator = id, floor, %reason, "cab request rejected");
                self.publish(FleetEvent::RequestRejected { elevator: id, floor, reason });
            }
        }
    }

    fn assign(&mut self, id: ElevatorId, floor: i32) {
        match self.elevators[id].travel_to(floor) {
            Ok(events) => {
                self.publish(FleetEvent::CallAssigned { elevator: id, floor });
                self.start_motion(id);
                self.publish_lifecycle(id, events);
            }
            Err(reason) => {
                debug!(elevator = id, floor, %reason, "call rejected, dropping request");
                self.publish(FleetEvent::RequestRejected { elevator: id, floor, reason });
            }
        }
    }

    fn handle_timer(&mut self, id: ElevatorId, event: TimerEvent) {
        match event {
            TimerEvent::Arrived(floor) => {
                if self.halted_steps[id] {
                    self.halted_steps[id] = false;
                    return;
                }
                let (events, arrival) = self.elevators[id].record_arrival(floor);
                match arrival {
                    Arrival::OpenDoors => self.start_door_timer(id),
                    Arrival::Continue(next) => self.schedule_step(id, next),
                    Arrival::Stopped => {}
                }
                self.publish_lifecycle(id, events);
            }
            TimerEvent::DoorsTimedOut => {
                let (events, next) = self.elevators[id].complete_door_cycle();
                if let Some(next) = next {
                    self.schedule_step(id, next);
                }
                self.publish_lifecycle(id, events);
            }
        }
    }

    /// Publishes lifecycle events and runs the fleet bookkeeping they
    /// trigger: retirement on `MaintenanceDue`, backlog draining when an
    /// elevator frees up.
    fn publish_lifecycle(&mut self, id: ElevatorId, events: Vec<ElevatorEvent>) {
        for event in events {
            self.publish(FleetEvent::Lifecycle { elevator: id, event });
            match event {
                ElevatorEvent::MaintenanceDue => {
                    // The final service trip waits until the in-flight queue
                    // is served; it is dispatched on BecameUnoccupied below.
                    info!(
                        elevator = id,
                        trips = self.elevators[id].trips(),
                        "elevator retired for maintenance"
                    );
                }
                ElevatorEvent::BecameUnoccupied => {
                    if self.elevators[id].needs_maintenance() {
                        self.send_for_service(id);
                    } else {
                        self.drain_backlog(id);
                    }
                }
                _ => {}
            }
        }
    }

    fn send_for_service(&mut self, id: ElevatorId) {
        debug!(elevator = id, floor = self.service_floor, "sending retired elevator for service");
        self.elevators[id].enqueue_service_trip(self.service_floor);
        self.start_motion(id);
    }

    /// One backlog entry per elevator that frees up, oldest first. The entry
    /// is consumed even if the elevator then rejects it.
    fn drain_backlog(&mut self, id: ElevatorId) {
        if self.elevators[id].needs_maintenance() {
            return;
        }
        if let Some(floor) = self.backlog.pop_front() {
            debug!(elevator = id, floor, "draining queued call");
            self.assign(id, floor);
        }
    }

    fn reinstate(&mut self, id: ElevatorId) {
        if !self.elevators[id].needs_maintenance() {
            return;
        }
        self.elevators[id].reinstate();
        info!(elevator = id, "elevator reinstated after servicing");
        self.publish(FleetEvent::Reinstated { elevator: id });
        self.drain_backlog(id);
    }

    fn start_motion(&mut self, id: ElevatorId) {
        if let Some(next) = self.elevators[id].begin_motion() {
            self.schedule_step(id, next);
        }
    }

    fn schedule_step(&self, id: ElevatorId, floor: i32) {
        let _ = self.timer_tx.send(TimerRequest {
            elevator: id,
            after: self.travel_time,
            event: TimerEvent::Arrived(floor),
        });
    }

    fn start_door_timer(&self, id: ElevatorId) {
        let _ = self.timer_tx.send(TimerRequest {
            elevator: id,
            after: self.door_open_duration,
            event: TimerEvent::DoorsTimedOut,
        });
    }

    fn publish(&self, event: FleetEvent) {
        let _ = self.event_tx.send(event);
    }

    fn status(&self) -> FleetStatus {
        FleetStatus {
            elevators: self.elevators.iter().map(ElevatorStatus::of).collect(),
            backlog: self.backlog.iter().copied().collect(),
        }
    }
}

/// Moving elevators pass a floor when it lies between their position and the
/// far end of their destination queue, in their direction of travel.
fn will_pass(elevator: &Elevator, floor: i32) -> bool {
    if elevator.needs_maintenance() || !elevator.moving() {
        return false;
    }
    let current = elevator.current_floor();
    match elevator.direction() {
        Direction::Up => {
            let top = elevator.destinations().iter().copied().max().unwrap_or(current);
            current <= floor && floor <= top
        }
        Direction::Down => {
            let bottom = elevator.destinations().iter().copied().min().unwrap_or(current);
            bottom <= floor && floor <= current
        }
    }
}

/// Handle to a running fleet. Cheap to pass around; dropping the last handle
/// shuts the run loop and timer thread down.
pub struct Dispatcher {
    command_tx: Sender<Command>,
    event_rx: Receiver<FleetEvent>,
    elevator_count: usize,
}

impl Dispatcher {
    /// Builds the fleet and spawns the run loop and timer threads.
    pub fn create(config: FleetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (timer_tx, timer_rx) = timer::init();
        let elevator_count = config.elevators;
        let fleet = Fleet::new(&config, timer_tx, event_tx);
        spawn(move || run(fleet, command_rx, timer_rx));
        Ok(Dispatcher {
            command_tx,
            event_rx,
            elevator_count,
        })
    }

    /// A call button was pressed on `floor`.
    pub fn request_floor(&self, floor: i32) -> Result<(), FleetError> {
        self.send(Command::RequestFloor(floor))
    }

    /// A cab button was pressed inside the given elevator.
    pub fn cab_request(&self, elevator: ElevatorId, floor: i32) -> Result<(), FleetError> {
        self.check_id(elevator)?;
        self.send(Command::CabRequest { elevator, floor })
    }

    /// Returns a serviced elevator to the fleet. Never happens on its own.
    pub fn reinstate(&self, elevator: ElevatorId) -> Result<(), FleetError> {
        self.check_id(elevator)?;
        self.send(Command::Reinstate(elevator))
    }

    /// Snapshot of the whole fleet, taken on the run loop thread.
    pub fn status(&self) -> Result<FleetStatus, FleetError> {
        let (reply_tx, reply_rx) = unbounded();
        self.send(Command::Report(reply_tx))?;
        reply_rx.recv().map_err(|_| FleetError::Disconnected)
    }

    /// Subscription to every fleet event, in emission order.
    pub fn events(&self) -> Receiver<FleetEvent> {
        self.event_rx.clone()
    }

    pub fn elevator_count(&self) -> usize {
        self.elevator_count
    }

    fn check_id(&self, elevator: ElevatorId) -> Result<(), FleetError> {
        if elevator >= self.elevator_count {
            return Err(FleetError::UnknownElevator(elevator));
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), FleetError> {
        self.command_tx.send(command).map_err(|_| FleetError::Disconnected)
    }
}

fn run(mut fleet: Fleet, command_rx: Receiver<Command>, timer_rx: Receiver<(ElevatorId, TimerEvent)>) {
    loop {
        select! {
            recv(command_rx) -> msg => match msg {
                Ok(Command::RequestFloor(floor)) => fleet.request_floor(floor),
                Ok(Command::CabRequest { elevator, floor }) => fleet.cab_request(elevator, floor),
                Ok(Command::Reinstate(elevator)) => fleet.reinstate(elevator),
                Ok(Command::Report(reply_tx)) => { let _ = reply_tx.send(fleet.status()); },
                Err(_) => break,
            },
            recv(timer_rx) -> msg => match msg {
                Ok((elevator, event)) => fleet.handle_timer(elevator, event),
                Err(_) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevator::TRIPS_TILL_MAINTENANCE;
    use crate::error::ElevatorError;

    fn fleet(elevators: usize, min: i32, max: i32) -> (Fleet, Receiver<TimerRequest>, Receiver<FleetEvent>) {
        let (timer_tx, timer_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let config = FleetConfig::new(elevators, min, max);
        (Fleet::new(&config, timer_tx, event_tx), timer_rx, event_rx)
    }

    /// Replays pending timer requests into the fleet until every cab has
    /// settled, standing in for the timer thread.
    fn run_until_settled(fleet: &mut Fleet, timer_rx: &Receiver<TimerRequest>) {
        while let Ok(request) = timer_rx.try_recv() {
            fleet.handle_timer(request.elevator, request.event);
        }
    }

    fn drain(event_rx: &Receiver<FleetEvent>) {
        while event_rx.try_recv().is_ok() {}
    }

    fn assignments(event_rx: &Receiver<FleetEvent>) -> Vec<(ElevatorId, i32)> {
        event_rx
            .try_iter()
            .filter_map(|event| match event {
                FleetEvent::CallAssigned { elevator, floor } => Some((elevator, floor)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn on_floor_elevator_beats_en_route() {
        let (mut fleet, timer_rx, event_rx) = fleet(2, 1, 10);
        // Park elevator 0 at floor 5.
        fleet.request_floor(5);
        run_until_settled(&mut fleet, &timer_rx);
        // Elevator 1 is moving up through 5 toward 8.
        fleet.cab_request(1, 8);
        drain(&event_rx);

        fleet.request_floor(5);
        assert_eq!(assignments(&event_rx), vec![(0, 5)]);
    }

    #[test]
    fn call_at_a_moving_cabs_floor_halts_it_for_a_door_cycle() {
        let (mut fleet, timer_rx, event_rx) = fleet(1, 1, 10);
        // The cab sets off from 1 toward 5; a call lands at 1 while it is
        // still in flight.
        fleet.cab_request(0, 5);
        drain(&event_rx);

        fleet.request_floor(1);
        let events: Vec<FleetEvent> = event_rx.try_iter().collect();
        assert!(events.contains(&FleetEvent::CallAssigned { elevator: 0, floor: 1 }));
        assert!(events.contains(&FleetEvent::Lifecycle {
            elevator: 0,
            event: ElevatorEvent::DoorsOpened,
        }));
        assert!(!events.iter().any(|e| matches!(e, FleetEvent::RequestRejected { .. })));
        assert_eq!(fleet.elevators[0].behaviour(), Behaviour::DoorOpen);

        // The stale step is dropped and travel resumes after the doors close.
        run_until_settled(&mut fleet, &timer_rx);
        assert_eq!(fleet.elevators[0].current_floor(), 5);
        assert!(fleet.elevators[0].destinations().is_empty());
        assert!(fleet.backlog.is_empty());
    }

    #[test]
    fn en_route_elevator_beats_nearest_idle() {
        let (mut fleet, _timer_rx, event_rx) = fleet(2, 1, 10);
        // Elevator 1 is moving up toward 8; elevator 0 sits idle at 1.
        fleet.cab_request(1, 8);
        drain(&event_rx);

        fleet.request_floor(5);
        assert_eq!(assignments(&event_rx), vec![(1, 5)]);
    }

    #[test]
    fn en_route_elevator_takes_a_call_on_its_way_down() {
        let (mut fleet, timer_rx, event_rx) = fleet(2, 1, 10);
        // Park elevator 1 at the top, then send it down toward 2.
        fleet.cab_request(1, 9);
        run_until_settled(&mut fleet, &timer_rx);
        fleet.cab_request(1, 2);
        drain(&event_rx);

        // Elevator 0 idles closer at 1, but elevator 1 passes 5 going down.
        fleet.request_floor(5);
        assert_eq!(assignments(&event_rx), vec![(1, 5)]);

        // Down stops are served in descending order.
        run_until_settled(&mut fleet, &timer_rx);
        assert_eq!(fleet.elevators[1].current_floor(), 2);
        assert!(fleet.elevators[1].destinations().is_empty());
    }

    #[test]
    fn nearest_idle_elevator_wins_with_first_found_tie_break() {
        let (mut fleet, timer_rx, event_rx) = fleet(2, 1, 10);
        // Park elevator 0 at 3 and elevator 1 at 7.
        fleet.request_floor(3);
        run_until_settled(&mut fleet, &timer_rx);
        fleet.cab_request(1, 7);
        run_until_settled(&mut fleet, &timer_rx);
        drain(&event_rx);

        // Both are two floors away; the first one scanned takes the call.
        fleet.request_floor(5);
        assert_eq!(assignments(&event_rx), vec![(0, 5)]);
    }

    #[test]
    fn out_of_bounds_call_is_dropped_not_queued() {
        let (mut fleet, _timer_rx, event_rx) = fleet(1, 1, 10);
        fleet.request_floor(99);
        let events: Vec<FleetEvent> = event_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![FleetEvent::RequestRejected {
                elevator: 0,
                floor: 99,
                reason: ElevatorError::FloorOutOfBounds { floor: 99, min: 1, max: 10 },
            }]
        );
        assert!(fleet.backlog.is_empty());
    }

    #[test]
    fn backlog_is_fifo_with_no_duplicates() {
        let (mut fleet, timer_rx, event_rx) = fleet(1, 1, 10);
        // Occupy the only elevator with a short cab trip.
        fleet.cab_request(0, 2);
        drain(&event_rx);

        // Neither call is en route (the cab tops out at 2), and no idle
        // elevator exists, so both must queue in arrival order.
        fleet.request_floor(9);
        fleet.request_floor(6);
        fleet.request_floor(9);
        assert_eq!(fleet.backlog, VecDeque::from([9, 6]));

        run_until_settled(&mut fleet, &timer_rx);
        assert_eq!(assignments(&event_rx), vec![(0, 9), (0, 6)]);
        assert!(fleet.backlog.is_empty());
        assert_eq!(fleet.elevators[0].current_floor(), 6);
    }

    #[test]
    fn retired_elevator_leaves_the_assignable_pools() {
        let (mut fleet, timer_rx, event_rx) = fleet(1, 1, 10);
        for _ in 0..TRIPS_TILL_MAINTENANCE {
            fleet.cab_request(0, 2);
        }
        assert_eq!(Availability::of(&fleet.elevators[0]), Availability::Retired);
        drain(&event_rx);

        // The only elevator is retired, so the call must queue.
        fleet.request_floor(9);
        assert_eq!(fleet.backlog, VecDeque::from([9]));

        // Serving its remaining queue must not drain the backlog either.
        run_until_settled(&mut fleet, &timer_rx);
        assert_eq!(fleet.backlog, VecDeque::from([9]));
        assert_eq!(Availability::of(&fleet.elevators[0]), Availability::Retired);
    }

    #[test]
    fn retired_elevator_still_makes_its_service_trip() {
        let (mut fleet, timer_rx, _event_rx) = fleet(1, 1, 10);
        for _ in 0..TRIPS_TILL_MAINTENANCE {
            fleet.cab_request(0, 5);
        }
        run_until_settled(&mut fleet, &timer_rx);
        // Destination 5 was served first, then the service trip to floor 1.
        assert_eq!(fleet.elevators[0].current_floor(), 1);
        assert!(fleet.elevators[0].destinations().is_empty());
    }

    #[test]
    fn reinstated_elevator_rejoins_and_drains_the_backlog() {
        let (mut fleet, timer_rx, event_rx) = fleet(1, 1, 10);
        for _ in 0..TRIPS_TILL_MAINTENANCE {
            fleet.cab_request(0, 5);
        }
        run_until_settled(&mut fleet, &timer_rx);
        fleet.request_floor(9);
        drain(&event_rx);

        fleet.reinstate(0);
        let events: Vec<FleetEvent> = event_rx.try_iter().collect();
        assert_eq!(events[0], FleetEvent::Reinstated { elevator: 0 });
        assert!(events.contains(&FleetEvent::CallAssigned { elevator: 0, floor: 9 }));
        assert_eq!(Availability::of(&fleet.elevators[0]), Availability::Idle);
    }

    #[test]
    fn occupied_elevator_is_busy_until_unoccupied() {
        let (mut fleet, timer_rx, _event_rx) = fleet(1, 1, 10);
        fleet.cab_request(0, 4);
        assert_eq!(Availability::of(&fleet.elevators[0]), Availability::Busy);
        run_until_settled(&mut fleet, &timer_rx);
        assert_eq!(Availability::of(&fleet.elevators[0]), Availability::Idle);
    }
}
