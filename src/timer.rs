use std::thread::spawn;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::event::ElevatorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The cab reached the next floor boundary.
    Arrived(i32),
    /// The load/unload interval is over; doors may close.
    DoorsTimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct TimerRequest {
    pub elevator: ElevatorId,
    pub after: Duration,
    pub event: TimerEvent,
}

/// Spawns the timer thread. All door and floor-step deadlines for the whole
/// fleet are multiplexed here so no elevator ever blocks another.
pub fn init() -> (Sender<TimerRequest>, Receiver<(ElevatorId, TimerEvent)>) {
    let (request_tx, request_rx) = unbounded();
    let (expired_tx, expired_rx) = unbounded();
    spawn(move || main(request_rx, expired_tx));
    (request_tx, expired_rx)
}

fn main(request_rx: Receiver<TimerRequest>, expired_tx: Sender<(ElevatorId, TimerEvent)>) {
    let mut pending: Vec<(Instant, ElevatorId, TimerEvent)> = Vec::new();

    loop {
        let next_deadline = pending.iter().map(|&(at, _, _)| at).min();
        let received = match next_deadline {
            Some(at) => request_rx.recv_deadline(at),
            None => request_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(request) => {
                pending.push((Instant::now() + request.after, request.elevator, request.event));
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let mut due: Vec<(Instant, ElevatorId, TimerEvent)> = Vec::new();
                pending.retain(|&entry| {
                    if entry.0 <= now {
                        due.push(entry);
                        false
                    } else {
                        true
                    }
                });
                due.sort_by_key(|&(at, _, _)| at);
                for (_, elevator, event) in due {
                    if expired_tx.send((elevator, event)).is_err() {
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
