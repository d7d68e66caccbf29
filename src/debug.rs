use std::io::{stdout, Stdout, Write};

use crossterm::{cursor, terminal, ExecutableCommand};

use crate::dispatcher::FleetStatus;

/// Renders the fleet as a table, redrawing over the previous frame.
pub struct FleetMonitor {
    stdout: Stdout,
    drawn_lines: u16,
}

impl FleetMonitor {
    pub fn new() -> Self {
        FleetMonitor {
            stdout: stdout(),
            drawn_lines: 0,
        }
    }

    pub fn printstatus(&mut self, status: &FleetStatus) -> crossterm::Result<()> {
        if self.drawn_lines > 0 {
            self.stdout.execute(cursor::MoveUp(self.drawn_lines))?;
            self.stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        }
        let mut lines: u16 = 0;

        writeln!(self.stdout, "+------+-------+-----------+----------+----------+-------+--------------------+")?;
        writeln!(self.stdout, "| {0:<4} | {1:<5} | {2:<9} | {3:<8} | {4:<8} | {5:<5} | {6:<18} |",
            "ID", "FLOOR", "DIRECTION", "STATE", "POOL", "TRIPS", "DESTINATIONS")?;
        writeln!(self.stdout, "+------+-------+-----------+----------+----------+-------+--------------------+")?;
        lines += 3;
        for elevator in &status.elevators {
            writeln!(self.stdout, "| {0:<4} | {1:<5} | {2:<9} | {3:<8} | {4:<8} | {5:<5} | {6:<18} |",
                elevator.id,
                elevator.floor,
                elevator.direction.as_str(),
                elevator.behaviour.as_str(),
                elevator.availability.as_str(),
                elevator.trips,
                format!("{:?}", elevator.destinations))?;
            lines += 1;
        }
        writeln!(self.stdout, "+------+-------+-----------+----------+----------+-------+--------------------+")?;
        writeln!(self.stdout, "| {0:<74} |", format!("BACKLOG {:?}", status.backlog))?;
        writeln!(self.stdout, "+------+-------+-----------+----------+----------+-------+--------------------+")?;
        lines += 3;

        self.drawn_lines = lines;
        Ok(())
    }
}

impl Default for FleetMonitor {
    fn default() -> Self {
        FleetMonitor::new()
    }
}
