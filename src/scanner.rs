/*
 * This file is part of Wiremap.
 *
 * Copyright (C) 2025 Wiremap contributors
 *
 * Wiremap is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wiremap is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wiremap. If not, see <https://www.gnu.org/licenses/>.
 */

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::expander::{ExpanderState, Mcp23017};
use crate::i2c::{Bus, BusError};
use crate::reset::{ResetController, ResetError};

/// Lines per unit; the harness shape is fixed at two 16-line groups.
pub const LINES_PER_UNIT: usize = 16;

/// Wait between reconfiguring the expanders and reading back, so line
/// capacitance and the pull-up network settle. The sensing is analog in
/// nature; reading earlier returns garbage, not an error.
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// One of the two contact groups joined by the harness. The order West,
/// East is fixed; it is baked into the signature layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    West,
    East,
}

impl Unit {
    pub const ALL: [Unit; 2] = [Unit::West, Unit::East];

    pub fn opposite(self) -> Unit {
        match self {
            Unit::West => Unit::East,
            Unit::East => Unit::West,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Unit::West => 0,
            Unit::East => 1,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::West => write!(f, "west"),
            Unit::East => write!(f, "east"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid pin index {0} (expected 0-15)")]
    InvalidPin(u8),
    #[error("bus failure during scan: {0}")]
    Bus(#[from] BusError),
    #[error("reset failure during scan: {0}")]
    Reset(#[from] ResetError),
}

/// Readings taken after driving exactly one line: `true` means the line was
/// observed electrically low, i.e. dragged down by the driven line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawReading {
    pub west: [bool; LINES_PER_UNIT],
    pub east: [bool; LINES_PER_UNIT],
}

impl RawReading {
    pub fn unit(&self, unit: Unit) -> &[bool; LINES_PER_UNIT] {
        match unit {
            Unit::West => &self.west,
            Unit::East => &self.east,
        }
    }
}

/// Full scan result: one reading per (unit, pin), indexed in scan order.
/// Only ever produced by 32 complete single-pin probes; a probe failure
/// aborts the whole scan instead of leaving holes.
#[derive(Debug, Clone)]
pub struct ConnectivityMatrix {
    pub readings: [[RawReading; LINES_PER_UNIT]; 2],
}

impl Default for ConnectivityMatrix {
    fn default() -> Self {
        Self {
            readings: [[RawReading::default(); LINES_PER_UNIT]; 2],
        }
    }
}

impl ConnectivityMatrix {
    pub fn reading(&self, unit: Unit, pin: usize) -> &RawReading {
        &self.readings[unit.index()][pin]
    }
}

/// Bank masks isolating `pin`: bit cleared on the line under test, every
/// other line left at its passive default.
fn pin_masks(pin: u8) -> Result<(u8, u8), ScanError> {
    match pin {
        0..=7 => Ok((!(1u8 << pin), 0xff)),
        8..=15 => Ok((0xff, !(1u8 << (pin - 8)))),
        _ => Err(ScanError::InvalidPin(pin)),
    }
}

// Bit clear = line low = connection candidate.
fn decode_bank(value: u8) -> [bool; 8] {
    let mut flags = [false; 8];
    for (bit, flag) in flags.iter_mut().enumerate() {
        *flag = value & (1 << bit) == 0;
    }
    flags
}

fn decode_ports(low: u8, high: u8) -> [bool; LINES_PER_UNIT] {
    let mut flags = [false; LINES_PER_UNIT];
    flags[..8].copy_from_slice(&decode_bank(low));
    flags[8..].copy_from_slice(&decode_bank(high));
    flags
}

/// Drives the per-pin continuity protocol across both expanders.
///
/// The scanner takes ownership of the bus handle, both device addresses,
/// and the reset controller; nothing else may talk to them while a scan is
/// in flight.
pub struct ContinuityScanner<B: Bus, R: ResetController> {
    bus: B,
    west: Mcp23017,
    east: Mcp23017,
    resetter: R,
    settle: Duration,
}

impl<B: Bus, R: ResetController> ContinuityScanner<B, R> {
    pub fn new(bus: B, west: Mcp23017, east: Mcp23017, resetter: R) -> Self {
        Self {
            bus,
            west,
            east,
            resetter,
            settle: SETTLE_DELAY,
        }
    }

    /// Overrides the settle delay. The default suits MCP23017 inputs behind
    /// roughly a meter of harness cable.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn resetter_mut(&mut self) -> &mut R {
        &mut self.resetter
    }

    /// Register state of both expanders, for the verbose dump.
    pub fn debug_states(&mut self) -> Result<(ExpanderState, ExpanderState), BusError> {
        let west = self.west.read_state(&mut self.bus)?;
        let east = self.east.read_state(&mut self.bus)?;
        Ok((west, east))
    }

    /// Single-pin test. The tested line ends up as the only one with its
    /// pull-up off and its driver on; every other line on both units is an
    /// input pulled high, so an unconnected line reads high instead of
    /// floating.
    pub fn probe(&mut self, unit: Unit, pin: u8) -> Result<RawReading, ScanError> {
        let (low, high) = pin_masks(pin)?;

        // A previous probe can leave latched state on the line; without the
        // reset an unconnected line can read as connected.
        self.resetter.reset()?;

        let (active, passive) = match unit {
            Unit::West => (self.west, self.east),
            Unit::East => (self.east, self.west),
        };

        // Pull-ups on both sides first, directions second: no line may
        // switch to output while the pull network is still undefined.
        active.set_pullups(&mut self.bus, Some(low), Some(high))?;
        passive.set_pullups(&mut self.bus, Some(0xff), Some(0xff))?;
        active.set_direction(&mut self.bus, Some(low), Some(high))?;
        passive.set_direction(&mut self.bus, Some(0xff), Some(0xff))?;

        thread::sleep(self.settle);

        let west = self.west.read_values(&mut self.bus)?;
        let east = self.east.read_values(&mut self.bus)?;
        Ok(RawReading {
            west: decode_ports(west.0, west.1),
            east: decode_ports(east.0, east.1),
        })
    }

    /// Full scan: West then East, pin 0 through 15, one reset per probe.
    /// The order is part of the signature layout; reordering would silently
    /// orphan every catalog entry.
    pub fn scan(&mut self) -> Result<ConnectivityMatrix, ScanError> {
        let mut matrix = ConnectivityMatrix::default();
        for unit in Unit::ALL {
            for pin in 0..LINES_PER_UNIT as u8 {
                matrix.readings[unit.index()][pin as usize] = self.probe(unit, pin)?;
            }
        }
        Ok(matrix)
    }
}
