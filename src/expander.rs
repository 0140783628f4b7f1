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

use crate::i2c::{Bus, BusError};

// MCP23017 register map with IOCON.BANK = 0, the power-on layout.
const IODIRA: u8 = 0x00;
const IODIRB: u8 = 0x01;
const GPPUA: u8 = 0x0c;
const GPPUB: u8 = 0x0d;
const GPIOA: u8 = 0x12;
const GPIOB: u8 = 0x13;

/// One 16-line port expander at a fixed bus address.
///
/// Lines 0-7 live in bank A ("low"), 8-15 in bank B ("high"). Every bank
/// argument is optional: `None` leaves that register exactly as it was, so a
/// caller can touch one bank without restating the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mcp23017 {
    addr: u16,
}

/// Snapshot of the registers that matter for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpanderState {
    pub directions: (u8, u8),
    pub pullups: (u8, u8),
    pub values: (u8, u8),
}

impl Mcp23017 {
    pub fn new(addr: u16) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> u16 {
        self.addr
    }

    fn write_banks(
        &self,
        bus: &mut dyn Bus,
        reg_low: u8,
        reg_high: u8,
        low: Option<u8>,
        high: Option<u8>,
    ) -> Result<(), BusError> {
        if let Some(mask) = low {
            bus.write_reg(self.addr, reg_low, &[mask])?;
        }
        if let Some(mask) = high {
            bus.write_reg(self.addr, reg_high, &[mask])?;
        }
        Ok(())
    }

    /// Per line: 0 = pull-up disabled, 1 = enabled. Device default: disabled.
    pub fn set_pullups(
        &self,
        bus: &mut dyn Bus,
        low: Option<u8>,
        high: Option<u8>,
    ) -> Result<(), BusError> {
        self.write_banks(bus, GPPUA, GPPUB, low, high)
    }

    /// Per line: 0 = output, 1 = input. Device default: input.
    pub fn set_direction(
        &self,
        bus: &mut dyn Bus,
        low: Option<u8>,
        high: Option<u8>,
    ) -> Result<(), BusError> {
        self.write_banks(bus, IODIRA, IODIRB, low, high)
    }

    /// Per line: 0 = drive low, 1 = drive high. Only lines configured as
    /// outputs care; the latch powers up at zero.
    pub fn set_outputs(
        &self,
        bus: &mut dyn Bus,
        low: Option<u8>,
        high: Option<u8>,
    ) -> Result<(), BusError> {
        self.write_banks(bus, GPIOA, GPIOB, low, high)
    }

    /// Both input ports in one sequential 2-byte read starting at GPIOA.
    pub fn read_values(&self, bus: &mut dyn Bus) -> Result<(u8, u8), BusError> {
        let mut buf = [0u8; 2];
        bus.read_reg(self.addr, GPIOA, &mut buf)?;
        Ok((buf[0], buf[1]))
    }

    /// Full register read-back for diagnostics.
    pub fn read_state(&self, bus: &mut dyn Bus) -> Result<ExpanderState, BusError> {
        let mut directions = [0u8; 2];
        let mut pullups = [0u8; 2];
        let mut values = [0u8; 2];
        bus.read_reg(self.addr, IODIRA, &mut directions)?;
        bus.read_reg(self.addr, GPPUA, &mut pullups)?;
        bus.read_reg(self.addr, GPIOA, &mut values)?;
        Ok(ExpanderState {
            directions: (directions[0], directions[1]),
            pullups: (pullups[0], pullups[1]),
            values: (values[0], values[1]),
        })
    }
}
