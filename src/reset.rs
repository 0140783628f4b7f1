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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::i2c::{Bus, BusError};

#[cfg(test)]
use mockall::automock;

const GPIO_ROOT: &str = "/sys/class/gpio";
// Width of the low pulse on the GPIO reset line.
const RESET_PULSE: Duration = Duration::from_millis(1);
// Wait after the reset command before the device is usable again.
const RESET_SETTLE: Duration = Duration::from_millis(10);
// Poll interval while waiting on the ready flag.
const READY_POLL: Duration = Duration::from_millis(10);

const RESET_REGISTER: u8 = 0x00;
/// Flag register raised by external hardware to request a scan.
pub const READY_FLAG: u8 = 0x01;
const FLAG_REGISTERS: std::ops::RangeInclusive<u8> = 0x01..=0x02;

#[derive(Error, Debug)]
pub enum ResetError {
    #[error("gpio access failed at {path}: {source}")]
    Gpio { path: PathBuf, source: io::Error },
    #[error("reset device unreachable: {0}")]
    Bus(#[from] BusError),
    #[error("invalid flag address 0x{0:02x} (valid: 0x01-0x02)")]
    InvalidFlagAddress(u8),
}

/// Brings the harness logic domain back to a known state before a probe.
/// Latched state from the previous probe can make an unconnected line read
/// as connected, so a failed reset is fatal to the scan.
#[cfg_attr(test, automock)]
pub trait ResetController {
    fn reset(&mut self) -> Result<(), ResetError>;
}

/// Discrete reset line behind the sysfs GPIO interface.
pub struct GpioResetController {
    pin_dir: PathBuf,
}

impl GpioResetController {
    pub fn new(port: u32) -> Result<Self, ResetError> {
        Self::at_root(Path::new(GPIO_ROOT), port)
    }

    /// Exports the line if the kernel has not, drives it as an output, and
    /// parks it high (the reset is active-low).
    pub fn at_root(root: &Path, port: u32) -> Result<Self, ResetError> {
        let pin_dir = root.join(format!("gpio{}", port));
        if !pin_dir.exists() {
            write_sysfs(&root.join("export"), &format!("{}\n", port))?;
        }
        let ctl = Self { pin_dir };
        ctl.write_attr("direction", "out\n")?;
        ctl.write_attr("value", "1\n")?;
        Ok(ctl)
    }

    fn write_attr(&self, attr: &str, value: &str) -> Result<(), ResetError> {
        write_sysfs(&self.pin_dir.join(attr), value)
    }
}

fn write_sysfs(path: &Path, value: &str) -> Result<(), ResetError> {
    fs::write(path, value).map_err(|source| ResetError::Gpio {
        path: path.to_path_buf(),
        source,
    })
}

impl ResetController for GpioResetController {
    fn reset(&mut self) -> Result<(), ResetError> {
        self.write_attr("value", "0\n")?;
        thread::sleep(RESET_PULSE);
        self.write_attr("value", "1\n")?;
        thread::sleep(RESET_PULSE);
        Ok(())
    }
}

/// Watchdog-style reset device sitting on the expander bus. Owns its own
/// descriptor so the scanner's exclusive bus handle stays untouched; the
/// kernel serializes transactions on the adapter.
pub struct BusResetController<B: Bus> {
    bus: B,
    addr: u16,
}

impl<B: Bus> BusResetController<B> {
    pub fn new(bus: B, addr: u16) -> Self {
        Self { bus, addr }
    }

    pub fn set_flag(&mut self, flag: u8, value: u8) -> Result<(), ResetError> {
        check_flag(flag)?;
        self.bus.write_reg(self.addr, flag, &[value])?;
        Ok(())
    }

    pub fn get_flag(&mut self, flag: u8) -> Result<u8, ResetError> {
        check_flag(flag)?;
        let mut buf = [0u8; 1];
        self.bus.read_reg(self.addr, flag, &mut buf)?;
        Ok(buf[0])
    }

    /// Blocks until external hardware raises the ready flag, then clears it.
    /// Polls at a fixed interval rather than spinning.
    pub fn wait_ready(&mut self) -> Result<(), ResetError> {
        loop {
            thread::sleep(READY_POLL);
            if self.get_flag(READY_FLAG)? == 1 {
                self.set_flag(READY_FLAG, 0)?;
                return Ok(());
            }
        }
    }
}

fn check_flag(flag: u8) -> Result<(), ResetError> {
    if FLAG_REGISTERS.contains(&flag) {
        Ok(())
    } else {
        Err(ResetError::InvalidFlagAddress(flag))
    }
}

impl<B: Bus> ResetController for BusResetController<B> {
    fn reset(&mut self) -> Result<(), ResetError> {
        self.bus.write_reg(self.addr, RESET_REGISTER, &[])?;
        thread::sleep(RESET_SETTLE);
        Ok(())
    }
}
