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

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(test)]
use mockall::automock;

// Linux i2c-dev ioctl selecting the slave address for subsequent transfers.
const I2C_SLAVE: libc::c_ulong = 0x0703;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("failed to open bus device {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to address device 0x{addr:02x}: {source}")]
    Address { addr: u16, source: io::Error },
    #[error("write to device 0x{addr:02x} failed: {source}")]
    Write { addr: u16, source: io::Error },
    #[error("read from device 0x{addr:02x} failed: {source}")]
    Read { addr: u16, source: io::Error },
    #[error("device 0x{addr:02x} transferred {got} of {expected} bytes")]
    ShortTransfer { addr: u16, expected: usize, got: usize },
}

/// Register-addressed transport to devices sharing one bus.
///
/// Failures surface as [`BusError`] and are never retried here; whether a
/// transaction is safe to repeat is the caller's call.
#[cfg_attr(test, automock)]
pub trait Bus {
    fn write_reg(&mut self, addr: u16, reg: u8, data: &[u8]) -> Result<(), BusError>;
    fn read_reg(&mut self, addr: u16, reg: u8, buf: &mut [u8]) -> Result<(), BusError>;
}

/// `/dev/i2c-N` transport. Keeps track of the currently addressed device so
/// back-to-back transfers to the same chip skip the redundant ioctl.
pub struct I2cDevBus {
    file: std::fs::File,
    selected: Option<u16>,
}

impl I2cDevBus {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BusError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .map_err(|source| BusError::Open {
                path: path.as_ref().to_path_buf(),
                source,
            })?;
        Ok(Self {
            file,
            selected: None,
        })
    }

    fn select(&mut self, addr: u16) -> Result<(), BusError> {
        if self.selected == Some(addr) {
            return Ok(());
        }
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), I2C_SLAVE, addr as libc::c_ulong) };
        if rc < 0 {
            return Err(BusError::Address {
                addr,
                source: io::Error::last_os_error(),
            });
        }
        self.selected = Some(addr);
        Ok(())
    }
}

impl Bus for I2cDevBus {
    fn write_reg(&mut self, addr: u16, reg: u8, data: &[u8]) -> Result<(), BusError> {
        self.select(addr)?;
        let mut frame = Vec::with_capacity(1 + data.len());
        frame.push(reg);
        frame.extend_from_slice(data);
        let got = self
            .file
            .write(&frame)
            .map_err(|source| BusError::Write { addr, source })?;
        if got != frame.len() {
            return Err(BusError::ShortTransfer {
                addr,
                expected: frame.len(),
                got,
            });
        }
        Ok(())
    }

    fn read_reg(&mut self, addr: u16, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.select(addr)?;
        let got = self
            .file
            .write(&[reg])
            .map_err(|source| BusError::Write { addr, source })?;
        if got != 1 {
            return Err(BusError::ShortTransfer {
                addr,
                expected: 1,
                got,
            });
        }
        let got = self
            .file
            .read(buf)
            .map_err(|source| BusError::Read { addr, source })?;
        if got != buf.len() {
            return Err(BusError::ShortTransfer {
                addr,
                expected: buf.len(),
                got,
            });
        }
        Ok(())
    }
}
