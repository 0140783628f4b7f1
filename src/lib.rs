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

//! Wiremap - wiring-harness continuity tester
//!
//! Scans a two-unit harness through MCP23017 port expanders on a shared
//! I2C bus, encodes the observed connectivity as a hex signature, and
//! classifies it against a catalog of known-good fingerprints.

pub mod catalog;
pub mod config;
pub mod expander;
pub mod i2c;
pub mod logger;
pub mod reset;
pub mod scanner;
pub mod service;
pub mod signature;

#[cfg(test)]
pub mod test_utils;
