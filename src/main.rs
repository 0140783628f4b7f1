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

mod catalog;
mod config;
mod expander;
mod i2c;
mod logger;
mod reset;
mod scanner;
mod service;
mod signature;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use catalog::SignatureCatalog;
use config::ResetterConfig;
use expander::Mcp23017;
use i2c::I2cDevBus;
use reset::{BusResetController, GpioResetController};
use scanner::ContinuityScanner;

fn main() -> anyhow::Result<()> {
    // The bus and GPIO device nodes are root-only on a stock image.
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: wiremap needs root to reach the I2C bus and the GPIO reset line.");
        eprintln!(
            "Please run with: sudo {}",
            std::env::args()
                .next()
                .unwrap_or_else(|| "wiremap".to_string())
        );
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().collect();
    let loop_mode = args.iter().any(|a| a == "-l" || a == "--loop");
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    let logging_enabled = args.iter().any(|a| a == "--logging");
    let config_override = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| PathBuf::from(&w[1]));

    if logging_enabled {
        logger::init_logging();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }

    let cfg = match &config_override {
        Some(path) => config::load_config_from(path)
            .map_err(|e| anyhow!("config {}: {}", path.display(), e))?,
        None => config::load_config().unwrap_or_default(),
    };
    config::validate_config(&cfg).map_err(|e| anyhow!("invalid config: {}", e))?;

    let catalog = SignatureCatalog::load(&cfg.catalog_path)
        .with_context(|| format!("loading catalog {}", cfg.catalog_path.display()))?;
    if catalog.is_empty() {
        eprintln!(
            "warning: catalog {} holds no entries; every harness will report NotFound",
            cfg.catalog_path.display()
        );
    }

    let bus = I2cDevBus::open(&cfg.bus_device)
        .with_context(|| format!("opening bus device {}", cfg.bus_device))?;
    let west = Mcp23017::new(cfg.west_addr);
    let east = Mcp23017::new(cfg.east_addr);
    let settle = Duration::from_millis(cfg.settle_ms);

    println!("Ready!");

    let result = match cfg.resetter {
        ResetterConfig::Gpio { port } => {
            if loop_mode {
                bail!("loop mode needs the bus-attached resetter (ready flag); configured resetter is gpio");
            }
            let resetter =
                GpioResetController::new(port).context("setting up gpio reset line")?;
            let mut scanner =
                ContinuityScanner::new(bus, west, east, resetter).with_settle(settle);
            service::run_once(&mut scanner, &catalog, verbose)
        }
        ResetterConfig::Bus { addr } => {
            let reset_bus = I2cDevBus::open(&cfg.bus_device)
                .context("opening bus device for the resetter")?;
            let resetter = BusResetController::new(reset_bus, addr);
            let mut scanner =
                ContinuityScanner::new(bus, west, east, resetter).with_settle(settle);
            if loop_mode {
                service::run_loop(&mut scanner, &catalog, verbose)
            } else {
                service::run_once(&mut scanner, &catalog, verbose)
            }
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        if logging_enabled {
            logger::log_event(
                "fatal_error",
                serde_json::json!({ "error": err.to_string() }),
            );
        }
        std::process::exit(1);
    }

    Ok(())
}
