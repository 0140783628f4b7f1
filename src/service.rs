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

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde_json::json;

use crate::catalog::SignatureCatalog;
use crate::i2c::Bus;
use crate::logger;
use crate::reset::{BusResetController, ResetController, READY_FLAG};
use crate::scanner::ContinuityScanner;
use crate::signature;

/// One classified scan, ready for rendering.
pub struct ScanOutcome {
    pub signature: String,
    pub labels: Vec<String>,
    pub diagram: String,
}

/// Scan, encode, and look the harness up in the catalog.
pub fn classify<B: Bus, R: ResetController>(
    scanner: &mut ContinuityScanner<B, R>,
    catalog: &SignatureCatalog,
) -> Result<ScanOutcome> {
    logger::log_event("scan_start", json!({}));
    let matrix = scanner.scan().context("continuity scan failed")?;
    let sig = signature::to_signature(&matrix);
    let labels = catalog.search(&sig);
    logger::log_event(
        "scan_done",
        json!({ "signature": sig, "matches": labels }),
    );
    Ok(ScanOutcome {
        signature: sig,
        labels,
        diagram: signature::matrix_diagram(&matrix),
    })
}

/// Operator report: catalog hits, or everything needed to curate a new
/// catalog entry by hand.
pub fn render_report(outcome: &ScanOutcome, verbose: bool) -> String {
    let mut out = String::new();
    if outcome.labels.is_empty() {
        out.push_str("NotFound:\n");
        out.push_str(&outcome.diagram);
        out.push_str(&outcome.signature);
        out.push('\n');
    } else {
        out.push_str("Found:\n");
        for label in &outcome.labels {
            let _ = writeln!(out, "  - {}", label);
        }
        if verbose {
            out.push_str(&outcome.diagram);
            out.push_str(&outcome.signature);
            out.push('\n');
        }
    }
    out
}

pub fn run_once<B: Bus, R: ResetController>(
    scanner: &mut ContinuityScanner<B, R>,
    catalog: &SignatureCatalog,
    verbose: bool,
) -> Result<()> {
    if verbose {
        let (west, east) = scanner.debug_states().context("reading expander state")?;
        eprintln!("west expander: {:?}", west);
        eprintln!("east expander: {:?}", east);
    }
    let outcome = classify(scanner, catalog)?;
    print!("{}", render_report(&outcome, verbose));
    Ok(())
}

/// Loop mode rides the ready flag on the bus-attached reset device: block
/// until external hardware raises it, scan, report, repeat. Only a scan or
/// flag failure ends the loop.
pub fn run_loop<B: Bus, B2: Bus>(
    scanner: &mut ContinuityScanner<B, BusResetController<B2>>,
    catalog: &SignatureCatalog,
    verbose: bool,
) -> Result<()> {
    loop {
        scanner
            .resetter_mut()
            .wait_ready()
            .context("waiting for ready flag")?;
        run_once(scanner, catalog, verbose)?;
        // A request raised while the scan was running is stale; drop it.
        scanner
            .resetter_mut()
            .set_flag(READY_FLAG, 0)
            .context("clearing ready flag")?;
    }
}
