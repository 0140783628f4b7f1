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

use crate::scanner::{ConnectivityMatrix, Unit, LINES_PER_UNIT};

/// Folds a destination vector into 16 bits. The vector is consumed in index
/// order with a left shift before each add, so index 0 lands in the most
/// significant bit and index 15 in the least. This orientation is a strict
/// contract: flipping it would orphan every existing catalog entry.
pub fn fold_flags(flags: &[bool; LINES_PER_UNIT]) -> u16 {
    flags
        .iter()
        .fold(0u16, |acc, &flag| (acc << 1) | u16::from(flag))
}

/// Canonical signature: two space-separated halves in fixed West, East
/// order; within a half, one four-hex-digit code per pin packing that pin's
/// opposite-unit readings. Purely a function of the matrix, so identical
/// matrices always produce byte-identical strings.
pub fn to_signature(matrix: &ConnectivityMatrix) -> String {
    let mut halves = Vec::with_capacity(2);
    for unit in Unit::ALL {
        let mut half = String::with_capacity(LINES_PER_UNIT * 4);
        for pin in 0..LINES_PER_UNIT {
            let code = fold_flags(matrix.reading(unit, pin).unit(unit.opposite()));
            let _ = write!(half, "{:04x}", code);
        }
        halves.push(half);
    }
    halves.join(" ")
}

const DIAGRAM_HEADER: &str =
    "    0 1 2 3 4 5 6 7 8 9 A B C D E F   0 1 2 3 4 5 6 7 8 9 A B C D E F";

/// Operator-facing grid: per unit a block of rows, one per probed pin
/// (hex-labeled), with two-character cells across both units' 16 lines. A
/// row with exactly one observed connection is a plain 1:1 wire and marks
/// that cell `-`; any other count (open line, multi-way short) marks every
/// flagged cell `*`. Diagnostic output only; matching never looks at it.
pub fn matrix_diagram(matrix: &ConnectivityMatrix) -> String {
    let mut out = String::new();
    out.push_str(DIAGRAM_HEADER);
    out.push('\n');
    for unit in Unit::ALL {
        for pin in 0..LINES_PER_UNIT {
            let reading = matrix.reading(unit, pin);
            let hits = reading
                .west
                .iter()
                .chain(reading.east.iter())
                .filter(|&&flag| flag)
                .count();
            let mark = if hits == 1 { " -" } else { " *" };
            let _ = write!(out, "{:X}", pin);
            for flags in [&reading.west, &reading.east] {
                out.push_str("  ");
                for &flag in flags.iter() {
                    out.push_str(if flag { mark } else { "  " });
                }
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
