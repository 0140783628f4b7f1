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

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use thiserror::Error;

use crate::logger;

lazy_static! {
    // Two hex groups, whitespace, then the label as the rest of the line.
    static ref ENTRY_LINE: Regex =
        Regex::new(r"^([0-9a-fA-F]+)\s+([0-9a-fA-F]+)\s+(\S.*)$").unwrap();
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub signature: String,
    pub label: String,
}

/// Known-good harness fingerprints: loaded once at startup, immutable
/// afterwards, queried by exact signature match per scan.
#[derive(Debug, Default)]
pub struct SignatureCatalog {
    entries: Vec<CatalogEntry>,
}

impl SignatureCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Catalog files accumulate human notes between entries; a line that
    /// does not parse as an entry is skipped, never fatal. Hex is
    /// normalized to lowercase on the way in.
    fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self, CatalogError> {
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            match ENTRY_LINE.captures(line.trim_end()) {
                Some(caps) => entries.push(CatalogEntry {
                    signature: format!("{} {}", &caps[1], &caps[2]).to_lowercase(),
                    label: caps[3].to_string(),
                }),
                None => {
                    if !line.trim().is_empty() {
                        skipped += 1;
                        logger::log_event("catalog_skip", json!({ "line": idx + 1 }));
                    }
                }
            }
        }
        logger::log_event(
            "catalog_loaded",
            json!({ "entries": entries.len(), "skipped": skipped }),
        );
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every label whose stored signature equals `signature`, hex case
    /// ignored. Zero, one, or many matches are all normal outcomes;
    /// duplicate labels are legitimate (harness variants sharing wiring).
    pub fn search(&self, signature: &str) -> Vec<String> {
        let wanted = signature.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.signature == wanted)
            .map(|entry| entry.label.clone())
            .collect()
    }
}
