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

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_bus_device() -> String {
    "/dev/i2c-1".to_string()
}
fn default_west_addr() -> u16 {
    0x20
}
fn default_east_addr() -> u16 {
    0x21
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("signatures.dat")
}
fn default_settle_ms() -> u64 {
    10
}
fn default_gpio_port() -> u32 {
    4
}
fn default_reset_addr() -> u16 {
    0x0f
}

/// How the harness logic domain gets its reset pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResetterConfig {
    /// Discrete reset line on a sysfs GPIO port.
    Gpio {
        #[serde(default = "default_gpio_port")]
        port: u32,
    },
    /// Watchdog-style reset device on the expander bus. Loop mode rides
    /// this device's ready flag, so it is only available with this kind.
    Bus {
        #[serde(default = "default_reset_addr")]
        addr: u16,
    },
}

impl Default for ResetterConfig {
    fn default() -> Self {
        ResetterConfig::Bus {
            addr: default_reset_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TesterConfig {
    #[serde(default = "default_bus_device")]
    pub bus_device: String,
    #[serde(default = "default_west_addr")]
    pub west_addr: u16,
    #[serde(default = "default_east_addr")]
    pub east_addr: u16,
    #[serde(default)]
    pub resetter: ResetterConfig,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            bus_device: default_bus_device(),
            west_addr: default_west_addr(),
            east_addr: default_east_addr(),
            resetter: ResetterConfig::default(),
            catalog_path: default_catalog_path(),
            settle_ms: default_settle_ms(),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("wiremap").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("wiremap")
            .join("config.json");
    }
    PathBuf::from("/etc/wiremap/config.json")
}

/// User config if present and valid; callers fall back to defaults.
pub fn load_config() -> Option<TesterConfig> {
    load_config_from(&config_path()).ok()
}

pub fn load_config_from(path: &Path) -> Result<TesterConfig, String> {
    let data = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let cfg: TesterConfig =
        serde_json::from_str(&data).map_err(|e| format!("parse error: {}", e))?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn valid_i2c_addr(addr: u16) -> bool {
    // 7-bit addressing minus the reserved ranges at both ends.
    (0x03..=0x77).contains(&addr)
}

pub fn validate_config(cfg: &TesterConfig) -> Result<(), String> {
    if cfg.bus_device.is_empty() {
        return Err("bus_device must not be empty".to_string());
    }
    if !valid_i2c_addr(cfg.west_addr) {
        return Err(format!(
            "west_addr 0x{:02x} outside the 7-bit range 0x03-0x77",
            cfg.west_addr
        ));
    }
    if !valid_i2c_addr(cfg.east_addr) {
        return Err(format!(
            "east_addr 0x{:02x} outside the 7-bit range 0x03-0x77",
            cfg.east_addr
        ));
    }
    if cfg.west_addr == cfg.east_addr {
        return Err("west_addr and east_addr must differ".to_string());
    }
    if let ResetterConfig::Bus { addr } = cfg.resetter {
        if !valid_i2c_addr(addr) {
            return Err(format!(
                "resetter addr 0x{:02x} outside the 7-bit range 0x03-0x77",
                addr
            ));
        }
        if addr == cfg.west_addr || addr == cfg.east_addr {
            return Err("resetter addr collides with an expander".to_string());
        }
    }
    if cfg.catalog_path.as_os_str().is_empty() {
        return Err("catalog_path must not be empty".to_string());
    }
    if cfg.settle_ms == 0 || cfg.settle_ms > 1000 {
        return Err("settle_ms out of range (1-1000)".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TesterConfig::default();
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.bus_device, "/dev/i2c-1");
        assert_eq!(cfg.west_addr, 0x20);
        assert_eq!(cfg.east_addr, 0x21);
        assert_eq!(cfg.resetter, ResetterConfig::Bus { addr: 0x0f });
        assert_eq!(cfg.catalog_path, PathBuf::from("signatures.dat"));
        assert_eq!(cfg.settle_ms, 10);
    }

    #[test]
    fn test_empty_object_deserializes_to_defaults() {
        let cfg: TesterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.west_addr, 0x20);
        assert_eq!(cfg.resetter, ResetterConfig::Bus { addr: 0x0f });
    }

    #[test]
    fn test_resetter_kind_tagging() {
        let gpio: ResetterConfig = serde_json::from_str(r#"{"kind":"gpio","port":17}"#).unwrap();
        assert_eq!(gpio, ResetterConfig::Gpio { port: 17 });
        let bus: ResetterConfig = serde_json::from_str(r#"{"kind":"bus"}"#).unwrap();
        assert_eq!(bus, ResetterConfig::Bus { addr: 0x0f });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<TesterConfig, _> =
            serde_json::from_str(r#"{"bus_device":"/dev/i2c-1","speed":9600}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        let mut cfg = TesterConfig {
            west_addr: 0x00,
            ..TesterConfig::default()
        };
        assert!(validate_config(&cfg).is_err());

        cfg.west_addr = 0x78;
        assert!(validate_config(&cfg).is_err());

        cfg.west_addr = 0x21;
        assert!(validate_config(&cfg).is_err(), "addresses must differ");

        cfg.west_addr = 0x20;
        cfg.resetter = ResetterConfig::Bus { addr: 0x21 };
        assert!(validate_config(&cfg).is_err(), "resetter collides");
    }

    #[test]
    fn test_validate_rejects_bad_settle() {
        let mut cfg = TesterConfig {
            settle_ms: 0,
            ..TesterConfig::default()
        };
        assert!(validate_config(&cfg).is_err());
        cfg.settle_ms = 1001;
        assert!(validate_config(&cfg).is_err());
        cfg.settle_ms = 1000;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_gpio_resetter_passes_validation() {
        let cfg = TesterConfig {
            resetter: ResetterConfig::Gpio { port: 4 },
            ..TesterConfig::default()
        };
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_serialization_round_trip() {
        let cfg = TesterConfig {
            bus_device: "/dev/i2c-3".to_string(),
            west_addr: 0x24,
            east_addr: 0x25,
            resetter: ResetterConfig::Gpio { port: 17 },
            catalog_path: PathBuf::from("/var/lib/wiremap/signatures.dat"),
            settle_ms: 25,
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: TesterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bus_device, cfg.bus_device);
        assert_eq!(back.west_addr, cfg.west_addr);
        assert_eq!(back.resetter, cfg.resetter);
        assert_eq!(back.catalog_path, cfg.catalog_path);
        assert_eq!(back.settle_ms, cfg.settle_ms);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bus_device":"/dev/i2c-0","west_addr":34,"east_addr":35}}"#
        )
        .unwrap();
        file.flush().unwrap();
        let cfg = load_config_from(file.path()).unwrap();
        assert_eq!(cfg.bus_device, "/dev/i2c-0");
        assert_eq!(cfg.west_addr, 34);
        assert_eq!(cfg.east_addr, 35);
    }

    #[test]
    fn test_load_config_from_invalid_content() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"west_addr": 32, "east_addr": 32}}"#).unwrap();
        file.flush().unwrap();
        let result = load_config_from(file.path());
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_config_path_with_xdg() {
        env::set_var("XDG_CONFIG_HOME", "/custom/config");
        let path = config_path();
        assert!(path
            .to_string_lossy()
            .contains("/custom/config/wiremap/config.json"));
        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn test_config_path_with_home() {
        env::remove_var("XDG_CONFIG_HOME");
        env::set_var("HOME", "/home/testuser");
        let path = config_path();
        assert!(path
            .to_string_lossy()
            .contains("/home/testuser/.config/wiremap/config.json"));
    }
}
