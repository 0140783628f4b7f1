/*
 * Test utilities and mock fixtures for Wiremap
 *
 * This module provides the simulated harness used by scanner and service
 * tests, plus helpers for building connectivity matrices by hand.
 */

#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;

    use crate::i2c::{Bus, BusError};
    use crate::scanner::{ConnectivityMatrix, Unit};

    pub const WEST_ADDR: u16 = 0x20;
    pub const EAST_ADDR: u16 = 0x21;

    /// Register-level simulation of both expanders plus the copper between
    /// them. Writes land in a register map; reads of the GPIO ports compute
    /// line levels from the electrical net: any output in a net drives it
    /// low (the output latch powers up low), every other line reads high
    /// through its pull-up.
    pub struct FakeHarness {
        regs: HashMap<(u16, u8), u8>,
        wires: Vec<(u8, u8)>, // (west line, east line)
        /// Every register write, in order, for protocol assertions.
        pub ops: Vec<(u16, u8, Vec<u8>)>,
    }

    impl FakeHarness {
        pub fn new(wires: &[(u8, u8)]) -> Self {
            Self {
                regs: HashMap::new(),
                wires: wires.to_vec(),
                ops: Vec::new(),
            }
        }

        fn reg(&self, addr: u16, reg: u8) -> u8 {
            // Unwritten registers sit at power-on defaults: IODIR all
            // inputs, everything else zero.
            *self.regs.get(&(addr, reg)).unwrap_or(match reg {
                0x00 | 0x01 => &0xff,
                _ => &0x00,
            })
        }

        fn is_output(&self, addr: u16, line: u8) -> bool {
            let reg = if line < 8 { 0x00 } else { 0x01 };
            self.reg(addr, reg) & (1 << (line % 8)) == 0
        }

        fn partners(&self, addr: u16, line: u8) -> Vec<(u16, u8)> {
            let mut net = Vec::new();
            for &(west, east) in &self.wires {
                if addr == WEST_ADDR && west == line {
                    net.push((EAST_ADDR, east));
                }
                if addr == EAST_ADDR && east == line {
                    net.push((WEST_ADDR, west));
                }
            }
            net
        }

        // A line reads low when it, or anything wired to it, is driven.
        fn line_low(&self, addr: u16, line: u8) -> bool {
            if self.is_output(addr, line) {
                return true;
            }
            self.partners(addr, line)
                .iter()
                .any(|&(a, l)| self.is_output(a, l))
        }

        fn port_value(&self, addr: u16, bank: u8) -> u8 {
            let mut value = 0u8;
            for bit in 0..8u8 {
                if !self.line_low(addr, bank * 8 + bit) {
                    value |= 1 << bit;
                }
            }
            value
        }
    }

    impl Bus for FakeHarness {
        fn write_reg(&mut self, addr: u16, reg: u8, data: &[u8]) -> Result<(), BusError> {
            self.ops.push((addr, reg, data.to_vec()));
            if let Some(&value) = data.first() {
                self.regs.insert((addr, reg), value);
            }
            Ok(())
        }

        fn read_reg(&mut self, addr: u16, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
            for (offset, slot) in buf.iter_mut().enumerate() {
                let reg = reg + offset as u8;
                *slot = match reg {
                    0x12 => self.port_value(addr, 0),
                    0x13 => self.port_value(addr, 1),
                    _ => self.reg(addr, reg),
                };
            }
            Ok(())
        }
    }

    /// Matrix holding the given 1:1 wires and nothing else. Readings carry
    /// only the opposite-side flags, the way codec tests construct them.
    pub fn matrix_with_wires(wires: &[(usize, usize)]) -> ConnectivityMatrix {
        let mut matrix = ConnectivityMatrix::default();
        for &(west, east) in wires {
            matrix.readings[Unit::West.index()][west].east[east] = true;
            matrix.readings[Unit::East.index()][east].west[west] = true;
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::i2c::Bus;
    use crate::scanner::Unit;

    #[test]
    fn test_fake_harness_defaults_read_high() {
        // All inputs, no wires: both ports float high through pull-ups.
        let mut harness = FakeHarness::new(&[]);
        let mut buf = [0u8; 2];
        harness.read_reg(WEST_ADDR, 0x12, &mut buf).unwrap();
        assert_eq!(buf, [0xff, 0xff]);
    }

    #[test]
    fn test_fake_harness_output_drags_wire_low() {
        let mut harness = FakeHarness::new(&[(2, 6)]);
        // West line 2 becomes an output; its net goes low on both sides.
        harness.write_reg(WEST_ADDR, 0x00, &[!(1 << 2)]).unwrap();
        let mut west = [0u8; 2];
        let mut east = [0u8; 2];
        harness.read_reg(WEST_ADDR, 0x12, &mut west).unwrap();
        harness.read_reg(EAST_ADDR, 0x12, &mut east).unwrap();
        assert_eq!(west[0], !(1 << 2));
        assert_eq!(east[0], !(1 << 6));
        assert_eq!((west[1], east[1]), (0xff, 0xff));
    }

    #[test]
    fn test_matrix_with_wires_sets_both_directions() {
        let matrix = matrix_with_wires(&[(1, 14)]);
        assert!(matrix.reading(Unit::West, 1).east[14]);
        assert!(matrix.reading(Unit::East, 14).west[1]);
        assert!(!matrix.reading(Unit::West, 1).west[1]);
    }
}
