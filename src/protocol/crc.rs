//! CRC-8, polynomial 0x07, initial value 0, no reflection, no final xor.

const POLY: u8 = 0x07;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ POLY } else { crc << 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC-8 state, restarted for every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc8(u8);

impl Crc8 {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.0 = TABLE[usize::from(self.0 ^ byte)];
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// One-shot CRC-8 over `data`.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = Crc8::new();
    crc.update(data);
    crc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        // CRC-8/SMBUS check value.
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut crc = Crc8::new();
        crc.update(b"ESC21");
        crc.update(b"0|11:15:03");
        assert_eq!(crc.value(), crc8(b"ESC210|11:15:03"));
    }
}
