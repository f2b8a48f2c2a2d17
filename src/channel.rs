//! Bounds-checked I/O identifiers.
//!
//! The wire protocol numbers channels from 1 as ASCII digits; internally
//! every per-channel table is a zero-based array.  [`IoIndex`] is the only
//! way to index those tables, and it can only be built from an in-range
//! number, so out-of-range ids are rejected where they enter the system.

use core::fmt;

/// A channel number in `1..=N`, stored zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IoIndex<const N: usize>(u8);

/// Relay / opto output or temperature probe, `1..=4`.
pub type ChannelId = IoIndex<4>;

/// Push-button or analog input, `1..=2`.
pub type InputId = IoIndex<2>;

impl<const N: usize> IoIndex<N> {
    /// Number of valid ids.
    pub const COUNT: usize = N;

    /// Build from a 1-based channel number.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && (number as usize) <= N {
            Some(Self(number - 1))
        } else {
            None
        }
    }

    /// Build from a zero-based table index.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < N { Some(Self(index as u8)) } else { None }
    }

    /// Build from an ASCII digit as sent on the wire (`b'1'` → channel 1).
    pub fn from_ascii(byte: u8) -> Option<Self> {
        byte.checked_sub(b'0').and_then(Self::new)
    }

    /// 1-based number as used on the wire and in logs.
    pub const fn number(self) -> u8 {
        self.0 + 1
    }

    /// Zero-based table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every valid id, in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..N).map(|i| Self(i as u8))
    }
}

impl<const N: usize> fmt::Display for IoIndex<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_range_is_one_to_four() {
        assert!(ChannelId::new(0).is_none());
        assert_eq!(ChannelId::new(1).map(ChannelId::index), Some(0));
        assert_eq!(ChannelId::new(4).map(ChannelId::index), Some(3));
        assert!(ChannelId::new(5).is_none());
    }

    #[test]
    fn input_range_is_one_to_two() {
        assert!(InputId::new(2).is_some());
        assert!(InputId::new(3).is_none());
    }

    #[test]
    fn ascii_digits_map_to_numbers() {
        assert_eq!(ChannelId::from_ascii(b'3').map(ChannelId::number), Some(3));
        assert!(ChannelId::from_ascii(b'0').is_none());
        assert!(ChannelId::from_ascii(b'9').is_none());
        assert!(ChannelId::from_ascii(b'/').is_none());
        assert!(ChannelId::from_ascii(b'A').is_none());
    }

    #[test]
    fn all_yields_every_channel_once() {
        let numbers: Vec<u8> = ChannelId::all().map(ChannelId::number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
