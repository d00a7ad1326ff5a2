//! Raw interface counters and their storage width.
//!
//! A device counter only ever goes up, until it reaches the maximum
//! value its storage width allows and restarts from zero. The
//! [`CounterWidth`] knows that modulus and is used to correct a
//! difference taken across the wrap point.

use std::fmt;

/// The six counters sampled on each interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterKind {
    InOctets,
    OutOctets,
    InPackets,
    OutPackets,
    InErrors,
    OutErrors,
}

impl CounterKind {
    pub const ALL: [Self; 6] = [
        Self::InOctets,
        Self::OutOctets,
        Self::InPackets,
        Self::OutPackets,
        Self::InErrors,
        Self::OutErrors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InOctets => "in_octets",
            Self::OutOctets => "out_octets",
            Self::InPackets => "in_packets",
            Self::OutPackets => "out_packets",
            Self::InErrors => "in_errors",
            Self::OutErrors => "out_errors",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of values, one per [`CounterKind`].
///
/// Used both for the absolute readings of a sample and for the
/// wrap-corrected differences of a delta.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Counters {
    pub in_octets: u64,
    pub out_octets: u64,
    pub in_packets: u64,
    pub out_packets: u64,
    pub in_errors: u64,
    pub out_errors: u64,
}

impl Counters {
    pub const ZERO: Self = Self {
        in_octets: 0,
        out_octets: 0,
        in_packets: 0,
        out_packets: 0,
        in_errors: 0,
        out_errors: 0,
    };

    pub fn get(&self, kind: CounterKind) -> u64 {
        match kind {
            CounterKind::InOctets => self.in_octets,
            CounterKind::OutOctets => self.out_octets,
            CounterKind::InPackets => self.in_packets,
            CounterKind::OutPackets => self.out_packets,
            CounterKind::InErrors => self.in_errors,
            CounterKind::OutErrors => self.out_errors,
        }
    }

    pub fn set(&mut self, kind: CounterKind, value: u64) {
        let slot = match kind {
            CounterKind::InOctets => &mut self.in_octets,
            CounterKind::OutOctets => &mut self.out_octets,
            CounterKind::InPackets => &mut self.in_packets,
            CounterKind::OutPackets => &mut self.out_packets,
            CounterKind::InErrors => &mut self.in_errors,
            CounterKind::OutErrors => &mut self.out_errors,
        };
        *slot = value;
    }

    /// iterate over every `(kind, value)` pair, in [`CounterKind::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (CounterKind, u64)> + '_ {
        CounterKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    // the sums are widened so that two 64-bit counters never overflow

    pub fn total_octets(&self) -> u128 {
        self.in_octets as u128 + self.out_octets as u128
    }

    pub fn total_packets(&self) -> u128 {
        self.in_packets as u128 + self.out_packets as u128
    }

    pub fn total_errors(&self) -> u128 {
        self.in_errors as u128 + self.out_errors as u128
    }
}

/// Storage width of a device counter.
///
/// SNMP `Counter32` objects (`ifInOctets`, ...) wrap at `2^32`, the
/// `Counter64` objects of the `ifXTable` (`ifHCInOctets`, ...) wrap
/// at `2^64`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterWidth {
    #[default]
    Bits32,
    Bits64,
}

impl CounterWidth {
    /// the number of distinct values the counter can hold
    ///
    /// ```
    /// # use ifrate_core::CounterWidth;
    /// assert_eq!(CounterWidth::Bits32.modulus(), 1 << 32);
    /// assert_eq!(CounterWidth::Bits64.modulus(), 1 << 64);
    /// ```
    pub const fn modulus(self) -> u128 {
        match self {
            Self::Bits32 => 1 << 32,
            Self::Bits64 => 1 << 64,
        }
    }

    /// the largest value a counter of this width may report
    pub const fn max_value(self) -> u64 {
        match self {
            Self::Bits32 => u32::MAX as u64,
            Self::Bits64 => u64::MAX,
        }
    }

    #[inline]
    pub const fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }

    /// compute the increase from `prev` to `curr`
    ///
    /// If `curr` is smaller than `prev` the counter is assumed to have
    /// wrapped around **exactly once**. More than one wrap between two
    /// readings cannot be detected from the values alone.
    ///
    /// Both values must [fit](Self::fits) in the width.
    ///
    /// ```
    /// # use ifrate_core::CounterWidth;
    /// let width = CounterWidth::Bits32;
    /// assert_eq!(width.delta(1_000, 1_500), (500, false));
    /// // 5 to reach the wrap point, 10 after it
    /// assert_eq!(width.delta(u32::MAX as u64 - 4, 10), (15, true));
    /// ```
    pub fn delta(self, prev: u64, curr: u64) -> (u64, bool) {
        debug_assert!(self.fits(prev) && self.fits(curr));

        if curr >= prev {
            (curr - prev, false)
        } else {
            // (modulus - prev) + curr is always < modulus, it fits in a u64
            let delta = (self.modulus() - prev as u128) + curr as u128;
            (delta as u64, true)
        }
    }
}

impl fmt::Display for CounterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => f.write_str("32-bit"),
            Self::Bits64 => f.write_str("64-bit"),
        }
    }
}

/// The [`CounterWidth`] of every counter of a sample.
///
/// Devices commonly mix widths: 64-bit octet counters from the
/// `ifXTable` next to 32-bit error counters from the `ifTable`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterWidths {
    pub octets: CounterWidth,
    pub packets: CounterWidth,
    pub errors: CounterWidth,
}

impl CounterWidths {
    /// use the same width for every counter
    pub const fn uniform(width: CounterWidth) -> Self {
        Self {
            octets: width,
            packets: width,
            errors: width,
        }
    }

    pub fn get(&self, kind: CounterKind) -> CounterWidth {
        match kind {
            CounterKind::InOctets | CounterKind::OutOctets => self.octets,
            CounterKind::InPackets | CounterKind::OutPackets => self.packets,
            CounterKind::InErrors | CounterKind::OutErrors => self.errors,
        }
    }
}
