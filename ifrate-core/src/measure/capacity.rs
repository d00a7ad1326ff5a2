use anyhow::{anyhow, bail};
use logos::Logos;
use std::{fmt, str::FromStr};

/// Nominal capacity of a link, in bits per second.
///
/// This is what a device reports as its interface speed (`ifSpeed`
/// or `ifHighSpeed` scaled back to bits per second). Unlike memory
/// sizes, link speeds use decimal multiples: `1kbps` is `1_000`
/// bits per second.
///
/// A capacity of `0` is treated as _unknown_ everywhere in this
/// crate; see [`LinkCapacity::known`].
///
/// # Example
///
/// ```
/// # use ifrate_core::measure::LinkCapacity;
/// let fast_ethernet: LinkCapacity = "100mbps".parse().unwrap();
/// assert_eq!(fast_ethernet.bits_per_sec(), 100_000_000);
/// assert_eq!(fast_ethernet.to_string(), "100mbps");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkCapacity(u64);

const K: u64 = 1_000;
const M: u64 = 1_000 * 1_000;
const G: u64 = 1_000 * 1_000 * 1_000;
const T: u64 = 1_000 * G;

impl LinkCapacity {
    /// the unknown capacity
    pub const UNKNOWN: Self = Self(0);

    /// create a new [`LinkCapacity`] from a number of bits per second
    ///
    /// ```
    /// # use ifrate_core::measure::LinkCapacity;
    /// let gigabit = LinkCapacity::from_bps(1_000_000_000);
    /// # assert_eq!(gigabit.to_string(), "1gbps");
    /// ```
    pub const fn from_bps(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    /// create a [`LinkCapacity`] from a value in megabits per second,
    /// the unit of `ifHighSpeed`.
    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps.saturating_mul(M))
    }

    #[inline]
    pub const fn bits_per_sec(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    /// returns `None` if the capacity is unknown (i.e. `0`)
    ///
    /// ```
    /// # use ifrate_core::measure::LinkCapacity;
    /// assert_eq!(LinkCapacity::UNKNOWN.known(), None);
    /// assert!(LinkCapacity::from_bps(10).known().is_some());
    /// ```
    #[inline]
    pub fn known(self) -> Option<Self> {
        if self.is_unknown() { None } else { Some(self) }
    }
}

impl fmt::Display for LinkCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;

        if v < K || v % K != 0 {
            write!(f, "{v}bps")
        } else if v < M || v % M != 0 {
            write!(f, "{}kbps", v / K)
        } else if v < G || v % G != 0 {
            write!(f, "{}mbps", v / M)
        } else if v < T || v % T != 0 {
            write!(f, "{}gbps", v / G)
        } else {
            write!(f, "{}tbps", v / T)
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"\s+")]
enum CapacityToken {
    #[regex("[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Count(u64),

    #[token("bps", |_| 1u64)]
    #[token("kbps", |_| K)]
    #[token("mbps", |_| M)]
    #[token("gbps", |_| G)]
    #[token("tbps", |_| T)]
    Unit(u64),
}

impl FromStr for LinkCapacity {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = CapacityToken::lexer(s);

        let (Some(Ok(CapacityToken::Count(count))), Some(Ok(CapacityToken::Unit(unit))), None) =
            (lex.next(), lex.next(), lex.next())
        else {
            bail!("Invalid link capacity `{s}', expected a number and a unit (bps, kbps, ...)")
        };

        count
            .checked_mul(unit)
            .map(Self)
            .ok_or_else(|| anyhow!("Link capacity `{s}' overflows 64 bits"))
    }
}

impl Default for LinkCapacity {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<u64> {
        s.parse::<LinkCapacity>().ok().map(LinkCapacity::bits_per_sec)
    }

    #[test]
    fn parse_units() {
        assert_eq!(parse("0bps"), Some(0));
        assert_eq!(parse("1544kbps"), Some(1_544_000));
        assert_eq!(parse("100mbps"), Some(100_000_000));
        assert_eq!(parse(" 10 gbps "), Some(10_000_000_000));
        assert_eq!(parse("10tbps"), Some(10_000_000_000_000));
    }

    #[test]
    fn parse_rejects() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("100"), None);
        assert_eq!(parse("gbps"), None);
        assert_eq!(parse("1gbps 1mbps"), None);
        assert_eq!(parse("100Mb/s"), None);
        assert_eq!(parse("99999999999tbps"), None);
    }

    #[test]
    fn display_largest_exact_unit() {
        let display = |bps| LinkCapacity::from_bps(bps).to_string();

        assert_eq!(display(0), "0bps");
        assert_eq!(display(1_500), "1500bps");
        assert_eq!(display(64_000), "64kbps");
        assert_eq!(display(1_544_000), "1544kbps");
        assert_eq!(display(100_000_000), "100mbps");
        assert_eq!(display(40_000_000_000), "40gbps");
        assert_eq!(display(10_000_000_000_000), "10tbps");
    }

    #[test]
    fn zero_is_unknown() {
        assert!(LinkCapacity::default().is_unknown());
        assert_eq!(LinkCapacity::UNKNOWN.known(), None);
        assert_eq!(
            LinkCapacity::from_mbps(1).known(),
            Some(LinkCapacity::from_bps(1_000_000))
        );
    }
}
