use crate::{
    counter::{CounterWidth, CounterWidths},
    measure::{LinkCapacity, Percent},
};

/// Default [`LinkCapacity`] assumed when a device does not report one
///
/// Virtual and loopback interfaces commonly report a speed of `0`.
/// The rate computation then falls back to this value and flags the
/// result as using an assumed capacity.
///
/// ```
/// # use ifrate_core::defaults::*;
/// assert_eq!(
///     DEFAULT_LINK_CAPACITY.to_string(),
///     "100mbps"
/// );
/// ```
pub const DEFAULT_LINK_CAPACITY: LinkCapacity = LinkCapacity::from_mbps(100);

/// Default width of every counter.
///
/// The plain `ifTable` counters are `Counter32`. Use
/// [`CounterWidth::Bits64`] when sampling the `ifXTable` high
/// capacity counters.
pub const DEFAULT_COUNTER_WIDTHS: CounterWidths = CounterWidths::uniform(CounterWidth::Bits32);

/// Default plausibility ceiling for the bit rate implied by a delta
///
/// 10 tbps is well above any single physical link. A delta implying
/// more than this is most likely an undetected counter reset (device
/// reboot) mistaken for a wraparound.
///
/// ```
/// # use ifrate_core::defaults::*;
/// assert_eq!(DEFAULT_MAX_BITS_PER_SEC.to_string(), "10tbps");
/// ```
pub const DEFAULT_MAX_BITS_PER_SEC: LinkCapacity = LinkCapacity::from_mbps(10_000_000);

/// Default plausibility ceiling relative to the link capacity reported
/// with a delta
///
/// Counters can briefly run above the nominal speed (bursts, ifSpeed
/// capped for fast interfaces) but not by an order of magnitude.
pub const DEFAULT_MAX_CAPACITY_MULTIPLE: u32 = 10;

/// Default plausibility ceiling for the packet rate implied by a delta
///
/// This is 10 tbps worth of minimum size Ethernet frames (84 bytes on
/// the wire including preamble and inter-frame gap), rounded up.
pub const DEFAULT_MAX_PACKETS_PER_SEC: u64 = 15_000_000_000;

/// Default utilization limit above which a target is in alert.
pub const DEFAULT_UTILIZATION_LIMIT: Percent = Percent::EIGHTY;

/// Default error rate limit above which a target is in alert.
pub const DEFAULT_ERROR_RATE_LIMIT: Percent = Percent::ONE;
