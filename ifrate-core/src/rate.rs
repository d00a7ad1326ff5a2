use crate::{
    defaults::DEFAULT_LINK_CAPACITY,
    delta::{CounterDelta, DeltaQuality},
    measure::LinkCapacity,
    sample::TargetKey,
};
use log::trace;
use std::time::Duration;
use thiserror::Error;

/// Turns a [`CounterDelta`] into bandwidth, utilization and error rate.
///
/// The calculator is stateless: the only setting is the capacity to
/// assume for links that do not report one.
///
/// # Example
///
/// ```
/// use ifrate_core::{CounterDelta, Counters, RateCalculator};
/// use std::time::Duration;
///
/// let delta = CounterDelta::from_parts(
///     "agent-1".into(),
///     Duration::from_secs(2),
///     Counters {
///         in_octets: 125_000,
///         out_octets: 125_000,
///         ..Counters::ZERO
///     },
///     None,
/// );
///
/// let rate = RateCalculator::new().compute(&delta).unwrap();
/// assert_eq!(rate.bandwidth_bps, 1_000_000.0);
/// // 1 mbps over the default 100 mbps
/// assert_eq!(rate.utilization_pct, 1.0);
/// assert!(rate.capacity_is_assumed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateCalculator {
    fallback_capacity: LinkCapacity,
}

/// The rates derived from one [`CounterDelta`].
#[derive(Debug, Clone, PartialEq)]
pub struct RateResult {
    pub target_key: TargetKey,
    pub elapsed: Duration,

    /// in and out traffic together, in bits per second
    pub bandwidth_bps: f64,
    pub in_bps: f64,
    pub out_bps: f64,

    /// `bandwidth_bps` over `capacity`, in percent.
    ///
    /// Not clamped: above `100` either the link really bursted above
    /// its nominal rate or the nominal capacity is wrong.
    pub utilization_pct: f64,
    /// errors over packets, in percent. `0` when no packet was seen.
    pub error_rate_pct: f64,

    /// the capacity `utilization_pct` was computed against
    pub capacity: LinkCapacity,
    /// `true` if the device did not report a capacity and the
    /// calculator's fallback was used
    pub capacity_is_assumed: bool,

    pub total_octets: u128,
    pub total_packets: u128,
    pub total_errors: u128,

    /// carried over from the delta
    pub quality: DeltaQuality,
}

/// Returned by [`RateCalculator::compute`] for a delta with no elapsed
/// time.
///
/// Deltas produced by the [`CounterSampler`] never have a zero
/// elapsed time: this is a bug in whoever built the delta.
///
/// [`CounterSampler`]: crate::CounterSampler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Precondition violated: delta for {target} has no elapsed time")]
pub struct PreconditionViolation {
    pub target: TargetKey,
}

impl RateCalculator {
    /// create a calculator falling back to [`DEFAULT_LINK_CAPACITY`]
    pub const fn new() -> Self {
        Self::with_fallback_capacity(DEFAULT_LINK_CAPACITY)
    }

    /// create a calculator falling back to `fallback_capacity`
    ///
    /// An unknown (zero) fallback is replaced by [`DEFAULT_LINK_CAPACITY`]
    /// so that utilization is always finite.
    pub const fn with_fallback_capacity(fallback_capacity: LinkCapacity) -> Self {
        let fallback_capacity = if fallback_capacity.is_unknown() {
            DEFAULT_LINK_CAPACITY
        } else {
            fallback_capacity
        };
        Self { fallback_capacity }
    }

    #[inline]
    pub fn fallback_capacity(&self) -> LinkCapacity {
        self.fallback_capacity
    }

    pub fn compute(&self, delta: &CounterDelta) -> Result<RateResult, PreconditionViolation> {
        let elapsed = delta.elapsed();
        if elapsed.is_zero() {
            return Err(PreconditionViolation {
                target: delta.target_key().clone(),
            });
        }
        let secs = elapsed.as_secs_f64();

        let counters = delta.counters();
        let total_octets = counters.total_octets();
        let total_packets = counters.total_packets();
        let total_errors = counters.total_errors();

        let bandwidth_bps = (total_octets as f64 * 8.0) / secs;
        let in_bps = (counters.in_octets as f64 * 8.0) / secs;
        let out_bps = (counters.out_octets as f64 * 8.0) / secs;

        let (capacity, capacity_is_assumed) = match delta.link_capacity() {
            Some(capacity) if !capacity.is_unknown() => (capacity, false),
            _ => (self.fallback_capacity, true),
        };
        let utilization_pct = bandwidth_bps / capacity.bits_per_sec() as f64 * 100.0;

        let error_rate_pct = if total_packets == 0 {
            0.0
        } else {
            total_errors as f64 / total_packets as f64 * 100.0
        };

        trace!(
            "{}: {bandwidth_bps:.0}bps, {utilization_pct:.4}% of {capacity}, {error_rate_pct:.4}% errors",
            delta.target_key()
        );

        Ok(RateResult {
            target_key: delta.target_key().clone(),
            elapsed,
            bandwidth_bps,
            in_bps,
            out_bps,
            utilization_pct,
            error_rate_pct,
            capacity,
            capacity_is_assumed,
            total_octets,
            total_packets,
            total_errors,
            quality: delta.quality(),
        })
    }
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateResult {
    #[inline]
    pub fn is_suspect(&self) -> bool {
        matches!(self.quality, DeltaQuality::Suspect(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::Counters;

    fn delta(elapsed: Duration, counters: Counters, capacity: Option<LinkCapacity>) -> CounterDelta {
        CounterDelta::from_parts("agent-1".into(), elapsed, counters, capacity)
    }

    #[test]
    fn bandwidth() {
        let delta = delta(
            Duration::from_secs(2),
            Counters {
                in_octets: 125_000,
                out_octets: 125_000,
                ..Counters::ZERO
            },
            Some(LinkCapacity::from_mbps(10)),
        );

        let rate = RateCalculator::new().compute(&delta).unwrap();

        assert_eq!(rate.bandwidth_bps, 1_000_000.0);
        assert_eq!(rate.in_bps, 500_000.0);
        assert_eq!(rate.out_bps, 500_000.0);
        assert_eq!(rate.utilization_pct, 10.0);
        assert_eq!(rate.capacity, LinkCapacity::from_mbps(10));
        assert!(!rate.capacity_is_assumed);
        assert_eq!(rate.total_octets, 250_000);
    }

    #[test]
    fn unknown_capacity_fallback() {
        let counters = Counters {
            in_octets: 12_500_000,
            ..Counters::ZERO
        };

        let rate = RateCalculator::new()
            .compute(&delta(Duration::from_secs(1), counters, None))
            .unwrap();
        assert!(rate.capacity_is_assumed);
        assert_eq!(rate.capacity, DEFAULT_LINK_CAPACITY);
        assert_eq!(rate.utilization_pct, 100.0);

        let calculator = RateCalculator::with_fallback_capacity(LinkCapacity::from_mbps(1_000));
        let rate = calculator
            .compute(&delta(Duration::from_secs(1), counters, None))
            .unwrap();
        assert!(rate.capacity_is_assumed);
        assert_eq!(rate.capacity, LinkCapacity::from_mbps(1_000));
        assert_eq!(rate.utilization_pct, 10.0);
    }

    #[test]
    fn unknown_fallback_is_replaced() {
        assert_eq!(
            RateCalculator::with_fallback_capacity(LinkCapacity::UNKNOWN).fallback_capacity(),
            DEFAULT_LINK_CAPACITY
        );
    }

    #[test]
    fn utilization_is_not_clamped() {
        let counters = Counters {
            in_octets: 2_500_000,
            ..Counters::ZERO
        };
        let rate = RateCalculator::new()
            .compute(&delta(
                Duration::from_secs(1),
                counters,
                Some(LinkCapacity::from_mbps(10)),
            ))
            .unwrap();

        assert_eq!(rate.utilization_pct, 200.0);
    }

    #[test]
    fn zero_packet_delta() {
        let counters = Counters {
            in_errors: 10,
            out_errors: 5,
            ..Counters::ZERO
        };
        let rate = RateCalculator::new()
            .compute(&delta(Duration::from_secs(1), counters, None))
            .unwrap();

        assert_eq!(rate.error_rate_pct, 0.0);
        assert_eq!(rate.total_errors, 15);
    }

    #[test]
    fn error_rate() {
        let counters = Counters {
            in_packets: 150,
            out_packets: 50,
            in_errors: 1,
            out_errors: 1,
            ..Counters::ZERO
        };
        let rate = RateCalculator::new()
            .compute(&delta(Duration::from_secs(1), counters, None))
            .unwrap();

        assert_eq!(rate.error_rate_pct, 1.0);
    }

    #[test]
    fn zero_elapsed_is_a_precondition_violation() {
        let error = RateCalculator::new()
            .compute(&delta(Duration::ZERO, Counters::ZERO, None))
            .unwrap_err();

        assert_eq!(
            error,
            PreconditionViolation {
                target: "agent-1".into()
            }
        );
    }

    #[test]
    fn idempotent() {
        let calculator = RateCalculator::new();
        let delta = delta(
            Duration::from_millis(1_500),
            Counters {
                in_octets: 123_456,
                out_octets: 7_890,
                in_packets: 321,
                out_packets: 123,
                in_errors: 3,
                out_errors: 1,
            },
            Some(LinkCapacity::from_mbps(1)),
        );

        assert_eq!(
            calculator.compute(&delta).unwrap(),
            calculator.compute(&delta).unwrap()
        );
    }

    #[test]
    fn results_are_finite() {
        let delta = delta(
            Duration::from_nanos(1),
            Counters {
                in_octets: u64::MAX,
                out_octets: u64::MAX,
                in_packets: u64::MAX,
                out_packets: u64::MAX,
                in_errors: u64::MAX,
                out_errors: u64::MAX,
            },
            Some(LinkCapacity::from_bps(1)),
        );
        let rate = RateCalculator::new().compute(&delta).unwrap();

        assert!(rate.bandwidth_bps.is_finite());
        assert!(rate.utilization_pct.is_finite());
        assert!(rate.error_rate_pct.is_finite());
    }
}
