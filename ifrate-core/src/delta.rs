use crate::{
    counter::{CounterKind, Counters},
    defaults::{
        DEFAULT_MAX_BITS_PER_SEC, DEFAULT_MAX_CAPACITY_MULTIPLE, DEFAULT_MAX_PACKETS_PER_SEC,
    },
    measure::LinkCapacity,
    sample::TargetKey,
};
use std::{fmt, time::Duration};

/// The wrap-corrected increase of every counter of a target between
/// two samples.
///
/// Produced by [`CounterSampler::observe`]. The elapsed time of a
/// delta coming out of the sampler is always strictly positive.
///
/// [`CounterSampler::observe`]: crate::CounterSampler::observe
#[derive(Debug, Clone, PartialEq)]
pub struct CounterDelta {
    target_key: TargetKey,
    elapsed: Duration,
    counters: Counters,
    link_capacity: Option<LinkCapacity>,
    quality: DeltaQuality,
    wrapped: Vec<CounterKind>,
}

/// Quality flag of a [`CounterDelta`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum DeltaQuality {
    #[default]
    Valid,
    /// The delta implies a rate no physical link can sustain.
    ///
    /// The delta is still returned: the caller decides whether to
    /// display it, discard it or poll again.
    Suspect(SuspectReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuspectReason {
    BitRate {
        implied_bps: f64,
        ceiling: LinkCapacity,
    },
    /// the implied bit rate is more than `multiple` times the capacity
    /// reported by the device
    Capacity {
        implied_bps: f64,
        capacity: LinkCapacity,
        multiple: u32,
    },
    PacketRate {
        implied_pps: f64,
        ceiling: u64,
    },
}

/// Ceilings above which a delta is marked [`DeltaQuality::Suspect`].
///
/// The single-wrap correction cannot tell a wraparound from a counter
/// reset (device reboot, interface re-creation). A reset followed by
/// a small reading looks like a wrap of almost the whole counter
/// range, which implies an absurd rate over a short interval.
///
/// The absolute ceilings catch resets of 64-bit counters. A 32-bit
/// counter cannot move by more than 2^32 between two polls, which
/// stays below any absolute ceiling past a few milliseconds: its
/// resets are caught by comparing the implied rate with the capacity
/// the device reports for the link.
///
/// A `None` ceiling disables the corresponding check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Plausibility {
    pub max_bits_per_sec: Option<LinkCapacity>,
    /// ceiling as a multiple of the reported link capacity, only
    /// checked when the capacity is known
    pub max_capacity_multiple: Option<u32>,
    pub max_packets_per_sec: Option<u64>,
}

impl CounterDelta {
    /// build a delta from already computed parts
    ///
    /// This is for callers that compute deltas themselves (replaying
    /// recorded data, agents reporting deltas directly). The delta is
    /// [`DeltaQuality::Valid`] and nothing is checked: a zero `elapsed`
    /// will be refused by [`RateCalculator::compute`].
    ///
    /// [`RateCalculator::compute`]: crate::RateCalculator::compute
    pub fn from_parts(
        target_key: TargetKey,
        elapsed: Duration,
        counters: Counters,
        link_capacity: Option<LinkCapacity>,
    ) -> Self {
        Self {
            target_key,
            elapsed,
            counters,
            link_capacity: link_capacity.and_then(LinkCapacity::known),
            quality: DeltaQuality::Valid,
            wrapped: Vec::new(),
        }
    }

    pub(crate) fn with_quality(mut self, quality: DeltaQuality) -> Self {
        self.quality = quality;
        self
    }

    pub(crate) fn with_wrapped(mut self, wrapped: Vec<CounterKind>) -> Self {
        self.wrapped = wrapped;
        self
    }

    #[inline]
    pub fn target_key(&self) -> &TargetKey {
        &self.target_key
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn in_octets(&self) -> u64 {
        self.counters.in_octets
    }

    pub fn out_octets(&self) -> u64 {
        self.counters.out_octets
    }

    pub fn in_packets(&self) -> u64 {
        self.counters.in_packets
    }

    pub fn out_packets(&self) -> u64 {
        self.counters.out_packets
    }

    pub fn in_errors(&self) -> u64 {
        self.counters.in_errors
    }

    pub fn out_errors(&self) -> u64 {
        self.counters.out_errors
    }

    /// the link capacity reported by the newer of the two samples
    #[inline]
    pub fn link_capacity(&self) -> Option<LinkCapacity> {
        self.link_capacity
    }

    #[inline]
    pub fn quality(&self) -> DeltaQuality {
        self.quality
    }

    #[inline]
    pub fn is_suspect(&self) -> bool {
        matches!(self.quality, DeltaQuality::Suspect(_))
    }

    /// the counters for which a wraparound correction was applied
    #[inline]
    pub fn wrapped(&self) -> &[CounterKind] {
        &self.wrapped
    }
}

impl Plausibility {
    /// never mark anything as suspect
    pub const UNLIMITED: Self = Self {
        max_bits_per_sec: None,
        max_capacity_multiple: None,
        max_packets_per_sec: None,
    };

    /// check the rates implied by `counters` over `elapsed`
    ///
    /// `capacity` is the link capacity reported along the delta, if any.
    pub fn assess(
        &self,
        counters: &Counters,
        elapsed: Duration,
        capacity: Option<LinkCapacity>,
    ) -> DeltaQuality {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return DeltaQuality::Valid;
        }

        let implied_bps = (counters.total_octets() as f64 * 8.0) / secs;

        if let Some(ceiling) = self.max_bits_per_sec
            && implied_bps > ceiling.bits_per_sec() as f64
        {
            return DeltaQuality::Suspect(SuspectReason::BitRate {
                implied_bps,
                ceiling,
            });
        }

        if let (Some(multiple), Some(capacity)) =
            (self.max_capacity_multiple, capacity.and_then(LinkCapacity::known))
            && implied_bps > capacity.bits_per_sec() as f64 * f64::from(multiple)
        {
            return DeltaQuality::Suspect(SuspectReason::Capacity {
                implied_bps,
                capacity,
                multiple,
            });
        }

        if let Some(ceiling) = self.max_packets_per_sec {
            let implied_pps = counters.total_packets() as f64 / secs;
            if implied_pps > ceiling as f64 {
                return DeltaQuality::Suspect(SuspectReason::PacketRate {
                    implied_pps,
                    ceiling,
                });
            }
        }

        DeltaQuality::Valid
    }
}

impl Default for Plausibility {
    fn default() -> Self {
        Self {
            max_bits_per_sec: Some(DEFAULT_MAX_BITS_PER_SEC),
            max_capacity_multiple: Some(DEFAULT_MAX_CAPACITY_MULTIPLE),
            max_packets_per_sec: Some(DEFAULT_MAX_PACKETS_PER_SEC),
        }
    }
}

impl fmt::Display for SuspectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitRate {
                implied_bps,
                ceiling,
            } => write!(f, "implied rate of {implied_bps:.0}bps above {ceiling}"),
            Self::Capacity {
                implied_bps,
                capacity,
                multiple,
            } => write!(
                f,
                "implied rate of {implied_bps:.0}bps above {multiple} times the {capacity} link"
            ),
            Self::PacketRate {
                implied_pps,
                ceiling,
            } => write!(f, "implied rate of {implied_pps:.0}pps above {ceiling}pps"),
        }
    }
}
