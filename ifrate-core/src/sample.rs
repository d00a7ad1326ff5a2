use crate::{
    counter::{CounterKind, Counters},
    measure::LinkCapacity,
    time::Timestamp,
};
use std::{borrow::Borrow, fmt, sync::Arc};
use thiserror::Error;

/// Identifier of a monitored entity.
///
/// The key is opaque to this crate: `"agent-3"`, `"10.0.0.1:2"`
/// (address and interface index) or anything the producer of
/// samples uses to tell its targets apart. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetKey(Arc<str>);

impl TargetKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TargetKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TargetKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Error returned when a [`CounterSample`] cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidSampleError {
    #[error("Sample for {target} has no capture time")]
    MissingTimestamp { target: TargetKey },
    #[error("Invalid capture time: {secs} seconds")]
    InvalidTimestamp { secs: f64 },
    #[error("Sample for {target} has a negative {counter} counter ({value})")]
    NegativeCounter {
        target: TargetKey,
        counter: CounterKind,
        value: i64,
    },
}

/// An immutable snapshot of the counters of one target.
///
/// Built with [`CounterSample::builder`]:
///
/// ```
/// use ifrate_core::{CounterSample, Timestamp};
///
/// let sample = CounterSample::builder("agent-1")
///     .captured_at("10s".parse().unwrap())
///     .in_octets(125_000)
///     .out_octets(125_000)
///     .link_capacity("100mbps".parse().unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(sample.target_key().as_str(), "agent-1");
/// assert_eq!(sample.counters().in_octets, 125_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    target_key: TargetKey,
    captured_at: Timestamp,
    counters: Counters,
    link_capacity: Option<LinkCapacity>,
}

/// Builder for a [`CounterSample`].
///
/// Counters default to `0` and the link capacity to unknown. The
/// capture time is mandatory.
#[derive(Debug, Clone)]
pub struct CounterSampleBuilder {
    target_key: TargetKey,
    captured_at: Option<Timestamp>,
    counters: Counters,
    link_capacity: Option<LinkCapacity>,
    error: Option<InvalidSampleError>,
}

impl CounterSample {
    pub fn builder(target_key: impl Into<TargetKey>) -> CounterSampleBuilder {
        CounterSampleBuilder {
            target_key: target_key.into(),
            captured_at: None,
            counters: Counters::ZERO,
            link_capacity: None,
            error: None,
        }
    }

    #[inline]
    pub fn target_key(&self) -> &TargetKey {
        &self.target_key
    }

    #[inline]
    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    #[inline]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// the nominal capacity of the link, `None` if unknown
    #[inline]
    pub fn link_capacity(&self) -> Option<LinkCapacity> {
        self.link_capacity
    }
}

impl CounterSampleBuilder {
    pub fn captured_at(mut self, captured_at: Timestamp) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    /// set the capture time from a number of seconds since the
    /// producer's origin
    pub fn captured_at_secs(mut self, secs: f64) -> Self {
        match Timestamp::from_secs_f64(secs) {
            Ok(timestamp) => self.captured_at = Some(timestamp),
            Err(error) => self.record(error),
        }
        self
    }

    pub fn counter(mut self, kind: CounterKind, value: u64) -> Self {
        self.counters.set(kind, value);
        self
    }

    /// set a counter from a signed value as decoded from the wire
    ///
    /// A negative value makes [`build`](Self::build) fail.
    pub fn counter_raw(mut self, kind: CounterKind, value: i64) -> Self {
        match u64::try_from(value) {
            Ok(value) => self.counters.set(kind, value),
            Err(_) => {
                let error = InvalidSampleError::NegativeCounter {
                    target: self.target_key.clone(),
                    counter: kind,
                    value,
                };
                self.record(error);
            }
        }
        self
    }

    pub fn counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }

    pub fn in_octets(self, value: u64) -> Self {
        self.counter(CounterKind::InOctets, value)
    }

    pub fn out_octets(self, value: u64) -> Self {
        self.counter(CounterKind::OutOctets, value)
    }

    pub fn in_packets(self, value: u64) -> Self {
        self.counter(CounterKind::InPackets, value)
    }

    pub fn out_packets(self, value: u64) -> Self {
        self.counter(CounterKind::OutPackets, value)
    }

    pub fn in_errors(self, value: u64) -> Self {
        self.counter(CounterKind::InErrors, value)
    }

    pub fn out_errors(self, value: u64) -> Self {
        self.counter(CounterKind::OutErrors, value)
    }

    /// set the nominal link capacity; [`LinkCapacity::UNKNOWN`] clears it
    pub fn link_capacity(mut self, capacity: LinkCapacity) -> Self {
        self.link_capacity = capacity.known();
        self
    }

    // only the first error is kept, it is the one the caller
    // needs to fix first
    fn record(&mut self, error: InvalidSampleError) {
        self.error.get_or_insert(error);
    }

    pub fn build(self) -> Result<CounterSample, InvalidSampleError> {
        let Self {
            target_key,
            captured_at,
            counters,
            link_capacity,
            error,
        } = self;

        if let Some(error) = error {
            return Err(error);
        }
        let Some(captured_at) = captured_at else {
            return Err(InvalidSampleError::MissingTimestamp { target: target_key });
        };

        Ok(CounterSample {
            target_key,
            captured_at,
            counters,
            link_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn build_sample() {
        let sample = CounterSample::builder("agent-3")
            .captured_at(Timestamp::from_duration(Duration::from_secs(1)))
            .in_octets(1)
            .out_octets(2)
            .in_packets(3)
            .out_packets(4)
            .in_errors(5)
            .out_errors(6)
            .build()
            .unwrap();

        assert_eq!(sample.target_key(), &TargetKey::new("agent-3"));
        assert_eq!(sample.captured_at().into_duration(), Duration::from_secs(1));
        assert_eq!(
            sample.counters(),
            &Counters {
                in_octets: 1,
                out_octets: 2,
                in_packets: 3,
                out_packets: 4,
                in_errors: 5,
                out_errors: 6,
            }
        );
        assert_eq!(sample.link_capacity(), None);
    }

    #[test]
    fn missing_timestamp() {
        let error = CounterSample::builder("agent-3").build().unwrap_err();
        assert_eq!(
            error,
            InvalidSampleError::MissingTimestamp {
                target: "agent-3".into()
            }
        );
    }

    #[test]
    fn invalid_timestamp() {
        let error = CounterSample::builder("agent-3")
            .captured_at_secs(-2.0)
            .build()
            .unwrap_err();
        assert!(matches!(error, InvalidSampleError::InvalidTimestamp { .. }));

        let error = CounterSample::builder("agent-3")
            .captured_at_secs(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(error, InvalidSampleError::InvalidTimestamp { .. }));
    }

    #[test]
    fn negative_counter() {
        let error = CounterSample::builder("agent-3")
            .captured_at_secs(1.0)
            .counter_raw(CounterKind::InErrors, -1)
            .build()
            .unwrap_err();

        assert_eq!(
            error,
            InvalidSampleError::NegativeCounter {
                target: "agent-3".into(),
                counter: CounterKind::InErrors,
                value: -1,
            }
        );
        assert_eq!(
            error.to_string(),
            "Sample for agent-3 has a negative in_errors counter (-1)"
        );
    }

    #[test]
    fn raw_positive_counter() {
        let sample = CounterSample::builder("agent-3")
            .captured_at_secs(1.0)
            .counter_raw(CounterKind::OutPackets, 42)
            .build()
            .unwrap();
        assert_eq!(sample.counters().out_packets, 42);
    }

    #[test]
    fn zero_capacity_is_unknown() {
        let sample = CounterSample::builder("agent-3")
            .captured_at_secs(1.0)
            .link_capacity(LinkCapacity::from_bps(0))
            .build()
            .unwrap();
        assert_eq!(sample.link_capacity(), None);

        let sample = CounterSample::builder("agent-3")
            .captured_at_secs(1.0)
            .link_capacity(LinkCapacity::from_mbps(10))
            .build()
            .unwrap();
        assert_eq!(sample.link_capacity(), Some(LinkCapacity::from_mbps(10)));
    }
}
