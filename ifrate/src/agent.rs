use crate::source::CounterSource;
use anyhow::{Context as _, Result};
use ifrate_core::{
    CounterKind, CounterSample, CounterWidth, Counters, LinkCapacity, Percent, TargetKey,
    Timestamp,
};
use log::trace;
use rand_chacha::ChaChaRng;
use rand_core::{Rng, SeedableRng as _};
use thiserror::Error;

/// A simulated network agent.
///
/// The agent generates a random but plausible amount of traffic
/// between two polls: a load drawn uniformly within a configured
/// range of the link capacity, split between in and out, turned into
/// packets of a fixed average size with a fixed ratio of errors.
///
/// All the randomness comes from a seeded [`ChaChaRng`], so an agent
/// built with the same seed and polled at the same times always
/// reports the same counters.
///
/// # Example
///
/// ```
/// use ifrate::{CounterSource as _, SimulatedAgent};
///
/// let mut agent = SimulatedAgent::new("agent-1", 42)
///     .set_link_capacity("100mbps".parse().unwrap());
///
/// let first = agent.poll("0s".parse().unwrap()).unwrap();
/// let second = agent.poll("1s".parse().unwrap()).unwrap();
///
/// assert!(second.counters().in_octets > first.counters().in_octets);
/// ```
pub struct SimulatedAgent {
    target_key: TargetKey,
    rng: ChaChaRng,

    counters: Counters,
    counter_width: CounterWidth,

    link_capacity: LinkCapacity,
    reports_capacity: bool,

    min_load: f64,
    max_load: f64,
    error_ratio: f64,
    packet_size: u64,

    last_poll: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AgentConfigError {
    #[error("Minimum load ({min}) is above the maximum load ({max})")]
    InvertedLoad { min: Percent, max: Percent },
    #[error("Error ratio ({0}) must be within [0%, 100%]")]
    ErrorRatio(Percent),
    #[error("Packet size must be at least one byte")]
    EmptyPackets,
}

const DEFAULT_MIN_LOAD: f64 = 0.05;
const DEFAULT_MAX_LOAD: f64 = 0.60;
const DEFAULT_ERROR_RATIO: f64 = 0.001;
const DEFAULT_PACKET_SIZE: u64 = 512;

impl SimulatedAgent {
    pub fn new(target_key: impl Into<TargetKey>, seed: u64) -> Self {
        Self {
            target_key: target_key.into(),
            rng: ChaChaRng::seed_from_u64(seed),
            counters: Counters::ZERO,
            counter_width: CounterWidth::default(),
            link_capacity: LinkCapacity::from_mbps(100),
            reports_capacity: true,
            min_load: DEFAULT_MIN_LOAD,
            max_load: DEFAULT_MAX_LOAD,
            error_ratio: DEFAULT_ERROR_RATIO,
            packet_size: DEFAULT_PACKET_SIZE,
            last_poll: None,
        }
    }

    /// capacity of the simulated link, traffic is generated relative to it
    pub fn set_link_capacity(mut self, capacity: LinkCapacity) -> Self {
        self.link_capacity = capacity;
        self
    }

    /// whether the samples carry the link capacity
    ///
    /// Virtual interfaces commonly report a speed of `0`; setting this
    /// to `false` simulates them.
    pub fn set_reports_capacity(mut self, reports_capacity: bool) -> Self {
        self.reports_capacity = reports_capacity;
        self
    }

    pub fn set_counter_width(mut self, width: CounterWidth) -> Self {
        self.counter_width = width;
        self
    }

    /// start from the given counter values instead of zero
    ///
    /// Values are reduced to the counter width. Starting close to the
    /// maximum of the width is a quick way of exercising wraparounds.
    pub fn set_initial_counters(mut self, counters: Counters) -> Self {
        let modulus = self.counter_width.modulus();
        for (kind, value) in counters.iter() {
            self.counters.set(kind, (value as u128 % modulus) as u64);
        }
        self
    }

    /// range of the link capacity used between two polls
    ///
    /// Loads above `100%` are allowed, they simulate bursts above the
    /// nominal capacity.
    pub fn set_load(mut self, min: Percent, max: Percent) -> Result<Self, AgentConfigError> {
        if min > max {
            return Err(AgentConfigError::InvertedLoad { min, max });
        }
        self.min_load = min.value() / 100.0;
        self.max_load = max.value() / 100.0;
        Ok(self)
    }

    /// share of the packets reported as errored
    pub fn set_error_ratio(mut self, ratio: Percent) -> Result<Self, AgentConfigError> {
        if ratio > Percent::HUNDRED {
            return Err(AgentConfigError::ErrorRatio(ratio));
        }
        self.error_ratio = ratio.value() / 100.0;
        Ok(self)
    }

    /// average packet size, in bytes
    pub fn set_packet_size(mut self, packet_size: u64) -> Result<Self, AgentConfigError> {
        if packet_size == 0 {
            return Err(AgentConfigError::EmptyPackets);
        }
        self.packet_size = packet_size;
        Ok(self)
    }

    /// the current (absolute) counters of the agent
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// uniform sample in `[0, 1)`
    fn uniform(&mut self) -> f64 {
        let bits = self.rng.next_u64();
        (bits as f64) * (1.0 / (u64::MAX as f64 + 1.0))
    }

    fn traffic(&mut self, elapsed_secs: f64) -> Counters {
        let load = self.min_load + self.uniform() * (self.max_load - self.min_load);
        let bits = self.link_capacity.bits_per_sec() as f64 * load * elapsed_secs;
        let octets = (bits / 8.0) as u64;

        let in_share = 0.3 + 0.4 * self.uniform();
        let in_octets = (octets as f64 * in_share) as u64;
        let out_octets = octets - in_octets;

        let in_packets = in_octets.div_ceil(self.packet_size);
        let out_packets = out_octets.div_ceil(self.packet_size);

        Counters {
            in_octets,
            out_octets,
            in_packets,
            out_packets,
            in_errors: (in_packets as f64 * self.error_ratio).round() as u64,
            out_errors: (out_packets as f64 * self.error_ratio).round() as u64,
        }
    }

    fn advance(&mut self, traffic: &Counters) {
        let modulus = self.counter_width.modulus();
        for kind in CounterKind::ALL {
            let next = (self.counters.get(kind) as u128 + traffic.get(kind) as u128) % modulus;
            self.counters.set(kind, next as u64);
        }
    }
}

impl CounterSource for SimulatedAgent {
    fn target_key(&self) -> &TargetKey {
        &self.target_key
    }

    fn poll(&mut self, captured_at: Timestamp) -> Result<CounterSample> {
        // no traffic is generated on the first poll, nor when the
        // clock did not move forward
        let elapsed = self
            .last_poll
            .and_then(|last| captured_at.checked_since(last));
        if let Some(elapsed) = elapsed {
            let traffic = self.traffic(elapsed.as_secs_f64());
            trace!("{}: generated {traffic:?} over {elapsed:?}", self.target_key);
            self.advance(&traffic);
        }
        self.last_poll = Some(captured_at);

        let capacity = if self.reports_capacity {
            self.link_capacity
        } else {
            LinkCapacity::UNKNOWN
        };

        CounterSample::builder(self.target_key.clone())
            .captured_at(captured_at)
            .counters(self.counters)
            .link_capacity(capacity)
            .build()
            .with_context(|| format!("Failed to build sample for {}", self.target_key))
    }
}
