use crate::{
    counter::{CounterKind, CounterWidth, CounterWidths, Counters},
    defaults::DEFAULT_COUNTER_WIDTHS,
    delta::{CounterDelta, DeltaQuality, Plausibility},
    sample::{CounterSample, TargetKey},
    time::Timestamp,
};
use log::{debug, trace, warn};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error;

/// the last sample seen for a target
type Slot = Mutex<Option<CounterSample>>;

/// Keeps the previous [`CounterSample`] of every monitored target and
/// turns each new sample into a [`CounterDelta`].
///
/// # Thread Safety
///
/// The sampler is [`Sync`] and is meant to be shared (for example in
/// an [`Arc`]) between the threads polling the targets.
///
/// Every target has its own slot guarded by its own [`Mutex`]:
/// [`observe`](Self::observe) calls for the same target are
/// serialized, calls for different targets only share a read lock on
/// the target map. The write lock on the map is only taken the first
/// time a target is seen and when a target is [removed](Self::remove).
///
/// # Example
///
/// ```
/// use ifrate_core::{CounterSample, CounterSampler, Observation};
///
/// let sampler = CounterSampler::new();
///
/// let first = CounterSample::builder("agent-1")
///     .captured_at("10s".parse()?)
///     .in_octets(1_000)
///     .build()?;
/// let second = CounterSample::builder("agent-1")
///     .captured_at("12s".parse()?)
///     .in_octets(1_500)
///     .build()?;
///
/// assert!(matches!(sampler.observe(first)?, Observation::NoPriorSample));
///
/// let Observation::Delta(delta) = sampler.observe(second)? else {
///     unreachable!()
/// };
/// assert_eq!(delta.in_octets(), 500);
/// assert_eq!(delta.elapsed().as_secs(), 2);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct CounterSampler {
    widths: CounterWidths,
    plausibility: Plausibility,

    slots: RwLock<HashMap<TargetKey, Arc<Slot>>>,
}

/// Builder for a [`CounterSampler`].
///
/// ## Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | Counter widths | 32-bit for every counter |
/// | Plausibility | 10 tbps, 10 times the link capacity, 15 billion packets per second |
#[derive(Debug, Clone)]
pub struct CounterSamplerBuilder {
    widths: CounterWidths,
    plausibility: Plausibility,
}

/// Outcome of a successful [`CounterSampler::observe`].
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// First sample for this target: it has been stored and there is
    /// nothing to compare it against yet.
    NoPriorSample,
    Delta(CounterDelta),
}

/// Error returned by [`CounterSampler::observe`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplerError {
    /// The new sample is not strictly more recent than the previous one.
    ///
    /// The new sample has still replaced the previous one: the next
    /// observation computes its delta from it.
    #[error("Sample for {target} at {current} is not after the previous sample at {previous}")]
    NonPositiveInterval {
        target: TargetKey,
        previous: Timestamp,
        current: Timestamp,
    },
    /// A counter value does not fit in the configured counter width.
    ///
    /// The sample has not been stored.
    #[error("Sample for {target}: {counter} ({value}) does not fit a {width} counter")]
    CounterOutOfRange {
        target: TargetKey,
        counter: CounterKind,
        value: u64,
        width: CounterWidth,
    },
}

impl CounterSampler {
    /// create a sampler with the default settings
    ///
    /// See [`CounterSamplerBuilder`] for the defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CounterSamplerBuilder {
        CounterSamplerBuilder {
            widths: DEFAULT_COUNTER_WIDTHS,
            plausibility: Plausibility::default(),
        }
    }

    #[inline]
    pub fn counter_widths(&self) -> CounterWidths {
        self.widths
    }

    #[inline]
    pub fn plausibility(&self) -> Plausibility {
        self.plausibility
    }

    /// Record `sample` as the latest sample of its target and return
    /// the increase of every counter since the previous sample.
    ///
    /// * On the first sample of a target: [`Observation::NoPriorSample`];
    /// * If the sample is not strictly more recent than the previous
    ///   one: [`SamplerError::NonPositiveInterval`];
    /// * Otherwise [`Observation::Delta`], possibly flagged as
    ///   [`DeltaQuality::Suspect`].
    ///
    /// Apart from [`SamplerError::CounterOutOfRange`] the sample always
    /// replaces the stored one, whatever the outcome.
    ///
    /// A counter lower than its previous value is corrected assuming
    /// exactly one wraparound happened between the two samples. Poll
    /// often enough that a counter cannot wrap twice: a 32-bit octet
    /// counter on a saturated 1 gbps link wraps every 34 seconds.
    pub fn observe(&self, sample: CounterSample) -> Result<Observation, SamplerError> {
        self.check_widths(&sample)?;

        let slot = self.slot(sample.target_key());
        let mut stored = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let outcome = match stored.as_ref() {
            None => {
                debug!("First sample for {}", sample.target_key());
                Ok(Observation::NoPriorSample)
            }
            Some(previous) => self.delta(previous, &sample).map(Observation::Delta),
        };

        *stored = Some(sample);

        outcome
    }

    /// stop tracking a target, returning its last sample
    pub fn remove(&self, target: &str) -> Option<CounterSample> {
        let slot = self.write_slots().remove(target)?;
        let sample = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        sample
    }

    /// the last sample recorded for `target`
    pub fn last_sample(&self, target: &str) -> Option<CounterSample> {
        let slot = self.read_slots().get(target).map(Arc::clone)?;
        let sample = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        sample
    }

    pub fn contains(&self, target: &str) -> bool {
        self.read_slots().contains_key(target)
    }

    pub fn targets(&self) -> Vec<TargetKey> {
        let mut targets: Vec<_> = self.read_slots().keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_slots().is_empty()
    }

    fn check_widths(&self, sample: &CounterSample) -> Result<(), SamplerError> {
        for (counter, value) in sample.counters().iter() {
            let width = self.widths.get(counter);
            if !width.fits(value) {
                return Err(SamplerError::CounterOutOfRange {
                    target: sample.target_key().clone(),
                    counter,
                    value,
                    width,
                });
            }
        }
        Ok(())
    }

    fn delta(
        &self,
        previous: &CounterSample,
        current: &CounterSample,
    ) -> Result<CounterDelta, SamplerError> {
        let target = current.target_key();

        let Some(elapsed) = current.captured_at().checked_since(previous.captured_at()) else {
            warn!(
                "Non positive interval for {target}: {} then {}",
                previous.captured_at(),
                current.captured_at()
            );
            return Err(SamplerError::NonPositiveInterval {
                target: target.clone(),
                previous: previous.captured_at(),
                current: current.captured_at(),
            });
        };

        let mut counters = Counters::ZERO;
        let mut wrapped = Vec::new();
        for (counter, curr) in current.counters().iter() {
            let prev = previous.counters().get(counter);
            let (delta, wrap) = self.widths.get(counter).delta(prev, curr);
            if wrap {
                wrapped.push(counter);
            }
            counters.set(counter, delta);
        }

        if !wrapped.is_empty() {
            debug!("Counter wraparound for {target}: {wrapped:?}");
        }

        let quality = self
            .plausibility
            .assess(&counters, elapsed, current.link_capacity());
        if let DeltaQuality::Suspect(reason) = quality {
            warn!("Suspect delta for {target}: {reason}");
        }

        trace!("Delta for {target} over {elapsed:?}: {counters:?}");

        Ok(
            CounterDelta::from_parts(target.clone(), elapsed, counters, current.link_capacity())
                .with_quality(quality)
                .with_wrapped(wrapped),
        )
    }

    fn slot(&self, target: &TargetKey) -> Arc<Slot> {
        if let Some(slot) = self.read_slots().get(target) {
            return Arc::clone(slot);
        }

        // another thread may have inserted the slot between the two
        // locks, `entry` keeps whichever came first
        Arc::clone(self.write_slots().entry(target.clone()).or_default())
    }

    fn read_slots(&self) -> RwLockReadGuard<'_, HashMap<TargetKey, Arc<Slot>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> RwLockWriteGuard<'_, HashMap<TargetKey, Arc<Slot>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CounterSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSamplerBuilder {
    /// use the same width for every counter
    pub fn set_counter_width(mut self, width: CounterWidth) -> Self {
        self.widths = CounterWidths::uniform(width);
        self
    }

    pub fn set_counter_widths(mut self, widths: CounterWidths) -> Self {
        self.widths = widths;
        self
    }

    pub fn set_plausibility(mut self, plausibility: Plausibility) -> Self {
        self.plausibility = plausibility;
        self
    }

    pub fn build(self) -> CounterSampler {
        let Self {
            widths,
            plausibility,
        } = self;

        CounterSampler {
            widths,
            plausibility,
            slots: RwLock::new(HashMap::new()),
        }
    }
}
