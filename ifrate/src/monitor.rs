use crate::source::CounterSource;
use ifrate_core::{
    CounterKind, CounterSample, CounterSampler, HealthClassifier, HealthVerdict, Observation,
    PreconditionViolation, RateCalculator, RateResult, SamplerError, TargetKey, Thresholds,
    Timestamp,
};
use log::{debug, info, warn};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Outcome of a poll that produced a measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub result: RateResult,
    pub verdict: HealthVerdict,
    /// counters that wrapped around between the two samples
    pub wrapped: Vec<CounterKind>,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to poll {target}")]
    Source {
        target: TargetKey,
        #[source]
        error: anyhow::Error,
    },
    #[error(transparent)]
    Sampler(#[from] SamplerError),
    #[error(transparent)]
    Rate(#[from] PreconditionViolation),
}

/// Glue of the sampling pipeline.
///
/// The [`Monitor`] feeds the samples to a shared [`CounterSampler`],
/// computes the rates of the resulting deltas and classifies them
/// against the current [`Thresholds`].
///
/// It is [`Sync`]: one monitor serves every polling thread of a
/// [`MonitorContext`](crate::MonitorContext).
#[derive(Debug)]
pub struct Monitor {
    sampler: Arc<CounterSampler>,
    calculator: RateCalculator,
    thresholds: RwLock<Thresholds>,
}

impl Monitor {
    pub fn new(sampler: CounterSampler, calculator: RateCalculator, thresholds: Thresholds) -> Self {
        Self {
            sampler: Arc::new(sampler),
            calculator,
            thresholds: RwLock::new(thresholds),
        }
    }

    pub fn sampler(&self) -> &Arc<CounterSampler> {
        &self.sampler
    }

    pub fn calculator(&self) -> &RateCalculator {
        &self.calculator
    }

    pub fn thresholds(&self) -> Thresholds {
        *self
            .thresholds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// replace the thresholds
    ///
    /// Only measurements classified after this call use the new values.
    pub fn set_thresholds(&self, thresholds: Thresholds) {
        info!("thresholds set to {thresholds}");
        *self
            .thresholds
            .write()
            .unwrap_or_else(PoisonError::into_inner) = thresholds;
    }

    /// poll the `source` and process its sample
    ///
    /// A failed poll leaves the sampler untouched: the next successful
    /// poll is compared to the last sample that made it through.
    pub fn poll<S>(
        &self,
        source: &mut S,
        captured_at: Timestamp,
    ) -> Result<Option<Report>, MonitorError>
    where
        S: CounterSource + ?Sized,
    {
        let sample = source
            .poll(captured_at)
            .map_err(|error| MonitorError::Source {
                target: source.target_key().clone(),
                error,
            })?;
        self.ingest(sample)
    }

    /// process a sample collected by the caller
    ///
    /// returns `None` for the first sample of a target, there is
    /// nothing to compare it with yet.
    pub fn ingest(&self, sample: CounterSample) -> Result<Option<Report>, MonitorError> {
        let delta = match self.sampler.observe(sample)? {
            Observation::NoPriorSample => return Ok(None),
            Observation::Delta(delta) => delta,
        };

        let result = self.calculator.compute(&delta)?;
        let verdict = HealthClassifier::classify(&result, &self.thresholds());

        if verdict.is_alert() {
            warn!(
                "{}: {verdict} (utilization {:.2}%, error rate {:.2}%)",
                result.target_key, result.utilization_pct, result.error_rate_pct
            );
        } else {
            debug!(
                "{}: {verdict} (utilization {:.2}%, error rate {:.2}%)",
                result.target_key, result.utilization_pct, result.error_rate_pct
            );
        }

        Ok(Some(Report {
            result,
            verdict,
            wrapped: delta.wrapped().to_vec(),
        }))
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(
            CounterSampler::new(),
            RateCalculator::new(),
            Thresholds::default(),
        )
    }
}
