/*!
# Interface counter rates

Delta sampling of network interface counters: two time-separated
readings of the monotonic counters of an interface (octets, packets,
errors) are turned into bandwidth, utilization and error rate, then
classified against configurable thresholds.

```text
CounterSample ─▶ CounterSampler ─▶ CounterDelta ─▶ RateCalculator ─▶ RateResult ─▶ HealthClassifier ─▶ HealthVerdict
```

* [`CounterSampler`] keeps the last sample of each target and
  computes wrap-corrected deltas (32 or 64-bit counters). Deltas that
  imply an impossible rate are flagged [`DeltaQuality::Suspect`].
* [`RateCalculator`] derives the rates, falling back to an assumed
  link capacity when the device reports none.
* [`HealthClassifier`] compares utilization and error rate to the
  [`Thresholds`].

Everything here is synchronous, in memory and CPU only. Collecting
the samples (SNMP, simulator, ...) is left to the caller.

```
use ifrate_core::{
    CounterSample, CounterSampler, HealthClassifier, HealthVerdict, Observation,
    RateCalculator, Thresholds,
};

let sampler = CounterSampler::new();
let calculator = RateCalculator::new();
let thresholds: Thresholds = "utilization=80%, error_rate=1%".parse()?;

let sample = |at: &str, octets: u64, packets: u64, errors: u64| {
    CounterSample::builder("10.0.0.1:1")
        .captured_at(at.parse()?)
        .in_octets(octets)
        .out_octets(octets)
        .in_packets(packets)
        .in_errors(errors)
        .link_capacity("10mbps".parse()?)
        .build()
        .map_err(anyhow::Error::from)
};

assert_eq!(
    sampler.observe(sample("0s", 0, 0, 0)?)?,
    Observation::NoPriorSample,
);

let Observation::Delta(delta) = sampler.observe(sample("2s", 125_000, 1_000, 2)?)? else {
    unreachable!()
};
let rate = calculator.compute(&delta)?;

assert_eq!(rate.bandwidth_bps, 1_000_000.0);
assert_eq!(rate.utilization_pct, 10.0);
assert_eq!(rate.error_rate_pct, 0.2);
assert_eq!(HealthClassifier::classify(&rate, &thresholds), HealthVerdict::Optimal);
# Ok::<(), anyhow::Error>(())
```
*/

mod counter;
pub mod defaults;
mod delta;
pub mod health;
pub mod measure;
mod rate;
mod sample;
mod sampler;
pub mod summary;
mod time;

pub use self::{
    counter::{CounterKind, CounterWidth, CounterWidths, Counters},
    delta::{CounterDelta, DeltaQuality, Plausibility, SuspectReason},
    health::{HealthClassifier, HealthVerdict, ThresholdError, ThresholdParseError, Thresholds},
    measure::{LinkCapacity, Percent},
    rate::{PreconditionViolation, RateCalculator, RateResult},
    sample::{CounterSample, CounterSampleBuilder, InvalidSampleError, TargetKey},
    sampler::{CounterSampler, CounterSamplerBuilder, Observation, SamplerError},
    summary::FleetSummary,
    time::Timestamp,
};
