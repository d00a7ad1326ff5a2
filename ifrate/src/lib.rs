/*!
# Interface rate monitor

Periodic polling on top of [`ifrate_core`]: a [`MonitorContext`] polls
each target from its own thread, runs the samples through a shared
[`Monitor`] (sampler, rate calculator and health classifier) and hands
the [`Report`]s back through a channel.

Counters come from a [`CounterSource`]. [`SimulatedAgent`] is a
seeded simulator of a network agent, handy to exercise the pipeline
without a network.
*/

mod agent;
mod context;
mod monitor;
mod source;
mod stop;

// convenient re-export of `ifrate_core` core objects
pub use ifrate_core::{
    CounterKind, CounterSample, CounterSampler, CounterWidth, Counters, FleetSummary,
    HealthVerdict, LinkCapacity, Observation, Percent, RateCalculator, RateResult,
    SamplerError, TargetKey, Thresholds, Timestamp,
};

pub use self::{
    agent::{AgentConfigError, SimulatedAgent},
    context::{DEFAULT_QUEUE_CAPACITY, MonitorContext, PollOutcome},
    monitor::{Monitor, MonitorError, Report},
    source::CounterSource,
};
