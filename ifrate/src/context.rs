use crate::{
    monitor::{Monitor, MonitorError, Report},
    source::CounterSource,
    stop::Stop,
};
use anyhow::{Context as _, Result, bail};
use ifrate_core::{TargetKey, Timestamp};
use log::{debug, info, warn};
use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// What a polling thread sends back after each poll that produced
/// something: a [`Report`] or the reason the poll failed.
pub type PollOutcome = Result<Report, MonitorError>;

/// Polls a set of targets periodically, each from its own thread.
///
/// Every thread shares the same [`Monitor`] (and so the same
/// [`CounterSampler`](ifrate_core::CounterSampler)). All the
/// timestamps are measured from the creation of the context.
///
/// Outcomes wait in a bounded queue until they are received. When the
/// queue is full, new outcomes are dropped (and logged) while polling
/// goes on, so a context nobody reads from holds at most
/// [`DEFAULT_QUEUE_CAPACITY`] outcomes (see [`MonitorContext::with_queue_capacity`]).
///
/// ```no_run
/// use ifrate::{MonitorContext, SimulatedAgent};
/// use std::time::Duration;
///
/// let mut context = MonitorContext::new(Default::default());
/// context.add_target(SimulatedAgent::new("agent-1", 1), Duration::from_secs(5))?;
///
/// while let Some(outcome) = context.recv_timeout(Duration::from_secs(30)) {
///     let report = outcome?;
///     println!("{}: {}", report.result.target_key, report.verdict);
/// }
///
/// context.shutdown()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct MonitorContext {
    monitor: Arc<Monitor>,

    origin: Instant,

    stop: Arc<Stop>,

    outcomes: SyncSender<PollOutcome>,
    receiver: Receiver<PollOutcome>,

    pollers: Vec<(TargetKey, JoinHandle<()>)>,
}

struct Poller<S> {
    source: S,
    interval: Duration,
    origin: Instant,

    monitor: Arc<Monitor>,
    outcomes: SyncSender<PollOutcome>,
    stop: Arc<Stop>,
}

/// outcomes a [`MonitorContext`] keeps before dropping new ones
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

impl MonitorContext {
    pub fn new(monitor: Monitor) -> Self {
        Self::with_queue_capacity(monitor, DEFAULT_QUEUE_CAPACITY)
    }

    /// keep at most `capacity` outcomes waiting to be received
    ///
    /// A capacity of `0` is raised to `1`.
    pub fn with_queue_capacity(monitor: Monitor, capacity: usize) -> Self {
        let (outcomes, receiver) = mpsc::sync_channel(capacity.max(1));

        Self {
            monitor: Arc::new(monitor),
            origin: Instant::now(),
            stop: Arc::new(Stop::new()),
            outcomes,
            receiver,
            pollers: Vec::new(),
        }
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// the targets currently polled, in the order they were added
    pub fn targets(&self) -> impl Iterator<Item = &TargetKey> {
        self.pollers.iter().map(|(key, _)| key)
    }

    /// start polling `source` every `interval`
    ///
    /// The first poll happens immediately. It only primes the sampler,
    /// reports start with the second poll.
    pub fn add_target<S>(&mut self, source: S, interval: Duration) -> Result<()>
    where
        S: CounterSource + 'static,
    {
        let key = source.target_key().clone();

        if interval.is_zero() {
            bail!("Polling interval of {key} must be greater than zero")
        }
        if self.pollers.iter().any(|(k, _)| k == &key) {
            bail!("{key} is already monitored")
        }

        let poller = Poller {
            source,
            interval,
            origin: self.origin,
            monitor: Arc::clone(&self.monitor),
            outcomes: self.outcomes.clone(),
            stop: Arc::clone(&self.stop),
        };

        let thread = thread::Builder::new()
            .name(format!("poll-{key}"))
            .spawn(move || poller_run(poller))
            .with_context(|| format!("Failed to spawn the polling thread of {key}"))?;

        info!("monitoring {key} every {interval:?}");
        self.pollers.push((key, thread));

        Ok(())
    }

    /// wait for the next outcome, up to `timeout`
    ///
    /// returns `None` if nothing was received in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PollOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            // the context keeps a sender alive, the channel
            // cannot be disconnected while it exists
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// next outcome if one is already waiting
    pub fn try_recv(&self) -> Option<PollOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// stop every polling thread and wait for them to finish
    ///
    /// The samples of the targets are removed from the sampler.
    pub fn shutdown(self) -> Result<()> {
        self.stop.toggle();

        let mut result = Ok(());
        for (key, thread) in self.pollers {
            if let Err(join_error) = thread.join() {
                // keep joining the other threads, report the first failure
                if result.is_ok() {
                    result = Err(anyhow::anyhow!("{join_error:?}"))
                        .with_context(|| format!("Polling thread of {key} panicked"));
                }
            }
        }

        result
    }
}

fn poller_run<S>(mut poller: Poller<S>)
where
    S: CounterSource,
{
    let key = poller.source.target_key().clone();
    let mut deadline = Instant::now();

    while !poller.stop.wait_until(deadline) {
        let now = Instant::now();
        let captured_at = Timestamp::between(poller.origin, now);

        let outcome = match poller.monitor.poll(&mut poller.source, captured_at) {
            Ok(None) => None,
            Ok(Some(report)) => Some(Ok(report)),
            Err(error) => {
                warn!("{key}: {error:#}");
                Some(Err(error))
            }
        };

        if let Some(outcome) = outcome {
            match poller.outcomes.try_send(outcome) {
                Ok(()) => (),
                Err(TrySendError::Full(_)) => {
                    debug!("{key}: outcome dropped, the queue is full");
                }
                Err(TrySendError::Disconnected(_)) => {
                    // nobody to report to anymore
                    break;
                }
            }
        }

        deadline += poller.interval;
        if deadline < now {
            // the poll took longer than the interval, skip the missed
            // rounds rather than polling in a burst
            debug!("{key}: poll overran the interval of {:?}", poller.interval);
            deadline = now + poller.interval;
        }
    }

    poller.monitor.sampler().remove(key.as_str());
    debug!("{key}: polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedAgent;
    use ifrate_core::HealthVerdict;

    const INTERVAL: Duration = Duration::from_millis(20);
    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn reports_from_every_target() {
        let mut context = MonitorContext::new(Monitor::default());
        for i in 0..4 {
            let agent = SimulatedAgent::new(format!("agent-{i}"), i);
            context.add_target(agent, INTERVAL).unwrap();
        }
        assert_eq!(context.targets().count(), 4);

        let mut seen = std::collections::HashSet::new();
        while seen.len() < 4 {
            let report = context
                .recv_timeout(TIMEOUT)
                .expect("should receive reports before the timeout")
                .unwrap();

            // the default load never exceeds 60% of the link
            assert_eq!(report.verdict, HealthVerdict::Optimal);
            assert!(!report.result.capacity_is_assumed);
            seen.insert(report.result.target_key.clone());
        }

        let sampler = Arc::clone(context.monitor().sampler());
        assert_eq!(sampler.len(), 4);

        context.shutdown().unwrap();
        assert!(sampler.is_empty());
    }

    #[test]
    fn rejected_targets() {
        let mut context = MonitorContext::new(Monitor::default());

        assert!(
            context
                .add_target(SimulatedAgent::new("agent", 1), Duration::ZERO)
                .is_err()
        );

        context
            .add_target(SimulatedAgent::new("agent", 1), INTERVAL)
            .unwrap();
        assert!(
            context
                .add_target(SimulatedAgent::new("agent", 2), INTERVAL)
                .is_err()
        );

        context.shutdown().unwrap();
    }

    #[test]
    fn undrained_queue_stays_bounded() {
        let mut context = MonitorContext::with_queue_capacity(Monitor::default(), 2);
        context
            .add_target(SimulatedAgent::new("agent", 1), Duration::from_millis(1))
            .unwrap();

        // plenty of polls, none received
        thread::sleep(Duration::from_millis(200));

        let mut waiting = 0;
        while context.try_recv().is_some() {
            waiting += 1;
        }
        assert!((1..=2).contains(&waiting), "{waiting}");

        // polling went on while the queue was full
        assert!(
            context
                .recv_timeout(TIMEOUT)
                .expect("should keep reporting once drained")
                .is_ok()
        );

        context.shutdown().unwrap();
    }

    #[test]
    fn shutdown_without_targets() {
        let context = MonitorContext::new(Monitor::default());
        assert!(context.try_recv().is_none());
        context.shutdown().unwrap();
    }
}
