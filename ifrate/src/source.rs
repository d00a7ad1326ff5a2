use anyhow::Result;
use ifrate_core::{CounterSample, TargetKey, Timestamp};

/// Producer of [`CounterSample`]s for one target.
///
/// This is the seam with whatever actually reads the counters: an
/// SNMP client querying `ifInOctets`/`ifHCInOctets`..., a simulator,
/// or recorded data being replayed.
///
/// The source does not need to be [`Sync`]: each source is polled
/// from a single thread at a time.
pub trait CounterSource: Send {
    /// the key the produced samples are tagged with
    fn target_key(&self) -> &TargetKey;

    /// read the counters of the target, stamping them with `captured_at`
    ///
    /// Network errors and timeouts belong here: the sampler never
    /// retries, a failed poll is simply reported and the next poll
    /// starts over.
    fn poll(&mut self, captured_at: Timestamp) -> Result<CounterSample>;
}

impl<S> CounterSource for Box<S>
where
    S: CounterSource + ?Sized,
{
    fn target_key(&self) -> &TargetKey {
        (**self).target_key()
    }

    fn poll(&mut self, captured_at: Timestamp) -> Result<CounterSample> {
        (**self).poll(captured_at)
    }
}
