//! Aggregated view over the latest results of many targets.
//!
//! A [`FleetSummary`] is what a presentation or export layer shows
//! next to the per-target rows: overall traffic, average utilization
//! and how many targets are in alert.

use crate::{health::HealthVerdict, rate::RateResult};

/// Snapshot of the state of a set of monitored targets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FleetSummary {
    /// Number of results aggregated.
    pub targets: usize,
    /// Octets transferred (in and out) over all the results.
    pub total_octets: u128,
    /// Packets transferred (in and out) over all the results.
    pub total_packets: u128,
    /// Errors (in and out) over all the results.
    pub total_errors: u128,
    /// Mean of the utilization of every result, `0` if there is none.
    pub average_utilization_pct: f64,
    /// Highest utilization seen, `0` if there is none.
    pub peak_utilization_pct: f64,
    pub optimal: usize,
    pub alert: usize,
    /// Results computed from a suspect delta. They are counted in
    /// every other field too.
    pub suspect: usize,
}

impl FleetSummary {
    /// aggregate the given classified results
    ///
    /// ```
    /// # use ifrate_core::{FleetSummary, HealthVerdict, RateResult};
    /// let summary = FleetSummary::from_results(std::iter::empty::<(&RateResult, HealthVerdict)>());
    /// assert_eq!(summary, FleetSummary::default());
    /// ```
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = (&'a RateResult, HealthVerdict)>,
    {
        let mut summary = Self::default();
        let mut utilization_sum = 0.0;

        for (result, verdict) in results {
            summary.targets += 1;
            summary.total_octets += result.total_octets;
            summary.total_packets += result.total_packets;
            summary.total_errors += result.total_errors;

            utilization_sum += result.utilization_pct;
            summary.peak_utilization_pct = summary.peak_utilization_pct.max(result.utilization_pct);

            match verdict {
                HealthVerdict::Optimal => summary.optimal += 1,
                HealthVerdict::Alert => summary.alert += 1,
            }
            if result.is_suspect() {
                summary.suspect += 1;
            }
        }

        if summary.targets > 0 {
            summary.average_utilization_pct = utilization_sum / summary.targets as f64;
        }

        summary
    }

    /// total octets expressed in gigabytes (10^9 bytes)
    pub fn total_gigabytes(&self) -> f64 {
        self.total_octets as f64 / 1e9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        delta::{DeltaQuality, SuspectReason},
        measure::LinkCapacity,
    };
    use std::time::Duration;

    fn rate(utilization_pct: f64, octets: u128, quality: DeltaQuality) -> RateResult {
        RateResult {
            target_key: "agent".into(),
            elapsed: Duration::from_secs(1),
            bandwidth_bps: 0.0,
            in_bps: 0.0,
            out_bps: 0.0,
            utilization_pct,
            error_rate_pct: 0.0,
            capacity: LinkCapacity::from_mbps(100),
            capacity_is_assumed: false,
            total_octets: octets,
            total_packets: 10,
            total_errors: 1,
            quality,
        }
    }

    #[test]
    fn aggregate() {
        let suspect = DeltaQuality::Suspect(SuspectReason::PacketRate {
            implied_pps: 1e12,
            ceiling: 1,
        });
        let results = [
            (rate(10.0, 1_000_000_000, DeltaQuality::Valid), HealthVerdict::Optimal),
            (rate(90.0, 2_000_000_000, DeltaQuality::Valid), HealthVerdict::Alert),
            (rate(20.0, 500_000_000, suspect), HealthVerdict::Optimal),
        ];

        let summary = FleetSummary::from_results(results.iter().map(|(r, v)| (r, *v)));

        assert_eq!(summary.targets, 3);
        assert_eq!(summary.total_octets, 3_500_000_000);
        assert_eq!(summary.total_gigabytes(), 3.5);
        assert_eq!(summary.total_packets, 30);
        assert_eq!(summary.total_errors, 3);
        assert_eq!(summary.average_utilization_pct, 40.0);
        assert_eq!(summary.peak_utilization_pct, 90.0);
        assert_eq!(summary.optimal, 2);
        assert_eq!(summary.alert, 1);
        assert_eq!(summary.suspect, 1);
    }
}
