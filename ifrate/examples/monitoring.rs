//! Monitoring example: poll a fleet of simulated agents and print
//! their bandwidth, utilization and health.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example monitoring -p ifrate -- --agents 8

use anyhow::{Context as _, Result};
use clap::Parser;
use ifrate::{
    CounterSampler, Counters, FleetSummary, LinkCapacity, Monitor, MonitorContext, Percent,
    RateCalculator, Report, SimulatedAgent, Thresholds,
};
use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

#[derive(Parser)]
struct Command {
    /// number of simulated agents
    #[arg(long, default_value = "4")]
    agents: u64,

    /// polling interval, in milliseconds
    #[arg(long, default_value = "1000")]
    every: u64,

    /// how long to monitor for, in seconds
    #[arg(long, default_value = "10")]
    time: u64,

    #[arg(long, default_value = "utilization=80%, error_rate=1%")]
    thresholds: Thresholds,

    /// capacity of the simulated links
    #[arg(long, default_value = "100mbps")]
    capacity: LinkCapacity,

    /// upper bound of the simulated load, in percent of the capacity
    #[arg(long, default_value = "90%")]
    max_load: Percent,

    /// start the counters close to 2^32 to exercise wraparounds
    #[arg(long)]
    wrap: bool,

    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let cmd = Command::parse();

    let monitor = Monitor::new(
        CounterSampler::new(),
        RateCalculator::new(),
        cmd.thresholds,
    );
    let mut context = MonitorContext::new(monitor);

    for i in 0..cmd.agents {
        let mut agent = SimulatedAgent::new(format!("agent-{i}"), cmd.seed + i)
            .set_link_capacity(cmd.capacity)
            .set_load(Percent::ZERO, cmd.max_load)?
            // every other agent behaves like a virtual interface
            .set_reports_capacity(i % 2 == 0);
        if cmd.wrap {
            let near_wrap = (u32::MAX as u64).saturating_sub((i + 1) * 1_000_000);
            agent = agent.set_initial_counters(Counters {
                in_octets: near_wrap,
                out_octets: near_wrap,
                ..Counters::ZERO
            });
        }

        context.add_target(agent, Duration::from_millis(cmd.every))?;
    }

    let deadline = Instant::now() + Duration::from_secs(cmd.time);
    let mut latest: BTreeMap<_, Report> = BTreeMap::new();

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let Some(outcome) = context.recv_timeout(remaining) else {
            break;
        };

        match outcome {
            Ok(report) => {
                print(&report);
                latest.insert(report.result.target_key.clone(), report);
            }
            Err(error) => eprintln!("{:#}", anyhow::Error::from(error)),
        }
    }

    context.shutdown().context("Failed to stop the monitoring")?;

    let summary = FleetSummary::from_results(latest.values().map(|r| (&r.result, r.verdict)));
    println!();
    println!("=== Fleet ===");
    println!(
        "  {} targets | {} optimal | {} alert | {} suspect",
        summary.targets, summary.optimal, summary.alert, summary.suspect
    );
    println!(
        "  utilization avg {:.2}% peak {:.2}% | last interval {:.3} GB",
        summary.average_utilization_pct,
        summary.peak_utilization_pct,
        summary.total_gigabytes()
    );

    Ok(())
}

fn print(report: &Report) {
    let result = &report.result;
    let assumed = if result.capacity_is_assumed {
        " (assumed)"
    } else {
        ""
    };

    println!(
        "{:>10} | {:>12.0} bps | {:>6.2}% of {}{assumed} | errors {:.3}% | {}{}",
        result.target_key.as_str(),
        result.bandwidth_bps,
        result.utilization_pct,
        result.capacity,
        result.error_rate_pct,
        report.verdict,
        if result.is_suspect() { " [suspect]" } else { "" },
    );
    for counter in &report.wrapped {
        println!("{:>10} | {counter} wrapped", "");
    }
}
