use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use slog::debug;

use cloudsearch_bench::StdResult;

use crate::CommandContext;

const CURRENT_THROUGHPUT_MARKER: &str = "current ops/sec";
const FAILURE_MARKER: &str = "failed";
const READ_LATENCY_MARKER: &str = "READ AverageLatency(us)=";

/// Value printed for each time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportMetric {
    /// Average read latency, in milliseconds
    #[value(name = "avglatency")]
    AverageLatency,
    /// Current throughput, in operations per second
    #[value(name = "throughput")]
    Throughput,
}

/// Periodic status line of a benchmark run, ie:
/// `10 sec: 1234 operations; 123.4 current ops/sec; [READ AverageLatency(us)=567.8]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSample {
    /// Elapsed seconds since the start of the run
    pub time: u64,
    /// Operations per second over the last period
    pub throughput: f64,
    /// Average read latency in milliseconds, if reads were issued over the last period
    pub read_latency_ms: Option<f64>,
}

impl StatusSample {
    /// Parse a status line, `None` if the line is not a valid status line
    pub fn parse(line: &str) -> Option<Self> {
        if line.contains(FAILURE_MARKER) || !line.contains(CURRENT_THROUGHPUT_MARKER) {
            return None;
        }

        let (elapsed, rest) = line.split_once("sec:")?;
        let time = elapsed.trim().parse().ok()?;
        let (_, after_operations) = rest.split_once(';')?;
        let throughput = after_operations.split_whitespace().next()?.parse().ok()?;
        let read_latency_ms = line
            .split_once(READ_LATENCY_MARKER)
            .and_then(|(_, latency)| latency.split(']').next())
            .and_then(|latency| latency.trim().parse::<f64>().ok())
            .map(|latency_us| latency_us / 1000.0);

        Some(Self {
            time,
            throughput,
            read_latency_ms,
        })
    }

    /// Value of the metric, `-1` when the metric was not measured
    pub fn value(&self, metric: ReportMetric) -> f64 {
        match metric {
            ReportMetric::AverageLatency => self.read_latency_ms.unwrap_or(-1.0),
            ReportMetric::Throughput => self.throughput,
        }
    }
}

/// Build the `time<TAB>value` lines of a benchmark output.
///
/// Time steps of `delta` seconds without status line are reported with a `-1` value.
fn report_lines(output: &str, metric: ReportMetric, delta: u64) -> StdResult<Vec<String>> {
    if delta == 0 {
        return Err(anyhow!("The time step of a report must be greater than 0"));
    }

    let mut lines = Vec::new();
    let mut expected_time = 0;

    for sample in output.lines().filter_map(StatusSample::parse) {
        while expected_time < sample.time {
            lines.push(format!("{expected_time}\t-1"));
            expected_time += delta;
        }
        lines.push(format!("{}\t{}", sample.time, sample.value(metric)));
        expected_time = sample.time + delta;
    }

    Ok(lines)
}

/// Benchmark output REPORT command
#[derive(Parser, Debug, Clone)]
pub struct ReportCommand {
    /// Benchmark output file
    #[clap(short, long)]
    file: PathBuf,

    /// Seconds between two status lines
    #[clap(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    delta: u64,

    /// Metric to report
    #[clap(short, long, value_enum, default_value = "avglatency")]
    metric: ReportMetric,
}

impl ReportCommand {
    /// Main command execution
    pub async fn execute(&self, context: CommandContext) -> StdResult<()> {
        debug!(context.logger(), "Reading benchmark output"; "file" => %self.file.display(), "metric" => ?self.metric);
        let output = std::fs::read_to_string(&self.file).with_context(|| {
            format!("Can not read benchmark output file: '{}'", self.file.display())
        })?;

        for line in report_lines(&output, self.metric, self.delta)? {
            println!("{line}");
        }

        Ok(())
    }
}
