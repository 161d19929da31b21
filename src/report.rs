//! Run log harvesting and reporting.
//!
//! Scans a directory of run logs (ours or Gurobi's own), extracts the final
//! objective, optimality gap and wall-clock time of each run, and exports
//! them as CSV together with aggregate statistics.

use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Values extracted from one run log. Fields stay `None` when the log does
/// not contain them (for instance an infeasible run has no objective).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Log file name, without directory
    pub file_name: String,
    /// Final incumbent objective
    pub objective: Option<f64>,
    /// Optimality gap in percent
    pub gap_percent: Option<f64>,
    /// Wall-clock time in seconds
    pub execution_time_s: Option<f64>,
}

impl LogSummary {
    pub fn is_proven_optimal(&self) -> bool {
        self.gap_percent == Some(0.0)
    }
}

/// Aggregated statistics over a set of runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub num_runs: usize,
    /// Runs with an objective
    pub num_solved: usize,
    /// Runs closed with a zero gap
    pub num_optimal: usize,
    pub avg_gap_percent: Option<f64>,
    pub std_gap_percent: Option<f64>,
    pub max_gap_percent: Option<f64>,
    pub avg_time_s: Option<f64>,
    pub std_time_s: Option<f64>,
    pub total_time_s: f64,
}

fn time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:Explored \d+ nodes.* in|Finished in) ([\d.]+) seconds").expect("valid time pattern")
    })
}

fn summary_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Best objective ([\d.eE+-]+)(?:, best bound [\d.eE+-]+, gap ([\d.]+)%)?")
            .expect("valid summary pattern")
    })
}

/// Branch-and-bound progress lines, e.g.
/// `H  123  456  ...  533.00000  602.30000  13.0%  ...`
fn node_line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*([H*]|\s)\s*\d+\s+\d+.*?([\d.eE+-]+)\s+([\d.eE+-]+)\s+([\d.]+)%.*$")
            .expect("valid node line pattern")
    })
}

/// Extract the run summary from the text of a log.
///
/// The final `Best objective` line wins; when it is missing (time limit hit
/// before the summary was written) the last node-log line supplies the
/// incumbent and the gap.
pub fn parse_log(file_name: &str, text: &str) -> LogSummary {
    let execution_time_s = time_pattern()
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok());

    let (objective, gap_percent) = match summary_pattern().captures(text) {
        Some(c) => (
            c[1].parse::<f64>().ok(),
            c.get(2).and_then(|m| m.as_str().parse::<f64>().ok()),
        ),
        None => match node_line_pattern().captures_iter(text).last() {
            Some(c) => (c[2].parse::<f64>().ok(), c[4].parse::<f64>().ok()),
            None => (None, None),
        },
    };

    LogSummary {
        file_name: file_name.to_string(),
        objective,
        gap_percent,
        execution_time_s,
    }
}

/// Read and parse a single log file.
pub fn parse_log_file<P: AsRef<Path>>(path: P) -> std::io::Result<LogSummary> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parse_log(&file_name, &text))
}

/// Parse every `*.log` file in `dir`, sorted by file name.
///
/// Unreadable entries and files are logged and skipped.
pub fn harvest_dir<P: AsRef<Path>>(dir: P) -> std::io::Result<Vec<LogSummary>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Failed to read an entry of {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "log").unwrap_or(false) {
            paths.push(path);
        }
    }

    log::info!("Found {} log files", paths.len());

    let mut summaries: Vec<LogSummary> = paths
        .par_iter()
        .filter_map(|path| match parse_log_file(path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::error!("Failed to read {:?}: {}", path, e);
                None
            }
        })
        .collect();

    summaries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(summaries)
}

/// Export summaries to CSV
pub fn export_csv<P: AsRef<Path>>(summaries: &[LogSummary], path: P) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for summary in summaries {
        writer.serialize(summary)?;
    }

    writer.flush()?;
    Ok(())
}

fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    match values.len() {
        0 => (None, None),
        1 => (Some(values[0]), Some(0.0)),
        _ => (Some(values.mean()), Some(values.std_dev())),
    }
}

impl ReportStatistics {
    pub fn from_summaries(summaries: &[LogSummary]) -> Self {
        let gaps: Vec<f64> = summaries.iter().filter_map(|s| s.gap_percent).collect();
        let times: Vec<f64> = summaries.iter().filter_map(|s| s.execution_time_s).collect();

        let (avg_gap_percent, std_gap_percent) = mean_and_std(&gaps);
        let (avg_time_s, std_time_s) = mean_and_std(&times);

        ReportStatistics {
            num_runs: summaries.len(),
            num_solved: summaries.iter().filter(|s| s.objective.is_some()).count(),
            num_optimal: summaries.iter().filter(|s| s.is_proven_optimal()).count(),
            avg_gap_percent,
            std_gap_percent,
            max_gap_percent: gaps.iter().copied().map(OrderedFloat).max().map(|g| g.0),
            avg_time_s,
            std_time_s,
            total_time_s: times.iter().sum(),
        }
    }
}

/// Human-readable report over a set of runs
pub fn generate_report(summaries: &[LogSummary]) -> String {
    let stats = ReportStatistics::from_summaries(summaries);
    let fmt_opt = |v: Option<f64>, precision: usize| {
        v.map(|x| format!("{:.*}", precision, x))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut report = String::new();

    report.push_str("========================================\n");
    report.push_str("        Max-SC-QBF Run Report\n");
    report.push_str("========================================\n\n");

    report.push_str(&format!("{:<30} {:>16} {:>10} {:>12}\n",
        "Log", "Objective", "Gap%", "Time (s)"));
    report.push_str("-".repeat(71).as_str());
    report.push('\n');

    for s in summaries {
        report.push_str(&format!("{:<30} {:>16} {:>10} {:>12}\n",
            s.file_name,
            fmt_opt(s.objective, 2),
            fmt_opt(s.gap_percent, 4),
            fmt_opt(s.execution_time_s, 2)));
    }

    report.push_str("-".repeat(71).as_str());
    report.push('\n');

    report.push_str(&format!("Runs: {} ({} with a solution, {} proven optimal)\n",
        stats.num_runs, stats.num_solved, stats.num_optimal));
    report.push_str(&format!("Gap%: avg {} / std {} / max {}\n",
        fmt_opt(stats.avg_gap_percent, 4),
        fmt_opt(stats.std_gap_percent, 4),
        fmt_opt(stats.max_gap_percent, 4)));
    report.push_str(&format!("Time: avg {}s / std {}s / total {:.2}s\n",
        fmt_opt(stats.avg_time_s, 2),
        fmt_opt(stats.std_time_s, 2),
        stats.total_time_s));

    report
}
