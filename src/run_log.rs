//! Per-run log file.
//!
//! A [`RunLog`] is created for one solve and handed to the oracle explicitly.
//! It collects a human-readable trace of the run in `<outdir>/<stem>.log`,
//! in the line format the report harvester understands:
//!
//! ```text
//! Best objective 5.000000000000e0, best bound 5.000000000000e0, gap 0.0000%
//! Explored 3 nodes (41 simplex iterations) in 0.01 seconds
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::oracle::{OracleResult, OracleStatus};

pub struct RunLog {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl RunLog {
    /// Create (or truncate) `<outdir>/<stem>.log`, creating `outdir` if needed.
    pub fn create<P: AsRef<Path>>(outdir: P, stem: &str) -> io::Result<Self> {
        fs::create_dir_all(&outdir)?;
        let path = outdir.as_ref().join(format!("{}.log", stem));

        // Shared with external solvers that append to the same file
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.set_len(0)?;

        let mut log = RunLog {
            path: Some(path),
            writer: Some(BufWriter::new(file)),
        };
        log.line(format!(
            "Run started at {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        Ok(log)
    }

    /// A log that discards everything.
    pub fn disabled() -> Self {
        RunLog {
            path: None,
            writer: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line. Write failures are reported once and disable the log.
    pub fn line<S: AsRef<str>>(&mut self, message: S) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writeln!(writer, "{}", message.as_ref()) {
                log::warn!("Disabling run log after write failure: {}", e);
                self.writer = None;
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                log::warn!("Disabling run log after flush failure: {}", e);
                self.writer = None;
            }
        }
    }

    /// Write the summary lines for an oracle result. Counters and bounds the
    /// backend did not report are left out rather than written as zero.
    pub fn record_result(&mut self, result: &OracleResult) {
        self.line("");
        self.line(time_line(result));
        match result.objective {
            Some(objective) => {
                self.line(format!("Optimization status: {}", result.status));
                match (result.best_bound, result.gap) {
                    (Some(bound), Some(gap)) => self.line(format!(
                        "Best objective {:.12e}, best bound {:.12e}, gap {:.4}%",
                        objective,
                        bound,
                        gap * 100.0
                    )),
                    _ => self.line(format!("Best objective {:.12e}", objective)),
                }
            }
            None if result.status == OracleStatus::Infeasible => {
                self.line("Model is infeasible");
            }
            None => {
                self.line(format!("Optimization status: {}", result.status));
                self.line("No solution available");
            }
        }
        self.flush();
    }
}

fn time_line(result: &OracleResult) -> String {
    match (result.nodes_explored, result.simplex_iterations) {
        (Some(nodes), Some(iterations)) => format!(
            "Explored {} nodes ({} simplex iterations) in {:.2} seconds",
            nodes, iterations, result.elapsed
        ),
        (Some(nodes), None) => format!("Explored {} nodes in {:.2} seconds", nodes, result.elapsed),
        (None, _) => format!("Finished in {:.2} seconds", result.elapsed),
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("path", &self.path)
            .field("enabled", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writes_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("logs");

        let mut log = RunLog::create(&outdir, "instance_0").unwrap();
        log.line("hello");
        let path = log.path().unwrap().to_path_buf();
        drop(log);

        assert_eq!(path, outdir.join("instance_0.log"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Run started at "));
        assert!(text.ends_with("hello\n"));
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = RunLog::create(dir.path(), "run").unwrap();
        first.line("first run");
        drop(first);

        let second = RunLog::create(dir.path(), "run").unwrap();
        drop(second);

        let text = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(!text.contains("first run"));
    }

    fn read_summary(result: &OracleResult) -> String {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::create(dir.path(), "summary").unwrap();
        log.record_result(result);
        drop(log);
        fs::read_to_string(dir.path().join("summary.log")).unwrap()
    }

    #[test]
    fn test_record_result_with_counters() {
        let text = read_summary(&OracleResult {
            oracle: "microlp".to_string(),
            status: OracleStatus::TimeLimit,
            selection: Some(vec![true]),
            objective: Some(12.0),
            best_bound: Some(15.0),
            gap: Some(0.25),
            elapsed: 3.5,
            nodes_explored: Some(40),
            simplex_iterations: Some(900),
        });

        assert!(text.contains("Explored 40 nodes (900 simplex iterations) in 3.50 seconds\n"));
        assert!(text.contains("Optimization status: TimeLimit\n"));
        assert!(text.contains("Best objective 1.200000000000e1, best bound 1.500000000000e1, gap 25.0000%\n"));
    }

    #[test]
    fn test_record_result_without_counters() {
        let text = read_summary(&OracleResult {
            oracle: "microlp".to_string(),
            status: OracleStatus::TimeLimit,
            selection: Some(vec![true]),
            objective: Some(12.0),
            best_bound: None,
            gap: None,
            elapsed: 1.0,
            nodes_explored: None,
            simplex_iterations: None,
        });

        assert!(text.contains("Finished in 1.00 seconds\n"));
        assert!(text.contains("Best objective 1.200000000000e1\n"));
        assert!(!text.contains("Explored"));
        assert!(!text.contains("best bound"));

        let infeasible = read_summary(&OracleResult::infeasible("microlp", 0.0));
        assert!(infeasible.contains("Finished in 0.00 seconds\nModel is infeasible\n"));
    }

    #[test]
    fn test_disabled_log_is_silent() {
        let mut log = RunLog::disabled();
        log.line("ignored");
        log.flush();
        assert!(log.path().is_none());
    }
}
