// src/engine/report.rs

//! Timing summary printed after a successful run.

use std::io::{self, Write};
use std::time::Duration;

use crate::engine::orchestrator::RunReport;
use crate::task::TaskResult;

/// Formats a [`RunReport`] as one `"<secs>s <name>"` line per task, fastest
/// first, followed by a `"<secs>s total"` line.
pub struct Reporter;

impl Reporter {
    /// Write the timing summary.
    ///
    /// Writes nothing for a failed run.
    pub fn write<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
        if !report.is_success() {
            return Ok(());
        }

        for result in Self::sorted(report) {
            writeln!(out, "{}", format_line(result.duration, &result.name))?;
        }
        writeln!(out, "{}", format_line(report.elapsed, "total"))?;
        Ok(())
    }

    /// Results ordered by ascending duration. `report.results` is in
    /// registration order and the sort is stable, so ties keep that order.
    pub fn sorted(report: &RunReport) -> Vec<&TaskResult> {
        let mut results: Vec<&TaskResult> = report.results.iter().collect();
        results.sort_by_key(|r| r.duration);
        results
    }
}

/// `"{secs:2.2}s {label}"`.
pub fn format_line(duration: Duration, label: &str) -> String {
    format!("{:2.2}s {}", duration.as_secs_f64(), label)
}
