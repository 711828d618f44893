//! CSV report
//!
//! One header row, then one row per phase. Phase names carry commas and
//! parentheses from the parameter suffixes, so the name column is always
//! quoted.

use std::fmt::Write;

use phasebench_core::{PhaseMetrics, Reporter};

const HEADER: &str = "name,avg_time,min_time,max_time,total_time,\
total_operations,total_items,total_bytes,\
operations_per_second,items_per_second,bytes_per_second";

#[derive(Default)]
pub struct CsvReporter {
    output: String,
}

impl CsvReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Reporter for CsvReporter {
    fn report_header(&mut self) {
        self.output.push_str(HEADER);
        self.output.push('\n');
    }

    fn report_phase(&mut self, name: &str, metrics: &PhaseMetrics) {
        let _ = writeln!(
            self.output,
            "\"{}\",{},{},{},{},{},{},{},{},{},{}",
            name.replace('"', "\"\""),
            metrics.avg_time(),
            metrics.min_time(),
            metrics.max_time(),
            metrics.total_time(),
            metrics.total_operations(),
            metrics.total_items(),
            metrics.total_bytes(),
            metrics.operations_per_second(),
            metrics.items_per_second(),
            metrics.bytes_per_second(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row_comes_first() {
        let mut reporter = CsvReporter::new();
        reporter.report_header();
        reporter.report_phase("alloc(32,1024)", &PhaseMetrics::new());
        let mut lines = reporter.output().lines();
        assert_eq!(lines.next(), Some(HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"alloc(32,1024)\","));
        assert_eq!(row.split(',').count(), HEADER.split(',').count() + 1);
    }

    #[test]
    fn test_unmeasured_phase_row_has_zero_extremes() {
        let mut reporter = CsvReporter::new();
        reporter.report_phase("idle", &PhaseMetrics::new());
        let row = reporter.output().lines().next().unwrap().to_string();
        let fields: Vec<&str> = row.split(',').collect();
        // avg, min, max and total all render as plain zeroes
        assert_eq!(&fields[1..5], ["0", "0", "0", "0"]);
        assert!(!row.contains(&i64::MAX.to_string()));
        assert!(!row.contains(&i64::MIN.to_string()));
    }

    #[test]
    fn test_row_carries_counters() {
        let mut metrics = PhaseMetrics::new();
        metrics.start_collecting();
        metrics.add_operations(4);
        metrics.add_items(8);
        metrics.add_bytes(16);
        metrics.stop_collecting();

        let mut reporter = CsvReporter::new();
        reporter.report_phase("io", &metrics);
        let row = reporter.output().lines().next().unwrap().to_string();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[0], "\"io\"");
        assert_eq!(fields[5], "4");
        assert_eq!(fields[6], "8");
        assert_eq!(fields[7], "16");
    }
}
