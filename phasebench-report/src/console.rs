//! Plain-text console report
//!
//! Renders the classic banner layout: a `=` separator per section, a `-`
//! separator per phase, one `Label: value` line per fact. Values with
//! obvious units go through the adaptive formatters.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use phasebench_core::{EnvironmentInfo, PhaseMetrics, Reporter, Settings, SystemInfo};

use crate::format::{format_clock_speed, format_data_size, format_time_period};

const SEPARATOR_WIDTH: usize = 79;

/// Accumulates the report as a string; fetch it with [`ConsoleReporter::output`]
/// once reporting is done.
#[derive(Default)]
pub struct ConsoleReporter {
    output: String,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn separator(&mut self, fill: char) {
        for _ in 0..SEPARATOR_WIDTH {
            self.output.push(fill);
        }
        self.output.push('\n');
    }

    fn line(&mut self, label: &str, value: impl std::fmt::Display) {
        let _ = writeln!(self.output, "{label}: {value}");
    }
}

impl Reporter for ConsoleReporter {
    fn report_header(&mut self) {
        self.separator('=');
        self.line("PhaseBench report. Version", env!("CARGO_PKG_VERSION"));
    }

    fn report_system(&mut self, system: &SystemInfo) {
        self.separator('=');
        self.line("CPU architecture", &system.cpu_architecture);
        self.line("CPU model", &system.cpu_brand);
        self.line("CPU logical cores", system.cpu_logical_cores);
        self.line("CPU physical cores", system.cpu_physical_cores);
        self.line(
            "CPU clock speed",
            format_clock_speed(system.cpu_frequency_mhz as i64 * 1_000_000),
        );
        self.line(
            "CPU hyper-threading",
            if system.cpu_logical_cores > system.cpu_physical_cores {
                "enabled"
            } else {
                "disabled"
            },
        );
        self.line("RAM total", format_data_size(system.ram_total_bytes as i64));
        self.line("RAM free", format_data_size(system.ram_free_bytes as i64));
    }

    fn report_environment(&mut self, environment: &EnvironmentInfo) {
        self.separator('=');
        self.line("OS version", &environment.os_version);
        self.line("Process bits", environment.pointer_bits);
        self.line(
            "Process configuration",
            &environment.configuration,
        );
        if let Some(utc) = DateTime::<Utc>::from_timestamp(environment.timestamp_unix as i64, 0) {
            self.line("Local timestamp", utc.with_timezone(&Local).to_rfc2822());
            self.line("UTC timestamp", utc.to_rfc2822());
        }
    }

    fn report_benchmark(&mut self, name: &str, settings: &Settings) {
        self.separator('=');
        self.line("Benchmark", name);
        self.line("Attempts", settings.attempts());
        if settings.is_infinite() {
            self.line("Operations", "infinite");
        } else if settings.duration() > 0 {
            self.line(
                "Duration",
                format_time_period(settings.duration() * 1_000_000_000),
            );
        } else if settings.operations() > 0 {
            self.line("Operations", settings.operations());
        }
    }

    fn report_phase(&mut self, name: &str, metrics: &PhaseMetrics) {
        self.separator('-');
        self.line("Phase", name);
        if metrics.threads() > 1 {
            self.line("Threads", metrics.threads());
        }
        if metrics.total_operations() > 1 {
            if metrics.latency_histogram().is_some() {
                self.line("Latency (Min)", format_time_period(metrics.min_latency()));
                self.line(
                    "Latency (Mean)",
                    format_time_period(metrics.mean_latency() as i64),
                );
                self.line("Latency (Max)", format_time_period(metrics.max_latency()));
                self.line(
                    "Latency (StDev)",
                    format_time_period(metrics.stdv_latency() as i64),
                );
            } else {
                self.line("Average time", format_time_period(metrics.avg_time()));
                self.line("Minimal time", format_time_period(metrics.min_time()));
                self.line("Maximal time", format_time_period(metrics.max_time()));
            }
        }
        self.line("Total time", format_time_period(metrics.total_time()));
        if metrics.total_operations() > 1 {
            self.line("Total operations", metrics.total_operations());
        }
        if metrics.total_items() > 0 {
            self.line("Total items", metrics.total_items());
        }
        if metrics.total_bytes() > 0 {
            self.line("Total bytes", format_data_size(metrics.total_bytes()));
        }
        if metrics.total_operations() > 1 {
            self.line("Operations throughput", format!("{} ops/s", metrics.operations_per_second()));
        }
        if metrics.total_items() > 0 {
            self.line("Items throughput", format!("{} items/s", metrics.items_per_second()));
        }
        if metrics.total_bytes() > 0 {
            self.line(
                "Bytes throughput",
                format!("{}/s", format_data_size(metrics.bytes_per_second())),
            );
        }
        let custom = collect_custom_lines(metrics);
        if !custom.is_empty() {
            self.line("Custom values", "");
            for (name, value) in custom {
                let _ = writeln!(self.output, "\t{name}: {value}");
            }
        }
    }

    fn report_footer(&mut self) {
        self.separator('=');
    }
}

/// Flattens the seven type-tagged custom maps into one sorted name/value
/// list. A name appearing in several maps yields one line per map.
fn collect_custom_lines(metrics: &PhaseMetrics) -> Vec<(String, String)> {
    let mut lines = Vec::new();
    for (name, value) in metrics.custom_int() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_uint() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_int64() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_uint64() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_flt() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_dbl() {
        lines.push((name.clone(), value.to_string()));
    }
    for (name, value) in metrics.custom_str() {
        lines.push((name.clone(), value.clone()));
    }
    lines.sort();
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_section_hides_timing_without_operations() {
        let mut reporter = ConsoleReporter::new();
        reporter.report_phase("setup", &PhaseMetrics::new());
        let text = reporter.output();
        assert!(text.contains("Phase: setup"));
        assert!(text.contains("Total time:"));
        assert!(!text.contains("Average time"));
        assert!(!text.contains("Total operations"));
    }

    #[test]
    fn test_phase_section_includes_counters_when_present() {
        let mut metrics = PhaseMetrics::new();
        metrics.start_collecting();
        metrics.add_operations(10);
        metrics.add_items(20);
        metrics.add_bytes(4096);
        metrics.stop_collecting();
        metrics.set_custom_str("variant", "vectorized");

        let mut reporter = ConsoleReporter::new();
        reporter.report_phase("hot-loop", &metrics);
        let text = reporter.output();
        assert!(text.contains("Average time:"));
        assert!(text.contains("Total operations: 10"));
        assert!(text.contains("Total items: 20"));
        assert!(text.contains("Total bytes: 4.000 KiB"));
        assert!(text.contains("Custom values:"));
        assert!(text.contains("\tvariant: vectorized"));
    }

    #[test]
    fn test_report_sections_are_separated() {
        let mut reporter = ConsoleReporter::new();
        reporter.report_header();
        reporter.report_benchmark("demo", &Settings::new().with_operations(100));
        reporter.report_footer();
        let text = reporter.output();
        assert!(text.contains(&"=".repeat(SEPARATOR_WIDTH)));
        assert!(text.contains("Benchmark: demo"));
        assert!(text.contains("Operations: 100"));
    }
}
