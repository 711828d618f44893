//! JSON report
//!
//! Builds a serde document while the report callbacks run and serializes
//! it once in `report_footer`. Optional fields follow the console rules:
//! timing statistics only appear once a phase counted operations, latency
//! statistics replace them when a histogram was collected.

use chrono::Utc;
use phasebench_core::{EnvironmentInfo, PhaseMetrics, Reporter, Settings, SystemInfo};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Default, Serialize)]
struct JsonReport {
    version: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<EnvironmentInfo>,
    benchmarks: Vec<JsonBenchmark>,
}

#[derive(Serialize)]
struct JsonBenchmark {
    name: String,
    attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operations: Option<i64>,
    infinite: bool,
    phases: Vec<JsonPhase>,
}

#[derive(Serialize)]
struct JsonPhase {
    name: String,
    threads: u32,
    total_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    avg_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency: Option<JsonLatency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_operations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_items: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operations_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    custom: Map<String, Value>,
}

#[derive(Serialize)]
struct JsonLatency {
    min: i64,
    max: i64,
    mean: f64,
    stdv: f64,
}

#[derive(Default)]
pub struct JsonReporter {
    report: JsonReport,
    output: String,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialized document; empty until `report_footer` has run.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Reporter for JsonReporter {
    fn report_header(&mut self) {
        self.report.version = env!("CARGO_PKG_VERSION").to_string();
        self.report.timestamp = Utc::now().to_rfc3339();
    }

    fn report_system(&mut self, system: &SystemInfo) {
        self.report.system = Some(system.clone());
    }

    fn report_environment(&mut self, environment: &EnvironmentInfo) {
        self.report.environment = Some(environment.clone());
    }

    fn report_benchmark(&mut self, name: &str, settings: &Settings) {
        self.report.benchmarks.push(JsonBenchmark {
            name: name.to_string(),
            attempts: settings.attempts(),
            duration_seconds: (settings.duration() > 0).then(|| settings.duration()),
            operations: (settings.operations() > 0).then(|| settings.operations()),
            infinite: settings.is_infinite(),
            phases: Vec::new(),
        });
    }

    fn report_phase(&mut self, name: &str, metrics: &PhaseMetrics) {
        let measured = metrics.total_operations() > 1;
        let timed = measured && metrics.latency_histogram().is_none();
        let phase = JsonPhase {
            name: name.to_string(),
            threads: metrics.threads(),
            total_time: metrics.total_time(),
            avg_time: timed.then(|| metrics.avg_time()),
            min_time: timed.then(|| metrics.min_time()),
            max_time: timed.then(|| metrics.max_time()),
            latency: (measured && metrics.latency_histogram().is_some()).then(|| JsonLatency {
                min: metrics.min_latency(),
                max: metrics.max_latency(),
                mean: metrics.mean_latency(),
                stdv: metrics.stdv_latency(),
            }),
            total_operations: measured.then(|| metrics.total_operations()),
            total_items: (metrics.total_items() > 0).then(|| metrics.total_items()),
            total_bytes: (metrics.total_bytes() > 0).then(|| metrics.total_bytes()),
            operations_per_second: measured.then(|| metrics.operations_per_second()),
            items_per_second: (metrics.total_items() > 0).then(|| metrics.items_per_second()),
            bytes_per_second: (metrics.total_bytes() > 0).then(|| metrics.bytes_per_second()),
            custom: collect_custom(metrics),
        };
        if let Some(benchmark) = self.report.benchmarks.last_mut() {
            benchmark.phases.push(phase);
        }
    }

    fn report_footer(&mut self) {
        self.output = serde_json::to_string_pretty(&self.report).unwrap_or_default();
    }
}

fn collect_custom(metrics: &PhaseMetrics) -> Map<String, Value> {
    let mut custom = Map::new();
    for (name, &value) in metrics.custom_int() {
        custom.insert(name.clone(), value.into());
    }
    for (name, &value) in metrics.custom_uint() {
        custom.insert(name.clone(), value.into());
    }
    for (name, &value) in metrics.custom_int64() {
        custom.insert(name.clone(), value.into());
    }
    for (name, &value) in metrics.custom_uint64() {
        custom.insert(name.clone(), value.into());
    }
    for (name, &value) in metrics.custom_flt() {
        custom.insert(name.clone(), (value as f64).into());
    }
    for (name, &value) in metrics.custom_dbl() {
        custom.insert(name.clone(), value.into());
    }
    for (name, value) in metrics.custom_str() {
        custom.insert(name.clone(), value.clone().into());
    }
    custom
}
