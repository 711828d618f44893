//! Host introspection and wide arithmetic helpers
//!
//! CPU and memory facts come from `sysinfo`; they are captured once per
//! report rather than cached, since a report is emitted at most a handful
//! of times per run.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use sysinfo::System;

/// CPU and memory facts about the host running the benchmarks.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub cpu_architecture: String,
    pub cpu_brand: String,
    pub cpu_logical_cores: usize,
    pub cpu_physical_cores: usize,
    pub cpu_frequency_mhz: u64,
    pub ram_total_bytes: u64,
    pub ram_free_bytes: u64,
}

impl SystemInfo {
    pub fn capture() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let cpus = system.cpus();
        Self {
            cpu_architecture: System::cpu_arch(),
            cpu_brand: cpus
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
            cpu_logical_cores: cpus.len(),
            cpu_physical_cores: System::physical_core_count().unwrap_or_else(|| cpus.len()),
            cpu_frequency_mhz: cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0),
            ram_total_bytes: system.total_memory(),
            ram_free_bytes: system.available_memory(),
        }
    }
}

/// Facts about the build and OS environment of the current process.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub os_version: String,
    pub pointer_bits: usize,
    pub little_endian: bool,
    pub configuration: String,
    pub timestamp_unix: u64,
}

impl EnvironmentInfo {
    pub fn capture() -> Self {
        Self {
            os_version: System::long_os_version().unwrap_or_default(),
            pointer_bits: 8 * std::mem::size_of::<usize>(),
            little_endian: cfg!(target_endian = "little"),
            configuration: if cfg!(debug_assertions) {
                "debug".to_string()
            } else {
                "release".to_string()
            },
            timestamp_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Number of physical CPU cores, used as the default thread count for
/// threaded benchmarks when no counts are configured.
pub fn cpu_physical_cores() -> usize {
    System::physical_core_count()
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .max(1)
}

/// Multiply then divide through a 128-bit intermediate, so throughput
/// conversions like `ops * 1_000_000_000 / elapsed_ns` cannot overflow.
pub fn mul_div64(value: i64, numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    ((value as i128 * numerator as i128) / denominator as i128) as i64
}
