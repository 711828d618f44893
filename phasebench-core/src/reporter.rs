//! Reporter interface
//!
//! Renderers implement this trait and receive the finished benchmark
//! forest through a fixed call order: header, system, environment, then
//! per launched benchmark its settings and a pre-order flat sequence of
//! phases with dotted names. Every method defaults to a no-op so a
//! renderer only implements the callbacks it cares about.

use crate::metrics::PhaseMetrics;
use crate::settings::Settings;
use crate::system::{EnvironmentInfo, SystemInfo};

pub trait Reporter {
    fn report_header(&mut self) {}
    fn report_system(&mut self, _system: &SystemInfo) {}
    fn report_environment(&mut self, _environment: &EnvironmentInfo) {}
    fn report_benchmarks_header(&mut self) {}
    fn report_benchmark_header(&mut self) {}
    fn report_benchmark(&mut self, _name: &str, _settings: &Settings) {}
    fn report_phases_header(&mut self) {}
    fn report_phase_header(&mut self) {}
    fn report_phase(&mut self, _name: &str, _metrics: &PhaseMetrics) {}
    fn report_phase_footer(&mut self) {}
    fn report_phases_footer(&mut self) {}
    fn report_benchmark_footer(&mut self) {}
    fn report_benchmarks_footer(&mut self) {}
    fn report_footer(&mut self) {}
}
