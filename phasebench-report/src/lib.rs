//! PhaseBench Report - Result Rendering
//!
//! Renderers for the finished benchmark forest:
//! - Console (human-readable banner layout)
//! - CSV (spreadsheet-compatible, one row per phase)
//! - JSON (machine-readable)

mod console;
mod csv;
mod format;
mod json;

pub use console::ConsoleReporter;
pub use csv::CsvReporter;
pub use format::{format_clock_speed, format_data_size, format_time_period};
pub use json::JsonReporter;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Console,
    /// CSV for spreadsheets
    Csv,
    /// JSON with full schema
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "text" | "human" => Ok(OutputFormat::Console),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("console".parse::<OutputFormat>(), Ok(OutputFormat::Console));
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
