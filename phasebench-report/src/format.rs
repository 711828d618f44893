//! Human-readable value formatting

/// Renders a nanosecond duration with an adaptive unit.
pub fn format_time_period(nanoseconds: i64) -> String {
    let magnitude = nanoseconds.abs();
    if magnitude >= 1_000_000_000 {
        format!("{:.3} s", nanoseconds as f64 / 1e9)
    } else if magnitude >= 1_000_000 {
        format!("{:.3} ms", nanoseconds as f64 / 1e6)
    } else if magnitude >= 1_000 {
        format!("{:.3} us", nanoseconds as f64 / 1e3)
    } else {
        format!("{nanoseconds} ns")
    }
}

/// Renders a byte count with an adaptive binary unit.
pub fn format_data_size(bytes: i64) -> String {
    const KIB: i64 = 1024;
    const MIB: i64 = 1024 * KIB;
    const GIB: i64 = 1024 * MIB;
    const TIB: i64 = 1024 * GIB;

    let magnitude = bytes.abs();
    if magnitude >= TIB {
        format!("{:.3} TiB", bytes as f64 / TIB as f64)
    } else if magnitude >= GIB {
        format!("{:.3} GiB", bytes as f64 / GIB as f64)
    } else if magnitude >= MIB {
        format!("{:.3} MiB", bytes as f64 / MIB as f64)
    } else if magnitude >= KIB {
        format!("{:.3} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// Renders a frequency in hertz with an adaptive unit.
pub fn format_clock_speed(hertz: i64) -> String {
    let magnitude = hertz.abs();
    if magnitude >= 1_000_000_000 {
        format!("{:.3} GHz", hertz as f64 / 1e9)
    } else if magnitude >= 1_000_000 {
        format!("{:.3} MHz", hertz as f64 / 1e6)
    } else if magnitude >= 1_000 {
        format!("{:.3} kHz", hertz as f64 / 1e3)
    } else {
        format!("{hertz} Hz")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_period() {
        assert_eq!(format_time_period(999), "999 ns");
        assert_eq!(format_time_period(1_500), "1.500 us");
        assert_eq!(format_time_period(2_250_000), "2.250 ms");
        assert_eq!(format_time_period(3_000_000_000), "3.000 s");
    }

    #[test]
    fn test_format_data_size() {
        assert_eq!(format_data_size(512), "512 bytes");
        assert_eq!(format_data_size(2048), "2.000 KiB");
        assert_eq!(format_data_size(3 * 1024 * 1024), "3.000 MiB");
        assert_eq!(format_data_size(1024 * 1024 * 1024), "1.000 GiB");
    }

    #[test]
    fn test_format_clock_speed() {
        assert_eq!(format_clock_speed(800), "800 Hz");
        assert_eq!(format_clock_speed(3_200_000_000), "3.200 GHz");
    }
}
