//! Size, timestamp and path helpers shared by the other modules.

pub mod paths;

pub use paths::*;

/// Human readable size for operation descriptions: `23B`, `4KB`, `1.5MB`.
///
/// Kilobytes are whole numbers; larger units keep one decimal. Gigabytes
/// are the largest unit.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(&str, u32); 3] = [("GB", 3), ("MB", 2), ("KB", 1)];

    for (unit, power) in UNITS {
        let scale = 1024u64.pow(power);
        if bytes >= scale {
            let value = bytes as f64 / scale as f64;
            return match power {
                1 => format!("{:.0}{}", value, unit),
                _ => format!("{:.1}{}", value, unit),
            };
        }
    }
    format!("{}B", bytes)
}

/// Timestamp suffix used for backup and trash collisions: `20240315093000`
pub fn timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_for_notes() {
        assert_eq!(format_size(5), "5B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(4 * 1024), "4KB");
        assert_eq!(format_size(1536), "2KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024 * 1024), "5120.0GB");
    }

    #[test]
    fn test_timestamp_suffix_shape() {
        let suffix = timestamp_suffix();
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
