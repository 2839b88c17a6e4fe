/// Human readable file size, 1024 based ("0 B", "1.5 KB", "2.0 GB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}

/// Human readable duration from minutes ("45 min", "2h", "1h 30m")
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }

    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 min");
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(60), "1h");
        assert_eq!(format_duration(90), "1h 30m");
    }
}
