/// Helper utilities for formatting group data

use chrono::{DateTime, Local, Utc};

/// Shorten large counts: 1234 -> "1.2k", 65536 -> "65.5k", 1048576 -> "1M"
pub fn shorten_number(value: u64) -> String {
    const UNITS: &[(u64, &str)] = &[
        (1_000_000_000_000_000_000, "E"),
        (1_000_000_000_000_000, "P"),
        (1_000_000_000_000, "T"),
        (1_000_000_000, "G"),
        (1_000_000, "M"),
        (1_000, "k"),
    ];

    for (i, (unit, symbol)) in UNITS.iter().enumerate() {
        if value >= *unit {
            let scaled = format!("{:.1}", value as f64 / *unit as f64);
            // 999_999 rounds to "1000.0"; carry into the next unit
            if scaled.starts_with("1000") && i > 0 {
                return format!("1{}", UNITS[i - 1].1);
            }
            let scaled = scaled.strip_suffix(".0").unwrap_or(&scaled);
            return format!("{}{}", scaled, symbol);
        }
    }

    value.to_string()
}

/// Capacity for display; `None` means the tree depth overflows a u64
pub fn format_capacity(capacity: Option<u64>) -> String {
    match capacity {
        Some(c) => shorten_number(c),
        None => "unbounded".to_string(),
    }
}

/// Keep the first and last `edge` characters, joined by "..."
pub fn shorten_middle(value: &str, edge: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= edge * 2 {
        return value.to_string();
    }

    let start: String = chars[..edge].iter().collect();
    let end: String = chars[chars.len() - edge..].iter().collect();
    format!("{}...{}", start, end)
}

/// Mask sensitive data (show only first and last N characters)
pub fn mask_sensitive(value: &str, visible_chars: usize) -> String {
    if value.chars().count() <= visible_chars * 2 {
        "*".repeat(value.chars().count())
    } else {
        shorten_middle(value, visible_chars)
    }
}

/// Format timestamp to human-readable local time
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let local: DateTime<Local> = timestamp.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_number() {
        assert_eq!(shorten_number(0), "0");
        assert_eq!(shorten_number(2), "2");
        assert_eq!(shorten_number(999), "999");
        assert_eq!(shorten_number(1000), "1k");
        assert_eq!(shorten_number(1234), "1.2k");
        assert_eq!(shorten_number(65536), "65.5k");
        assert_eq!(shorten_number(1_048_576), "1M");
        assert_eq!(shorten_number(4_294_967_296), "4.3G");
    }

    #[test]
    fn test_shorten_number_carries_into_next_unit() {
        assert_eq!(shorten_number(999_949), "999.9k");
        assert_eq!(shorten_number(999_999), "1M");
        assert_eq!(shorten_number(999_999_999), "1G");
    }

    #[test]
    fn test_format_capacity() {
        assert_eq!(format_capacity(Some(1 << 20)), "1M");
        assert_eq!(format_capacity(None), "unbounded");
    }

    #[test]
    fn test_shorten_middle() {
        assert_eq!(shorten_middle("abcdef", 3), "abcdef");
        assert_eq!(shorten_middle("abcdefgh", 3), "abc...fgh");
        assert_eq!(shorten_middle("ééééééé", 2), "éé...éé");
    }

    #[test]
    fn test_mask_sensitive() {
        let token = "5e7f294e4c92a9aa661fae8d347d832d";
        let masked = mask_sensitive(token, 4);
        assert_eq!(masked, "5e7f...832d");
        assert_eq!(mask_sensitive("short", 4), "*****");
    }
}
