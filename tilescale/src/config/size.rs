//! Human-readable byte sizes (`512MB`, `1.5 GB`).

const UNITS: [(&str, u64); 5] = [
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("B", 1),
];

/// Parse a size string into bytes.
///
/// Units are binary (`1KB == 1024`) and case-insensitive; a bare number is
/// bytes. Fractions are allowed (`1.5GB`).
///
/// ```
/// use tilescale::config::parse_size;
///
/// assert_eq!(parse_size("512MB"), Ok(512 * 1024 * 1024));
/// assert_eq!(parse_size("1.5 kb"), Ok(1536));
/// assert_eq!(parse_size("42"), Ok(42));
/// ```
pub fn parse_size(input: &str) -> Result<usize, String> {
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();
    let split = upper
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(upper.len());
    let (number, unit) = upper.split_at(split);
    let number = number.trim();

    let multiplier = if unit.is_empty() {
        1
    } else {
        UNITS
            .iter()
            .find(|(name, _)| *name == unit || name.trim_end_matches('B') == unit)
            .map(|(_, m)| *m)
            .ok_or_else(|| format!("unknown size unit '{}' in '{}'", unit, trimmed))?
    };

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid size '{}'", trimmed))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid size '{}'", trimmed));
    }

    Ok((value * multiplier as f64).round() as usize)
}

/// Format bytes for display (`1.5 GB`).
pub fn format_size(bytes: usize) -> String {
    let bytes = bytes as u64;
    for (name, multiplier) in UNITS {
        if multiplier > 1 && bytes >= multiplier {
            return format!("{:.1} {}", bytes as f64 / multiplier as f64, name);
        }
    }
    format!("{} B", bytes)
}

/// Format bytes so that [`parse_size`] gives back the same value.
pub(crate) fn format_size_exact(bytes: usize) -> String {
    let bytes = bytes as u64;
    for (name, multiplier) in UNITS {
        if bytes >= multiplier && bytes % multiplier == 0 {
            return format!("{}{}", bytes / multiplier, name);
        }
    }
    bytes.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_size("2GB"), Ok(2 << 30));
        assert_eq!(parse_size("2g"), Ok(2 << 30));
        assert_eq!(parse_size("10 KB"), Ok(10240));
        assert_eq!(parse_size("7B"), Ok(7));
        assert_eq!(parse_size("0"), Ok(0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("-1MB").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(512 * 1024 * 1024), "512.0 MB");
    }

    #[test]
    fn test_exact_format_parses_back() {
        for bytes in [0usize, 1, 1000, 1024, 3 << 20, (1 << 30) + 1, 5 << 40] {
            assert_eq!(parse_size(&format_size_exact(bytes)), Ok(bytes));
        }
        assert_eq!(format_size_exact(512 << 20), "512MB");
    }
}
