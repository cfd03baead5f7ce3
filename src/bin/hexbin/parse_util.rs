use hexbin::ConfigError;

/// Parse a numeric option value.
///
/// Accepts decimal, `0x`/`h`-marked hex, `0b` binary and bare hex containing
/// a letter digit (e.g. `FF`). `_` and `.` may be used as digit separators.
pub(crate) fn parse_number(s: &str) -> Result<u32, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ConfigError::InvalidNumber("empty".to_string()));
    }

    let (radix, digits) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (2, bin)
    } else if let Some(hex) = s.strip_suffix('h').or_else(|| s.strip_suffix('H')) {
        (16, hex)
    } else if s.chars().all(|c| c.is_ascii_hexdigit()) && s.chars().any(|c| c.is_ascii_alphabetic())
    {
        (16, s)
    } else {
        (10, s)
    };

    let cleaned: String = digits.chars().filter(|c| *c != '.' && *c != '_').collect();
    if cleaned.is_empty() {
        return Err(ConfigError::InvalidNumber(s.to_string()));
    }

    u32::from_str_radix(&cleaned, radix)
        .map_err(|e| ConfigError::InvalidNumber(format!("{s}: {e}")))
}

/// clap value parser wrapper.
pub(crate) fn number_arg(s: &str) -> Result<u32, String> {
    parse_number(s).map_err(|e| e.to_string())
}
