//! Parsing helpers for individual environment values.

use std::net::IpAddr;

use crate::error::{ConfigError, ConfigResult};

/// Interpret a boolean flag (`1`, `true`, `yes`, `on` and their negatives).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a recognised flag.
pub fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, "not_a_flag", value)),
    }
}

/// Accept a counter store address using one of the Redis URL schemes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the scheme is missing or unknown,
/// or when nothing follows it.
pub fn parse_store_url(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return Err(ConfigError::invalid(field, "missing_scheme", value));
    };
    if !matches!(
        scheme.to_ascii_lowercase().as_str(),
        "redis" | "rediss" | "unix" | "redis+unix"
    ) {
        return Err(ConfigError::invalid(field, "unsupported_scheme", value));
    }
    if rest.is_empty() {
        return Err(ConfigError::invalid(field, "missing_host", value));
    }
    Ok(trimmed.to_string())
}

/// Parse a TCP port, rejecting zero.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a port in `1..=65535`.
pub fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, "out_of_range", value))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(port)
}

/// Parse an IP address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IPv4/IPv6 address.
pub fn parse_ip(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::invalid(field, "not_an_ip", value))
}

/// Parse a strictly positive `u64`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a number or is zero.
pub fn parse_positive_u64(field: &'static str, value: &str) -> ConfigResult<u64> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", value))?;
    if parsed == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(parsed)
}

/// Parse a strictly positive `u32`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a number, is zero,
/// or exceeds `u32::MAX`.
pub fn parse_positive_u32(field: &'static str, value: &str) -> ConfigResult<u32> {
    let parsed = parse_positive_u64(field, value)?;
    u32::try_from(parsed).map_err(|_| ConfigError::invalid(field, "out_of_range", value))
}

/// Parse a strictly positive `usize`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a number, is zero,
/// or does not fit the platform word size.
pub fn parse_positive_usize(field: &'static str, value: &str) -> ConfigResult<usize> {
    let parsed = parse_positive_u64(field, value)?;
    usize::try_from(parsed).map_err(|_| ConfigError::invalid(field, "out_of_range", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_spellings() -> ConfigResult<()> {
        assert!(parse_flag("FLAG", "Yes")?);
        assert!(parse_flag("FLAG", " on ")?);
        assert!(!parse_flag("FLAG", "0")?);
        assert!(!parse_flag("FLAG", "off")?);
        assert!(parse_flag("FLAG", "maybe").is_err());
        Ok(())
    }

    #[test]
    fn parse_port_rejects_zero_and_overflow() {
        assert_eq!(parse_port("PORT", "8000").ok(), Some(8000));
        assert!(matches!(
            parse_port("PORT", "0"),
            Err(ConfigError::InvalidField { reason: "zero", .. })
        ));
        assert!(matches!(
            parse_port("PORT", "70000"),
            Err(ConfigError::InvalidField {
                reason: "out_of_range",
                ..
            })
        ));
    }

    #[test]
    fn parse_positive_numbers_reject_zero() {
        assert_eq!(parse_positive_u32("N", "5").ok(), Some(5));
        assert!(parse_positive_u32("N", "0").is_err());
        assert!(parse_positive_u32("N", "4294967296").is_err());
        assert_eq!(parse_positive_usize("N", "50").ok(), Some(50));
        assert!(parse_positive_u64("N", "-1").is_err());
    }

    #[test]
    fn parse_ip_handles_v4_and_v6() {
        assert!(parse_ip("ADDR", "0.0.0.0").is_ok());
        assert!(parse_ip("ADDR", "::1").is_ok());
        assert!(parse_ip("ADDR", "localhost").is_err());
    }
}
