/// Parse "true"/"false"/"1"/"0" from an owned String.
pub fn parse_bool_flag(s: String) -> Option<bool> {
    parse_bool_str(&s)
}

/// Parse "true"/"false"/"1"/"0" from a &str.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean override from an env var, if set and parseable.
pub fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(parse_bool_flag)
}

/// Read a millisecond duration from an env var, if set and parseable.
pub fn env_duration_ms(name: &str) -> Option<std::time::Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(std::time::Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_helpers() {
        assert_eq!(parse_bool_str("true"), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_flag("YES".to_string()), Some(true));
        assert_eq!(parse_bool_flag("off".to_string()), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_env_duration_ms_parses_integers() {
        std::env::set_var("DOCPANEL_TEST_DURATION", "750");
        assert_eq!(
            env_duration_ms("DOCPANEL_TEST_DURATION"),
            Some(std::time::Duration::from_millis(750))
        );
        std::env::set_var("DOCPANEL_TEST_DURATION", "not-a-number");
        assert_eq!(env_duration_ms("DOCPANEL_TEST_DURATION"), None);
        std::env::remove_var("DOCPANEL_TEST_DURATION");
    }
}
