/// Read `LOCKWARD_{key}`, falling back to the bare `{key}`
///
/// The fallback keeps platform-provided variables such as `PORT` working.
///
/// ```rust,ignore
/// // Checks LOCKWARD_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("LOCKWARD_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Read a boolean flag with the same lookup as [`get_env_with_prefix`].
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`. Anything else
/// is treated as unset.
pub fn env_flag(key: &str) -> Option<bool> {
    parse_flag(&get_env_with_prefix(key)?)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("LOCKWARD_ENV_TEST_PREFIXED", "prefixed_value");
            std::env::set_var("ENV_TEST_PREFIXED", "ignored");
            std::env::set_var("ENV_TEST_FALLBACK", "unprefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("ENV_TEST_PREFIXED"),
            Some("prefixed_value".to_string())
        );
        assert_eq!(
            get_env_with_prefix("ENV_TEST_FALLBACK"),
            Some("unprefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("LOCKWARD_ENV_TEST_PREFIXED");
            std::env::remove_var("ENV_TEST_PREFIXED");
            std::env::remove_var("ENV_TEST_FALLBACK");
        }

        assert_eq!(get_env_with_prefix("ENV_TEST_MISSING"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
