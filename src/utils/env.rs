/// Get environment variable with ROOMSTAY_ prefix, falling back to unprefixed version
///
/// Checks `ROOMSTAY_{key}` first, then `{key}`, so deployments can use either
/// the namespaced form or the conventional one (`PORT`, `ENV`, ...).
///
/// # Examples
///
/// ```rust
/// use roomstay::utils::get_env_with_prefix;
///
/// // Checks ROOMSTAY_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("ROOMSTAY_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a boolean-ish environment value (`true/false`, `1/0`, `yes/no`, `on/off`)
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
