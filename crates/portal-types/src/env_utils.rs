//! Environment variable parsing utilities.
//!
//! Type-safe helpers for reading configuration overrides from the
//! environment, eliminating repeated boilerplate like:
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
///
/// # Example
///
/// ```
/// use portal_types::env_utils::env_var_or;
///
/// let timeout: u64 = env_var_or("PORTAL_RPC_TIMEOUT_MS", 7000);
/// ```
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Interpret an environment variable as a boolean flag.
///
/// `1`, `true`, `yes`, and `on` (case-insensitive) are true; anything else,
/// including an unset variable, is false.
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}
