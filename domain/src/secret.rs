//! Secret masking: a fixed function every log line or
//! serialized diagnostic that mentions a credential must go through before
//! it can be written anywhere.

/// Masks a secret value for safe logging.
///
/// - empty or all-whitespace input → `""`.
/// - starts with `"sk-"` → `"sk-***"`.
/// - starts with `"sk_live_"` → `"sk_live_***"`.
/// - starts with `"sk_test_"` → `"sk_test_***"`.
/// - starts with `"Bearer "` → `"Bearer ***"`.
/// - anything else non-empty → `"***masked***"`.
pub fn mask_secret(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("sk-") {
        "sk-***".to_string()
    } else if trimmed.starts_with("sk_live_") {
        "sk_live_***".to_string()
    } else if trimmed.starts_with("sk_test_") {
        "sk_test_***".to_string()
    } else if trimmed.starts_with("Bearer ") {
        "Bearer ***".to_string()
    } else {
        "***masked***".to_string()
    }
}
