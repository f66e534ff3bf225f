//! The closed error-kind set shared across every layer.

use thiserror::Error;

/// Platform-wide error. Every cross-stage boundary returns a `Result` using
/// this type rather than relying on thrown/panicking control flow; `Fatal`
/// is the only variant a caller may choose to convert into a process abort,
/// at a top-level boundary only.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("circuit open for {agent_name}/{tenant_id:?}")]
    CircuitOpen {
        agent_name: String,
        tenant_id: Option<String>,
    },

    #[error("tool invocation failed: tool={tool_name} attempts={attempts} last_error={last_error}")]
    ToolInvocationFailed {
        tool_name: String,
        attempts: u32,
        last_error: String,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

impl PlatformError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::ValidationFailed(_) => "ValidationFailed",
            PlatformError::NotFound(_) => "NotFound",
            PlatformError::NotAllowed(_) => "NotAllowed",
            PlatformError::Timeout(_) => "Timeout",
            PlatformError::ProviderError(_) => "ProviderError",
            PlatformError::CircuitOpen { .. } => "CircuitOpen",
            PlatformError::ToolInvocationFailed { .. } => "ToolInvocationFailed",
            PlatformError::Conflict(_) => "Conflict",
            PlatformError::Fatal(_) => "Fatal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_closed_set() {
        assert_eq!(PlatformError::ValidationFailed("x".into()).kind(), "ValidationFailed");
        assert_eq!(
            PlatformError::ToolInvocationFailed {
                tool_name: "t".into(),
                attempts: 1,
                last_error: "e".into()
            }
            .kind(),
            "ToolInvocationFailed"
        );
    }
}
