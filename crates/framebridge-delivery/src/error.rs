//! Delivery failure taxonomy.

use framebridge_core::RetryPolicyConfig;

/// Failures seen while delivering an outbound record.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Connect/reset style transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The call completed with an application-level status code.
    #[error("Endpoint returned status {code}")]
    Status { code: u16 },

    /// Failure that retrying cannot fix (bad request, auth, serialization).
    #[error("Fatal delivery error: {0}")]
    Fatal(String),

    /// All attempts consumed; carries the last underlying failure.
    #[error("Delivery failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<DeliveryError>,
    },
}

impl DeliveryError {
    /// Classification against the configured retryable sets.
    ///
    /// A completed call whose status code is in the retryable set counts as
    /// a retryable failure, so one loop handles transport errors and
    /// application-level retry signals uniformly.
    pub fn is_retryable(&self, config: &RetryPolicyConfig) -> bool {
        match self {
            Self::Network(_) => config.retry_on_network,
            Self::Timeout(_) => config.retry_on_timeout,
            Self::Status { code } => config.retryable_status_codes.contains(code),
            Self::Fatal(_) | Self::Exhausted { .. } => false,
        }
    }
}
