//! Delivery dispatcher.
//!
//! Runs the retry loop over a [`Transport`] collaborator. The transport
//! owns actual HTTP/socket I/O and lives outside this workspace; here it is
//! a trait so tests can script outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use framebridge_core::RetryPolicyConfig;
use framebridge_mapping::OutboundRecord;

use crate::error::DeliveryError;
use crate::retry::{AttemptOutcome, RetryPolicy};

/// What the transport reports for one completed call.
#[derive(Debug, Clone)]
pub struct TransportReceipt {
    /// Application-level status code.
    pub status: u16,
    pub body: Option<String>,
}

/// Delivery collaborator: accepts an outbound record, performs one call.
///
/// Implementations return `Err` only for transport-level failures; a call
/// that completed with a non-2xx status is a successful transport call and
/// comes back as a receipt. The dispatcher decides retryability for both.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, record: &OutboundRecord) -> Result<TransportReceipt, DeliveryError>;
}

/// Final result of a delivery, after retries.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub message_id: Uuid,
    pub status: u16,
    pub body: Option<String>,
    /// Attempts actually made.
    pub attempts: u32,
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, config: RetryPolicyConfig) -> Self {
        Self {
            transport,
            policy: RetryPolicy::new(config),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver one record, retrying per policy. Propagates the last failure
    /// after exhaustion; non-retryable failures propagate immediately.
    pub async fn deliver(&self, record: OutboundRecord) -> Result<DeliveryReceipt, DeliveryError> {
        let message_id = record.meta.message_id;
        let endpoint = record.endpoint.clone();
        let transport = self.transport.clone();
        let config = self.policy.config().clone();
        let shared = Arc::new(record);

        debug!(%message_id, endpoint = %endpoint, "dispatching record");
        let (attempts, receipt) = self
            .policy
            .execute(move |attempt| {
                let transport = transport.clone();
                let config = config.clone();
                let mut attempt_record = (*shared).clone();
                attempt_record.meta.attempts = attempt;
                async move {
                    match transport.send(&attempt_record).await {
                        Ok(receipt) => classify_receipt(attempt, receipt, &config),
                        Err(e) if e.is_retryable(&config) => AttemptOutcome::Retryable(e),
                        Err(e) => AttemptOutcome::Fatal(e),
                    }
                }
            })
            .await?;

        info!(%message_id, endpoint = %endpoint, status = receipt.status, attempts, "delivered");
        Ok(DeliveryReceipt {
            message_id,
            status: receipt.status,
            body: receipt.body,
            attempts,
        })
    }
}

/// A completed call is a success only for 2xx; a retryable status code is
/// folded into the same retryable branch as transport failures.
fn classify_receipt(
    attempt: u32,
    receipt: TransportReceipt,
    config: &RetryPolicyConfig,
) -> AttemptOutcome<(u32, TransportReceipt)> {
    if (200..300).contains(&receipt.status) {
        return AttemptOutcome::Success((attempt, receipt));
    }
    let error = DeliveryError::Status {
        code: receipt.status,
    };
    if error.is_retryable(config) {
        AttemptOutcome::Retryable(error)
    } else {
        AttemptOutcome::Fatal(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framebridge_core::{ParsedRecord, RawFrame, RetryMode};
    use framebridge_mapping::OutboundMeta;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn outbound() -> OutboundRecord {
        let frame = Arc::new(RawFrame::new("dev-1", "COM3", vec![1]));
        OutboundRecord {
            endpoint: "telemetry".to_string(),
            method: "POST".to_string(),
            content_type: "application/json".to_string(),
            payload: HashMap::new(),
            meta: OutboundMeta::new(0),
            record: Arc::new(ParsedRecord::from_frame(frame, "r")),
        }
    }

    /// Transport that replays a scripted list of responses.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<TransportReceipt, DeliveryError>>>,
        calls: AtomicUsize,
        seen_attempts: Mutex<Vec<u32>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportReceipt, DeliveryError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                seen_attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            record: &OutboundRecord,
        ) -> Result<TransportReceipt, DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_attempts.lock().unwrap().push(record.meta.attempts);
            self.script.lock().unwrap().remove(0)
        }
    }

    fn ok(status: u16) -> Result<TransportReceipt, DeliveryError> {
        Ok(TransportReceipt { status, body: None })
    }

    fn fast_config(mode: RetryMode, max_attempts: u32) -> RetryPolicyConfig {
        RetryPolicyConfig {
            max_attempts,
            base_delay_ms: 1,
            mode,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(200)]));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            fast_config(RetryMode::Exponential, 3),
        );
        let receipt = dispatcher.deliver(outbound()).await.unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.attempts, 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retryable_status_retries_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(503), ok(200)]));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            fast_config(RetryMode::Fixed, 3),
        );
        let receipt = dispatcher.deliver(outbound()).await.unwrap();
        assert_eq!(receipt.attempts, 2);
        // The record handed to the transport carries the attempt counter.
        assert_eq!(*transport.seen_attempts.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_non_retryable_status_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(400), ok(200)]));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            fast_config(RetryMode::Fixed, 3),
        );
        let err = dispatcher.deliver(outbound()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status { code: 400 }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_network_errors_retry_until_exhausted() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(DeliveryError::Network("reset".into())),
            Err(DeliveryError::Timeout("10s".into())),
            Err(DeliveryError::Network("reset".into())),
        ]));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            fast_config(RetryMode::Fixed, 3),
        );
        let err = dispatcher.deliver(outbound()).await.unwrap_err();
        match err {
            DeliveryError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DeliveryError::Network(_)));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_transport_error_short_circuits() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(DeliveryError::Fatal(
            "unserializable".into(),
        ))]));
        let dispatcher = Dispatcher::new(
            transport.clone(),
            fast_config(RetryMode::Exponential, 5),
        );
        let err = dispatcher.deliver(outbound()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Fatal(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
