//! End-to-end pipeline: raw frame -> rule match -> parse -> map -> deliver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use framebridge_core::{
    EndpointConfig, FieldType, FieldValue, FrameFormat, MappingRule, RawFrame, RetryMode,
    RetryPolicyConfig, Rule,
};
use framebridge_delivery::{DeliveryError, Dispatcher, Transport, TransportReceipt};
use framebridge_mapping::MappingEngine;
use framebridge_parsers::{ParserSelector, RuleMatcher};

/// Transport that replays scripted responses and records the payloads it saw.
struct ScriptedTransport {
    script: Mutex<Vec<Result<TransportReceipt, DeliveryError>>>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<TransportReceipt, DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        record: &framebridge_mapping::OutboundRecord,
    ) -> Result<TransportReceipt, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(record.payload_json());
        self.script.lock().unwrap().remove(0)
    }
}

fn ok(status: u16) -> Result<TransportReceipt, DeliveryError> {
    Ok(TransportReceipt { status, body: None })
}

fn telemetry_endpoint() -> EndpointConfig {
    EndpointConfig {
        name: "telemetry".to_string(),
        url: "https://api.example.com/telemetry".to_string(),
        method: "POST".to_string(),
        content_type: "application/json".to_string(),
        priority: 0,
        mapping_rules: vec![MappingRule {
            source_field: "temp".to_string(),
            target_field: "temperature_f".to_string(),
            target_type: FieldType::Double,
            converter: Some("celsius_to_fahrenheit".to_string()),
            default_value: None,
            required: true,
        }],
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicyConfig {
    RetryPolicyConfig {
        max_attempts,
        base_delay_ms: 1,
        mode: RetryMode::Fixed,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_text_frame_reaches_endpoint() {
    let matcher = RuleMatcher::new(vec![Rule::new(
        "temp-report",
        FrameFormat::Text,
        r"TEMP:(\d+\.\d+)",
    )
    .with_field("temp", FieldType::Double)
    .with_priority(10)]);
    let selector = ParserSelector::with_cache(matcher.regex_cache());
    let engine = MappingEngine::new(vec![telemetry_endpoint()], Some("gw-1".to_string()));

    let frame = Arc::new(
        RawFrame::new("dev-1", "COM3", b"TEMP:25.6".to_vec()).with_format(FrameFormat::Text),
    );
    let rule = matcher.find_matching_rule(&frame).expect("rule matches");
    let parser = selector.select(&frame).expect("parser selected");
    let outcome = parser.parse(&frame, &rule);
    assert!(outcome.success, "{:?}", outcome.error);
    let record = Arc::new(outcome.record.unwrap());
    assert_eq!(record.field("temp"), Some(&FieldValue::Double(25.6)));

    let mapped = engine.map_to_outbound(&record, "telemetry");
    assert!(mapped.success);
    let outbound = mapped.record.unwrap();
    let fahrenheit = outbound
        .payload
        .get("temperature_f")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((fahrenheit - (25.6 * 1.8 + 32.0)).abs() < 1e-9);

    let transport = Arc::new(ScriptedTransport::new(vec![ok(200)]));
    let dispatcher = Dispatcher::new(transport.clone(), fast_retry(3));
    let receipt = dispatcher.deliver(outbound).await.unwrap();
    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.attempts, 1);

    let payloads = transport.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["deviceId"], "dev-1");
    assert_eq!(payloads[0]["dataSource"], "COM3");
    assert!(payloads[0]["temperature_f"].is_f64());
}

#[tokio::test]
async fn test_hex_frame_with_transient_failure() {
    let matcher = RuleMatcher::new(vec![Rule::new("counters", FrameFormat::Hex, "0:2:uint,2:2:uint")
        .with_field("f1", FieldType::Uint)
        .with_field("f2", FieldType::Uint)]);
    let selector = ParserSelector::new();
    let endpoint = EndpointConfig {
        mapping_rules: vec![MappingRule {
            source_field: "f1".to_string(),
            target_field: "counter".to_string(),
            target_type: FieldType::Long,
            converter: None,
            default_value: None,
            required: false,
        }],
        ..telemetry_endpoint()
    };
    let engine = MappingEngine::new(vec![endpoint], None);

    let frame =
        Arc::new(RawFrame::new("dev-2", "COM4", vec![0, 1, 0, 2]).with_format(FrameFormat::Hex));
    let rule = matcher.find_matching_rule(&frame).expect("rule matches");
    let outcome = selector.parser_for(FrameFormat::Hex).parse(&frame, &rule);
    let record = Arc::new(outcome.record.expect("parsed"));
    assert_eq!(record.field("f1"), Some(&FieldValue::Long(1)));
    assert_eq!(record.field("f2"), Some(&FieldValue::Long(2)));

    let outbound = engine.map_to_outbound(&record, "telemetry").record.unwrap();
    assert_eq!(outbound.payload.get("counter"), Some(&FieldValue::Long(1)));

    // First call gets a retryable status; the second succeeds.
    let transport = Arc::new(ScriptedTransport::new(vec![ok(503), ok(200)]));
    let dispatcher = Dispatcher::new(transport.clone(), fast_retry(3));
    let receipt = dispatcher.deliver(outbound).await.unwrap();
    assert_eq!(receipt.attempts, 2);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unmatched_frame_never_reaches_transport() {
    let matcher = RuleMatcher::new(vec![Rule::new(
        "temp-report",
        FrameFormat::Text,
        r"^TEMP:(\d+\.\d+)$",
    )
    .with_field("temp", FieldType::Double)]);

    let frame = Arc::new(
        RawFrame::new("dev-1", "COM3", b"PRESSURE:1013".to_vec()).with_format(FrameFormat::Text),
    );
    assert!(matcher.find_matching_rule(&frame).is_none());
}

#[tokio::test]
async fn test_batch_mapping_feeds_delivery() {
    let engine = Arc::new(MappingEngine::new(
        vec![telemetry_endpoint()],
        Some("gw-1".to_string()),
    ));
    let selector = ParserSelector::new();
    let rule = Rule::new("temp-report", FrameFormat::Text, r"TEMP:(\d+\.\d+)")
        .with_field("temp", FieldType::Double);

    let mut records = Vec::new();
    for payload in ["TEMP:20.0", "TEMP:21.5", "TEMP:23.0"] {
        let frame = Arc::new(
            RawFrame::new("dev-1", "COM3", payload.as_bytes().to_vec())
                .with_format(FrameFormat::Text),
        );
        let outcome = selector.parser_for(FrameFormat::Text).parse(&frame, &rule);
        records.push(Arc::new(outcome.record.expect("parsed")));
    }

    let results = engine.map_batch(records).await;
    assert_eq!(results.len(), 3);

    let transport = Arc::new(ScriptedTransport::new(vec![ok(200), ok(200), ok(200)]));
    let dispatcher = Dispatcher::new(transport.clone(), fast_retry(1));
    for result in results {
        assert!(result.success);
        dispatcher.deliver(result.record.unwrap()).await.unwrap();
    }
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
}
