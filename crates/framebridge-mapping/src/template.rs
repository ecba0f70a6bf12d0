//! Reserved-word templating.
//!
//! Tokens are `@` followed by word characters, matched case-insensitively
//! anywhere in a template string. `@guid` generates a fresh identifier per
//! occurrence; two `@guid` tokens in one template expand to two different
//! values, which is intentional. Unknown tokens are left unchanged and
//! logged as warnings.

use std::sync::OnceLock;

use chrono::{DateTime, Local, Utc};
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

/// Placeholder used when `@deviceId` is requested but no device id is
/// configured.
const UNKNOWN_DEVICE: &str = "unknown-device";

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\w+)").expect("token regex is valid"))
}

/// Time source, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now_local(&self) -> DateTime<Local>;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Expands reserved words inside string templates.
pub struct TemplateEngine {
    device_id: Option<String>,
    clock: Box<dyn Clock>,
}

impl TemplateEngine {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            device_id,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(device_id: Option<String>, clock: Box<dyn Clock>) -> Self {
        Self { device_id, clock }
    }

    /// Expand every `@token` occurrence in `template`.
    pub fn expand(&self, template: &str) -> String {
        if !template.contains('@') {
            return template.to_string();
        }
        token_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let token = &caps[1];
                match token.to_ascii_lowercase().as_str() {
                    "compacttime" => self.clock.now_local().format("%Y%m%d%H%M%S").to_string(),
                    "mediumtime" => self
                        .clock
                        .now_local()
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                    "shorttime" => self.clock.now_local().format("%H:%M:%S").to_string(),
                    "timestamp" => self.clock.now_local().to_rfc3339(),
                    "unixtime" => self.clock.now_utc().timestamp().to_string(),
                    "deviceid" => self
                        .device_id
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
                    // Fresh per occurrence, deliberately non-idempotent.
                    "guid" => Uuid::new_v4().to_string(),
                    _ => {
                        warn!(token = %token, "unknown reserved word left unexpanded");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}
