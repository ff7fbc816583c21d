use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use uuid::Uuid;

const TELEMETRY_TARGET: &str = "goalgraph::events::telemetry";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchLifecycle {
    Start,
    Success,
    Failure,
}

impl fmt::Display for FetchLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "fetch_start"),
            Self::Success => write!(f, "fetch_success"),
            Self::Failure => write!(f, "fetch_failure"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchTelemetry {
    pub correlation_id: String,
    pub generation: u64,
    pub lifecycle: FetchLifecycle,
    pub error_reason: Option<String>,
    pub node_count: Option<usize>,
}

impl FetchTelemetry {
    pub fn start(correlation_id: &str, generation: u64) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            generation,
            lifecycle: FetchLifecycle::Start,
            error_reason: None,
            node_count: None,
        }
    }

    pub fn success(correlation_id: &str, generation: u64, node_count: usize) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            generation,
            lifecycle: FetchLifecycle::Success,
            error_reason: None,
            node_count: Some(node_count),
        }
    }

    pub fn failure(correlation_id: &str, generation: u64, reason: Option<String>) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            generation,
            lifecycle: FetchLifecycle::Failure,
            error_reason: reason,
            node_count: None,
        }
    }

    fn now_unix_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn fetch_start(correlation_id: &str, generation: u64) -> FetchTelemetry {
    let telemetry = FetchTelemetry::start(correlation_id, generation);
    info!(
        target: TELEMETRY_TARGET,
        correlation_id = %telemetry.correlation_id,
        generation = telemetry.generation,
        lifecycle = %telemetry.lifecycle,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_start"
    );
    telemetry
}

pub fn fetch_success(correlation_id: &str, generation: u64, node_count: usize) -> FetchTelemetry {
    let telemetry = FetchTelemetry::success(correlation_id, generation, node_count);
    info!(
        target: TELEMETRY_TARGET,
        correlation_id = %telemetry.correlation_id,
        generation = telemetry.generation,
        lifecycle = %telemetry.lifecycle,
        node_count = ?telemetry.node_count,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_success"
    );
    telemetry
}

pub fn fetch_failure(
    correlation_id: &str,
    generation: u64,
    reason: Option<String>,
) -> FetchTelemetry {
    let telemetry = FetchTelemetry::failure(correlation_id, generation, reason);
    let error_reason = telemetry.error_reason.as_deref().unwrap_or("unclassified");

    error!(
        target: TELEMETRY_TARGET,
        correlation_id = %telemetry.correlation_id,
        generation = telemetry.generation,
        lifecycle = %telemetry.lifecycle,
        error = %error_reason,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_failure"
    );

    telemetry
}
