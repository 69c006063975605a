//! Known application payloads.
//!
//! The session loop treats payloads as opaque; these views exist only so an
//! operator console can render the two notification kinds the service is
//! known to push.

use serde::Serialize;
use serde_json::Value;

const ERROR_LOG_TYPE: &str = "bike_error_log_notification";
const REALTIME_STATUS_TYPE: &str = "bike_realtime_status_notification";

const DEFAULT_TITLE: &str = "車輛異常通知";
const UNKNOWN_BIKE: &str = "unknown";

/// A recognized application notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A bike reported an error.
    BikeErrorLog(BikeErrorLog),
    /// Position and battery updates for one or more bikes.
    BikeStatus(Vec<BikeStatusUpdate>),
}

impl Notification {
    /// Recognize a decoded payload, or `None` for anything else.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        match payload.get("type").and_then(Value::as_str)? {
            ERROR_LOG_TYPE => {
                let data = payload.get("data").unwrap_or(&Value::Null);
                Some(Notification::BikeErrorLog(BikeErrorLog::from_data(data)))
            }
            REALTIME_STATUS_TYPE => {
                let updates = match payload.get("data") {
                    Some(Value::Array(items)) => {
                        items.iter().filter_map(BikeStatusUpdate::from_data).collect()
                    }
                    Some(item @ Value::Object(_)) => {
                        BikeStatusUpdate::from_data(item).into_iter().collect()
                    }
                    _ => Vec::new(),
                };
                Some(Notification::BikeStatus(updates))
            }
            _ => None,
        }
    }
}

/// Severity of a bike error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    /// Parse a level name; unknown names are treated as `Info`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "warning" => AlertLevel::Warning,
            "error" => AlertLevel::Error,
            "critical" => AlertLevel::Critical,
            _ => AlertLevel::Info,
        }
    }
}

/// A bike error notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BikeErrorLog {
    pub title: String,
    pub bike: String,
    pub level: AlertLevel,
}

impl BikeErrorLog {
    fn from_data(data: &Value) -> Self {
        let title = non_empty_text(data.get("title")).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let bike = non_empty_text(data.get("bike_id"))
            .or_else(|| non_empty_text(data.get("bike")))
            .unwrap_or_else(|| UNKNOWN_BIKE.to_string());
        let level = data
            .get("level")
            .and_then(Value::as_str)
            .map(AlertLevel::from_name)
            .unwrap_or(AlertLevel::Info);

        Self { title, bike, level }
    }
}

/// One bike's realtime status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BikeStatusUpdate {
    pub bike_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub soc: Option<f64>,
    pub speed: Option<f64>,
    pub last_seen: Option<String>,
}

impl BikeStatusUpdate {
    fn from_data(data: &Value) -> Option<Self> {
        Some(Self {
            bike_id: non_empty_text(data.get("bike_id"))?,
            lat: data.get("lat_decimal").and_then(Value::as_f64),
            lng: data.get("lng_decimal").and_then(Value::as_f64),
            soc: data.get("soc").and_then(Value::as_f64),
            speed: data.get("vehicle_speed").and_then(Value::as_f64),
            last_seen: data
                .get("last_seen")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Strings and numbers both identify bikes on the wire.
fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
