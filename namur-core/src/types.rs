//! Device state and action parameter types
//!
//! Action parameters arrive from an orchestration layer as loosely typed JSON
//! values. They are coerced leniently: anything that is not numeric-like
//! becomes 0 instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Default temperature setpoint in degrees before any command is issued
pub const DEFAULT_TEMP_TARGET: f64 = 20.0;

/// Stirring status, derived from the commanded speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Stir speed is zero
    Idle,
    /// Stir speed is non-zero
    Running,
}

impl DeviceStatus {
    /// Derive the status from a stir speed
    pub fn from_speed(stir_speed: f64) -> Self {
        if stir_speed == 0.0 {
            DeviceStatus::Idle
        } else {
            DeviceStatus::Running
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Idle => "Idle",
            DeviceStatus::Running => "Running",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the vessel an action applies to
///
/// The orchestration layer passes either a bare identifier or an object
/// carrying an `id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VesselRef {
    PlainId(String),
    Structured(Map<String, Value>),
}

impl VesselRef {
    /// Extract the vessel identifier
    ///
    /// A missing, null or non-scalar `id` yields an empty string.
    pub fn id(&self) -> String {
        match self {
            VesselRef::PlainId(id) => id.clone(),
            VesselRef::Structured(fields) => match fields.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => String::new(),
            },
        }
    }
}

impl Default for VesselRef {
    fn default() -> Self {
        VesselRef::PlainId(String::new())
    }
}

impl From<&str> for VesselRef {
    fn from(id: &str) -> Self {
        VesselRef::PlainId(id.to_string())
    }
}

impl From<String> for VesselRef {
    fn from(id: String) -> Self {
        VesselRef::PlainId(id)
    }
}

impl From<Value> for VesselRef {
    fn from(value: Value) -> Self {
        match value {
            Value::String(id) => VesselRef::PlainId(id),
            Value::Object(fields) => VesselRef::Structured(fields),
            Value::Number(n) => VesselRef::PlainId(n.to_string()),
            _ => VesselRef::default(),
        }
    }
}

/// Parameters of a timed stir-then-settle sequence
///
/// Unknown fields sent by the orchestration layer (vessel, time, time_spec,
/// event, ...) are kept in `extra` and otherwise ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StirParams {
    /// Stirring duration in seconds
    #[serde(default)]
    pub stir_time: Value,
    /// Stirring speed in RPM
    #[serde(default)]
    pub stir_speed: Value,
    /// Settling duration in seconds after the motor stops
    #[serde(default)]
    pub settling_time: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StirParams {
    pub fn new(
        stir_time: impl Into<Value>,
        stir_speed: impl Into<Value>,
        settling_time: impl Into<Value>,
    ) -> Self {
        Self {
            stir_time: stir_time.into(),
            stir_speed: stir_speed.into(),
            settling_time: settling_time.into(),
            extra: Map::new(),
        }
    }

    /// Coerced stirring duration in seconds
    pub fn stir_seconds(&self) -> f64 {
        coerce_seconds(&self.stir_time)
    }

    /// Coerced stirring speed in RPM
    pub fn speed_rpm(&self) -> i64 {
        coerce_rpm(&self.stir_speed)
    }

    /// Coerced settling duration in seconds
    pub fn settle_seconds(&self) -> f64 {
        coerce_seconds(&self.settling_time)
    }
}

/// Interpret a JSON value as a float
///
/// Numbers, numeric strings (surrounding whitespace allowed) and booleans are
/// accepted. Everything else, including NaN and infinities, yields `None`.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Truncate a float toward zero, mapping non-finite input to 0
pub fn truncate_whole(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

/// Coerce a speed parameter to integer RPM, 0 when not numeric
pub fn coerce_rpm(value: &Value) -> i64 {
    numeric_value(value).map(truncate_whole).unwrap_or(0)
}

/// Coerce a duration parameter to seconds, clamping negatives and junk to 0
pub fn coerce_seconds(value: &Value) -> f64 {
    numeric_value(value).map(|s| s.max(0.0)).unwrap_or(0.0)
}
