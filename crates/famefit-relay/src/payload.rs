//! Snapshot ↔ channel payload codec.
//!
//! The device channel carries flat key/value messages. A metrics message is
//! tagged with `"command": "groupWorkoutMetrics"`; values are copied
//! verbatim, with the timestamp as RFC 3339.

use chrono::{DateTime, Utc};
use famefit_core::error::CoreError;
use famefit_core::models::metrics::MetricsSnapshot;
use famefit_core::ports::device_channel::ChannelPayload;
use serde_json::Value;

pub const COMMAND_KEY: &str = "command";
pub const METRICS_COMMAND: &str = "groupWorkoutMetrics";

const WORKOUT_ID_KEY: &str = "workoutID";
const TIMESTAMP_KEY: &str = "timestamp";
const HEART_RATE_KEY: &str = "heartRate";
const ACTIVE_ENERGY_KEY: &str = "activeEnergy";
const DISTANCE_KEY: &str = "distance";
const ELAPSED_TIME_KEY: &str = "elapsedTime";
const AVERAGE_HEART_RATE_KEY: &str = "averageHeartRate";
const IS_RUNNING_KEY: &str = "isRunning";

/// Encode a snapshot as a channel message
pub fn encode_snapshot(snapshot: &MetricsSnapshot) -> ChannelPayload {
    let mut payload = ChannelPayload::new();
    payload.insert(COMMAND_KEY.into(), Value::from(METRICS_COMMAND));
    payload.insert(WORKOUT_ID_KEY.into(), Value::from(snapshot.workout_id.as_str()));
    payload.insert(
        TIMESTAMP_KEY.into(),
        Value::from(snapshot.timestamp.to_rfc3339()),
    );
    payload.insert(HEART_RATE_KEY.into(), Value::from(snapshot.heart_rate));
    payload.insert(ACTIVE_ENERGY_KEY.into(), Value::from(snapshot.active_energy));
    payload.insert(DISTANCE_KEY.into(), Value::from(snapshot.distance));
    payload.insert(ELAPSED_TIME_KEY.into(), Value::from(snapshot.elapsed_time));
    payload.insert(
        AVERAGE_HEART_RATE_KEY.into(),
        Value::from(snapshot.average_heart_rate),
    );
    payload.insert(IS_RUNNING_KEY.into(), Value::from(snapshot.is_running));
    payload
}

/// Whether `payload` is a metrics message
pub fn is_metrics_message(payload: &ChannelPayload) -> bool {
    payload.get(COMMAND_KEY).and_then(Value::as_str) == Some(METRICS_COMMAND)
}

/// Decode a metrics message back into a snapshot
pub fn decode_snapshot(payload: &ChannelPayload) -> Result<MetricsSnapshot, CoreError> {
    if !is_metrics_message(payload) {
        return Err(CoreError::payload(
            COMMAND_KEY,
            format!("expected \"{METRICS_COMMAND}\""),
        ));
    }

    let timestamp = DateTime::parse_from_rfc3339(get_str(payload, TIMESTAMP_KEY)?)
        .map_err(|e| CoreError::payload(TIMESTAMP_KEY, e.to_string()))?
        .with_timezone(&Utc);

    Ok(MetricsSnapshot {
        workout_id: get_str(payload, WORKOUT_ID_KEY)?.to_string(),
        timestamp,
        heart_rate: get_f64(payload, HEART_RATE_KEY)?,
        active_energy: get_f64(payload, ACTIVE_ENERGY_KEY)?,
        distance: get_f64(payload, DISTANCE_KEY)?,
        elapsed_time: get_f64(payload, ELAPSED_TIME_KEY)?,
        average_heart_rate: get_f64(payload, AVERAGE_HEART_RATE_KEY)?,
        is_running: payload
            .get(IS_RUNNING_KEY)
            .and_then(Value::as_bool)
            .ok_or_else(|| CoreError::payload(IS_RUNNING_KEY, "missing or not a bool"))?,
    })
}

fn get_str<'a>(payload: &'a ChannelPayload, key: &str) -> Result<&'a str, CoreError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::payload(key, "missing or not a string"))
}

fn get_f64(payload: &ChannelPayload, key: &str) -> Result<f64, CoreError> {
    payload
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| CoreError::payload(key, "missing or not a number"))
}
