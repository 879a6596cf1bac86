// Message classifier - routes raw frames by their topic discriminant
//
// Every raw frame ends in exactly one `Classification`. Malformed JSON, a
// missing or non-string `topic`, and a known topic whose body violates the
// schema are all `SchemaInvalid`; a well-formed object with any other topic
// is `UnknownTopic`. Only `Decoded` frames reach the reducers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::messages::{InferenceMessage, TapMessage, TrackerMessage, INFERENCE_TOPIC, TRACKER_TOPIC};

/// Outcome of classifying one raw frame
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Accepted message, ready for dispatch
    Decoded(TapMessage),
    /// Not JSON, not an object, no topic, or a body that fails the schema
    SchemaInvalid { reason: String },
    /// Well-formed object carrying a topic nobody handles
    UnknownTopic { topic: String },
}

/// Coarse outcome kind, used for counters and telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    Decoded,
    SchemaInvalid,
    UnknownTopic,
}

impl Classification {
    pub fn kind(&self) -> ClassificationKind {
        match self {
            Classification::Decoded(_) => ClassificationKind::Decoded,
            Classification::SchemaInvalid { .. } => ClassificationKind::SchemaInvalid,
            Classification::UnknownTopic { .. } => ClassificationKind::UnknownTopic,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, Classification::Decoded(_))
    }
}

/// Receives classified messages, one call per accepted frame
pub trait TapHandler {
    fn on_inference(&self, message: InferenceMessage);
    fn on_tracker(&self, message: TrackerMessage);
}

/// Classify a text frame.
pub fn classify(raw: &str) -> Classification {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            return Classification::SchemaInvalid {
                reason: format!("invalid JSON: {}", err),
            }
        }
    };
    classify_value(value)
}

/// Classify a binary frame; the payload must be UTF-8 JSON.
pub fn classify_bytes(raw: &[u8]) -> Classification {
    match std::str::from_utf8(raw) {
        Ok(text) => classify(text),
        Err(err) => Classification::SchemaInvalid {
            reason: format!("binary frame is not UTF-8: {}", err),
        },
    }
}

/// Classify an already-parsed JSON value.
pub fn classify_value(value: Value) -> Classification {
    let topic = match value.get("topic") {
        Some(Value::String(topic)) => topic.clone(),
        Some(_) => {
            return Classification::SchemaInvalid {
                reason: "topic is not a string".to_string(),
            }
        }
        None => {
            return Classification::SchemaInvalid {
                reason: "missing topic".to_string(),
            }
        }
    };

    match topic.as_str() {
        INFERENCE_TOPIC => match serde_json::from_value::<InferenceMessage>(value) {
            Ok(message) => Classification::Decoded(TapMessage::Inference(message)),
            Err(err) => Classification::SchemaInvalid {
                reason: format!("{}: {}", INFERENCE_TOPIC, err),
            },
        },
        TRACKER_TOPIC => match serde_json::from_value::<TrackerMessage>(value) {
            Ok(message) => Classification::Decoded(TapMessage::Tracker(message)),
            Err(err) => Classification::SchemaInvalid {
                reason: format!("{}: {}", TRACKER_TOPIC, err),
            },
        },
        _ => Classification::UnknownTopic { topic },
    }
}

/// Route a classification to its handler.
///
/// Rejected outcomes are a no-op here; the caller decides whether to log
/// them. Returns the outcome kind.
pub fn dispatch<H: TapHandler + ?Sized>(
    classification: Classification,
    handler: &H,
) -> ClassificationKind {
    let kind = classification.kind();
    match classification {
        Classification::Decoded(TapMessage::Inference(message)) => handler.on_inference(message),
        Classification::Decoded(TapMessage::Tracker(message)) => handler.on_tracker(message),
        Classification::SchemaInvalid { .. } | Classification::UnknownTopic { .. } => {}
    }
    kind
}
