//! Wire types for the two tap topics.
//!
//! Field names follow the producer's JSON (snake_case). Optional and
//! collection fields default when absent so that a producer omitting them
//! never causes a frame to be rejected.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Topic discriminant of detection frames
pub const INFERENCE_TOPIC: &str = "inference.tap";
/// Topic discriminant of tracker emissions
pub const TRACKER_TOPIC: &str = "tracker.tap";

/// Axis-aligned box in canvas pixel space: x, y, width, height
pub type BoundingBox = [f64; 4];

/// Named anatomical landmark with per-point confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub conf: f64,
}

/// One frame's raw observation of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Reused per tracked individual, not unique across frames
    pub person_id: u32,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    pub confidence: f64,
    /// Motion index, unitless; higher means more motion
    #[serde(default)]
    pub imov: f64,
}

/// One message per detection frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceMessage {
    pub timestamp: f64,
    /// Monotonically increasing, may skip under load
    pub frame_id: u64,
    pub detections: Vec<Detection>,
}

/// Detail attached to a tracker event; every field is optional.
///
/// The typed accessors validate the known fields. The raw entries keep the
/// producer's key order, including keys outside the schema, and are what
/// gets rendered and re-serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    known: KnownPayloadFields,
    entries: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct KnownPayloadFields {
    #[serde(default)]
    person_id: Option<u32>,
    #[serde(default)]
    keypoints_outside: Option<Vec<String>>,
    #[serde(default)]
    distance_cm: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    all_keypoints_outside_bed: Option<bool>,
    #[serde(default)]
    imov: Option<f64>,
}

impl EventPayload {
    /// Build from a JSON object; known fields must have their schema types.
    pub fn from_entries(entries: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let known = serde_json::from_value(Value::Object(entries.clone()))?;
        Ok(Self { known, entries })
    }

    pub fn person_id(&self) -> Option<u32> {
        self.known.person_id
    }

    pub fn keypoints_outside(&self) -> Option<&[String]> {
        self.known.keypoints_outside.as_deref()
    }

    pub fn distance_cm(&self) -> Option<f64> {
        self.known.distance_cm
    }

    pub fn confidence(&self) -> Option<f64> {
        self.known.confidence
    }

    pub fn all_keypoints_outside_bed(&self) -> Option<bool> {
        self.known.all_keypoints_outside_bed
    }

    pub fn imov(&self) -> Option<f64> {
        self.known.imov
    }

    /// Raw value of any field, schema or not
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Every field in wire order
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl<'de> Deserialize<'de> for EventPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(D::Error::custom)
    }
}

impl Serialize for EventPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// State of a named spatial zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Set on the bed region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupied: Option<bool>,
    /// Set on the door region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossed: Option<bool>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Polygon outline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Regions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<Region>,
}

/// Tracker's smoothed, identity-persistent view of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub person_id: u32,
    pub bbox_smoothed: BoundingBox,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    /// In [0, 1]
    #[serde(default)]
    pub stability: f64,
}

/// One message per tracker emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerMessage {
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_payload: Option<EventPayload>,
    #[serde(default)]
    pub regions: Regions,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl TrackerMessage {
    /// Event tag, if present and non-empty
    pub fn event_tag(&self) -> Option<&str> {
        self.event.as_deref().filter(|tag| !tag.is_empty())
    }
}

/// A decoded message of an accepted topic
#[derive(Debug, Clone, PartialEq)]
pub enum TapMessage {
    Inference(InferenceMessage),
    Tracker(TrackerMessage),
}

impl TapMessage {
    pub fn topic(&self) -> &'static str {
        match self {
            TapMessage::Inference(_) => INFERENCE_TOPIC,
            TapMessage::Tracker(_) => TRACKER_TOPIC,
        }
    }
}
