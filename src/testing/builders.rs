//! Terse constructors for wire messages.

use crate::protocol::{
    Detection, EventPayload, InferenceMessage, Keypoint, Regions, Track, TrackerMessage,
    INFERENCE_TOPIC, TRACKER_TOPIC,
};

pub fn keypoint(name: &str, conf: f64) -> Keypoint {
    Keypoint {
        name: name.to_string(),
        x: 0.5,
        y: 0.5,
        conf,
    }
}

pub fn detection(person_id: u32, confidence: f64, keypoints: Vec<Keypoint>) -> Detection {
    Detection {
        person_id,
        bbox: [100.0, 100.0, 200.0, 300.0],
        keypoints,
        confidence,
        imov: 0.0,
    }
}

pub fn inference(frame_id: u64, detections: Vec<Detection>) -> InferenceMessage {
    InferenceMessage {
        timestamp: 1_700_000_000.0 + frame_id as f64 / 6.0,
        frame_id,
        detections,
    }
}

pub fn track(person_id: u32) -> Track {
    Track {
        person_id,
        bbox_smoothed: [100.0, 100.0, 200.0, 300.0],
        keypoints: Vec::new(),
        stability: 0.9,
    }
}

pub fn tracker(event: Option<&str>, tracks: Vec<Track>) -> TrackerMessage {
    TrackerMessage {
        timestamp: 0.0,
        event: event.map(str::to_string),
        event_payload: None,
        regions: Regions::default(),
        tracks,
    }
}

pub fn tracker_with_payload(event: &str, payload: EventPayload) -> TrackerMessage {
    TrackerMessage {
        event_payload: Some(payload),
        ..tracker(Some(event), Vec::new())
    }
}

/// Wire JSON for an inference message, topic included
pub fn inference_json(message: &InferenceMessage) -> String {
    with_topic(INFERENCE_TOPIC, serde_json::to_value(message))
}

/// Wire JSON for a tracker message, topic included
pub fn tracker_json(message: &TrackerMessage) -> String {
    with_topic(TRACKER_TOPIC, serde_json::to_value(message))
}

fn with_topic(topic: &str, value: serde_json::Result<serde_json::Value>) -> String {
    let mut value = value.unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.insert("topic".to_string(), topic.into());
    }
    value.to_string()
}
