// Frame statistics - per-message scalars shared by metrics and timeline
//
// Both the metrics reducer and the timeline derive their values from the
// same inference frame, so the arithmetic lives here once.

use std::collections::BTreeMap;

use crate::protocol::InferenceMessage;

/// Keypoints tracked individually on the metrics panel
pub const CRITICAL_KEYPOINTS: [&str; 5] = [
    "nose",
    "left_hand",
    "right_hand",
    "left_shoulder",
    "right_shoulder",
];

/// A keypoint counts as detected above this confidence
pub const KEYPOINT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Scalars derived from one inference frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Mean detection confidence, 0 for an empty frame
    pub avg_confidence: f64,
    pub detection_count: usize,
    /// Share of keypoints above threshold, 0 when the frame has none
    pub keypoint_detection_rate: f64,
}

impl FrameStats {
    pub fn from_message(message: &InferenceMessage) -> Self {
        Self {
            avg_confidence: average_confidence(message),
            detection_count: message.detections.len(),
            keypoint_detection_rate: keypoint_detection_rate(message),
        }
    }
}

/// Mean of `detections[].confidence`; exactly 0 (never NaN) with no detections.
pub fn average_confidence(message: &InferenceMessage) -> f64 {
    if message.detections.is_empty() {
        return 0.0;
    }
    let sum: f64 = message.detections.iter().map(|det| det.confidence).sum();
    sum / message.detections.len() as f64
}

/// Keypoints with confidence above threshold over all keypoints, across every
/// detection. Exactly 0 when the frame carries no keypoints.
pub fn keypoint_detection_rate(message: &InferenceMessage) -> f64 {
    let (valid, total) = message
        .detections
        .iter()
        .flat_map(|det| det.keypoints.iter())
        .fold((0usize, 0usize), |(valid, total), kp| {
            let hit = usize::from(kp.conf > KEYPOINT_CONFIDENCE_THRESHOLD);
            (valid + hit, total + 1)
        });

    if total == 0 {
        0.0
    } else {
        valid as f64 / total as f64
    }
}

/// Confidence per critical keypoint name, rebuilt from scratch each frame.
///
/// Names outside [`CRITICAL_KEYPOINTS`] are ignored; when several detections
/// carry the same name the last one wins.
pub fn critical_keypoints(message: &InferenceMessage) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    for kp in message.detections.iter().flat_map(|det| det.keypoints.iter()) {
        if CRITICAL_KEYPOINTS.contains(&kp.name.as_str()) {
            map.insert(kp.name.clone(), kp.conf);
        }
    }
    map
}
