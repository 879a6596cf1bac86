// Protocol module - wire format of the tap stream
//
// One JSON object per transport frame, discriminated by `topic`:
// - "inference.tap": per-frame detections (InferenceMessage)
// - "tracker.tap": tracker emissions with regions, tracks and events (TrackerMessage)
//
// Anything else is dropped by the classifier without side effects.

pub mod classifier;
pub mod messages;

pub use classifier::{
    classify, classify_bytes, classify_value, dispatch, Classification, ClassificationKind,
    TapHandler,
};
pub use messages::{
    BoundingBox, Detection, EventPayload, InferenceMessage, Keypoint, Region, Regions, TapMessage,
    Track, TrackerMessage, INFERENCE_TOPIC, TRACKER_TOPIC,
};
