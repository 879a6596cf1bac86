// Rolling metrics reducer
//
// SystemMetrics is overwritten in place by three independent inputs:
// inference frames, tracker emissions and the connection manager's
// throughput tick. Nothing here keeps history; the timeline does that.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::frame_stats::{
    critical_keypoints, FrameStats, CRITICAL_KEYPOINTS, KEYPOINT_CONFIDENCE_THRESHOLD,
};
use crate::protocol::{InferenceMessage, TrackerMessage};

/// Derived scalars shown on the live metrics panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    /// Decoded messages per second over the last throughput window
    pub fps: f64,
    pub avg_confidence: f64,
    pub active_tracks: usize,
    pub detections_per_frame: usize,
    /// Percentage of frame ids skipped by the producer this session
    pub drop_frames: f64,
    pub critical_keypoints: BTreeMap<String, f64>,
    #[serde(skip)]
    bookkeeping: Bookkeeping,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Bookkeeping {
    tracker_seen: bool,
    last_frame_id: Option<u64>,
    frames_received: u64,
    frames_skipped: u64,
}

impl SystemMetrics {
    /// Fold one inference frame into the metrics.
    ///
    /// `active_tracks` follows the detection count only until the first
    /// tracker emission has been seen; from then on the tracker owns it.
    pub fn apply_inference(&mut self, message: &InferenceMessage) {
        let stats = FrameStats::from_message(message);
        self.avg_confidence = stats.avg_confidence;
        self.detections_per_frame = stats.detection_count;
        if !self.bookkeeping.tracker_seen {
            self.active_tracks = stats.detection_count;
        }
        self.critical_keypoints = critical_keypoints(message);
        self.record_frame_id(message.frame_id);
    }

    pub fn apply_tracker(&mut self, message: &TrackerMessage) {
        self.bookkeeping.tracker_seen = true;
        self.active_tracks = message.tracks.len();
    }

    pub fn apply_throughput(&mut self, fps: f64) {
        self.fps = fps;
    }

    /// Share of critical keypoints currently above the detection threshold
    pub fn keypoint_status(&self) -> KeypointStatus {
        let detected = CRITICAL_KEYPOINTS
            .iter()
            .filter(|name| {
                self.critical_keypoints
                    .get(**name)
                    .is_some_and(|conf| *conf > KEYPOINT_CONFIDENCE_THRESHOLD)
            })
            .count();
        KeypointStatus::from_percentage(detected as f64 / CRITICAL_KEYPOINTS.len() as f64 * 100.0)
    }

    fn record_frame_id(&mut self, frame_id: u64) {
        let book = &mut self.bookkeeping;
        book.frames_received = book.frames_received.saturating_add(1);
        if let Some(last) = book.last_frame_id {
            if frame_id > last {
                book.frames_skipped = book.frames_skipped.saturating_add(frame_id - last - 1);
            }
        }
        book.last_frame_id = Some(book.last_frame_id.map_or(frame_id, |last| last.max(frame_id)));

        // summed in f64: a jump to u64::MAX is still a valid frame_id
        let expected = book.frames_received as f64 + book.frames_skipped as f64;
        self.drop_frames = if expected == 0.0 {
            0.0
        } else {
            book.frames_skipped as f64 / expected * 100.0
        };
    }
}

/// Coverage of the critical keypoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointStatus {
    /// At least 80% detected
    Ok,
    /// At least 60% detected
    Warning,
    Low,
}

impl KeypointStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            KeypointStatus::Ok
        } else if percentage >= 60.0 {
            KeypointStatus::Warning
        } else {
            KeypointStatus::Low
        }
    }
}

/// Summary of the region flags of the latest tracker emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    BedOccupied,
    DoorActive,
    Normal,
    /// No tracker emission received yet
    Unknown,
}

impl RegionStatus {
    pub fn from_tracker(tracker: Option<&TrackerMessage>) -> Self {
        let Some(tracker) = tracker else {
            return RegionStatus::Unknown;
        };
        let bed_occupied = tracker
            .regions
            .bed
            .as_ref()
            .and_then(|bed| bed.occupied)
            .unwrap_or(false);
        let door_crossed = tracker
            .regions
            .door
            .as_ref()
            .and_then(|door| door.crossed)
            .unwrap_or(false);

        if bed_occupied {
            RegionStatus::BedOccupied
        } else if door_crossed {
            RegionStatus::DoorActive
        } else {
            RegionStatus::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Region, Regions};
    use crate::testing::builders::{detection, inference, keypoint, track, tracker};

    #[test]
    fn inference_sets_confidence_counts_and_keypoints() {
        let mut metrics = SystemMetrics::default();
        metrics.apply_inference(&inference(
            10,
            vec![
                detection(1, 0.8, vec![keypoint("nose", 0.9), keypoint("left_hip", 0.7)]),
                detection(2, 0.6, vec![keypoint("right_hand", 0.4)]),
            ],
        ));

        assert!((metrics.avg_confidence - 0.7).abs() < 1e-12);
        assert_eq!(metrics.detections_per_frame, 2);
        assert_eq!(metrics.active_tracks, 2);
        assert_eq!(metrics.critical_keypoints.len(), 2);
        assert!(!metrics.critical_keypoints.contains_key("left_hip"));
    }

    #[test]
    fn critical_map_is_rebuilt_each_frame() {
        let mut metrics = SystemMetrics::default();
        metrics.apply_inference(&inference(
            1,
            vec![detection(1, 0.8, vec![keypoint("nose", 0.9)])],
        ));
        metrics.apply_inference(&inference(
            2,
            vec![detection(1, 0.8, vec![keypoint("left_hand", 0.9)])],
        ));
        assert!(!metrics.critical_keypoints.contains_key("nose"));
        assert!(metrics.critical_keypoints.contains_key("left_hand"));
    }

    #[test]
    fn tracker_owns_active_tracks_once_seen() {
        let mut metrics = SystemMetrics::default();
        metrics.apply_inference(&inference(1, vec![detection(1, 0.9, vec![])]));
        assert_eq!(metrics.active_tracks, 1);

        metrics.apply_tracker(&tracker(None, vec![track(1), track(2), track(3)]));
        assert_eq!(metrics.active_tracks, 3);

        metrics.apply_inference(&inference(2, vec![detection(1, 0.9, vec![])]));
        assert_eq!(metrics.active_tracks, 3);
        assert_eq!(metrics.detections_per_frame, 1);
    }

    #[test]
    fn throughput_only_touches_fps() {
        let mut metrics = SystemMetrics::default();
        metrics.apply_inference(&inference(1, vec![detection(1, 0.5, vec![])]));
        let before = metrics.clone();
        metrics.apply_throughput(6.0);
        assert_eq!(metrics.fps, 6.0);
        assert_eq!(metrics.avg_confidence, before.avg_confidence);
        assert_eq!(metrics.active_tracks, before.active_tracks);
    }

    #[test]
    fn drop_frames_follow_frame_id_gaps() {
        let mut metrics = SystemMetrics::default();
        for frame_id in [100, 101, 104] {
            metrics.apply_inference(&inference(frame_id, vec![]));
        }
        // 3 received, 2 skipped (102, 103)
        assert!((metrics.drop_frames - 40.0).abs() < 1e-9);

        // a repeated or older id neither skips nor rewinds
        metrics.apply_inference(&inference(104, vec![]));
        metrics.apply_inference(&inference(50, vec![]));
        metrics.apply_inference(&inference(105, vec![]));
        assert!((metrics.drop_frames - 2.0 / 8.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn drop_frames_survive_huge_frame_id_jump() {
        let mut metrics = SystemMetrics::default();
        metrics.apply_inference(&inference(0, vec![]));
        metrics.apply_inference(&inference(u64::MAX, vec![]));
        assert!(metrics.drop_frames.is_finite());
        assert!(metrics.drop_frames > 99.0 && metrics.drop_frames <= 100.0);

        metrics.apply_inference(&inference(u64::MAX, vec![]));
        assert!(metrics.drop_frames.is_finite());
        assert!(metrics.drop_frames <= 100.0);
    }

    #[test]
    fn keypoint_status_thresholds() {
        let mut metrics = SystemMetrics::default();
        assert_eq!(metrics.keypoint_status(), KeypointStatus::Low);

        metrics.apply_inference(&inference(
            1,
            vec![detection(
                1,
                0.9,
                vec![
                    keypoint("nose", 0.9),
                    keypoint("left_hand", 0.9),
                    keypoint("right_hand", 0.9),
                    keypoint("left_shoulder", 0.2),
                ],
            )],
        ));
        assert_eq!(metrics.keypoint_status(), KeypointStatus::Warning);

        metrics.apply_inference(&inference(
            2,
            vec![detection(
                1,
                0.9,
                vec![
                    keypoint("nose", 0.9),
                    keypoint("left_hand", 0.9),
                    keypoint("right_hand", 0.9),
                    keypoint("left_shoulder", 0.9),
                ],
            )],
        ));
        assert_eq!(metrics.keypoint_status(), KeypointStatus::Ok);
    }

    #[test]
    fn region_status_prefers_bed_over_door() {
        assert_eq!(RegionStatus::from_tracker(None), RegionStatus::Unknown);

        let mut msg = tracker(None, vec![]);
        assert_eq!(RegionStatus::from_tracker(Some(&msg)), RegionStatus::Normal);

        msg.regions = Regions {
            bed: Some(Region {
                occupied: Some(false),
                ..Region::default()
            }),
            door: Some(Region {
                crossed: Some(true),
                ..Region::default()
            }),
        };
        assert_eq!(RegionStatus::from_tracker(Some(&msg)), RegionStatus::DoorActive);

        if let Some(bed) = msg.regions.bed.as_mut() {
            bed.occupied = Some(true);
        }
        assert_eq!(RegionStatus::from_tracker(Some(&msg)), RegionStatus::BedOccupied);
    }
}
