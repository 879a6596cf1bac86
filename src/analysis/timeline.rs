// Timeline ring buffer
//
// Three fixed-length series, one sample per inference frame. Each series
// starts zero-filled at full capacity and stays there: every push evicts the
// oldest sample, so the length never changes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::frame_stats::FrameStats;

/// 2 minutes of history at the producer's nominal 6 frames per second
pub const TIMELINE_CAPACITY: usize = 720;

/// Fixed-capacity FIFO of samples
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingSeries {
    /// Create a series filled with `capacity` zeros.
    pub fn zeroed(capacity: usize) -> Self {
        Self {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    /// Append the newest sample, evicting the oldest.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Largest sample (0 for an empty series)
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

impl Serialize for RollingSeries {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.samples.iter())
    }
}

/// Rolling history of the three per-frame scalars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub confidence: RollingSeries,
    pub detections: RollingSeries,
    pub keypoints: RollingSeries,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_capacity(TIMELINE_CAPACITY)
    }
}

impl Timeline {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            confidence: RollingSeries::zeroed(capacity),
            detections: RollingSeries::zeroed(capacity),
            keypoints: RollingSeries::zeroed(capacity),
        }
    }

    /// Append one frame's scalars to all three series.
    pub fn record(&mut self, stats: &FrameStats) {
        self.confidence.push(stats.avg_confidence);
        self.detections.push(stats.detection_count as f64);
        self.keypoints.push(stats.keypoint_detection_rate);
    }

    pub fn len(&self) -> usize {
        self.confidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confidence.is_empty()
    }

    pub fn summary(&self) -> TimelineSummary {
        TimelineSummary {
            confidence: SeriesSummary::of(&self.confidence),
            detections: SeriesSummary::of(&self.detections),
            keypoints: SeriesSummary::of(&self.keypoints),
        }
    }
}

/// Latest value and scale of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub latest: f64,
    pub max: f64,
}

impl SeriesSummary {
    fn of(series: &RollingSeries) -> Self {
        Self {
            latest: series.latest().unwrap_or(0.0),
            max: series.max(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineSummary {
    pub confidence: SeriesSummary,
    pub detections: SeriesSummary,
    pub keypoints: SeriesSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg_confidence: f64, detection_count: usize, rate: f64) -> FrameStats {
        FrameStats {
            avg_confidence,
            detection_count,
            keypoint_detection_rate: rate,
        }
    }

    #[test]
    fn starts_full_of_zeros() {
        let timeline = Timeline::default();
        assert_eq!(timeline.len(), TIMELINE_CAPACITY);
        assert_eq!(timeline.keypoints.len(), TIMELINE_CAPACITY);
        assert!(timeline.confidence.iter().all(|v| v == 0.0));
    }

    #[test]
    fn length_is_constant_across_updates() {
        let mut timeline = Timeline::default();
        for i in 0..(TIMELINE_CAPACITY * 2 + 7) {
            timeline.record(&stats(0.5, i % 3, 0.25));
            assert_eq!(timeline.confidence.len(), TIMELINE_CAPACITY);
            assert_eq!(timeline.detections.len(), TIMELINE_CAPACITY);
            assert_eq!(timeline.keypoints.len(), TIMELINE_CAPACITY);
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut timeline = Timeline::with_capacity(3);
        timeline.record(&stats(0.1, 1, 0.0));
        timeline.record(&stats(0.2, 2, 0.0));
        timeline.record(&stats(0.3, 3, 0.0));
        timeline.record(&stats(0.4, 4, 1.0));

        assert_eq!(timeline.confidence.to_vec(), vec![0.2, 0.3, 0.4]);
        assert_eq!(timeline.detections.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(timeline.keypoints.latest(), Some(1.0));
    }

    #[test]
    fn summary_reports_latest_and_max() {
        let mut timeline = Timeline::with_capacity(4);
        timeline.record(&stats(0.9, 3, 0.5));
        timeline.record(&stats(0.4, 1, 0.75));

        let summary = timeline.summary();
        assert_eq!(summary.confidence.latest, 0.4);
        assert_eq!(summary.confidence.max, 0.9);
        assert_eq!(summary.detections.max, 3.0);
        assert_eq!(summary.keypoints.latest, 0.75);
    }

    #[test]
    fn serializes_as_plain_arrays() {
        let timeline = Timeline::with_capacity(2);
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["confidence"], serde_json::json!([0.0, 0.0]));
    }
}
