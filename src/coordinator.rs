// DataCoordinator - routes connection callbacks into the reducers
//
// The coordinator is the only writer of the view-state stores. Every
// callback runs synchronously on the connection manager task, so reducer
// steps for one message never overlap those of another.

use std::sync::Arc;

use crate::analysis::FrameStats;
use crate::connection::{ConnectionEvents, ConnectionState};
use crate::protocol::{
    classify, dispatch, Classification, ClassificationKind, InferenceMessage, TapHandler,
    TrackerMessage,
};
use crate::state::{ConnectionStatus, ViewState};

pub struct DataCoordinator {
    view: Arc<ViewState>,
}

impl DataCoordinator {
    pub fn new(view: Arc<ViewState>) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &Arc<ViewState> {
        &self.view
    }

    /// Classify one raw frame and fold it into the stores.
    pub fn ingest_raw(&self, raw: &str) -> ClassificationKind {
        self.ingest(classify(raw))
    }

    pub fn ingest(&self, classification: Classification) -> ClassificationKind {
        dispatch(classification, self)
    }
}

impl TapHandler for DataCoordinator {
    fn on_inference(&self, message: InferenceMessage) {
        let stats = FrameStats::from_message(&message);
        self.view.metrics.update(|metrics| metrics.apply_inference(&message));
        self.view.timeline.update(|timeline| timeline.record(&stats));
        self.view.canvas.update(|canvas| canvas.apply_inference(&message));
    }

    fn on_tracker(&self, message: TrackerMessage) {
        self.view.metrics.update(|metrics| metrics.apply_tracker(&message));
        self.view.events.update(|events| {
            if let Some(entry) = events.apply_tracker(&message) {
                tracing::info!(
                    "[DataCoordinator] {} event: {}{}",
                    entry.severity.as_str(),
                    entry.message,
                    if entry.details.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", entry.details)
                    }
                );
            }
        });
        self.view.canvas.update(|canvas| canvas.apply_tracker(&message));
    }
}

impl ConnectionEvents for DataCoordinator {
    fn on_connect(&self) {
        tracing::debug!("[DataCoordinator] Stream connected");
    }

    fn on_disconnect(&self) {
        tracing::debug!("[DataCoordinator] Stream disconnected");
    }

    fn on_throughput(&self, messages_per_sec: f64) {
        self.view
            .metrics
            .update(|metrics| metrics.apply_throughput(messages_per_sec));
    }

    fn on_state_change(&self, state: &ConnectionState) {
        let status = ConnectionStatus {
            connected: state.is_connected(),
            state: state.clone(),
        };
        self.view.connection.update(|current| *current = status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builders::{
        detection, inference, inference_json, keypoint, track, tracker, tracker_json,
    };

    fn coordinator() -> DataCoordinator {
        DataCoordinator::new(Arc::new(ViewState::new()))
    }

    #[test]
    fn inference_updates_metrics_timeline_and_canvas() {
        let coordinator = coordinator();
        let raw = inference_json(&inference(
            4001,
            vec![
                detection(1, 0.8, vec![keypoint("nose", 0.9)]),
                detection(2, 0.6, vec![keypoint("left_hip", 0.3)]),
            ],
        ));
        assert_eq!(coordinator.ingest_raw(&raw), ClassificationKind::Decoded);

        let view = coordinator.view();
        let metrics = view.metrics.snapshot();
        assert!((metrics.avg_confidence - 0.7).abs() < 1e-9);
        assert_eq!(metrics.detections_per_frame, 2);

        let summary = view.timeline.snapshot().summary();
        assert_eq!(summary.detections.latest, 2.0);
        assert!((summary.keypoints.latest - 0.5).abs() < 1e-9);

        assert_eq!(view.canvas.snapshot().current_frame, 4001);
        assert!(view.events.snapshot().is_empty());
    }

    #[test]
    fn tracker_updates_events_and_active_tracks() {
        let coordinator = coordinator();
        let raw = tracker_json(&tracker(Some("bed_exit"), vec![track(1), track(2)]));
        coordinator.ingest_raw(&raw);

        let view = coordinator.view();
        assert_eq!(view.metrics.snapshot().active_tracks, 2);
        let events = view.events.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events.newest().map(|e| e.message.as_str()), Some("Bed Exit"));
        assert!(view.canvas.snapshot().current_tracker.is_some());
        // tracker messages never sample the timeline
        assert_eq!(view.timeline.snapshot().summary().detections.max, 0.0);
    }

    #[test]
    fn rejected_frames_leave_stores_untouched() {
        let coordinator = coordinator();
        let mut readers = coordinator.view().readers();

        assert_eq!(
            coordinator.ingest_raw("{not json"),
            ClassificationKind::SchemaInvalid
        );
        assert_eq!(
            coordinator.ingest_raw(r#"{"topic":"other.tap"}"#),
            ClassificationKind::UnknownTopic
        );

        assert!(!readers.metrics.has_changed());
        assert!(!readers.timeline.has_changed());
        assert!(!readers.events.has_changed());
        assert!(!readers.canvas.has_changed());
        assert_eq!(readers.metrics.snapshot().fps, 0.0);
    }

    #[test]
    fn extreme_frame_id_gap_keeps_stores_usable() {
        let coordinator = coordinator();
        coordinator.ingest_raw(&inference_json(&inference(0, vec![])));
        coordinator.ingest_raw(&inference_json(&inference(u64::MAX, vec![])));
        coordinator.ingest_raw(&inference_json(&inference(5, vec![])));

        let view = coordinator.view();
        assert_eq!(view.canvas.snapshot().current_frame, 5);
        let drop_frames = view.metrics.snapshot().drop_frames;
        assert!(drop_frames.is_finite() && drop_frames <= 100.0);
    }

    #[test]
    fn throughput_overwrites_fps_only() {
        let coordinator = coordinator();
        coordinator.ingest_raw(&inference_json(&inference(
            1,
            vec![detection(1, 0.9, vec![])],
        )));
        coordinator.on_throughput(6.0);

        let metrics = coordinator.view().metrics.snapshot();
        assert_eq!(metrics.fps, 6.0);
        assert_eq!(metrics.detections_per_frame, 1);
    }

    #[test]
    fn state_change_sets_connection_flag() {
        let coordinator = coordinator();
        coordinator.on_state_change(&ConnectionState::Connected);
        assert!(coordinator.view().connection.snapshot().connected);

        coordinator.on_state_change(&ConnectionState::Reconnecting {
            attempt: 1,
            delay_ms: 1000,
        });
        let status = coordinator.view().connection.snapshot();
        assert!(!status.connected);
        assert_eq!(
            status.state,
            ConnectionState::Reconnecting {
                attempt: 1,
                delay_ms: 1000
            }
        );
    }
}
