// Analysis module - reducers folding tap messages into view state
//
// Each reducer owns one slice of view state and is driven synchronously, in
// arrival order, by the coordinator:
// - frame_stats: per-frame scalars (average confidence, keypoint detection rate)
// - metrics: SystemMetrics, overwritten by inference, tracker and throughput inputs
// - timeline: three fixed-capacity series, one sample per inference frame
// - events: severity classification and formatting into a capped event log

pub mod events;
pub mod frame_stats;
pub mod metrics;
pub mod timeline;

pub use events::{
    format_event_details, format_event_message, EventLog, EventLogEntry, Severity,
    EVENT_LOG_CAPACITY,
};
pub use frame_stats::{FrameStats, CRITICAL_KEYPOINTS};
pub use metrics::{KeypointStatus, RegionStatus, SystemMetrics};
pub use timeline::{RollingSeries, Timeline, TimelineSummary, TIMELINE_CAPACITY};
