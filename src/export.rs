//! One-shot calibration log export.
//!
//! Serializes `{timestamp, events, metrics, settings}` as 2-space pretty
//! JSON into `calibration-log-<YYYY-MM-DD>.json`. The timestamp is epoch
//! milliseconds and the file date is the UTC calendar date of the capture.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::{EventLogEntry, SystemMetrics};
use crate::error::ExportError;
use crate::state::{VisualizationSettings, ViewState};

/// Snapshot written by [`ExportSnapshot::write_to_dir`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    /// Capture time, epoch milliseconds
    pub timestamp: i64,
    /// Newest first, as shown in the event log
    pub events: Vec<EventLogEntry>,
    pub metrics: SystemMetrics,
    pub settings: VisualizationSettings,
    #[serde(skip)]
    captured_at: DateTime<Utc>,
}

impl ExportSnapshot {
    pub fn capture(view: &ViewState) -> Self {
        Self::capture_at(view, Utc::now())
    }

    pub fn capture_at(view: &ViewState, captured_at: DateTime<Utc>) -> Self {
        Self {
            timestamp: captured_at.timestamp_millis(),
            events: view.events.snapshot().to_vec(),
            metrics: view.metrics.snapshot(),
            settings: view.canvas.snapshot().settings,
            captured_at,
        }
    }

    pub fn file_name(&self) -> String {
        export_file_name(&self.captured_at)
    }

    pub fn to_pretty_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write into `dir` (created if missing); returns the file path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let json = self.to_pretty_json()?;
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, json)?;
        info!(
            "[Export] Wrote {} events to {}",
            self.events.len(),
            path.display()
        );
        Ok(path)
    }
}

pub fn export_file_name(date: &DateTime<Utc>) -> String {
    format!("calibration-log-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Layer;
    use crate::testing::builders::{detection, inference, tracker};
    use chrono::TimeZone;

    fn populated_view() -> ViewState {
        let view = ViewState::new();
        view.metrics.update(|metrics| {
            metrics.apply_inference(&inference(1, vec![detection(1, 0.8, vec![])]));
            metrics.apply_throughput(6.0);
        });
        view.events.update(|events| {
            events.apply_tracker(&tracker(Some("person_detected"), vec![]));
            events.apply_tracker(&tracker(Some("bed_exit"), vec![]));
        });
        view.canvas.update(|canvas| {
            canvas.settings.toggle(Layer::Regions);
        });
        view
    }

    #[test]
    fn file_name_uses_utc_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(export_file_name(&at), "calibration-log-2024-03-09.json");
    }

    #[test]
    fn snapshot_has_four_top_level_fields() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let snapshot = ExportSnapshot::capture_at(&populated_view(), at);
        let json: serde_json::Value =
            serde_json::from_str(&snapshot.to_pretty_json().unwrap()).unwrap();

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(json["timestamp"], at.timestamp_millis());
        assert_eq!(json["events"].as_array().unwrap().len(), 2);
        assert_eq!(json["events"][0]["type"], "bed_exit");
        assert_eq!(json["metrics"]["fps"], 6.0);
        assert_eq!(json["metrics"]["detectionsPerFrame"], 1);
        assert_eq!(json["settings"]["showRegions"], false);
        assert_eq!(json["settings"]["showKeypoints"], true);
    }

    #[test]
    fn pretty_json_uses_two_space_indent() {
        let snapshot = ExportSnapshot::capture(&ViewState::new());
        let json = snapshot.to_pretty_json().unwrap();
        assert!(json.contains("\n  \"timestamp\""));
    }

    #[test]
    fn writes_file_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports");
        let snapshot = ExportSnapshot::capture(&populated_view());

        let path = snapshot.write_to_dir(&nested).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), snapshot.file_name());

        let written: ExportSnapshot =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.events.len(), 2);
        assert_eq!(written.timestamp, snapshot.timestamp);
    }
}
