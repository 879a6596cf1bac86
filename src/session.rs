// Dashboard - top-level owner of one monitoring session
//
// Wires config -> transport -> ConnectionManager -> DataCoordinator -> stores
// and exposes the user actions (clear events, toggle layers, export).
// Presentation consumers only get read handles.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::analysis::{KeypointStatus, RegionStatus, SystemMetrics, TimelineSummary};
use crate::config::AppConfig;
use crate::connection::{ConnectionManager, ConnectionState, Transport, WebSocketTransport};
use crate::coordinator::DataCoordinator;
use crate::error::{log_export_error, ConnectionError, ExportError};
use crate::export::ExportSnapshot;
use crate::protocol::{classify, ClassificationKind};
use crate::state::{ConnectionStatus, Layer, ViewReaders, ViewState};
use crate::telemetry::TelemetryHub;

/// One-line view of everything the panels show
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStatus {
    pub connection: ConnectionStatus,
    pub metrics: SystemMetrics,
    pub keypoint_status: KeypointStatus,
    pub region_status: RegionStatus,
    pub timeline: TimelineSummary,
    pub event_count: usize,
    pub current_frame: u64,
}

impl fmt::Display for DashboardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] frame={} fps={:.1} conf={:.2} tracks={} det={} drop={:.1}% keypoints={:?} region={:?} events={}",
            self.connection.state,
            self.current_frame,
            self.metrics.fps,
            self.metrics.avg_confidence,
            self.metrics.active_tracks,
            self.metrics.detections_per_frame,
            self.metrics.drop_frames,
            self.keypoint_status,
            self.region_status,
            self.event_count
        )
    }
}

pub struct Dashboard {
    config: AppConfig,
    view: Arc<ViewState>,
    coordinator: Arc<DataCoordinator>,
    telemetry: Arc<TelemetryHub>,
    /// `None` for offline dashboards fed through [`Dashboard::replay_line`]
    manager: Option<ConnectionManager>,
}

impl Dashboard {
    /// Dashboard streaming from the WebSocket endpoint in `config`.
    pub fn new(config: AppConfig) -> Result<Self, ConnectionError> {
        let transport = WebSocketTransport::from_config(&config.connection)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let mut dashboard = Self::offline(config);
        let manager = ConnectionManager::new(
            transport,
            Arc::clone(&dashboard.coordinator) as _,
            Arc::clone(&dashboard.telemetry),
        )
        .with_reconnect(dashboard.config.reconnect.clone())
        .with_throughput(dashboard.config.throughput.clone());
        dashboard.manager = Some(manager);
        dashboard
    }

    /// Dashboard without a connection, for replaying captured frames.
    pub fn offline(config: AppConfig) -> Self {
        let view = Arc::new(ViewState::new());
        let coordinator = Arc::new(DataCoordinator::new(Arc::clone(&view)));
        let telemetry = Arc::new(TelemetryHub::from_config(&config.telemetry));
        Self {
            config,
            view,
            coordinator,
            telemetry,
            manager: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn start(&self) -> Result<(), ConnectionError> {
        self.manager()?.start()
    }

    /// Close the connection normally and stop every timer.
    pub async fn shutdown(&self) -> Result<(), ConnectionError> {
        self.manager()?.disconnect().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager
            .as_ref()
            .map(ConnectionManager::state)
            .unwrap_or_default()
    }

    /// Feed one captured frame through the live pipeline's classifier and reducers.
    pub fn replay_line(&self, raw: &str) -> ClassificationKind {
        let classification = classify(raw);
        self.telemetry.record_classification(&classification);
        self.coordinator.ingest(classification)
    }

    pub fn clear_events(&self) {
        self.view.events.update(|events| events.clear());
        info!("[Dashboard] Event log cleared");
    }

    /// Flip an overlay layer; returns its new visibility.
    pub fn toggle(&self, layer: Layer) -> bool {
        let mut visible = false;
        self.view
            .canvas
            .update(|canvas| visible = canvas.settings.toggle(layer));
        visible
    }

    pub fn status(&self) -> DashboardStatus {
        let metrics = self.view.metrics.snapshot();
        let canvas = self.view.canvas.snapshot();
        DashboardStatus {
            connection: self.view.connection.snapshot(),
            keypoint_status: metrics.keypoint_status(),
            region_status: RegionStatus::from_tracker(canvas.current_tracker.as_ref()),
            timeline: self.view.timeline.snapshot().summary(),
            event_count: self.view.events.snapshot().len(),
            current_frame: canvas.current_frame,
            metrics,
        }
    }

    pub fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot::capture(&self.view)
    }

    /// Write an export into `dir`, or the configured output directory.
    pub fn export(&self, dir: Option<&Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.unwrap_or(self.config.export.output_dir.as_path());
        self.export_snapshot().write_to_dir(dir).map_err(|err| {
            log_export_error(&err, "Dashboard::export");
            err
        })
    }

    pub fn readers(&self) -> ViewReaders {
        self.view.readers()
    }

    pub fn view(&self) -> &Arc<ViewState> {
        &self.view
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    fn manager(&self) -> Result<&ConnectionManager, ConnectionError> {
        self.manager.as_ref().ok_or(ConnectionError::NotRunning)
    }
}
