// View state - one observable store per concern
//
// ViewState is constructed once and passed explicitly to the coordinator
// (the only writer) and to presentation consumers (readers via ViewReaders).
// Stores are independent: one inbound message may touch several of them
// without a cross-store transaction, which is fine because every consumer
// reads "most recent value" semantics.

pub mod canvas;
pub mod store;

use serde::Serialize;

pub use canvas::{CanvasState, Layer, VisualizationSettings};
pub use store::{Store, StoreReader};

use crate::analysis::{EventLog, SystemMetrics, Timeline};
use crate::connection::ConnectionState;

/// Connection flag plus the manager's full state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub state: ConnectionState,
}

/// Owner of every view-state store
#[derive(Debug, Default)]
pub struct ViewState {
    pub canvas: Store<CanvasState>,
    pub metrics: Store<SystemMetrics>,
    pub timeline: Store<Timeline>,
    pub events: Store<EventLog>,
    pub connection: Store<ConnectionStatus>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readers(&self) -> ViewReaders {
        ViewReaders {
            canvas: self.canvas.reader(),
            metrics: self.metrics.reader(),
            timeline: self.timeline.reader(),
            events: self.events.reader(),
            connection: self.connection.reader(),
        }
    }
}

/// Read-only handles for presentation consumers
#[derive(Debug, Clone)]
pub struct ViewReaders {
    pub canvas: StoreReader<CanvasState>,
    pub metrics: StoreReader<SystemMetrics>,
    pub timeline: StoreReader<Timeline>,
    pub events: StoreReader<EventLog>,
    pub connection: StoreReader<ConnectionStatus>,
}
