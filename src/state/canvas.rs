// Canvas state - latest frames plus the overlay toggles
//
// Presentation draws from the most recent inference and tracker messages;
// the toggles decide which overlay layers it draws.

use serde::{Deserialize, Serialize};

use crate::protocol::{InferenceMessage, TrackerMessage};

/// Overlay layer that can be switched on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    RawBbox,
    SmoothBbox,
    Keypoints,
    Regions,
}

/// Visibility of each overlay layer (all on by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationSettings {
    pub show_raw_bbox: bool,
    pub show_smooth_bbox: bool,
    pub show_keypoints: bool,
    pub show_regions: bool,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            show_raw_bbox: true,
            show_smooth_bbox: true,
            show_keypoints: true,
            show_regions: true,
        }
    }
}

impl VisualizationSettings {
    /// Flip one layer; returns its new visibility
    pub fn toggle(&mut self, layer: Layer) -> bool {
        let flag = match layer {
            Layer::RawBbox => &mut self.show_raw_bbox,
            Layer::SmoothBbox => &mut self.show_smooth_bbox,
            Layer::Keypoints => &mut self.show_keypoints,
            Layer::Regions => &mut self.show_regions,
        };
        *flag = !*flag;
        *flag
    }

    pub fn is_visible(&self, layer: Layer) -> bool {
        match layer {
            Layer::RawBbox => self.show_raw_bbox,
            Layer::SmoothBbox => self.show_smooth_bbox,
            Layer::Keypoints => self.show_keypoints,
            Layer::Regions => self.show_regions,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasState {
    pub current_inference: Option<InferenceMessage>,
    pub current_tracker: Option<TrackerMessage>,
    /// frame_id of the latest inference message
    pub current_frame: u64,
    pub settings: VisualizationSettings,
}

impl CanvasState {
    pub fn apply_inference(&mut self, message: &InferenceMessage) {
        self.current_frame = message.frame_id;
        self.current_inference = Some(message.clone());
    }

    pub fn apply_tracker(&mut self, message: &TrackerMessage) {
        self.current_tracker = Some(message.clone());
    }
}
