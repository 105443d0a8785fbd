// Alert model types shared by the alert state and the geofence engine.

use serde::Serialize;

use crate::core::model::{Target, TargetId};

/// Outcome of evaluating one target against the open-alert set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatSignal {
    /// Nothing to report. The alert may have been re-armed as a side effect.
    None,
    /// The target just entered the radius; notify.
    Enter,
    /// Inside the radius but already notified in this episode.
    AlreadyAlerted,
}

/// A target that newly entered the alert radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatEvent {
    pub target: Target,
    pub distance_km: f64,
}

impl ThreatEvent {
    /// Notification body shown to the operator.
    pub fn message(&self) -> String {
        format!(
            "Target: {} | Distance: {:.1} km",
            self.target.display_label(),
            self.distance_km
        )
    }

    /// Notifications with the same tag replace each other.
    pub fn tag(&self) -> &TargetId {
        &self.target.id
    }
}

/// Zoom used when the viewport flies to a threat.
pub const FOCUS_ZOOM: u8 = 10;

/// Request for the viewport to center on a threat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusRequest {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

impl FocusRequest {
    pub fn on(target: &Target) -> Self {
        Self {
            lat: target.lat,
            lng: target.lng,
            zoom: FOCUS_ZOOM,
        }
    }
}
