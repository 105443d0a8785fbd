//! Outward-facing sinks for cycle results.
//!
//! The engine never draws, notifies or moves the viewport itself; it hands
//! deltas to these traits. The log-backed implementations here are what the
//! headless binary wires in.

use std::collections::HashMap;

use super::alerts::model::FocusRequest;
use super::coordinator::SyncStatus;
use super::event_log::{EventLog, Severity};
use super::model::{Target, TargetId};

pub trait Renderer {
    fn add(&mut self, target: &Target);
    fn update(&mut self, target: &Target);
    fn remove(&mut self, id: &TargetId);
}

pub trait Notifier {
    fn notify(&mut self, target: &Target, distance_km: f64);
}

pub trait Viewport {
    fn focus(&mut self, request: FocusRequest);
}

pub trait StatusDisplay {
    fn report(&mut self, status: &SyncStatus);
}

/// Tracks drawn markers and logs each change.
#[derive(Debug, Default)]
pub struct LogRenderer {
    markers: HashMap<TargetId, (f64, f64)>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

impl Renderer for LogRenderer {
    fn add(&mut self, target: &Target) {
        let style = if target.kind.is_priority() { " [pulse]" } else { "" };
        log::debug!(
            "Marker +{} {} at ({:.4}, {:.4}) icon={}{}",
            target.id,
            target.display_label(),
            target.lat,
            target.lng,
            target.icon_path(),
            style
        );
        self.markers.insert(target.id.clone(), (target.lat, target.lng));
    }

    fn update(&mut self, target: &Target) {
        if let Some(position) = self.markers.get_mut(&target.id) {
            if *position != (target.lat, target.lng) {
                log::debug!(
                    "Marker ~{} moved to ({:.4}, {:.4})",
                    target.id,
                    target.lat,
                    target.lng
                );
            }
            *position = (target.lat, target.lng);
        }
    }

    fn remove(&mut self, id: &TargetId) {
        if self.markers.remove(id).is_some() {
            log::debug!("Marker -{id}");
        }
    }
}

/// Threat notifications land in the operator log as danger lines.
impl Notifier for EventLog {
    fn notify(&mut self, target: &Target, distance_km: f64) {
        self.record(
            Severity::Danger,
            format!("PUSH: {} ({:.1} km)", target.display_label(), distance_km),
        );
    }
}

#[derive(Debug, Default)]
pub struct LogViewport {
    last: Option<FocusRequest>,
}

impl LogViewport {
    pub fn last_focus(&self) -> Option<FocusRequest> {
        self.last
    }
}

impl Viewport for LogViewport {
    fn focus(&mut self, request: FocusRequest) {
        log::info!(
            "Focusing viewport on ({:.4}, {:.4}) zoom {}",
            request.lat,
            request.lng,
            request.zoom
        );
        self.last = Some(request);
    }
}

/// Logs the sync status whenever it changes.
#[derive(Debug, Default)]
pub struct LogStatusDisplay {
    last: Option<SyncStatus>,
}

impl LogStatusDisplay {
    pub fn current(&self) -> Option<&SyncStatus> {
        self.last.as_ref()
    }
}

impl StatusDisplay for LogStatusDisplay {
    fn report(&mut self, status: &SyncStatus) {
        let changed = self.last.as_ref().map_or(true, |prev| {
            prev.link != status.link || prev.object_count != status.object_count
        });
        if changed {
            log::info!("{}", status.summary());
        }
        self.last = Some(status.clone());
    }
}
