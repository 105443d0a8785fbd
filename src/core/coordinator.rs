use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alerts::engine::GeofenceEngine;
use super::alerts::model::{FocusRequest, ThreatEvent};
use super::alerts::state::AlertState;
use super::collaborators::{Notifier, Renderer, StatusDisplay, Viewport};
use super::config::Settings;
use super::error::FeedError;
use super::event_log::{LogEntry, Severity};
use super::geo::{distance_km, Coord};
use super::model::Target;
use super::store::{Reconciliation, TargetStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No cycle has completed yet.
    Pending,
    Online,
    /// Feed unreachable or answered with an error status.
    Offline,
    /// Feed answered but the payload was unusable.
    SyncError,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::SyncError => "sync error",
        }
    }
}

impl From<&FeedError> for LinkState {
    fn from(error: &FeedError) -> Self {
        match error {
            FeedError::Fetch(_) | FeedError::Status(_) => Self::Offline,
            FeedError::Parse(_) => Self::SyncError,
        }
    }
}

/// Aggregate shown on the status display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub link: LinkState,
    pub object_count: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    fn pending() -> Self {
        Self {
            link: LinkState::Pending,
            object_count: 0,
            last_sync: None,
            last_error: None,
        }
    }

    pub fn summary(&self) -> String {
        let last_sync = self
            .last_sync
            .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S").to_string());
        match &self.last_error {
            Some(error) if self.link != LinkState::Online => format!(
                "Link {} | objects {} | last sync {} | {}",
                self.link.as_str(),
                self.object_count,
                last_sync,
                error
            ),
            _ => format!(
                "Link {} | objects {} | last sync {}",
                self.link.as_str(),
                self.object_count,
                last_sync
            ),
        }
    }
}

/// Everything one refresh cycle produced for the outside world.
pub struct CoordinatorOutput {
    pub deltas: Reconciliation,
    pub threats: Vec<ThreatEvent>,
    pub focus: Option<FocusRequest>,
    pub status: SyncStatus,
    pub logs: Vec<LogEntry>,
}

impl CoordinatorOutput {
    /// Hands the cycle results to the external collaborators.
    pub fn forward(
        &self,
        renderer: &mut impl Renderer,
        notifier: &mut impl Notifier,
        viewport: &mut impl Viewport,
        display: &mut impl StatusDisplay,
    ) {
        for id in &self.deltas.removed {
            renderer.remove(id);
        }
        for target in &self.deltas.added {
            renderer.add(target);
        }
        for target in &self.deltas.updated {
            renderer.update(target);
        }
        for threat in &self.threats {
            notifier.notify(&threat.target, threat.distance_km);
        }
        if let Some(request) = self.focus {
            viewport.focus(request);
        }
        display.report(&self.status);
    }
}

/// Explicit in-flight marker so two refreshes never overlap.
///
/// Each refresh gets a generation; only the outstanding generation may
/// complete.
#[derive(Debug, Default)]
pub struct RefreshGuard {
    generation: u64,
    in_flight: Option<u64>,
}

impl RefreshGuard {
    /// Returns the new generation, or `None` while another refresh runs.
    pub fn try_begin(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        Some(self.generation)
    }

    /// Marks `generation` done. False if it was not the outstanding one.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// A stored target with its distance from the operator, if known.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub target: Target,
    pub distance_km: Option<f64>,
}

/// Owns the rendered set and the alert state; the single writer of both.
pub struct Coordinator {
    store: TargetStore,
    geofence: GeofenceEngine,
    user_position: Option<Coord>,
    status: SyncStatus,
    guard: RefreshGuard,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            store: TargetStore::new(),
            geofence: GeofenceEngine::new(),
            user_position: None,
            status: SyncStatus::pending(),
            guard: RefreshGuard::default(),
        }
    }

    /// Starts a refresh. `None` means one is already outstanding and the
    /// caller should skip this trigger.
    pub fn begin_refresh(&mut self) -> Option<u64> {
        self.guard.try_begin()
    }

    pub fn is_refreshing(&self) -> bool {
        self.guard.is_in_flight()
    }

    /// Applies a finished fetch. `settings` should be read at completion
    /// time so mid-flight edits are honored.
    ///
    /// Returns `None` if `generation` is not the outstanding refresh.
    pub fn complete_refresh(
        &mut self,
        generation: u64,
        fetched: Result<Vec<Target>, FeedError>,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Option<CoordinatorOutput> {
        if !self.guard.finish(generation) {
            log::warn!("Dropping result of stale refresh #{generation}");
            return None;
        }
        Some(self.apply(fetched, settings, now))
    }

    fn apply(
        &mut self,
        fetched: Result<Vec<Target>, FeedError>,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> CoordinatorOutput {
        let mut logs = Vec::new();

        let targets = match fetched {
            Ok(targets) => targets,
            Err(e) => {
                // Previous state stays untouched; only the status moves
                log::warn!("Sync failed: {e}");
                self.status.link = LinkState::from(&e);
                self.status.last_error = Some(e.to_string());
                logs.push(LogEntry::new(Severity::Danger, format!("SYNC ERROR: {e}")));
                return CoordinatorOutput {
                    deltas: Reconciliation::default(),
                    threats: Vec::new(),
                    focus: None,
                    status: self.status.clone(),
                    logs,
                };
            }
        };

        // 1. Reconcile rendered state
        let deltas = self.store.reconcile(&targets, now);
        for id in &deltas.removed {
            self.geofence.forget(id);
            logs.push(LogEntry::new(Severity::Warning, format!("OBJECT {id} GONE")));
        }
        log::debug!(
            "Reconciled {} records: +{} ~{} -{}",
            targets.len(),
            deltas.added.len(),
            deltas.updated.len(),
            deltas.removed.len()
        );

        // 2. Geofence against what is actually on the map
        let live: Vec<Target> = self.store.targets().cloned().collect();
        let outcome = self.geofence.evaluate(self.user_position, &live, settings);

        // 3. Status
        self.status = SyncStatus {
            link: LinkState::Online,
            object_count: self.store.len(),
            last_sync: Some(now),
            last_error: None,
        };

        CoordinatorOutput {
            deltas,
            threats: outcome.events,
            focus: outcome.focus,
            status: self.status.clone(),
            logs,
        }
    }

    pub fn set_user_position(&mut self, position: Option<Coord>) {
        self.user_position = position;
    }

    pub fn user_position(&self) -> Option<Coord> {
        self.user_position
    }

    /// Re-arms every alert, e.g. after a radius change.
    pub fn clear_alerts(&mut self) {
        self.geofence.clear();
    }

    pub fn store(&self) -> &TargetStore {
        &self.store
    }

    pub fn alert_state(&self) -> &AlertState {
        self.geofence.alert_state()
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Stored targets in feed order with their distance to the operator.
    pub fn target_summaries(&self) -> Vec<TargetSummary> {
        self.store
            .targets()
            .map(|target| TargetSummary {
                target: target.clone(),
                distance_km: self.user_position.map(|user| distance_km(user, target.coord())),
            })
            .collect()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
