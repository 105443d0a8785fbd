// Geofence engine - decides which targets newly entered the alert radius.

use super::model::{FocusRequest, ThreatEvent, ThreatSignal};
use super::state::AlertState;
use crate::core::config::Settings;
use crate::core::geo::{distance_km, Coord};
use crate::core::model::{Target, TargetId};

/// Result of one geofence pass.
#[derive(Debug, Clone, Default)]
pub struct GeofenceOutcome {
    /// New threat entries, in feed order.
    pub events: Vec<ThreatEvent>,
    /// Set only when auto-focus is on; points at the first event of the cycle.
    pub focus: Option<FocusRequest>,
}

pub struct GeofenceEngine {
    alerts: AlertState,
}

impl GeofenceEngine {
    pub fn new() -> Self {
        Self {
            alerts: AlertState::new(),
        }
    }

    /// Evaluate every target against the current settings.
    ///
    /// The engine only decides eligibility; delivering the notification is up
    /// to whoever consumes the returned events.
    pub fn evaluate(
        &mut self,
        user_position: Option<Coord>,
        targets: &[Target],
        settings: &Settings,
    ) -> GeofenceOutcome {
        let mut outcome = GeofenceOutcome::default();
        let Some(user) = user_position else {
            return outcome;
        };
        if !settings.alerts_enabled {
            // Nothing stays open while alerting is off; re-enabling starts fresh
            self.alerts.clear();
            return outcome;
        }

        for target in targets {
            let distance = distance_km(user, target.coord());
            let signal = self.alerts.evaluate(
                &target.id,
                distance,
                settings.alert_radius,
                settings.hysteresis_margin_km,
            );
            if signal == ThreatSignal::Enter {
                log::info!(
                    "Threat entry: {} ({}) at {:.1} km",
                    target.id,
                    target.kind,
                    distance
                );
                outcome.events.push(ThreatEvent {
                    target: target.clone(),
                    distance_km: distance,
                });
            }
        }

        // Only the first entry of a cycle moves the viewport
        if settings.auto_focus_enabled {
            outcome.focus = outcome.events.first().map(|e| FocusRequest::on(&e.target));
        }

        outcome
    }

    /// Re-arm all targets. Called when the operator changes the radius.
    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn forget(&mut self, id: &TargetId) {
        self.alerts.forget(id);
    }

    pub fn alert_state(&self) -> &AlertState {
        &self.alerts
    }
}

impl Default for GeofenceEngine {
    fn default() -> Self {
        Self::new()
    }
}
