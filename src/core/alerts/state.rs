// Open-alert bookkeeping with a hysteresis band.
//
// An id stays "open" from the cycle it enters the radius until it retreats
// past radius + margin. While open it never fires again.

use std::collections::HashSet;

use super::model::ThreatSignal;
use crate::core::model::TargetId;

/// Extra distance (km) a target must retreat past the radius before re-arming.
pub const DEFAULT_HYSTERESIS_MARGIN_KM: f64 = 10.0;

#[derive(Debug, Default)]
pub struct AlertState {
    open: HashSet<TargetId>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        id: &TargetId,
        distance_km: f64,
        alert_radius_km: f64,
        hysteresis_margin_km: f64,
    ) -> ThreatSignal {
        if distance_km <= alert_radius_km {
            if self.open.insert(id.clone()) {
                ThreatSignal::Enter
            } else {
                ThreatSignal::AlreadyAlerted
            }
        } else {
            if distance_km > alert_radius_km + hysteresis_margin_km {
                self.open.remove(id);
            }
            ThreatSignal::None
        }
    }

    /// Re-arms every id, e.g. after the operator changed the radius.
    pub fn clear(&mut self) {
        self.open.clear();
    }

    /// Drops a single id, used when the target left the feed.
    pub fn forget(&mut self, id: &TargetId) -> bool {
        self.open.remove(id)
    }

    pub fn is_open(&self, id: &TargetId) -> bool {
        self.open.contains(id)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TargetId {
        TargetId::new(s).unwrap()
    }

    #[test]
    fn test_stationary_target_alerts_once() {
        let mut state = AlertState::new();
        let a = id("a");
        assert_eq!(state.evaluate(&a, 30.0, 50.0, 10.0), ThreatSignal::Enter);
        for _ in 0..5 {
            assert_eq!(state.evaluate(&a, 30.0, 50.0, 10.0), ThreatSignal::AlreadyAlerted);
        }
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_rearm_sequence() {
        let mut state = AlertState::new();
        let a = id("a");

        assert_eq!(state.evaluate(&a, 40.0, 50.0, 10.0), ThreatSignal::Enter);
        // Exactly on the band edge does not clear
        assert_eq!(state.evaluate(&a, 60.0, 50.0, 10.0), ThreatSignal::None);
        assert!(state.is_open(&a));
        assert_eq!(state.evaluate(&a, 45.0, 50.0, 10.0), ThreatSignal::AlreadyAlerted);

        assert_eq!(state.evaluate(&a, 65.0, 50.0, 10.0), ThreatSignal::None);
        assert!(!state.is_open(&a));
        assert_eq!(state.evaluate(&a, 40.0, 50.0, 10.0), ThreatSignal::Enter);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let mut state = AlertState::new();
        assert_eq!(state.evaluate(&id("edge"), 50.0, 50.0, 10.0), ThreatSignal::Enter);
    }

    #[test]
    fn test_far_target_never_opens() {
        let mut state = AlertState::new();
        assert_eq!(state.evaluate(&id("far"), 55.0, 50.0, 10.0), ThreatSignal::None);
        assert!(state.is_empty());
    }

    #[test]
    fn test_clear_and_forget() {
        let mut state = AlertState::new();
        state.evaluate(&id("a"), 1.0, 50.0, 10.0);
        state.evaluate(&id("b"), 1.0, 50.0, 10.0);

        assert!(state.forget(&id("a")));
        assert!(!state.forget(&id("a")));
        assert_eq!(state.len(), 1);

        state.clear();
        assert!(state.is_empty());
        assert_eq!(state.evaluate(&id("b"), 1.0, 50.0, 10.0), ThreatSignal::Enter);
    }
}
