// Geofence alerting.
//
// Architecture:
// - model.rs: Threat signals, events and focus requests
// - state.rs: Open-alert set with hysteresis re-arming
// - engine.rs: Per-cycle geofence evaluation over the target list

pub mod engine;
pub mod model;
pub mod state;
