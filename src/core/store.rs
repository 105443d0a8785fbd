//! Authoritative set of rendered targets.
//!
//! Every refresh cycle hands the fresh feed to [`TargetStore::reconcile`],
//! which diffs it against what is currently drawn and returns the
//! add/update/remove deltas for the renderer.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::{Target, TargetId};

/// Opaque reference to a map-drawn entity. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A target currently on the map.
#[derive(Debug, Clone)]
pub struct RenderedEntry {
    pub handle: RenderHandle,
    /// Last-known record for this id.
    pub target: Target,
    /// Evaluation time of the cycle that first drew this id.
    pub first_seen: DateTime<Utc>,
}

/// Deltas produced by one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub added: Vec<Target>,
    pub updated: Vec<Target>,
    pub removed: Vec<TargetId>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct TargetStore {
    entries: HashMap<TargetId, RenderedEntry>,
    /// Feed order of the last reconcile.
    order: Vec<TargetId>,
    next_handle: u64,
}

impl TargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs `targets` against the stored set as of `now`.
    ///
    /// Afterwards the stored id set equals the ids of the non-expired
    /// targets in `targets`. When an id repeats inside one payload the last
    /// record wins and the id is reported once.
    pub fn reconcile(&mut self, targets: &[Target], now: DateTime<Utc>) -> Reconciliation {
        let mut result = Reconciliation::default();

        // 1. Collapse the payload to live targets, one per id
        let mut order: Vec<TargetId> = Vec::new();
        let mut latest: HashMap<&TargetId, &Target> = HashMap::new();
        for target in targets.iter().filter(|t| !t.is_expired(now)) {
            if latest.insert(&target.id, target).is_none() {
                order.push(target.id.clone());
            }
        }
        let current_ids: HashSet<&TargetId> = latest.keys().copied().collect();

        // 2. Drop everything that vanished or expired
        for id in &self.order {
            if !current_ids.contains(id) && self.entries.remove(id).is_some() {
                result.removed.push(id.clone());
            }
        }

        // 3. Add new ids, refresh the rest in place
        for id in &order {
            let Some(target) = latest.get(id).copied() else {
                continue;
            };
            if let Some(entry) = self.entries.get_mut(id) {
                entry.target = target.clone();
                result.updated.push(target.clone());
            } else {
                let handle = RenderHandle(self.next_handle);
                self.next_handle += 1;
                self.entries.insert(
                    id.clone(),
                    RenderedEntry {
                        handle,
                        target: target.clone(),
                        first_seen: now,
                    },
                );
                result.added.push(target.clone());
            }
        }

        self.order = order;
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &TargetId) -> Option<&RenderedEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> HashSet<TargetId> {
        self.entries.keys().cloned().collect()
    }

    /// Stored targets in the feed order of the last reconcile.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.target))
    }
}
