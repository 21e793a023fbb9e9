//! Co-activation graph storage (§3, §4.5). Retrieval (C6) reads edges for
//! the optional neighbor-boost activation component; maintenance workers
//! (C9) own writing to it. Lives here, rather than in either consumer crate,
//! so neither has to depend on the other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memos_core::error::{Classify, ErrorKind};
use memos_core::{MemoryId, OrganizationId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decay rate for `edge_weight = 1 - exp(-lambda * count)` (§3).
pub const COACTIVATION_LAMBDA: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoactivationEdge {
    pub organization_id: OrganizationId,
    /// Canonical ordering: `a < b`.
    pub a: MemoryId,
    pub b: MemoryId,
    pub count: i64,
    pub edge_weight: f64,
    pub last_coactivated_at: DateTime<Utc>,
}

impl CoactivationEdge {
    pub fn canonical_pair(x: MemoryId, y: MemoryId) -> (MemoryId, MemoryId) {
        if x < y {
            (x, y)
        } else {
            (y, x)
        }
    }

    pub fn new(organization_id: OrganizationId, x: MemoryId, y: MemoryId, now: DateTime<Utc>) -> Self {
        let (a, b) = Self::canonical_pair(x, y);
        Self {
            organization_id,
            a,
            b,
            count: 1,
            edge_weight: edge_weight_for_count(1),
            last_coactivated_at: now,
        }
    }

    pub fn bump(&mut self, now: DateTime<Utc>) {
        self.count += 1;
        self.edge_weight = edge_weight_for_count(self.count);
        self.last_coactivated_at = now;
    }

    /// Sliding-window update (§4.5): within the window, behaves like `bump`;
    /// past it, the count resets to 1 rather than growing unbounded.
    pub fn record_within_window(&mut self, now: DateTime<Utc>, window_hours: i64) {
        if self.last_coactivated_at >= now - chrono::Duration::hours(window_hours) {
            self.count += 1;
        } else {
            self.count = 1;
        }
        self.edge_weight = edge_weight_for_count(self.count);
        self.last_coactivated_at = now;
    }

    /// Recomputes `edge_weight` from `count` in place (§4.5 nightly decay
    /// step 2: renormalization in case drift accumulated).
    pub fn renormalize(&mut self) {
        self.edge_weight = edge_weight_for_count(self.count);
    }
}

/// `edge_weight = 1 - exp(-lambda * count)`, clamped to `[0, 1]` (§8 invariant).
pub fn edge_weight_for_count(count: i64) -> f64 {
    (1.0 - (-COACTIVATION_LAMBDA * count as f64).exp()).clamp(0.0, 1.0)
}

#[derive(Debug, thiserror::Error)]
pub enum CoactivationError {
    #[error("coactivation graph unavailable: {0}")]
    Unavailable(String),
}

impl Classify for CoactivationError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoactivationError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

#[async_trait]
pub trait CoactivationRepo: Send + Sync {
    async fn upsert_pair(
        &self,
        organization_id: OrganizationId,
        a: MemoryId,
        b: MemoryId,
        now: DateTime<Utc>,
    ) -> Result<CoactivationEdge, CoactivationError>;

    async fn neighbors(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Vec<CoactivationEdge>, CoactivationError>;

    /// Max edge_weight from `memory_id` to any id in `others` (nbr activation
    /// component, §4.2). `None` when no edge exists between them.
    async fn max_weight_to(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
        others: &[MemoryId],
    ) -> Result<Option<f64>, CoactivationError>;

    async fn list_all(&self, organization_id: OrganizationId) -> Result<Vec<CoactivationEdge>, CoactivationError>;

    async fn remove(&self, organization_id: OrganizationId, a: MemoryId, b: MemoryId) -> Result<(), CoactivationError>;

    /// Sliding-window co-activation record (§4.5): increments `count` when
    /// the edge last fired within `window_hours`, otherwise resets it to 1.
    /// Distinct from `upsert_pair`, which always increments and is what
    /// agent side effects use to record a one-off semantic link.
    async fn record_with_window(
        &self,
        organization_id: OrganizationId,
        a: MemoryId,
        b: MemoryId,
        now: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<CoactivationEdge, CoactivationError>;

    /// Overwrites an edge wholesale (§4.5 nightly decay step 2/3: weight
    /// renormalization and pruning).
    async fn replace(&self, edge: CoactivationEdge) -> Result<(), CoactivationError>;
}

#[derive(Default)]
pub struct InMemoryCoactivationRepo {
    edges: parking_lot::Mutex<HashMap<(OrganizationId, MemoryId, MemoryId), CoactivationEdge>>,
}

#[async_trait]
impl CoactivationRepo for InMemoryCoactivationRepo {
    async fn upsert_pair(
        &self,
        organization_id: OrganizationId,
        x: MemoryId,
        y: MemoryId,
        now: DateTime<Utc>,
    ) -> Result<CoactivationEdge, CoactivationError> {
        let (a, b) = CoactivationEdge::canonical_pair(x, y);
        let mut edges = self.edges.lock();
        let edge = match edges.entry((organization_id, a, b)) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.get_mut().bump(now);
                slot.get().clone()
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(CoactivationEdge::new(organization_id, a, b, now)).clone()
            }
        };
        Ok(edge)
    }

    async fn neighbors(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Vec<CoactivationEdge>, CoactivationError> {
        Ok(self
            .edges
            .lock()
            .values()
            .filter(|e| {
                e.organization_id == organization_id && (e.a == memory_id || e.b == memory_id)
            })
            .cloned()
            .collect())
    }

    async fn max_weight_to(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
        others: &[MemoryId],
    ) -> Result<Option<f64>, CoactivationError> {
        let edges = self.edges.lock();
        let weight = others
            .iter()
            .filter(|&&other| other != memory_id)
            .filter_map(|&other| {
                let (a, b) = CoactivationEdge::canonical_pair(memory_id, other);
                edges.get(&(organization_id, a, b)).map(|e| e.edge_weight)
            })
            .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |m| m.max(w))));
        Ok(weight)
    }

    async fn list_all(&self, organization_id: OrganizationId) -> Result<Vec<CoactivationEdge>, CoactivationError> {
        Ok(self
            .edges
            .lock()
            .values()
            .filter(|e| e.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn remove(&self, organization_id: OrganizationId, x: MemoryId, y: MemoryId) -> Result<(), CoactivationError> {
        let (a, b) = CoactivationEdge::canonical_pair(x, y);
        self.edges.lock().remove(&(organization_id, a, b));
        Ok(())
    }

    async fn record_with_window(
        &self,
        organization_id: OrganizationId,
        x: MemoryId,
        y: MemoryId,
        now: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<CoactivationEdge, CoactivationError> {
        let (a, b) = CoactivationEdge::canonical_pair(x, y);
        let mut edges = self.edges.lock();
        let edge = match edges.entry((organization_id, a, b)) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.get_mut().record_within_window(now, window_hours);
                slot.get().clone()
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(CoactivationEdge::new(organization_id, a, b, now)).clone()
            }
        };
        Ok(edge)
    }

    async fn replace(&self, edge: CoactivationEdge) -> Result<(), CoactivationError> {
        self.edges.lock().insert((edge.organization_id, edge.a, edge.b), edge);
        Ok(())
    }
}
