//! Lifecycle of proposed, not-yet-committed host actions ("previews").
//!
//! State machine per preview:
//! `Pending -> Applying -> Applied | Rejected`, plus `Pending -> Rejected`
//! for user or forced rejection. `Applied` and `Rejected` are terminal.
//! Previews are never deleted during a session; they stay resolved for
//! audit/history until the surrounding UI clears.

use crate::ledger::{Decision, DecisionLedger};
use crate::protocol::{HostChannel, HostOutbound};
use crate::render::RenderSink;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    Pending,
    Applying,
    Applied,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub id: u64,
    /// Host-driven action kind, open set ("insert_content", "modify_style", ...).
    pub action_type: String,
    pub parameters: Value,
    pub status: PreviewStatus,
    pub created_at: Instant,
    /// Host failure text when an apply settled as `Rejected`.
    pub failure_message: Option<String>,
}

#[derive(Debug, Default)]
pub struct PreviewManager {
    previews: Vec<Preview>,
    next_id: u64,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new `Pending` preview. The caller notifies the render
    /// sink so it can bind a visual element to the returned id.
    pub fn create(&mut self, action_type: &str, parameters: Value) -> &Preview {
        self.next_id += 1;
        self.previews.push(Preview {
            id: self.next_id,
            action_type: action_type.to_string(),
            parameters,
            status: PreviewStatus::Pending,
            created_at: Instant::now(),
            failure_message: None,
        });
        self.previews.last().expect("just pushed")
    }

    pub fn preview(&self, id: u64) -> Option<&Preview> {
        self.previews.iter().find(|preview| preview.id == id)
    }

    pub fn previews(&self) -> &[Preview] {
        &self.previews
    }

    pub fn pending_count(&self) -> usize {
        self.previews
            .iter()
            .filter(|preview| preview.status == PreviewStatus::Pending)
            .count()
    }

    /// True while any preview still awaits a decision or a host apply
    /// result. The stream stays suspended until this clears.
    pub fn has_unresolved(&self) -> bool {
        self.previews.iter().any(|preview| {
            matches!(
                preview.status,
                PreviewStatus::Pending | PreviewStatus::Applying
            )
        })
    }

    /// Accept one pending preview: record the decision, transition to
    /// `Applying`, emit the apply request. Missing or already-resolved ids
    /// are a no-op with a warning.
    pub fn accept(
        &mut self,
        id: u64,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
    ) {
        let Some(index) = self.previews.iter().position(|preview| preview.id == id) else {
            warn!(preview_id = id, "accept for unknown preview, ignoring");
            return;
        };
        if self.previews[index].status != PreviewStatus::Pending {
            warn!(
                preview_id = id,
                status = ?self.previews[index].status,
                "accept for already-resolved preview, ignoring"
            );
            return;
        }
        self.apply_one(index, ledger, channel, sink);
    }

    /// Reject one pending preview. Idempotent against repeated calls.
    pub fn reject(
        &mut self,
        id: u64,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
    ) {
        let Some(index) = self.previews.iter().position(|preview| preview.id == id) else {
            warn!(preview_id = id, "reject for unknown preview, ignoring");
            return;
        };
        match self.previews[index].status {
            PreviewStatus::Pending => self.reject_one(index, ledger, channel, sink),
            PreviewStatus::Rejected => {
                debug!(preview_id = id, "repeated reject, already rejected");
            }
            status => {
                warn!(preview_id = id, ?status, "reject for resolved preview, ignoring");
            }
        }
    }

    /// Accept every pending preview in creation order, strictly
    /// sequentially, waiting `delay` between consecutive applies (but not
    /// after the last). Concurrent apply requests could race against the
    /// same host document state, so batch application trades latency for
    /// correctness via serialization.
    pub async fn accept_all(
        &mut self,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
        delay: Duration,
    ) {
        let snapshot = self.pending_ids_in_creation_order();
        for (position, id) in snapshot.iter().enumerate() {
            if let Some(index) = self.previews.iter().position(|preview| preview.id == *id) {
                self.apply_one(index, ledger, channel, sink);
            }
            if position + 1 < snapshot.len() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Reject every pending preview. No pacing needed: nothing mutates the
    /// host document.
    pub fn reject_all(
        &mut self,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
    ) {
        for id in self.pending_ids_in_creation_order() {
            if let Some(index) = self.previews.iter().position(|preview| preview.id == id) {
                self.reject_one(index, ledger, channel, sink);
            }
        }
    }

    /// Reconcile a host apply outcome. A matching `Applying` preview is
    /// resolved directly; otherwise fall back to the earliest-created
    /// `Applying` preview (hosts that cannot echo the id). With nothing
    /// `Applying` the result is logged and dropped.
    pub fn resolve_apply_result(
        &mut self,
        preview_id: Option<u64>,
        success: bool,
        message: &str,
        sink: &dyn RenderSink,
    ) {
        let direct = preview_id.and_then(|id| {
            self.previews.iter().position(|preview| {
                preview.id == id && preview.status == PreviewStatus::Applying
            })
        });
        let index = direct.or_else(|| self.earliest_applying_index());
        let Some(index) = index else {
            warn!(
                ?preview_id,
                success, "apply result with no applying preview, dropping"
            );
            return;
        };

        let preview = &mut self.previews[index];
        if success {
            preview.status = PreviewStatus::Applied;
            sink.preview_status_changed(preview.id, PreviewStatus::Applied, None);
        } else {
            preview.status = PreviewStatus::Rejected;
            preview.failure_message = Some(message.to_string());
            sink.preview_status_changed(preview.id, PreviewStatus::Rejected, Some(message));
        }
    }

    fn pending_ids_in_creation_order(&self) -> Vec<u64> {
        let mut pending: Vec<&Preview> = self
            .previews
            .iter()
            .filter(|preview| preview.status == PreviewStatus::Pending)
            .collect();
        // created_at ascending; ids break ties since they are monotonic.
        pending.sort_by_key(|preview| (preview.created_at, preview.id));
        pending.iter().map(|preview| preview.id).collect()
    }

    fn earliest_applying_index(&self) -> Option<usize> {
        self.previews
            .iter()
            .enumerate()
            .filter(|(_, preview)| preview.status == PreviewStatus::Applying)
            .min_by_key(|(_, preview)| (preview.created_at, preview.id))
            .map(|(index, _)| index)
    }

    fn apply_one(
        &mut self,
        index: usize,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
    ) {
        let (id, action_type, parameters) = {
            let preview = &self.previews[index];
            (
                preview.id,
                preview.action_type.clone(),
                preview.parameters.clone(),
            )
        };

        // Auditing must never block the user-visible apply.
        if let Err(error) = ledger.record(&action_type, Decision::Accepted, id) {
            warn!(preview_id = id, %error, "failed to record accept decision");
        }

        self.previews[index].status = PreviewStatus::Applying;
        sink.preview_status_changed(id, PreviewStatus::Applying, None);
        channel.send(HostOutbound::ApplyPreviewedAction {
            action_type,
            parameters,
            preview_id: id,
        });
    }

    fn reject_one(
        &mut self,
        index: usize,
        ledger: &mut DecisionLedger,
        channel: &HostChannel,
        sink: &dyn RenderSink,
    ) {
        let (id, action_type) = {
            let preview = &self.previews[index];
            (preview.id, preview.action_type.clone())
        };

        if let Err(error) = ledger.record(&action_type, Decision::Rejected, id) {
            warn!(preview_id = id, %error, "failed to record reject decision");
        }

        self.previews[index].status = PreviewStatus::Rejected;
        sink.preview_status_changed(id, PreviewStatus::Rejected, None);
        channel.send(HostOutbound::RejectPreviewedAction {
            action_type,
            preview_id: id,
        });
    }
}
