//! Seam between the coordinator and the host panel's visual layer.
//!
//! The sink holds only weak, id-keyed references to coordinator state: it
//! receives ids and rendered snippets, looks records up on demand via the
//! session accessors, and must tolerate a record disappearing or changing
//! without notice. It never mutates coordinator state.

use crate::preview::PreviewStatus;
use serde_json::Value;
use std::sync::Mutex;

pub trait RenderSink: Send + Sync {
    /// Idempotent full re-render of the in-progress turn's text.
    fn replace_stream_text(&self, text: &str);

    /// Forced patch of one tool-call card, usable regardless of suspension
    /// state. This is the named escape hatch for card updates while the
    /// normal re-render path is suspended.
    fn patch_card(&self, card_id: u64, snippet: &str);

    /// A new preview awaits the user's decision; bind a visual element to
    /// `preview_id`.
    fn preview_created(&self, preview_id: u64, action_type: &str, parameters: &Value);

    /// A preview changed state (started applying, applied, rejected);
    /// update its badge in place. `message` carries the host failure text
    /// when the status is `Rejected` because an apply failed.
    fn preview_status_changed(&self, preview_id: u64, status: PreviewStatus, message: Option<&str>);
}

/// What a [`RecordingSink`] observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    ReplaceStreamText(String),
    PatchCard {
        card_id: u64,
        snippet: String,
    },
    PreviewCreated {
        preview_id: u64,
        action_type: String,
    },
    PreviewStatusChanged {
        preview_id: u64,
        status: PreviewStatus,
        message: Option<String>,
    },
}

/// In-memory sink that records every call. Used by this crate's tests and
/// useful for headless embedding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().expect("sink lock").clone()
    }

    /// The most recent full stream re-render, if any happened.
    pub fn last_stream_text(&self) -> Option<String> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                SinkEvent::ReplaceStreamText(text) => Some(text),
                _ => None,
            })
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().expect("sink lock").push(event);
    }
}

impl RenderSink for RecordingSink {
    fn replace_stream_text(&self, text: &str) {
        self.push(SinkEvent::ReplaceStreamText(text.to_string()));
    }

    fn patch_card(&self, card_id: u64, snippet: &str) {
        self.push(SinkEvent::PatchCard {
            card_id,
            snippet: snippet.to_string(),
        });
    }

    fn preview_created(&self, preview_id: u64, action_type: &str, _parameters: &Value) {
        self.push(SinkEvent::PreviewCreated {
            preview_id,
            action_type: action_type.to_string(),
        });
    }

    fn preview_status_changed(&self, preview_id: u64, status: PreviewStatus, message: Option<&str>) {
        self.push(SinkEvent::PreviewStatusChanged {
            preview_id,
            status,
            message: message.map(str::to_string),
        });
    }
}
