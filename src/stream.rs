//! Accumulates model output for the in-progress turn and renders it
//! through the sink, tolerating suspension caused by pending previews and
//! out-of-order tool-card completion.
//!
//! Rendering is an idempotent full re-render of the accumulated text, not
//! an append-only diff: each pass splices the current tool-card snippets
//! over placeholder tokens embedded in the raw stream, so a card's visual
//! state can change without re-issuing the surrounding prose.

use crate::config::PanelConfig;
use crate::render::RenderSink;
use aho_corasick::AhoCorasick;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Running,
    Completed,
}

#[derive(Debug, Clone)]
pub struct CardDetail {
    pub message: String,
    pub received_at: Instant,
}

/// Status card for one tool invocation within the current streamed turn.
#[derive(Debug, Clone)]
pub struct ToolCallCard {
    pub id: u64,
    pub tool_name: String,
    pub status: CardStatus,
    pub detail: Vec<CardDetail>,
    /// Set when the card was completed through the forced patch path while
    /// the stream was suspended; the sink should skip the completion
    /// animation for it.
    pub animation_suppressed: bool,
}

/// Display and timing policy, copied out of [`PanelConfig`] at session
/// construction.
#[derive(Debug, Clone)]
pub struct StreamPolicy {
    pub show_tool_cards: bool,
    pub show_debug_detail: bool,
    pub finish_cooldown: Duration,
}

impl From<&PanelConfig> for StreamPolicy {
    fn from(config: &PanelConfig) -> Self {
        Self {
            show_tool_cards: config.show_tool_cards,
            show_debug_detail: config.show_debug_detail,
            finish_cooldown: config.finish_cooldown,
        }
    }
}

/// Each card owns one placeholder token in the raw stream. Upstream text
/// transforms may escape plain braces, so several textual forms of the
/// same token must all resolve to the card's current snippet.
fn placeholder(card_id: u64) -> String {
    format!("{{{{tool-card:{card_id}}}}}")
}

fn placeholder_variants(card_id: u64) -> [String; 3] {
    [
        placeholder(card_id),
        format!("\\{{\\{{tool-card:{card_id}\\}}\\}}"),
        format!("&#123;&#123;tool-card:{card_id}&#125;&#125;"),
    ]
}

/// Current visual snippet for a card.
pub fn card_snippet(card: &ToolCallCard, show_debug_detail: bool) -> String {
    let mut out = match card.status {
        CardStatus::Running => format!("* {} (running)", card.tool_name),
        CardStatus::Completed => format!("+ {} (done)", card.tool_name),
    };
    if show_debug_detail {
        for line in &card.detail {
            out.push_str(&format!("\n  - {}", line.message));
        }
    }
    out
}

pub struct StreamCoordinator {
    policy: StreamPolicy,
    buffer: String,
    suspended: bool,
    generating: bool,
    cards: Vec<ToolCallCard>,
    next_card_id: u64,
    last_finish: HashMap<String, Instant>,
}

impl StreamCoordinator {
    pub fn new(policy: StreamPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
            suspended: false,
            generating: false,
            cards: Vec::new(),
            next_card_id: 0,
            last_finish: HashMap::new(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn card(&self, id: u64) -> Option<&ToolCallCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn cards(&self) -> &[ToolCallCard] {
        &self.cards
    }

    /// A new model turn starts: fresh buffer, fresh card cache, and any
    /// leftover suspension is discarded.
    pub fn begin_turn(&mut self) {
        self.buffer.clear();
        self.cards.clear();
        self.last_finish.clear();
        self.suspended = false;
        self.generating = true;
    }

    /// The turn ended (normal completion, user stop, or error). The
    /// suspended flag is forced false: a stuck flag would silently block
    /// every future turn.
    pub fn end_turn(&mut self) {
        self.buffer.clear();
        self.cards.clear();
        self.suspended = false;
        self.generating = false;
    }

    /// A preview awaits the user's decision; the model must not keep
    /// talking into the panel while they deliberate.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// All previews resolved. Dropped content is not replayed: the turn
    /// ended at the preview boundary and any continuation renders as a
    /// fresh logical turn. Cards are kept so late finish signals can still
    /// patch their badges.
    pub fn resume(&mut self) {
        self.suspended = false;
        self.buffer.clear();
    }

    /// Accumulate one streamed chunk and re-render. Ignored after the turn
    /// stopped; dropped outright (not buffered for later) while suspended.
    pub fn append(&mut self, chunk: &str, sink: &dyn RenderSink) {
        if !self.generating {
            debug!(len = chunk.len(), "append after turn stopped, ignoring");
            return;
        }
        if self.suspended {
            debug!(len = chunk.len(), "append while suspended, dropping");
            return;
        }
        self.buffer.push_str(chunk);
        self.render_full(sink);
    }

    /// Create a Running card for `tool_name`, or coalesce into the one
    /// already running under that name. Returns the card id.
    pub fn start_card(&mut self, tool_name: &str, sink: &dyn RenderSink) -> Option<u64> {
        if !self.generating {
            debug!(tool_name, "tool start outside a turn, ignoring");
            return None;
        }
        if let Some(existing) = self
            .cards
            .iter()
            .find(|card| card.status == CardStatus::Running && card.tool_name == tool_name)
        {
            debug!(tool_name, card_id = existing.id, "duplicate tool start coalesced");
            return Some(existing.id);
        }

        self.next_card_id += 1;
        let id = self.next_card_id;
        self.cards.push(ToolCallCard {
            id,
            tool_name: tool_name.to_string(),
            status: CardStatus::Running,
            detail: Vec::new(),
            animation_suppressed: false,
        });
        self.buffer.push_str(&format!("\n{}\n", placeholder(id)));
        if !self.suspended {
            self.render_full(sink);
        }
        Some(id)
    }

    /// Complete the most recent Running card for `tool_name`. A finish
    /// inside the cooldown window after the previous finish of the same
    /// tool is a duplicate echo and is suppressed. While suspended the
    /// normal re-render path is unavailable, so the card is patched
    /// directly through the sink.
    pub fn complete_card(&mut self, tool_name: &str, sink: &dyn RenderSink) {
        if let Some(last) = self.last_finish.get(tool_name) {
            if last.elapsed() < self.policy.finish_cooldown {
                debug!(tool_name, "duplicate tool finish within cooldown, suppressed");
                return;
            }
        }
        let Some(card) = self
            .cards
            .iter_mut()
            .rev()
            .find(|card| card.status == CardStatus::Running && card.tool_name == tool_name)
        else {
            debug!(tool_name, "tool finish with no running card, ignoring");
            return;
        };

        card.status = CardStatus::Completed;
        self.last_finish
            .insert(tool_name.to_string(), Instant::now());

        if self.suspended {
            card.animation_suppressed = true;
            let snippet = card_snippet(card, self.policy.show_debug_detail);
            sink.patch_card(card.id, &snippet);
        } else {
            self.render_full(sink);
        }
    }

    /// Attach a progress detail line to the currently running card.
    /// Detail is only rendered when the verbose/debug display flag is on.
    pub fn append_card_detail(&mut self, message: &str, sink: &dyn RenderSink) {
        let Some(card) = self
            .cards
            .iter_mut()
            .rev()
            .find(|card| card.status == CardStatus::Running)
        else {
            debug!("progress detail with no running card, ignoring");
            return;
        };
        card.detail.push(CardDetail {
            message: message.to_string(),
            received_at: Instant::now(),
        });
        if !self.policy.show_debug_detail {
            return;
        }
        if self.suspended {
            let snippet = card_snippet(card, true);
            sink.patch_card(card.id, &snippet);
        } else {
            self.render_full(sink);
        }
    }

    fn render_full(&self, sink: &dyn RenderSink) {
        sink.replace_stream_text(&self.spliced_text());
    }

    /// The accumulated text with every card placeholder (in any of its
    /// textual forms) replaced by that card's current snippet.
    fn spliced_text(&self) -> String {
        if self.cards.is_empty() {
            return self.buffer.clone();
        }

        let mut patterns = Vec::new();
        let mut replacements = Vec::new();
        for card in &self.cards {
            let snippet = if self.policy.show_tool_cards {
                card_snippet(card, self.policy.show_debug_detail)
            } else {
                String::new()
            };
            for variant in placeholder_variants(card.id) {
                patterns.push(variant);
                replacements.push(snippet.clone());
            }
        }

        match AhoCorasick::new(&patterns) {
            Ok(automaton) => automaton.replace_all(&self.buffer, &replacements),
            Err(err) => {
                error!(%err, "failed to build placeholder matcher");
                self.buffer.clone()
            }
        }
    }
}
