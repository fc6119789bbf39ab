//! Per-chat-session orchestration: one [`PanelSession`] owns the preview
//! set, stream state, and decision ledger, sequences them across turns,
//! and dispatches every inbound host message. All state is session-scoped
//! and torn down by drop; nothing here is process-wide.

use crate::config::PanelConfig;
use crate::intent::{compute_whitelist, Intent};
use crate::ledger::{Decision, DecisionLedger};
use crate::preview::{Preview, PreviewManager};
use crate::protocol::{
    classify_progress, HostChannel, HostInbound, HostOutbound, ProgressSignal,
};
use crate::render::RenderSink;
use crate::stream::{StreamCoordinator, StreamPolicy, ToolCallCard};
use crate::tools::action_tool_name;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct PanelSession {
    config: PanelConfig,
    channel: HostChannel,
    sink: Arc<dyn RenderSink>,
    previews: PreviewManager,
    stream: StreamCoordinator,
    ledger: DecisionLedger,
    turn_counter: u64,
}

impl PanelSession {
    pub fn new(
        config: PanelConfig,
        outbound: mpsc::UnboundedSender<HostOutbound>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let stream = StreamCoordinator::new(StreamPolicy::from(&config));
        Self {
            config,
            channel: HostChannel::new(outbound),
            sink,
            previews: PreviewManager::new(),
            stream,
            ledger: DecisionLedger::new(),
            turn_counter: 0,
        }
    }

    /// Send a user message to the host. Any previews still pending are
    /// force-rejected (with decisions recorded) before the message is
    /// transmitted; everything recorded since the last send travels along
    /// as a prior-actions block, and the tool whitelist is freshly derived
    /// from the message text.
    pub fn send_user_message(&mut self, text: &str, contexts: Option<Value>) -> Intent {
        if self.previews.pending_count() > 0 {
            self.previews
                .reject_all(&mut self.ledger, &self.channel, self.sink.as_ref());
        }

        let prior = self.ledger.drain_for_next_message();
        let (enabled_tools, intent) = compute_whitelist(&self.config.base_tools, text);
        let message = match prior {
            Some(block) => format!("{block}\n\n{text}"),
            None => text.to_string(),
        };

        self.turn_counter += 1;
        self.channel.send(HostOutbound::UserMessage {
            message,
            mode: self.config.mode.clone(),
            selected_model_id: self.config.selected_model_id.clone(),
            enabled_tools,
            contexts,
        });
        intent
    }

    /// Dispatch one inbound host message. Total: unknown input is logged
    /// and ignored, and no branch lets an error escape the dispatch.
    pub fn handle_host_message(&mut self, message: HostInbound) {
        match message {
            HostInbound::ToolPreview {
                success,
                preview_mode,
                action_type,
                parameters,
                message,
            } => self.on_tool_preview(success, preview_mode, &action_type, parameters, &message),
            HostInbound::ActionApplied {
                success,
                message,
                preview_id,
            } => {
                self.previews
                    .resolve_apply_result(preview_id, success, &message, self.sink.as_ref());
                self.resume_if_settled();
            }
            HostInbound::ToolProgress { message, .. } => match classify_progress(&message) {
                ProgressSignal::Started(name) => {
                    self.stream.start_card(&name, self.sink.as_ref());
                }
                ProgressSignal::Finished(name) => {
                    self.stream.complete_card(&name, self.sink.as_ref());
                }
                ProgressSignal::Detail => {
                    self.stream.append_card_detail(&message, self.sink.as_ref());
                }
            },
            HostInbound::AppendContent { content } => {
                self.stream.append(&content, self.sink.as_ref());
            }
            HostInbound::StartGenerating => self.stream.begin_turn(),
            HostInbound::FinishGenerating => self.stream.end_turn(),
            HostInbound::Unknown => debug!("unknown host message ignored"),
        }
    }

    fn on_tool_preview(
        &mut self,
        success: bool,
        preview_mode: bool,
        action_type: &str,
        parameters: Value,
        message: &str,
    ) {
        // The preview report doubles as the completion signal for the
        // tool's card, whether or not a preview gets created.
        let tool_name = action_tool_name(action_type).to_string();
        self.stream.complete_card(&tool_name, self.sink.as_ref());

        if !(success && preview_mode) {
            warn!(action_type, message, "tool preview unavailable");
            if !message.is_empty() {
                self.stream.append_card_detail(message, self.sink.as_ref());
            }
            return;
        }

        let (id, params) = {
            let preview = self.previews.create(action_type, parameters);
            (preview.id, preview.parameters.clone())
        };
        self.sink.preview_created(id, action_type, &params);
        self.stream.suspend();
    }

    pub fn accept_preview(&mut self, id: u64) {
        self.previews
            .accept(id, &mut self.ledger, &self.channel, self.sink.as_ref());
    }

    pub fn reject_preview(&mut self, id: u64) {
        self.previews
            .reject(id, &mut self.ledger, &self.channel, self.sink.as_ref());
        self.resume_if_settled();
    }

    pub async fn accept_all_previews(&mut self) {
        self.previews
            .accept_all(
                &mut self.ledger,
                &self.channel,
                self.sink.as_ref(),
                self.config.batch_apply_delay,
            )
            .await;
        self.resume_if_settled();
    }

    pub fn reject_all_previews(&mut self) {
        self.previews
            .reject_all(&mut self.ledger, &self.channel, self.sink.as_ref());
        self.resume_if_settled();
    }

    /// User-initiated stop. The generating flag flips immediately (checked
    /// at every append); apply requests already in flight are not
    /// cancelled and still settle through `action_applied`.
    pub fn stop(&mut self) {
        self.channel.send(HostOutbound::StopGeneration {
            message_id: self.turn_counter.to_string(),
        });
        self.stream.end_turn();
    }

    fn resume_if_settled(&mut self) {
        if self.stream.is_suspended() && !self.previews.has_unresolved() {
            self.stream.resume();
        }
    }

    // Id-keyed lookups for the render sink: query, don't assume liveness.

    pub fn preview(&self, id: u64) -> Option<&Preview> {
        self.previews.preview(id)
    }

    pub fn previews(&self) -> &[Preview] {
        self.previews.previews()
    }

    pub fn card(&self, id: u64) -> Option<&ToolCallCard> {
        self.stream.card(id)
    }

    pub fn cards(&self) -> &[ToolCallCard] {
        self.stream.cards()
    }

    /// Latest recorded decision for a tool, for cross-turn gating.
    pub fn last_decision(&self, tool_name: &str) -> Option<Decision> {
        self.ledger.last_decision(tool_name)
    }

    pub fn is_generating(&self) -> bool {
        self.stream.is_generating()
    }

    pub fn is_suspended(&self) -> bool {
        self.stream.is_suspended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewStatus;
    use crate::render::{RecordingSink, SinkEvent};
    use crate::stream::CardStatus;
    use crate::tools::{INSERT_FORMATTED_TEXT, LIST_HEADINGS, WORD_COUNT};
    use serde_json::json;

    fn session() -> (
        PanelSession,
        mpsc::UnboundedReceiver<HostOutbound>,
        Arc<RecordingSink>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::new());
        let session = PanelSession::new(PanelConfig::default(), tx, sink.clone());
        (session, rx, sink)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<HostOutbound>) -> Vec<HostOutbound> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn inject_preview(session: &mut PanelSession, action_type: &str) {
        session.handle_host_message(HostInbound::ToolPreview {
            success: true,
            preview_mode: true,
            action_type: action_type.to_string(),
            parameters: json!({"text":"draft"}),
            message: String::new(),
        });
    }

    #[test]
    fn test_user_message_carries_fresh_whitelist() {
        let (mut session, mut rx, _sink) = session();
        let intent = session.send_user_message("show me the headings", None);
        assert_eq!(intent, Intent::Analysis);

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        let HostOutbound::UserMessage { enabled_tools, .. } = &sent[0] else {
            panic!("expected user_message");
        };
        assert!(enabled_tools.contains(&WORD_COUNT.to_string()));
        assert!(enabled_tools.contains(&LIST_HEADINGS.to_string()));
        assert!(!enabled_tools.contains(&INSERT_FORMATTED_TEXT.to_string()));
    }

    #[test]
    fn test_pending_previews_force_rejected_before_send() {
        let (mut session, mut rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        inject_preview(&mut session, "insert_content");
        inject_preview(&mut session, "modify_style");
        assert_eq!(session.previews().len(), 2);

        session.send_user_message("never mind, what's the word count?", None);

        for preview in session.previews() {
            assert_eq!(preview.status, PreviewStatus::Rejected);
        }

        // Rejections reach the host strictly before the new message, and
        // the message carries the recorded decisions.
        let sent = drain(&mut rx);
        assert!(matches!(sent[0], HostOutbound::RejectPreviewedAction { .. }));
        assert!(matches!(sent[1], HostOutbound::RejectPreviewedAction { .. }));
        let HostOutbound::UserMessage { message, .. } = &sent[2] else {
            panic!("expected user_message last");
        };
        assert!(message.starts_with("[Prior actions]"));
        assert!(message.contains("rejected"));
        assert!(message.ends_with("never mind, what's the word count?"));
    }

    #[test]
    fn test_tool_preview_suspends_stream_and_drops_content() {
        let (mut session, _rx, sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        session.handle_host_message(HostInbound::AppendContent {
            content: "Here is my plan. ".to_string(),
        });
        inject_preview(&mut session, "insert_content");
        assert!(session.is_suspended());

        session.handle_host_message(HostInbound::AppendContent {
            content: "overflow while deciding".to_string(),
        });
        let rendered = sink.last_stream_text().unwrap();
        assert!(!rendered.contains("overflow while deciding"));
    }

    #[test]
    fn test_action_applied_resolves_and_resumes() {
        let (mut session, _rx, sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        inject_preview(&mut session, "insert_content");
        let id = session.previews()[0].id;
        session.accept_preview(id);

        session.handle_host_message(HostInbound::ActionApplied {
            success: true,
            message: String::new(),
            preview_id: Some(id),
        });

        assert_eq!(session.preview(id).unwrap().status, PreviewStatus::Applied);
        assert!(!session.is_suspended());
        assert!(sink.events().iter().any(|event| matches!(
            event,
            SinkEvent::PreviewStatusChanged { preview_id, status: PreviewStatus::Applied, .. }
                if *preview_id == id
        )));
    }

    #[test]
    fn test_failed_apply_settles_as_rejected_with_message() {
        let (mut session, _rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        inject_preview(&mut session, "insert_content");
        let id = session.previews()[0].id;
        session.accept_preview(id);

        session.handle_host_message(HostInbound::ActionApplied {
            success: false,
            message: "document is locked".to_string(),
            preview_id: None,
        });

        let preview = session.preview(id).unwrap();
        assert_eq!(preview.status, PreviewStatus::Rejected);
        assert_eq!(preview.failure_message.as_deref(), Some("document is locked"));
        assert_eq!(
            session.last_decision(INSERT_FORMATTED_TEXT),
            Some(Decision::Accepted)
        );
    }

    #[test]
    fn test_tool_progress_drives_card_lifecycle() {
        let (mut session, _rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        session.handle_host_message(HostInbound::ToolProgress {
            message: "word_count started".to_string(),
            timestamp: None,
        });
        assert_eq!(session.cards().len(), 1);
        assert_eq!(session.cards()[0].status, CardStatus::Running);

        session.handle_host_message(HostInbound::ToolProgress {
            message: "counting paragraphs".to_string(),
            timestamp: None,
        });
        assert_eq!(session.cards()[0].detail.len(), 1);

        session.handle_host_message(HostInbound::ToolProgress {
            message: "word_count finished".to_string(),
            timestamp: None,
        });
        assert_eq!(session.cards()[0].status, CardStatus::Completed);
    }

    #[test]
    fn test_preview_report_completes_running_card() {
        let (mut session, _rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        session.handle_host_message(HostInbound::ToolProgress {
            message: "insert_formatted_text started".to_string(),
            timestamp: None,
        });
        // No explicit finish: the preview itself closes the card.
        inject_preview(&mut session, "insert_content");
        assert_eq!(session.cards()[0].status, CardStatus::Completed);
    }

    #[test]
    fn test_failed_tool_preview_creates_no_preview() {
        let (mut session, _rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        session.handle_host_message(HostInbound::ToolPreview {
            success: false,
            preview_mode: true,
            action_type: "insert_content".to_string(),
            parameters: json!({}),
            message: "selection lost".to_string(),
        });
        assert!(session.previews().is_empty());
        assert!(!session.is_suspended());
    }

    #[test]
    fn test_stop_ends_turn_and_notifies_host() {
        let (mut session, mut rx, _sink) = session();
        session.send_user_message("insert a heading", None);
        session.handle_host_message(HostInbound::StartGenerating);
        assert!(session.is_generating());

        session.stop();
        assert!(!session.is_generating());
        let sent = drain(&mut rx);
        assert!(sent
            .iter()
            .any(|message| matches!(message, HostOutbound::StopGeneration { .. })));
    }

    #[test]
    fn test_unknown_host_message_is_ignored() {
        let (mut session, mut rx, sink) = session();
        session.handle_host_message(HostInbound::Unknown);
        assert!(drain(&mut rx).is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_all_resumes_only_after_results_land() {
        let (mut session, mut rx, _sink) = session();
        session.handle_host_message(HostInbound::StartGenerating);
        inject_preview(&mut session, "insert_content");
        inject_preview(&mut session, "modify_style");
        assert!(session.is_suspended());

        session.accept_all_previews().await;
        // Applies are out but unresolved: stay suspended.
        assert!(session.is_suspended());

        let ids: Vec<u64> = session.previews().iter().map(|preview| preview.id).collect();
        session.handle_host_message(HostInbound::ActionApplied {
            success: true,
            message: String::new(),
            preview_id: Some(ids[0]),
        });
        assert!(session.is_suspended());
        session.handle_host_message(HostInbound::ActionApplied {
            success: true,
            message: String::new(),
            preview_id: Some(ids[1]),
        });
        assert!(!session.is_suspended());

        let applies = drain(&mut rx)
            .into_iter()
            .filter(|message| matches!(message, HostOutbound::ApplyPreviewedAction { .. }))
            .count();
        assert_eq!(applies, 2);
    }
}
