use crate::tools::default_base_tools;
use crate::util::{env_bool, env_duration_ms};
use std::time::Duration;

const SHOW_TOOL_CARDS_ENV: &str = "DOCPANEL_SHOW_TOOL_CARDS";
const SHOW_DEBUG_DETAIL_ENV: &str = "DOCPANEL_SHOW_DEBUG_DETAIL";
const BATCH_APPLY_DELAY_ENV: &str = "DOCPANEL_BATCH_APPLY_DELAY_MS";
const FINISH_COOLDOWN_ENV: &str = "DOCPANEL_FINISH_COOLDOWN_MS";

/// Minimum spacing between sequential batch applies. Empirically chosen to
/// keep host-side document mutations from racing each other; treat as
/// policy, not a correctness constant.
pub const DEFAULT_BATCH_APPLY_DELAY: Duration = Duration::from_millis(500);
/// Window in which a repeated "finished" echo for the same tool is dropped.
pub const DEFAULT_FINISH_COOLDOWN: Duration = Duration::from_millis(1500);

/// Session configuration consumed by the coordinator. The host panel
/// persists these (tool catalog, display toggles, model selection); the
/// coordinator only reads them.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Statically configured tool set the per-message whitelist is derived from.
    pub base_tools: Vec<String>,
    /// Conversation mode tag forwarded verbatim in `user_message`.
    pub mode: String,
    /// Model id forwarded verbatim in `user_message`.
    pub selected_model_id: String,
    /// Render tool-call status cards inside the streamed output.
    pub show_tool_cards: bool,
    /// Render per-card progress detail lines (verbose/debug display).
    pub show_debug_detail: bool,
    /// Inter-operation delay for sequential batch accept.
    pub batch_apply_delay: Duration,
    /// Duplicate tool-completion suppression window.
    pub finish_cooldown: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_tools: default_base_tools(),
            mode: "document".to_string(),
            selected_model_id: String::new(),
            show_tool_cards: true,
            show_debug_detail: false,
            batch_apply_delay: DEFAULT_BATCH_APPLY_DELAY,
            finish_cooldown: DEFAULT_FINISH_COOLDOWN,
        }
    }
}

impl PanelConfig {
    /// Defaults with env-var overrides applied, for headless runs and tests.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(show) = env_bool(SHOW_TOOL_CARDS_ENV) {
            config.show_tool_cards = show;
        }
        if let Some(show) = env_bool(SHOW_DEBUG_DETAIL_ENV) {
            config.show_debug_detail = show;
        }
        if let Some(delay) = env_duration_ms(BATCH_APPLY_DELAY_ENV) {
            config.batch_apply_delay = delay;
        }
        if let Some(cooldown) = env_duration_ms(FINISH_COOLDOWN_ENV) {
            config.finish_cooldown = cooldown;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_policy_constants() {
        let config = PanelConfig::default();
        assert_eq!(config.batch_apply_delay, Duration::from_millis(500));
        assert_eq!(config.finish_cooldown, Duration::from_millis(1500));
        assert!(config.show_tool_cards);
        assert!(!config.show_debug_detail);
        assert!(!config.base_tools.is_empty());
    }

    #[test]
    fn test_from_env_overrides_timing_policy() {
        std::env::set_var(BATCH_APPLY_DELAY_ENV, "120");
        std::env::set_var(SHOW_DEBUG_DETAIL_ENV, "on");
        let config = PanelConfig::from_env();
        assert_eq!(config.batch_apply_delay, Duration::from_millis(120));
        assert!(config.show_debug_detail);
        std::env::remove_var(BATCH_APPLY_DELAY_ENV);
        std::env::remove_var(SHOW_DEBUG_DETAIL_ENV);
    }
}
