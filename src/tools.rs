//! Static catalog of the tools the host document exposes to the model.
//!
//! The base tool list itself is configuration (persisted by the host panel,
//! see `PanelConfig`); this module only fixes the stable names and the
//! read-only/mutating split that the intent gate and the decision ledger
//! depend on.

/// Document statistics (word/char/paragraph counts). Read-only.
pub const WORD_COUNT: &str = "word_count";
/// List the document's headings/outline. Read-only, keyword-gated.
pub const LIST_HEADINGS: &str = "list_headings";
/// Fetch the body text under one specific heading. Read-only, reference-gated.
pub const GET_HEADING_CONTENT: &str = "get_heading_content";
/// Current selection text. Read-only.
pub const GET_SELECTION_TEXT: &str = "get_selection_text";
/// Images present in the document. Read-only.
pub const GET_IMAGES: &str = "get_images";
/// Tables present in the document. Read-only.
pub const GET_TABLES: &str = "get_tables";
/// Formulas present in the document. Read-only.
pub const GET_FORMULAS: &str = "get_formulas";

/// Validate/resolve an insertion position before writing. Mutating family.
pub const CHECK_INSERT_POSITION: &str = "check_insert_position";
/// Insert formatted content at a position. Mutating.
pub const INSERT_FORMATTED_TEXT: &str = "insert_formatted_text";
/// Change style attributes of existing content. Mutating.
pub const MODIFY_TEXT_STYLE: &str = "modify_text_style";

/// Tools that change the host document. Everything else is read-only.
pub const MUTATING_TOOLS: [&str; 3] =
    [CHECK_INSERT_POSITION, INSERT_FORMATTED_TEXT, MODIFY_TEXT_STYLE];

pub fn is_mutating_tool(name: &str) -> bool {
    MUTATING_TOOLS.contains(&name)
}

/// The full tool set a freshly configured panel starts with.
pub fn default_base_tools() -> Vec<String> {
    [
        WORD_COUNT,
        LIST_HEADINGS,
        GET_HEADING_CONTENT,
        GET_SELECTION_TEXT,
        GET_IMAGES,
        GET_TABLES,
        GET_FORMULAS,
        CHECK_INSERT_POSITION,
        INSERT_FORMATTED_TEXT,
        MODIFY_TEXT_STYLE,
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Map a host action kind to the stable tool name used for ledger keys and
/// card lookups. Action kinds are an open set driven by the host; unknown
/// kinds pass through unchanged.
pub fn action_tool_name(action_type: &str) -> &str {
    match action_type {
        "insert_content" | "insert_formatted_text" => INSERT_FORMATTED_TEXT,
        "modify_style" | "modify_text_style" => MODIFY_TEXT_STYLE,
        "check_position" | "check_insert_position" => CHECK_INSERT_POSITION,
        other => other,
    }
}
