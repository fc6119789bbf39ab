//! Per-message intent classification and tool whitelist gating.
//!
//! Both entry points are pure functions of `(base tools, message text)`.
//! Classification never fails: unmatched input falls through to
//! [`Intent::Analysis`], the conservative default, so mutation capability
//! is never granted by accident.

use crate::tools::{
    is_mutating_tool, GET_HEADING_CONTENT, LIST_HEADINGS, MUTATING_TOOLS, WORD_COUNT,
};
use aho_corasick::AhoCorasick;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Edit,
    Analysis,
}

/// Explicit control phrases typed by the user. These bypass every other
/// rule. English and Chinese are the two supported input languages.
const EDIT_OVERRIDES: &[&str] = &["force edit", "edit mode", "强制编辑", "必须编辑"];
const ANALYSIS_OVERRIDES: &[&str] = &[
    "analysis only",
    "read only",
    "no edits",
    "仅分析",
    "只分析",
    "只读",
];

/// Verbs implying document mutation.
const EDIT_PATTERNS: &[&str] = &[
    "insert",
    "append",
    "write",
    "update",
    "format",
    "style",
    "bold",
    "italic",
    "replace",
    "rewrite",
    "delete",
    "remove",
    "插入",
    "添加",
    "写入",
    "写一",
    "修改",
    "更新",
    "排版",
    "格式",
    "样式",
    "加粗",
    "斜体",
    "替换",
    "删除",
];

/// Requests for structure, stats, or overview material.
const ANALYSIS_PATTERNS: &[&str] = &[
    "heading",
    "outline",
    "structure",
    "statistic",
    "stats",
    "overview",
    "word count",
    "how many words",
    "summary",
    "summarize",
    "标题",
    "大纲",
    "结构",
    "统计",
    "字数",
    "概览",
    "总结",
    "摘要",
];

const HEADING_KEYWORDS: &[&str] = &["heading", "outline", "标题", "大纲"];

/// Phrases pointing at one particular heading rather than the outline as a
/// whole. An explicit `@` mention marker counts as well (checked
/// separately, see [`references_specific_heading`]).
const SPECIFIC_HEADING_REFS: &[&str] = &[
    "this heading",
    "that heading",
    "under the heading",
    "这个标题",
    "该标题",
    "那个标题",
    "这一节",
];

fn matcher(cell: &'static OnceLock<AhoCorasick>, patterns: &[&str]) -> &'static AhoCorasick {
    cell.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(patterns)
            .expect("static pattern set")
    })
}

fn edit_override_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, EDIT_OVERRIDES)
}

fn analysis_override_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, ANALYSIS_OVERRIDES)
}

fn edit_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, EDIT_PATTERNS)
}

fn analysis_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, ANALYSIS_PATTERNS)
}

fn heading_keyword_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, HEADING_KEYWORDS)
}

fn specific_heading_matcher() -> &'static AhoCorasick {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, SPECIFIC_HEADING_REFS)
}

/// First match wins: overrides, then edit verbs, then analysis requests,
/// then the conservative default.
pub fn classify(text: &str) -> Intent {
    if edit_override_matcher().is_match(text) {
        return Intent::Edit;
    }
    if analysis_override_matcher().is_match(text) {
        return Intent::Analysis;
    }
    if edit_matcher().is_match(text) {
        return Intent::Edit;
    }
    if analysis_matcher().is_match(text) {
        return Intent::Analysis;
    }
    Intent::Analysis
}

pub fn mentions_heading_keywords(text: &str) -> bool {
    heading_keyword_matcher().is_match(text)
}

pub fn references_specific_heading(text: &str) -> bool {
    text.contains('@') || specific_heading_matcher().is_match(text)
}

/// Derive the per-message tool whitelist from the static base set and the
/// classified intent. Always recomputed from scratch, never a pass-through
/// of accumulated state.
pub fn compute_whitelist(base_tools: &[String], text: &str) -> (Vec<String>, Intent) {
    let intent = classify(text);
    let has = |name: &str| base_tools.iter().any(|tool| tool == name);
    let mut allow: Vec<String> = Vec::new();

    match intent {
        Intent::Analysis => {
            if has(WORD_COUNT) {
                allow.push(WORD_COUNT.to_string());
            }
            if mentions_heading_keywords(text) && has(LIST_HEADINGS) {
                allow.push(LIST_HEADINGS.to_string());
            }
            if references_specific_heading(text) && has(GET_HEADING_CONTENT) {
                allow.push(GET_HEADING_CONTENT.to_string());
            }
            // Remaining read-only tools go in unconditionally. Mutating
            // tools never enter this branch, whatever the base contains.
            for tool in base_tools {
                if is_mutating_tool(tool) {
                    continue;
                }
                if tool == WORD_COUNT || tool == LIST_HEADINGS || tool == GET_HEADING_CONTENT {
                    continue;
                }
                if !allow.iter().any(|allowed| allowed == tool) {
                    allow.push(tool.clone());
                }
            }
        }
        Intent::Edit => {
            // Base minus every mutating tool, then the named mutation tools
            // added back if present.
            allow.extend(
                base_tools
                    .iter()
                    .filter(|tool| !is_mutating_tool(tool))
                    .cloned(),
            );
            for tool in base_tools {
                if MUTATING_TOOLS.contains(&tool.as_str())
                    && !allow.iter().any(|allowed| allowed == tool)
                {
                    allow.push(tool.clone());
                }
            }
        }
    }

    (allow, intent)
}
