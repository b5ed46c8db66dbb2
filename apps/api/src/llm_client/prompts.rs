// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Appended to prompts whose reply is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with ONLY valid JSON matching the structure below. \
    Do NOT use markdown code fences. \
    Do NOT include any text outside the JSON object.";

/// Appended to prompts whose reply is rendered as HTML.
pub const HTML_ONLY_INSTRUCTION: &str = "\
    Return ONLY valid single-column HTML. \
    Do NOT include <script> tags, inline event handlers, or external resources.";
