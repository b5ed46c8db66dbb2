use crate::llm_client::prompts::{HTML_ONLY_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::models::request::RefactorOptions;

pub const REVIEWER_SYSTEM: &str = "\
You are an expert resume reviewer and career coach. Apply these rules strictly:
- Every bullet opens with a strong action verb (Led, Built, Optimized, Automated).
- Bullets follow Action + Skill/Tool + Result, quantified wherever possible.
- Language is concise, ATS-friendly and relevant to the target role.
- No first-person pronouns, no filler, no vague claims.

Do not stop at criticism. For every weak bullet: name the weakness (passive verb,
missing impact), rewrite it, and list the concrete details that would make it
stronger (team size, revenue, latency, users).";

pub const AUDIT_SCHEMA: &str = r#"{
  "overall_score": number,
  "ats_report": {
    "parsing_health_score": number,
    "layout_warnings": [string],
    "extracted_summary": string,
    "ats_opinion": string,
    "view_as_bot_preview": string
  },
  "criteria": {
    "formatting": {"score": number, "feedback": string},
    "content": {"score": number, "feedback": string},
    "impact": {"score": number, "feedback": string},
    "relevance": {"score": number, "feedback": string}
  },
  "summary": string,
  "suggestions": [{"id": string, "type": string, "location": string, "original_text": string, "finding": string, "thinking": string, "fix": string, "severity": string}],
  "jd_alignment": {
    "matched_keywords": [string],
    "missing_keywords": [string],
    "relevant_skills_to_highlight": [string],
    "keyword_weights": [{"keyword": string, "count": number, "importance": string}]
  }
}"#;

pub const CHAT_SYSTEM: &str = "\
You are the user's personal resume assistant. Discuss only career topics: resumes,
cover letters, interviews, job search, networking and professional branding. Politely
steer anything else back to the user's job search.

Keep replies short and conversational, ask a follow-up question when it narrows the
advice, use \"- \" bullets, and bold only key phrases with **double asterisks**.";

pub const CHAT_GREETING: &str =
    "Hi! I'm your resume assistant. How can I help you land your next role today?";

const INFERRED_JD: &str = "Inferred from the resume";

pub fn build_audit_prompt(resume_text: &str, jd_text: Option<&str>) -> String {
    format!(
        "{REVIEWER_SYSTEM}\n\nRESUME TEXT CONTENT:\n{resume_text}\n\n\
         AUDIT COMMAND: Perform the analysis. JOB DESCRIPTION: {jd}\n\n\
         `view_as_bot_preview` must be the exact raw text extracted from the resume.\n\
         {JSON_ONLY_INSTRUCTION}\n{AUDIT_SCHEMA}",
        jd = jd_text.unwrap_or(INFERRED_JD),
    )
}

pub fn build_refactor_prompt(
    resume_text: &str,
    jd_text: Option<&str>,
    options: &RefactorOptions,
) -> String {
    format!(
        "{REVIEWER_SYSTEM}\n\nRESUME CONTENT:\n{resume_text}\n\n\
         STRATEGIC REFACTOR: Target level {level}. JD alignment intensity {alignment}%. \
         JOB DESCRIPTION: {jd}.\n{HTML_ONLY_INSTRUCTION}",
        level = options.level.as_str(),
        alignment = options.jd_alignment,
        jd = jd_text.unwrap_or(INFERRED_JD),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::CareerLevel;

    #[test]
    fn test_audit_prompt_embeds_resume_and_schema() {
        let prompt = build_audit_prompt("Jane Doe, Rust engineer", None);
        assert!(prompt.contains("Jane Doe, Rust engineer"));
        assert!(prompt.contains(INFERRED_JD));
        assert!(prompt.contains("\"overall_score\""));
    }

    #[test]
    fn test_refactor_prompt_carries_options() {
        let options = RefactorOptions {
            level: CareerLevel::Senior,
            jd_alignment: 75.0,
        };
        let prompt = build_refactor_prompt("resume", Some("Platform team"), &options);
        assert!(prompt.contains("Target level senior"));
        assert!(prompt.contains("intensity 75%"));
        assert!(prompt.contains("Platform team"));
    }
}
