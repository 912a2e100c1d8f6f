// Instruction prompts for the extraction passes.
// `{schema}` is replaced with the registry's description of the pass's record kind.

use crate::schema::{SchemaKind, NAME_NOT_SPECIFIED, SUMMARY_MAX_CHARS};

/// Single-pass prompt: name, summary and feature vector in one record.
pub const COMBINED_SYSTEM_TEMPLATE: &str = "\
You are an HR assistant helping to screen job candidates. \
Analyse the resume or cover letter in the user message and produce a report \
as a JSON object that follows this schema:
{schema}

Rules:
- If the candidate's name is not given, set full_name to \"{sentinel}\".
- raw_summary must be 2-3 sentences, at most {max_chars} characters, \
written in the same language as the resume.
- Output the JSON object only. No markdown, no comments, no extra text.";

/// Vector pass of the two-pass mode (and the whole of the vector-only mode).
pub const VECTOR_SYSTEM_TEMPLATE: &str = "\
You are an HR assistant helping to screen job candidates. \
Read the resume in the user message and fill in the candidate's feature vector \
as a JSON object that follows this schema:
{schema}

Rules:
- Use 0 for numeric facts the resume does not mention.
- Output the JSON object only. No markdown, no comments, no extra text.";

/// Name/summary pass of the two-pass mode.
pub const PROFILE_SYSTEM_TEMPLATE: &str = "\
You are an HR assistant helping to screen job candidates. \
Read the resume in the user message and extract the candidate's name and a short \
summary as a JSON object that follows this schema:
{schema}

Rules:
- If the candidate's name is not given, set full_name to \"{sentinel}\".
- raw_summary must be 2-3 sentences, at most {max_chars} characters, \
written in the same language as the resume.
- Output the JSON object only. No markdown, no comments, no extra text.";

/// Renders a system prompt for `kind`, embedding the registry's schema description.
pub fn render_system(template: &str, kind: SchemaKind) -> String {
    template
        .replace("{schema}", &kind.describe())
        .replace("{sentinel}", NAME_NOT_SPECIFIED)
        .replace("{max_chars}", &SUMMARY_MAX_CHARS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_embeds_schema_and_rules() {
        let prompt = render_system(COMBINED_SYSTEM_TEMPLATE, SchemaKind::Combined);
        assert!(prompt.contains("\"skills_verified_count\""));
        assert!(prompt.contains(NAME_NOT_SPECIFIED));
        assert!(prompt.contains("at most 150 characters"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_vector_prompt_has_no_summary_fields() {
        let prompt = render_system(VECTOR_SYSTEM_TEMPLATE, SchemaKind::Vector);
        assert!(prompt.contains("\"shift_preference\""));
        assert!(!prompt.contains("\"raw_summary\""));
    }
}
