//! Prompt templates and structured-output schemas.
//!
//! Prompts are deterministic: the same input always yields the same text.

use reviewgate_core::{Candidate, TOP_K};
use serde::Serialize;
use serde_json::{Value, json};

use crate::Prompt;

// ── Prompt templates ──

const REVIEW_INSTRUCTIONS: &str = "\
You are a content-safety and sentiment classifier for customer reviews of local businesses.

Assess the review below. Unsafe content includes profanity, hate speech, harassment, threats, \
sexual content, spam, and personal data about third parties.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"safety_score\": number from 0 (completely safe) to 1 (clearly unsafe),
  \"sentiment_score\": number from -1 (very negative) to 1 (very positive),
  \"recommended_action\": \"allow\" | \"flag\" | \"block\"
}

Use \"allow\" for safe reviews, \"flag\" when a human should look at it, and \"block\" for \
content that must never be shown.";

const SELECTION_INSTRUCTIONS: &str = "\
You curate the featured reviews shown at the top of a local business's page.

From the approved reviews below, choose at most {k} that are the most helpful to a prospective \
customer: specific, authentic, and informative. Prefer reviews describing concrete experiences \
over generic praise. Only use ids that appear in the list.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"top_review_ids\": [ids in order of preference, at most {k}],
  \"reasoning\": \"one or two sentences explaining the choice\"
}";

/// Prompt for classifying a single review.
pub fn review_prompt(content: &str) -> Prompt {
    Prompt {
        text: format!("{REVIEW_INSTRUCTIONS}\n\nReview:\n\"\"\"\n{content}\n\"\"\""),
        response_schema: Some(review_schema()),
    }
}

#[derive(Serialize)]
struct CandidateLine<'a> {
    id: i64,
    reviewer_name: &'a str,
    sentiment_score: f64,
    content: &'a str,
}

/// Prompt for choosing the top-K reviews among `candidates`.
pub fn selection_prompt(candidates: &[Candidate]) -> Prompt {
    let lines: Vec<CandidateLine<'_>> = candidates
        .iter()
        .map(|c| CandidateLine {
            id: c.id,
            reviewer_name: &c.reviewer_name,
            sentiment_score: c.sentiment_score,
            content: &c.content,
        })
        .collect();
    // Serialising plain strings and numbers cannot fail.
    let listing = serde_json::to_string_pretty(&lines).unwrap_or_else(|_| "[]".to_string());
    let instructions = SELECTION_INSTRUCTIONS.replace("{k}", &TOP_K.to_string());
    Prompt {
        text: format!("{instructions}\n\nReviews:\n{listing}"),
        response_schema: Some(selection_schema()),
    }
}

// ── Response schemas ──

fn review_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "safety_score": { "type": "NUMBER" },
            "sentiment_score": { "type": "NUMBER" },
            "recommended_action": { "type": "STRING", "enum": ["allow", "flag", "block"] }
        },
        "required": ["safety_score", "sentiment_score", "recommended_action"]
    })
}

fn selection_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "top_review_ids": { "type": "ARRAY", "items": { "type": "INTEGER" } },
            "reasoning": { "type": "STRING" }
        },
        "required": ["top_review_ids", "reasoning"]
    })
}
