//! Prompts for LLM-based page summarisation.
//!
//! Callers can override the default via [`crate::config::ReaderConfig::summary_prompt`];
//! the constants here are used only when no override is provided.
//!
//! Models still echo parts of these instructions back ("Summarize the following
//! text…", "Requirements: …"). [`crate::pipeline::normalize`] strips those echoes,
//! so wording changes here should be mirrored in its patterns.

/// Default system prompt for summarising one page of extracted PDF text.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"Summarize the following text in a concise, factual way.

Requirements:
- Avoid unnecessary details, adjectives, or filler.
- Focus only on the key points and main ideas.
- Do not mention the fact that you are summarizing the text.
- Focus on the raw data provided by the text you are summarizing.
- Do not include support links or notices unrelated to the content of the text.
- Write plain sentences suitable for reading aloud: no Markdown, no bullet points."#;

/// Build the user message carrying the page text and length bounds.
pub fn summary_request(text: &str, min_words: usize) -> String {
    format!(
        "Write at least {} words.\n\nText to summarize:\n\n\"\"\"{}\"\"\"",
        min_words, text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;

    #[test]
    fn request_embeds_text_and_bound() {
        let msg = summary_request("Cats purr.", 120);
        assert!(msg.contains("120 words"));
        assert!(msg.contains("\"\"\"Cats purr.\"\"\""));
    }

    #[test]
    fn echoed_prompt_is_stripped() {
        let echoed = format!("Cats purr loudly. {}", SUMMARY_SYSTEM_PROMPT);
        assert_eq!(normalize(&echoed), "Cats purr loudly.");
    }
}
