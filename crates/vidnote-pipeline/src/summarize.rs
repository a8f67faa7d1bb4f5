//! Summarization stage.
//!
//! The summarizer never fails: every backend fault maps to a fixed
//! user-facing explanation string, so the caller always gets *some* text to
//! persist. Output normalization keeps summaries visually uniform across
//! model quirks.

use tracing::{info, warn};

use vidnote_engines::{EngineError, TextGenerator};

/// Transcripts are truncated before prompting; small local models have
/// short context windows.
const MAX_TRANSCRIPT_CHARS: usize = 2000;

/// Cap applied to the error detail embedded in the generic fallback string.
const MAX_FALLBACK_DETAIL_CHARS: usize = 100;

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that creates concise summaries of text transcripts.
Your summary should:
- Be approximately 300 words or less
- Capture the main points and key insights
- Use simple plain text (no markdown formatting, no bold, no asterisks, no bullet points)
- Use normal sentences and paragraphs
- Be engaging and informative
- Focus on the actual content provided in the text
- Start directly with the summary, do not include any introductory phrases";

/// Preamble phrases models like to prepend despite instructions.
const PREAMBLE_PHRASES: &[&str] = &[
    "Here's a concise summary of the transcript:",
    "Here is a concise summary of the transcript:",
    "Summary:",
    "Here's the summary:",
];

/// Summarize a transcript. Always returns a human-readable string; backend
/// faults turn into fixed fallback explanations rather than propagating.
pub async fn summarize(generator: &dyn TextGenerator, transcript: &str, title: &str) -> String {
    match try_summarize(generator, transcript, title).await {
        Ok(summary) => {
            info!(chars = summary.len(), "summary generated");
            summary
        }
        Err(e) => {
            warn!(error = %e, "summarization fell back");
            fallback_for(&e)
        }
    }
}

async fn try_summarize(
    generator: &dyn TextGenerator,
    transcript: &str,
    title: &str,
) -> Result<String, EngineError> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(EngineError::InvalidInput("empty transcript".to_string()));
    }

    let truncated = truncate_chars(transcript, MAX_TRANSCRIPT_CHARS);
    let user_prompt = format!(
        "Title: {}\n\nTranscript:\n{}\n\nSummarize the transcript above in plain text.",
        title, truncated
    );

    let raw = generator.generate(SYSTEM_PROMPT, &user_prompt).await?;
    let summary = clean_summary(&raw);

    if summary.is_empty() {
        return Err(EngineError::EmptyResponse);
    }
    if looks_like_refusal(&summary) {
        return Err(EngineError::RequestFailed(
            "model refused to summarize the transcript".to_string(),
        ));
    }

    Ok(summary)
}

/// Fixed fallback string for a backend fault.
fn fallback_for(error: &EngineError) -> String {
    match error {
        EngineError::NotFound(_) => {
            "Summary failed: generation endpoint not found. Ensure the model server is \
             running with the correct configuration."
                .to_string()
        }
        EngineError::Connection(_) => {
            "Summary failed: cannot connect to the model server. Ensure it is running."
                .to_string()
        }
        EngineError::Timeout(_) => {
            "Summary failed: request timeout. The model may be busy. Please try again."
                .to_string()
        }
        other => format!(
            "Summary generation failed: {}",
            truncate_chars(&other.to_string(), MAX_FALLBACK_DETAIL_CHARS)
        ),
    }
}

/// Normalize raw model output into uniform plain text:
/// strip known preamble phrases, markdown emphasis markers and leading list
/// bullets, and collapse newline runs into paragraph breaks.
pub fn clean_summary(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    for phrase in PREAMBLE_PHRASES {
        text = text.replace(phrase, "");
    }

    text = text.replace("**", "").replace('*', "");

    let unbulleted: Vec<String> = text.lines().map(strip_bullet).collect();
    text = unbulleted.join("\n");

    collapse_newlines(&text).trim().to_string()
}

/// Strip one leading `-` or `•` bullet (and surrounding whitespace) from a
/// line.
fn strip_bullet(line: &str) -> String {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('•')) {
        rest.trim_start().to_string()
    } else {
        line.to_string()
    }
}

/// Replace every run of newlines with a single paragraph break.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            while chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push_str("\n\n");
        } else {
            out.push(c);
        }
    }
    out
}

/// Detect the stock "I can't summarize something that doesn't exist" style
/// refusal.
fn looks_like_refusal(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    lower.contains("can't") && lower.contains("doesn't exist")
}

/// Truncate to at most `max` characters, appending an ellipsis when cut.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_preamble() {
        let raw = "Here's a concise summary of the transcript: The talk covers Rust.";
        assert_eq!(clean_summary(raw), "The talk covers Rust.");
    }

    #[test]
    fn test_clean_strips_markdown_and_bullets() {
        let raw = "**Key points**\n- first point\n- second point\n• third point";
        assert_eq!(
            clean_summary(raw),
            "Key points\n\nfirst point\n\nsecond point\n\nthird point"
        );
    }

    #[test]
    fn test_clean_collapses_blank_lines() {
        let raw = "para one\n\n\n\npara two";
        assert_eq!(clean_summary(raw), "para one\n\npara two");
    }

    #[test]
    fn test_clean_plain_text_untouched() {
        assert_eq!(clean_summary("Just a sentence."), "Just a sentence.");
    }

    #[test]
    fn test_refusal_detection() {
        assert!(looks_like_refusal(
            "I can't summarize a transcript that doesn't exist."
        ));
        assert!(!looks_like_refusal("A normal summary about existence."));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }

    #[test]
    fn test_fallback_taxonomy() {
        let not_found = fallback_for(&EngineError::NotFound("404".into()));
        assert!(not_found.contains("endpoint not found"));

        let connection = fallback_for(&EngineError::Connection("refused".into()));
        assert!(connection.contains("cannot connect"));

        let timeout = fallback_for(&EngineError::Timeout(60));
        assert!(timeout.contains("timeout"));

        let other = fallback_for(&EngineError::EmptyResponse);
        assert!(other.starts_with("Summary generation failed:"));
    }

    struct FailingGenerator(fn() -> EngineError);

    #[async_trait::async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, EngineError> {
            Err((self.0)())
        }
    }

    #[tokio::test]
    async fn test_summarize_never_fails() {
        let generator = FailingGenerator(|| EngineError::Connection("refused".into()));
        let summary = summarize(&generator, "some transcript", "T").await;
        assert!(summary.contains("cannot connect"));
    }

    #[tokio::test]
    async fn test_empty_transcript_falls_back() {
        let generator = FailingGenerator(|| unreachable!());
        let summary = summarize(&generator, "   ", "T").await;
        assert!(summary.starts_with("Summary generation failed:"));
    }
}
