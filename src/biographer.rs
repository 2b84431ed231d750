//! Prompt construction for the two AI features: the short "detective"
//! suggestion and the long-form biography chapter.
//!
//! Neither function can fail. Every failure path resolves to a fixed string
//! that is shown to the user as-is.

use std::sync::Arc;

use crate::inference::{Completion, CompletionRequest};
use crate::models::Entry;

/// How many of the most recent entries the suggestion prompt sees.
pub const SUGGESTION_WINDOW: usize = 10;
pub const NARRATIVE_MIN_ENTRIES: usize = 3;

pub const SUGGESTION_OFFLINE: &str = "What is a fond memory from your childhood home?";
pub const SUGGESTION_EMPTY: &str = "Tell me about your favorite childhood toy.";
pub const SUGGESTION_FAILED: &str = "What is a memory you haven't thought of in years?";

pub const NARRATIVE_NO_ENTRIES: &str =
    "Please add some journal entries first so the AI has material to work with.";
pub const NARRATIVE_TOO_FEW: &str = "Please write more entries to generate a biography.";
pub const NARRATIVE_EMPTY: &str = "Could not generate story.";
pub const NARRATIVE_FAILED: &str =
    "An error occurred while writing your story. Please try again later.";

#[derive(Clone, Default)]
pub struct Biographer {
    completion: Option<Arc<dyn Completion>>,
}

impl Biographer {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self {
            completion: Some(completion),
        }
    }

    /// No inference credential: every request resolves to its fallback.
    pub fn offline() -> Self {
        Self { completion: None }
    }

    pub async fn suggest(&self, entries: &[Entry]) -> String {
        let Some(completion) = &self.completion else {
            return SUGGESTION_OFFLINE.to_string();
        };
        if entries.is_empty() {
            return SUGGESTION_OFFLINE.to_string();
        }

        let request = CompletionRequest::new(suggestion_prompt(entries));
        match completion.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => SUGGESTION_EMPTY.to_string(),
            Err(e) => {
                tracing::warn!("Suggestion request failed: {e}");
                SUGGESTION_FAILED.to_string()
            }
        }
    }

    pub async fn narrate(&self, entries: &[Entry]) -> String {
        if entries.is_empty() {
            return NARRATIVE_NO_ENTRIES.to_string();
        }
        let Some(completion) = &self.completion else {
            return NARRATIVE_TOO_FEW.to_string();
        };
        if entries.len() < NARRATIVE_MIN_ENTRIES {
            return NARRATIVE_TOO_FEW.to_string();
        }

        let request = CompletionRequest::new(narrative_prompt(entries)).with_thinking_budget(0);
        match completion.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => NARRATIVE_EMPTY.to_string(),
            Err(e) => {
                tracing::warn!("Narrative request failed: {e}");
                NARRATIVE_FAILED.to_string()
            }
        }
    }
}

pub fn suggestion_prompt(entries: &[Entry]) -> String {
    let recent = entries
        .iter()
        .take(SUGGESTION_WINDOW)
        .map(|e| format!("[{}] ({}): {}", e.date, e.category, e.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a warm, curious, and encouraging biographer's assistant.
Here are recent journal entries from a user to understand what they have already written about:
{recent}

Your task is to spark a specific, vivid memory that they haven't written about yet.

Guidelines:
1. Identify a gap in their timeline (e.g., a missing decade like the 80s or 90s, early career, childhood summers).
2. Ask ONE specific question about a sensory detail, a specific historical event they might have witnessed, or a small but meaningful moment.
3. Be encouraging and nostalgic.
4. Keep it under 25 words.

Examples of good questions:
- "What was the first song you remember slow dancing to?"
- "Describe the smell of the kitchen in your first apartment."
- "Where were you when you watched the turn of the millennium?"
"#
    )
}

pub fn narrative_prompt(entries: &[Entry]) -> String {
    let notes = entries
        .iter()
        .map(|e| format!("[{}] {}", e.date, e.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a master storyteller and biographer.
Take the following raw journal notes and weave them into a cohesive, beautifully written narrative chapter.
Use a nostalgic, respectful, and engaging tone.
Do not invent facts, but you may add transitional prose to make it flow like a memoir.

Raw Notes:
{notes}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{CompletionFuture, InferenceError};
    use crate::models::Category;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<&'static str, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Canned {
        fn new(reply: Result<&'static str, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Completion for Canned {
        fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
            self.seen.lock().unwrap().push(request);
            let reply = self
                .reply
                .map(str::to_string)
                .map_err(|_| InferenceError::Malformed("boom".to_string()));
            Box::pin(async move { reply })
        }
    }

    fn entries(n: usize) -> Vec<Entry> {
        (0..n)
            .map(|i| Entry {
                id: format!("e{i}"),
                user_id: "u".to_string(),
                text: format!("memory number {i}"),
                date: format!("20{:02}-01-01", 20 - i),
                category: Category::General,
                image_url: None,
                ai_prompted: false,
                created_at: String::new(),
                comments: Vec::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn offline_fallbacks() {
        let biographer = Biographer::offline();
        assert_eq!(biographer.suggest(&entries(4)).await, SUGGESTION_OFFLINE);
        assert_eq!(biographer.narrate(&[]).await, NARRATIVE_NO_ENTRIES);
        assert_eq!(biographer.narrate(&entries(4)).await, NARRATIVE_TOO_FEW);
    }

    #[tokio::test]
    async fn suggestion_uses_most_recent_window() {
        let canned = Canned::new(Ok("  What did your first car smell like?  "));
        let biographer = Biographer::new(canned.clone());

        let text = biographer.suggest(&entries(12)).await;
        assert_eq!(text, "What did your first car smell like?");

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("[2020-01-01] (General): memory number 0"));
        assert!(seen[0].prompt.contains("memory number 9"));
        assert!(!seen[0].prompt.contains("memory number 10"));
        assert_eq!(seen[0].thinking_budget, None);
    }

    #[tokio::test]
    async fn suggestion_degrades_on_empty_or_error() {
        let empty = Biographer::new(Canned::new(Ok("   ")));
        assert_eq!(empty.suggest(&entries(1)).await, SUGGESTION_EMPTY);

        let failing = Biographer::new(Canned::new(Err(())));
        assert_eq!(failing.suggest(&entries(1)).await, SUGGESTION_FAILED);
    }

    #[tokio::test]
    async fn narrative_needs_three_entries_and_disables_thinking() {
        let canned = Canned::new(Ok("Chapter One"));
        let biographer = Biographer::new(canned.clone());

        assert_eq!(biographer.narrate(&entries(2)).await, NARRATIVE_TOO_FEW);
        assert!(canned.seen.lock().unwrap().is_empty());

        assert_eq!(biographer.narrate(&entries(3)).await, "Chapter One");
        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen[0].thinking_budget, Some(0));
        assert!(seen[0].prompt.contains("[2018-01-01] memory number 2"));
    }

    #[tokio::test]
    async fn narrative_degrades_on_error() {
        let failing = Biographer::new(Canned::new(Err(())));
        assert_eq!(failing.narrate(&entries(5)).await, NARRATIVE_FAILED);

        let empty = Biographer::new(Canned::new(Ok("")));
        assert_eq!(empty.narrate(&entries(5)).await, NARRATIVE_EMPTY);
    }
}
