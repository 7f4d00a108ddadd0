//! Answer synthesis over retrieved context.

use async_trait::async_trait;

use docqa_core::error::Result;
use docqa_core::types::{ResponseMode, RetrievedChunk};

/// The deliberate answer for questions the index has nothing for. Returned
/// explicitly so an empty result is never mistakable for a swallowed error.
pub const NO_CONTENT_ANSWER: &str =
    "No relevant content was found in the indexed documents for this question.";

/// Output of one synthesis call. `citations` is always a subsequence of the
/// context passed in; sources are never invented.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub text: String,
    pub citations: Vec<RetrievedChunk>,
}

#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        context: &[RetrievedChunk],
        mode: ResponseMode,
    ) -> Result<Synthesis>;
}

/// Map 1-based `[Source N]` markers in the answer text back onto the
/// context, preserving context order and dropping duplicates and
/// out-of-range references, so the result is a subsequence of `context`.
pub fn cited_subset(answer: &str, context: &[RetrievedChunk]) -> Vec<RetrievedChunk> {
    let marker = "[Source ";
    let mut referenced = vec![false; context.len()];
    let mut rest = answer;
    while let Some(pos) = rest.find(marker) {
        rest = &rest[pos + marker.len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<usize>() {
            if (1..=context.len()).contains(&n) {
                referenced[n - 1] = true;
            }
        }
    }
    context
        .iter()
        .zip(referenced)
        .filter_map(|(c, used)| used.then(|| c.clone()))
        .collect()
}
