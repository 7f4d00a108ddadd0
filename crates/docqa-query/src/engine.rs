use std::sync::Arc;
use std::time::Instant;

use docqa_core::error::Result;
use docqa_core::types::{Answer, ResponseMode};

use crate::retriever::Retriever;
use crate::synth::{AnswerSynthesizer, Synthesis, NO_CONTENT_ANSWER};

/// The ask() facade: retrieve, synthesize, time the round trip.
///
/// No retry logic of its own; retries belong to the provider adapters.
pub struct QueryEngine {
    retriever: Retriever,
    synthesizer: Arc<dyn AnswerSynthesizer>,
}

impl QueryEngine {
    pub fn new(retriever: Retriever, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        Self { retriever, synthesizer }
    }

    pub async fn ask(&self, question: &str, top_k: usize, mode: ResponseMode) -> Result<Answer> {
        let started = Instant::now();
        let context = self.retriever.retrieve(question, top_k).await?;
        let Synthesis { text, citations } = if context.is_empty() && mode != ResponseMode::NoText {
            // Deliberate no-content outcome, distinguishable from a
            // swallowed failure.
            Synthesis { text: NO_CONTENT_ANSWER.to_string(), citations: vec![] }
        } else {
            self.synthesizer.synthesize(question, &context, mode).await?
        };
        tracing::debug!(
            question,
            citations = citations.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );
        Ok(Answer { text, citations, latency: started.elapsed() })
    }
}
