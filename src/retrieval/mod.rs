//! Retrieval augmentation: rewrite the instruction message with relevant
//! reference material before generation.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::error::{Result, RivuletError};
use crate::types::ChatMessage;

const RETRIEVAL_DIRECTIVE: &str = "Prefer the reference material above when answering. \
If you rely on knowledge from outside it, say so.";

/// A reference document with a precomputed embedding. The corpus is loaded
/// once at startup and read-only for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Turns text into an embedding vector. The concrete algorithm is an
/// external collaborator.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Scores a query against a document. Only a total order plus a threshold
/// comparison is required of implementations.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &str, document: &ReferenceDocument) -> Result<f32>;
}

/// Reference scorer: cosine similarity between the embedded query and the
/// document's precomputed vector.
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

impl RelevanceScorer for EmbeddingScorer {
    fn score(&self, query: &str, document: &ReferenceDocument) -> Result<f32> {
        let query_embedding = self.embedder.embed(query)?;
        if query_embedding.len() != document.embedding.len() {
            return Err(RivuletError::InvalidArgument(format!(
                "embedding dimension mismatch: {} vs {}",
                query_embedding.len(),
                document.embedding.len()
            )));
        }
        Ok(cosine_similarity(&query_embedding, &document.embedding))
    }
}

/// Cosine similarity between two vectors; zero when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut sum_ij = 0.0f32;
    let mut sum_i = 0.0f32;
    let mut sum_j = 0.0f32;
    for (i, j) in a.iter().zip(b.iter()) {
        sum_ij += i * j;
        sum_i += i * i;
        sum_j += j * j;
    }
    let denom = (sum_i * sum_j).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    sum_ij / denom
}

/// Rewrites the instruction message with the most relevant corpus documents.
pub struct Augmenter {
    corpus: Vec<ReferenceDocument>,
    scorer: Arc<dyn RelevanceScorer>,
    threshold: f32,
    max_documents: usize,
}

impl Augmenter {
    pub fn new(
        corpus: Vec<ReferenceDocument>,
        scorer: Arc<dyn RelevanceScorer>,
        threshold: f32,
        max_documents: usize,
    ) -> Self {
        Self {
            corpus,
            scorer,
            threshold,
            max_documents,
        }
    }

    pub fn with_config(
        corpus: Vec<ReferenceDocument>,
        scorer: Arc<dyn RelevanceScorer>,
        config: &RetrievalConfig,
    ) -> Self {
        Self::new(corpus, scorer, config.threshold, config.max_documents)
    }

    /// Produce an enriched instruction message with citations.
    ///
    /// Documents scoring at or above the threshold are kept, sorted
    /// descending by score (ties broken by corpus order, first-registered
    /// wins), capped at the configured maximum. An empty keep-set, or any
    /// scoring failure, yields the original instruction unchanged — this
    /// path never aborts the request.
    pub fn augment(&self, query: &str, instruction: &ChatMessage) -> ChatMessage {
        let mut kept: Vec<(usize, f32)> = Vec::new();
        for (index, document) in self.corpus.iter().enumerate() {
            match self.scorer.score(query, document) {
                Ok(score) if score >= self.threshold => kept.push((index, score)),
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "relevance scoring failed, skipping augmentation");
                    return instruction.clone();
                }
            }
        }

        // Stable sort: equal scores keep corpus order.
        kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        kept.truncate(self.max_documents);

        if kept.is_empty() {
            return instruction.clone();
        }

        let mut content = instruction.text_content().to_string();
        content.push_str("\n\nReference material:\n");
        let mut citations = Vec::with_capacity(kept.len());
        for (index, _) in &kept {
            let document = &self.corpus[*index];
            content.push_str(&format!("\n## {}\n{}\n", document.title, document.content));
            citations.push(document.title.clone());
        }
        content.push('\n');
        content.push_str(RETRIEVAL_DIRECTIVE);

        let mut message = ChatMessage::system(content);
        message.citations = citations;
        message
    }
}
