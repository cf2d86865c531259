//! Query pipeline: greeting, cache, retrieval, re-rank, answer, rewrite

use std::sync::Arc;
use std::time::Instant;

use crate::config::{PipelineMode, QueryConfig};
use crate::error::{Error, Result};
use crate::generation::{fallback_ranking, parse_reranked, Persona, PromptBuilder};
use crate::providers::{AnswerCache, EmbeddingProvider, LanguageModel, VectorIndex};
use crate::retrieval::{answer_key, apply_keyword_boost, embed_key, select_candidates};
use crate::types::{QueryRequest, QueryResponse, RankedChunk, SearchHit};

use super::greeting::GreetingDetector;

/// Answer for the plain pipeline when nothing is retrieved
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found.";

/// Temperature used for re-ranking calls
const RERANK_TEMPERATURE: f32 = 0.0;

/// Answers questions against the indexed corpus
///
/// Every collaborator is injected, so the state machine runs unchanged
/// against real services or test fakes.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    cache: AnswerCache,
    llm: LanguageModel,
    prompts: PromptBuilder,
    greetings: GreetingDetector,
    config: QueryConfig,
    /// Temperature for greeting, answer and rewrite calls
    temperature: f32,
}

/// Validated request parameters
struct Plan {
    limit: usize,
    rerank: bool,
}

impl QueryPipeline {
    /// Create a new query pipeline
    pub fn new(
        config: &QueryConfig,
        temperature: f32,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        cache: AnswerCache,
        llm: LanguageModel,
    ) -> Self {
        let persona = Persona {
            assistant_name: config.assistant_name.clone(),
            developer: config.developer.clone(),
        };

        Self {
            embedder,
            index,
            cache,
            llm,
            prompts: PromptBuilder::new(persona),
            greetings: GreetingDetector::new(&config.greeting_keywords, config.greeting_max_words)
                .with_matching(config.greeting_match),
            config: config.clone(),
            temperature,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.config.mode
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn llm(&self) -> &LanguageModel {
        &self.llm
    }

    fn plan(&self, request: &QueryRequest) -> Result<Plan> {
        if request.question.trim().is_empty() {
            return Err(Error::invalid_request("Question required"));
        }

        let limit = request.limit.unwrap_or(self.config.default_limit);
        if limit == 0 || limit > self.config.max_limit {
            return Err(Error::invalid_request(format!(
                "limit must be between 1 and {}",
                self.config.max_limit
            )));
        }

        if !request.min_score.is_finite() {
            return Err(Error::invalid_request("minScore must be a finite number"));
        }

        Ok(Plan {
            limit,
            rerank: request.rerank.unwrap_or(self.config.rerank),
        })
    }

    /// Answer a question
    ///
    /// Embedding and index failures are returned as errors. Cache failures
    /// behave as misses and model failures produce the fixed failure text,
    /// so every successful return carries a non-empty answer.
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let plan = self.plan(request)?;
        let start = Instant::now();
        let question = request.question.as_str();

        if self.config.mode == PipelineMode::Persona && self.greetings.is_greeting(question) {
            tracing::debug!("Greeting intercepted, skipping retrieval");
            let completion = self
                .llm
                .generate(&self.prompts.greeting(question), self.temperature, false)
                .await;
            return Ok(QueryResponse::greeting(completion.text));
        }

        let cache_key = answer_key(question, &request.filters);
        if let Some(answer) = self.cache.get(&cache_key).await.filter(|a| !a.is_empty()) {
            tracing::debug!("Answer cache hit for '{}'", cache_key);
            return Ok(QueryResponse::from_cache(answer));
        }

        let vector = self.question_vector(question).await?;

        let over_fetch = (plan.limit * 3).max(self.config.over_fetch);
        let mut hits = self.index.search(&vector, over_fetch, &request.filters).await?;
        tracing::debug!("Search returned {} hits from {}", hits.len(), self.index.name());

        if request.hybrid {
            apply_keyword_boost(&mut hits, question, self.config.hybrid_boost);
        }

        let candidates = select_candidates(hits, request.min_score, self.config.max_candidates);
        if candidates.is_empty() {
            return Ok(self.no_context(request).await);
        }

        let selected = if plan.rerank {
            self.rerank(question, &candidates, plan.limit).await
        } else {
            fallback_ranking(&candidates, plan.limit)
        };

        let prompt = self
            .prompts
            .answer(question, selected.iter().map(|c| c.chunk.as_str()));
        let mut completion = self.llm.generate(&prompt, self.temperature, false).await;

        let mut rewrite_applied = false;
        if request.rewrite && !completion.degraded {
            let rewritten = self
                .llm
                .generate(&self.prompts.rewrite(&completion.text), self.temperature, false)
                .await;
            if rewritten.degraded {
                tracing::warn!("Rewrite failed, keeping the original answer");
            } else {
                completion = rewritten;
                rewrite_applied = true;
            }
        }

        if completion.degraded {
            tracing::warn!("Answer generation degraded, not caching '{}'", cache_key);
        } else {
            self.cache.put(&cache_key, &completion.text).await;
        }

        tracing::info!(
            "Answered from {} candidates ({} used) in {:?}",
            candidates.len(),
            selected.len(),
            start.elapsed()
        );

        Ok(QueryResponse {
            answer: completion.text,
            cached: Some(false),
            reranked_chunks: plan.rerank.then_some(selected),
            used_filters: Some(request.filters.clone()),
            hybrid: Some(request.hybrid),
            rewrite_applied: Some(rewrite_applied),
            ..Default::default()
        })
    }

    /// Question embedding, from the cache when possible
    async fn question_vector(&self, question: &str) -> Result<Vec<f32>> {
        let key = embed_key(question);
        if let Some(vector) = self.cache.get_vector(&key).await {
            tracing::debug!("Embedding cache hit for '{}'", key);
            return Ok(vector);
        }

        let vector = self.embedder.embed(question.trim()).await?;
        if vector.is_empty() {
            return Err(Error::embedding(format!(
                "{} returned an empty embedding for the question",
                self.embedder.name()
            )));
        }

        self.cache.put_vector(&key, &vector).await;
        Ok(vector)
    }

    /// Answer when no candidate survived; never cached
    async fn no_context(&self, request: &QueryRequest) -> QueryResponse {
        let answer = match self.config.mode {
            PipelineMode::Persona => {
                self.llm
                    .generate(&self.prompts.no_context(&request.question), self.temperature, false)
                    .await
                    .text
            }
            PipelineMode::Plain => NO_CONTEXT_ANSWER.to_string(),
        };

        tracing::info!("No candidates for question, answered without context");
        QueryResponse::no_context(answer, &request.filters, request.hybrid)
    }

    /// Ask the model to order the candidates, falling back to score order
    async fn rerank(&self, question: &str, candidates: &[SearchHit], limit: usize) -> Vec<RankedChunk> {
        let prompt = self.prompts.rerank(question, candidates, limit);
        let completion = self.llm.generate(&prompt, RERANK_TEMPERATURE, true).await;

        if completion.degraded {
            tracing::warn!("Re-rank unavailable, using score order");
            return fallback_ranking(candidates, limit);
        }

        match parse_reranked(&completion.text, candidates, limit) {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!("Re-rank output rejected, using score order: {}", e);
                fallback_ranking(candidates, limit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CacheStore, EmbeddingProvider, GENERATION_FAILED};
    use crate::testing::{CountingCache, CountingIndex, FailingEmbedder, HashEmbedder, ScriptedLlm};
    use crate::types::{Chunk, FilterSet, IndexedPoint, PointPayload};
    use serde_json::Map;
    use std::time::Duration;

    const DOCS: &[(&str, &str)] = &[
        ("a.pdf", "Shipping takes three days within the country."),
        ("a.pdf", "Returns are accepted within thirty days of shipping."),
        ("b.pdf", "Shipping is free on Fridays for members."),
        ("b.pdf", "Gift cards never expire."),
    ];

    struct Harness {
        embedder: Arc<HashEmbedder>,
        index: Arc<CountingIndex>,
        store: Arc<CountingCache>,
        llm: Arc<ScriptedLlm>,
        pipeline: QueryPipeline,
    }

    fn script(rerank_reply: &'static str) -> ScriptedLlm {
        ScriptedLlm::new(move |prompt| {
            let reply = if prompt.starts_with("Given the user question") {
                rerank_reply
            } else if prompt.starts_with("Rewrite the following answer") {
                "Short and friendly."
            } else if prompt.contains("has just greeted you") {
                "Hello! I'm Docs Assistant."
            } else if prompt.contains("No passage in the documents") {
                "Try asking about shipping or returns."
            } else {
                "Grounded answer."
            };
            Ok(reply.to_string())
        })
    }

    async fn seeded_index() -> Arc<CountingIndex> {
        let index = CountingIndex::ready().await;
        let embedder = HashEmbedder::new();
        let points: Vec<IndexedPoint> = DOCS
            .iter()
            .enumerate()
            .map(|(i, (source, text))| {
                let chunk = Chunk::new(*text, i, *source);
                IndexedPoint {
                    id: chunk.point_id(),
                    vector: embedder.vector(text),
                    payload: PointPayload::from_chunk(&chunk, &Map::new()),
                }
            })
            .collect();
        index.upsert(&points).await.unwrap();
        index
    }

    fn build(config: QueryConfig, llm: ScriptedLlm, index: Arc<CountingIndex>, store: Arc<CountingCache>) -> Harness {
        build_with_embedder(config, llm, index, store, Arc::new(HashEmbedder::new()))
    }

    fn build_with_embedder(
        config: QueryConfig,
        llm: ScriptedLlm,
        index: Arc<CountingIndex>,
        store: Arc<CountingCache>,
        embedder: Arc<HashEmbedder>,
    ) -> Harness {
        let llm = Arc::new(llm);
        let cache = AnswerCache::new(store.clone(), Duration::from_secs(3600), Duration::from_secs(1));
        let pipeline = QueryPipeline::new(
            &config,
            0.4,
            embedder.clone(),
            index.clone(),
            cache,
            LanguageModel::new(llm.clone()),
        );
        Harness {
            embedder,
            index,
            store,
            llm,
            pipeline,
        }
    }

    async fn harness() -> Harness {
        build(QueryConfig::default(), script("not json"), seeded_index().await, CountingCache::new())
    }

    #[tokio::test]
    async fn test_validation() {
        let h = harness().await;

        for request in [
            QueryRequest::new("   "),
            QueryRequest::new("shipping").with_limit(0),
            QueryRequest::new("shipping").with_limit(51),
            QueryRequest::new("shipping").with_min_score(f32::NAN),
        ] {
            let result = h.pipeline.answer(&request).await;
            assert!(matches!(result, Err(Error::InvalidRequest(_))), "{:?}", request);
        }
        assert_eq!(h.index.searches(), 0);
    }

    #[tokio::test]
    async fn test_greeting_bypasses_cache_and_index() {
        let h = harness().await;
        let response = h.pipeline.answer(&QueryRequest::new("hello")).await.unwrap();

        assert_eq!(response.greeting, Some(true));
        assert_eq!(response.answer, "Hello! I'm Docs Assistant.");
        assert_eq!(h.store.gets(), 0);
        assert_eq!(h.store.sets(), 0);
        assert_eq!(h.index.searches(), 0);
        assert_eq!(h.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_plain_mode_has_no_greeting_intercept() {
        let config = QueryConfig {
            mode: PipelineMode::Plain,
            ..Default::default()
        };
        let h = build(config, script("not json"), seeded_index().await, CountingCache::new());
        let response = h.pipeline.answer(&QueryRequest::new("hello")).await.unwrap();

        assert_eq!(response.greeting, None);
        assert_eq!(h.index.searches(), 1);
    }

    #[tokio::test]
    async fn test_full_answer_then_cache_hit() {
        let h = harness().await;
        let request = QueryRequest::new("How long does shipping take?");

        let first = h.pipeline.answer(&request).await.unwrap();
        assert_eq!(first.answer, "Grounded answer.");
        assert_eq!(first.cached, Some(false));
        assert_eq!(first.rewrite_applied, Some(false));
        assert_eq!(first.used_filters, Some(FilterSet::new()));
        let llm_calls = h.llm.calls();

        let second = h
            .pipeline
            .answer(&QueryRequest::new("  how long does SHIPPING take?  "))
            .await
            .unwrap();
        assert_eq!(second.answer, "Grounded answer.");
        assert_eq!(second.cached, Some(true));
        assert_eq!(h.llm.calls(), llm_calls);
        assert_eq!(h.index.searches(), 1);
        assert_eq!(
            h.store.peek("answer:how long does shipping take?:{}").await.as_deref(),
            Some("Grounded answer.")
        );
    }

    #[tokio::test]
    async fn test_embedding_cached_across_filters() {
        let h = harness().await;
        let question = "How long does shipping take?";

        h.pipeline.answer(&QueryRequest::new(question)).await.unwrap();
        h.pipeline
            .answer(&QueryRequest::new(question).with_filters(FilterSet::new().with("filename", "a.pdf")))
            .await
            .unwrap();

        assert_eq!(h.embedder.calls(), 1);
        assert_eq!(h.index.searches(), 2);
        assert!(h.store.peek("embed:how long does shipping take?").await.is_some());
    }

    #[tokio::test]
    async fn test_filters_restrict_hits() {
        let h = harness().await;
        let request = QueryRequest::new("Is shipping free?")
            .with_filters(FilterSet::new().with("filename", "a.pdf"))
            .with_limit(5);

        let response = h.pipeline.answer(&request).await.unwrap();
        let chunks = response.reranked_chunks.unwrap();

        assert_eq!(chunks.len(), 2);
        let a_texts: Vec<&str> = DOCS.iter().filter(|(s, _)| *s == "a.pdf").map(|(_, t)| *t).collect();
        assert!(chunks.iter().all(|c| a_texts.contains(&c.chunk.as_str())));

        let answer_prompt = h.llm.prompts().pop().unwrap();
        assert!(!answer_prompt.contains("Fridays"));
    }

    #[tokio::test]
    async fn test_rerank_selection_feeds_answer() {
        let reply = r#"```json
[{"chunk": "Gift cards never expire.", "score": 0.99}]
```"#;
        let h = build(QueryConfig::default(), script(reply), seeded_index().await, CountingCache::new());

        let response = h.pipeline.answer(&QueryRequest::new("Do gift cards expire?")).await.unwrap();
        let chunks = response.reranked_chunks.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk, "Gift cards never expire.");

        let prompts = h.llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Context:\nGift cards never expire.\n\nQuestion:"));

        // Re-rank runs deterministically, the answer does not
        let options = h.llm.options();
        assert!(options[0].deterministic);
        assert!(!options[1].deterministic);
        assert!((options[1].temperature - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_unretrieved_rerank_text_never_reaches_answer() {
        let reply = r#"[{"chunk": "Gift cards expire after 400 days.", "score": 1.0}]"#;
        let h = build(QueryConfig::default(), script(reply), seeded_index().await, CountingCache::new());

        let response = h
            .pipeline
            .answer(&QueryRequest::new("Do gift cards expire?").with_limit(2))
            .await
            .unwrap();

        let chunks = response.reranked_chunks.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| DOCS.iter().any(|(_, t)| *t == c.chunk)));

        let answer_prompt = h.llm.prompts().pop().unwrap();
        assert!(!answer_prompt.contains("400 days"));
    }

    #[tokio::test]
    async fn test_malformed_rerank_falls_back_to_score_order() {
        let h = harness().await;
        let response = h
            .pipeline
            .answer(&QueryRequest::new("shipping days").with_limit(2))
            .await
            .unwrap();

        let chunks = response.reranked_chunks.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].score >= chunks[1].score);
        assert_eq!(response.answer, "Grounded answer.");
    }

    #[tokio::test]
    async fn test_rerank_disabled_skips_call() {
        let h = harness().await;
        let response = h
            .pipeline
            .answer(&QueryRequest::new("shipping days").with_rerank(false))
            .await
            .unwrap();

        assert!(response.reranked_chunks.is_none());
        assert_eq!(h.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_rewrite_pass() {
        let h = harness().await;
        let response = h
            .pipeline
            .answer(&QueryRequest::new("shipping days").with_rerank(false).with_rewrite())
            .await
            .unwrap();

        assert_eq!(response.answer, "Short and friendly.");
        assert_eq!(response.rewrite_applied, Some(true));
        assert_eq!(h.llm.calls(), 2);
        assert!(h.llm.prompts()[1].ends_with("\n\nGrounded answer."));
    }

    #[tokio::test]
    async fn test_hybrid_flag_reported() {
        let h = harness().await;
        let response = h
            .pipeline
            .answer(&QueryRequest::new("gift cards").with_hybrid().with_rerank(false))
            .await
            .unwrap();

        assert_eq!(response.hybrid, Some(true));
    }

    #[tokio::test]
    async fn test_empty_results_answer_without_context() {
        let h = build(
            QueryConfig::default(),
            script("not json"),
            CountingIndex::ready().await,
            CountingCache::new(),
        );
        let response = h.pipeline.answer(&QueryRequest::new("What is CSEC?")).await.unwrap();

        assert_eq!(response.no_context, Some(true));
        assert_eq!(response.answer, "Try asking about shipping or returns.");
        assert!(h.store.peek("answer:what is csec?:{}").await.is_none());
    }

    #[tokio::test]
    async fn test_threshold_empties_candidates_in_plain_mode() {
        let config = QueryConfig {
            mode: PipelineMode::Plain,
            ..Default::default()
        };
        let h = build(config, script("not json"), seeded_index().await, CountingCache::new());
        let response = h
            .pipeline
            .answer(&QueryRequest::new("shipping").with_min_score(5.0))
            .await
            .unwrap();

        assert_eq!(response.answer, NO_CONTEXT_ANSWER);
        assert_eq!(response.no_context, Some(true));
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_outage_degrades_and_is_not_cached() {
        let h = build(
            QueryConfig::default(),
            ScriptedLlm::failing(),
            seeded_index().await,
            CountingCache::new(),
        );
        let response = h
            .pipeline
            .answer(&QueryRequest::new("shipping days").with_rewrite())
            .await
            .unwrap();

        assert_eq!(response.answer, GENERATION_FAILED);
        assert_eq!(response.rewrite_applied, Some(false));
        assert!(h.store.peek("answer:shipping days:{}").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_outage_is_silent() {
        let h = build(QueryConfig::default(), script("not json"), seeded_index().await, CountingCache::down());

        let first = h.pipeline.answer(&QueryRequest::new("shipping days")).await.unwrap();
        let second = h.pipeline.answer(&QueryRequest::new("shipping days")).await.unwrap();

        assert_eq!(first.answer, "Grounded answer.");
        assert_eq!(second.cached, Some(false));
        assert_eq!(h.index.searches(), 2);
        assert!(h.store.gets() > 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_surfaced() {
        let llm = Arc::new(script("not json"));
        let pipeline = QueryPipeline::new(
            &QueryConfig::default(),
            0.4,
            Arc::new(FailingEmbedder),
            seeded_index().await,
            AnswerCache::disabled(),
            LanguageModel::new(llm.clone()),
        );

        let result = pipeline.answer(&QueryRequest::new("shipping days")).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_index_failure_is_surfaced() {
        let h = build(QueryConfig::default(), script("not json"), CountingIndex::down(), CountingCache::new());
        let result = h.pipeline.answer(&QueryRequest::new("shipping days")).await;

        assert!(matches!(result, Err(Error::VectorDb(_))));
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cached_embedding_is_recomputed() {
        let store = CountingCache::new();
        store
            .set("embed:shipping days", "{oops", Duration::from_secs(60))
            .await
            .unwrap();
        let embedder = Arc::new(HashEmbedder::new());
        let h = build_with_embedder(QueryConfig::default(), script("not json"), seeded_index().await, store, embedder);

        h.pipeline.answer(&QueryRequest::new("shipping days")).await.unwrap();
        assert_eq!(h.embedder.calls(), 1);
        assert_eq!(h.embedder.dimensions(), HashEmbedder::DIMENSIONS);
    }
}
