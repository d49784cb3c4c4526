//! End-to-end pipeline tests with mock ports

use async_trait::async_trait;
use cagpipe_core::{
    seed_medical_graph, AgenticTechnique, CagError, CitedRagTechnique, GenerationClient,
    GenerationOptions, GraphContextItem, MemoryGraphStore, MultiHopGraphTechnique, QueryRequest,
    Result, ScoredDocument, StepStatus, Technique, TokenUsage, VectorStore,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Generation client that replays scripted responses and records prompts
struct ScriptedClient {
    responses: Mutex<VecDeque<String>>,
    default_response: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            default_response: "A generated answer grounded in the provided context.".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn always(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<(String, TokenUsage)> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());
        Ok((response, TokenUsage::new(10, 20)))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Vector store serving a fixed result list
struct StaticStore {
    results: Vec<ScoredDocument>,
}

impl StaticStore {
    fn new(scored: Vec<(&str, f64, &str)>) -> Self {
        Self {
            results: scored
                .into_iter()
                .map(|(content, score, title)| {
                    let mut metadata = HashMap::new();
                    metadata.insert("title".to_string(), title.to_string());
                    ScoredDocument {
                        content: content.to_string(),
                        score,
                        metadata,
                    }
                })
                .collect(),
        }
    }
}

#[async_trait]
impl VectorStore for StaticStore {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        _filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredDocument>> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn add_documents(
        &self,
        _texts: Vec<String>,
        _metadatas: Vec<HashMap<String, String>>,
        _ids: Vec<String>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _ids: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Vector store whose search always fails
struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredDocument>> {
        Err(CagError::Retrieval("store unreachable".to_string()))
    }

    async fn add_documents(
        &self,
        _texts: Vec<String>,
        _metadatas: Vec<HashMap<String, String>>,
        _ids: Vec<String>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _ids: &[String]) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn cited_rag_filters_chunks_below_threshold() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let store = Arc::new(StaticStore::new(vec![
        ("strong match", 0.9, "Doc A"),
        ("decent match", 0.7, "Doc B"),
        ("weak match", 0.4, "Doc C"),
    ]));
    let technique = CitedRagTechnique::new(client, store);

    let request = QueryRequest::new("what applies here?");
    let response = technique.process(&request).await.unwrap();

    assert_eq!(response.context_chunks.len(), 2);
    for chunk in &response.context_chunks {
        assert!(chunk.relevance_score >= 0.6);
    }
    assert_eq!(
        response.context_chunks[0].metadata.get("citation_id"),
        Some(&"[1]".to_string())
    );
    assert_eq!(
        response.context_chunks[1].metadata.get("citation_id"),
        Some(&"[2]".to_string())
    );
    assert_eq!(response.technique, "cited_rag");
    assert!((0.0..=1.0).contains(&response.confidence_score));

    // All three stages tracked and completed
    assert_eq!(response.process.total_steps, 3);
    for step in &response.process.steps {
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.duration_ms.is_some());
    }
}

#[tokio::test]
async fn cited_rag_empty_context_gets_confidence_floor() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let store = Arc::new(StaticStore::new(vec![
        ("weak one", 0.3, "Doc A"),
        ("weak two", 0.2, "Doc B"),
    ]));
    let technique = CitedRagTechnique::new(client.clone(), store);

    let request = QueryRequest::new("anything?");
    let response = technique.process(&request).await.unwrap();

    assert!(response.context_chunks.is_empty());
    assert_eq!(response.confidence_score, 0.3);

    // The model still receives a well-formed prompt with an explicit
    // no-context marker
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("No supporting context was retrieved"));
    assert!(prompts[0].contains("## Query:"));
}

#[tokio::test]
async fn cited_rag_retrieval_failure_names_the_stage() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let technique = CitedRagTechnique::new(client, Arc::new(UnreachableStore));

    let err = technique
        .process(&QueryRequest::new("q"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some("retrieve_context"));
    assert!(err.to_string().contains("store unreachable"));
}

#[tokio::test]
async fn multihop_end_to_end_over_seeded_graph() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let graph = Arc::new(seed_medical_graph().unwrap());
    let technique = MultiHopGraphTechnique::new(client.clone(), graph);

    // Large enough that the combined-item cap keeps all three hops
    let request = QueryRequest::new("I have a fever and cough").with_context_limit(10);
    let response = technique.process(&request).await.unwrap();

    // At least one hop-1 item names Influenza or Pneumonia with
    // probability >= 0.8
    let strong_hop1 = response.context_chunks.iter().any(|chunk| {
        chunk.metadata.get("hop").map(String::as_str) == Some("1")
            && (chunk.content.contains("Influenza") || chunk.content.contains("Pneumonia"))
            && chunk.relevance_score >= 0.8
    });
    assert!(strong_hop1, "expected a strong hop-1 disease match");

    // At least one treatment item
    assert!(response
        .context_chunks
        .iter()
        .any(|chunk| chunk.metadata.get("hop").map(String::as_str) == Some("3")));

    // The final prompt walks all three hops
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Hop 1"));
    assert!(prompts[0].contains("Hop 2"));
    assert!(prompts[0].contains("Hop 3"));
    assert!(prompts[0].contains("educational purposes only"));

    assert_eq!(response.technique, "multi_hop_graph");
}

#[tokio::test]
async fn multihop_truncates_at_three_times_top_k() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let graph = Arc::new(seed_medical_graph().unwrap());
    let technique = MultiHopGraphTechnique::new(client, graph);

    let items = technique
        .retrieve("fever cough fatigue headache", 2)
        .await
        .unwrap();
    assert!(items.len() <= 6);
}

#[tokio::test]
async fn multihop_narrowing_is_prefix_of_emission_order() {
    // Symptoms extract in sorted order, so hop-1 emits all Cough matches
    // before any Fever match. RareD has the highest probability overall
    // but sits past the first three hop-1 items, so a global top-k would
    // pick it while the preserved prefix narrowing must not.
    let mut graph = MemoryGraphStore::new();
    graph.add_disease("FluA", "moderate", "viral");
    graph.add_disease("ColdB", "mild", "viral");
    graph.add_disease("ColdC", "mild", "viral");
    graph.add_disease("RareD", "severe", "viral");
    graph.add_symptom("Cough", "respiratory");
    graph.add_symptom("Fever", "systemic");
    graph.link_symptom("FluA", "Cough", 0.9).unwrap();
    graph.link_symptom("ColdB", "Cough", 0.5).unwrap();
    graph.link_symptom("ColdC", "Cough", 0.45).unwrap();
    graph.link_symptom("RareD", "Fever", 0.99).unwrap();

    let client = Arc::new(ScriptedClient::new(vec![]));
    let technique = MultiHopGraphTechnique::new(client, Arc::new(graph));

    // Hop-1 emission for ["Cough", "Fever"]:
    //   Cough: FluA (0.9), ColdB (0.5), ColdC (0.45)
    //   Fever: RareD (0.99)
    let items = technique.retrieve("fever and cough", 10).await.unwrap();

    let hop1: Vec<&GraphContextItem> = items.iter().filter(|i| i.hop() == 1).collect();
    assert_eq!(hop1.len(), 4);

    let mut hop2_diseases: Vec<String> = Vec::new();
    for item in &items {
        if let GraphContextItem::DiseaseAllSymptoms { disease, .. } = item {
            if !hop2_diseases.contains(disease) {
                hop2_diseases.push(disease.clone());
            }
        }
    }
    assert_eq!(hop2_diseases, vec!["FluA", "ColdB", "ColdC"]);
    assert!(!hop2_diseases.contains(&"RareD".to_string()));
}

#[tokio::test]
async fn multihop_hop1_orders_by_probability() {
    let mut graph = MemoryGraphStore::new();
    graph.add_disease("Influenza", "moderate", "viral");
    graph.add_disease("Common Cold", "mild", "viral");
    graph.add_symptom("Fever", "systemic");
    graph.link_symptom("Common Cold", "Fever", 0.4).unwrap();
    graph.link_symptom("Influenza", "Fever", 0.9).unwrap();

    let client = Arc::new(ScriptedClient::new(vec![]));
    let technique = MultiHopGraphTechnique::new(client, Arc::new(graph));

    let items = technique.retrieve("I have a fever", 5).await.unwrap();
    let hop1_diseases: Vec<String> = items
        .iter()
        .filter_map(|i| match i {
            GraphContextItem::DiseaseSymptom { disease, .. } => Some(disease.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(hop1_diseases, vec!["Influenza", "Common Cold"]);
}

#[tokio::test]
async fn agentic_falls_back_on_malformed_json() {
    // Every call returns non-JSON text: the plan and the reflection both
    // take their documented fallbacks and the request still succeeds.
    let client = Arc::new(ScriptedClient::always("free-form text, no JSON here"));
    let technique = AgenticTechnique::new(client.clone());

    let request = QueryRequest::new("explain retrieval augmentation");
    let response = technique.process(&request).await.unwrap();

    // Fallback plan has three steps, each executed once
    assert_eq!(response.context_chunks.len(), 3);
    assert_eq!(response.context_chunks[0].source, "agent_step_1");

    // plan + 3 steps + synthesis + reflection = 6 calls, no refinement
    assert_eq!(client.prompts().len(), 6);
    assert!(client.prompts()[1].contains("Analyze query keywords"));

    // Reflection did not parse: confidence comes from the shared heuristic
    assert!((0.0..=1.0).contains(&response.confidence_score));
    assert_ne!(response.answer, "");
}

#[tokio::test]
async fn agentic_runs_one_refinement_pass_when_asked() {
    let client = Arc::new(ScriptedClient::new(vec![
        r#"{"steps": ["survey the field", "compare approaches"]}"#,
        "finding one",
        "finding two",
        "draft answer",
        r#"{"score": 4, "critique": "too shallow", "needs_improvement": true}"#,
        "refined answer",
    ]));
    let technique = AgenticTechnique::new(client.clone());

    let request = QueryRequest::new("compare retrieval strategies");
    let response = technique.process(&request).await.unwrap();

    assert_eq!(response.answer, "refined answer");
    // plan + 2 steps + synthesis + reflection + refinement = 6 calls
    assert_eq!(client.prompts().len(), 6);

    // Reflection parsed: confidence override is score / 10
    assert!((response.confidence_score - 0.4).abs() < 1e-9);

    // Each step saw strictly more context than the last
    let prompts = client.prompts();
    assert!(!prompts[1].contains("finding one"));
    assert!(prompts[2].contains("finding one"));

    // Usage accumulates across all six generation sub-calls, 30 each
    assert_eq!(response.token_usage.total, 180);
}

#[tokio::test]
async fn agentic_skips_refinement_when_answer_is_good() {
    let client = Arc::new(ScriptedClient::new(vec![
        r#"{"steps": ["one step"]}"#,
        "finding",
        "solid answer",
        r#"{"score": 9, "critique": "clear and complete", "needs_improvement": false}"#,
    ]));
    let technique = AgenticTechnique::new(client.clone());

    let response = technique
        .process(&QueryRequest::new("an easy question"))
        .await
        .unwrap();

    assert_eq!(response.answer, "solid answer");
    assert_eq!(client.prompts().len(), 4);
    assert!((response.confidence_score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn reasoning_steps_reported_in_response() {
    let client = Arc::new(ScriptedClient::always("no json"));
    let technique = AgenticTechnique::new(client);

    let response = technique
        .process(&QueryRequest::new("log my steps"))
        .await
        .unwrap();

    // Orchestrator steps plus the agent's own reasoning log
    assert!(response
        .reasoning_steps
        .iter()
        .any(|s| s.starts_with("Retrieved ")));
    assert!(response
        .reasoning_steps
        .iter()
        .any(|s| s.starts_with("Planning:")));
    assert!(response
        .reasoning_steps
        .iter()
        .any(|s| s.starts_with("Reflection:")));
}
