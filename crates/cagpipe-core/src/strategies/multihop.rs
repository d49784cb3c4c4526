//! Multi-hop retrieval over the knowledge graph
//!
//! Three read-only hops: query symptoms to diseases, diseases to full
//! symptom profiles, diseases to treatments. Each retrieved item is
//! tagged with the hop that produced it.

use crate::error::Result;
use crate::llm::{GenerationClient, GenerationOptions, TokenUsage};
use crate::pipeline::{ContextChunk, QueryRequest, Technique};
use crate::store::GraphStore;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// Identifier of the knowledge source recorded with generated answers
pub const KNOWLEDGE_SOURCE: &str = "medical_graph";

/// Number of traversal hops (fixed)
pub const HOP_COUNT: u8 = 3;

/// Keyword vocabulary mapping query text to canonical symptom names
const SYMPTOM_KEYWORDS: &[(&str, &str)] = &[
    ("fever", "Fever"),
    ("cough", "Cough"),
    ("tired", "Fatigue"),
    ("fatigue", "Fatigue"),
    ("headache", "Headache"),
    ("sore throat", "Sore Throat"),
    ("throat", "Sore Throat"),
    ("breath", "Shortness of Breath"),
    ("breathing", "Shortness of Breath"),
    ("chest pain", "Chest Pain"),
    ("runny nose", "Runny Nose"),
    ("body aches", "Body Aches"),
    ("aches", "Body Aches"),
    ("taste", "Loss of Taste"),
];

/// Extract canonical symptom names from a natural-language query
///
/// Case-insensitive substring matching against the fixed vocabulary;
/// duplicates collapse via set semantics. Output is sorted for
/// deterministic behavior (the contract does not fix an order).
pub fn extract_symptoms(query: &str) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let symptoms: BTreeSet<&str> = SYMPTOM_KEYWORDS
        .iter()
        .filter(|(keyword, _)| query_lower.contains(keyword))
        .map(|(_, canonical)| *canonical)
        .collect();
    symptoms.into_iter().map(String::from).collect()
}

/// One unit of graph context, tagged with the hop that produced it
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphContextItem {
    /// Hop 1: a disease matched from a queried symptom
    DiseaseSymptom {
        symptom: String,
        disease: String,
        severity: String,
        category: String,
        probability: f64,
    },
    /// Hop 2: one entry of a top disease's full symptom profile
    DiseaseAllSymptoms {
        disease: String,
        symptom: String,
        symptom_type: String,
        probability: f64,
    },
    /// Hop 3: a treatment for a top disease
    Treatment {
        disease: String,
        treatment: String,
        treatment_type: String,
    },
}

impl GraphContextItem {
    pub fn hop(&self) -> u8 {
        match self {
            Self::DiseaseSymptom { .. } => 1,
            Self::DiseaseAllSymptoms { .. } => 2,
            Self::Treatment { .. } => 3,
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            Self::DiseaseSymptom { probability, .. }
            | Self::DiseaseAllSymptoms { probability, .. } => Some(*probability),
            Self::Treatment { .. } => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::DiseaseSymptom {
                symptom,
                disease,
                severity,
                probability,
                ..
            } => format!(
                "Symptom '{}' -> Disease '{}' (probability: {:.2}, severity: {})",
                symptom, disease, probability, severity
            ),
            Self::DiseaseAllSymptoms {
                disease,
                symptom,
                probability,
                ..
            } => format!(
                "Disease '{}' has symptom '{}' (probability: {:.2})",
                disease, symptom, probability
            ),
            Self::Treatment {
                disease,
                treatment,
                treatment_type,
            } => format!(
                "Disease '{}' treated with '{}' ({})",
                disease, treatment, treatment_type
            ),
        }
    }
}

/// Multi-hop graph reasoning technique
///
/// Holds a per-run item cache so `augment_context` can group items by
/// hop; one instance serves one request at a time. Construct a fresh
/// instance per request (construction is cheap, ports are shared Arcs).
pub struct MultiHopGraphTechnique {
    client: Arc<dyn GenerationClient>,
    graph: Arc<dyn GraphStore>,
    items: Mutex<Vec<GraphContextItem>>,
}

impl MultiHopGraphTechnique {
    pub fn new(client: Arc<dyn GenerationClient>, graph: Arc<dyn GraphStore>) -> Self {
        Self {
            client,
            graph,
            items: Mutex::new(Vec::new()),
        }
    }

    /// Perform the three-hop traversal for a query
    ///
    /// Returns at most `top_k * 3` items in hop order: all hop-1 items,
    /// then hop-2, then hop-3, truncated at the combined limit.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<GraphContextItem>> {
        let symptoms = extract_symptoms(query);
        tracing::debug!("Extracted symptoms: {:?}", symptoms);

        let mut items = Vec::new();

        // Hop 1: symptom to disease
        for symptom in &symptoms {
            for m in self.graph.diseases_with_symptom(symptom).await? {
                items.push(GraphContextItem::DiseaseSymptom {
                    symptom: symptom.clone(),
                    disease: m.disease,
                    severity: m.severity,
                    category: m.category,
                    probability: m.probability,
                });
            }
        }

        // Candidate narrowing is deliberately a deduplicated prefix of the
        // first three hop-1 items in emission order, not a global top-k by
        // probability. Downstream output ordering depends on this; see
        // DESIGN.md before changing.
        let mut top_diseases: Vec<String> = Vec::new();
        for item in items.iter().take(3) {
            if let GraphContextItem::DiseaseSymptom { disease, .. } = item {
                if !top_diseases.contains(disease) {
                    top_diseases.push(disease.clone());
                }
            }
        }

        // Hop 2: full symptom profiles for top diseases
        for disease in &top_diseases {
            for link in self.graph.symptom_profile(disease).await? {
                items.push(GraphContextItem::DiseaseAllSymptoms {
                    disease: disease.clone(),
                    symptom: link.symptom,
                    symptom_type: link.symptom_type,
                    probability: link.probability,
                });
            }
        }

        // Hop 3: treatments for top diseases
        for disease in &top_diseases {
            for link in self.graph.treatments_for(disease).await? {
                items.push(GraphContextItem::Treatment {
                    disease: disease.clone(),
                    treatment: link.treatment,
                    treatment_type: link.treatment_type,
                });
            }
        }

        items.truncate(top_k * 3);
        Ok(items)
    }

    /// Assemble the multi-hop reasoning prompt
    pub fn augment(&self, query: &str, items: &[GraphContextItem]) -> String {
        let mut prompt = format!(
            "You are a medical diagnosis assistant. Analyze the patient's symptoms using \
             multi-hop reasoning through a medical knowledge graph.\n\
             \n\
             Patient Query: {}\n\
             \n\
             REASONING PATH:\n\
             \n\
             Hop 1 - Symptom to Disease Matching:\n",
            query
        );

        for item in items {
            if let GraphContextItem::DiseaseSymptom { .. } = item {
                prompt.push_str(&format!("- {}\n", item.render()));
            }
        }

        prompt.push_str("\nHop 2 - Complete Disease Profiles:\n");
        for (disease, symptoms) in group_by_disease(items, 2) {
            prompt.push_str(&format!("- {}: {}\n", disease, symptoms.join(", ")));
        }

        prompt.push_str("\nHop 3 - Treatment Options:\n");
        for (disease, treatments) in group_by_disease(items, 3) {
            prompt.push_str(&format!("- {}: {}\n", disease, treatments.join(", ")));
        }

        prompt.push_str(
            "\nBased on this multi-hop reasoning:\n\
             1. Identify the most likely diagnosis with confidence score\n\
             2. Explain which symptoms support this diagnosis\n\
             3. List any additional symptoms the patient should watch for\n\
             4. Recommend appropriate treatments\n\
             5. Provide important disclaimers\n\
             \n\
             Remember: This is for educational purposes only. Always recommend consulting \
             a healthcare professional.\n",
        );

        prompt
    }
}

/// Group hop-2 or hop-3 entries per disease, preserving first-seen order
fn group_by_disease(items: &[GraphContextItem], hop: u8) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for item in items.iter().filter(|i| i.hop() == hop) {
        let (disease, entry) = match item {
            GraphContextItem::DiseaseAllSymptoms {
                disease,
                symptom,
                probability,
                ..
            } => (disease, format!("{} ({:.2})", symptom, probability)),
            GraphContextItem::Treatment {
                disease, treatment, ..
            } => (disease, treatment.clone()),
            GraphContextItem::DiseaseSymptom { .. } => continue,
        };

        match groups.iter_mut().find(|(name, _)| name == disease) {
            Some((_, entries)) => entries.push(entry),
            None => groups.push((disease.clone(), vec![entry])),
        }
    }
    groups
}

#[async_trait]
impl Technique for MultiHopGraphTechnique {
    fn name(&self) -> &str {
        "multi_hop_graph"
    }

    async fn retrieve_context(&self, request: &QueryRequest) -> Result<Vec<ContextChunk>> {
        let items = self.retrieve(&request.query, request.context_limit).await?;

        let chunks = items
            .iter()
            .map(|item| {
                let mut chunk = ContextChunk::new(
                    item.render(),
                    KNOWLEDGE_SOURCE,
                    item.probability().unwrap_or(1.0),
                );
                chunk
                    .metadata
                    .insert("hop".to_string(), item.hop().to_string());
                chunk
            })
            .collect();

        *self.items.lock().unwrap_or_else(|e| e.into_inner()) = items;
        Ok(chunks)
    }

    async fn augment_context(
        &self,
        request: &QueryRequest,
        _chunks: &[ContextChunk],
    ) -> Result<String> {
        let items = self
            .items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        Ok(self.augment(&request.query, &items))
    }

    async fn generate_response(
        &self,
        prompt: &str,
        request: &QueryRequest,
    ) -> Result<(String, TokenUsage)> {
        tracing::debug!(
            "Generating diagnosis: {} hops over {}",
            HOP_COUNT,
            KNOWLEDGE_SOURCE
        );
        let options = GenerationOptions::new(request.temperature, request.max_tokens);
        self.client.generate(prompt, &options).await
    }

    fn reasoning_log(&self) -> Vec<String> {
        vec![format!(
            "Traversed {} hops over the {} knowledge source",
            HOP_COUNT, KNOWLEDGE_SOURCE
        )]
    }
}
