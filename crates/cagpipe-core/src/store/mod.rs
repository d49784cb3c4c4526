//! Knowledge store ports: vector similarity search and graph traversal

mod graph;
mod vector;

pub use graph::{
    seed_medical_graph, Disease, DiseaseMatch, GraphStore, MemoryGraphStore, Symptom, SymptomLink,
    Treatment, TreatmentLink,
};
pub use vector::{cosine_similarity, MemoryVectorStore, ScoredDocument, VectorStore};
