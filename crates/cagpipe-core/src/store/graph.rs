//! Graph store port and in-memory knowledge graph
//!
//! The graph is populated once at construction and read-only during
//! request processing. Traversal queries mirror the pattern-matching
//! shape of a property-graph database: typed nodes (Disease, Symptom,
//! Treatment) connected by HAS_SYMPTOM (weighted) and TREATED_WITH edges.

use crate::error::{CagError, Result};
use async_trait::async_trait;

/// Disease node
#[derive(Debug, Clone)]
pub struct Disease {
    pub name: String,
    pub severity: String,
    pub category: String,
}

/// Symptom node
#[derive(Debug, Clone)]
pub struct Symptom {
    pub name: String,
    pub symptom_type: String,
}

/// Treatment node
#[derive(Debug, Clone)]
pub struct Treatment {
    pub name: String,
    pub treatment_type: String,
}

/// Hop-1 record: a disease linked to a queried symptom
#[derive(Debug, Clone)]
pub struct DiseaseMatch {
    pub disease: String,
    pub severity: String,
    pub category: String,
    pub probability: f64,
}

/// Hop-2 record: one symptom in a disease's full profile
#[derive(Debug, Clone)]
pub struct SymptomLink {
    pub symptom: String,
    pub symptom_type: String,
    pub probability: f64,
}

/// Hop-3 record: a treatment linked to a disease
#[derive(Debug, Clone)]
pub struct TreatmentLink {
    pub treatment: String,
    pub treatment_type: String,
}

/// Trait for graph stores serving multi-hop traversal queries
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Diseases linked to a symptom, ordered by probability descending
    async fn diseases_with_symptom(&self, symptom: &str) -> Result<Vec<DiseaseMatch>>;

    /// All symptoms of a disease, ordered by probability descending
    async fn symptom_profile(&self, disease: &str) -> Result<Vec<SymptomLink>>;

    /// All treatments of a disease
    async fn treatments_for(&self, disease: &str) -> Result<Vec<TreatmentLink>>;
}

/// In-memory graph store over typed node and edge tables
pub struct MemoryGraphStore {
    diseases: Vec<Disease>,
    symptoms: Vec<Symptom>,
    treatments: Vec<Treatment>,
    // (disease, symptom, probability)
    has_symptom: Vec<(String, String, f64)>,
    // (disease, treatment)
    treated_with: Vec<(String, String)>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self {
            diseases: Vec::new(),
            symptoms: Vec::new(),
            treatments: Vec::new(),
            has_symptom: Vec::new(),
            treated_with: Vec::new(),
        }
    }

    pub fn add_disease(&mut self, name: &str, severity: &str, category: &str) {
        self.diseases.push(Disease {
            name: name.to_string(),
            severity: severity.to_string(),
            category: category.to_string(),
        });
    }

    pub fn add_symptom(&mut self, name: &str, symptom_type: &str) {
        self.symptoms.push(Symptom {
            name: name.to_string(),
            symptom_type: symptom_type.to_string(),
        });
    }

    pub fn add_treatment(&mut self, name: &str, treatment_type: &str) {
        self.treatments.push(Treatment {
            name: name.to_string(),
            treatment_type: treatment_type.to_string(),
        });
    }

    /// Create a HAS_SYMPTOM edge; both endpoints must already exist
    pub fn link_symptom(&mut self, disease: &str, symptom: &str, probability: f64) -> Result<()> {
        self.disease(disease)?;
        self.symptom(symptom)?;
        self.has_symptom
            .push((disease.to_string(), symptom.to_string(), probability));
        Ok(())
    }

    /// Create a TREATED_WITH edge; both endpoints must already exist
    pub fn link_treatment(&mut self, disease: &str, treatment: &str) -> Result<()> {
        self.disease(disease)?;
        self.treatment(treatment)?;
        self.treated_with
            .push((disease.to_string(), treatment.to_string()));
        Ok(())
    }

    fn disease(&self, name: &str) -> Result<&Disease> {
        self.diseases
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CagError::GraphQuery(format!("Unknown disease node: {}", name)))
    }

    fn symptom(&self, name: &str) -> Result<&Symptom> {
        self.symptoms
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CagError::GraphQuery(format!("Unknown symptom node: {}", name)))
    }

    fn treatment(&self, name: &str) -> Result<&Treatment> {
        self.treatments
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CagError::GraphQuery(format!("Unknown treatment node: {}", name)))
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn diseases_with_symptom(&self, symptom: &str) -> Result<Vec<DiseaseMatch>> {
        let mut matches = Vec::new();
        for (disease_name, symptom_name, probability) in &self.has_symptom {
            if symptom_name != symptom {
                continue;
            }
            let disease = self.disease(disease_name)?;
            matches.push(DiseaseMatch {
                disease: disease.name.clone(),
                severity: disease.severity.clone(),
                category: disease.category.clone(),
                probability: *probability,
            });
        }

        // Stable sort keeps seed insertion order among equal probabilities
        matches.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    async fn symptom_profile(&self, disease: &str) -> Result<Vec<SymptomLink>> {
        let mut links = Vec::new();
        for (disease_name, symptom_name, probability) in &self.has_symptom {
            if disease_name != disease {
                continue;
            }
            let symptom = self.symptom(symptom_name)?;
            links.push(SymptomLink {
                symptom: symptom.name.clone(),
                symptom_type: symptom.symptom_type.clone(),
                probability: *probability,
            });
        }

        links.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(links)
    }

    async fn treatments_for(&self, disease: &str) -> Result<Vec<TreatmentLink>> {
        let mut links = Vec::new();
        for (disease_name, treatment_name) in &self.treated_with {
            if disease_name != disease {
                continue;
            }
            let treatment = self.treatment(treatment_name)?;
            links.push(TreatmentLink {
                treatment: treatment.name.clone(),
                treatment_type: treatment.treatment_type.clone(),
            });
        }
        Ok(links)
    }
}

/// Build the example medical knowledge graph
///
/// Seed data for the multi-hop strategy: diseases, symptoms, treatments,
/// weighted HAS_SYMPTOM edges and TREATED_WITH edges. Probability values
/// are per-edge confidence weights; they are not normalized to sum to 1
/// per disease.
pub fn seed_medical_graph() -> Result<MemoryGraphStore> {
    let mut graph = MemoryGraphStore::new();

    for (name, severity, category) in [
        ("Influenza", "moderate", "viral"),
        ("Pneumonia", "severe", "bacterial"),
        ("Common Cold", "mild", "viral"),
        ("Bronchitis", "moderate", "bacterial"),
        ("COVID-19", "severe", "viral"),
        ("Strep Throat", "moderate", "bacterial"),
        ("Migraine", "moderate", "neurological"),
        ("Hypertension", "moderate", "cardiovascular"),
    ] {
        graph.add_disease(name, severity, category);
    }

    for (name, symptom_type) in [
        ("Fever", "systemic"),
        ("Cough", "respiratory"),
        ("Fatigue", "systemic"),
        ("Headache", "neurological"),
        ("Sore Throat", "respiratory"),
        ("Shortness of Breath", "respiratory"),
        ("Chest Pain", "respiratory"),
        ("Runny Nose", "respiratory"),
        ("Body Aches", "systemic"),
        ("Loss of Taste", "sensory"),
    ] {
        graph.add_symptom(name, symptom_type);
    }

    for (name, treatment_type) in [
        ("Rest and Hydration", "supportive"),
        ("Antibiotics", "medication"),
        ("Antiviral Medication", "medication"),
        ("Pain Relievers", "medication"),
        ("Cough Suppressants", "medication"),
        ("Oxygen Therapy", "supportive"),
    ] {
        graph.add_treatment(name, treatment_type);
    }

    for (disease, symptom, probability) in [
        ("Influenza", "Fever", 0.9),
        ("Influenza", "Cough", 0.8),
        ("Influenza", "Fatigue", 0.9),
        ("Influenza", "Body Aches", 0.8),
        ("Pneumonia", "Fever", 0.9),
        ("Pneumonia", "Cough", 0.9),
        ("Pneumonia", "Shortness of Breath", 0.8),
        ("Pneumonia", "Chest Pain", 0.7),
        ("Common Cold", "Runny Nose", 0.9),
        ("Common Cold", "Sore Throat", 0.7),
        ("Common Cold", "Cough", 0.6),
        ("COVID-19", "Fever", 0.8),
        ("COVID-19", "Cough", 0.8),
        ("COVID-19", "Loss of Taste", 0.7),
        ("COVID-19", "Fatigue", 0.9),
        ("Strep Throat", "Sore Throat", 0.9),
        ("Strep Throat", "Fever", 0.7),
        ("Migraine", "Headache", 0.95),
    ] {
        graph.link_symptom(disease, symptom, probability)?;
    }

    for (disease, treatment) in [
        ("Influenza", "Rest and Hydration"),
        ("Influenza", "Antiviral Medication"),
        ("Pneumonia", "Antibiotics"),
        ("Pneumonia", "Oxygen Therapy"),
        ("Common Cold", "Rest and Hydration"),
        ("Common Cold", "Cough Suppressants"),
        ("COVID-19", "Rest and Hydration"),
        ("COVID-19", "Oxygen Therapy"),
        ("Strep Throat", "Antibiotics"),
        ("Migraine", "Pain Relievers"),
    ] {
        graph.link_treatment(disease, treatment)?;
    }

    Ok(graph)
}
