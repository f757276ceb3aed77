use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::event::EventKind;
use crate::domain::product::ProductId;

/// Cosine similarity between two vectors, or `None` when the vectors cannot
/// be compared: mismatched dimensions or a zero-magnitude side.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Per-kind interaction weights used to score a customer's history. Views
/// carry the click weight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventWeights {
    pub click: f64,
    pub cart: f64,
    pub purchase: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self { click: 1.0, cart: 2.0, purchase: 3.0 }
    }
}

impl EventWeights {
    pub fn weight(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::View | EventKind::Click => self.click,
            EventKind::AddToCart => self.cart,
            EventKind::Purchase => self.purchase,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecommendationRanker {
    pub weights: EventWeights,
    pub segment_boost: f64,
    pub fallback_confidence: f64,
    pub top_n: usize,
}

impl RecommendationRanker {
    /// Collapses per-kind interaction counts into one weighted score per
    /// product.
    pub fn history_weights(
        &self,
        counts: &[(ProductId, EventKind, u64)],
    ) -> HashMap<ProductId, f64> {
        let mut weights: HashMap<ProductId, f64> = HashMap::new();
        for (product_id, kind, count) in counts {
            *weights.entry(product_id.clone()).or_insert(0.0) +=
                self.weights.weight(*kind) * *count as f64;
        }
        weights
    }

    /// Ranks catalog candidates against a customer's interaction history.
    ///
    /// A candidate's score is the mean of `cos(candidate, history item) *
    /// history weight` over every history product with an embedding, boosted
    /// when the candidate is popular within the customer's segment. Products
    /// the customer already interacted with are never recommended, and
    /// candidates with no scorable history pairing are dropped.
    pub fn rank(
        &self,
        history: &HashMap<ProductId, f64>,
        embeddings: &HashMap<ProductId, Vec<f64>>,
        candidates: &[ProductId],
        segment_popular: &HashSet<ProductId>,
    ) -> Vec<(ProductId, f64)> {
        let mut ranked: Vec<(ProductId, f64)> = Vec::new();
        for candidate in candidates {
            if history.contains_key(candidate) {
                continue;
            }
            let Some(candidate_embedding) = embeddings.get(candidate) else {
                continue;
            };

            let mut similarities: Vec<f64> = Vec::new();
            for (history_id, history_weight) in history {
                let Some(history_embedding) = embeddings.get(history_id) else {
                    continue;
                };
                if let Some(similarity) = cosine_similarity(candidate_embedding, history_embedding)
                {
                    similarities.push(similarity * history_weight);
                }
            }
            if similarities.is_empty() {
                continue;
            }

            let mut score = similarities.iter().sum::<f64>() / similarities.len() as f64;
            if segment_popular.contains(candidate) {
                score *= self.segment_boost;
            }
            ranked.push((candidate.clone(), score));
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.top_n);
        ranked
    }

    /// Cold-start list: the caller supplies candidates already ordered by
    /// popularity and every pick carries the fixed fallback confidence.
    pub fn fallback(&self, ordered_candidates: &[ProductId]) -> Vec<(ProductId, f64)> {
        ordered_candidates
            .iter()
            .take(self.top_n)
            .map(|id| (id.clone(), self.fallback_confidence))
            .collect()
    }
}
