use chrono::{DateTime, Utc};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::segment::SegmentAssignment;
use crate::errors::DomainError;

/// Recency, frequency, and monetary totals for one purchasing customer.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseSummary {
    pub customer_id: CustomerId,
    pub frequency: u64,
    pub recency_days: f64,
    pub monetary: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RfmWeights {
    pub recency: f64,
    pub frequency: f64,
    pub monetary: f64,
}

impl Default for RfmWeights {
    fn default() -> Self {
        Self { recency: 0.3, frequency: 0.3, monetary: 0.4 }
    }
}

/// Buckets purchasing customers into labelled tiers with seeded 1-D k-means
/// over a weighted RFM score.
///
/// Each dimension is min-max normalized across the population, recency is
/// inverted so recent buyers score high, and cluster centroids are sorted
/// ascending so the lowest-value cluster always receives the first label.
#[derive(Clone, Debug)]
pub struct SegmentationEngine {
    pub weights: RfmWeights,
    pub clusters: usize,
    pub labels: Vec<String>,
    pub seed: u64,
    pub max_iterations: usize,
}

impl SegmentationEngine {
    pub fn assign(
        &self,
        summaries: &[PurchaseSummary],
        assigned_at: DateTime<Utc>,
    ) -> Result<Vec<SegmentAssignment>, DomainError> {
        if self.labels.is_empty() {
            return Err(DomainError::EmptyLabelVocabulary);
        }
        if summaries.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.rfm_scores(summaries);
        // Fewer customers than configured clusters degrades k rather than
        // producing empty buckets.
        let k = self.clusters.min(scores.len()).min(self.labels.len()).max(1);
        let membership = kmeans_1d(&scores, k, self.seed, self.max_iterations);

        Ok(summaries
            .iter()
            .zip(scores.iter())
            .zip(membership.iter())
            .map(|((summary, score), label_idx)| SegmentAssignment {
                customer_id: summary.customer_id.clone(),
                label: self.labels[*label_idx].clone(),
                score: *score,
                assigned_at,
            })
            .collect())
    }

    fn rfm_scores(&self, summaries: &[PurchaseSummary]) -> Vec<f64> {
        let recency: Vec<f64> = summaries.iter().map(|s| s.recency_days).collect();
        let frequency: Vec<f64> = summaries.iter().map(|s| s.frequency as f64).collect();
        let monetary: Vec<f64> = summaries.iter().map(|s| s.monetary).collect();

        let recency = min_max_normalize(&recency);
        let frequency = min_max_normalize(&frequency);
        let monetary = min_max_normalize(&monetary);

        (0..summaries.len())
            .map(|i| {
                let inverted_recency = 1.0 - recency[i];
                self.weights.recency * inverted_recency
                    + self.weights.frequency * frequency[i]
                    + self.weights.monetary * monetary[i]
            })
            .collect()
    }
}

/// Min-max scales values into [0, 1]. A dimension with no spread maps to 0.0
/// for every customer so it carries no weight in the blended score.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|value| (value - min) / range).collect()
}

/// Lloyd's algorithm over scalar scores. Centroids are seeded from a shuffled
/// copy of the input so identical inputs and seeds always converge the same
/// way. Returned indices are ordered by centroid value ascending.
fn kmeans_1d(scores: &[f64], k: usize, seed: u64, max_iterations: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool: Vec<f64> = scores.to_vec();
    pool.sort_by(f64::total_cmp);
    pool.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON);
    pool.shuffle(&mut rng);

    let mut centroids: Vec<f64> = pool.into_iter().take(k).collect();
    while centroids.len() < k {
        // Not enough distinct values to seed k centroids.
        centroids.push(scores[centroids.len() % scores.len()]);
    }

    let mut membership = vec![0usize; scores.len()];
    for _ in 0..max_iterations {
        let next: Vec<usize> = scores.iter().map(|s| nearest(&centroids, *s)).collect();
        let converged = next == membership;
        membership = next;

        for (idx, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<f64> = scores
                .iter()
                .zip(membership.iter())
                .filter(|(_, m)| **m == idx)
                .map(|(s, _)| *s)
                .collect();
            if !members.is_empty() {
                *centroid = members.iter().sum::<f64>() / members.len() as f64;
            }
        }

        if converged {
            break;
        }
    }

    // Remap cluster ids so index 0 is always the lowest centroid.
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|a, b| centroids[*a].total_cmp(&centroids[*b]));
    let mut rank = vec![0usize; centroids.len()];
    for (position, cluster) in order.iter().enumerate() {
        rank[*cluster] = position;
    }

    membership.into_iter().map(|m| rank[m]).collect()
}

fn nearest(centroids: &[f64], score: f64) -> usize {
    let mut best = 0usize;
    let mut best_distance = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let distance = (score - centroid).abs();
        if distance < best_distance {
            best_distance = distance;
            best = idx;
        }
    }
    best
}
