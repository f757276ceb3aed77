use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

/// A ranked recommendation list for one customer from one batch run.
///
/// Scores are raw ranking values, not probabilities: history-weighted cosine
/// means can exceed 1.0 and fallback rows carry a fixed confidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBatch {
    pub id: RecommendationId,
    pub customer_id: CustomerId,
    pub product_ids: Vec<ProductId>,
    pub scores: Vec<f64>,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationBatch {
    pub fn new(
        id: RecommendationId,
        customer_id: CustomerId,
        product_ids: Vec<ProductId>,
        scores: Vec<f64>,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if product_ids.len() != scores.len() {
            return Err(DomainError::MisalignedRecommendationLists {
                products: product_ids.len(),
                scores: scores.len(),
            });
        }
        Ok(Self { id, customer_id, product_ids, scores, generated_at })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{RecommendationBatch, RecommendationId};
    use crate::domain::customer::CustomerId;
    use crate::domain::product::ProductId;
    use crate::errors::DomainError;

    #[test]
    fn batch_rejects_misaligned_score_list() {
        let result = RecommendationBatch::new(
            RecommendationId("rec-1".to_owned()),
            CustomerId("cust-1".to_owned()),
            vec![ProductId("prod-1".to_owned()), ProductId("prod-2".to_owned())],
            vec![0.9],
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(DomainError::MisalignedRecommendationLists { products: 2, scores: 1 })
        );
    }

    #[test]
    fn batch_accepts_aligned_lists() {
        let batch = RecommendationBatch::new(
            RecommendationId("rec-2".to_owned()),
            CustomerId("cust-1".to_owned()),
            vec![ProductId("prod-1".to_owned())],
            vec![1.1],
            Utc::now(),
        )
        .expect("aligned lists");

        assert_eq!(batch.product_ids.len(), batch.scores.len());
    }
}
