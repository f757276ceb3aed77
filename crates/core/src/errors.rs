use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("recommendation lists are misaligned: {products} products, {scores} scores")]
    MisalignedRecommendationLists { products: usize, scores: usize },
    #[error("segment label vocabulary is empty")]
    EmptyLabelVocabulary,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
