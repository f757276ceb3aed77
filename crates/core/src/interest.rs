use crate::domain::product::Product;
use crate::taxonomy::{keywords_match, Taxonomy};

/// Scores how well a product matches a customer's declared interests.
///
/// The score blends three signals: direct substring hits against the product
/// name, description, and category; taxonomy matches across categories and
/// subcategories; and individual interest words found in the product text.
/// Output is clamped to [0.1, 1.0], with 0.5 for customers who declared no
/// interests at all.
#[derive(Clone, Debug)]
pub struct InterestScorer {
    taxonomy: Taxonomy,
}

const DIRECT_NAME_WEIGHT: f64 = 1.2;
const DIRECT_DESCRIPTION_WEIGHT: f64 = 0.8;
const DIRECT_CATEGORY_WEIGHT: f64 = 1.0;
const CATEGORY_MATCH_WEIGHT: f64 = 0.6;
const SUBCATEGORY_MATCH_WEIGHT: f64 = 0.4;
const WORD_NAME_WEIGHT: f64 = 0.7;
const WORD_DESCRIPTION_WEIGHT: f64 = 0.4;
const NEUTRAL_SCORE: f64 = 0.5;

impl Default for InterestScorer {
    fn default() -> Self {
        Self { taxonomy: Taxonomy::default() }
    }
}

impl InterestScorer {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn score(&self, interests: &[String], product: &Product) -> f64 {
        let interests: Vec<String> = interests
            .iter()
            .map(|interest| interest.trim().to_lowercase())
            .filter(|interest| !interest.is_empty())
            .collect();
        if interests.is_empty() {
            return NEUTRAL_SCORE;
        }

        let name = product.name.to_lowercase();
        let description = product.description.to_lowercase();
        let category = product.category.to_lowercase();

        let direct = self.direct_score(&interests, &name, &description, &category);
        let categorical = self.category_score(&interests);
        let keyword = self.keyword_score(&interests, &name, &description);

        let mut score = 0.5 * direct + 0.3 * categorical + 0.2 * keyword;
        if direct > 0.8 {
            score = (score * 1.2).min(1.0);
        }
        score.max(0.1)
    }

    fn direct_score(
        &self,
        interests: &[String],
        name: &str,
        description: &str,
        category: &str,
    ) -> f64 {
        let mut total = 0.0;
        for interest in interests {
            if name.contains(interest.as_str()) {
                total += DIRECT_NAME_WEIGHT;
            }
            if description.contains(interest.as_str()) {
                total += DIRECT_DESCRIPTION_WEIGHT;
            }
            if category.contains(interest.as_str()) {
                total += DIRECT_CATEGORY_WEIGHT;
            }
        }
        // 3.0 is the maximum weight a single interest can contribute.
        (total / (3.0 * interests.len() as f64)).min(1.0)
    }

    fn category_score(&self, interests: &[String]) -> f64 {
        let mut matches: Vec<f64> = Vec::new();
        for category in &self.taxonomy.categories {
            for interest in interests {
                if keywords_match(&category.keywords, interest) {
                    matches.push(CATEGORY_MATCH_WEIGHT);
                }
                for subcategory in &category.subcategories {
                    if keywords_match(&subcategory.keywords, interest) {
                        matches.push(SUBCATEGORY_MATCH_WEIGHT);
                    }
                }
            }
        }
        if matches.is_empty() {
            return 0.0;
        }
        matches.sort_by(|a, b| b.total_cmp(a));
        let top: &[f64] = &matches[..matches.len().min(3)];
        let average = top.iter().sum::<f64>() / top.len() as f64;
        (average / 1.8).min(1.0)
    }

    fn keyword_score(&self, interests: &[String], name: &str, description: &str) -> f64 {
        let mut total = 0.0;
        for interest in interests {
            for word in interest.split_whitespace().filter(|word| word.len() > 3) {
                if name.contains(word) {
                    total += WORD_NAME_WEIGHT;
                }
                if description.contains(word) {
                    total += WORD_DESCRIPTION_WEIGHT;
                }
            }
        }
        (total / (1.1 * interests.len() as f64)).min(1.0)
    }
}
