use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Category and subcategory keyword map used for cross-category interest
/// matching. A keyword matches an interest when either string contains the
/// other, so "sci-fi" matches the "fiction" subcategory and "tech" matches
/// "technology".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<CategoryProfile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub name: String,
    pub keywords: Vec<String>,
    pub subcategories: Vec<Subcategory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Taxonomy {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.categories.is_empty() {
            return Err(DomainError::InvariantViolation(
                "taxonomy must define at least one category".to_owned(),
            ));
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(DomainError::InvariantViolation(
                    "taxonomy category has an empty name".to_owned(),
                ));
            }
            if category.keywords.iter().any(|kw| kw.trim().is_empty()) {
                return Err(DomainError::InvariantViolation(format!(
                    "taxonomy category `{}` has an empty keyword",
                    category.name
                )));
            }
            for subcategory in &category.subcategories {
                if subcategory.keywords.iter().any(|kw| kw.trim().is_empty()) {
                    return Err(DomainError::InvariantViolation(format!(
                        "taxonomy subcategory `{}` has an empty keyword",
                        subcategory.name
                    )));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn keywords_match(keywords: &[String], interest: &str) -> bool {
    keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        keyword.contains(interest) || interest.contains(keyword.as_str())
    })
}

fn subcategory(name: &str, keywords: &[&str]) -> Subcategory {
    Subcategory {
        name: name.to_owned(),
        keywords: keywords.iter().map(|kw| (*kw).to_owned()).collect(),
    }
}

fn category(name: &str, keywords: &[&str], subcategories: Vec<Subcategory>) -> CategoryProfile {
    CategoryProfile {
        name: name.to_owned(),
        keywords: keywords.iter().map(|kw| (*kw).to_owned()).collect(),
        subcategories,
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: vec![
                category(
                    "Books",
                    &["books", "reading", "literature", "novel", "story", "education"],
                    vec![
                        subcategory(
                            "Fiction",
                            &[
                                "fiction", "novel", "story", "fantasy", "romance", "thriller",
                                "mystery", "sci-fi",
                            ],
                        ),
                        subcategory(
                            "Non-Fiction",
                            &["non-fiction", "biography", "self-help", "business", "history", "science"],
                        ),
                        subcategory(
                            "Academic",
                            &["textbook", "education", "academic", "study", "learning", "reference"],
                        ),
                        subcategory(
                            "Children",
                            &["children", "kids", "young adult", "picture book", "bedtime story"],
                        ),
                    ],
                ),
                category(
                    "Lifestyle",
                    &["lifestyle", "wellness", "health", "mindfulness", "relaxation", "self-care"],
                    vec![
                        subcategory(
                            "Wellness",
                            &["wellness", "health", "natural", "organic", "holistic", "vitamins"],
                        ),
                        subcategory(
                            "Home & Living",
                            &["home", "decor", "furniture", "organization", "cleaning"],
                        ),
                        subcategory(
                            "Beauty",
                            &["beauty", "skincare", "cosmetics", "personal care", "grooming"],
                        ),
                        subcategory("Hobbies", &["hobby", "craft", "art", "diy", "creative", "leisure"]),
                    ],
                ),
                category(
                    "Sports & Fitness",
                    &["sports", "fitness", "workout", "exercise", "gym", "training", "athletic"],
                    vec![
                        subcategory("Cardio", &["running", "cardio", "aerobic", "cycling", "swimming"]),
                        subcategory(
                            "Strength",
                            &["weights", "strength", "muscle", "lifting", "resistance"],
                        ),
                        subcategory(
                            "Yoga",
                            &["yoga", "flexibility", "stretching", "meditation", "pilates"],
                        ),
                        subcategory(
                            "Team Sports",
                            &["basketball", "football", "soccer", "baseball", "volleyball"],
                        ),
                    ],
                ),
                category(
                    "Electronics",
                    &["tech", "gadgets", "devices", "smart", "electronic", "digital", "technology"],
                    vec![
                        subcategory(
                            "Computers",
                            &["laptop", "desktop", "computer", "tablet", "accessories"],
                        ),
                        subcategory("Mobile", &["phone", "smartphone", "mobile", "accessories", "apps"]),
                        subcategory("Audio", &["headphones", "earbuds", "speakers", "sound", "music"]),
                        subcategory("Smart Home", &["smart home", "automation", "security", "iot"]),
                    ],
                ),
                category(
                    "Fashion",
                    &["fashion", "style", "clothing", "wear", "apparel", "outfit"],
                    vec![
                        subcategory(
                            "Casual",
                            &["casual", "everyday", "comfortable", "basics", "streetwear"],
                        ),
                        subcategory(
                            "Athletic",
                            &["athletic", "activewear", "sportswear", "gym wear", "performance"],
                        ),
                        subcategory("Formal", &["formal", "business", "professional", "dress", "suits"]),
                        subcategory(
                            "Accessories",
                            &["accessories", "bags", "jewelry", "watches", "scarves"],
                        ),
                    ],
                ),
                category(
                    "Food & Beverage",
                    &["food", "drink", "beverage", "nutrition", "cooking", "kitchen"],
                    vec![
                        subcategory(
                            "Health Foods",
                            &["healthy", "organic", "natural", "vegan", "gluten-free"],
                        ),
                        subcategory("Snacks", &["snacks", "treats", "chips", "nuts", "cookies"]),
                        subcategory("Beverages", &["drinks", "coffee", "tea", "juice", "smoothie"]),
                        subcategory(
                            "Cooking",
                            &["ingredients", "spices", "cooking", "baking", "kitchen"],
                        ),
                    ],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{keywords_match, CategoryProfile, Taxonomy};

    #[test]
    fn default_taxonomy_validates() {
        Taxonomy::default().validate().expect("built-in taxonomy is well formed");
    }

    #[test]
    fn keyword_matching_is_bidirectional_substring() {
        let keywords = vec!["fiction".to_owned(), "technology".to_owned()];
        assert!(keywords_match(&keywords, "science fiction"));
        assert!(keywords_match(&keywords, "tech"));
        assert!(!keywords_match(&keywords, "cooking"));
    }

    #[test]
    fn validation_rejects_empty_category_name() {
        let taxonomy = Taxonomy {
            categories: vec![CategoryProfile {
                name: "  ".to_owned(),
                keywords: vec!["books".to_owned()],
                subcategories: Vec::new(),
            }],
        };
        assert!(taxonomy.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_keyword() {
        let taxonomy = Taxonomy {
            categories: vec![CategoryProfile {
                name: "Books".to_owned(),
                keywords: vec![String::new()],
                subcategories: Vec::new(),
            }],
        };
        assert!(taxonomy.validate().is_err());
    }
}
