use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub popularity: i64,
    pub stock: i64,
}

impl Product {
    /// Text fed to the embedding provider for this product.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}
