use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub interests: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}
