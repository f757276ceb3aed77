use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    Click,
    AddToCart,
    Purchase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::AddToCart => "add_to_cart",
            Self::Purchase => "purchase",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "view" => Some(Self::View),
            "click" => Some(Self::Click),
            "add_to_cart" => Some(Self::AddToCart),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
    pub dwell_time_secs: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::EventKind;

    #[test]
    fn event_kind_round_trips_through_strings() {
        for kind in [EventKind::View, EventKind::Click, EventKind::AddToCart, EventKind::Purchase]
        {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn event_kind_parse_rejects_unknown_values() {
        assert_eq!(EventKind::parse("checkout"), None);
        assert_eq!(EventKind::parse(""), None);
    }

    #[test]
    fn event_kind_parse_normalizes_case_and_whitespace() {
        assert_eq!(EventKind::parse(" Purchase "), Some(EventKind::Purchase));
        assert_eq!(EventKind::parse("ADD_TO_CART"), Some(EventKind::AddToCart));
    }
}
